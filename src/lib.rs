//! # gitopedia-render
//!
//! Render Gitopedia's Markdown articles into publish-ready HTML fragments.
//!
//! ## Why this crate?
//!
//! Articles are written by people and by research models, and both are
//! sloppy about mathematics: `E = mc²`, `α₁`, `[ \frac{a}{b} ]`, stray `$$$`.
//! A stock Markdown engine renders all of that as plain text. This crate
//! first rewrites informal math into one canonical `$…$` / `$$…$$` dialect
//! (never touching code or URLs), then renders with a math-aware engine and
//! turns footnotes and internal links into what the published site expects.
//!
//! ## Pipeline Overview
//!
//! ```text
//! slug ["science","physics","quantum"]
//!  │
//!  ├─ 1. Source     <root>/science/physics/quantum.md  (or …/quantum/index.md)
//!  ├─ 2. Metadata   YAML front matter → Metadata, dates → ISO-8601
//!  ├─ 3. Equations  informal math → $…$ / $$…$$  (fixed point, code untouched)
//!  ├─ 4. Render     pulldown-cmark with math (spawn_blocking; fallback to <pre>)
//!  ├─ 5. Footnotes  [^id] → superscript anchors + "References" list
//!  └─ 6. Links      foo.md → foo, img/x.png → /science/physics/quantum/img/x.png
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gitopedia_render::{Assembler, PublishConfig, Slug};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PublishConfig::builder().content_root("Compendium").build()?;
//!     let assembler = Assembler::new(config);
//!     let doc = assembler.assemble(&Slug::parse("science/physics")?).await?;
//!     println!("{}", doc.html);
//!     Ok(())
//! }
//! ```
//!
//! Or the whole tree at once with [`build_site`] / [`build_stream`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `gitopedia-render` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! gitopedia-render = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod assemble;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod site;
pub mod slug;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use assemble::{assemble, assemble_sync, Assembler};
pub use config::{MarkdownOptions, PublishConfig, PublishConfigBuilder};
pub use error::{PublishError, RenderError};
pub use output::{AssembledDocument, BuildStats, DocumentFailure, SiteOutput};
pub use pipeline::equations::normalize;
pub use pipeline::frontmatter::{Metadata, MetaValue};
pub use pipeline::render::{CmarkRenderer, MarkupRenderer};
pub use progress::{BuildProgressCallback, NoopProgressCallback, ProgressCallback};
pub use site::{build_site, build_site_sync, build_site_to_file, build_site_with, publish_images};
pub use slug::{PageKind, Slug};
pub use stream::{build_stream, build_stream_with, DocumentStream};
