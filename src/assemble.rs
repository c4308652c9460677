//! Single-document assembly: slug in, [`AssembledDocument`] out.
//!
//! ## Stage order
//!
//! ```text
//! read ─▶ parse ─▶ normalise ─▶ shield ─▶ render ─┬─▶ footnotes ─▶ links ─▶ done
//!                                                 └─(engine error)─▶ <pre>escaped body</pre>
//! ```
//!
//! A failed read is the only error a caller sees. A failed render is logged
//! and replaced by the escaped source, so one malformed article cannot take
//! down a full-site build.

use crate::config::PublishConfig;
use crate::error::PublishError;
use crate::output::AssembledDocument;
use crate::pipeline::frontmatter::{self, ParsedDocument};
use crate::pipeline::render::{CmarkRenderer, MarkupRenderer};
use crate::pipeline::source::DocumentSource;
use crate::pipeline::{equations, escape_html, footnotes, links};
use crate::slug::Slug;
use std::sync::Arc;
use tracing::{debug, error};

/// Runs the per-document pipeline against one content root.
///
/// Cheap to share: wrap in an `Arc` (or clone) and call
/// [`assemble`](Self::assemble) from as many tasks as you like.
#[derive(Clone)]
pub struct Assembler {
    config: PublishConfig,
    source: DocumentSource,
    renderer: Arc<dyn MarkupRenderer>,
}

impl std::fmt::Debug for Assembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assembler")
            .field("config", &self.config)
            .field("renderer", &"<dyn MarkupRenderer>")
            .finish()
    }
}

impl Assembler {
    /// Assembler using the default pulldown-cmark engine.
    pub fn new(config: PublishConfig) -> Self {
        let renderer = Arc::new(CmarkRenderer::new(config.markdown));
        Self::with_renderer(config, renderer)
    }

    /// Assembler using a caller-supplied Markdown engine.
    pub fn with_renderer(config: PublishConfig, renderer: Arc<dyn MarkupRenderer>) -> Self {
        let source = DocumentSource::new(&config);
        Self {
            config,
            source,
            renderer,
        }
    }

    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    pub fn source(&self) -> &DocumentSource {
        &self.source
    }

    /// Read and render the document published at `slug`.
    ///
    /// # Errors
    /// Only source errors: not found, unreadable, not UTF-8.
    pub async fn assemble(&self, slug: &Slug) -> Result<AssembledDocument, PublishError> {
        let (path, raw) = self.source.read(slug).await?;
        debug!("Assembling {} from {}", slug, path.display());
        let mut doc = self.assemble_str(slug, &raw).await;
        doc.images = self.source.images(&path).await;
        Ok(doc)
    }

    /// Render an in-memory source as if it had been read for `slug`.
    pub async fn assemble_str(&self, slug: &Slug, raw: &str) -> AssembledDocument {
        let ParsedDocument { metadata, body } = frontmatter::parse_document(raw);

        let normalized = equations::normalize(&body);
        let shielded = footnotes::shield_definitions(&normalized);

        let (html, render_fallback) = match self.renderer.render(&shielded).await {
            Ok(rendered) => {
                let html = footnotes::restructure(&rendered, &body);
                let html = links::rewrite_with_suffix(
                    &html,
                    slug.segments(),
                    &self.config.document_suffix,
                );
                (html, false)
            }
            Err(e) => {
                error!("Rendering '{}' failed, publishing escaped source: {}", slug, e);
                (fallback_html(&body), true)
            }
        };

        AssembledDocument {
            slug: slug.clone(),
            page_kind: slug.page_kind(),
            metadata,
            html,
            render_fallback,
            images: Vec::new(),
        }
    }
}

/// The escaped body in a preformatted block.
fn fallback_html(body: &str) -> String {
    format!("<pre>{}</pre>", escape_html(body))
}

/// Assemble one document with a fresh default [`Assembler`].
///
/// Convenient for one-off calls; site builds should reuse one assembler.
pub async fn assemble(
    slug: &Slug,
    config: &PublishConfig,
) -> Result<AssembledDocument, PublishError> {
    Assembler::new(config.clone()).assemble(slug).await
}

/// Synchronous wrapper around [`assemble`].
///
/// Creates a temporary tokio runtime internally.
pub fn assemble_sync(
    slug: &Slug,
    config: &PublishConfig,
) -> Result<AssembledDocument, PublishError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PublishError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(assemble(slug, config))
}
