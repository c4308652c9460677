//! Markdown → HTML: the pipeline's only suspension point.
//!
//! The engine sits behind [`MarkupRenderer`] so a build can swap it (tests
//! inject one that always fails to exercise the fallback). The default,
//! [`CmarkRenderer`], runs pulldown-cmark with its math extension, which
//! turns the normaliser's `$…$` / `$$…$$` into
//! `<span class="math math-inline">` / `<span class="math math-display">`
//! for client-side typesetting.
//!
//! ## Why spawn_blocking?
//!
//! Rendering is CPU-bound and a long article takes milliseconds; on a
//! blocking-pool thread it cannot stall the runtime's workers during a
//! concurrent site build. It also turns a panic inside the engine into a
//! `JoinError` we can report instead of unwinding through the build.

use crate::config::MarkdownOptions;
use crate::error::RenderError;
use futures::future::BoxFuture;
use pulldown_cmark::{html, Options, Parser};

/// Converts normalised Markdown into an HTML fragment.
pub trait MarkupRenderer: Send + Sync {
    fn render<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<String, RenderError>>;
}

/// pulldown-cmark with math always enabled and footnotes always disabled.
#[derive(Debug, Clone, Default)]
pub struct CmarkRenderer {
    options: MarkdownOptions,
}

impl CmarkRenderer {
    pub fn new(options: MarkdownOptions) -> Self {
        Self { options }
    }
}

impl MarkupRenderer for CmarkRenderer {
    fn render<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<String, RenderError>> {
        let text = text.to_owned();
        let options = self.options;
        Box::pin(async move {
            tokio::task::spawn_blocking(move || render_markdown(&text, options))
                .await
                .map_err(|e| {
                    if e.is_panic() {
                        RenderError::Panicked {
                            detail: panic_detail(e.into_panic()),
                        }
                    } else {
                        RenderError::Engine {
                            detail: e.to_string(),
                        }
                    }
                })
        })
    }
}

/// Render synchronously on the current thread.
pub fn render_markdown(text: &str, options: MarkdownOptions) -> String {
    let parser = Parser::new_ext(text, cmark_options(options));
    let mut out = String::with_capacity(text.len() + text.len() / 2);
    html::push_html(&mut out, parser);
    out
}

fn cmark_options(options: MarkdownOptions) -> Options {
    let mut opts = Options::ENABLE_MATH;
    if options.tables {
        opts.insert(Options::ENABLE_TABLES);
    }
    if options.strikethrough {
        opts.insert(Options::ENABLE_STRIKETHROUGH);
    }
    if options.smart_punctuation {
        opts.insert(Options::ENABLE_SMART_PUNCTUATION);
    }
    opts
}

fn panic_detail(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn math_spans_are_marked() {
        let html = render_markdown("Energy $E = mc^2$.", MarkdownOptions::default());
        assert!(html.contains(r#"<span class="math math-inline">E = mc^2</span>"#), "{html}");

        let html = render_markdown("$$\\int f$$", MarkdownOptions::default());
        assert!(html.contains("math-display"), "{html}");
    }

    #[test]
    fn escaped_dollar_is_literal() {
        let html = render_markdown("costs \\$5", MarkdownOptions::default());
        assert_eq!(html, "<p>costs $5</p>\n");
    }

    #[test]
    fn footnote_markers_are_left_alone() {
        let html = render_markdown("Claim[^1].", MarkdownOptions::default());
        assert_eq!(html, "<p>Claim[^1].</p>\n");
    }

    #[test]
    fn tables_follow_options() {
        let md = "| a | b |\n|---|---|\n| 1 | 2 |\n";
        assert!(render_markdown(md, MarkdownOptions::default()).contains("<table>"));
        let off = MarkdownOptions {
            tables: false,
            ..MarkdownOptions::default()
        };
        assert!(!render_markdown(md, off).contains("<table>"));
    }

    #[tokio::test]
    async fn async_render_matches_sync() {
        let renderer = CmarkRenderer::default();
        let html = renderer.render("# Title").await.unwrap();
        assert_eq!(html, "<h1>Title</h1>\n");
    }
}
