//! Pipeline stages for turning one source document into HTML.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! source ──▶ frontmatter ──▶ equations ──▶ render ──▶ footnotes ──▶ links
//! (fs read)  (YAML split)    (math TeX)    (cmark)    (refs list)   (URLs)
//! ```
//!
//! 1. [`source`]      — resolve a slug below the content root, read it, walk the tree
//! 2. [`frontmatter`] — split metadata from body; never fails
//! 3. [`equations`]   — canonicalise informal math; code and URLs untouched
//! 4. [`render`]      — Markdown → HTML behind the [`render::MarkupRenderer`] trait;
//!    runs in `spawn_blocking`
//! 5. [`footnotes`]   — superscript markers plus a back-linked reference list
//! 6. [`links`]       — suffix-free hrefs, site-absolute image paths
//!
//! Stages 2, 3, 5 and 6 are pure `&str → String` functions.

pub mod equations;
pub mod footnotes;
pub mod frontmatter;
pub mod links;
pub mod render;
pub mod source;

/// Escape text for use in HTML content or a double-quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }
}
