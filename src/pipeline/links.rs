//! Link and image path rewriting for rendered HTML.
//!
//! Authors link between articles by file name (`[Pauli](pauli.md)`) and
//! reference images relative to the article (`![fig](img/fig.png)`). The
//! published site serves articles at suffix-free URLs and copies each
//! article's images below its own URL, so:
//!
//! * `<a href="pauli.md#history">` → `<a href="pauli#history">`
//! * `<img src="img/fig.png">` on `science/physics` → `<img src="/science/physics/img/fig.png">`

use crate::pipeline::escape_html;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

static RE_ANCHOR_HREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(<a\b[^>]*?\bhref\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

static RE_IMG_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(<img\b[^>]*?\bsrc\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

static RE_SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:").unwrap());

/// Rewrite hrefs and image sources in `html` for a document published at
/// `slug`, using the default `md` authoring suffix.
pub fn rewrite<S: AsRef<str>>(html: &str, slug: &[S]) -> String {
    rewrite_with_suffix(html, slug, "md")
}

/// [`rewrite`] with an explicit authoring suffix (without the dot).
pub fn rewrite_with_suffix<S: AsRef<str>>(html: &str, slug: &[S], suffix: &str) -> String {
    let dotted = format!(".{suffix}");
    let base = slug.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("/");
    // Slug segments are file names and may hold any attribute-breaking text.
    let attr_base = escape_html(&base).replace('\'', "&#39;");
    let mut rewritten = 0usize;

    let html = RE_ANCHOR_HREF.replace_all(html, |caps: &Captures| {
        rewrite_attribute(caps, |href| {
            let out = strip_suffix(href, &dotted);
            if out.is_some() {
                rewritten += 1;
            }
            out
        })
    });
    let html = RE_IMG_SRC.replace_all(&html, |caps: &Captures| {
        rewrite_attribute(caps, |src| {
            let out = absolute_image_path(src, &attr_base);
            if out.is_some() {
                rewritten += 1;
            }
            out
        })
    });

    if rewritten > 0 {
        debug!("Rewrote {} link(s) for /{}", rewritten, base);
    }
    html.into_owned()
}

/// Re-emit `prefix` + quoted value, replacing the value when `f` returns one.
fn rewrite_attribute<F>(caps: &Captures, f: F) -> String
where
    F: FnOnce(&str) -> Option<String>,
{
    let (value, quote) = match (caps.get(2), caps.get(3)) {
        (Some(v), _) => (v.as_str(), '"'),
        (None, Some(v)) => (v.as_str(), '\''),
        (None, None) => return caps[0].to_string(),
    };
    match f(value) {
        Some(new_value) => format!("{}{quote}{new_value}{quote}", &caps[1]),
        None => caps[0].to_string(),
    }
}

/// `topic.md` → `topic`, `topic.MD#intro` → `topic#intro`.
///
/// External (`scheme:`), protocol-relative and fragment-only targets are
/// never touched.
fn strip_suffix(href: &str, dotted_suffix: &str) -> Option<String> {
    if href.starts_with('#') || href.starts_with("//") || RE_SCHEME.is_match(href) {
        return None;
    }
    let (path, fragment) = match href.find('#') {
        Some(i) => href.split_at(i),
        None => (href, ""),
    };
    let cut = path.len().checked_sub(dotted_suffix.len())?;
    let tail = path.get(cut..)?;
    if !tail.eq_ignore_ascii_case(dotted_suffix) {
        return None;
    }
    Some(format!("{}{}", &path[..cut], fragment))
}

/// Prefix a document-relative image path with the document's URL. `base`
/// must already be escaped for an attribute value.
fn absolute_image_path(src: &str, base: &str) -> Option<String> {
    if src.is_empty() || src.starts_with('/') || RE_SCHEME.is_match(src) {
        return None;
    }
    let relative = src.strip_prefix("./").unwrap_or(src);
    if base.is_empty() {
        Some(format!("/{relative}"))
    } else {
        Some(format!("/{base}/{relative}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLUG: [&str; 2] = ["a", "b"];

    #[test]
    fn strips_document_suffix() {
        assert_eq!(rewrite(r#"<a href="topic.md">x</a>"#, &SLUG), r#"<a href="topic">x</a>"#);
        assert_eq!(
            rewrite(r#"<a href="../c/topic.MD#intro">x</a>"#, &SLUG),
            r#"<a href="../c/topic#intro">x</a>"#
        );
    }

    #[test]
    fn leaves_other_hrefs_alone() {
        for html in [
            r#"<a href="https://ext.org/readme.md">x</a>"#,
            r##"<a href="#notes.md">x</a>"##,
            r#"<a href="//cdn.org/a.md">x</a>"#,
            r#"<a href="page.html">x</a>"#,
            r#"<a href="mailto:me@x.md">x</a>"#,
        ] {
            assert_eq!(rewrite(html, &SLUG), html);
        }
    }

    #[test]
    fn makes_relative_images_absolute() {
        assert_eq!(rewrite(r#"<img src="fig.png">"#, &SLUG), r#"<img src="/a/b/fig.png">"#);
        assert_eq!(
            rewrite(r#"<img alt="x" src='./img/fig.png' />"#, &SLUG),
            r#"<img alt="x" src='/a/b/img/fig.png' />"#
        );
    }

    #[test]
    fn slug_is_escaped_in_image_paths() {
        let slug = ["a\"b", "c<d>", "it's"];
        assert_eq!(
            rewrite(r#"<img src="x.png">"#, &slug),
            r#"<img src="/a&quot;b/c&lt;d&gt;/it&#39;s/x.png">"#
        );
        assert_eq!(
            rewrite(r#"<img src='x.png'>"#, &slug),
            r#"<img src='/a&quot;b/c&lt;d&gt;/it&#39;s/x.png'>"#
        );
    }

    #[test]
    fn leaves_absolute_images_alone() {
        for html in [
            r#"<img src="https://ext/fig.png">"#,
            r#"<img src="/static/fig.png">"#,
            r#"<img src="data:image/png;base64,AAAA">"#,
        ] {
            assert_eq!(rewrite(html, &SLUG), html);
        }
    }

    #[test]
    fn custom_suffix() {
        assert_eq!(
            rewrite_with_suffix(r#"<a href="x.markdown">x</a>"#, &SLUG, "markdown"),
            r#"<a href="x">x</a>"#
        );
    }

    #[test]
    fn accepts_owned_segments() {
        let slug = vec!["science".to_string()];
        assert_eq!(
            rewrite(r#"<img src="p.svg">"#, &slug),
            r#"<img src="/science/p.svg">"#
        );
    }
}
