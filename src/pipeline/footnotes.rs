//! Footnotes: `[^id]` markers and `[^id]: text` definitions become
//! superscript links plus a back-linked reference list.
//!
//! The Markdown engine runs with its footnote extension off, so it leaves
//! markers in the HTML as literal `[^id]` text. Definitions are read from the
//! *source* body rather than the HTML, because a definition whose text is a
//! bare URL would otherwise be swallowed as a link reference definition; see
//! [`shield_definitions`].
//!
//! ## Anchors
//!
//! ```text
//! <sup class="footnote-ref" id="fnref-7"><a href="#fn-7">7</a></sup>   first reference
//! <sup class="footnote-ref" id="fnref-7-2"><a href="#fn-7">7</a></sup> second reference
//! <li id="fn-7">… <a href="#fnref-7" class="footnote-backref">↩</a></li>
//! ```

use crate::pipeline::equations::segment::{is_indented, split_blocks, Chunk};
use crate::pipeline::escape_html;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Write as _;
use tracing::{debug, warn};

/// One footnote definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Footnote {
    pub id: String,
    pub text: String,
    /// Set when the text is exactly a Markdown link `[label](url)`.
    pub link: Option<FootnoteLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FootnoteLink {
    pub label: String,
    pub url: String,
}

static RE_DEFINITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[\^([^\]\s]+)\]:[ \t]*(.*)$").unwrap());

static RE_LINK_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([^\]]*)\]\(([^()\s]+)\)$").unwrap());

static RE_PARAGRAPH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<p>(.*?)</p>(\n?)").unwrap());

/// An unrendered definition at the start of a line inside a paragraph.
static RE_DEFINITION_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\[\^[^\]\s]+\]:").unwrap());

/// A `<pre>`/`<code>` tag or a footnote marker, in document order.
static RE_MARKER_OR_CODE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(/?)(?:pre|code)\b[^>]*>|\[\^([^\]\s]+)\]").unwrap()
});

/// What a source line is to the footnote parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineRole {
    /// `[^id]: text`
    Definition,
    /// More text for the definition above. `detached` when a blank line
    /// separates it from the definition, so it renders as its own block.
    Continuation { detached: bool },
    Other,
}

/// Classify every line of `body`, each with its trailing `\n`.
///
/// After a definition, following lines continue it until a blank line or a
/// line that starts a new block. Past a blank line only indented lines
/// continue it. Definitions inside code are not recognised.
fn classify_lines(body: &str) -> Vec<(&str, LineRole)> {
    let mut lines = Vec::new();
    let mut open = false;
    let mut after_blank = false;

    for chunk in split_blocks(body) {
        let (text, code) = match chunk {
            Chunk::Prose(text) => (text, false),
            Chunk::Code(text) => (text, true),
        };
        for line in text.split_inclusive('\n') {
            let content = line.trim_end_matches('\n');
            let role = if !code && RE_DEFINITION.is_match(content) {
                open = true;
                after_blank = false;
                LineRole::Definition
            } else if open && content.trim().is_empty() {
                after_blank = true;
                LineRole::Other
            } else if open
                && (is_indented(content)
                    || (!code && !after_blank && !starts_block(content)))
            {
                LineRole::Continuation {
                    detached: after_blank,
                }
            } else {
                open = false;
                LineRole::Other
            };
            lines.push((line, role));
        }
    }
    lines
}

/// A line that ends a paragraph instead of continuing it.
fn starts_block(line: &str) -> bool {
    let rest = line.trim_start();
    rest.starts_with(['#', '>', '|'])
        || ["- ", "* ", "+ "].iter().any(|bullet| rest.starts_with(bullet))
}

/// Collect definitions from `body`, in the order they are defined.
///
/// Lines inside fenced or indented code are skipped. Continuation lines are
/// joined to their definition with single spaces. When an id is defined
/// twice the first definition wins and each later one is logged.
pub fn collect_footnotes(body: &str) -> Vec<Footnote> {
    let mut footnotes: Vec<Footnote> = Vec::new();
    let mut current: Option<usize> = None;

    for (line, role) in classify_lines(body) {
        let content = line.trim_end_matches('\n');
        match role {
            LineRole::Definition => {
                let Some(caps) = RE_DEFINITION.captures(content) else {
                    continue;
                };
                let id = caps[1].to_string();
                if footnotes.iter().any(|f| f.id == id) {
                    warn!("Duplicate footnote definition [^{}] ignored", id);
                    current = None;
                    continue;
                }
                footnotes.push(Footnote {
                    id,
                    text: caps[2].trim().to_string(),
                    link: None,
                });
                current = Some(footnotes.len() - 1);
            }
            LineRole::Continuation { .. } => {
                if let Some(note) = current.and_then(|i| footnotes.get_mut(i)) {
                    if !note.text.is_empty() {
                        note.text.push(' ');
                    }
                    note.text.push_str(content.trim());
                }
            }
            LineRole::Other => {}
        }
    }

    for note in &mut footnotes {
        note.link = RE_LINK_TEXT.captures(&note.text).map(|c| FootnoteLink {
            label: c[1].to_string(),
            url: c[2].to_string(),
        });
    }
    footnotes
}

/// Prepare a body for the Markdown engine.
///
/// The leading `[` of every definition line is escaped so the engine renders
/// it as a plain paragraph instead of consuming `[^id]: url` as a link
/// reference definition. Detached continuation lines are dropped: their text
/// already belongs to the footnote and would otherwise render as code.
pub fn shield_definitions(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    for (line, role) in classify_lines(text) {
        match role {
            LineRole::Definition => {
                out.push('\\');
                out.push_str(line);
            }
            LineRole::Continuation { detached: true } => {}
            _ => out.push_str(line),
        }
    }
    out
}

/// Remove rendered definitions. A definition starting a paragraph removes
/// the paragraph; one further down removes the paragraph's tail from that
/// line on.
fn strip_definitions(html: &str) -> Cow<'_, str> {
    RE_PARAGRAPH.replace_all(html, |caps: &Captures| {
        let inner = &caps[1];
        match RE_DEFINITION_START.find(inner) {
            None => caps[0].to_string(),
            Some(m) if m.start() == 0 => String::new(),
            Some(m) => format!("<p>{}</p>{}", inner[..m.start()].trim_end(), &caps[2]),
        }
    })
}

/// Rewrite footnotes in `rendered_html` using the definitions found in
/// `original_body`. Without definitions the HTML is returned unchanged.
pub fn restructure(rendered_html: &str, original_body: &str) -> String {
    let footnotes = collect_footnotes(original_body);
    if footnotes.is_empty() {
        return rendered_html.to_string();
    }

    let without_definitions = strip_definitions(rendered_html);
    let (mut html, ref_counts) = link_references(&without_definitions, &footnotes);

    if !html.is_empty() && !html.ends_with('\n') {
        html.push('\n');
    }
    html.push_str(&reference_list(&footnotes, &ref_counts));

    debug!(
        "Restructured {} footnote(s), {} reference(s)",
        footnotes.len(),
        ref_counts.values().sum::<usize>()
    );
    html
}

/// Replace defined `[^id]` markers outside `<pre>`/`<code>` with superscript
/// anchors. Returns the HTML and the number of references per id.
fn link_references(html: &str, footnotes: &[Footnote]) -> (String, HashMap<String, usize>) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut code_depth: usize = 0;

    let linked = RE_MARKER_OR_CODE_TAG.replace_all(html, |caps: &Captures| {
        let whole = &caps[0];
        let Some(id) = caps.get(2).map(|m| m.as_str()) else {
            if caps.get(1).is_some_and(|m| !m.as_str().is_empty()) {
                code_depth = code_depth.saturating_sub(1);
            } else {
                code_depth += 1;
            }
            return whole.to_string();
        };

        let end = caps.get(0).map_or(0, |m| m.end());
        let is_definition = html[end..].starts_with(':');
        if code_depth > 0 || is_definition || !footnotes.iter().any(|f| f.id == id) {
            return whole.to_string();
        }

        let n = counts.entry(id.to_string()).or_insert(0);
        *n += 1;
        let id = escape_html(id);
        let anchor = if *n == 1 {
            format!("fnref-{id}")
        } else {
            format!("fnref-{id}-{n}")
        };
        format!(r##"<sup class="footnote-ref" id="{anchor}"><a href="#fn-{id}">{id}</a></sup>"##)
    });

    (linked.into_owned(), counts)
}

fn reference_list(footnotes: &[Footnote], ref_counts: &HashMap<String, usize>) -> String {
    let mut out = String::from("<section class=\"footnotes\">\n<h2>References</h2>\n<ol>\n");
    for note in footnotes {
        let id = escape_html(&note.id);
        let body = match &note.link {
            Some(link) => format!(
                r#"<a href="{}">{}</a>"#,
                escape_html(&link.url),
                escape_html(&link.label)
            ),
            None => escape_html(&note.text),
        };
        let _ = write!(out, r#"<li id="fn-{id}">{body}"#);
        if ref_counts.contains_key(&note.id) {
            let _ = write!(
                out,
                r##" <a href="#fnref-{id}" class="footnote-backref">↩</a>"##
            );
        }
        out.push_str("</li>\n");
    }
    out.push_str("</ol>\n</section>\n");
    out
}
