//! Equation normalisation: informal math in, `$…$` / `$$…$$` TeX out.
//!
//! Articles type equations every way imaginable: `E = mc2`, `σ²`, `x₁`,
//! bracketed LaTeX, dollar soup left behind by earlier conversions. This
//! module rewrites all of it into the one dialect the Markdown engine's math
//! extension understands, without touching code, URLs, raw HTML or math
//! that is already well formed.
//!
//! ## Stages
//!
//! ```text
//! body ─▶ code partition ─▶ dollar repair ─▶ tokenise ─▶ RULES ─▶ emit
//!          (verbatim)        (\$$, $$$)       (math,      (a–d)
//!                                              HTML, URLs)
//! ```
//!
//! ## Rule order
//!
//! [`RULES`] runs front to back over text segments only. A substring wrapped
//! as math by one rule is no longer text for the rules after it, so the
//! order is the precedence: bracketed LaTeX beats the famous-equation table,
//! which beats single Greek letters, which beat bare scripts.
//!
//! ## Idempotence
//!
//! Emission separates a math span from a preceding `$` or `\`, and an
//! inline span from a following digit, so the output tokenises back into
//! the same spans. The whole pass is repeated until it reaches a fixed
//! point, which makes `normalize(normalize(x)) == normalize(x)` hold for
//! any input.

pub mod rules;
pub mod segment;
mod tables;

pub use segment::Segment;

use segment::{push_segment, repair_dollars, split_code, tokenize, Chunk};
use tracing::debug;

/// A single heuristic: plain text in, text and math out.
pub type Rule = fn(&str) -> Vec<Segment>;

/// Rules in precedence order.
pub const RULES: &[(&str, Rule)] = &[
    ("latin_lookalikes", rules::latin_lookalikes),
    ("bracketed_latex", rules::bracketed_latex),
    ("famous_equations", rules::famous_equations),
    ("greek_letters", rules::greek_letters),
    ("unicode_scripts", rules::unicode_scripts),
];

/// Upper bound on full passes. Real documents settle after the first.
const MAX_PASSES: usize = 4;

/// Rewrite informal math in `body` into delimited TeX.
///
/// Pure and deterministic. Code blocks and inline code are returned
/// byte-for-byte.
///
/// # Example
/// ```rust
/// use gitopedia_render::pipeline::equations::normalize;
///
/// assert_eq!(normalize("E = mc2"), "$E = mc^2$");
/// assert_eq!(normalize("variance σ²"), "variance $\\sigma^2$");
/// assert_eq!(normalize("`σ²`"), "`σ²`");
/// ```
pub fn normalize(body: &str) -> String {
    let mut current = normalize_once(body);
    for pass in 2..=MAX_PASSES {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        debug!("Equation normalisation needed pass {}", pass);
        current = next;
    }
    current
}

fn normalize_once(body: &str) -> String {
    let mut out = String::with_capacity(body.len() + body.len() / 8);
    for chunk in split_code(body) {
        match chunk {
            Chunk::Code(code) => out.push_str(code),
            Chunk::Prose(prose) => {
                let segments = apply_rules(tokenize(&repair_dollars(prose)));
                emit(&segments, &mut out);
            }
        }
    }
    out
}

/// Run every rule in [`RULES`] over the text segments.
pub fn apply_rules(segments: Vec<Segment>) -> Vec<Segment> {
    RULES
        .iter()
        .fold(segments, |segments, (_, rule)| apply_rule(*rule, segments))
}

/// Run one rule over the text segments, leaving all others in place.
pub fn apply_rule(rule: Rule, segments: Vec<Segment>) -> Vec<Segment> {
    let mut out = Vec::with_capacity(segments.len());
    for seg in segments {
        match seg {
            Segment::Text(text) => {
                for piece in rule(&text) {
                    push_segment(&mut out, piece);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Serialise segments back to Markdown.
fn emit(segments: &[Segment], out: &mut String) {
    let mut prev_inline = false;
    for seg in segments {
        match seg {
            Segment::Text(s) | Segment::Protected(s) => {
                if prev_inline && s.starts_with(|c: char| c.is_ascii_digit()) {
                    out.push(' ');
                }
                out.push_str(s);
            }
            Segment::Inline(math) => {
                separate_from_previous(out);
                out.push('$');
                out.push_str(math);
                out.push('$');
            }
            Segment::Display(math) => {
                separate_from_previous(out);
                out.push_str("$$");
                if math.starts_with('$') {
                    out.push(' ');
                }
                out.push_str(math);
                if math.ends_with('$') || math.ends_with('\\') {
                    out.push(' ');
                }
                out.push_str("$$");
            }
        }
        prev_inline = matches!(seg, Segment::Inline(_));
    }
}

/// Keep a new opening delimiter from fusing with a preceding `$` (which
/// would make `$$`/`$$$$`) or `\` (which would escape it).
fn separate_from_previous(out: &mut String) {
    if out.ends_with('$') || out.ends_with('\\') {
        out.push(' ');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn famous_equation_scenario() {
        assert_eq!(normalize("E = mc2"), "$E = mc^2$");
        assert_eq!(normalize("E = mc²"), "$E = mc^2$");
    }

    #[test]
    fn greek_and_scripts_in_prose() {
        assert_eq!(
            normalize("The variance σ² of x² is finite."),
            "The variance $\\sigma^2$ of $x^2$ is finite."
        );
    }

    #[test]
    fn lookalike_epsilon_reaches_famous_table() {
        assert_eq!(normalize("\u{395} = mc²"), "$E = mc^2$");
    }

    #[test]
    fn code_is_untouched() {
        let body = "Inline `σ² $x` here.\n\n```\nE = mc2 and $$$\n```\n\n    α indented\n";
        let out = normalize(body);
        assert!(out.contains("`σ² $x`"));
        assert!(out.contains("```\nE = mc2 and $$$\n```"));
        assert!(out.contains("    α indented\n"));
    }

    #[test]
    fn existing_math_is_not_rewrapped() {
        let body = "Already $\\alpha + \\beta$ and $$\\int f$$ done.";
        assert_eq!(normalize(body), body);
    }

    #[test]
    fn math_whitespace_is_collapsed() {
        assert_eq!(normalize("$$\n  a +\n  b\n$$"), "$$a + b$$");
        assert_eq!(normalize("$a  +   b$"), "$a + b$");
    }

    #[test]
    fn delimiter_artefacts_are_repaired() {
        assert_eq!(normalize("\\$$x$$"), "$$x$$");
        assert_eq!(normalize("$$$x$$$"), "$$x$$");
        assert_eq!(normalize("a $$$$ b"), "a  b");
        assert_eq!(normalize("a $$   $$ b"), "a  b");
    }

    #[test]
    fn adjacent_spans_never_make_four_dollars() {
        assert_eq!(normalize("$$a$$$$b$$"), "$$a$$ $$b$$");
        assert_eq!(normalize("$a$$b$"), "$a$ $b$");
        assert_eq!(normalize("α$x$"), "$\\alpha$ $x$");
    }

    #[test]
    fn currency_survives_rendering() {
        assert_eq!(normalize("costs $5 or $10"), "costs \\$5 or \\$10");
    }

    #[test]
    fn links_and_urls_are_protected() {
        let body = "[Σ docs](https://x.org/σ²) and https://example.com/α?x=$1";
        assert_eq!(normalize(body), "[$\\Sigma$ docs](https://x.org/σ²) and https://example.com/α?x=$1");
    }

    #[test]
    fn www_links_and_emails_are_protected() {
        assert_eq!(normalize("www.example.com/α"), "www.example.com/α");
        assert_eq!(normalize("email me@α.com"), "email me@α.com");
        assert_eq!(
            normalize("Write to σ@x or see www.x.org/σ²."),
            "Write to $\\sigma$@x or see www.x.org/σ²."
        );
    }

    #[test]
    fn raw_html_blocks_are_untouched() {
        let block = "<div class=\"eq\">\nσ² and E = mc2 cost $5\n</div>\n";
        let out = normalize(&format!("Before α.\n\n{block}\nAfter β."));
        assert!(out.contains(block), "{out}");
        assert!(out.starts_with("Before $\\alpha$"), "{out}");
        assert!(out.ends_with("After $\\beta$."), "{out}");

        let comment = "<!--\nE = mc2\n-->\n";
        assert_eq!(normalize(comment), comment);
    }

    #[test]
    fn lowercase_omicron_stays_greek() {
        assert_eq!(normalize("Greek: ο άνθρωπος"), "Greek: ο άνθρωπος");
    }

    #[test]
    fn bracketed_latex_in_context() {
        assert_eq!(
            normalize("We get [ \\nabla \\cdot E = \\rho ] so."),
            "We get $$\\nabla \\cdot E = \\rho$$ so."
        );
        let link = "See [\\LaTeX guide](guide.md).";
        assert_eq!(normalize(link), link);
    }

    #[test]
    fn rule_order_is_stable() {
        let names: Vec<_> = RULES.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            [
                "latin_lookalikes",
                "bracketed_latex",
                "famous_equations",
                "greek_letters",
                "unicode_scripts"
            ]
        );
    }

    #[test]
    fn idempotent_on_mixed_input() {
        let body = "α$x$2 \\ $y$ [\\beta] $$$$ E=mc^2 σ₁² `$` $ lone";
        let once = normalize(body);
        assert_eq!(normalize(&once), once);
    }
}
