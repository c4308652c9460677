//! The rewrite rules, one function per heuristic.
//!
//! Every rule maps a run of plain text to a sequence of segments: the text
//! it left alone plus the math it recognised. Rules never see code,
//! protected spans or existing math.

use super::segment::{collapse_whitespace, Segment};
use super::tables::{self, FAMOUS_EQUATIONS};
use once_cell::sync::Lazy;
use regex::Regex;

/// Split `text` around every match reported by `next_match`.
///
/// `next_match(text, from)` returns the first accepted `(start, end,
/// segment)` at or after byte offset `from`. Matches must be non-empty.
fn split_on<F>(text: &str, mut next_match: F) -> Vec<Segment>
where
    F: FnMut(&str, usize) -> Option<(usize, usize, Segment)>,
{
    let mut out = Vec::new();
    let mut cursor = 0;
    while cursor < text.len() {
        let Some((start, end, seg)) = next_match(text, cursor) else {
            break;
        };
        if start > cursor {
            out.push(Segment::Text(text[cursor..start].to_string()));
        }
        out.push(seg);
        cursor = end;
    }
    if cursor < text.len() {
        out.push(Segment::Text(text[cursor..].to_string()));
    }
    out
}

fn char_before(text: &str, idx: usize) -> Option<char> {
    text[..idx].chars().next_back()
}

fn char_at(text: &str, idx: usize) -> Option<char> {
    text[idx..].chars().next()
}

/// A preceding character that glues a candidate to the word before it.
fn attached_before(c: Option<char>) -> bool {
    c.is_some_and(|c| c.is_alphanumeric() || c == '\\')
}

fn attached_after(c: Option<char>) -> bool {
    c.is_some_and(char::is_alphanumeric)
}

/// Read a run of Unicode super/subscripts starting at `from`.
///
/// Returns the TeX suffix (`^2`, `_{12}`, `^{+}_1`, …) and the offset just
/// past the run; braces are used only for multi-character scripts.
fn read_scripts(text: &str, from: usize) -> (String, usize) {
    let mut sup = String::new();
    let mut sub = String::new();
    let mut end = from;
    for c in text[from..].chars() {
        if let Some(d) = tables::superscript(c) {
            sup.push(d);
        } else if let Some(d) = tables::subscript(c) {
            sub.push(d);
        } else {
            break;
        }
        end += c.len_utf8();
    }

    let mut tex = String::new();
    for (marker, script) in [('^', &sup), ('_', &sub)] {
        if script.is_empty() {
            continue;
        }
        tex.push(marker);
        if script.chars().count() > 1 {
            tex.push('{');
            tex.push_str(script);
            tex.push('}');
        } else {
            tex.push_str(script);
        }
    }
    (tex, end)
}

// ── Greek lookalikes ─────────────────────────────────────────────────────────

/// Replace standalone Greek capitals that look Latin (`Α`, `Β`, …) with the
/// Latin letter.
///
/// Runs first so that the other rules see `E = mc²` even when the `E` was
/// typed as a capital epsilon.
pub fn latin_lookalikes(text: &str) -> Vec<Segment> {
    if !text.chars().any(|c| tables::latin_lookalike(c).is_some()) {
        return vec![Segment::Text(text.to_string())];
    }

    let mut out = String::with_capacity(text.len());
    for (idx, c) in text.char_indices() {
        match tables::latin_lookalike(c) {
            Some(latin) if is_standalone(text, idx, c) => out.push(latin),
            _ => out.push(c),
        }
    }
    vec![Segment::Text(out)]
}

/// A letter with no letter or digit on either side, trailing scripts aside.
fn is_standalone(text: &str, idx: usize, c: char) -> bool {
    if attached_before(char_before(text, idx)) {
        return false;
    }
    let (_, end) = read_scripts(text, idx + c.len_utf8());
    !attached_after(char_at(text, end))
}

// ── Rule a: bracketed LaTeX ──────────────────────────────────────────────────

static RE_BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\?\[([^\[\]$`]*?)\\?\]").unwrap());

static RE_COMMAND: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\[A-Za-z]+").unwrap());

static RE_DRIVE_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Za-z]:\\").unwrap());

/// `[ … \cmd … ]` and `\[ … \]` become display math.
///
/// Link syntax is left alone: the bracket may not be preceded by `!` or
/// followed by `(`, `[` or `:`, and may not contain a URL or a drive path.
pub fn bracketed_latex(text: &str) -> Vec<Segment> {
    split_on(text, |text, from| {
        let mut at = from;
        while at < text.len() {
            let caps = RE_BRACKETED.captures(&text[at..])?;
            let whole = caps.get(0)?;
            let content = caps.get(1)?.as_str();
            let (start, end) = (at + whole.start(), at + whole.end());

            if bracket_is_math(text, start, end, content) {
                let display = Segment::Display(collapse_whitespace(content));
                return Some((start, end, display));
            }
            at = start + if whole.as_str().starts_with('\\') { 2 } else { 1 };
        }
        None
    })
}

fn bracket_is_math(text: &str, start: usize, end: usize, content: &str) -> bool {
    RE_COMMAND.is_match(content)
        && !content.contains("://")
        && !RE_DRIVE_PATH.is_match(content)
        && char_before(text, start) != Some('!')
        && !matches!(char_at(text, end), Some('(' | '[' | ':'))
}

// ── Rule b: famous equations ─────────────────────────────────────────────────

/// Well-known equations typed as prose become inline math in canonical TeX.
pub fn famous_equations(text: &str) -> Vec<Segment> {
    split_on(text, |text, from| {
        FAMOUS_EQUATIONS
            .iter()
            .filter_map(|(re, tex)| {
                first_whole_word(re, text, from).map(|(s, e)| (s, e, *tex))
            })
            .min_by_key(|&(start, _, _)| start)
            .map(|(start, end, tex)| (start, end, Segment::Inline(tex.to_string())))
    })
}

/// First match of `re` at or after `from` that is not glued to a
/// neighbouring word.
fn first_whole_word(re: &Regex, text: &str, from: usize) -> Option<(usize, usize)> {
    let mut at = from;
    while at < text.len() {
        let m = re.find(&text[at..])?;
        let (start, end) = (at + m.start(), at + m.end());
        if !attached_before(char_before(text, start)) && !attached_after(char_at(text, end)) {
            return Some((start, end));
        }
        at = start + char_at(text, start).map_or(1, char::len_utf8);
    }
    None
}

// ── Rule c: Greek letters ────────────────────────────────────────────────────

/// A standalone Greek letter becomes `$\name$`, folding in trailing
/// super/subscripts (`σ²` → `$\sigma^2$`).
pub fn greek_letters(text: &str) -> Vec<Segment> {
    split_on(text, |text, from| {
        for (offset, c) in text[from..].char_indices() {
            let start = from + offset;
            let Some(name) = tables::greek_command(c) else {
                continue;
            };
            if attached_before(char_before(text, start)) {
                continue;
            }
            let (scripts, end) = read_scripts(text, start + c.len_utf8());
            if attached_after(char_at(text, end)) {
                continue;
            }
            return Some((start, end, Segment::Inline(format!("\\{name}{scripts}"))));
        }
        None
    })
}

// ── Rule d: Unicode scripts ──────────────────────────────────────────────────

/// A standalone Latin letter followed by Unicode super/subscripts becomes
/// inline math (`x²` → `$x^2$`, `y₁₂` → `$y_{12}$`).
pub fn unicode_scripts(text: &str) -> Vec<Segment> {
    split_on(text, |text, from| {
        for (offset, c) in text[from..].char_indices() {
            let start = from + offset;
            if !c.is_ascii_alphabetic() || attached_before(char_before(text, start)) {
                continue;
            }
            let (scripts, end) = read_scripts(text, start + 1);
            if scripts.is_empty() || attached_after(char_at(text, end)) {
                continue;
            }
            return Some((start, end, Segment::Inline(format!("{c}{scripts}"))));
        }
        None
    })
}
