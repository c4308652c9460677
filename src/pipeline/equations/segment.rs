//! Partitioning a body into code and prose, and prose into typed spans.
//!
//! ```text
//! body ──▶ split_code ──▶ Code  (fences, indented code, HTML blocks: verbatim)
//!                    └──▶ Prose ──▶ repair_dollars ──▶ tokenize ──▶ [Segment]
//! ```
//!
//! After tokenisation a text segment never contains a bare `$`: every dollar
//! either delimits math or has been escaped as `\$`.

use once_cell::sync::Lazy;
use regex::Regex;

/// One classified span of prose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Plain prose; the only kind the rules may rewrite.
    Text(String),
    /// Raw HTML, autolinks, link destinations, bare URLs and email
    /// addresses; emitted as-is.
    Protected(String),
    /// `$…$` math, stored without delimiters.
    Inline(String),
    /// `$$…$$` math, stored without delimiters.
    Display(String),
}

impl Segment {
    pub fn is_math(&self) -> bool {
        matches!(self, Segment::Inline(_) | Segment::Display(_))
    }
}

/// Append `seg`, merging adjacent text and dropping empty text.
pub(crate) fn push_segment(out: &mut Vec<Segment>, seg: Segment) {
    if let Segment::Text(text) = &seg {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Text(last)) = out.last_mut() {
            last.push_str(text);
            return;
        }
    }
    out.push(seg);
}

/// Collapse every whitespace run (newlines included) to one space and trim.
pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Code partition ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Chunk<'a> {
    Code(&'a str),
    Prose(&'a str),
}

/// Split `body` into code (fenced blocks, indented blocks, inline code
/// spans) and prose. Concatenating the chunks yields `body` again.
pub(crate) fn split_code(body: &str) -> Vec<Chunk<'_>> {
    let mut chunks = Vec::new();
    for block in split_blocks(body) {
        match block {
            Chunk::Prose(text) => split_inline_code(text, &mut chunks),
            code => chunks.push(code),
        }
    }
    chunks
}

/// Block-level partition only: fenced code, indented code and raw HTML
/// blocks versus everything else. Chunk boundaries always fall on line
/// starts.
pub(crate) fn split_blocks(body: &str) -> Vec<Chunk<'_>> {
    let mut chunks = Vec::new();
    let mut prose_start = 0;
    let mut pos = 0;
    // Start of input counts as following a blank line.
    let mut after_blank = true;
    let mut in_indented = false;

    while pos < body.len() {
        let line_end = next_line_end(body, pos);
        let line = body[pos..line_end].trim_end_matches('\n');

        if let Some(fence) = Fence::open(line) {
            let end = fence.block_end(body, line_end);
            push_prose(&mut chunks, &body[prose_start..pos]);
            chunks.push(Chunk::Code(&body[pos..end]));
            pos = end;
            prose_start = end;
            after_blank = true;
            in_indented = false;
            continue;
        }

        if let Some(html) = HtmlBlock::open(line, after_blank) {
            let end = html.block_end(body, pos);
            push_prose(&mut chunks, &body[prose_start..pos]);
            chunks.push(Chunk::Code(&body[pos..end]));
            pos = end;
            prose_start = end;
            after_blank = false;
            in_indented = false;
            continue;
        }

        let blank = line.trim().is_empty();
        if !blank && is_indented(line) && (after_blank || in_indented) {
            push_prose(&mut chunks, &body[prose_start..pos]);
            chunks.push(Chunk::Code(&body[pos..line_end]));
            prose_start = line_end;
            in_indented = true;
        } else {
            in_indented = false;
        }
        after_blank = blank;
        pos = line_end;
    }
    push_prose(&mut chunks, &body[prose_start..]);
    chunks
}

fn push_prose<'a>(chunks: &mut Vec<Chunk<'a>>, text: &'a str) {
    if !text.is_empty() {
        chunks.push(Chunk::Prose(text));
    }
}

/// Byte offset just past the `\n` ending the line at `pos` (or end of input).
fn next_line_end(text: &str, pos: usize) -> usize {
    text[pos..].find('\n').map_or(text.len(), |i| pos + i + 1)
}

pub(crate) fn is_indented(line: &str) -> bool {
    line.starts_with("    ") || line.starts_with('\t')
}

struct Fence {
    ch: char,
    len: usize,
}

impl Fence {
    /// Recognise an opening fence: up to three spaces, then three or more
    /// backticks or tildes. A backtick fence's info string may not contain
    /// a backtick.
    fn open(line: &str) -> Option<Fence> {
        let rest = strip_fence_indent(line)?;
        let ch = rest.chars().next()?;
        if ch != '`' && ch != '~' {
            return None;
        }
        let len = rest.len() - rest.trim_start_matches(ch).len();
        if len < 3 || (ch == '`' && rest[len..].contains('`')) {
            return None;
        }
        Some(Fence { ch, len })
    }

    fn closes(&self, line: &str) -> bool {
        let Some(rest) = strip_fence_indent(line) else {
            return false;
        };
        let run = rest.len() - rest.trim_start_matches(self.ch).len();
        run >= self.len && rest[run..].trim().is_empty()
    }

    /// End offset of the block whose content starts at `from`: just past
    /// the closing fence line, or end of input for an unclosed fence.
    fn block_end(&self, body: &str, from: usize) -> usize {
        let mut pos = from;
        while pos < body.len() {
            let line_end = next_line_end(body, pos);
            if self.closes(body[pos..line_end].trim_end_matches('\n')) {
                return line_end;
            }
            pos = line_end;
        }
        body.len()
    }
}

/// A raw HTML block, classified by what ends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HtmlBlock {
    /// Ends on the line containing this (lowercase) marker.
    Marker(&'static str),
    /// Ends before the next blank line.
    BlankLine,
}

static RE_HTML_RAW_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^ {0,3}<(pre|script|style|textarea)(?:\s|>|$)").unwrap());

static RE_HTML_BLOCK_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^ {0,3}</?(?:address|article|aside|blockquote|body|caption|center|col|colgroup|dd|details|dialog|dir|div|dl|dt|fieldset|figcaption|figure|footer|form|frame|frameset|h[1-6]|head|header|hr|html|iframe|legend|li|link|main|menu|menuitem|nav|noframes|ol|optgroup|option|p|param|search|section|summary|table|tbody|td|tfoot|th|thead|title|tr|track|ul)(?:\s|/?>|$)",
    )
    .unwrap()
});

/// A line holding nothing but one complete open or close tag.
static RE_HTML_LONE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^ {0,3}(?:<[A-Za-z][A-Za-z0-9-]*(?:\s+[A-Za-z_:][\w.:-]*(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*\s*/?>|</[A-Za-z][A-Za-z0-9-]*\s*>)\s*$"#,
    )
    .unwrap()
});

impl HtmlBlock {
    /// Recognise the first line of an HTML block. A lone tag of an unknown
    /// element only starts a block after a blank line; everything else may
    /// interrupt a paragraph.
    fn open(line: &str, after_blank: bool) -> Option<HtmlBlock> {
        if let Some(caps) = RE_HTML_RAW_OPEN.captures(line) {
            let marker = match caps[1].to_ascii_lowercase().as_str() {
                "pre" => "</pre>",
                "script" => "</script>",
                "style" => "</style>",
                _ => "</textarea>",
            };
            return Some(HtmlBlock::Marker(marker));
        }

        let rest = strip_fence_indent(line)?;
        if rest.starts_with("<!--") {
            return Some(HtmlBlock::Marker("-->"));
        }
        if rest.starts_with("<?") {
            return Some(HtmlBlock::Marker("?>"));
        }
        if rest.starts_with("<![CDATA[") {
            return Some(HtmlBlock::Marker("]]>"));
        }
        if rest.starts_with("<!") && rest[2..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Some(HtmlBlock::Marker(">"));
        }
        if RE_HTML_BLOCK_TAG.is_match(line) || (after_blank && RE_HTML_LONE_TAG.is_match(line)) {
            return Some(HtmlBlock::BlankLine);
        }
        None
    }

    /// End offset of the block whose first line starts at `from`. An
    /// unterminated block runs to the end of input.
    fn block_end(self, body: &str, from: usize) -> usize {
        let mut pos = from;
        while pos < body.len() {
            let line_end = next_line_end(body, pos);
            let line = &body[pos..line_end];
            match self {
                HtmlBlock::Marker(marker) => {
                    if line.to_ascii_lowercase().contains(marker) {
                        return line_end;
                    }
                }
                HtmlBlock::BlankLine => {
                    if line.trim().is_empty() {
                        return pos;
                    }
                }
            }
            pos = line_end;
        }
        body.len()
    }
}

fn strip_fence_indent(line: &str) -> Option<&str> {
    let rest = line.trim_start_matches(' ');
    (line.len() - rest.len() <= 3).then_some(rest)
}

/// Split inline code spans out of a prose block.
///
/// A run of n backticks opens a span closed by the next run of exactly n
/// backticks in the same paragraph; an unmatched run is literal text.
fn split_inline_code<'a>(text: &'a str, chunks: &mut Vec<Chunk<'a>>) {
    let bytes = text.as_bytes();
    let mut prose_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => {
                let run = backtick_run(bytes, i);
                match closing_run(text, i + run, run) {
                    Some(end) => {
                        push_prose(chunks, &text[prose_start..i]);
                        chunks.push(Chunk::Code(&text[i..end]));
                        i = end;
                        prose_start = end;
                    }
                    None => i += run,
                }
            }
            _ => i += 1,
        }
    }
    push_prose(chunks, &text[prose_start.min(text.len())..]);
}

fn backtick_run(bytes: &[u8], from: usize) -> usize {
    bytes[from..].iter().take_while(|&&b| b == b'`').count()
}

fn closing_run(text: &str, from: usize, run: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut j = from;
    while j < bytes.len() {
        match bytes[j] {
            b'`' => {
                let len = backtick_run(bytes, j);
                if len == run {
                    return Some(j + len);
                }
                j += len;
            }
            b'\n' if starts_blank_line(&text[j + 1..]) => return None,
            _ => j += 1,
        }
    }
    None
}

fn starts_blank_line(rest: &str) -> bool {
    rest.split('\n').next().is_some_and(|line| line.trim().is_empty())
}

// ── Dollar repair ────────────────────────────────────────────────────────────

/// Clean up delimiter artefacts left by earlier tooling.
///
/// `\$$` loses its backslash, and runs of three or of five and more dollars
/// become `$$`. Runs of four are kept: they tokenise as an empty display
/// span, which is dropped. Escape pairs are skipped, so `\\$$` is untouched.
pub(crate) fn repair_dollars(prose: &str) -> String {
    let mut out = String::with_capacity(prose.len());
    let mut i = 0;

    while i < prose.len() {
        let rest = &prose[i..];
        if rest.starts_with("\\$$") {
            i += 1;
        } else if rest.starts_with('\\') {
            let len = escape_len(rest);
            out.push_str(&rest[..len]);
            i += len;
        } else if rest.starts_with('$') {
            let run = rest.len() - rest.trim_start_matches('$').len();
            if run == 3 || run >= 5 {
                out.push_str("$$");
            } else {
                out.push_str(&rest[..run]);
            }
            i += run;
        } else {
            let len = rest.chars().next().map_or(1, char::len_utf8);
            out.push_str(&rest[..len]);
            i += len;
        }
    }
    out
}

/// Byte length of the escape pair at the start of `rest` (which starts with `\`).
fn escape_len(rest: &str) -> usize {
    1 + rest[1..].chars().next().map_or(0, char::len_utf8)
}

// ── Tokeniser ────────────────────────────────────────────────────────────────

static RE_HTML: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^<(?:!--[\s\S]*?-->|/?[A-Za-z][A-Za-z0-9-]*(?:\s[^<>]*)?/?>|[A-Za-z][A-Za-z0-9+.-]{1,31}:[^\s<>]*>|[^\s<>@]+@[^\s<>@]+>)"#,
    )
    .unwrap()
});

static RE_LINK_DESTINATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\]\((?:[^()\s]|\([^()\s]*\))*(?:[ \t]+(?:"[^"\n]*"|'[^'\n]*'))?\)"#).unwrap()
});

static RE_BARE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^https?://[^\s<>()\[\]"'`]+"#).unwrap());

static RE_WWW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^www\.[^\s<>()\[\]"'`]+"#).unwrap());

static RE_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[\w-]+(?:\.[\w-]+)+").unwrap());

/// Classify prose into text, protected spans and existing math.
///
/// Dollars that do not delimit math are emitted escaped. Empty display
/// spans are dropped and math content is whitespace-collapsed.
pub(crate) fn tokenize(prose: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    while i < prose.len() {
        let rest = &prose[i..];
        let Some(c) = rest.chars().next() else {
            break;
        };

        match c {
            '\\' => {
                let len = escape_len(rest);
                text.push_str(&rest[..len]);
                i += len;
            }
            '$' if rest.starts_with("$$") => match find_unescaped(&rest[2..], "$$") {
                Some(end) => {
                    let content = collapse_whitespace(&rest[2..2 + end]);
                    if !content.is_empty() {
                        flush(&mut out, &mut text);
                        out.push(Segment::Display(content));
                    }
                    i += 2 + end + 2;
                }
                None => {
                    text.push_str("\\$\\$");
                    i += 2;
                }
            },
            '$' => match inline_close(rest) {
                Some(end) => {
                    flush(&mut out, &mut text);
                    out.push(Segment::Inline(collapse_whitespace(&rest[1..end])));
                    i += end + 1;
                }
                None => {
                    text.push_str("\\$");
                    i += 1;
                }
            },
            '<' | ']' => {
                let re = if c == '<' { &RE_HTML } else { &RE_LINK_DESTINATION };
                match re.find(rest) {
                    Some(m) => {
                        flush(&mut out, &mut text);
                        out.push(Segment::Protected(m.as_str().to_string()));
                        i += m.end();
                    }
                    None => {
                        text.push(c);
                        i += 1;
                    }
                }
            }
            _ if c.is_ascii_alphanumeric() => {
                match autolink_len(rest, starts_word(prose, i)) {
                    Some(len) => {
                        flush(&mut out, &mut text);
                        out.push(Segment::Protected(rest[..len].to_string()));
                        i += len;
                    }
                    None => {
                        text.push(c);
                        i += 1;
                    }
                }
            }
            _ => {
                text.push(c);
                i += c.len_utf8();
            }
        }
    }
    flush(&mut out, &mut text);
    out
}

fn starts_word(prose: &str, i: usize) -> bool {
    !prose[..i].ends_with(|p: char| p.is_alphanumeric() || p == '_')
}

/// Length of a bare URL, `www.` link or email address at the start of
/// `rest`, without trailing sentence punctuation. `www.` links and email
/// addresses only start at a word boundary.
fn autolink_len(rest: &str, word_start: bool) -> Option<usize> {
    let m = RE_BARE_URL.find(rest).or_else(|| {
        if !word_start {
            return None;
        }
        RE_WWW.find(rest).or_else(|| RE_EMAIL.find(rest))
    })?;
    let len = m
        .as_str()
        .trim_end_matches(['.', ',', ';', ':', '!', '?'])
        .len();
    (len > 0).then_some(len)
}

fn flush(out: &mut Vec<Segment>, text: &mut String) {
    push_segment(out, Segment::Text(std::mem::take(text)));
}

/// Offset of the first `needle` in `s` that is not part of an escape pair.
fn find_unescaped(s: &str, needle: &str) -> Option<usize> {
    let mut i = 0;
    while i < s.len() {
        let rest = &s[i..];
        if rest.starts_with('\\') {
            i += escape_len(rest);
        } else if rest.starts_with(needle) {
            return Some(i);
        } else {
            i += rest.chars().next().map_or(1, char::len_utf8);
        }
    }
    None
}

/// Offset of the `$` closing the inline span opened at the start of `rest`.
///
/// The opener must be followed by non-whitespace; the closer must be on the
/// same line, preceded by non-whitespace and not followed by an ASCII digit.
fn inline_close(rest: &str) -> Option<usize> {
    let first = rest[1..].chars().next()?;
    if first.is_whitespace() {
        return None;
    }

    let mut prev = '$';
    let mut i = 1;
    while i < rest.len() {
        let tail = &rest[i..];
        let c = tail.chars().next()?;
        match c {
            '\n' => return None,
            '\\' => {
                let len = escape_len(tail);
                prev = tail[..len].chars().last().unwrap_or('\\');
                i += len;
                continue;
            }
            '$' if i > 1
                && !prev.is_whitespace()
                && !tail[1..].starts_with(|d: char| d.is_ascii_digit()) =>
            {
                return Some(i);
            }
            _ => {}
        }
        prev = c;
        i += c.len_utf8();
    }
    None
}
