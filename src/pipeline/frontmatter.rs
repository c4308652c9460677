//! Front matter: split a raw source file into typed [`Metadata`] and a body.
//!
//! Articles open with a YAML block fenced by `---` lines. Authors (and the
//! research bot that drafts most articles) write it by hand, so nothing in
//! here is allowed to fail: a malformed block is logged and ignored, odd
//! values are passed through as strings, and the body is always returned.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_yaml::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A source file split into metadata and Markdown body.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub metadata: Metadata,
    pub body: String,
}

/// Front-matter values with a closed set of well-known keys and an open
/// bucket for everything else.
///
/// Serialises to one flat JSON object using the authors' key spelling
/// (`topic-slug`, `researcher_version`, …); dates become ISO-8601 strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(rename = "topic-slug", skip_serializing_if = "Option::is_none")]
    pub topic_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "category-slug", skip_serializing_if = "Option::is_none")]
    pub category_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(rename = "domain-slug", skip_serializing_if = "Option::is_none")]
    pub domain_slug: Option<String>,
    #[serde(rename = "article-slug", skip_serializing_if = "Option::is_none")]
    pub article_slug: Option<String>,
    #[serde(
        serialize_with = "serialize_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub researcher_version: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub github_issue_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub github_pr_ids: Vec<String>,
    /// Author-defined keys, passed through.
    #[serde(flatten)]
    pub extra: BTreeMap<String, MetaValue>,
}

/// A pass-through front-matter value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Text(String),
    List(Vec<String>),
    Date(DateTime<Utc>),
}

impl Serialize for MetaValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetaValue::Text(s) => serializer.serialize_str(s),
            MetaValue::List(items) => items.serialize(serializer),
            MetaValue::Date(d) => serializer.serialize_str(&to_iso(d)),
        }
    }
}

fn serialize_date<S: Serializer>(
    date: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match date {
        Some(d) => serializer.serialize_str(&to_iso(d)),
        None => serializer.serialize_none(),
    }
}

impl Metadata {
    /// Heading for the page: `article`, then `title`, then `"Untitled"`.
    pub fn display_title(&self) -> &str {
        self.article
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or("Untitled")
    }

    pub fn is_empty(&self) -> bool {
        *self == Metadata::default()
    }

    /// Route one key/value pair to its typed field or to `extra`.
    fn insert(&mut self, key: String, value: MetaValue) {
        let slot = match key.as_str() {
            "title" => &mut self.title,
            "article" => &mut self.article,
            "topic" => &mut self.topic,
            "topic-slug" => &mut self.topic_slug,
            "category" => &mut self.category,
            "category-slug" => &mut self.category_slug,
            "domain" => &mut self.domain,
            "domain-slug" => &mut self.domain_slug,
            "article-slug" => &mut self.article_slug,
            "model" => &mut self.model,
            "researcher_version" => &mut self.researcher_version,
            "created" => {
                match &value {
                    MetaValue::Text(s) => match parse_date(s) {
                        Some(d) => self.created = Some(d),
                        None => {
                            warn!("Unparseable 'created' date {:?}; kept as text", s);
                            self.extra.insert(key, value);
                        }
                    },
                    _ => {
                        warn!("'created' is not a scalar; kept as-is");
                        self.extra.insert(key, value);
                    }
                }
                return;
            }
            "github_issue_ids" => {
                self.github_issue_ids = value.into_list();
                return;
            }
            "github_pr_ids" => {
                self.github_pr_ids = value.into_list();
                return;
            }
            _ => {
                self.extra.insert(key, value.detect_date());
                return;
            }
        };

        match value {
            MetaValue::Text(s) => *slot = Some(s),
            other => {
                debug!("Front-matter key '{}' is not a scalar; passed through", key);
                self.extra.insert(key, other);
            }
        }
    }
}

impl MetaValue {
    fn into_list(self) -> Vec<String> {
        match self {
            MetaValue::Text(s) => vec![s],
            MetaValue::List(items) => items,
            MetaValue::Date(d) => vec![to_iso(&d)],
        }
    }

    fn detect_date(self) -> Self {
        match self {
            MetaValue::Text(s) => match parse_date(&s) {
                Some(d) => MetaValue::Date(d),
                None => MetaValue::Text(s),
            },
            MetaValue::List(items) => MetaValue::List(
                items
                    .into_iter()
                    .map(|s| parse_date(&s).map(|d| to_iso(&d)).unwrap_or(s))
                    .collect(),
            ),
            date => date,
        }
    }
}

/// Split `raw` into metadata and body. Never fails.
pub fn parse_document(raw: &str) -> ParsedDocument {
    let raw = raw.strip_prefix('\u{FEFF}').unwrap_or(raw);
    let text = raw.replace("\r\n", "\n").replace('\r', "\n");

    match split_front_matter(&text) {
        Some((yaml, body)) => ParsedDocument {
            metadata: parse_metadata(yaml),
            body: body.to_string(),
        },
        None => ParsedDocument {
            metadata: Metadata::default(),
            body: text,
        },
    }
}

/// Locate a `---` … `---` block at the very top of `text`.
///
/// Returns `(yaml, body)`; `None` when the text has no front matter or the
/// block is never closed.
fn split_front_matter(text: &str) -> Option<(&str, &str)> {
    let first_end = text.find('\n')?;
    if text[..first_end].trim_end() != "---" {
        return None;
    }
    let rest = &text[first_end + 1..];

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let marker = line.trim_end();
        if marker == "---" || marker == "..." {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

fn parse_metadata(yaml: &str) -> Metadata {
    if yaml.trim().is_empty() {
        return Metadata::default();
    }

    let mapping = match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Mapping(m)) => m,
        Ok(Value::Null) => return Metadata::default(),
        Ok(_) => {
            warn!("Front matter is not a key/value mapping; ignored");
            return Metadata::default();
        }
        Err(e) => {
            warn!("Malformed front matter ignored: {}", e);
            return Metadata::default();
        }
    };

    let mut metadata = Metadata::default();
    for (key, value) in mapping {
        let key = scalar_text(key).unwrap_or_default();
        if key.is_empty() {
            continue;
        }
        if let Some(value) = convert_value(value) {
            metadata.insert(key, value);
        }
    }
    metadata
}

fn convert_value(value: Value) -> Option<MetaValue> {
    match value {
        Value::Sequence(items) => Some(MetaValue::List(
            items.into_iter().filter_map(scalar_text).collect(),
        )),
        Value::Tagged(tagged) => convert_value(tagged.value),
        other => scalar_text(other).map(MetaValue::Text),
    }
}

/// String form of a YAML value; `None` for null.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s),
        Value::Tagged(tagged) => scalar_text(tagged.value),
        nested => serde_yaml::to_string(&nested)
            .ok()
            .map(|s| s.trim_end().to_string()),
    }
}

/// Parse a front-matter date.
///
/// A bare `YYYY-MM-DD` is midnight UTC; timestamps are RFC 3339, and a
/// timestamp without an offset is taken as UTC.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.len() < 10 || !s.as_bytes()[0].is_ascii_digit() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

/// ISO-8601 instant with millisecond precision, e.g. `2024-03-01T00:00:00.000Z`.
pub fn to_iso(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = "---\n\
article: Pauli Exclusion Principle\n\
domain: Science\n\
domain-slug: science\n\
category-slug: physics\n\
created: 2024-03-01\n\
model: gpt-5\n\
researcher_version: 1.4\n\
github_issue_ids: [12, 15]\n\
reviewed: 2024-04-02T10:30:00Z\n\
tags:\n  - quantum\n  - fermions\n\
---\n\
# Pauli\n\nBody text.\n";

    #[test]
    fn splits_metadata_and_body() {
        let doc = parse_document(ARTICLE);
        assert_eq!(doc.body, "# Pauli\n\nBody text.\n");
        let m = &doc.metadata;
        assert_eq!(m.article.as_deref(), Some("Pauli Exclusion Principle"));
        assert_eq!(m.domain_slug.as_deref(), Some("science"));
        assert_eq!(m.researcher_version.as_deref(), Some("1.4"));
        assert_eq!(m.github_issue_ids, vec!["12", "15"]);
        assert_eq!(
            m.extra.get("tags"),
            Some(&MetaValue::List(vec!["quantum".into(), "fermions".into()]))
        );
    }

    #[test]
    fn bare_date_is_midnight_utc() {
        let doc = parse_document(ARTICLE);
        let created = doc.metadata.created.expect("created parsed");
        assert_eq!(to_iso(&created), "2024-03-01T00:00:00.000Z");
    }

    #[test]
    fn timestamp_variants_are_utc() {
        let iso = |s: &str| parse_date(s).map(|d| to_iso(&d));
        assert_eq!(iso("2024-04-02T10:30:00Z").as_deref(), Some("2024-04-02T10:30:00.000Z"));
        assert_eq!(iso("2024-04-02T12:30:00+02:00").as_deref(), Some("2024-04-02T10:30:00.000Z"));
        assert_eq!(iso("2024-04-02T10:30:00").as_deref(), Some("2024-04-02T10:30:00.000Z"));
        assert_eq!(iso("2024-04-02 10:30:00").as_deref(), Some("2024-04-02T10:30:00.000Z"));
        assert_eq!(iso("yesterday"), None);
        assert_eq!(iso("2024-13-45"), None);
    }

    #[test]
    fn serialises_dates_as_iso_strings() {
        let doc = parse_document(ARTICLE);
        let json = serde_json::to_value(&doc.metadata).unwrap();
        assert_eq!(json["created"], "2024-03-01T00:00:00.000Z");
        assert_eq!(json["reviewed"], "2024-04-02T10:30:00.000Z");
        assert_eq!(json["domain-slug"], "science");
        assert!(json.get("title").is_none(), "absent keys are omitted");
    }

    #[test]
    fn missing_block_yields_empty_metadata() {
        let doc = parse_document("# Just a heading\n");
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, "# Just a heading\n");
    }

    #[test]
    fn unclosed_block_is_body() {
        let raw = "---\ntitle: x\nno closing fence";
        let doc = parse_document(raw);
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, raw);
    }

    #[test]
    fn malformed_yaml_is_ignored() {
        let doc = parse_document("---\ntitle: [unclosed\n---\nBody\n");
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, "Body\n");
    }

    #[test]
    fn non_mapping_yaml_is_ignored() {
        let doc = parse_document("---\n- a\n- b\n---\nBody\n");
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, "Body\n");
    }

    #[test]
    fn bad_created_passes_through_as_text() {
        let doc = parse_document("---\ncreated: sometime in May\n---\n");
        assert_eq!(doc.metadata.created, None);
        assert_eq!(
            doc.metadata.extra.get("created"),
            Some(&MetaValue::Text("sometime in May".into()))
        );
    }

    #[test]
    fn crlf_and_bom_are_normalised() {
        let doc = parse_document("\u{FEFF}---\r\ntitle: Hello\r\n---\r\nLine one\r\nLine two\r\n");
        assert_eq!(doc.metadata.title.as_deref(), Some("Hello"));
        assert_eq!(doc.body, "Line one\nLine two\n");
    }

    #[test]
    fn scalar_issue_id_becomes_list() {
        let doc = parse_document("---\ngithub_pr_ids: 7\n---\n");
        assert_eq!(doc.metadata.github_pr_ids, vec!["7"]);
    }

    #[test]
    fn display_title_fallbacks() {
        let mut m = Metadata::default();
        assert_eq!(m.display_title(), "Untitled");
        m.title = Some("Title".into());
        assert_eq!(m.display_title(), "Title");
        m.article = Some("Article".into());
        assert_eq!(m.display_title(), "Article");
    }

    #[test]
    fn null_values_are_absent() {
        let doc = parse_document("---\ntopic: ~\nextra_key:\n---\n");
        assert!(doc.metadata.is_empty());
    }
}
