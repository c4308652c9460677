//! Document identity: the ordered list of URL path segments a page is
//! published under, and the page tier derived from its depth.

use crate::error::PublishError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered, validated URL path segments identifying one document.
///
/// `["science", "physics", "quantum"]` is published at
/// `/science/physics/quantum/` and read from
/// `<root>/science/physics/quantum.md`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(Vec<String>);

impl Slug {
    /// Validate and wrap a list of segments.
    ///
    /// Rejects an empty list, empty segments, `.` / `..`, and segments that
    /// contain a path separator: any of these could escape the content root.
    pub fn new<I, S>(segments: I) -> Result<Self, PublishError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        let joined = segments.join("/");
        let invalid = |reason: String| PublishError::InvalidSlug {
            slug: joined.clone(),
            reason,
        };

        if segments.is_empty() {
            return Err(invalid("slug has no segments".into()));
        }
        for seg in &segments {
            if seg.is_empty() {
                return Err(invalid("empty segment".into()));
            }
            if seg == "." || seg == ".." {
                return Err(invalid(format!("segment '{seg}' is not allowed")));
            }
            if seg.contains(['/', '\\', '\0']) {
                return Err(invalid(format!("segment '{seg}' contains a path separator")));
            }
        }
        Ok(Self(segments))
    }

    /// Parse a `/`-separated path such as `science/physics/quantum`.
    ///
    /// Leading and trailing slashes are ignored.
    pub fn parse(path: &str) -> Result<Self, PublishError> {
        Self::new(path.trim_matches('/').split('/'))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Segments joined with `/`, no leading slash.
    pub fn join(&self) -> String {
        self.0.join("/")
    }

    /// The page tier for this slug.
    pub fn page_kind(&self) -> PageKind {
        PageKind::from_depth(self.depth())
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join())
    }
}

impl AsRef<[String]> for Slug {
    fn as_ref(&self) -> &[String] {
        &self.0
    }
}

/// Tier of a page, derived purely from slug depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    /// Depth 1: a top-level domain such as `science`.
    Section,
    /// Depth 2: a category such as `science/physics`.
    Subsection,
    /// Depth 3 and deeper: a topic page or leaf article.
    Article,
}

impl PageKind {
    pub fn from_depth(depth: usize) -> Self {
        match depth {
            0 | 1 => PageKind::Section,
            2 => PageKind::Subsection,
            _ => PageKind::Article,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_kind_tiers() {
        let kind = |s: &str| Slug::parse(s).unwrap().page_kind();
        assert_eq!(kind("science"), PageKind::Section);
        assert_eq!(kind("science/physics"), PageKind::Subsection);
        assert_eq!(kind("science/physics/quantum"), PageKind::Article);
        assert_eq!(kind("science/physics/quantum/pauli"), PageKind::Article);
    }

    #[test]
    fn parse_trims_slashes() {
        let slug = Slug::parse("/science/physics/").unwrap();
        assert_eq!(slug.segments(), ["science", "physics"]);
        assert_eq!(slug.to_string(), "science/physics");
    }

    #[test]
    fn rejects_traversal_and_empties() {
        assert!(Slug::parse("").is_err());
        assert!(Slug::parse("a//b").is_err());
        assert!(Slug::new(["a", ".."]).is_err());
        assert!(Slug::new(["a\\b"]).is_err());
        assert!(Slug::new(Vec::<String>::new()).is_err());
    }

    #[test]
    fn serialises_as_array() {
        let slug = Slug::parse("a/b").unwrap();
        assert_eq!(serde_json::to_string(&slug).unwrap(), r#"["a","b"]"#);
        assert_eq!(
            serde_json::to_string(&PageKind::Subsection).unwrap(),
            r#""subsection""#
        );
    }
}
