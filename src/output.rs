//! Result types handed to the publishing layer.
//!
//! Everything here is `Serialize` so a build can be shipped as JSON: dates
//! inside [`Metadata`] are already ISO-8601 strings at that point.

use crate::pipeline::frontmatter::Metadata;
use crate::slug::{PageKind, Slug};
use serde::Serialize;
use std::path::PathBuf;

/// One finished document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembledDocument {
    pub slug: Slug,
    pub metadata: Metadata,
    /// Render-safe HTML fragment (no `<html>`/`<body>` wrapper).
    pub html: String,
    pub page_kind: PageKind,
    /// True when the markup engine failed and `html` is the escaped source
    /// inside a `<pre>` block.
    pub render_fallback: bool,
    /// Image files from the `img/` directory beside the source, to be
    /// published under `/<slug>/img/`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<PathBuf>,
}

/// A document that could not be assembled during a site build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentFailure {
    pub slug: String,
    pub error: String,
}

/// Aggregate numbers for a site build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Slugs found by enumeration.
    pub total_documents: usize,
    /// Documents that produced HTML (including fallbacks).
    pub rendered: usize,
    /// Documents whose HTML is the escaped-source fallback.
    pub fallbacks: usize,
    /// Documents that could not be read.
    pub failed: usize,
    /// Image files copied by [`crate::site::build_site_to_file`].
    pub images_copied: usize,
    pub total_duration_ms: u64,
}

/// Everything produced by [`crate::site::build_site`].
#[derive(Debug, Clone, Serialize)]
pub struct SiteOutput {
    /// Sorted by slug.
    pub documents: Vec<AssembledDocument>,
    /// Sorted by slug.
    pub failures: Vec<DocumentFailure>,
    pub stats: BuildStats,
}

impl SiteOutput {
    /// Look up a rendered document by its `/`-joined slug.
    pub fn document(&self, slug: &str) -> Option<&AssembledDocument> {
        self.documents.iter().find(|d| d.slug.join() == slug)
    }
}
