//! Error types for the gitopedia-render library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PublishError`] — **Fatal** for the document (or build) at hand: the
//!   source cannot be located or read, the slug is malformed, the
//!   configuration is invalid. Returned as `Err(PublishError)` from
//!   [`crate::assemble::Assembler::assemble`] and the site builders.
//!
//! * [`RenderError`] — **Recovered**: the Markdown engine failed on one body.
//!   The assembler logs it and substitutes an escaped `<pre>` fallback, so a
//!   single malformed article never breaks a full-site build.
//!
//! Inside a site build, fatal per-document errors are downgraded to
//! [`crate::output::DocumentFailure`] records rather than aborting the build.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the gitopedia-render library.
#[derive(Debug, Error)]
pub enum PublishError {
    // ── Source errors ─────────────────────────────────────────────────────
    /// No document exists for the slug (neither `<slug>.md` nor `<slug>/index.md`).
    #[error("Source document not found: '{path}'")]
    SourceNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file was read but is not valid UTF-8.
    #[error("Source document '{path}' is not valid UTF-8")]
    NotUtf8 { path: PathBuf },

    /// Any other I/O failure while reading a source document.
    #[error("Failed to read '{path}': {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The slug cannot address a document (empty, `..`, separators, …).
    #[error("Invalid slug '{slug}': {reason}")]
    InvalidSlug { slug: String, reason: String },

    /// The configured content root does not exist or is not a directory.
    #[error("Content root '{path}' does not exist or is not a directory.\nSet --root or GITOPEDIA_DIR.")]
    ContentRootMissing { path: PathBuf },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A recoverable failure of the Markdown engine for one document body.
///
/// Never propagated out of the assembler; it triggers the escaped-text
/// fallback and is logged.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum RenderError {
    /// The engine reported an error.
    #[error("Markup engine failed: {detail}")]
    Engine { detail: String },

    /// The engine panicked while rendering.
    #[error("Markup engine panicked: {detail}")]
    Panicked { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_slug_display() {
        let e = PublishError::InvalidSlug {
            slug: "a/../b".into(),
            reason: "segment '..' is not allowed".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("a/../b"), "got: {msg}");
        assert!(msg.contains("'..'"), "got: {msg}");
    }

    #[test]
    fn source_not_found_display() {
        let e = PublishError::SourceNotFound {
            path: PathBuf::from("Compendium/science.md"),
        };
        assert!(e.to_string().contains("Compendium/science.md"));
    }

    #[test]
    fn source_read_keeps_io_source() {
        use std::error::Error as _;
        let e = PublishError::SourceRead {
            path: PathBuf::from("x.md"),
            source: std::io::Error::other("disk on fire"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("disk on fire"));
    }

    #[test]
    fn render_error_display() {
        let e = RenderError::Engine {
            detail: "unbalanced delimiter".into(),
        };
        assert!(e.to_string().contains("unbalanced delimiter"));

        let e = RenderError::Panicked {
            detail: "index out of bounds".into(),
        };
        assert!(e.to_string().contains("panicked"));
    }

    #[test]
    fn render_error_serialises() {
        let e = RenderError::Engine { detail: "x".into() };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("Engine"), "got: {json}");
    }
}
