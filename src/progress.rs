//! Progress-callback trait for per-document build events.
//!
//! Inject an [`Arc<dyn BuildProgressCallback>`] via
//! [`crate::config::PublishConfigBuilder::progress_callback`] to receive
//! events as a site build renders each document.
//!
//! # Example
//!
//! ```rust
//! use gitopedia_render::{BuildProgressCallback, PublishConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl BuildProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, slug: &str, html_len: usize, fallback: bool) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{slug}: {html_len} bytes (fallback: {fallback})");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = PublishConfig::builder()
//!     .progress_callback(counter as Arc<dyn BuildProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the site builders as they process each document.
///
/// Implementations must be `Send + Sync`: documents are rendered concurrently,
/// so `on_document_*` may be invoked from several tasks at once. All methods
/// default to no-ops.
pub trait BuildProgressCallback: Send + Sync {
    /// Called once, after enumeration, before any document is rendered.
    fn on_build_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called just before a document's source is read.
    fn on_document_start(&self, slug: &str) {
        let _ = slug;
    }

    /// Called when a document produced HTML.
    ///
    /// `fallback` is true when the markup engine failed and the escaped
    /// source was substituted.
    fn on_document_complete(&self, slug: &str, html_len: usize, fallback: bool) {
        let _ = (slug, html_len, fallback);
    }

    /// Called when a document could not be assembled at all (read failure).
    fn on_document_error(&self, slug: &str, error: &str) {
        let _ = (slug, error);
    }

    /// Called once after every document has been attempted.
    fn on_build_complete(&self, total_documents: usize, success_count: usize) {
        let _ = (total_documents, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BuildProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PublishConfig`].
pub type ProgressCallback = Arc<dyn BuildProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        fallbacks: AtomicUsize,
        errors: AtomicUsize,
        started_total: AtomicUsize,
        completed_total: AtomicUsize,
    }

    impl BuildProgressCallback for TrackingCallback {
        fn on_build_start(&self, total_documents: usize) {
            self.started_total.store(total_documents, Ordering::SeqCst);
        }

        fn on_document_start(&self, _slug: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _slug: &str, _html_len: usize, fallback: bool) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            if fallback {
                self.fallbacks.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn on_document_error(&self, _slug: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_build_complete(&self, _total_documents: usize, success_count: usize) {
            self.completed_total.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_build_start(5);
        cb.on_document_start("science");
        cb.on_document_complete("science", 42, false);
        cb.on_document_error("science/physics", "not found");
        cb.on_build_complete(5, 4);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_build_start(3);
        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);

        tracker.on_document_start("a");
        tracker.on_document_complete("a", 100, false);
        tracker.on_document_start("a/b");
        tracker.on_document_complete("a/b", 200, true);
        tracker.on_document_start("a/b/c");
        tracker.on_document_error("a/b/c", "permission denied");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.fallbacks.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);

        tracker.on_build_complete(3, 2);
        assert_eq!(tracker.completed_total.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_build_start(10);
        cb.on_document_complete("x", 512, false);
    }
}
