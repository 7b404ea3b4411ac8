//! Status-callback trait for coarse per-document milestones.
//!
//! Inject an [`Arc<dyn ConversionStatusCallback>`] via
//! [`crate::config::ConversionConfigBuilder::status_callback`] to learn when
//! a document starts, when OCR kicks in (it can take minutes), how many
//! margin annotations were redacted, and when the document is done.
//!
//! # Why callbacks instead of channels?
//!
//! The callback is the least-invasive integration point: a host can forward
//! events to a progress bar, a log line or a job record without the library
//! knowing how the host communicates. Events fire synchronously from the
//! blocking worker thread, so the trait is `Send + Sync`.
//!
//! # Example
//!
//! ```rust
//! use docmd::{ConversionConfig, ConversionStatusCallback};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ConversionStatusCallback for Printer {
//!     fn on_ocr_start(&self, name: &str) {
//!         eprintln!("{name}: running OCR…");
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .status_callback(Arc::new(Printer))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the document drivers at each milestone.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `name` is the document's display name.
pub trait ConversionStatusCallback: Send + Sync {
    /// Called once before any work on a document.
    fn on_document_start(&self, name: &str) {
        let _ = name;
    }

    /// Called just before the OCR tool is launched.
    fn on_ocr_start(&self, name: &str) {
        let _ = name;
    }

    /// Called after OCR returns.
    ///
    /// `applied` is false when the tool reported the PDF already had text.
    fn on_ocr_complete(&self, name: &str, applied: bool) {
        let _ = (name, applied);
    }

    /// Called after margin annotations were removed from the PDF.
    fn on_redaction(&self, name: &str, spans_removed: usize) {
        let _ = (name, spans_removed);
    }

    /// Called when a document converted successfully.
    ///
    /// `markdown_len` is the byte length of the final Markdown.
    fn on_document_complete(&self, name: &str, markdown_len: usize) {
        let _ = (name, markdown_len);
    }

    /// Called when a document failed with a fatal error.
    fn on_document_error(&self, name: &str, error: &str) {
        let _ = (name, error);
    }
}

/// A no-op implementation for callers that don't need status events.
pub struct NoopStatusCallback;

impl ConversionStatusCallback for NoopStatusCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type StatusCallback = Arc<dyn ConversionStatusCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        ocr_runs: AtomicUsize,
        redacted: AtomicUsize,
        completed: AtomicUsize,
    }

    impl ConversionStatusCallback for TrackingCallback {
        fn on_ocr_complete(&self, _name: &str, applied: bool) {
            if applied {
                self.ocr_runs.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn on_redaction(&self, _name: &str, spans_removed: usize) {
            self.redacted.fetch_add(spans_removed, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _name: &str, _markdown_len: usize) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopStatusCallback;
        cb.on_document_start("a.pdf");
        cb.on_ocr_start("a.pdf");
        cb.on_ocr_complete("a.pdf", true);
        cb.on_redaction("a.pdf", 3);
        cb.on_document_complete("a.pdf", 42);
        cb.on_document_error("b.pdf", "boom");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_ocr_complete("a.pdf", true);
        tracker.on_ocr_complete("b.pdf", false);
        tracker.on_redaction("a.pdf", 2);
        tracker.on_redaction("a.pdf", 3);
        tracker.on_document_complete("a.pdf", 10);

        assert_eq!(tracker.ocr_runs.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.redacted.load(Ordering::SeqCst), 5);
        assert_eq!(tracker.completed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: StatusCallback = Arc::new(NoopStatusCallback);
        cb.on_document_start("x.docx");
        cb.on_document_complete("x.docx", 1);
    }
}
