//! Progress-callback trait for per-document analysis events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalyzerConfigBuilder::progress_callback`] to receive
//! events as each upload is extracted and sent to the model. The CLI uses it
//! to drive a terminal progress bar; library callers can forward events
//! anywhere they like.
//!
//! # Example
//!
//! ```rust
//! use doc_extractor::{AnalysisProgressCallback, AnalyzerConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl AnalysisProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, doc_num: usize, total: usize, answer_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Document {}/{} done ({} bytes)", doc_num, total, answer_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = AnalyzerConfig::builder()
//!     .progress_callback(counter as Arc<dyn AnalysisProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the analysis pipeline as it processes each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Documents are processed one at a time, in upload
/// order, but the trait is `Send + Sync` so a callback can be shared with the
/// async runtime.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called once before the first document is read.
    fn on_analysis_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called before a document is extracted and sent to the model.
    ///
    /// `doc_num` is 1-indexed.
    fn on_document_start(&self, doc_num: usize, total_documents: usize, filename: &str) {
        let _ = (doc_num, total_documents, filename);
    }

    /// Called when the model has answered for a document.
    ///
    /// `answer_len` is the byte length of the answer.
    fn on_document_complete(&self, doc_num: usize, total_documents: usize, answer_len: usize) {
        let _ = (doc_num, total_documents, answer_len);
    }

    /// Called when a document fails. The run stops after this event.
    fn on_document_error(&self, doc_num: usize, total_documents: usize, error: &str) {
        let _ = (doc_num, total_documents, error);
    }

    /// Called once after every document has been analysed.
    fn on_analysis_complete(&self, total_documents: usize, success_count: usize) {
        let _ = (total_documents, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalyzerConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;
