//! Error types for the doc-extractor library.
//!
//! Two error types reflect two layers of failure:
//!
//! * [`DocExtractError`]: **fatal** for an analysis run: a bad upload, an
//!   unreadable PDF, a missing API key, or a failed model call. Any of these
//!   aborts the whole run; no partial results are returned.
//!
//! * [`RenderError`]: resource-class failures while assembling the summary
//!   PDF (content-stream encoding or document serialisation). There is no
//!   partial document to salvage, so it is propagated unchanged and converted
//!   into [`DocExtractError::Render`] at the analysis layer.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the doc-extractor library.
#[derive(Debug, Error)]
pub enum DocExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The request or argument did not carry a usable document.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The request body exceeded the configured upload limit.
    #[error("Upload too large: the limit is {limit} bytes")]
    UploadTooLarge { limit: usize },

    /// The upload is neither a PDF nor a PNG/JPEG image.
    #[error("Unsupported document '{filename}': expected {expected}")]
    UnsupportedDocument { filename: String, expected: String },

    // ── Document errors ───────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{filename}' is corrupt: {detail}")]
    CorruptPdf { filename: String, detail: String },

    /// The image could not be decoded.
    #[error("Image '{filename}' could not be decoded: {detail}")]
    InvalidImage { filename: String, detail: String },

    // ── Model errors ──────────────────────────────────────────────────────
    /// No model client could be built (missing API key etc.).
    #[error("Model '{model}' is not configured.\n{hint}")]
    ModelNotConfigured { model: String, hint: String },

    /// The model API returned an error.
    #[error("Model API error ({status}): {message}")]
    ModelApiError { status: u16, message: String },

    /// Transport-level failure talking to the model API.
    #[error("Model request failed: {0}")]
    ModelRequestFailed(String),

    /// The model call timed out.
    #[error("Model call timed out after {secs}s")]
    ModelTimeout { secs: u64 },

    /// The model answered, but without any text.
    #[error("Model '{model}' returned no text{}", finish_reason_suffix(.reason))]
    EmptyModelResponse {
        model: String,
        reason: Option<String>,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The summary PDF could not be assembled.
    #[error("Failed to render summary PDF: {0}")]
    Render(#[from] RenderError),

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

impl DocExtractError {
    /// Stable machine-readable identifier, used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            DocExtractError::FileNotFound { .. } => "file_not_found",
            DocExtractError::PermissionDenied { .. } => "permission_denied",
            DocExtractError::InvalidInput(_) => "invalid_input",
            DocExtractError::DownloadFailed { .. } => "download_failed",
            DocExtractError::DownloadTimeout { .. } => "download_timeout",
            DocExtractError::UploadTooLarge { .. } => "upload_too_large",
            DocExtractError::UnsupportedDocument { .. } => "unsupported_document",
            DocExtractError::CorruptPdf { .. } => "corrupt_pdf",
            DocExtractError::InvalidImage { .. } => "invalid_image",
            DocExtractError::ModelNotConfigured { .. } => "model_not_configured",
            DocExtractError::ModelApiError { .. } => "model_api_error",
            DocExtractError::ModelRequestFailed(_) => "model_request_failed",
            DocExtractError::ModelTimeout { .. } => "model_timeout",
            DocExtractError::EmptyModelResponse { .. } => "empty_model_response",
            DocExtractError::Render(_) => "render_failed",
            DocExtractError::OutputWriteFailed { .. } => "output_write_failed",
            DocExtractError::InvalidConfig(_) => "invalid_config",
            DocExtractError::Internal(_) => "internal",
        }
    }
}

fn finish_reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(" (finish reason: {r})"))
        .unwrap_or_default()
}

/// Failure while assembling the paginated summary PDF.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    /// A page's content stream could not be encoded.
    #[error("content stream encoding failed on page {page}: {detail}")]
    Encode { page: usize, detail: String },

    /// The finished document could not be serialised into the buffer.
    #[error("document serialisation failed: {0}")]
    Write(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_response_display_with_reason() {
        let e = DocExtractError::EmptyModelResponse {
            model: "gemini-1.5-flash".into(),
            reason: Some("SAFETY".into()),
        };
        let msg = e.to_string();
        assert!(msg.contains("gemini-1.5-flash"), "got: {msg}");
        assert!(msg.contains("SAFETY"), "got: {msg}");
    }

    #[test]
    fn empty_response_display_without_reason() {
        let e = DocExtractError::EmptyModelResponse {
            model: "gemini-1.5-flash".into(),
            reason: None,
        };
        assert_eq!(e.to_string(), "Model 'gemini-1.5-flash' returned no text");
    }

    #[test]
    fn model_api_error_display() {
        let e = DocExtractError::ModelApiError {
            status: 403,
            message: "API key not valid".into(),
        };
        assert!(e.to_string().contains("403"));
        assert!(e.to_string().contains("API key not valid"));
    }

    #[test]
    fn codes_are_snake_case() {
        let e = DocExtractError::UnsupportedDocument {
            filename: "a.txt".into(),
            expected: "a PDF".into(),
        };
        assert_eq!(e.code(), "unsupported_document");
        assert_eq!(DocExtractError::ModelTimeout { secs: 1 }.code(), "model_timeout");
    }

    #[test]
    fn render_error_converts() {
        let e: DocExtractError = RenderError::Write("disk full".into()).into();
        assert!(matches!(e, DocExtractError::Render(_)));
        assert!(e.to_string().contains("disk full"));
    }
}
