//! Input resolution: turn an upload or a CLI argument into an [`UploadedDocument`].
//!
//! Documents are always held in memory; nothing is written to disk. The kind
//! is decided from the leading magic bytes (`%PDF`, PNG signature, JPEG SOI
//! marker) and only falls back to the file extension when the bytes are not
//! conclusive, so a mislabelled upload is still routed correctly.

use crate::error::DocExtractError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Raster formats accepted for image uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

/// What an uploaded document is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "format")]
pub enum DocumentKind {
    Pdf,
    Image(ImageFormat),
}

impl DocumentKind {
    /// Detect the kind from content, falling back to the filename extension.
    pub fn detect(filename: &str, bytes: &[u8]) -> Option<Self> {
        Self::from_magic(bytes).or_else(|| Self::from_extension(filename))
    }

    fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF") {
            Some(DocumentKind::Pdf)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(DocumentKind::Image(ImageFormat::Png))
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(DocumentKind::Image(ImageFormat::Jpeg))
        } else {
            None
        }
    }

    fn from_extension(filename: &str) -> Option<Self> {
        let ext = Path::new(filename)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "png" => Some(DocumentKind::Image(ImageFormat::Png)),
            "jpg" | "jpeg" => Some(DocumentKind::Image(ImageFormat::Jpeg)),
            _ => None,
        }
    }

    pub fn is_pdf(self) -> bool {
        matches!(self, DocumentKind::Pdf)
    }

    pub fn is_image(self) -> bool {
        matches!(self, DocumentKind::Image(_))
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Pdf => f.write_str("PDF"),
            DocumentKind::Image(ImageFormat::Png) => f.write_str("PNG image"),
            DocumentKind::Image(ImageFormat::Jpeg) => f.write_str("JPEG image"),
        }
    }
}

/// One uploaded document, held in memory for the duration of a request.
#[derive(Clone)]
pub struct UploadedDocument {
    pub filename: String,
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for UploadedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedDocument")
            .field("filename", &self.filename)
            .field("kind", &self.kind)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl UploadedDocument {
    /// Wrap uploaded bytes, detecting their kind.
    pub fn from_upload(
        filename: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Result<Self, DocExtractError> {
        let filename = filename.into();
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(DocExtractError::InvalidInput(format!(
                "'{filename}' is empty"
            )));
        }
        let kind = DocumentKind::detect(&filename, &bytes).ok_or_else(|| {
            DocExtractError::UnsupportedDocument {
                filename: filename.clone(),
                expected: "a PDF, PNG or JPEG file".into(),
            }
        })?;
        debug!("Accepted '{}' as {} ({} bytes)", filename, kind, bytes.len());
        Ok(Self {
            filename,
            kind,
            bytes,
        })
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a CLI argument (local path or HTTP/HTTPS URL) to a document.
pub async fn resolve_input(
    input: &str,
    timeout_secs: u64,
) -> Result<UploadedDocument, DocExtractError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<UploadedDocument, DocExtractError> {
    let path = PathBuf::from(path_str);

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => DocExtractError::PermissionDenied {
            path: path.clone(),
        },
        _ => DocExtractError::FileNotFound { path: path.clone() },
    })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.to_string());

    debug!("Read local file: {}", path.display());
    UploadedDocument::from_upload(filename, bytes)
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<UploadedDocument, DocExtractError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| DocExtractError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            DocExtractError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            DocExtractError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(DocExtractError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| DocExtractError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    UploadedDocument::from_upload(filename_from_url(url), bytes.to_vec())
}

/// Last path segment of the URL when it looks like a filename.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn detect_by_magic_ignores_extension() {
        assert_eq!(
            DocumentKind::detect("scan.png", b"%PDF-1.7\n"),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(
            DocumentKind::detect("photo", b"\x89PNG\r\n\x1a\n...."),
            Some(DocumentKind::Image(ImageFormat::Png))
        );
        assert_eq!(
            DocumentKind::detect("photo.bin", &[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(DocumentKind::Image(ImageFormat::Jpeg))
        );
    }

    #[test]
    fn detect_falls_back_to_extension() {
        assert_eq!(
            DocumentKind::detect("receipt.JPG", b"????"),
            Some(DocumentKind::Image(ImageFormat::Jpeg))
        );
        assert_eq!(DocumentKind::detect("notes.txt", b"hello"), None);
        assert_eq!(DocumentKind::detect("noext", b"hello"), None);
    }

    #[test]
    fn from_upload_rejects_empty_and_unknown() {
        let err = UploadedDocument::from_upload("a.pdf", Vec::new()).unwrap_err();
        assert!(matches!(err, DocExtractError::InvalidInput(_)));

        let err = UploadedDocument::from_upload("a.txt", b"plain".to_vec()).unwrap_err();
        assert!(matches!(err, DocExtractError::UnsupportedDocument { .. }));
    }

    #[test]
    fn filename_from_url_uses_last_segment() {
        assert_eq!(filename_from_url("https://x.test/a/invoice.pdf"), "invoice.pdf");
        assert_eq!(filename_from_url("https://x.test/a/"), "downloaded");
        assert_eq!(filename_from_url("not a url"), "downloaded");
    }

    #[tokio::test]
    async fn resolve_missing_local_file() {
        let err = resolve_input("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, DocExtractError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn resolve_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pdf");
        std::fs::write(&path, b"%PDF-1.4\n%%EOF\n").unwrap();

        let doc = resolve_input(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(doc.filename, "scan.pdf");
        assert_eq!(doc.kind, DocumentKind::Pdf);
    }
}
