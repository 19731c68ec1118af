//! Result types returned by an analysis run.

use crate::error::DocExtractError;
use crate::pipeline::input::DocumentKind;
use crate::render::create_pdf_from_text;
use serde::{Deserialize, Serialize};

/// Everything produced by one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    /// Text blocks in upload order, ready for [`create_pdf_from_text`].
    pub blocks: Vec<String>,
    /// Per-document details, same order as `blocks`.
    pub documents: Vec<DocumentResult>,
    pub stats: AnalysisStats,
}

impl AnalysisOutput {
    /// All blocks joined by a blank line, as shown on the results page.
    pub fn combined_text(&self) -> String {
        self.blocks.join("\n\n")
    }

    /// Render the blocks into the paginated summary PDF.
    pub fn to_pdf(&self) -> Result<Vec<u8>, DocExtractError> {
        Ok(create_pdf_from_text(&self.blocks)?.into_inner())
    }
}

/// The answer for a single uploaded document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    /// 1-indexed position in the upload.
    pub index: usize,
    pub filename: String,
    pub kind: DocumentKind,
    /// Cleaned model answer, without any "Document N:" header.
    pub answer: String,
    /// Characters of text extracted from a PDF; `None` for images.
    pub extracted_chars: Option<usize>,
    pub duration_ms: u64,
}

/// Aggregate statistics for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub total_documents: usize,
    pub pdf_documents: usize,
    pub image_documents: usize,
    pub model: String,
    pub total_duration_ms: u64,
    pub model_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(blocks: &[&str]) -> AnalysisOutput {
        AnalysisOutput {
            blocks: blocks.iter().map(|b| b.to_string()).collect(),
            documents: Vec::new(),
            stats: AnalysisStats::default(),
        }
    }

    #[test]
    fn combined_text_separates_blocks_with_blank_line() {
        let out = output(&["Document 1:\nA", "Document 2:\nB"]);
        assert_eq!(out.combined_text(), "Document 1:\nA\n\nDocument 2:\nB");
    }

    #[test]
    fn to_pdf_produces_pdf_bytes() {
        let pdf = output(&["Total: 3"]).to_pdf().unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn serializes_kind_tagged() {
        let doc = DocumentResult {
            index: 1,
            filename: "a.png".into(),
            kind: DocumentKind::Image(crate::pipeline::input::ImageFormat::Png),
            answer: "x".into(),
            extracted_chars: None,
            duration_ms: 5,
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["kind"]["type"], "image");
        assert_eq!(json["kind"]["format"], "png");
    }
}
