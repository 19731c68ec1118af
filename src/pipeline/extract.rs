//! PDF text extraction with `lopdf`.
//!
//! Every page's text is concatenated in page order. Parsing is CPU-bound, so
//! the async entry point moves it onto the blocking pool.
//!
//! Extraction is best effort: text that cannot be decoded (an unreadable font,
//! a broken content stream) is logged and skipped, and the readable rest of the
//! document is still returned. Only a file that cannot be loaded at all fails.

use crate::error::DocExtractError;
use lopdf::Document;
use tracing::{debug, info, warn};

/// Extract the text of every page of an in-memory PDF.
pub async fn extract_pdf_text(filename: &str, bytes: Vec<u8>) -> Result<String, DocExtractError> {
    let name = filename.to_string();
    tokio::task::spawn_blocking(move || extract_pdf_text_blocking(&name, &bytes))
        .await
        .map_err(|e| DocExtractError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Blocking implementation of text extraction.
pub fn extract_pdf_text_blocking(filename: &str, bytes: &[u8]) -> Result<String, DocExtractError> {
    let document = Document::load_mem(bytes).map_err(|e| DocExtractError::CorruptPdf {
        filename: filename.to_string(),
        detail: e.to_string(),
    })?;

    let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
    info!("'{}': {} pages", filename, page_numbers.len());

    let mut text = String::new();
    let mut skipped = 0usize;
    for page in page_numbers {
        let before = text.len();
        for chunk in document.extract_text_chunks(&[page]) {
            match chunk {
                Ok(chunk) => text.push_str(&chunk),
                Err(e) => {
                    skipped += 1;
                    warn!("'{}' page {}: skipping unreadable text: {}", filename, page, e);
                }
            }
        }
        debug!("'{}' page {}: {} bytes", filename, page, text.len() - before);
    }

    if skipped > 0 {
        warn!(
            "'{}': {} text chunk(s) could not be decoded, {} chars extracted",
            filename,
            skipped,
            text.chars().count()
        );
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::create_pdf_from_text;

    #[test]
    fn extracts_text_in_page_order() {
        let pdf = create_pdf_from_text(&["Invoice 17", "Receipt 3"])
            .unwrap()
            .into_inner();
        let text = extract_pdf_text_blocking("summary.pdf", &pdf).unwrap();

        let first = text.find("Invoice 17").expect("first block text");
        let second = text.find("Receipt 3").expect("second block text");
        assert!(first < second, "got: {text:?}");
    }

    #[test]
    fn corrupt_pdf_is_reported() {
        let err = extract_pdf_text_blocking("broken.pdf", b"%PDF-1.4\nnot really").unwrap_err();
        match err {
            DocExtractError::CorruptPdf { filename, .. } => assert_eq!(filename, "broken.pdf"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// One page drawn in Helvetica that also lists a Type0 font with no
    /// `ToUnicode` map, which lopdf cannot decode.
    fn pdf_with_undecodable_font(text: &str) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let helvetica = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let cid_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "NotoSansCJK",
            "Encoding" => "Identity-H",
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => helvetica, "F2" => cid_font },
            },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn undecodable_font_keeps_readable_text() {
        let pdf = pdf_with_undecodable_font("Customer: ACME  Total: 5");
        let text = extract_pdf_text_blocking("invoice.pdf", &pdf).unwrap();
        assert!(text.contains("Customer: ACME  Total: 5"), "got: {text:?}");
    }

    #[tokio::test]
    async fn async_extraction_matches_blocking() {
        let pdf = create_pdf_from_text(&["Total: 12.50"]).unwrap().into_inner();
        let text = extract_pdf_text("a.pdf", pdf).await.unwrap();
        assert!(text.contains("Total: 12.50"), "got: {text:?}");
    }
}
