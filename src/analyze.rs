//! Analysis entry points: uploaded documents in, answer blocks out.
//!
//! Documents are processed one at a time, in upload order. Each one is read
//! (PDF text extraction or image validation), sent to the model together with
//! the extraction prompt, and its answer becomes one text block. PDF
//! blocks are headed `Document N:`; an image block is the bare answer.
//!
//! Any failure aborts the whole run. There are no partial results and no
//! retries, so a caller either gets every block or an error.

use crate::config::AnalyzerConfig;
use crate::error::DocExtractError;
use crate::output::{AnalysisOutput, AnalysisStats, DocumentResult};
use crate::pipeline::input::{self, DocumentKind, UploadedDocument};
use crate::pipeline::llm::{self, ContentModel, ModelInput};
use crate::pipeline::{encode, extract, postprocess};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Analyse a batch of PDFs.
///
/// # Errors
/// [`DocExtractError::UnsupportedDocument`] if any upload is not a PDF; this
/// is checked before the model is called for anything.
pub async fn analyze_pdfs(
    model: &dyn ContentModel,
    docs: Vec<UploadedDocument>,
    config: &AnalyzerConfig,
) -> Result<AnalysisOutput, DocExtractError> {
    if let Some(doc) = docs.iter().find(|d| !d.kind.is_pdf()) {
        return Err(DocExtractError::UnsupportedDocument {
            filename: doc.filename.clone(),
            expected: "a PDF".into(),
        });
    }
    analyze_documents(model, docs, config).await
}

/// Analyse a single PNG or JPEG image.
pub async fn analyze_image(
    model: &dyn ContentModel,
    doc: UploadedDocument,
    config: &AnalyzerConfig,
) -> Result<AnalysisOutput, DocExtractError> {
    if !doc.kind.is_image() {
        return Err(DocExtractError::UnsupportedDocument {
            filename: doc.filename,
            expected: "a PNG or JPEG image".into(),
        });
    }
    analyze_documents(model, vec![doc], config).await
}

/// Analyse any mix of PDFs and images, in order.
pub async fn analyze_documents(
    model: &dyn ContentModel,
    docs: Vec<UploadedDocument>,
    config: &AnalyzerConfig,
) -> Result<AnalysisOutput, DocExtractError> {
    if docs.is_empty() {
        return Err(DocExtractError::InvalidInput(
            "No documents were uploaded".into(),
        ));
    }

    let total_start = Instant::now();
    let total = docs.len();
    let prompt = config.effective_prompt();
    info!("Analysing {} document(s) with '{}'", total, model.model_name());

    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_start(total);
    }

    let mut blocks = Vec::with_capacity(total);
    let mut documents = Vec::with_capacity(total);
    let mut model_duration_ms = 0u64;

    for (i, doc) in docs.into_iter().enumerate() {
        let doc_num = i + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_document_start(doc_num, total, &doc.filename);
        }

        let result = analyze_one(model, doc_num, doc, prompt).await;
        let (result, model_ms) = match result {
            Ok(ok) => ok,
            Err(e) => {
                warn!("Document {} failed: {}", doc_num, e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_document_error(doc_num, total, &e.to_string());
                }
                return Err(e);
            }
        };
        model_duration_ms += model_ms;

        if let Some(ref cb) = config.progress_callback {
            cb.on_document_complete(doc_num, total, result.answer.len());
        }

        blocks.push(block_for(&result));
        documents.push(result);
    }

    let stats = AnalysisStats {
        total_documents: total,
        pdf_documents: documents.iter().filter(|d| d.kind.is_pdf()).count(),
        image_documents: documents.iter().filter(|d| d.kind.is_image()).count(),
        model: model.model_name().to_string(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        model_duration_ms,
    };

    info!(
        "Analysis complete: {} document(s), {}ms total",
        total, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_complete(total, documents.len());
    }

    Ok(AnalysisOutput {
        blocks,
        documents,
        stats,
    })
}

/// Resolve local paths or URLs, build the configured model and analyse them.
///
/// This is the library counterpart of `docextract analyze`.
pub async fn analyze_inputs<S: AsRef<str>>(
    inputs: &[S],
    config: &AnalyzerConfig,
) -> Result<AnalysisOutput, DocExtractError> {
    let mut docs = Vec::with_capacity(inputs.len());
    for input_str in inputs {
        docs.push(input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?);
    }
    let model = llm::build_model(config)?;
    analyze_documents(model.as_ref(), docs, config).await
}

/// Write the summary PDF for `output` to `path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_pdf(output: &AnalysisOutput, path: impl AsRef<Path>) -> Result<(), DocExtractError> {
    let path = path.as_ref();
    let bytes = output.to_pdf()?;
    let write_err = |e: std::io::Error| DocExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, &bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Read, ask, normalise line endings. Returns the result and the time spent
/// in the model call.
async fn analyze_one(
    model: &dyn ContentModel,
    doc_num: usize,
    doc: UploadedDocument,
    prompt: &str,
) -> Result<(DocumentResult, u64), DocExtractError> {
    let start = Instant::now();
    let filename = doc.filename.clone();
    let kind = doc.kind;

    let (input, extracted_chars) = match kind {
        DocumentKind::Pdf => {
            let text = extract::extract_pdf_text(&filename, doc.bytes).await?;
            let chars = text.chars().count();
            debug!("'{}': extracted {} chars", filename, chars);
            (ModelInput::Text(text), Some(chars))
        }
        DocumentKind::Image(_) => (ModelInput::Image(encode::encode_image(&doc)?), None),
    };

    let model_start = Instant::now();
    let raw = model.generate(&input, prompt).await?;
    let model_ms = model_start.elapsed().as_millis() as u64;

    let answer = postprocess::normalise_line_endings(&raw);

    Ok((
        DocumentResult {
            index: doc_num,
            filename,
            kind,
            answer,
            extracted_chars,
            duration_ms: start.elapsed().as_millis() as u64,
        },
        model_ms,
    ))
}

/// The text block a document contributes to the summary.
fn block_for(result: &DocumentResult) -> String {
    match result.kind {
        DocumentKind::Pdf => format!("Document {}:\n{}", result.index, result.answer),
        DocumentKind::Image(_) => result.answer.clone(),
    }
}
