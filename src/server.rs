//! Web form and JSON API.
//!
//! The HTML routes reproduce the upload form: several PDFs analysed together,
//! or one image, each followed by a results page with a "Download Analysis
//! PDF" button. The server keeps no state between requests; the results page
//! embeds the answer blocks as JSON in a hidden field and `/download` renders
//! them again on demand.
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | GET  | `/`              | none                       | upload page |
//! | POST | `/analyze/pdfs`  | multipart `files` (PDF)    | results page |
//! | POST | `/analyze/image` | multipart `file` (PNG/JPEG)| results page |
//! | POST | `/download`      | form `blocks` (JSON array) | `analysis_results.pdf` |
//! | POST | `/api/analyze`   | multipart, any kind        | JSON [`AnalysisOutput`] |
//! | POST | `/api/render`    | JSON `{"blocks": [...]}`   | PDF |
//! | GET  | `/api/health`    | none                       | JSON status |

use crate::analyze;
use crate::config::{AnalyzerConfig, ServerConfig};
use crate::error::DocExtractError;
use crate::output::AnalysisOutput;
use crate::pages::Pages;
use crate::pipeline::input::{DocumentKind, UploadedDocument};
use crate::pipeline::llm::ContentModel;
use crate::render::{create_pdf_from_text, DOWNLOAD_FILENAME, PDF_CONTENT_TYPE};
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Form, Json, Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Shared state of every handler.
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn ContentModel>,
    pub config: Arc<AnalyzerConfig>,
    pages: Arc<Pages>,
    max_upload_bytes: usize,
}

impl AppState {
    /// Fails only if a page template does not compile.
    pub fn new(
        model: Arc<dyn ContentModel>,
        config: AnalyzerConfig,
        server: &ServerConfig,
    ) -> Result<Self, DocExtractError> {
        Ok(Self {
            model,
            config: Arc::new(config),
            pages: Arc::new(Pages::new()?),
            max_upload_bytes: server.max_upload_bytes,
        })
    }
}

/// Body of `/download` (urlencoded form).
#[derive(Debug, Deserialize)]
pub struct DownloadForm {
    /// JSON array of text blocks.
    pub blocks: String,
}

/// Body of `/api/render`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RenderRequest {
    pub blocks: Vec<String>,
}

/// JSON error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Build the application router with all routes configured.
pub fn app(state: AppState) -> Router {
    let limit = state.max_upload_bytes;
    Router::new()
        .route("/", get(index))
        .route("/analyze/pdfs", post(analyze_pdfs_page))
        .route("/analyze/image", post(analyze_image_page))
        .route("/download", post(download))
        .route("/api/analyze", post(api_analyze))
        .route("/api/render", post(api_render))
        .route("/api/health", get(health_check))
        .layer(DefaultBodyLimit::max(limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(state: AppState, config: &ServerConfig) -> Result<(), DocExtractError> {
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| DocExtractError::Internal(format!("Cannot bind {}: {e}", config.bind)))?;
    info!("Document Information Extractor listening on http://{}", config.bind);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| DocExtractError::Internal(format!("Server error: {e}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn index(State(state): State<AppState>) -> Result<Html<String>, HtmlError> {
    let html = state.pages.index().map_err(|e| state.html_error(e))?;
    Ok(Html(html))
}

async fn analyze_pdfs_page(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Html<String>, HtmlError> {
    let docs = read_uploads(&mut multipart, &["files"], state.max_upload_bytes)
        .await
        .map_err(|e| state.html_error(e))?;
    if docs.is_empty() {
        let err = DocExtractError::InvalidInput("Choose one or more PDF files".into());
        return Err(state.html_error(err));
    }
    let output = analyze::analyze_pdfs(state.model.as_ref(), docs, &state.config)
        .await
        .map_err(|e| state.html_error(e))?;
    let html = state
        .pages
        .results("PDF Analysis Result", &output, None)
        .map_err(|e| state.html_error(e))?;
    Ok(Html(html))
}

async fn analyze_image_page(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Html<String>, HtmlError> {
    let docs = read_uploads(&mut multipart, &["file"], state.max_upload_bytes)
        .await
        .map_err(|e| state.html_error(e))?;
    if docs.len() > 1 {
        warn!("{} images uploaded; analysing only the first", docs.len());
    }
    let doc = match docs.into_iter().next() {
        Some(doc) => doc,
        None => return Err(state.html_error(DocExtractError::InvalidInput("Choose an image".into()))),
    };

    let preview = data_uri(&doc);
    let output = analyze::analyze_image(state.model.as_ref(), doc, &state.config)
        .await
        .map_err(|e| state.html_error(e))?;
    let html = state
        .pages
        .results("Image Analysis Result", &output, preview.as_deref())
        .map_err(|e| state.html_error(e))?;
    Ok(Html(html))
}

async fn download(Form(form): Form<DownloadForm>) -> Result<Response, DocExtractError> {
    let blocks: Vec<String> = serde_json::from_str(&form.blocks)
        .map_err(|e| DocExtractError::InvalidInput(format!("'blocks' is not a JSON string array: {e}")))?;
    pdf_response(&blocks)
}

async fn api_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisOutput>, DocExtractError> {
    let docs = read_uploads(&mut multipart, &["files", "file"], state.max_upload_bytes).await?;
    if docs.is_empty() {
        return Err(DocExtractError::InvalidInput(
            "No 'files' or 'file' upload in request".into(),
        ));
    }
    let output = analyze::analyze_documents(state.model.as_ref(), docs, &state.config).await?;
    Ok(Json(output))
}

async fn api_render(Json(req): Json<RenderRequest>) -> Result<Response, DocExtractError> {
    pdf_response(&req.blocks)
}

/// Health check endpoint for monitoring and load balancing
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "doc-extractor",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.model.model_name(),
    }))
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// Collect the file fields named in `accept`, in request order.
///
/// A file input left empty still sends a part with no filename and no
/// bytes; those parts are skipped.
async fn read_uploads(
    multipart: &mut Multipart,
    accept: &[&str],
    limit: usize,
) -> Result<Vec<UploadedDocument>, DocExtractError> {
    let mut docs = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if !accept.contains(&name.as_str()) {
            debug!("Ignoring form field '{}'", name);
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;

        if filename.is_empty() && bytes.is_empty() {
            debug!("Skipping empty '{}' field", name);
            continue;
        }
        let filename = if filename.is_empty() {
            format!("upload-{}", docs.len() + 1)
        } else {
            filename
        };
        docs.push(UploadedDocument::from_upload(filename, bytes.to_vec())?);
    }

    Ok(docs)
}

fn multipart_error(e: MultipartError, limit: usize) -> DocExtractError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        DocExtractError::UploadTooLarge { limit }
    } else {
        DocExtractError::InvalidInput(format!("Malformed upload: {}", e.body_text()))
    }
}

fn pdf_response(blocks: &[String]) -> Result<Response, DocExtractError> {
    let pdf = create_pdf_from_text(blocks)?.into_inner();
    info!("Rendered {} block(s) into {} bytes", blocks.len(), pdf.len());
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, PDF_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{DOWNLOAD_FILENAME}\""),
            ),
        ],
        pdf,
    )
        .into_response())
}

fn data_uri(doc: &UploadedDocument) -> Option<String> {
    match doc.kind {
        DocumentKind::Image(format) => Some(format!(
            "data:{};base64,{}",
            format.mime_type(),
            STANDARD.encode(&doc.bytes)
        )),
        DocumentKind::Pdf => None,
    }
}

// ── Errors ───────────────────────────────────────────────────────────────

/// HTTP status for an analysis error.
pub fn status_for(err: &DocExtractError) -> StatusCode {
    match err {
        DocExtractError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        DocExtractError::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        DocExtractError::UnsupportedDocument { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        DocExtractError::CorruptPdf { .. }
        | DocExtractError::InvalidImage { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        DocExtractError::FileNotFound { .. } => StatusCode::NOT_FOUND,
        DocExtractError::ModelNotConfigured { .. } => StatusCode::SERVICE_UNAVAILABLE,
        DocExtractError::ModelApiError { .. }
        | DocExtractError::ModelRequestFailed(_)
        | DocExtractError::EmptyModelResponse { .. }
        | DocExtractError::DownloadFailed { .. } => StatusCode::BAD_GATEWAY,
        DocExtractError::ModelTimeout { .. } | DocExtractError::DownloadTimeout { .. } => {
            StatusCode::GATEWAY_TIMEOUT
        }
        DocExtractError::PermissionDenied { .. }
        | DocExtractError::Render(_)
        | DocExtractError::OutputWriteFailed { .. }
        | DocExtractError::InvalidConfig(_)
        | DocExtractError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for DocExtractError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            warn!("Request failed: {}", self);
        }
        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Error rendered as an HTML page, for the form routes.
pub struct HtmlError {
    status: StatusCode,
    body: Result<String, String>,
}

impl AppState {
    fn html_error(&self, err: DocExtractError) -> HtmlError {
        let status = status_for(&err);
        if status.is_server_error() {
            warn!("Request failed: {}", err);
        }
        let body = self.pages.error(&err).map_err(|page_err| {
            warn!("{}", page_err);
            err.to_string()
        });
        HtmlError { status, body }
    }
}

impl IntoResponse for HtmlError {
    fn into_response(self) -> Response {
        match self.body {
            Ok(html) => (self.status, Html(html)).into_response(),
            Err(text) => (self.status, text).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            status_for(&DocExtractError::InvalidInput("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&DocExtractError::UnsupportedDocument {
                filename: "a".into(),
                expected: "b".into()
            }),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            status_for(&DocExtractError::ModelApiError {
                status: 500,
                message: "x".into()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&DocExtractError::ModelTimeout { secs: 3 }),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
