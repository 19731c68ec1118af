//! # doc-extractor
//!
//! Extract customer details, product details and the billed total from PDFs
//! and images with an LLM, then download the answers as a paginated PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload(s)
//!  │
//!  ├─ 1. Input     classify PDF / PNG / JPEG (magic bytes, then extension)
//!  ├─ 2. Read      PDF → concatenated page text (lopdf, spawn_blocking)
//!  │               image → validated base64 inline data
//!  ├─ 3. Model     one (content, prompt) → text call per document
//!  ├─ 4. Polish    line endings of the answer normalised to LF
//!  └─ 5. Render    answer blocks → letter-size PDF, one block per page run
//! ```
//!
//! Documents are analysed one at a time, in upload order, and any failure
//! aborts the run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc_extractor::{analyze_inputs, write_pdf, AnalyzerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalyzerConfig::builder()
//!         .api_key(std::env::var("GOOGLE_API_KEY")?)
//!         .build()?;
//!     let output = analyze_inputs(&["invoice.pdf", "receipt.pdf"], &config).await?;
//!     println!("{}", output.combined_text());
//!     write_pdf(&output, "analysis_results.pdf").await?;
//!     Ok(())
//! }
//! ```
//!
//! The renderer can be used on its own, without a model:
//!
//! ```rust
//! use doc_extractor::create_pdf_from_text;
//!
//! let pdf = create_pdf_from_text(&["Document 1:\nTotal: $12.00"]).unwrap();
//! assert!(pdf.get_ref().starts_with(b"%PDF"));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docextract` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! doc-extractor = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod output;
pub mod pages;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod render;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze_documents, analyze_image, analyze_inputs, analyze_pdfs, write_pdf};
pub use config::{AnalyzerConfig, AnalyzerConfigBuilder, ServerConfig};
pub use error::{DocExtractError, RenderError};
pub use output::{AnalysisOutput, AnalysisStats, DocumentResult};
pub use pipeline::input::{DocumentKind, ImageFormat, UploadedDocument};
pub use pipeline::llm::{build_model, ContentModel, GeminiClient, ModelInput, ProviderModel};
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
pub use render::{create_pdf_from_text, render_blocks, LopdfSurface, PageSurface};
pub use server::{app, serve, AppState};
