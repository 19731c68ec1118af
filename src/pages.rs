//! HTML pages of the web form, rendered with `handlebars`.
//!
//! The templates live in `src/templates/` and are compiled into the binary.
//! Every value is inserted with `{{...}}`, so the engine HTML-escapes model
//! answers, filenames and error messages before they reach the page.

use crate::error::DocExtractError;
use crate::output::AnalysisOutput;
use handlebars::Handlebars;
use serde_json::{json, Value};

const HEAD: &str = include_str!("templates/head.hbs");
const INDEX: &str = include_str!("templates/index.hbs");
const RESULTS: &str = include_str!("templates/results.hbs");
const ERROR: &str = include_str!("templates/error.hbs");

/// Title of the upload page.
pub const INDEX_TITLE: &str = "Document Analysis with Gemini";

/// Compiled page templates.
pub struct Pages {
    registry: Handlebars<'static>,
}

impl Pages {
    /// Compile every page template.
    pub fn new() -> Result<Self, DocExtractError> {
        let mut registry = Handlebars::new();
        registry
            .register_partial("head", HEAD)
            .map_err(|e| template_error("head", e))?;
        for (name, source) in [("index", INDEX), ("results", RESULTS), ("error", ERROR)] {
            registry
                .register_template_string(name, source)
                .map_err(|e| template_error(name, e))?;
        }
        Ok(Self { registry })
    }

    /// The upload page with the PDF and image forms.
    pub fn index(&self) -> Result<String, DocExtractError> {
        self.render("index", &json!({ "title": INDEX_TITLE }))
    }

    /// The results page: optional image preview, the combined answers, and a
    /// download form carrying the blocks as a JSON array.
    pub fn results(
        &self,
        heading: &str,
        output: &AnalysisOutput,
        preview: Option<&str>,
    ) -> Result<String, DocExtractError> {
        let blocks = serde_json::to_string(&output.blocks)
            .map_err(|e| DocExtractError::Internal(format!("Cannot encode blocks: {e}")))?;
        self.render(
            "results",
            &json!({
                "title": heading,
                "preview": preview,
                "text": output.combined_text(),
                "blocks": blocks,
                "documents": output.stats.total_documents,
                "model": output.stats.model,
                "duration_ms": output.stats.total_duration_ms,
            }),
        )
    }

    pub fn error(&self, err: &DocExtractError) -> Result<String, DocExtractError> {
        self.render(
            "error",
            &json!({ "title": "Analysis failed", "message": err.to_string() }),
        )
    }

    fn render(&self, name: &str, data: &Value) -> Result<String, DocExtractError> {
        self.registry
            .render(name, data)
            .map_err(|e| DocExtractError::Internal(format!("Page '{name}' failed to render: {e}")))
    }
}

fn template_error(name: &str, e: handlebars::TemplateError) -> DocExtractError {
    DocExtractError::Internal(format!("Template '{name}' does not compile: {e}"))
}
