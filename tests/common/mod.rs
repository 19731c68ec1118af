//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use doc_extractor::{create_pdf_from_text, ContentModel, DocExtractError, ModelInput};
use image::{DynamicImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Route library logs through the test harness; `RUST_LOG=debug` shows them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// What the mock saw on one call.
#[derive(Debug, Clone)]
pub enum Seen {
    Text(String),
    Image { mime_type: String, data_len: usize },
}

/// A `ContentModel` that answers from a script and records its inputs.
pub struct MockModel {
    answers: Mutex<Vec<Result<String, DocExtractError>>>,
    pub calls: Mutex<Vec<(Seen, String)>>,
}

impl MockModel {
    /// Answers are handed out in order; once exhausted every call echoes
    /// a fixed answer.
    pub fn scripted(answers: Vec<Result<String, DocExtractError>>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().rev().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always(answer: &str) -> Self {
        Self::scripted((0..8).map(|_| Ok(answer.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn seen(&self) -> Vec<(Seen, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentModel for MockModel {
    fn model_name(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, input: &ModelInput, prompt: &str) -> Result<String, DocExtractError> {
        let seen = match input {
            ModelInput::Text(t) => Seen::Text(t.clone()),
            ModelInput::Image(img) => Seen::Image {
                mime_type: img.mime_type.clone(),
                data_len: img.data.len(),
            },
        };
        self.calls.lock().unwrap().push((seen, prompt.to_string()));
        self.answers
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Ok("Total: 0".to_string()))
    }
}

/// A one-page PDF whose extracted text contains `text`.
pub fn pdf_with_text(text: &str) -> Vec<u8> {
    create_pdf_from_text(&[text]).unwrap().into_inner()
}

pub fn png_bytes() -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 128, 255, 255])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}
