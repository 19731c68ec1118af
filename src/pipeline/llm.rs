//! Model interaction: send one document's content plus the prompt, get text back.
//!
//! Everything above this module talks to the model through [`ContentModel`],
//! a single `(content, prompt) -> text` call, so tests and alternate backends
//! can be swapped in without touching the pipeline.
//!
//! Two implementations ship with the crate:
//!
//! * [`GeminiClient`]: the default. One `generateContent` request per call
//!   against the Google Generative Language REST API, authenticated with the
//!   API key from [`AnalyzerConfig`]. The content part goes first and the
//!   prompt second, in a single user turn.
//! * [`ProviderModel`]: an adapter over any `edgequake-llm` provider
//!   (OpenAI, Anthropic, Ollama, …) for deployments that do not use Gemini.
//!
//! There is no retry: a failed call fails the analysis run.

use crate::config::AnalyzerConfig;
use crate::error::DocExtractError;
use crate::pipeline::encode::InlineImage;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// What the model is asked about.
#[derive(Debug, Clone)]
pub enum ModelInput {
    /// Text extracted from a PDF.
    Text(String),
    /// An uploaded image, sent as inline data.
    Image(InlineImage),
}

/// A remote model reduced to one operation.
#[async_trait]
pub trait ContentModel: Send + Sync {
    /// Identifier of the underlying model, for logs and result metadata.
    fn model_name(&self) -> &str;

    /// Ask the model about `input`, following `prompt`, and return its answer.
    async fn generate(&self, input: &ModelInput, prompt: &str) -> Result<String, DocExtractError>;
}

/// Build the model client described by `config`.
///
/// 1. `provider_name` set → [`ProviderModel`] via `edgequake-llm`.
/// 2. `api_key` set → [`GeminiClient`].
/// 3. Otherwise → [`DocExtractError::ModelNotConfigured`].
pub fn build_model(config: &AnalyzerConfig) -> Result<Arc<dyn ContentModel>, DocExtractError> {
    if let Some(ref name) = config.provider_name {
        let provider = ProviderFactory::create_llm_provider(name.as_str(), config.model.as_str())
            .map_err(|e| DocExtractError::ModelNotConfigured {
                model: format!("{}/{}", name, config.model),
                hint: format!("{e}"),
            })?;
        info!("Using provider '{}' with model '{}'", name, config.model);
        return Ok(Arc::new(ProviderModel::new(provider, config)));
    }

    let client = GeminiClient::new(config)?;
    info!("Using Gemini model '{}'", config.model);
    Ok(Arc::new(client))
}

// ── Gemini ───────────────────────────────────────────────────────────────────

/// Client for the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: Option<f32>,
    timeout_secs: u64,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a client from an explicit configuration.
    ///
    /// # Errors
    /// [`DocExtractError::ModelNotConfigured`] when no API key was supplied.
    pub fn new(config: &AnalyzerConfig) -> Result<Self, DocExtractError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| DocExtractError::ModelNotConfigured {
                model: config.model.clone(),
                hint: "No API key supplied. Pass --api-key or set GOOGLE_API_KEY.".into(),
            })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| DocExtractError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key,
            model: config.model.clone(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            timeout_secs: config.api_timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ContentModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, input: &ModelInput, prompt: &str) -> Result<String, DocExtractError> {
        let body = build_request(input, prompt, self.temperature);

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DocExtractError::ModelTimeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    DocExtractError::ModelRequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DocExtractError::ModelRequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(DocExtractError::ModelApiError {
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }

        let answer = parse_response(&self.model, &text)?;
        debug!("{}: {} chars answered", self.model, answer.len());
        Ok(answer)
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

fn build_request<'a>(
    input: &'a ModelInput,
    prompt: &'a str,
    temperature: Option<f32>,
) -> GenerateContentRequest<'a> {
    let content_part = match input {
        ModelInput::Text(text) => RequestPart::Text { text },
        ModelInput::Image(img) => RequestPart::InlineData {
            inline_data: InlineData {
                mime_type: &img.mime_type,
                data: &img.data,
            },
        },
    };

    GenerateContentRequest {
        contents: vec![RequestContent {
            role: "user",
            parts: vec![content_part, RequestPart::Text { text: prompt }],
        }],
        generation_config: temperature.map(|temperature| GenerationConfig { temperature }),
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Concatenate the text parts of the first candidate.
fn parse_response(model: &str, body: &str) -> Result<String, DocExtractError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
        DocExtractError::ModelRequestFailed(format!("Unreadable response from {model}: {e}"))
    })?;

    let first = parsed.candidates.into_iter().next();
    let text: String = first
        .as_ref()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        let reason = first
            .and_then(|c| c.finish_reason)
            .or_else(|| parsed.prompt_feedback.and_then(|f| f.block_reason));
        return Err(DocExtractError::EmptyModelResponse {
            model: model.to_string(),
            reason,
        });
    }

    Ok(text)
}

/// The service's own error message when the body carries one.
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => {
            let trimmed = body.trim();
            if trimmed.chars().count() > 200 {
                format!("{}\u{2026}", trimmed.chars().take(199).collect::<String>())
            } else {
                trimmed.to_string()
            }
        }
    }
}

// ── edgequake-llm providers ──────────────────────────────────────────────────

/// [`ContentModel`] over an `edgequake-llm` provider.
///
/// The prompt is sent as the system message; the document text (or image)
/// forms the user turn.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    model: String,
    temperature: Option<f32>,
    timeout_secs: u64,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AnalyzerConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_secs: config.api_timeout_secs,
        }
    }
}

#[async_trait]
impl ContentModel for ProviderModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, input: &ModelInput, prompt: &str) -> Result<String, DocExtractError> {
        let user = match input {
            ModelInput::Text(text) => ChatMessage::user_with_images(text.as_str(), vec![]),
            ModelInput::Image(img) => ChatMessage::user_with_images(
                "",
                vec![ImageData::new(img.data.clone(), img.mime_type.as_str())],
            ),
        };
        let messages = vec![ChatMessage::system(prompt), user];

        let options = CompletionOptions {
            temperature: self.temperature,
            ..Default::default()
        };

        let call = self.provider.chat(&messages, Some(&options));
        let response = tokio::time::timeout(Duration::from_secs(self.timeout_secs), call)
            .await
            .map_err(|_| DocExtractError::ModelTimeout {
                secs: self.timeout_secs,
            })?
            .map_err(|e| DocExtractError::ModelRequestFailed(e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.model, response.prompt_tokens, response.completion_tokens
        );

        if response.content.is_empty() {
            return Err(DocExtractError::EmptyModelResponse {
                model: self.model.clone(),
                reason: None,
            });
        }
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn image() -> InlineImage {
        InlineImage {
            mime_type: "image/png".into(),
            data: "iVBORw0KGgo=".into(),
            width: 1,
            height: 1,
        }
    }

    #[test]
    fn text_request_puts_content_before_prompt() {
        let input = ModelInput::Text("ACME Corp, 3 widgets".into());
        let body = serde_json::to_value(build_request(&input, "Extract.", None)).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "ACME Corp, 3 widgets" },
                        { "text": "Extract." }
                    ]
                }]
            })
        );
    }

    #[test]
    fn image_request_uses_inline_data() {
        let input = ModelInput::Image(image());
        let body = serde_json::to_value(build_request(&input, "Extract.", Some(0.2))).unwrap();
        assert_eq!(
            body["contents"][0]["parts"][0],
            json!({ "inline_data": { "mime_type": "image/png", "data": "iVBORw0KGgo=" } })
        );
        assert_eq!(body["contents"][0]["parts"][1]["text"], "Extract.");
        let t = body["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((t - 0.2).abs() < 1e-6);
    }

    #[test]
    fn parse_joins_text_parts_of_first_candidate() {
        let body = json!({
            "candidates": [
                { "content": { "parts": [ { "text": "Customer: Jane\n" }, { "text": "Total: $10" } ] },
                  "finishReason": "STOP" },
                { "content": { "parts": [ { "text": "ignored" } ] } }
            ]
        })
        .to_string();
        assert_eq!(
            parse_response("gemini-1.5-flash", &body).unwrap(),
            "Customer: Jane\nTotal: $10"
        );
    }

    #[test]
    fn parse_keeps_whitespace_only_answer() {
        let body = json!({
            "candidates": [ { "content": { "parts": [ { "text": " \n" } ] } } ]
        })
        .to_string();
        assert_eq!(parse_response("m", &body).unwrap(), " \n");
    }

    #[test]
    fn parse_empty_candidate_reports_finish_reason() {
        let body = json!({ "candidates": [ { "finishReason": "SAFETY" } ] }).to_string();
        match parse_response("m", &body).unwrap_err() {
            DocExtractError::EmptyModelResponse { reason, .. } => {
                assert_eq!(reason.as_deref(), Some("SAFETY"))
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parse_blocked_prompt_reports_block_reason() {
        let body = json!({ "promptFeedback": { "blockReason": "OTHER" } }).to_string();
        match parse_response("m", &body).unwrap_err() {
            DocExtractError::EmptyModelResponse { reason, .. } => {
                assert_eq!(reason.as_deref(), Some("OTHER"))
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parse_garbage_is_request_failure() {
        let err = parse_response("m", "<html>").unwrap_err();
        assert!(matches!(err, DocExtractError::ModelRequestFailed(_)));
    }

    #[test]
    fn api_error_message_prefers_service_message() {
        let body = json!({ "error": { "code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT" } })
            .to_string();
        assert_eq!(api_error_message(&body), "API key not valid.");
        assert_eq!(api_error_message("  upstream down \n"), "upstream down");
        assert_eq!(api_error_message(&"x".repeat(500)).chars().count(), 200);
    }

    #[test]
    fn gemini_requires_api_key() {
        let config = AnalyzerConfig::default();
        let err = GeminiClient::new(&config).unwrap_err();
        assert!(matches!(err, DocExtractError::ModelNotConfigured { .. }));

        let config = AnalyzerConfig::builder().api_key("   ").build().unwrap();
        assert!(GeminiClient::new(&config).is_err());
    }

    #[test]
    fn build_model_without_credentials_fails() {
        let err = build_model(&AnalyzerConfig::default()).err().unwrap();
        assert!(err.to_string().contains("GOOGLE_API_KEY"), "got: {err}");
    }

    #[test]
    fn gemini_endpoint_format() {
        let config = AnalyzerConfig::builder()
            .api_key("k")
            .api_base_url("http://localhost:9999/v1beta/")
            .build()
            .unwrap();
        let client = GeminiClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(client.model_name(), "gemini-1.5-flash");
        assert!(!format!("{client:?}").contains("api_key"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_request_failure() {
        let config = AnalyzerConfig::builder()
            .api_key("k")
            .api_base_url("http://127.0.0.1:1")
            .api_timeout_secs(5)
            .build()
            .unwrap();
        let client = GeminiClient::new(&config).unwrap();
        let err = client
            .generate(&ModelInput::Text("x".into()), "p")
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                DocExtractError::ModelRequestFailed(_) | DocExtractError::ModelTimeout { .. }
            ),
            "got: {err:?}"
        );
    }
}
