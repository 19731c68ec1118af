//! Configuration types for document analysis and the web form.
//!
//! Everything the analysis needs (credentials, model choice, prompt,
//! timeouts) lives in [`AnalyzerConfig`], built once at process start via
//! [`AnalyzerConfigBuilder`] and handed to whatever issues the model call.
//! Nothing in the library reads credentials from the environment; the binary
//! maps its flags (which may fall back to env vars) onto the builder.
//!
//! [`ServerConfig`] holds the settings of the HTTP surface only.

use crate::error::DocExtractError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::net::SocketAddr;

/// Default Gemini model for both text and image uploads.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default base URL of the Google Generative Language API.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration for analysing uploaded documents.
///
/// # Example
/// ```rust
/// use doc_extractor::AnalyzerConfig;
///
/// let config = AnalyzerConfig::builder()
///     .api_key("test-key")
///     .model("gemini-1.5-pro")
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "gemini-1.5-pro");
/// ```
#[derive(Clone)]
pub struct AnalyzerConfig {
    /// API key for the Gemini endpoint. Required unless `provider_name` is set.
    pub api_key: Option<String>,

    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Base URL of the Generative Language API. Default: [`DEFAULT_API_BASE_URL`].
    pub api_base_url: String,

    /// Route calls through an `edgequake-llm` provider (e.g. "openai",
    /// "anthropic", "ollama") instead of the built-in Gemini client.
    pub provider_name: Option<String>,

    /// Custom extraction prompt. If None, uses [`crate::prompts::EXTRACTION_PROMPT`].
    pub prompt: Option<String>,

    /// Sampling temperature. None leaves the service default in place.
    pub temperature: Option<f32>,

    /// Per-model-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            provider_name: None,
            prompt: None,
            temperature: None,
            api_timeout_secs: 60,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("api_base_url", &self.api_base_url)
            .field("provider_name", &self.provider_name)
            .field("prompt", &self.prompt.as_ref().map(|p| p.len()))
            .field("temperature", &self.temperature)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn AnalysisProgressCallback>"),
            )
            .finish()
    }
}

impl AnalyzerConfig {
    /// Create a new builder for `AnalyzerConfig`.
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder {
            config: Self::default(),
        }
    }

    /// The prompt sent with every document.
    pub fn effective_prompt(&self) -> &str {
        self.prompt
            .as_deref()
            .unwrap_or(crate::prompts::EXTRACTION_PROMPT)
    }
}

/// Builder for [`AnalyzerConfig`].
#[derive(Debug)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// A missing API key is not an error here: rendering and the upload page
    /// work without one, and the model client reports it when first built.
    pub fn build(self) -> Result<AnalyzerConfig, DocExtractError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(DocExtractError::InvalidConfig(
                "Model name must not be empty".into(),
            ));
        }
        if !(c.api_base_url.starts_with("http://") || c.api_base_url.starts_with("https://")) {
            return Err(DocExtractError::InvalidConfig(format!(
                "API base URL must be http(s), got '{}'",
                c.api_base_url
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(DocExtractError::InvalidConfig(
                "API timeout must be ≥ 1s".into(),
            ));
        }
        if matches!(c.prompt.as_deref(), Some(p) if p.trim().is_empty()) {
            return Err(DocExtractError::InvalidConfig(
                "Prompt must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Settings of the web form server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address. Default: `127.0.0.1:8501`.
    pub bind: SocketAddr,

    /// Largest accepted request body in bytes. Default: 25 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8501)),
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}
