//! Inference client for any rig-core compatible vision model.
//!
//! [`LlmClient`] is the seam to the remote service: it sends one prompt and
//! one image and returns the generated text or an error. [`InferenceClient`]
//! sits on top of it and turns every outcome, including timeouts and
//! cancellation, into an [`AnalysisResult`].
//!
//! # Example
//! ```ignore
//! use rig::client::CompletionClient;
//! use rig::providers::gemini;
//! use vision_assist::llm::{create_llm_client, InferenceClient};
//!
//! let client = gemini::Client::new(&api_key);
//! let llm = create_llm_client(client.completion_model("gemini-1.5-flash"));
//! let inference = InferenceClient::new(llm);
//! let result = inference.analyze(&image, prompt).await;
//! ```

use async_trait::async_trait;
use rig::{
    client::CompletionClient,
    completion::{AssistantContent, CompletionModel, CompletionRequestBuilder},
    message::{ImageDetail, ImageMediaType, Message, UserContent},
    providers::{gemini, openrouter},
    OneOrMany,
};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::{Provider, Settings};
use crate::error::VisionError;
use crate::model::{AnalysisResult, NormalizedImage};
use crate::prompts::ASSISTANT_PREAMBLE;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-request generation settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// System preamble sent ahead of the prompt (None = provider default)
    pub preamble: Option<String>,
    /// Sampling temperature (None = provider default)
    pub temperature: Option<f64>,
    /// Maximum tokens for the generated answer (None = no limit)
    pub max_tokens: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            preamble: Some(ASSISTANT_PREAMBLE.to_string()),
            temperature: None,
            max_tokens: Some(2048),
        }
    }
}

impl LlmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    pub fn without_preamble(mut self) -> Self {
        self.preamble = None;
        self
    }

    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = Some(temp.clamp(0.0, 2.0));
        self
    }

    pub fn with_max_tokens(mut self, tokens: Option<u64>) -> Self {
        self.max_tokens = tokens;
        self
    }
}

/// A remote model that can answer one prompt about one image.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send the prompt and the image as a single multimodal message.
    async fn generate(&self, prompt: &str, image: &NormalizedImage)
        -> Result<String, VisionError>;

    fn config(&self) -> &LlmConfig;
}

/// Wraps any rig-core `CompletionModel` (Gemini, OpenRouter, OpenAI, ...).
pub struct LlmWrapper<M: CompletionModel> {
    model: Arc<M>,
    config: LlmConfig,
}

impl<M: CompletionModel> LlmWrapper<M> {
    pub fn new(model: M) -> Self {
        Self::with_config(model, LlmConfig::default())
    }

    pub fn with_config(model: M, config: LlmConfig) -> Self {
        Self {
            model: Arc::new(model),
            config,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    fn build_request(&self, prompt: &str, image: &NormalizedImage) -> CompletionRequestBuilder<M> {
        let mut builder = self.model.completion_request(user_message(prompt, image));

        if let Some(preamble) = &self.config.preamble {
            builder = builder.preamble(preamble.clone());
        }
        if let Some(temperature) = self.config.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }

        builder
    }
}

#[async_trait]
impl<M: CompletionModel + Send + Sync + 'static> LlmClient for LlmWrapper<M> {
    async fn generate(
        &self,
        prompt: &str,
        image: &NormalizedImage,
    ) -> Result<String, VisionError> {
        let request = self.build_request(prompt, image).build();
        let response = self.model.completion(request).await?;
        response_text(&response.choice)
    }

    fn config(&self) -> &LlmConfig {
        &self.config
    }
}

/// The prompt followed by the image, as one user turn.
fn user_message(prompt: &str, image: &NormalizedImage) -> Message {
    let mut content = OneOrMany::one(UserContent::text(prompt));
    content.push(UserContent::image_base64(
        image.to_base64(),
        Some(parse_mime_to_image_type(image.mime_type())),
        Some(ImageDetail::Auto),
    ));
    Message::User { content }
}

/// Text parts of a reply; a reply without any text counts as malformed.
fn response_text(choice: &OneOrMany<AssistantContent>) -> Result<String, VisionError> {
    let text = extract_text_from_response(choice);
    if text.trim().is_empty() {
        return Err(VisionError::Inference(
            "the model returned no text (the response may have been blocked)".to_string(),
        ));
    }
    Ok(text)
}

fn extract_text_from_response(content: &OneOrMany<AssistantContent>) -> String {
    content
        .iter()
        .filter_map(|c| match c {
            AssistantContent::Text(text) => Some(text.text.clone()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse MIME type string to rig ImageMediaType
fn parse_mime_to_image_type(mime_type: &str) -> ImageMediaType {
    match mime_type.to_lowercase().as_str() {
        "image/png" => ImageMediaType::PNG,
        "image/gif" => ImageMediaType::GIF,
        "image/webp" => ImageMediaType::WEBP,
        _ => ImageMediaType::JPEG,
    }
}

/// One request seen by [`MockLlmClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub prompt: String,
    pub mime_type: String,
    pub image_bytes: usize,
}

/// A stub LLM client for testing
pub struct MockLlmClient {
    response: Result<String, String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
    config: LlmConfig,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            response: Ok("A mock analysis".to_string()),
            delay: None,
            calls: Mutex::new(Vec::new()),
            config: LlmConfig::default(),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Ok(response.into());
        self
    }

    /// Make every call fail with `message`, like a quota or auth error would.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.response = Err(message.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_config(mut self, config: LlmConfig) -> Self {
        self.config = config;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(
        &self,
        prompt: &str,
        image: &NormalizedImage,
    ) -> Result<String, VisionError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                prompt: prompt.to_string(),
                mime_type: image.mime_type().to_string(),
                image_bytes: image.len(),
            });
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.response.clone().map_err(VisionError::Inference)
    }

    fn config(&self) -> &LlmConfig {
        &self.config
    }
}

/// Type alias for a boxed LLM client that can be shared across threads
pub type SharedLlmClient = Arc<dyn LlmClient>;

pub fn create_llm_client<M: CompletionModel + Send + Sync + 'static>(model: M) -> SharedLlmClient {
    Arc::new(LlmWrapper::new(model))
}

pub fn create_llm_client_with_config<M: CompletionModel + Send + Sync + 'static>(
    model: M,
    config: LlmConfig,
) -> SharedLlmClient {
    Arc::new(LlmWrapper::with_config(model, config))
}

/// Build the provider client named in `settings`. The credential goes
/// straight into the provider client and is not kept anywhere else.
pub fn create_llm_client_from_settings(settings: &Settings) -> SharedLlmClient {
    let config = settings.llm_config();

    match settings.provider {
        Provider::Gemini => {
            let client = gemini::Client::new(settings.api_key());
            create_llm_client_with_config(client.completion_model(&settings.model), config)
        }
        Provider::OpenRouter => {
            let client = openrouter::Client::builder(settings.api_key())
                .base_url(settings.endpoint.as_str())
                .build();
            create_llm_client_with_config(client.completion_model(&settings.model), config)
        }
    }
}

/// Runs one analysis per call and never lets a remote failure escape as an
/// error: everything ends up in [`AnalysisResult`].
#[derive(Clone)]
pub struct InferenceClient {
    llm: SharedLlmClient,
    timeout: Duration,
}

impl InferenceClient {
    pub fn new(llm: SharedLlmClient) -> Self {
        Self {
            llm,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(create_llm_client_from_settings(settings)).with_timeout(settings.timeout)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn llm(&self) -> &SharedLlmClient {
        &self.llm
    }

    pub async fn analyze(&self, image: &NormalizedImage, prompt: &str) -> AnalysisResult {
        self.analyze_until(image, prompt, std::future::pending::<()>())
            .await
    }

    /// Like [`analyze`](Self::analyze), but drops the outbound request as soon
    /// as `cancel` resolves.
    pub async fn analyze_until<C>(
        &self,
        image: &NormalizedImage,
        prompt: &str,
        cancel: C,
    ) -> AnalysisResult
    where
        C: Future<Output = ()>,
    {
        let started = Instant::now();
        info!(
            image_bytes = image.len(),
            width = image.width(),
            height = image.height(),
            prompt_chars = prompt.len(),
            "sending analysis request"
        );

        let outcome = tokio::select! {
            result = tokio::time::timeout(self.timeout, self.llm.generate(prompt, image)) => {
                match result {
                    Ok(generated) => generated,
                    Err(_) => Err(VisionError::Timeout(self.timeout)),
                }
            }
            _ = cancel => Err(VisionError::Inference("analysis cancelled".to_string())),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(text) => {
                info!(elapsed_ms, response_chars = text.len(), "analysis complete");
                AnalysisResult::success(text)
            }
            Err(e) => {
                warn!(elapsed_ms, error = %e, "analysis failed");
                e.into()
            }
        }
    }
}
