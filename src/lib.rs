pub mod config;
pub mod error;
pub mod image;
pub mod llm;
pub mod model;
pub mod prompts;

use tracing::{info, warn};

// Re-export key types
pub use config::{Provider, Settings};
pub use error::VisionError;
pub use llm::{
    create_llm_client, create_llm_client_with_config, InferenceClient, LlmClient, LlmConfig,
    LlmWrapper, MockLlmClient, SharedLlmClient,
};
pub use model::{
    AnalysisFailure, AnalysisMode, AnalysisResult, ColorMode, FailureKind, NormalizedImage,
    UploadedImage,
};
pub use prompts::{prompt_for, DAILY_TASKS_PROMPT, SAFETY_NAVIGATION_PROMPT};

use crate::image::ImageNormalizer;

/// Main interface: normalize an upload, pick the prompt for the mode and ask
/// the model.
#[derive(Clone)]
pub struct VisionAssistant {
    normalizer: ImageNormalizer,
    client: InferenceClient,
}

impl VisionAssistant {
    pub fn new(client: InferenceClient) -> Self {
        Self {
            normalizer: ImageNormalizer::new(),
            client,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(InferenceClient::from_settings(settings))
            .with_normalizer(ImageNormalizer::with_options(settings.normalize_options()))
    }

    pub fn with_normalizer(mut self, normalizer: ImageNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn normalizer(&self) -> &ImageNormalizer {
        &self.normalizer
    }

    pub fn client(&self) -> &InferenceClient {
        &self.client
    }

    /// Run one analysis. Decode and inference failures come back as
    /// [`AnalysisResult::Failure`].
    pub async fn assist(&self, upload: &UploadedImage, mode: AnalysisMode) -> AnalysisResult {
        info!(
            mode = %mode,
            upload_bytes = upload.len(),
            declared_mime = upload.declared_mime.as_deref().unwrap_or("unknown"),
            "starting analysis"
        );

        let image = match self.normalizer.normalize_upload(upload) {
            Ok(image) => image,
            Err(e) => {
                warn!(mode = %mode, error = %e, "could not normalize upload");
                return e.into();
            }
        };

        self.client.analyze(&image, prompt_for(mode)).await
    }
}
