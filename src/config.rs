//! Process configuration read once at startup.
//!
//! | variable | default |
//! |---|---|
//! | `VISION_PROVIDER` | `gemini` (`openrouter` also accepted) |
//! | `GOOGLE_API_KEY` / `GEMINI_API_KEY` | required for gemini |
//! | `OPENROUTER_API_KEY` | required for openrouter |
//! | `OPENROUTER_ENDPOINT` | `https://openrouter.ai/api/v1` |
//! | `VISION_MODEL` | per provider |
//! | `VISION_TIMEOUT_SECS` | `60` |
//! | `VISION_JPEG_QUALITY` | `75` |
//! | `VISION_MAX_TOKENS` | `2048` |

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::error::VisionError;
use crate::image::{NormalizeOptions, DEFAULT_JPEG_QUALITY};
use crate::llm::{LlmConfig, DEFAULT_TIMEOUT};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_OPENROUTER_MODEL: &str = "google/gemini-flash-1.5";
pub const DEFAULT_OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MAX_TOKENS: u64 = 2048;

/// Value shipped in sample configs; never a real credential.
const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    #[default]
    Gemini,
    OpenRouter,
}

impl Provider {
    fn key_vars(&self) -> &'static [&'static str] {
        match self {
            Provider::Gemini => &["GOOGLE_API_KEY", "GEMINI_API_KEY"],
            Provider::OpenRouter => &["OPENROUTER_API_KEY"],
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            Provider::Gemini => DEFAULT_GEMINI_MODEL,
            Provider::OpenRouter => DEFAULT_OPENROUTER_MODEL,
        }
    }
}

impl FromStr for Provider {
    type Err = VisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Provider::Gemini),
            "openrouter" => Ok(Provider::OpenRouter),
            other => Err(VisionError::Configuration(format!(
                "unknown VISION_PROVIDER '{}', expected 'gemini' or 'openrouter'",
                other
            ))),
        }
    }
}

#[derive(Clone)]
pub struct Settings {
    pub provider: Provider,
    api_key: String,
    pub model: String,
    /// Base URL for OpenRouter, normalized to end in `/api/v1`. Only read
    /// when the provider is OpenRouter.
    pub endpoint: String,
    pub timeout: Duration,
    pub jpeg_quality: u8,
    pub max_tokens: Option<u64>,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, VisionError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Read settings from an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, VisionError> {
        let provider = match lookup(vars, "VISION_PROVIDER") {
            Some(value) => value.parse()?,
            None => Provider::default(),
        };

        let api_key = require_api_key(vars, provider)?;

        let model = lookup(vars, "VISION_MODEL")
            .unwrap_or(provider.default_model())
            .to_string();

        let endpoint = match provider {
            Provider::OpenRouter => normalize_openrouter_endpoint(
                lookup(vars, "OPENROUTER_ENDPOINT").unwrap_or(DEFAULT_OPENROUTER_ENDPOINT),
            )?,
            Provider::Gemini => DEFAULT_OPENROUTER_ENDPOINT.to_string(),
        };

        let timeout_secs: u64 = parse_var(vars, "VISION_TIMEOUT_SECS", DEFAULT_TIMEOUT.as_secs())?;
        if timeout_secs == 0 {
            return Err(VisionError::Configuration(
                "VISION_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        let jpeg_quality: u8 = parse_var(vars, "VISION_JPEG_QUALITY", DEFAULT_JPEG_QUALITY)?;
        if !(1..=100).contains(&jpeg_quality) {
            return Err(VisionError::Configuration(format!(
                "VISION_JPEG_QUALITY must be between 1 and 100, got {}",
                jpeg_quality
            )));
        }

        let max_tokens: u64 = parse_var(vars, "VISION_MAX_TOKENS", DEFAULT_MAX_TOKENS)?;

        Ok(Self {
            provider,
            api_key,
            model,
            endpoint,
            timeout: Duration::from_secs(timeout_secs),
            jpeg_quality,
            max_tokens: (max_tokens > 0).then_some(max_tokens),
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.timeout = timeout;
        }
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions::default().with_quality(self.jpeg_quality)
    }

    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig::default().with_max_tokens(self.max_tokens)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("provider", &self.provider)
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn lookup<'a>(vars: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    vars.get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn require_api_key(vars: &HashMap<String, String>, provider: Provider) -> Result<String, VisionError> {
    let names = provider.key_vars();
    let key = names
        .iter()
        .find_map(|name| lookup(vars, name))
        .ok_or_else(|| {
            VisionError::Configuration(format!("no API key found, set {}", names.join(" or ")))
        })?;

    if key == PLACEHOLDER_API_KEY {
        return Err(VisionError::Configuration(format!(
            "{} still holds the placeholder value",
            names.join("/")
        )));
    }

    Ok(key.to_string())
}

fn parse_var<T: FromStr>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T, VisionError> {
    match lookup(vars, name) {
        Some(raw) => raw.parse().map_err(|_| {
            VisionError::Configuration(format!("{} has an invalid value '{}'", name, raw))
        }),
        None => Ok(default),
    }
}

/// Accepts `https://openrouter.ai/api`, `.../api/`, `.../api/v1` or
/// `.../api/v1/` and returns the `/api/v1` form. Other gateways get `/v1`
/// appended unless they already end with it.
fn normalize_openrouter_endpoint(endpoint: &str) -> Result<String, VisionError> {
    Url::parse(endpoint).map_err(|e| {
        VisionError::Configuration(format!("OPENROUTER_ENDPOINT '{}' is not a URL: {}", endpoint, e))
    })?;

    let endpoint = endpoint.trim_end_matches('/');
    let normalized = if endpoint.ends_with("/v1") {
        endpoint.to_string()
    } else {
        format!("{}/v1", endpoint)
    };
    Ok(normalized)
}
