use base64::prelude::*;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::VisionError;

/// An image exactly as the caller handed it over, before any decoding.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Raw file bytes
    pub data: Bytes,
    /// Media type claimed by the caller (e.g. from a file extension or upload header)
    pub declared_mime: Option<String>,
    /// Original file name, if the upload came from disk
    pub file_name: Option<String>,
}

impl UploadedImage {
    pub fn new(data: impl Into<Bytes>, declared_mime: Option<String>) -> Self {
        Self {
            data: data.into(),
            declared_mime,
            file_name: None,
        }
    }

    /// Read an upload from disk, guessing the declared type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, VisionError> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let declared_mime = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.to_string());
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string);

        Ok(Self {
            data: Bytes::from(data),
            declared_mime,
            file_name,
        })
    }

    /// MIME type detected from the magic bytes, ignoring what the caller claimed
    pub fn sniffed_mime(&self) -> Option<&'static str> {
        infer::get(&self.data).map(|kind| kind.mime_type())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Color layout of a normalized bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    Rgb,
    Grayscale,
}

/// A re-encoded image that is safe to send to the inference service.
///
/// Only the normalizer can build one, so the color mode is always RGB or
/// grayscale and `data` is always a JPEG stream. Serializes as metadata only.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedImage {
    #[serde(skip)]
    data: Bytes,
    mime_type: String,
    width: u32,
    height: u32,
    color: ColorMode,
}

impl NormalizedImage {
    pub(crate) fn new(
        data: Bytes,
        mime_type: impl Into<String>,
        width: u32,
        height: u32,
        color: ColorMode,
    ) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            width,
            height,
            color,
        }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color(&self) -> ColorMode {
        self.color
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get base64 encoded image data
    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(&self.data)
    }
}

/// Which kind of guidance the user is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisMode {
    /// Objects, obstacles and hazards, with navigation advice
    #[default]
    SafetyNavigation,
    /// Labels, text and items, with tips for handling them
    DailyTasks,
}

impl AnalysisMode {
    pub const ALL: [AnalysisMode; 2] = [AnalysisMode::SafetyNavigation, AnalysisMode::DailyTasks];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::SafetyNavigation => "safety-navigation",
            AnalysisMode::DailyTasks => "daily-tasks",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "safety" | "navigation" | "safety-navigation" => Ok(AnalysisMode::SafetyNavigation),
            "daily" | "tasks" | "daily-tasks" => Ok(AnalysisMode::DailyTasks),
            other => Err(format!(
                "unknown analysis mode '{}', expected 'safety' or 'daily'",
                other
            )),
        }
    }
}

/// Broad class of a failed analysis, used to pick what to tell the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Decode,
    Configuration,
    Inference,
}

impl FailureKind {
    pub fn user_hint(&self) -> &'static str {
        match self {
            FailureKind::Decode => "Please try uploading a different image.",
            FailureKind::Configuration => {
                "Please set GOOGLE_API_KEY (or OPENROUTER_API_KEY with VISION_PROVIDER=openrouter)."
            }
            FailureKind::Inference => "Please try again later.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl AnalysisFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for AnalysisFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<VisionError> for AnalysisFailure {
    fn from(error: VisionError) -> Self {
        let kind = match error {
            VisionError::Io(_) | VisionError::Decode(_) | VisionError::Encode(_) => {
                FailureKind::Decode
            }
            VisionError::Configuration(_) => FailureKind::Configuration,
            VisionError::Inference(_) | VisionError::Timeout(_) => FailureKind::Inference,
        };
        AnalysisFailure::new(kind, error.to_string())
    }
}

/// Outcome of one analysis request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisResult {
    Success { text: String },
    Failure(AnalysisFailure),
}

impl AnalysisResult {
    pub fn success(text: impl Into<String>) -> Self {
        AnalysisResult::Success { text: text.into() }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        AnalysisResult::Failure(AnalysisFailure::new(kind, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisResult::Success { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            AnalysisResult::Success { text } => Some(text),
            AnalysisResult::Failure(_) => None,
        }
    }

    pub fn failure_info(&self) -> Option<&AnalysisFailure> {
        match self {
            AnalysisResult::Success { .. } => None,
            AnalysisResult::Failure(failure) => Some(failure),
        }
    }

    pub fn into_result(self) -> Result<String, AnalysisFailure> {
        match self {
            AnalysisResult::Success { text } => Ok(text),
            AnalysisResult::Failure(failure) => Err(failure),
        }
    }
}

impl From<VisionError> for AnalysisResult {
    fn from(error: VisionError) -> Self {
        AnalysisResult::Failure(error.into())
    }
}
