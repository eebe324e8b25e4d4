use std::io;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("IO error: {0} - Please check file permissions and path")]
    Io(#[from] io::Error),

    #[error("Decode error: {0} - Please try a different image")]
    Decode(String),

    #[error("Encode error: {0} - Please try a different image")]
    Encode(String),

    #[error("Configuration error: {0} - Please check your environment settings")]
    Configuration(String),

    #[error("Inference error: {0} - Please check your API configuration or try again later")]
    Inference(String),

    #[error("Inference error: no response within {0:?} - The service may be overloaded, try again later")]
    Timeout(Duration),
}

impl VisionError {
    pub fn decode(err: impl ToString) -> Self {
        VisionError::Decode(err.to_string())
    }
}

impl From<rig::completion::CompletionError> for VisionError {
    fn from(error: rig::completion::CompletionError) -> Self {
        VisionError::Inference(error.to_string())
    }
}
