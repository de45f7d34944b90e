use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SplitcapError {
    #[error("Could not determine duration of {path}: {reason}")]
    DurationUnavailable { path: PathBuf, reason: String },

    #[error("{tool} failed ({status}): {stderr}")]
    ExternalTool {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("No background clips found in {0}")]
    EmptyBackgroundPool(PathBuf),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl SplitcapError {
    /// Short label used when logging failures at the per-video boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            SplitcapError::DurationUnavailable { .. } => "duration-unavailable",
            SplitcapError::ExternalTool { .. } => "external-tool",
            SplitcapError::Transcription(_) => "transcription",
            SplitcapError::Storage(_) => "storage",
            SplitcapError::EmptyBackgroundPool(_) => "empty-background-pool",
            SplitcapError::Config(_) => "config",
        }
    }
}

impl From<reqwest::Error> for SplitcapError {
    fn from(e: reqwest::Error) -> Self {
        SplitcapError::Transcription(format!("HTTP error: {e}"))
    }
}

impl From<serde_json::Error> for SplitcapError {
    fn from(e: serde_json::Error) -> Self {
        SplitcapError::Transcription(format!("Malformed response: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, SplitcapError>;
