pub mod whisper;

pub use whisper::WhisperClient;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// One transcribed word with its position in the audio, in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct WordToken {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Word-level transcription of `audio`, in chronological order.
    async fn transcribe(&self, audio: &Path) -> Result<Vec<WordToken>>;
    fn name(&self) -> &'static str;
}
