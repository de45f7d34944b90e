use crate::error::{Result, SplitcapError};
use crate::transcribe::{Transcriber, WordToken};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// OpenAI API base URL.
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Maximum file size for Whisper API (25 MB).
const MAX_FILE_SIZE: usize = 25 * 1024 * 1024;

/// Low temperature keeps word boundaries stable.
const DEFAULT_TEMPERATURE: f32 = 0.2;

/// The only hosted model that returns word-level timestamps.
const WHISPER_MODEL: &str = "whisper-1";

/// OpenAI Whisper API client producing word timestamps.
pub struct WhisperClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    language: Option<String>,
    temperature: f32,
}

impl WhisperClient {
    /// Create a new Whisper client with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: OPENAI_BASE_URL.to_string(),
            language: None,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Point the client at another OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the source language (ISO 639-1 code).
    pub fn with_language(mut self, language: String) -> Self {
        self.language = Some(language);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/transcriptions", self.base_url)
    }

    /// Build the multipart form for the API request.
    async fn build_form(&self, audio_path: &Path) -> Result<Form> {
        let file_bytes = fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let mime_type = match audio_path.extension().and_then(|e| e.to_str()) {
            Some("wav") => "audio/wav",
            Some("mp3") => "audio/mpeg",
            Some("m4a") => "audio/mp4",
            Some("flac") => "audio/flac",
            Some("ogg") => "audio/ogg",
            Some("webm") => "audio/webm",
            _ => "application/octet-stream",
        };

        let file_part = Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str(mime_type)?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", WHISPER_MODEL)
            .text("temperature", self.temperature.to_string())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word");

        if let Some(ref lang) = self.language {
            form = form.text("language", lang.clone());
        }

        Ok(form)
    }

    async fn call_api(&self, form: Form) -> Result<WhisperResponse> {
        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        debug!("Whisper API response status: {}", status);

        if status.is_success() {
            let body = response.text().await?;
            debug!("Whisper API response: {}", truncate(&body, 500));
            let parsed: WhisperResponse = serde_json::from_str(&body)?;
            return Ok(parsed);
        }

        let error_body = response.text().await.unwrap_or_default();

        if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
            return Err(SplitcapError::Transcription(format!(
                "Whisper API error: {} ({})",
                api_error.error.message, api_error.error.r#type
            )));
        }

        Err(SplitcapError::Transcription(format!(
            "Whisper API error ({}): {}",
            status, error_body
        )))
    }
}

/// Convert the API's word list, rejecting timestamps that can't be placed.
fn parse_words(response: WhisperResponse) -> Result<Vec<WordToken>> {
    response
        .words
        .unwrap_or_default()
        .into_iter()
        .map(|w| {
            let valid = |t: f64| t.is_finite() && t >= 0.0;
            if !valid(w.start) || !valid(w.end) {
                return Err(SplitcapError::Transcription(format!(
                    "Invalid timestamps for word '{}': {}..{}",
                    w.word, w.start, w.end
                )));
            }
            Ok(WordToken {
                start: w.start,
                end: w.end,
                text: w.word,
            })
        })
        .collect()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, audio: &Path) -> Result<Vec<WordToken>> {
        debug!("Transcribing {} with Whisper", audio.display());

        let metadata = fs::metadata(audio).await?;
        if metadata.len() as usize > MAX_FILE_SIZE {
            return Err(SplitcapError::Transcription(format!(
                "File too large for Whisper API: {} bytes (max {} bytes)",
                metadata.len(),
                MAX_FILE_SIZE
            )));
        }

        let form = self.build_form(audio).await?;
        let response = self.call_api(form).await?;
        let words = parse_words(response)?;

        debug!("Whisper returned {} words", words.len());
        Ok(words)
    }

    fn name(&self) -> &'static str {
        "OpenAI Whisper"
    }
}

// API response types

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    #[serde(default)]
    words: Option<Vec<WhisperWord>>,
}

#[derive(Debug, Deserialize)]
struct WhisperWord {
    word: String,
    start: f64,
    end: f64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    r#type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let client = WhisperClient::new("k".to_string()).with_base_url("http://localhost:9000/v1/");
        assert_eq!(client.endpoint(), "http://localhost:9000/v1/audio/transcriptions");
    }

    #[test]
    fn test_parse_words_preserves_order() {
        let response: WhisperResponse = serde_json::from_str(
            r#"{
                "text": "Hello world again",
                "language": "english",
                "duration": 2.0,
                "words": [
                    {"word": "Hello", "start": 0.0, "end": 0.42},
                    {"word": "world", "start": 0.42, "end": 0.9},
                    {"word": "again", "start": 1.1, "end": 1.6}
                ]
            }"#,
        )
        .unwrap();

        let words = parse_words(response).unwrap();
        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello", "world", "again"]);
        assert_eq!(words[1].start, 0.42);
        assert_eq!(words[2].end, 1.6);
    }

    #[test]
    fn test_parse_words_missing_list() {
        let response: WhisperResponse =
            serde_json::from_str(r#"{"text": "", "language": "english", "duration": 0.0}"#)
                .unwrap();
        assert!(parse_words(response).unwrap().is_empty());
    }

    #[test]
    fn test_parse_words_rejects_negative_times() {
        let response = WhisperResponse {
            words: Some(vec![WhisperWord {
                word: "bad".to_string(),
                start: -1.0,
                end: 0.5,
            }]),
        };
        assert!(matches!(
            parse_words(response),
            Err(SplitcapError::Transcription(_))
        ));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("ab", 3), "ab");
    }
}
