//! OpenAI Whisper transcription provider.

use super::{EngineSegment, EngineTranscript, EngineWord, Transcriber};
use crate::error::{Result, TolkError};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    AudioResponseFormat, CreateTranscriptionRequestArgs, TimestampGranularity,
};
use async_openai::Client;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default timeout for Whisper API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Whisper-API-based transcriber with word-level timestamps.
pub struct OpenAiTranscriber {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiTranscriber {
    /// Create a transcriber for the given Whisper model.
    pub fn new(model: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client: Client::with_config(OpenAIConfig::default()).with_http_client(http_client),
            model: model.to_string(),
        })
    }
}

/// Check if the OpenAI API key is configured.
pub fn is_api_key_configured() -> bool {
    std::env::var("OPENAI_API_KEY").is_ok()
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<EngineTranscript> {
        debug!("Transcribing audio file with word-level timestamps");

        let file_bytes = tokio::fs::read(audio_path).await?;

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(async_openai::types::AudioInput::from_vec_u8(
                audio_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.wav")
                    .to_string(),
                file_bytes,
            ))
            .model(&self.model)
            .response_format(AudioResponseFormat::VerboseJson)
            .timestamp_granularities(vec![
                TimestampGranularity::Word,
                TimestampGranularity::Segment,
            ])
            .language(language);

        let request = request_builder
            .build()
            .map_err(|e| TolkError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe_verbose_json(request)
            .await
            .map_err(|e| TolkError::Transcription(format!("Whisper API error: {}", e)))?;

        let duration = response.duration as f64;
        let text = response.text.clone();

        let words: Vec<EngineWord> = match response.words {
            Some(ws) => ws
                .iter()
                .map(|w| EngineWord {
                    word: w.word.clone(),
                    start: w.start as f64,
                    end: w.end as f64,
                })
                .collect(),
            None => {
                warn!("No word-level timestamps returned, approximating from segments");
                response
                    .segments
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .flat_map(|s| {
                        let words: Vec<&str> = s.text.split_whitespace().collect();
                        if words.is_empty() {
                            return vec![];
                        }
                        let span = (s.end - s.start) as f64;
                        let word_duration = span / words.len() as f64;
                        words
                            .into_iter()
                            .enumerate()
                            .map(|(i, word)| EngineWord {
                                word: word.to_string(),
                                start: s.start as f64 + i as f64 * word_duration,
                                end: s.start as f64 + (i + 1) as f64 * word_duration,
                            })
                            .collect::<Vec<_>>()
                    })
                    .collect()
            }
        };

        // Distribute words over the API's segments; a missing segment list
        // degrades to one segment spanning the whole file.
        let segments: Vec<EngineSegment> = match response.segments {
            Some(segs) if !segs.is_empty() => segs
                .iter()
                .map(|s| {
                    let (start, end) = (s.start as f64, s.end as f64);
                    EngineSegment {
                        start,
                        end,
                        text: s.text.trim().to_string(),
                        words: words
                            .iter()
                            .filter(|w| w.start >= start && w.start < end)
                            .cloned()
                            .collect(),
                    }
                })
                .collect(),
            _ => vec![EngineSegment {
                start: 0.0,
                end: duration,
                text: text.trim().to_string(),
                words,
            }],
        };

        debug!(
            "Transcribed {} segments, {} words",
            segments.len(),
            segments.iter().map(|s| s.words.len()).sum::<usize>()
        );

        Ok(EngineTranscript { text, segments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_check() {
        let _ = is_api_key_configured();
    }
}
