//! Transcription engines for tolk.
//!
//! The engine is a black box that takes a mono 16 kHz WAV and returns text
//! plus word-level timings. Two providers are wired in:
//!
//! - **Openai**: the Whisper API with word timestamp granularity.
//! - **Local**: Whisper running under a local Python interpreter, invoked as
//!   a subprocess with JSON output.

mod local;
mod openai;
pub mod segmenter;

pub use local::LocalWhisperTranscriber;
pub use openai::OpenAiTranscriber;

use crate::config::{TranscriptionProvider, TranscriptionSettings};
use crate::contract::WordEntry;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One word timing as reported by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineWord {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

/// One engine segment with its word timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub words: Vec<EngineWord>,
}

/// The raw engine result: canonical text plus timed segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineTranscript {
    pub text: String,
    #[serde(default)]
    pub segments: Vec<EngineSegment>,
}

impl EngineTranscript {
    /// Flatten segment words into the contract's word entries, trimmed,
    /// empties dropped, sorted ascending by start.
    pub fn word_entries(&self) -> Vec<WordEntry> {
        let mut words: Vec<WordEntry> = self
            .segments
            .iter()
            .flat_map(|s| s.words.iter())
            .filter_map(|w| {
                let text = w.word.trim();
                if text.is_empty() {
                    None
                } else {
                    Some(WordEntry {
                        text: text.to_string(),
                        start: w.start,
                        end: w.end.max(w.start),
                    })
                }
            })
            .collect();
        words.sort_by(|a, b| a.start.total_cmp(&b.start));
        words
    }
}

/// Trait for transcription engines.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file. `language` is an ISO-639-1 code.
    async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<EngineTranscript>;
}

/// Create a transcriber for the configured provider.
pub fn create_transcriber(settings: &TranscriptionSettings) -> Result<Box<dyn Transcriber>> {
    match settings.provider {
        TranscriptionProvider::Openai => Ok(Box::new(OpenAiTranscriber::new(
            &settings.openai_model,
        )?)),
        TranscriptionProvider::Local => Ok(Box::new(LocalWhisperTranscriber::new(settings))),
    }
}

/// Resolve a language name or alias to an ISO-639-1 code.
///
/// Two-letter inputs pass through lowercased; unknown names are returned
/// lowercased so the engine can make the final call.
pub fn resolve_language_code(language: &str) -> String {
    let lowered = language.trim().to_lowercase();
    let code = match lowered.as_str() {
        "english" => "en",
        "russian" => "ru",
        "spanish" => "es",
        "french" => "fr",
        "german" => "de",
        "italian" => "it",
        "portuguese" => "pt",
        "dutch" => "nl",
        "polish" => "pl",
        "ukrainian" => "uk",
        "turkish" => "tr",
        "swedish" => "sv",
        "norwegian" => "no",
        "danish" => "da",
        "finnish" => "fi",
        "chinese" => "zh",
        "japanese" => "ja",
        "korean" => "ko",
        "arabic" => "ar",
        "hindi" => "hi",
        other => other,
    };
    code.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_aliases() {
        assert_eq!(resolve_language_code("English"), "en");
        assert_eq!(resolve_language_code("russian"), "ru");
        assert_eq!(resolve_language_code("EN"), "en");
        assert_eq!(resolve_language_code("xx"), "xx");
    }

    #[test]
    fn test_word_entries_flatten_sorted_and_trimmed() {
        let transcript = EngineTranscript {
            text: "hello world".to_string(),
            segments: vec![
                EngineSegment {
                    start: 1.0,
                    end: 2.0,
                    text: "world".to_string(),
                    words: vec![EngineWord {
                        word: " world".to_string(),
                        start: 1.0,
                        end: 2.0,
                    }],
                },
                EngineSegment {
                    start: 0.0,
                    end: 1.0,
                    text: "hello".to_string(),
                    words: vec![
                        EngineWord {
                            word: "hello".to_string(),
                            start: 0.0,
                            end: 0.8,
                        },
                        EngineWord {
                            word: "   ".to_string(),
                            start: 0.8,
                            end: 0.9,
                        },
                    ],
                },
            ],
        };

        let words = transcript.word_entries();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "hello");
        assert_eq!(words[1].text, "world");
    }
}
