//! Local Whisper transcription provider.
//!
//! Runs Whisper under a local Python interpreter (`python -m whisper`) with
//! word timestamps enabled and JSON output, then parses the result file.

use super::{EngineTranscript, Transcriber};
use crate::config::TranscriptionSettings;
use crate::error::{Result, TolkError};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Transcriber backed by a local Whisper installation.
pub struct LocalWhisperTranscriber {
    python: String,
    model: String,
    device: String,
    beam_size: u32,
    best_of: u32,
    fp16: bool,
}

impl LocalWhisperTranscriber {
    pub fn new(settings: &TranscriptionSettings) -> Self {
        Self {
            python: settings.python_executable.clone(),
            model: settings.model.clone(),
            device: settings.device.clone(),
            beam_size: settings.beam_size,
            best_of: settings.best_of,
            fp16: settings.fp16,
        }
    }
}

#[async_trait]
impl Transcriber for LocalWhisperTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<EngineTranscript> {
        let work_dir = tempfile::tempdir()?;

        info!("Running local Whisper ({} model)", self.model);

        let result = Command::new(&self.python)
            .arg("-m").arg("whisper")
            .arg(audio_path)
            .arg("--model").arg(&self.model)
            .arg("--language").arg(language)
            .arg("--device").arg(&self.device)
            .arg("--beam_size").arg(self.beam_size.to_string())
            .arg("--best_of").arg(self.best_of.to_string())
            .arg("--fp16").arg(if self.fp16 { "True" } else { "False" })
            .arg("--word_timestamps").arg("True")
            .arg("--output_format").arg("json")
            .arg("--output_dir").arg(work_dir.path())
            .arg("--verbose").arg("False")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TolkError::ToolNotFound(self.python.clone()));
            }
            Err(e) => {
                return Err(TolkError::Transcription(format!(
                    "whisper execution failed: {e}"
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TolkError::Transcription(format!(
                "whisper failed: {stderr}"
            )));
        }

        let stem = audio_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        let result_path = work_dir.path().join(format!("{}.json", stem));

        let raw = tokio::fs::read_to_string(&result_path).await.map_err(|e| {
            TolkError::Transcription(format!("whisper produced no JSON output: {e}"))
        })?;

        let transcript: EngineTranscript = serde_json::from_str(&raw)
            .map_err(|e| TolkError::Transcription(format!("Invalid whisper JSON: {e}")))?;

        debug!(
            "Local whisper produced {} segments",
            transcript.segments.len()
        );

        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::super::EngineTranscript;

    #[test]
    fn test_engine_json_shape_parses() {
        // The shape Whisper writes with --word_timestamps True.
        let raw = r#"{
            "text": " Hello there.",
            "segments": [
                {"start": 0.0, "end": 1.2, "text": " Hello there.",
                 "words": [
                    {"word": " Hello", "start": 0.0, "end": 0.6, "probability": 0.98},
                    {"word": " there.", "start": 0.6, "end": 1.2, "probability": 0.97}
                 ]}
            ],
            "language": "en"
        }"#;

        let transcript: EngineTranscript = serde_json::from_str(raw).unwrap();
        let words = transcript.word_entries();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "Hello");
        assert_eq!(words[1].text, "there.");
    }
}
