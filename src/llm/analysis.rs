//! Content analysis via the structured-output caller.

use super::{call_structured, GeminiClient, GenerationConfig, JsonShape};
use crate::contract::validate::validate_analysis_value;
use crate::contract::Analysis;
use crate::error::{Result, TolkError};
use crate::llm::prompts;
use tracing::info;

/// Attempts per analysis call.
const ANALYSIS_ATTEMPTS: u32 = 2;

/// Classify a transcript: CEFR level, speeds, complexities, topics, and the
/// adult-content flag. The transcript must be non-empty.
pub async fn analyze_transcript(
    client: &GeminiClient,
    transcript: &str,
    topic_catalog: &[String],
) -> Result<Analysis> {
    let transcript = transcript.trim();
    if transcript.is_empty() {
        return Err(TolkError::violation(
            "transcription.fullText",
            "analysis requires a non-empty transcript",
        ));
    }

    info!("Requesting content analysis");

    let prompt = prompts::analysis(transcript, topic_catalog);
    let config = GenerationConfig {
        temperature: 0.2,
        ..GenerationConfig::default()
    };

    call_structured(
        client,
        &prompt,
        JsonShape::Object,
        &config,
        ANALYSIS_ATTEMPTS,
        |value| validate_analysis_value(value, topic_catalog),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_transcript_is_a_schema_violation() {
        // No network call is made for an empty transcript, so a client with
        // a dummy key is safe here.
        std::env::set_var("GEMINI_API_KEY", "test-key");
        let client = GeminiClient::new("gemini-2.0-flash").unwrap();

        let err = analyze_transcript(&client, "   ", &["Travel".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TolkError::SchemaViolation { .. }
        ));
    }
}
