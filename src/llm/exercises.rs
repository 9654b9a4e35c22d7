//! Exercise generation via the structured-output caller.

use super::{call_structured, GeminiClient, GenerationConfig, JsonShape};
use crate::contract::validate::validate_exercises_value;
use crate::contract::Exercise;
use crate::error::{Result, TolkError};
use crate::llm::prompts;
use tracing::info;

/// Attempts per exercise-generation call.
const EXERCISE_ATTEMPTS: u32 = 2;

/// Generate the exercise set for a transcript: 3–4 vocabulary, exactly 1
/// topic, at least 1 statementCheck, 5–6 total.
pub async fn generate_exercises(
    client: &GeminiClient,
    transcript: &str,
    source_language: &str,
) -> Result<Vec<Exercise>> {
    let transcript = transcript.trim();
    if transcript.is_empty() {
        return Err(TolkError::violation(
            "transcription.fullText",
            "exercise generation requires a non-empty transcript",
        ));
    }

    info!("Requesting exercise generation");

    let prompt = prompts::exercises(transcript, source_language);
    let config = GenerationConfig {
        temperature: 0.4,
        ..GenerationConfig::default()
    };

    call_structured(
        client,
        &prompt,
        JsonShape::Array,
        &config,
        EXERCISE_ATTEMPTS,
        validate_exercises_value,
    )
    .await
}
