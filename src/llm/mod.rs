//! Gemini text-completion client and structured-output helpers.
//!
//! All AI calls in the pipeline (translation, analysis, exercises) go
//! through [`GeminiClient::generate`]. Structured callers layer JSON
//! extraction, repair, validation, and a bounded retry loop on top.

pub mod json_repair;
pub mod prompts;

mod analysis;
mod exercises;

pub use analysis::analyze_transcript;
pub use exercises::generate_exercises;

use crate::error::{Result, TolkError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Pause after a rate-limit signal.
const RATE_LIMIT_SLEEP: Duration = Duration::from_secs(30);
/// Base pause between ordinary retries, multiplied by the attempt number.
const RETRY_SLEEP_MS: u64 = 300;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfigWire,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfigWire {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

/// Generation parameters for one call.
#[derive(Debug, Clone, Copy)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.95,
            max_output_tokens: 8192,
        }
    }
}

/// Thin client over the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a client for `model`, reading the key from `GEMINI_API_KEY`.
    pub fn new(model: &str) -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| TolkError::Config("GEMINI_API_KEY is not set".to_string()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            model: model.to_string(),
        })
    }

    /// Send one prompt and return the concatenated response text.
    pub async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            GEMINI_BASE_URL, self.model, self.api_key
        );

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfigWire {
                temperature: config.temperature,
                top_p: config.top_p,
                max_output_tokens: config.max_output_tokens,
            },
        };

        let response = self.http.post(&url).json(&request).send().await?;
        let status = response.status();

        if status.as_u16() == 429 {
            return Err(TolkError::Upstream("rate limited (429)".to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let tail: String = body.chars().take(500).collect();
            return Err(TolkError::Upstream(format!(
                "Gemini returned {}: {}",
                status, tail
            )));
        }

        let parsed: GenerateResponse = response.json().await?;
        let text: String = parsed
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(TolkError::Upstream("empty Gemini response".to_string()));
        }

        debug!("Gemini returned {} chars", text.len());
        Ok(text)
    }
}

/// True if the error looks like a rate-limit / quota signal.
pub fn is_rate_limited(err: &TolkError) -> bool {
    let message = err.to_string().to_lowercase();
    message.contains("429")
        || message.contains("resource_exhausted")
        || message.contains("resource exhausted")
        || message.contains("quota")
}

/// Sleep according to the backoff rule: 30 s after a rate-limit signal,
/// otherwise 300 ms × the attempt number.
pub async fn backoff(attempt: u32, err: &TolkError) {
    if is_rate_limited(err) {
        warn!("Rate limited; pausing for {:?}", RATE_LIMIT_SLEEP);
        tokio::time::sleep(RATE_LIMIT_SLEEP).await;
    } else {
        tokio::time::sleep(Duration::from_millis(RETRY_SLEEP_MS * attempt as u64)).await;
    }
}

/// The JSON shape a structured caller expects back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Object,
    Array,
}

/// Extract, repair, and parse the expected shape from raw model output.
pub fn parse_structured(raw: &str, shape: JsonShape) -> Result<Value> {
    let extracted = match shape {
        JsonShape::Object => json_repair::extract_object(raw),
        JsonShape::Array => json_repair::extract_array(raw),
    }
    .ok_or_else(|| TolkError::Upstream("no JSON payload in model response".to_string()))?;

    let repaired = json_repair::repair(extracted);
    let value: Value = serde_json::from_str(&repaired)
        .map_err(|e| TolkError::Upstream(format!("model JSON unparseable after repair: {}", e)))?;
    Ok(value)
}

/// Run a structured call: prompt, extract, repair, validate, retry with a
/// reinforced prompt on failure, bounded attempts.
pub async fn call_structured<T, F>(
    client: &GeminiClient,
    prompt: &str,
    shape: JsonShape,
    config: &GenerationConfig,
    max_attempts: u32,
    validate: F,
) -> Result<T>
where
    F: Fn(&Value) -> Result<T>,
{
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        let effective_prompt = if attempt == 1 {
            prompt.to_string()
        } else {
            format!("{}\n\n{}", prompt, prompts::REINFORCEMENT)
        };

        let outcome = async {
            let raw = client.generate(&effective_prompt, config).await?;
            let value = parse_structured(&raw, shape)?;
            validate(&value)
        }
        .await;

        match outcome {
            Ok(result) => return Ok(result),
            Err(e) => {
                warn!("Structured call attempt {}/{} failed: {}", attempt, max_attempts, e);
                if attempt < max_attempts {
                    backoff(attempt, &e).await;
                }
                last_error = Some(e);
            }
        }
    }

    Err(TolkError::Upstream(format!(
        "structured call failed after {} attempts: {}",
        max_attempts,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_detection() {
        assert!(is_rate_limited(&TolkError::Upstream(
            "rate limited (429)".to_string()
        )));
        assert!(is_rate_limited(&TolkError::Upstream(
            "RESOURCE_EXHAUSTED: quota".to_string()
        )));
        assert!(!is_rate_limited(&TolkError::Upstream(
            "empty Gemini response".to_string()
        )));
    }

    #[test]
    fn test_parse_structured_repairs_fenced_array() {
        let raw = "Sure!\n```json\n[{\"index\": 0, \"text\": \"да\"},]\n```";
        let value = parse_structured(raw, JsonShape::Array).unwrap();
        assert_eq!(value[0]["text"], "да");
    }

    #[test]
    fn test_parse_structured_rejects_missing_payload() {
        assert!(parse_structured("no json here", JsonShape::Object).is_err());
    }
}
