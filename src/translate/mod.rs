//! Chunked LLM translation of the phrase view.
//!
//! The coordinator walks batches of phrase lines through the model, keeping
//! a strict one-to-one index alignment: the output always has exactly as
//! many lines as the input, in the same order, with timestamps copied from
//! the phrase chunks. Misbehaving responses degrade line-by-line to the
//! source text, and lines that come back without Cyrillic get one dedicated
//! retry with neighbouring context.

use crate::config::GoogleSettings;
use crate::contract::{has_cyrillic, TranscriptionView, TranslatedChunk, Translation};
use crate::error::{Result, TolkError};
use crate::llm::{backoff, parse_structured, prompts, GeminiClient, GenerationConfig, JsonShape};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Neighbouring lines shown as context around each batch.
const CONTEXT_LINES: usize = 4;

/// Translates phrase views between a fixed language pair.
pub struct Translator<'a> {
    client: &'a GeminiClient,
    source_language: String,
    target_language: String,
    batch_size: usize,
    max_attempts: u32,
}

impl<'a> Translator<'a> {
    pub fn new(client: &'a GeminiClient, google: &GoogleSettings, source_language: &str) -> Self {
        Self {
            client,
            source_language: source_language.to_string(),
            target_language: google.translation_target_language.clone(),
            batch_size: google.translation_chunk_size.max(1),
            max_attempts: google.translation_attempts.max(1),
        }
    }

    fn requires_cyrillic(&self) -> bool {
        matches!(self.target_language.to_lowercase().as_str(), "russian" | "ru")
    }

    /// Translate the whole phrase view. Empty input short-circuits.
    pub async fn translate(&self, phrases: &TranscriptionView) -> Result<Translation> {
        if phrases.chunks.is_empty() {
            return Ok(Translation {
                full_text: String::new(),
                chunks: Vec::new(),
            });
        }

        let texts: Vec<&str> = phrases.chunks.iter().map(|c| c.text.as_str()).collect();
        let global_context =
            prompts::truncate_middle(&phrases.full_text, prompts::CONTEXT_CHAR_BUDGET);

        info!(
            "Translating {} lines ({} -> {}) in batches of {}",
            texts.len(),
            self.source_language,
            self.target_language,
            self.batch_size
        );

        let mut translated: Vec<String> = Vec::with_capacity(texts.len());

        for (batch_index, batch) in texts.chunks(self.batch_size).enumerate() {
            let offset = batch_index * self.batch_size;
            let mut aligned = self
                .translate_batch(&global_context, &texts, batch, offset)
                .await?;

            if self.requires_cyrillic() {
                self.repair_non_cyrillic(&mut aligned, offset, &texts).await;
            }

            translated.extend(aligned);
        }

        let chunks: Vec<TranslatedChunk> = translated
            .into_iter()
            .zip(phrases.chunks.iter())
            .map(|(text, phrase)| {
                let mut text = collapse_whitespace(&text);
                if text.is_empty() {
                    text = phrase.text.clone();
                }
                TranslatedChunk {
                    text,
                    source_text: phrase.text.clone(),
                    timestamp: phrase.timestamp,
                }
            })
            .collect();

        let full_text = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Translation { full_text, chunks })
    }

    /// Translate one batch with bounded attempts; the result always has
    /// exactly `batch.len()` lines.
    async fn translate_batch(
        &self,
        global_context: &str,
        all_texts: &[&str],
        batch: &[&str],
        offset: usize,
    ) -> Result<Vec<String>> {
        let previous: Vec<&str> = all_texts[offset.saturating_sub(CONTEXT_LINES)..offset].to_vec();
        let upcoming_start = offset + batch.len();
        let upcoming: Vec<&str> = all_texts
            [upcoming_start..(upcoming_start + CONTEXT_LINES).min(all_texts.len())]
            .to_vec();

        let payload: Vec<(usize, &str)> = batch
            .iter()
            .enumerate()
            .map(|(i, text)| (offset + i, *text))
            .collect();

        let prompt = prompts::translation_batch(
            &self.source_language,
            &self.target_language,
            global_context,
            &previous,
            &upcoming,
            &payload,
        );

        let config = GenerationConfig::default();
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            let outcome = async {
                let raw = self.client.generate(&prompt, &config).await?;
                parse_structured(&raw, JsonShape::Array)
            }
            .await;

            match outcome {
                Ok(value) => {
                    let entries = normalize_items(&value, offset, batch);
                    return Ok(align_entries(entries, offset, batch));
                }
                Err(e) => {
                    warn!(
                        "Translation batch at offset {} failed (attempt {}/{}): {}",
                        offset, attempt, self.max_attempts, e
                    );
                    if attempt < self.max_attempts {
                        backoff(attempt, &e).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(TolkError::Upstream(format!(
            "translation batch at offset {} failed after {} attempts: {}",
            offset,
            self.max_attempts,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// Retry every aligned line that lacks Cyrillic, one line at a time,
    /// with the neighbouring source lines as context. Lines that still
    /// come back without Cyrillic keep the best available text.
    async fn repair_non_cyrillic(&self, aligned: &mut [String], offset: usize, all_texts: &[&str]) {
        for (pos, text) in aligned.iter_mut().enumerate() {
            if has_cyrillic(text) {
                continue;
            }
            let index = offset + pos;
            debug!("Line {} lacks Cyrillic; retrying individually", index);

            let prompt = prompts::translation_single_line(
                &self.source_language,
                &self.target_language,
                index.checked_sub(1).map(|i| all_texts[i]),
                all_texts[index],
                all_texts.get(index + 1).copied(),
            );

            match self.client.generate(&prompt, &GenerationConfig::default()).await {
                Ok(raw) => {
                    let cleaned = collapse_whitespace(strip_wrapping_quotes(raw.trim()));
                    if has_cyrillic(&cleaned) {
                        *text = cleaned;
                    } else {
                        warn!("Line {} still lacks Cyrillic after retry; keeping fallback", index);
                        if text.trim().is_empty() && !cleaned.is_empty() {
                            *text = cleaned;
                        }
                    }
                }
                Err(e) => {
                    warn!("Single-line retry for {} failed: {}", index, e);
                }
            }
        }
    }
}

/// Normalize raw response items: trim, strip wrapping quotes, substitute
/// source text for empty lines, coerce a missing index to the positional
/// one, and truncate/pad to the batch length.
fn normalize_items(value: &Value, offset: usize, batch: &[&str]) -> Vec<(usize, String)> {
    let items = value.as_array().cloned().unwrap_or_default();

    let mut entries: Vec<(usize, String)> = Vec::with_capacity(batch.len());
    for (pos, item) in items.iter().take(batch.len()).enumerate() {
        let index = item
            .get("index")
            .and_then(Value::as_u64)
            .map(|v| v as usize)
            .unwrap_or(offset + pos);

        let mut text = item
            .get("text")
            .and_then(Value::as_str)
            .map(|s| strip_wrapping_quotes(s.trim()).to_string())
            .unwrap_or_default();

        if text.is_empty() {
            // Keep the slot aligned with its source line.
            let fallback_pos = index.checked_sub(offset).filter(|p| *p < batch.len());
            text = fallback_pos.map(|p| batch[p].to_string()).unwrap_or_default();
        }

        entries.push((index, text));
    }

    if items.len() > batch.len() {
        warn!(
            "Model returned {} items for a {}-line batch; truncating",
            items.len(),
            batch.len()
        );
    }
    for pos in entries.len()..batch.len() {
        entries.push((offset + pos, batch[pos].to_string()));
    }

    entries
}

/// Build the index map (preferring non-empty text on collision) and align
/// by the expected index list; missing indices fall back to source text.
fn align_entries(entries: Vec<(usize, String)>, offset: usize, batch: &[&str]) -> Vec<String> {
    let mut by_index: std::collections::HashMap<usize, String> = std::collections::HashMap::new();

    for (index, text) in entries {
        if index < offset || index >= offset + batch.len() {
            warn!("Model returned unexpected line index {}", index);
            continue;
        }
        match by_index.get(&index) {
            Some(existing) if !existing.trim().is_empty() => {}
            _ => {
                by_index.insert(index, text);
            }
        }
    }

    batch
        .iter()
        .enumerate()
        .map(|(pos, source)| {
            let index = offset + pos;
            match by_index.remove(&index) {
                Some(text) if !text.trim().is_empty() => text,
                _ => {
                    warn!("No translation for line {}; using source text", index);
                    source.to_string()
                }
            }
        })
        .collect()
}

/// Strip one layer of wrapping quotes (ASCII or typographic).
fn strip_wrapping_quotes(text: &str) -> &str {
    const PAIRS: &[(char, char)] = &[
        ('"', '"'),
        ('\'', '\''),
        ('«', '»'),
        ('\u{201C}', '\u{201D}'),
        ('\u{2018}', '\u{2019}'),
    ];
    let mut chars = text.chars();
    let (Some(first), Some(last)) = (chars.next(), text.chars().last()) else {
        return text;
    };
    if text.chars().count() >= 2 && PAIRS.iter().any(|(o, c)| *o == first && *c == last) {
        let inner = &text[first.len_utf8()..text.len() - last.len_utf8()];
        return inner.trim();
    }
    text
}

/// Collapse all whitespace runs to single spaces.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_wrapping_quotes() {
        assert_eq!(strip_wrapping_quotes("\"привет\""), "привет");
        assert_eq!(strip_wrapping_quotes("«привет»"), "привет");
        assert_eq!(strip_wrapping_quotes("нет кавычек"), "нет кавычек");
        assert_eq!(strip_wrapping_quotes("\"несимметрично"), "\"несимметрично");
        assert_eq!(strip_wrapping_quotes("\u{201C}smart\u{201D}"), "smart");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  два   слова \n тут "), "два слова тут");
    }

    #[test]
    fn test_normalize_pads_short_response_with_source() {
        let batch = ["one", "two", "three"];
        let value = json!([{"index": 0, "text": "один"}]);
        let entries = normalize_items(&value, 0, &batch);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], (0, "один".to_string()));
        assert_eq!(entries[1], (1, "two".to_string()));
        assert_eq!(entries[2], (2, "three".to_string()));
    }

    #[test]
    fn test_normalize_coerces_missing_index_and_empty_text() {
        let batch = ["one", "two"];
        let value = json!([
            {"text": "один"},
            {"index": 1, "text": "   "}
        ]);
        let entries = normalize_items(&value, 0, &batch);
        assert_eq!(entries[0], (0, "один".to_string()));
        // Empty text falls back to the source line for that index.
        assert_eq!(entries[1], (1, "two".to_string()));
    }

    #[test]
    fn test_align_output_length_matches_batch() {
        // 7 items for a 10-line batch, one with missing text (scenario B).
        let batch = ["l0", "l1", "l2", "l3", "l4", "l5", "l6", "l7", "l8", "l9"];
        let value = json!([
            {"index": 10, "text": "п0"},
            {"index": 11, "text": "п1"},
            {"index": 12, "text": ""},
            {"index": 14, "text": "п4"},
            {"index": 15, "text": "п5"},
            {"index": 17, "text": "п7"},
            {"index": 19, "text": "п9"}
        ]);
        let entries = normalize_items(&value, 10, &batch);
        let aligned = align_entries(entries, 10, &batch);

        assert_eq!(aligned.len(), 10);
        assert_eq!(aligned[0], "п0");
        assert_eq!(aligned[2], "l2");
        assert_eq!(aligned[3], "l3");
        assert_eq!(aligned[9], "п9");
    }

    #[test]
    fn test_align_prefers_non_empty_on_collision() {
        let batch = ["a", "b"];
        let entries = vec![
            (0, String::new()),
            (0, "непусто".to_string()),
            (1, "второй".to_string()),
        ];
        let aligned = align_entries(entries, 0, &batch);
        assert_eq!(aligned[0], "непусто");
        assert_eq!(aligned[1], "второй");
    }

    #[test]
    fn test_align_drops_out_of_range_indices() {
        let batch = ["a"];
        let entries = vec![(5, "чужой".to_string()), (0, "свой".to_string())];
        let aligned = align_entries(entries, 0, &batch);
        assert_eq!(aligned, vec!["свой".to_string()]);
    }
}
