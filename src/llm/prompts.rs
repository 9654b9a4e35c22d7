//! Prompt builders for the Gemini callers.

use std::fmt::Write;

/// Appended to a structured prompt when the previous attempt failed.
pub const REINFORCEMENT: &str =
    "IMPORTANT: Your previous answer was not valid. Respond with VALID JSON only. \
     No markdown fences, no commentary, no trailing text.";

/// Character budget for the global transcript context in translation prompts.
pub const CONTEXT_CHAR_BUDGET: usize = 4_000;

/// Truncate long text to head + tail within `max_chars`, marking the cut.
pub fn truncate_middle(text: &str, max_chars: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text.to_string();
    }
    let head: String = chars[..max_chars / 2].iter().collect();
    let tail: String = chars[chars.len() - max_chars / 2..].iter().collect();
    format!("{} […] {}", head.trim_end(), tail.trim_start())
}

/// Build the prompt for one translation batch.
///
/// `payload` carries `(index, source_text)` pairs; `previous` and `upcoming`
/// are neighbouring source lines shown for context only.
pub fn translation_batch(
    source_language: &str,
    target_language: &str,
    global_context: &str,
    previous: &[&str],
    upcoming: &[&str],
    payload: &[(usize, &str)],
) -> String {
    let mut prompt = String::new();

    writeln!(
        prompt,
        "You are a professional subtitle translator. Translate the numbered lines below \
         from {} to {}.",
        source_language, target_language
    )
    .ok();

    writeln!(prompt, "\nFull transcript (for context only, do not translate it):").ok();
    writeln!(prompt, "---\n{}\n---", global_context).ok();

    if !previous.is_empty() {
        writeln!(prompt, "\nLines immediately before this batch (context only):").ok();
        for line in previous {
            writeln!(prompt, "  {}", line).ok();
        }
    }
    if !upcoming.is_empty() {
        writeln!(prompt, "\nLines immediately after this batch (context only):").ok();
        for line in upcoming {
            writeln!(prompt, "  {}", line).ok();
        }
    }

    writeln!(prompt, "\nLines to translate:").ok();
    writeln!(prompt, "[").ok();
    for (index, text) in payload {
        writeln!(
            prompt,
            "  {{\"index\": {}, \"text\": {}}},",
            index,
            serde_json::to_string(text).unwrap_or_else(|_| format!("{:?}", text))
        )
        .ok();
    }
    writeln!(prompt, "]").ok();

    prompt.push_str(
        r#"
Rules:
1. Translate each line independently: output exactly one translated line per input line.
2. Never merge two input lines into one translation and never split one line into two.
3. Never borrow words from a neighbouring line, even if the sentence continues across lines.
4. Keep the "index" of every line exactly as given.
5. Respond with a JSON array only: [{"index": <number>, "text": "<translation>"}, ...].
6. Do not add commentary, markdown fences, or any text outside the JSON array.
7. Preserve punctuation and emphasis from the source line.
8. Transliterate proper names where a standard localization exists; otherwise keep them as-is.
9. Keep the register of the source (formal stays formal, casual stays casual).
10. If a line is untranslatable (a number, a name), still output an entry for its index.
"#,
    );

    prompt
}

/// Build the single-line retry prompt, with the neighbouring source lines
/// as context.
pub fn translation_single_line(
    source_language: &str,
    target_language: &str,
    previous: Option<&str>,
    line: &str,
    next: Option<&str>,
) -> String {
    let mut prompt = String::new();
    writeln!(
        prompt,
        "Translate this single subtitle line from {} to {}. \
         Respond with the translated line only, no quotes, no commentary.",
        source_language, target_language
    )
    .ok();
    if let Some(previous) = previous {
        writeln!(prompt, "\nPrevious line (context): {}", previous).ok();
    }
    writeln!(prompt, "\nLine: {}", line).ok();
    if let Some(next) = next {
        writeln!(prompt, "\nNext line (context): {}", next).ok();
    }
    prompt
}

/// Build the content-analysis prompt.
pub fn analysis(transcript: &str, topic_catalog: &[String]) -> String {
    let catalog = topic_catalog.join(", ");
    format!(
        r#"You are a language-learning content analyst. Analyze the transcript below and classify it.

Transcript:
---
{transcript}
---

Respond with a single JSON object with exactly these fields:
{{
  "cefrLevel": "A1" | "A2" | "B1" | "B2" | "C1" | "C2",
  "speechSpeed": "slow" | "normal" | "fast",
  "grammarComplexity": "simple" | "intermediate" | "complex",
  "vocabularyComplexity": "basic" | "intermediate" | "advanced",
  "topics": [up to 3 topics],
  "isAdultContent": true | false
}}

Rules:
- "topics" must be drawn from this catalog only: {catalog}
- Pick at most 3 topics, ordered by relevance.
- "isAdultContent" is true only if the transcript has explicit references to sex, graphic violence, or illegal drug use.
- Respond with the JSON object only. No markdown, no commentary."#,
    )
}

/// Build the exercise-generation prompt.
pub fn exercises(transcript: &str, source_language: &str) -> String {
    format!(
        r#"You are creating comprehension exercises for Russian-speaking learners of {source_language}.
Base every exercise on the transcript below.

Transcript:
---
{transcript}
---

Generate EXACTLY 6 exercises as a JSON array. Composition:
- 4 exercises of type "vocabulary": pick a word from the transcript. If the word is in {source_language} (Latin letters), the options are Russian translations; if the word is Russian (Cyrillic), the options are {source_language} translations.
- 1 exercise of type "topic": what the video is about.
- 1 exercise of type "statementCheck": whether a statement about the content is true.

Each exercise object:
{{
  "type": "vocabulary" | "topic" | "statementCheck",
  "word": "<only for vocabulary>",
  "question": "<question in Russian>",
  "options": [3 or 4 non-empty strings],
  "correctAnswer": <0-based index of the correct option>
}}

Rules:
- Every "question" is written in Russian.
- "correctAnswer" must index into "options".
- Options must be plausible; exactly one is correct.
- Respond with the JSON array only. No markdown, no commentary."#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_middle_short_text_untouched() {
        assert_eq!(truncate_middle("hello", 100), "hello");
    }

    #[test]
    fn test_truncate_middle_keeps_head_and_tail() {
        let text = "a".repeat(3000) + &"b".repeat(3000);
        let out = truncate_middle(&text, 1000);
        assert!(out.starts_with('a'));
        assert!(out.ends_with('b'));
        assert!(out.contains("[…]"));
        assert!(out.chars().count() < 1100);
    }

    #[test]
    fn test_translation_batch_prompt_contains_payload_and_rules() {
        let prompt = translation_batch(
            "English",
            "Russian",
            "full text here",
            &["prev line"],
            &["next line"],
            &[(60, "hello there"), (61, "how are you")],
        );
        assert!(prompt.contains("\"index\": 60"));
        assert!(prompt.contains("hello there"));
        assert!(prompt.contains("prev line"));
        assert!(prompt.contains("10."));
    }

    #[test]
    fn test_analysis_prompt_lists_catalog() {
        let prompt = analysis("text", &["Travel".to_string(), "Food".to_string()]);
        assert!(prompt.contains("Travel, Food"));
        assert!(prompt.contains("isAdultContent"));
    }
}
