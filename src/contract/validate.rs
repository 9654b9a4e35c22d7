//! Contract validators.
//!
//! Each validator is total: it either returns a normalized value (trimmed
//! strings, canonical enum casing, catalog-mapped topics) or fails with
//! `SchemaViolation` carrying the path of the offending field. Validators
//! are idempotent: re-validating an already validated value is a no-op.

use super::{
    has_cyrillic, has_latin, Analysis, CefrLevel, Chunk, Exercise, GrammarComplexity,
    ProcessedVideo, SpeechSpeed, Timestamp, TranscriptionVariants, TranscriptionView, Translation,
    VocabularyComplexity,
};
use crate::error::{Result, TolkError};
use serde_json::Value;
use tracing::warn;

/// Check a `[start, end]` pair: non-negative seconds, `end >= start`.
pub fn validate_timestamp(ts: Timestamp, path: &str) -> Result<Timestamp> {
    if !ts.0.is_finite() || !ts.1.is_finite() {
        return Err(TolkError::violation(path, "timestamp is not finite"));
    }
    if ts.0 < 0.0 || ts.1 < 0.0 {
        return Err(TolkError::violation(path, "timestamp is negative"));
    }
    if ts.1 < ts.0 {
        return Err(TolkError::violation(path, "end precedes start"));
    }
    Ok(ts)
}

/// Trim a chunk's text and check it is non-empty.
pub fn validate_chunk(chunk: Chunk, path: &str) -> Result<Chunk> {
    let text = chunk.text.trim().to_string();
    if text.is_empty() {
        return Err(TolkError::violation(format!("{}.text", path), "empty text"));
    }
    let timestamp = validate_timestamp(chunk.timestamp, &format!("{}.timestamp", path))?;
    Ok(Chunk { text, timestamp })
}

/// Validate one transcription view.
pub fn validate_view(view: TranscriptionView, path: &str) -> Result<TranscriptionView> {
    let full_text = view.full_text.trim().to_string();

    let mut chunks = Vec::with_capacity(view.chunks.len());
    for (i, chunk) in view.chunks.into_iter().enumerate() {
        chunks.push(validate_chunk(chunk, &format!("{}.chunks[{}]", path, i))?);
    }

    if full_text.is_empty() && !chunks.is_empty() {
        return Err(TolkError::violation(
            format!("{}.fullText", path),
            "empty fullText with non-empty chunks",
        ));
    }

    Ok(TranscriptionView { full_text, chunks })
}

/// Validate the three views of one transcription, enforcing the cross-view
/// `fullText` equality invariant and the empty plain view.
pub fn validate_variants(variants: TranscriptionVariants) -> Result<TranscriptionVariants> {
    let plain = validate_view(variants.plain, "transcription.plain")?;
    let phrases = validate_view(variants.phrases, "transcription.phrases")?;
    let words = validate_view(variants.words, "transcription.words")?;
    let full_text = variants.full_text.trim().to_string();

    if !plain.chunks.is_empty() {
        return Err(TolkError::violation(
            "transcription.plain.chunks",
            "plain view must have no chunks",
        ));
    }
    for (name, view) in [("plain", &plain), ("phrases", &phrases), ("words", &words)] {
        if view.full_text != full_text {
            return Err(TolkError::violation(
                format!("transcription.{}.fullText", name),
                "fullText differs across views",
            ));
        }
    }

    Ok(TranscriptionVariants {
        plain,
        phrases,
        words,
        full_text,
    })
}

/// Validate a translation against the phrase view it was produced from.
///
/// Chunk counts must match and timestamps must be copied bit-identical.
/// An empty translated line is a fallback slot and is filled from its
/// source text rather than rejected.
pub fn validate_translation(
    translation: Translation,
    phrases: &TranscriptionView,
) -> Result<Translation> {
    if translation.chunks.len() != phrases.chunks.len() {
        return Err(TolkError::violation(
            "translation.chunks",
            format!(
                "expected {} chunks, got {}",
                phrases.chunks.len(),
                translation.chunks.len()
            ),
        ));
    }

    let mut chunks = Vec::with_capacity(translation.chunks.len());
    for (i, (chunk, phrase)) in translation
        .chunks
        .into_iter()
        .zip(phrases.chunks.iter())
        .enumerate()
    {
        let path = format!("translation.chunks[{}]", i);
        if chunk.timestamp != phrase.timestamp {
            return Err(TolkError::violation(
                format!("{}.timestamp", path),
                "timestamp differs from the phrase view",
            ));
        }
        let source_text = chunk.source_text.trim().to_string();
        if source_text.is_empty() {
            return Err(TolkError::violation(
                format!("{}.sourceText", path),
                "empty sourceText",
            ));
        }
        let mut text = chunk.text.trim().to_string();
        if text.is_empty() {
            // Fallback slot: keep the line aligned with its source.
            text = source_text.clone();
        }
        chunks.push(super::TranslatedChunk {
            text,
            source_text,
            timestamp: chunk.timestamp,
        });
    }

    let full_text = chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    Ok(Translation { full_text, chunks })
}

fn string_field<'a>(value: &'a Value, field: &str, path: &str) -> Result<&'a str> {
    value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| TolkError::violation(format!("{}.{}", path, field), "missing string field"))
}

/// Map raw topic strings through the catalog, case-insensitively, storing
/// the catalog casing. Unknown topics are dropped; an empty surviving list
/// is replaced by the first three catalog entries so downstream consumers
/// always see at least one topic.
pub fn normalize_topics(raw: &[String], catalog: &[String]) -> Vec<String> {
    let mut topics = Vec::new();
    for topic in raw {
        let trimmed = topic.trim();
        match catalog
            .iter()
            .find(|c| c.to_lowercase() == trimmed.to_lowercase())
        {
            Some(canonical) => {
                if !topics.contains(canonical) {
                    topics.push(canonical.clone());
                }
            }
            None => warn!("Dropping unknown topic: {:?}", trimmed),
        }
    }
    topics.truncate(3);
    if topics.is_empty() {
        warn!("No recognized topics; substituting the catalog head");
        topics = catalog.iter().take(3).cloned().collect();
    }
    topics
}

/// Parse and normalize an analysis record from raw LLM JSON.
pub fn validate_analysis_value(value: &Value, catalog: &[String]) -> Result<Analysis> {
    if !value.is_object() {
        return Err(TolkError::violation("analysis", "expected a JSON object"));
    }

    let cefr_level: CefrLevel = string_field(value, "cefrLevel", "analysis")?
        .parse()
        .map_err(|e| TolkError::violation("analysis.cefrLevel", e))?;
    let speech_speed: SpeechSpeed = string_field(value, "speechSpeed", "analysis")?
        .parse()
        .map_err(|e| TolkError::violation("analysis.speechSpeed", e))?;
    let grammar_complexity: GrammarComplexity = string_field(value, "grammarComplexity", "analysis")?
        .parse()
        .map_err(|e| TolkError::violation("analysis.grammarComplexity", e))?;
    let vocabulary_complexity: VocabularyComplexity =
        string_field(value, "vocabularyComplexity", "analysis")?
            .parse()
            .map_err(|e| TolkError::violation("analysis.vocabularyComplexity", e))?;

    let raw_topics: Vec<String> = value
        .get("topics")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default();
    let topics = normalize_topics(&raw_topics, catalog);

    let is_adult_content = value
        .get("isAdultContent")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Ok(Analysis {
        cefr_level,
        speech_speed,
        grammar_complexity,
        vocabulary_complexity,
        topics,
        is_adult_content,
    })
}

fn coerce_index(value: Option<&Value>, path: &str) -> Result<usize> {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .map(|v| v as usize)
            .ok_or_else(|| TolkError::violation(path, "index is not a non-negative integer")),
        Some(Value::String(s)) => s
            .trim()
            .parse::<usize>()
            .map_err(|_| TolkError::violation(path, "index is not an integer")),
        _ => Err(TolkError::violation(path, "missing index")),
    }
}

fn validate_exercise_value(value: &Value, path: &str) -> Result<Exercise> {
    if !value.is_object() {
        return Err(TolkError::violation(path, "expected a JSON object"));
    }

    let kind = string_field(value, "type", path)?.trim().to_string();

    let question = string_field(value, "question", path)?.trim().to_string();
    if question.is_empty() {
        return Err(TolkError::violation(format!("{}.question", path), "empty question"));
    }
    if !has_cyrillic(&question) {
        return Err(TolkError::violation(
            format!("{}.question", path),
            "question must contain Cyrillic",
        ));
    }

    let raw_options = value
        .get("options")
        .and_then(Value::as_array)
        .ok_or_else(|| TolkError::violation(format!("{}.options", path), "missing options array"))?;
    if raw_options.len() < 3 || raw_options.len() > 4 {
        return Err(TolkError::violation(
            format!("{}.options", path),
            format!("expected 3 or 4 options, got {}", raw_options.len()),
        ));
    }
    let mut options = Vec::with_capacity(raw_options.len());
    for (i, opt) in raw_options.iter().enumerate() {
        let text = opt
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                TolkError::violation(format!("{}.options[{}]", path, i), "empty option")
            })?;
        options.push(text.to_string());
    }

    let correct_answer = coerce_index(
        value.get("correctAnswer"),
        &format!("{}.correctAnswer", path),
    )?;
    if correct_answer >= options.len() {
        return Err(TolkError::violation(
            format!("{}.correctAnswer", path),
            format!("index {} out of range for {} options", correct_answer, options.len()),
        ));
    }

    match kind.as_str() {
        "vocabulary" => {
            let word = string_field(value, "word", path)?.trim().to_string();
            if word.is_empty() {
                return Err(TolkError::violation(format!("{}.word", path), "empty word"));
            }
            // Options must test the opposite script from the prompted word.
            if has_latin(&word) {
                for (i, opt) in options.iter().enumerate() {
                    if !has_cyrillic(opt) {
                        return Err(TolkError::violation(
                            format!("{}.options[{}]", path, i),
                            "Latin word requires Cyrillic options",
                        ));
                    }
                }
            }
            if has_cyrillic(&word) {
                for (i, opt) in options.iter().enumerate() {
                    if !has_latin(opt) {
                        return Err(TolkError::violation(
                            format!("{}.options[{}]", path, i),
                            "Cyrillic word requires Latin options",
                        ));
                    }
                }
            }
            Ok(Exercise::Vocabulary {
                word,
                question,
                options,
                correct_answer,
            })
        }
        "topic" => Ok(Exercise::Topic {
            question,
            options,
            correct_answer,
        }),
        "statementCheck" => Ok(Exercise::StatementCheck {
            question,
            options,
            correct_answer,
        }),
        other => Err(TolkError::violation(
            format!("{}.type", path),
            format!("unknown exercise type: {}", other),
        )),
    }
}

/// Check the composition constraints of a full exercise set.
pub fn validate_exercise_composition(exercises: &[Exercise]) -> Result<()> {
    let vocabulary = exercises
        .iter()
        .filter(|e| matches!(e, Exercise::Vocabulary { .. }))
        .count();
    let topic = exercises
        .iter()
        .filter(|e| matches!(e, Exercise::Topic { .. }))
        .count();
    let statement = exercises
        .iter()
        .filter(|e| matches!(e, Exercise::StatementCheck { .. }))
        .count();

    if !(3..=4).contains(&vocabulary) {
        return Err(TolkError::violation(
            "exercises",
            format!("expected 3 or 4 vocabulary exercises, got {}", vocabulary),
        ));
    }
    if topic != 1 {
        return Err(TolkError::violation(
            "exercises",
            format!("expected exactly 1 topic exercise, got {}", topic),
        ));
    }
    if statement == 0 {
        return Err(TolkError::violation(
            "exercises",
            "expected at least 1 statementCheck exercise",
        ));
    }
    if !(5..=6).contains(&exercises.len()) {
        return Err(TolkError::violation(
            "exercises",
            format!("expected 5 or 6 exercises, got {}", exercises.len()),
        ));
    }
    Ok(())
}

/// Parse and normalize an exercise set from raw LLM JSON, then check the
/// composition constraints.
pub fn validate_exercises_value(value: &Value) -> Result<Vec<Exercise>> {
    let items = value
        .as_array()
        .ok_or_else(|| TolkError::violation("exercises", "expected a JSON array"))?;

    let mut exercises = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        exercises.push(validate_exercise_value(item, &format!("exercise[{}]", i))?);
    }

    validate_exercise_composition(&exercises)?;
    Ok(exercises)
}

/// Re-validate an already-typed exercise set (idempotence path).
pub fn validate_exercises(exercises: Vec<Exercise>) -> Result<Vec<Exercise>> {
    let value = serde_json::to_value(&exercises)?;
    validate_exercises_value(&value)
}

fn is_safe_video_name(name: &str) -> bool {
    match name.split_once('.') {
        Some((stem, ext)) => {
            stem.len() == 16
                && stem.chars().all(|c| c.is_ascii_alphanumeric())
                && !ext.is_empty()
                && ext.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        }
        None => false,
    }
}

/// Validate the composite record before persistence.
///
/// An empty exercise list is accepted: the no-exercises pipeline mode
/// persists one deliberately. A non-empty list must satisfy composition.
pub fn validate_processed_video(
    video: ProcessedVideo,
    catalog: &[String],
) -> Result<ProcessedVideo> {
    let video_name = video.video_name.trim().to_string();
    if !is_safe_video_name(&video_name) {
        return Err(TolkError::violation(
            "videoName",
            format!("not a safe video name: {:?}", video_name),
        ));
    }

    let video_url = video.video_url.trim().to_string();
    if video_url.is_empty() {
        return Err(TolkError::violation("videoUrl", "empty videoUrl"));
    }

    let transcription = validate_variants(video.transcription)?;
    let translation = validate_translation(video.translation, &transcription.phrases)?;

    let mut analysis = video.analysis;
    analysis.topics = normalize_topics(&analysis.topics, catalog);

    let exercises = if video.exercises.is_empty() {
        Vec::new()
    } else {
        validate_exercises(video.exercises)?
    };

    // The top-level flag mirrors the analysis; coerce rather than reject.
    let is_adult_content = analysis.is_adult_content;

    Ok(ProcessedVideo {
        video_name,
        video_url,
        duration_seconds: video.duration_seconds,
        transcription,
        translation,
        analysis,
        exercises,
        is_adult_content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::TranslatedChunk;
    use serde_json::json;

    fn catalog() -> Vec<String> {
        vec![
            "Technology".to_string(),
            "Education".to_string(),
            "Travel".to_string(),
            "Food".to_string(),
        ]
    }

    fn view(full_text: &str, texts: &[&str]) -> TranscriptionView {
        TranscriptionView {
            full_text: full_text.to_string(),
            chunks: texts
                .iter()
                .enumerate()
                .map(|(i, t)| Chunk {
                    text: t.to_string(),
                    timestamp: Timestamp(i as f64, i as f64 + 1.0),
                })
                .collect(),
        }
    }

    #[test]
    fn test_timestamp_rejects_reversed_pair() {
        assert!(validate_timestamp(Timestamp(2.0, 1.0), "t").is_err());
        assert!(validate_timestamp(Timestamp(-0.5, 1.0), "t").is_err());
        assert!(validate_timestamp(Timestamp(0.0, 0.0), "t").is_ok());
    }

    #[test]
    fn test_variants_full_text_equality_enforced() {
        let ok = TranscriptionVariants {
            plain: view("hello world", &[]),
            phrases: view("hello world", &["hello world"]),
            words: view("hello world", &["hello", "world"]),
            full_text: "hello world".to_string(),
        };
        assert!(validate_variants(ok).is_ok());

        let bad = TranscriptionVariants {
            plain: view("hello world", &[]),
            phrases: view("hello there", &["hello there"]),
            words: view("hello world", &["hello", "world"]),
            full_text: "hello world".to_string(),
        };
        let err = validate_variants(bad).unwrap_err();
        assert!(err.to_string().contains("phrases"));
    }

    #[test]
    fn test_plain_view_must_be_chunkless() {
        let bad = TranscriptionVariants {
            plain: view("hi", &["hi"]),
            phrases: view("hi", &["hi"]),
            words: view("hi", &["hi"]),
            full_text: "hi".to_string(),
        };
        assert!(validate_variants(bad).is_err());
    }

    #[test]
    fn test_translation_alignment_and_fallback() {
        let phrases = view("one two", &["one", "two"]);
        let translation = Translation {
            full_text: String::new(),
            chunks: vec![
                TranslatedChunk {
                    text: "один".to_string(),
                    source_text: "one".to_string(),
                    timestamp: Timestamp(0.0, 1.0),
                },
                TranslatedChunk {
                    text: "   ".to_string(),
                    source_text: "two".to_string(),
                    timestamp: Timestamp(1.0, 2.0),
                },
            ],
        };

        let validated = validate_translation(translation, &phrases).unwrap();
        assert_eq!(validated.chunks[1].text, "two");
        assert_eq!(validated.full_text, "один two");
    }

    #[test]
    fn test_translation_rejects_count_mismatch() {
        let phrases = view("one two", &["one", "two"]);
        let translation = Translation {
            full_text: String::new(),
            chunks: vec![TranslatedChunk {
                text: "один".to_string(),
                source_text: "one".to_string(),
                timestamp: Timestamp(0.0, 1.0),
            }],
        };
        assert!(validate_translation(translation, &phrases).is_err());
    }

    #[test]
    fn test_analysis_normalization() {
        let value = json!({
            "cefrLevel": "b1",
            "speechSpeed": "Normal",
            "grammarComplexity": "INTERMEDIATE",
            "vocabularyComplexity": "intermediate",
            "topics": ["technology", "Unknown Topic", "EDUCATION"],
            "isAdultContent": false
        });

        let analysis = validate_analysis_value(&value, &catalog()).unwrap();
        assert_eq!(analysis.cefr_level, CefrLevel::B1);
        assert_eq!(analysis.speech_speed, SpeechSpeed::Normal);
        assert_eq!(analysis.topics, vec!["Technology", "Education"]);
        assert!(!analysis.is_adult_content);
    }

    #[test]
    fn test_analysis_topic_fallback_to_catalog_head() {
        let value = json!({
            "cefrLevel": "A2",
            "speechSpeed": "slow",
            "grammarComplexity": "simple",
            "vocabularyComplexity": "basic",
            "topics": ["Nonsense"],
        });

        let analysis = validate_analysis_value(&value, &catalog()).unwrap();
        assert_eq!(analysis.topics, vec!["Technology", "Education", "Travel"]);
        assert!(!analysis.is_adult_content);
    }

    #[test]
    fn test_analysis_rejects_bad_enum() {
        let value = json!({
            "cefrLevel": "Z9",
            "speechSpeed": "slow",
            "grammarComplexity": "simple",
            "vocabularyComplexity": "basic",
        });
        let err = validate_analysis_value(&value, &catalog()).unwrap_err();
        assert!(err.to_string().contains("cefrLevel"));
    }

    fn exercise_set() -> Value {
        json!([
            {"type": "vocabulary", "word": "house", "question": "Что значит «house»?",
             "options": ["дом", "кот", "стол"], "correctAnswer": 0},
            {"type": "vocabulary", "word": "дом", "question": "Как перевести «дом»?",
             "options": ["house", "cat", "table"], "correctAnswer": 0},
            {"type": "vocabulary", "word": "cat", "question": "Что значит «cat»?",
             "options": ["кот", "дом", "стол"], "correctAnswer": "0"},
            {"type": "topic", "question": "О чём это видео?",
             "options": ["Технологии", "Еда", "Путешествия"], "correctAnswer": 0},
            {"type": "statementCheck", "question": "Утверждение верно?",
             "options": ["да", "нет", "не сказано"], "correctAnswer": 1}
        ])
    }

    #[test]
    fn test_exercises_happy_path_with_index_coercion() {
        let exercises = validate_exercises_value(&exercise_set()).unwrap();
        assert_eq!(exercises.len(), 5);
        assert_eq!(exercises[2].correct_answer(), 0);
    }

    #[test]
    fn test_exercises_script_rule() {
        let mut value = exercise_set();
        // Latin word with a Latin-only option violates the script rule.
        value[0]["options"][1] = json!("cat");
        let err = validate_exercises_value(&value).unwrap_err();
        assert!(err.to_string().contains("options[1]"));
    }

    #[test]
    fn test_exercises_composition_rules() {
        let mut value = exercise_set();
        // Drop the topic exercise: composition fails.
        value.as_array_mut().unwrap().remove(3);
        assert!(validate_exercises_value(&value).is_err());
    }

    #[test]
    fn test_exercises_index_out_of_range() {
        let mut value = exercise_set();
        value[4]["correctAnswer"] = json!(3);
        let err = validate_exercises_value(&value).unwrap_err();
        assert!(err.to_string().contains("correctAnswer"));
    }

    #[test]
    fn test_validator_idempotence() {
        let value = json!({
            "cefrLevel": "B2",
            "speechSpeed": "fast",
            "grammarComplexity": "complex",
            "vocabularyComplexity": "advanced",
            "topics": ["Travel"],
            "isAdultContent": true
        });
        let once = validate_analysis_value(&value, &catalog()).unwrap();
        let twice =
            validate_analysis_value(&serde_json::to_value(&once).unwrap(), &catalog()).unwrap();
        assert_eq!(once, twice);

        let exercises = validate_exercises_value(&exercise_set()).unwrap();
        let again = validate_exercises(exercises.clone()).unwrap();
        assert_eq!(exercises, again);
    }

    #[test]
    fn test_processed_video_composite() {
        let phrases = view("один два", &["один", "два"]);
        let video = ProcessedVideo {
            video_name: "a1b2c3d4e5f6a7b8.mp4".to_string(),
            video_url: "https://cdn.example.com/videos/a1b2c3d4e5f6a7b8/master.m3u8".to_string(),
            duration_seconds: Some(30),
            transcription: TranscriptionVariants {
                plain: view("один два", &[]),
                phrases: phrases.clone(),
                words: view("один два", &["один", "два"]),
                full_text: "один два".to_string(),
            },
            translation: Translation {
                full_text: String::new(),
                chunks: phrases
                    .chunks
                    .iter()
                    .map(|c| TranslatedChunk {
                        text: format!("ru:{}", c.text),
                        source_text: c.text.clone(),
                        timestamp: c.timestamp,
                    })
                    .collect(),
            },
            analysis: Analysis {
                cefr_level: CefrLevel::B1,
                speech_speed: SpeechSpeed::Normal,
                grammar_complexity: GrammarComplexity::Intermediate,
                vocabulary_complexity: VocabularyComplexity::Intermediate,
                topics: vec!["technology".to_string()],
                is_adult_content: true,
            },
            exercises: Vec::new(),
            is_adult_content: false,
        };

        let validated = validate_processed_video(video, &catalog()).unwrap();
        // Topic casing is canonicalized and the top-level flag mirrors the
        // analysis.
        assert_eq!(validated.analysis.topics, vec!["Technology"]);
        assert!(validated.is_adult_content);
        assert_eq!(validated.translation.chunks.len(), 2);
    }

    #[test]
    fn test_processed_video_json_round_trip() {
        let phrases = view("hello world", &["hello world"]);
        let video = ProcessedVideo {
            video_name: "a1b2c3d4e5f6a7b8.mp4".to_string(),
            video_url: "https://cdn.example.com/videos/a1b2c3d4e5f6a7b8.mp4".to_string(),
            duration_seconds: None,
            transcription: TranscriptionVariants {
                plain: view("hello world", &[]),
                phrases: phrases.clone(),
                words: view("hello world", &["hello", "world"]),
                full_text: "hello world".to_string(),
            },
            translation: Translation {
                full_text: "привет мир".to_string(),
                chunks: vec![TranslatedChunk {
                    text: "привет мир".to_string(),
                    source_text: "hello world".to_string(),
                    timestamp: phrases.chunks[0].timestamp,
                }],
            },
            analysis: Analysis {
                cefr_level: CefrLevel::A2,
                speech_speed: SpeechSpeed::Slow,
                grammar_complexity: GrammarComplexity::Simple,
                vocabulary_complexity: VocabularyComplexity::Basic,
                topics: vec!["Education".to_string()],
                is_adult_content: false,
            },
            exercises: validate_exercises_value(&exercise_set()).unwrap(),
            is_adult_content: false,
        };

        let json = serde_json::to_string_pretty(&video).unwrap();
        assert!(json.contains("\"videoName\""));
        assert!(json.contains("\"durationSeconds\": null"));

        let back: ProcessedVideo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, video);
    }

    #[test]
    fn test_safe_video_name() {
        assert!(is_safe_video_name("a1b2c3d4e5f6a7b8.mp4"));
        assert!(!is_safe_video_name("short.mp4"));
        assert!(!is_safe_video_name("a1b2c3d4e5f6a7b8.MP4"));
        assert!(!is_safe_video_name("a1b2c3d4e5f6a7b8"));
        assert!(!is_safe_video_name("../../../etc/passwd"));
    }
}
