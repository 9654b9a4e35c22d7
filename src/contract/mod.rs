//! Data contract shared by all pipeline stages.
//!
//! Every value that crosses a stage boundary is expressed with these types
//! and passes through the validators in [`validate`] before the next stage
//! consumes it. The wire shape (JSON artifact and database columns) uses
//! camelCase names.

pub mod validate;

use serde::{Deserialize, Serialize};

/// A `[start, end]` pair of non-negative seconds with `end >= start`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timestamp(pub f64, pub f64);

impl Timestamp {
    pub fn start(&self) -> f64 {
        self.0
    }

    pub fn end(&self) -> f64 {
        self.1
    }

    pub fn duration(&self) -> f64 {
        self.1 - self.0
    }
}

/// The atomic timing unit produced by the transcription engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordEntry {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// One subtitle unit at some granularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub timestamp: Timestamp,
}

/// One segmentation of a transcription. `full_text` is identical across the
/// three views of one video; only `chunks` differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionView {
    pub full_text: String,
    pub chunks: Vec<Chunk>,
}

/// The three views of one transcription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionVariants {
    pub plain: TranscriptionView,
    pub phrases: TranscriptionView,
    pub words: TranscriptionView,
    pub full_text: String,
}

/// A translated subtitle line, aligned 1:1 with a phrase chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatedChunk {
    pub text: String,
    /// The phrase-view text this line translated.
    pub source_text: String,
    pub timestamp: Timestamp,
}

/// The translated subtitle track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub full_text: String,
    pub chunks: Vec<TranslatedChunk>,
}

/// CEFR proficiency level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CefrLevel::A1 => "A1",
            CefrLevel::A2 => "A2",
            CefrLevel::B1 => "B1",
            CefrLevel::B2 => "B2",
            CefrLevel::C1 => "C1",
            CefrLevel::C2 => "C2",
        }
    }
}

impl std::str::FromStr for CefrLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A1" => Ok(CefrLevel::A1),
            "A2" => Ok(CefrLevel::A2),
            "B1" => Ok(CefrLevel::B1),
            "B2" => Ok(CefrLevel::B2),
            "C1" => Ok(CefrLevel::C1),
            "C2" => Ok(CefrLevel::C2),
            other => Err(format!("not a CEFR level: {}", other)),
        }
    }
}

/// Perceived speech speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechSpeed {
    Slow,
    Normal,
    Fast,
}

impl SpeechSpeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeechSpeed::Slow => "slow",
            SpeechSpeed::Normal => "normal",
            SpeechSpeed::Fast => "fast",
        }
    }
}

impl std::str::FromStr for SpeechSpeed {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "slow" => Ok(SpeechSpeed::Slow),
            "normal" => Ok(SpeechSpeed::Normal),
            "fast" => Ok(SpeechSpeed::Fast),
            other => Err(format!("not a speech speed: {}", other)),
        }
    }
}

/// Grammar complexity of the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrammarComplexity {
    Simple,
    Intermediate,
    Complex,
}

impl GrammarComplexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrammarComplexity::Simple => "simple",
            GrammarComplexity::Intermediate => "intermediate",
            GrammarComplexity::Complex => "complex",
        }
    }
}

impl std::str::FromStr for GrammarComplexity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(GrammarComplexity::Simple),
            "intermediate" => Ok(GrammarComplexity::Intermediate),
            "complex" => Ok(GrammarComplexity::Complex),
            other => Err(format!("not a grammar complexity: {}", other)),
        }
    }
}

/// Vocabulary complexity of the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VocabularyComplexity {
    Basic,
    Intermediate,
    Advanced,
}

impl VocabularyComplexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            VocabularyComplexity::Basic => "basic",
            VocabularyComplexity::Intermediate => "intermediate",
            VocabularyComplexity::Advanced => "advanced",
        }
    }
}

impl std::str::FromStr for VocabularyComplexity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(VocabularyComplexity::Basic),
            "intermediate" => Ok(VocabularyComplexity::Intermediate),
            "advanced" => Ok(VocabularyComplexity::Advanced),
            other => Err(format!("not a vocabulary complexity: {}", other)),
        }
    }
}

/// The content-analysis record for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub cefr_level: CefrLevel,
    pub speech_speed: SpeechSpeed,
    pub grammar_complexity: GrammarComplexity,
    pub vocabulary_complexity: VocabularyComplexity,
    /// Up to 3 values from the closed topic catalog, in catalog casing.
    pub topics: Vec<String>,
    pub is_adult_content: bool,
}

/// An auto-generated exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Exercise {
    #[serde(rename = "vocabulary", rename_all = "camelCase")]
    Vocabulary {
        word: String,
        question: String,
        options: Vec<String>,
        correct_answer: usize,
    },
    #[serde(rename = "topic", rename_all = "camelCase")]
    Topic {
        question: String,
        options: Vec<String>,
        correct_answer: usize,
    },
    #[serde(rename = "statementCheck", rename_all = "camelCase")]
    StatementCheck {
        question: String,
        options: Vec<String>,
        correct_answer: usize,
    },
}

impl Exercise {
    pub fn kind(&self) -> &'static str {
        match self {
            Exercise::Vocabulary { .. } => "vocabulary",
            Exercise::Topic { .. } => "topic",
            Exercise::StatementCheck { .. } => "statementCheck",
        }
    }

    pub fn question(&self) -> &str {
        match self {
            Exercise::Vocabulary { question, .. }
            | Exercise::Topic { question, .. }
            | Exercise::StatementCheck { question, .. } => question,
        }
    }

    pub fn options(&self) -> &[String] {
        match self {
            Exercise::Vocabulary { options, .. }
            | Exercise::Topic { options, .. }
            | Exercise::StatementCheck { options, .. } => options,
        }
    }

    pub fn correct_answer(&self) -> usize {
        match self {
            Exercise::Vocabulary { correct_answer, .. }
            | Exercise::Topic { correct_answer, .. }
            | Exercise::StatementCheck { correct_answer, .. } => *correct_answer,
        }
    }
}

/// The composite record emitted per video once all stages succeed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedVideo {
    /// Safe 16-char alphanumeric ID plus the lowercased source extension.
    pub video_name: String,
    /// CDN URL of the primary deliverable (master playlist or MP4).
    pub video_url: String,
    pub duration_seconds: Option<u64>,
    pub transcription: TranscriptionVariants,
    pub translation: Translation,
    pub analysis: Analysis,
    pub exercises: Vec<Exercise>,
    pub is_adult_content: bool,
}

/// True if `text` contains at least one Cyrillic letter.
pub fn has_cyrillic(text: &str) -> bool {
    text.chars().any(|c| ('\u{0400}'..='\u{04FF}').contains(&c))
}

/// True if `text` contains at least one ASCII Latin letter.
pub fn has_latin(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_serializes_as_pair() {
        let ts = Timestamp(1.5, 3.25);
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "[1.5,3.25]");

        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn test_exercise_tagging() {
        let ex = Exercise::Vocabulary {
            word: "дом".to_string(),
            question: "Что значит «дом»?".to_string(),
            options: vec!["house".into(), "tree".into(), "car".into()],
            correct_answer: 0,
        };
        let json = serde_json::to_value(&ex).unwrap();
        assert_eq!(json["type"], "vocabulary");
        assert_eq!(json["correctAnswer"], 0);

        let check = serde_json::json!({
            "type": "statementCheck",
            "question": "Утверждение верно?",
            "options": ["да", "нет", "не сказано"],
            "correctAnswer": 1
        });
        let parsed: Exercise = serde_json::from_value(check).unwrap();
        assert_eq!(parsed.kind(), "statementCheck");
    }

    #[test]
    fn test_script_detection() {
        assert!(has_cyrillic("привет"));
        assert!(!has_cyrillic("hello"));
        assert!(has_latin("hello, мир"));
        assert!(!has_latin("привет, мир"));
    }
}
