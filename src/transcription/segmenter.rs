//! Transcript segmentation.
//!
//! Groups word-level timings into the phrase and word chunk views. The same
//! grouping algorithm runs twice with different parameters; the plain view
//! carries no chunks at all.

use crate::config::TranscriptionSettings;
use crate::contract::{Chunk, Timestamp, TranscriptionVariants, TranscriptionView, WordEntry};

/// Parameters for one grouping pass.
#[derive(Debug, Clone)]
pub struct SegmenterParams {
    pub min_words: usize,
    pub max_words: usize,
    /// Inter-word gap beyond which the current buffer is force-flushed.
    pub max_gap_seconds: f64,
    pub min_duration: Option<f64>,
    pub max_duration: Option<f64>,
}

impl SegmenterParams {
    /// Phrase-view parameters from the configuration.
    pub fn phrases(settings: &TranscriptionSettings) -> Self {
        Self {
            min_words: settings.phrase_min_words,
            max_words: settings.phrase_max_words,
            max_gap_seconds: settings.max_gap_between_word_chunks_seconds,
            min_duration: Some(settings.phrase_min_duration_seconds),
            max_duration: Some(settings.phrase_max_duration_seconds),
        }
    }

    /// Word-view parameters: one word per chunk, no duration constraint.
    pub fn words(settings: &TranscriptionSettings) -> Self {
        Self {
            min_words: settings.word_min_words,
            max_words: settings.word_max_words,
            max_gap_seconds: settings.max_gap_between_word_chunks_seconds,
            min_duration: None,
            max_duration: None,
        }
    }
}

fn ends_sentence(text: &str) -> bool {
    matches!(text.chars().last(), Some('.') | Some('!') | Some('?') | Some('…'))
}

/// Join word texts with standard spacing: no space before closing
/// punctuation or an apostrophe, no space after an opening bracket or a
/// trailing dash.
pub fn join_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    let mut out = String::new();
    for token in tokens {
        let token = token.as_ref().trim();
        if token.is_empty() {
            continue;
        }
        if !out.is_empty() {
            let first = token.chars().next().unwrap_or(' ');
            let prev = out.chars().last().unwrap_or(' ');
            let tight_before = matches!(
                first,
                '.' | ',' | '!' | '?' | ';' | ':' | ')' | ']' | '»' | '"' | '\'' | '’'
            );
            let tight_after = matches!(prev, '(' | '-');
            if !tight_before && !tight_after {
                out.push(' ');
            }
        }
        out.push_str(token);
    }
    out
}

/// Group sorted word entries into chunks under the given parameters.
///
/// Every input word lands in exactly one chunk; empty input yields an empty
/// list.
pub fn group_words(words: &[WordEntry], params: &SegmenterParams) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut buffer: Vec<&WordEntry> = Vec::new();
    let mut buffer_start = 0.0f64;
    let mut buffer_end = 0.0f64;

    for (i, word) in words.iter().enumerate() {
        if buffer.is_empty() {
            buffer_start = word.start;
            buffer_end = word.end;
        } else {
            buffer_end = buffer_end.max(word.end);
        }
        buffer.push(word);

        let duration = buffer_end - buffer_start;
        let next = words.get(i + 1);

        let mut flush = match next {
            None => true,
            Some(next) => next.start - word.end > params.max_gap_seconds,
        };

        if !flush && buffer.len() >= params.max_words {
            flush = true;
        }

        if !flush {
            if let Some(max_duration) = params.max_duration {
                if duration >= max_duration {
                    flush = true;
                } else if let (Some(next), Some(min_duration)) = (next, params.min_duration) {
                    let extended = next.end.max(buffer_end) - buffer_start;
                    if extended > max_duration && duration >= min_duration {
                        flush = true;
                    }
                }
            }
        }

        if !flush {
            if let Some(min_duration) = params.min_duration {
                if duration >= min_duration
                    && buffer.len() >= params.min_words
                    && ends_sentence(&word.text)
                {
                    flush = true;
                }
            }
        }

        if flush {
            let texts: Vec<&str> = buffer.iter().map(|w| w.text.as_str()).collect();
            chunks.push(Chunk {
                text: join_tokens(&texts),
                timestamp: Timestamp(buffer_start, buffer_end),
            });
            buffer.clear();
        }
    }

    chunks
}

/// Build the three transcription views from the engine output.
pub fn build_variants(
    engine_text: &str,
    words: &[WordEntry],
    settings: &TranscriptionSettings,
) -> TranscriptionVariants {
    let full_text = engine_text.trim().to_string();

    let phrases = group_words(words, &SegmenterParams::phrases(settings));
    let word_chunks = group_words(words, &SegmenterParams::words(settings));

    TranscriptionVariants {
        plain: TranscriptionView {
            full_text: full_text.clone(),
            chunks: Vec::new(),
        },
        phrases: TranscriptionView {
            full_text: full_text.clone(),
            chunks: phrases,
        },
        words: TranscriptionView {
            full_text: full_text.clone(),
            chunks: word_chunks,
        },
        full_text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranscriptionSettings;

    fn word(text: &str, start: f64, end: f64) -> WordEntry {
        WordEntry {
            text: text.to_string(),
            start,
            end,
        }
    }

    fn evenly_spaced(texts: &[&str], word_seconds: f64) -> Vec<WordEntry> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| word(t, i as f64 * word_seconds, (i as f64 + 1.0) * word_seconds))
            .collect()
    }

    fn phrase_params() -> SegmenterParams {
        SegmenterParams::phrases(&TranscriptionSettings::default())
    }

    fn word_params() -> SegmenterParams {
        SegmenterParams::words(&TranscriptionSettings::default())
    }

    fn total_words(chunks: &[Chunk]) -> usize {
        chunks
            .iter()
            .map(|c| c.text.split_whitespace().count())
            .sum()
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(group_words(&[], &phrase_params()).is_empty());
        assert!(group_words(&[], &word_params()).is_empty());
    }

    #[test]
    fn test_single_word_flushes_regardless_of_thresholds() {
        let words = vec![word("hello", 0.0, 0.4)];
        let chunks = group_words(&words, &phrase_params());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello");
        assert_eq!(chunks[0].timestamp, Timestamp(0.0, 0.4));

        let word_chunks = group_words(&words, &word_params());
        assert_eq!(word_chunks.len(), 1);
        assert_eq!(word_chunks[0].timestamp, chunks[0].timestamp);
    }

    #[test]
    fn test_word_view_is_one_chunk_per_word() {
        let words = evenly_spaced(&["a", "b", "c", "d"], 0.3);
        let chunks = group_words(&words, &word_params());
        assert_eq!(chunks.len(), 4);
        for (chunk, input) in chunks.iter().zip(&words) {
            assert_eq!(chunk.text, input.text);
        }
    }

    #[test]
    fn test_every_word_lands_in_exactly_one_chunk() {
        let texts: Vec<String> = (0..40).map(|i| format!("w{}", i)).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let words = evenly_spaced(&refs, 0.5);

        let phrases = group_words(&words, &phrase_params());
        let singles = group_words(&words, &word_params());
        assert_eq!(total_words(&phrases), words.len());
        assert_eq!(total_words(&singles), words.len());

        // Concatenation equals the joined input modulo chunk boundaries.
        let joined: String = phrases
            .iter()
            .map(|c| c.text.clone())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(joined, texts.join(" "));
    }

    #[test]
    fn test_max_words_flush() {
        // Dense words, no punctuation: buffers flush at max_words.
        let texts: Vec<String> = (0..18).map(|i| format!("w{}", i)).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let words = evenly_spaced(&refs, 0.2);

        let chunks = group_words(&words, &phrase_params());
        assert_eq!(chunks[0].text.split_whitespace().count(), 9);
        assert_eq!(chunks[1].text.split_whitespace().count(), 9);
    }

    #[test]
    fn test_gap_forces_flush_below_min_words() {
        let words = vec![
            word("one", 0.0, 0.3),
            word("two", 0.4, 0.7),
            // 2-second silence follows.
            word("three", 2.8, 3.1),
            word("four", 3.2, 3.5),
        ];
        let chunks = group_words(&words, &phrase_params());
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "one two");
        assert_eq!(chunks[1].text, "three four");
    }

    #[test]
    fn test_sentence_punctuation_flushes_when_thresholds_met() {
        let words = vec![
            word("this", 0.0, 0.3),
            word("is", 0.35, 0.5),
            word("a", 0.55, 0.6),
            word("full", 0.65, 0.9),
            word("sentence.", 0.95, 1.4),
            word("next", 1.5, 1.8),
            word("words", 1.85, 2.1),
            word("follow", 2.15, 2.5),
            word("here", 2.55, 2.8),
            word("now", 2.85, 3.2),
        ];
        let chunks = group_words(&words, &phrase_params());
        assert_eq!(chunks[0].text, "this is a full sentence.");
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_punctuation_does_not_flush_before_min_duration() {
        // Sentence ends at 0.8s, below the 1.0s minimum duration.
        let words = vec![
            word("short", 0.0, 0.2),
            word("quick", 0.25, 0.4),
            word("dense", 0.45, 0.55),
            word("tiny", 0.6, 0.7),
            word("line.", 0.75, 0.8),
            word("more", 0.85, 1.0),
        ];
        let chunks = group_words(&words, &phrase_params());
        assert!(chunks[0].text.split_whitespace().count() > 5);
    }

    #[test]
    fn test_max_duration_flush_with_slow_words() {
        // Each word is 1.2s: duration passes 4.5s before max_words does.
        let words = evenly_spaced(&["a", "b", "c", "d", "e", "f", "g", "h"], 1.2);
        let chunks = group_words(&words, &phrase_params());
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.timestamp.duration() <= 4.5 + 1.2);
        }
        assert_eq!(total_words(&chunks), 8);
    }

    #[test]
    fn test_join_tokens_spacing_rule() {
        assert_eq!(join_tokens(&["Hello", ",", "world", "!"]), "Hello, world!");
        assert_eq!(join_tokens(&["he", "said", ":", "go"]), "he said: go");
        assert_eq!(join_tokens(&["(", "aside", ")"]), "(aside)");
        assert_eq!(join_tokens(&["well-", "known"]), "well-known");
        assert_eq!(join_tokens(&["qu", "'", "est"]), "qu'est");
        assert_eq!(join_tokens(&["сказал", "»"]), "сказал»");
    }

    #[test]
    fn test_build_variants_shares_full_text() {
        let words = evenly_spaced(&["hello", "there", "friend"], 0.4);
        let variants = build_variants(
            "  hello there friend ",
            &words,
            &TranscriptionSettings::default(),
        );
        assert_eq!(variants.full_text, "hello there friend");
        assert_eq!(variants.plain.full_text, variants.phrases.full_text);
        assert_eq!(variants.words.full_text, variants.full_text);
        assert!(variants.plain.chunks.is_empty());
        assert_eq!(variants.words.chunks.len(), 3);
    }

    #[test]
    fn test_build_variants_empty_engine_output() {
        let variants = build_variants("", &[], &TranscriptionSettings::default());
        assert_eq!(variants.full_text, "");
        assert!(variants.phrases.chunks.is_empty());
        assert!(variants.words.chunks.is_empty());
    }
}
