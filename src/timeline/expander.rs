/*!
 * Sentence expansion of long subtitle entries.
 *
 * Captioning tools tend to emit entries spanning several sentences. Each entry is
 * split into sentences, and any sentence still longer than the configured ceiling
 * is split again into word chunks. Durations are shared out in proportion to word
 * counts and the resulting entries are contiguous, starting at the parent's start.
 */

use log::debug;

use crate::app_config::ExpanderConfig;
use crate::subtitle_processor::{EntryOrigin, SubtitleEntry};

const SENTENCE_END: [char; 4] = ['.', '!', '?', '…'];
const CLOSERS: [char; 6] = ['"', '\'', '”', '’', ')', ']'];

// Abbreviations whose trailing period does not end a sentence
const ABBREVIATIONS: [&str; 10] = ["qs", "q.s", "hr", "h.r", "dr", "prof", "no", "mr", "mrs", "st"];

/// Splits entries into sentence or chunk sized entries
#[derive(Debug, Clone)]
pub struct SentenceExpander {
    config: ExpanderConfig,
}

impl SentenceExpander {
    /// Create a new expander
    pub fn new(config: ExpanderConfig) -> Self {
        Self { config }
    }

    /// Expand every entry and renumber the result from 1
    pub fn expand(&self, entries: &[SubtitleEntry]) -> Vec<SubtitleEntry> {
        let mut expanded: Vec<SubtitleEntry> = entries
            .iter()
            .flat_map(|entry| self.expand_entry(entry))
            .collect();

        for (i, entry) in expanded.iter_mut().enumerate() {
            entry.seq_num = i + 1;
        }

        debug!("Expanded {} entries into {}", entries.len(), expanded.len());
        expanded
    }

    /// Expand a single entry; an entry that needs no split is returned unchanged
    pub fn expand_entry(&self, entry: &SubtitleEntry) -> Vec<SubtitleEntry> {
        let sentences = split_sentences(&entry.text);
        let total_words: usize = sentences.iter().map(|s| word_count(s)).sum();
        let duration = entry.original_duration();

        if sentences.len() <= 1 && !self.needs_chunking(duration, total_words) {
            return vec![entry.clone()];
        }

        let start = entry.original_start_time();
        let end = entry.original_end_time();
        let total_words = total_words.max(1) as f64;
        let mut result = Vec::new();
        let mut clock = start;

        for (i, sentence) in sentences.iter().enumerate() {
            let words = word_count(sentence);
            let sentence_duration = duration * words as f64 / total_words;
            let is_last_sentence = i + 1 == sentences.len();

            if self.needs_chunking(sentence_duration, words) {
                let chunks = chunk_words(sentence, self.config.chunk_words);
                for (j, chunk) in chunks.iter().enumerate() {
                    let chunk_duration = (sentence_duration * word_count(chunk) as f64 / words as f64)
                        .max(self.config.min_chunk_duration);
                    let chunk_end = if is_last_sentence && j + 1 == chunks.len() {
                        end.max(clock + self.config.min_chunk_duration)
                    } else {
                        clock + chunk_duration
                    };
                    result.push(SubtitleEntry::split_from(entry, clock, chunk_end, chunk.clone(), EntryOrigin::Chunk));
                    clock = chunk_end;
                }
            } else {
                // The last sentence ends exactly on the parent end
                let sentence_end = if is_last_sentence { end } else { clock + sentence_duration };
                let origin = if sentences.len() > 1 { EntryOrigin::Sentence } else { entry.origin };
                result.push(SubtitleEntry::split_from(entry, clock, sentence_end, sentence.clone(), origin));
                clock = sentence_end;
            }
        }

        result
    }

    fn needs_chunking(&self, duration: f64, words: usize) -> bool {
        duration > self.config.max_entry_duration && words > self.config.chunk_words
    }
}

/// Split text on sentence-ending punctuation followed by whitespace
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while i < chars.len() {
        current.push(chars[i]);

        if SENTENCE_END.contains(&chars[i]) {
            while i + 1 < chars.len() && (SENTENCE_END.contains(&chars[i + 1]) || CLOSERS.contains(&chars[i + 1])) {
                i += 1;
                current.push(chars[i]);
            }

            let at_boundary = chars.get(i + 1).is_some_and(|c| c.is_whitespace());
            if at_boundary && !ends_with_abbreviation(&current) {
                let sentence = current.trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                current.clear();
            }
        }

        i += 1;
    }

    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }

    sentences
}

fn ends_with_abbreviation(current: &str) -> bool {
    let Some(last_word) = current.split_whitespace().last() else {
        return false;
    };
    if !last_word.ends_with('.') || last_word.ends_with("..") {
        return false;
    }
    let stem = last_word.trim_start_matches('(').trim_end_matches('.').to_lowercase();
    ABBREVIATIONS.contains(&stem.as_str())
}

/// Split text into balanced chunks of about `chunk_size` words
pub fn chunk_words(text: &str, chunk_size: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let chunk_size = chunk_size.max(1);
    let chunk_count = words.len().div_ceil(chunk_size);
    let base = words.len() / chunk_count;
    let remainder = words.len() % chunk_count;

    let mut chunks = Vec::with_capacity(chunk_count);
    let mut index = 0;
    for c in 0..chunk_count {
        let size = base + usize::from(c < remainder);
        chunks.push(words[index..index + size].join(" "));
        index += size;
    }

    chunks
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
