/*!
 * Fuzzy alignment of two independently segmented subtitle sequences.
 *
 * Each target entry is located in the source sequence by a forward-only cursor:
 * first as a window of one to `max_window` whole source entries (sentence level),
 * then, failing that, by matching its first and last words against interpolated
 * word times of the next few source entries (word level). Source time consumed
 * by one target is never offered to a later one: the cursor tracks the last
 * consumed word, and a partly consumed entry only takes part in the word pass.
 */

use log::{debug, info};

use crate::app_config::AlignerConfig;
use crate::subtitle_processor::SubtitleEntry;
use crate::timeline::fuzzy::{normalize, normalized_similarity, normalized_words};

/// Which pass produced an alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMethod {
    Sentence,
    Word,
}

/// Time window borrowed from the source sequence for one target entry
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedWindow {
    pub start_time: f64,
    pub end_time: f64,
    /// Sequence number of the first source entry in the window
    pub first_source_seq: usize,
    /// Sequence number of the last source entry in the window
    pub last_source_seq: usize,
    pub score: f32,
    pub method: MatchMethod,
}

/// Alignment outcome for one target entry; `window` is `None` when unaligned
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub target_seq: usize,
    pub window: Option<AlignedWindow>,
}

impl Alignment {
    /// Whether a window was found
    pub fn is_aligned(&self) -> bool {
        self.window.is_some()
    }

    /// Start and end of the window, if aligned
    pub fn time_range(&self) -> Option<(f64, f64)> {
        self.window.as_ref().map(|w| (w.start_time, w.end_time))
    }
}

#[derive(Debug, Clone)]
struct TimedWord {
    word: String,
    time: f64,
    source_index: usize,
    /// Position of the word inside its source entry
    word_index: usize,
    last_in_entry: bool,
}

/// Next unconsumed source word: entry index plus word offset inside that entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SourceCursor {
    entry: usize,
    word: usize,
}

impl SourceCursor {
    /// First source entry no earlier target has touched
    fn next_whole_entry(&self) -> usize {
        if self.word > 0 { self.entry + 1 } else { self.entry }
    }

    /// Cursor just past `word`
    fn after(word: &TimedWord) -> Self {
        if word.last_in_entry {
            Self {
                entry: word.source_index + 1,
                word: 0,
            }
        } else {
            Self {
                entry: word.source_index,
                word: word.word_index + 1,
            }
        }
    }
}

/// Maps target entries onto windows of source entries
#[derive(Debug, Clone)]
pub struct FuzzyAligner {
    config: AlignerConfig,
}

impl FuzzyAligner {
    /// Create a new aligner
    pub fn new(config: AlignerConfig) -> Self {
        Self { config }
    }

    /// Align every target entry, in order, against the source sequence
    pub fn align(&self, target: &[SubtitleEntry], source: &[SubtitleEntry]) -> Vec<Alignment> {
        let source_norm: Vec<String> = source.iter().map(|e| normalize(&e.text)).collect();
        let mut cursor = SourceCursor::default();
        let mut alignments = Vec::with_capacity(target.len());

        for entry in target {
            let target_norm = normalize(&entry.text);
            let window = if target_norm.is_empty() || cursor.entry >= source.len() {
                None
            } else if let Some(window) = self.match_sentence(&target_norm, source, &source_norm, &mut cursor) {
                Some(window)
            } else {
                self.match_words(&target_norm, source, &mut cursor)
            };

            if window.is_none() {
                debug!("No alignment for target entry {}: {:?}", entry.seq_num, entry.text);
            }

            alignments.push(Alignment {
                target_seq: entry.seq_num,
                window,
            });
        }

        let aligned = alignments.iter().filter(|a| a.is_aligned()).count();
        info!("Aligned {}/{} entries against {} source entries", aligned, target.len(), source.len());

        alignments
    }

    fn match_sentence(
        &self,
        target_norm: &str,
        source: &[SubtitleEntry],
        source_norm: &[String],
        cursor: &mut SourceCursor,
    ) -> Option<AlignedWindow> {
        let first_start = cursor.next_whole_entry();
        if first_start >= source.len() {
            return None;
        }
        let last_start = (first_start + self.config.sentence_lookahead).min(source.len() - 1);
        let mut best: Option<(usize, usize, f32)> = None;

        for start in first_start..=last_start {
            let mut joined = String::new();
            for end in start..(start + self.config.max_window).min(source.len()) {
                if !source_norm[end].is_empty() {
                    if !joined.is_empty() {
                        joined.push(' ');
                    }
                    joined.push_str(&source_norm[end]);
                }
                let score = normalized_similarity(target_norm, &joined);
                if best.is_none_or(|(_, _, best_score)| score > best_score) {
                    best = Some((start, end, score));
                }
            }
        }

        let (start, end, score) = best?;
        if score <= self.config.sentence_threshold {
            return None;
        }

        *cursor = SourceCursor { entry: end + 1, word: 0 };
        Some(AlignedWindow {
            start_time: source[start].start_time,
            end_time: source[end].end_time,
            first_source_seq: source[start].seq_num,
            last_source_seq: source[end].seq_num,
            score,
            method: MatchMethod::Sentence,
        })
    }

    fn match_words(
        &self,
        target_norm: &str,
        source: &[SubtitleEntry],
        cursor: &mut SourceCursor,
    ) -> Option<AlignedWindow> {
        let target_words: Vec<&str> = target_norm.split(' ').collect();
        let (first, last) = (*target_words.first()?, *target_words.last()?);
        let words = flatten_words(source, *cursor, self.config.word_lookahead);
        let threshold = self.config.word_threshold;

        let i = words
            .iter()
            .position(|w| normalized_similarity(&w.word, first) >= threshold)?;
        let expected = i + target_words.len() - 1;
        let j = (i..words.len())
            .filter(|&j| normalized_similarity(&words[j].word, last) >= threshold)
            .min_by_key(|&j| j.abs_diff(expected))?;

        let score = (normalized_similarity(&words[i].word, first) + normalized_similarity(&words[j].word, last)) / 2.0;
        let (first_word, last_word) = (&words[i], &words[j]);

        *cursor = SourceCursor::after(last_word);

        Some(AlignedWindow {
            start_time: (first_word.time - self.config.word_pad).max(0.0),
            end_time: last_word.time + self.config.word_pad,
            first_source_seq: source[first_word.source_index].seq_num,
            last_source_seq: source[last_word.source_index].seq_num,
            score,
            method: MatchMethod::Word,
        })
    }
}

/// Unconsumed words of the next `lookahead` source entries, with midpoint times
/// interpolated across each entry in proportion to character length
fn flatten_words(source: &[SubtitleEntry], cursor: SourceCursor, lookahead: usize) -> Vec<TimedWord> {
    let mut words = Vec::new();
    let end = (cursor.entry + lookahead).min(source.len());

    for (source_index, entry) in source.iter().enumerate().take(end).skip(cursor.entry) {
        let entry_words = normalized_words(&entry.text);
        let total_chars: usize = entry_words.iter().map(|w| w.chars().count()).sum();
        if total_chars == 0 {
            continue;
        }

        let duration = entry.duration();
        let mut consumed = 0usize;
        let count = entry_words.len();
        let skip = if source_index == cursor.entry { cursor.word } else { 0 };
        for (k, word) in entry_words.into_iter().enumerate() {
            let len = word.chars().count();
            let midpoint = (consumed as f64 + len as f64 / 2.0) / total_chars as f64;
            consumed += len;
            if k < skip {
                continue;
            }
            words.push(TimedWord {
                time: entry.start_time + duration * midpoint,
                word,
                source_index,
                word_index: k,
                last_in_entry: k + 1 == count,
            });
        }
    }

    words
}
