/*!
 * Pause calculation between entries.
 *
 * Pauses come from three sources: punctuation and content rules, the natural
 * silence already present in the source audio, and advisory hints from the
 * content-classification layer (explicit pause hints and overlay reading times).
 * Sources are merged per entry by taking the maximum, never by summing.
 */

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use log::{debug, warn};

use crate::app_config::{OverlayTimingConfig, PauseConfig};
use crate::subtitle_processor::{OverlayMap, SubtitleEntry, TextOverlay};
use crate::timeline::aligner::Alignment;

/// Key used for silence before the first entry
pub const HEAD_INDEX: i64 = -1;

/// Pauses at or below this length are not recorded
const MIN_PAUSE: f64 = 0.001;

/// Pause durations in seconds keyed by entry sequence number (or [`HEAD_INDEX`])
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PauseMap {
    pauses: BTreeMap<i64, f64>,
}

impl PauseMap {
    /// Create an empty pause map
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `seconds` at `index` unless a longer pause is already there.
    ///
    /// Pauses are kept on the millisecond grid the stitched silences are generated on.
    pub fn merge_max(&mut self, index: i64, seconds: f64) {
        if !seconds.is_finite() {
            return;
        }
        let seconds = (seconds * 1000.0).round() / 1000.0;
        if seconds <= MIN_PAUSE {
            return;
        }
        let slot = self.pauses.entry(index).or_insert(0.0);
        if seconds > *slot {
            *slot = seconds;
        }
    }

    /// Merge every pause of `other` into this map by maximum
    pub fn merge(&mut self, other: &PauseMap) {
        for (index, seconds) in other.iter() {
            self.merge_max(index, seconds);
        }
    }

    /// Pause after the entry with the given sequence number
    pub fn after(&self, seq_num: usize) -> Option<f64> {
        self.pauses.get(&(seq_num as i64)).copied()
    }

    /// Silence before the first entry
    pub fn head(&self) -> Option<f64> {
        self.pauses.get(&HEAD_INDEX).copied()
    }

    /// Pause at a raw index
    pub fn get(&self, index: i64) -> Option<f64> {
        self.pauses.get(&index).copied()
    }

    /// Iterate in index order; the head pause, if any, comes first
    pub fn iter(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.pauses.iter().map(|(k, v)| (*k, *v))
    }

    /// Number of recorded pauses
    pub fn len(&self) -> usize {
        self.pauses.len()
    }

    /// Whether no pause is recorded
    pub fn is_empty(&self) -> bool {
        self.pauses.is_empty()
    }

    /// Sum of all pauses
    pub fn total(&self) -> f64 {
        self.pauses.values().sum()
    }
}

impl FromIterator<(i64, f64)> for PauseMap {
    fn from_iter<I: IntoIterator<Item = (i64, f64)>>(iter: I) -> Self {
        let mut map = PauseMap::new();
        for (index, seconds) in iter {
            map.merge_max(index, seconds);
        }
        map
    }
}

/// Which rule produced a pause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseKind {
    Citation,
    Question,
    Ellipsis,
    Period,
    Comma,
}

impl fmt::Display for PauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PauseKind::Citation => "citation",
            PauseKind::Question => "question",
            PauseKind::Ellipsis => "ellipsis",
            PauseKind::Period => "period",
            PauseKind::Comma => "comma",
        };
        write!(f, "{}", name)
    }
}

/// Derives the silence to insert after each entry
#[derive(Debug, Clone)]
pub struct PauseCalculator {
    config: PauseConfig,
    citation_markers: Vec<String>,
}

impl PauseCalculator {
    /// Create a new calculator
    pub fn new(config: PauseConfig) -> Self {
        let citation_markers = config
            .citation_markers
            .iter()
            .map(|m| m.to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        Self { config, citation_markers }
    }

    /// Classify an entry's text by its strongest pause rule
    pub fn classify(&self, text: &str) -> Option<PauseKind> {
        let lower = text.to_lowercase();
        if self.citation_markers.iter().any(|m| lower.contains(m.as_str())) {
            return Some(PauseKind::Citation);
        }

        let trimmed = text
            .trim_end()
            .trim_end_matches(['"', '\'', '”', '’', ')', ']', '»']);

        if trimmed.ends_with('?') {
            Some(PauseKind::Question)
        } else if trimmed.ends_with("...") || trimmed.ends_with('…') {
            Some(PauseKind::Ellipsis)
        } else if trimmed.ends_with('.') || trimmed.ends_with('!') {
            Some(PauseKind::Period)
        } else if trimmed.ends_with(',') || trimmed.ends_with(';') || trimmed.ends_with(':') {
            Some(PauseKind::Comma)
        } else {
            None
        }
    }

    /// Pause length for a rule
    pub fn pause_for(&self, kind: PauseKind) -> f64 {
        match kind {
            PauseKind::Citation => self.config.citation,
            PauseKind::Question => self.config.question,
            PauseKind::Ellipsis => self.config.ellipsis,
            PauseKind::Period => self.config.period,
            PauseKind::Comma => self.config.comma,
        }
    }

    /// Rule-based pause for a text, zero when no rule applies
    pub fn rule_pause(&self, text: &str) -> f64 {
        self.classify(text).map(|kind| self.pause_for(kind)).unwrap_or(0.0)
    }

    /// Rule and natural-gap pauses for a padded, expanded sequence.
    ///
    /// The natural gap is a floor: a silent stretch in the source audio is kept even
    /// when no punctuation rule fires. The last entry gets no trailing pause.
    pub fn calculate(&self, entries: &[SubtitleEntry]) -> PauseMap {
        let mut pauses = PauseMap::new();

        if let Some(first) = entries.first() {
            let head = first.original_start_time() - first.padding_start;
            if head > MIN_PAUSE {
                debug!("Head silence of {:.3}s before first entry", head);
                pauses.merge_max(HEAD_INDEX, head);
            }
        }

        for pair in entries.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            let rule = self.rule_pause(&current.text);
            let natural = natural_gap(current, next);
            pauses.merge_max(current.seq_num as i64, rule.max(natural));
        }

        pauses
    }

    /// Minimum pause after each overlaid entry so the overlay can be read
    pub fn overlay_minimums(&self, overlays: &OverlayMap) -> PauseMap {
        overlays
            .iter()
            .map(|(seq_num, overlay)| (*seq_num as i64, overlay_reading_time(overlay, &self.config.overlay)))
            .collect()
    }

    /// Merge rule pauses with advisory hints and overlay minimums
    pub fn merge_sources(&self, rule_based: &PauseMap, hints: &HashMap<usize, f64>, overlays: &OverlayMap) -> PauseMap {
        let mut merged = rule_based.clone();
        for (seq_num, seconds) in hints {
            merged.merge_max(*seq_num as i64, *seconds);
        }
        merged.merge(&self.overlay_minimums(overlays));
        merged
    }
}

/// Silence between two entries in the source audio not already taken by padding
pub fn natural_gap(current: &SubtitleEntry, next: &SubtitleEntry) -> f64 {
    let gap = next.original_start_time() - current.original_end_time() - current.padding_end - next.padding_start;
    gap.max(0.0)
}

/// Reading time for an overlay: base by type plus time per word, clamped
pub fn overlay_reading_time(overlay: &TextOverlay, config: &OverlayTimingConfig) -> f64 {
    let mut seconds = overlay.overlay_type.base_reading_time()
        + overlay.word_count() as f64 * config.seconds_per_word;
    if overlay.arabic.as_deref().is_some_and(|a| !a.trim().is_empty()) {
        seconds += config.arabic_bonus;
    }
    seconds.clamp(config.min, config.max)
}

/// Move hints keyed by target sequence numbers onto the last source entry each
/// target was aligned to; hints for unaligned targets are dropped
pub fn remap_by_alignment<T: Clone>(hints: &HashMap<usize, T>, alignments: &[Alignment]) -> HashMap<usize, T> {
    let mut remapped = HashMap::new();
    for (target_seq, value) in hints {
        match alignments.iter().find(|a| a.target_seq == *target_seq).and_then(|a| a.window.as_ref()) {
            Some(window) => {
                remapped.insert(window.last_source_seq, value.clone());
            }
            None => warn!("Dropping hint for unaligned script entry {}", target_seq),
        }
    }
    remapped
}
