use std::fmt;

use serde::Serialize;

use crate::subtitle_processor::{EntryOrigin, SubtitleEntry};
use crate::timeline::pauses::PauseMap;

/// Summary of an expansion run, always recomputed from final state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpansionStats {
    pub original_count: usize,
    pub expanded_count: usize,
    pub expansion_ratio: f64,
    /// End of the last entry on the working timeline
    pub total_duration: f64,
    pub parsed_count: usize,
    pub sentence_count: usize,
    pub chunk_count: usize,
    pub pause_count: usize,
    pub total_pause: f64,
}

impl ExpansionStats {
    pub fn compute(original: &[SubtitleEntry], expanded: &[SubtitleEntry], pauses: &PauseMap) -> Self {
        let count = |origin: EntryOrigin| expanded.iter().filter(|e| e.origin == origin).count();
        let expansion_ratio = if original.is_empty() {
            0.0
        } else {
            expanded.len() as f64 / original.len() as f64
        };

        Self {
            original_count: original.len(),
            expanded_count: expanded.len(),
            expansion_ratio,
            total_duration: expanded.iter().map(|e| e.end_time).fold(0.0, f64::max),
            parsed_count: count(EntryOrigin::Parsed),
            sentence_count: count(EntryOrigin::Sentence),
            chunk_count: count(EntryOrigin::Chunk),
            pause_count: pauses.len(),
            total_pause: pauses.total(),
        }
    }
}

impl fmt::Display for ExpansionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} entries (x{:.2}; {} kept, {} sentences, {} chunks), {:.3}s total, {} pauses ({:.3}s)",
            self.original_count,
            self.expanded_count,
            self.expansion_ratio,
            self.parsed_count,
            self.sentence_count,
            self.chunk_count,
            self.total_duration,
            self.pause_count,
            self.total_pause
        )
    }
}
