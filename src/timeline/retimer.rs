/*!
 * Timeline retiming.
 *
 * Entries are laid end to end on a clock anchored at zero: each entry lasts as long
 * as its audio slice and is followed by its pause. Measured segment durations are
 * preferred over theoretical ones, and entries left out of the stitched track take
 * no time, so the subtitle timeline follows the stitched audio exactly.
 */

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::subtitle_processor::SubtitleEntry;
use crate::timeline::pauses::PauseMap;

/// Rewrites working timestamps from durations and pauses
#[derive(Debug, Clone, Default)]
pub struct Retimer {
    measured: HashMap<usize, f64>,
    dropped: HashSet<usize>,
}

impl Retimer {
    /// Retimer that only uses theoretical padded durations
    pub fn new() -> Self {
        Self::default()
    }

    /// Retimer preferring measured durations, keyed by entry sequence number
    pub fn with_measured(measured: HashMap<usize, f64>) -> Self {
        Self {
            measured,
            dropped: HashSet::new(),
        }
    }

    /// Give the listed entries zero duration
    pub fn with_dropped<I: IntoIterator<Item = usize>>(mut self, dropped: I) -> Self {
        self.dropped.extend(dropped);
        self
    }

    /// Duration the entry occupies on the retimed clock
    pub fn duration_for(&self, entry: &SubtitleEntry) -> f64 {
        if self.dropped.contains(&entry.seq_num) {
            return 0.0;
        }
        self.measured
            .get(&entry.seq_num)
            .copied()
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or_else(|| entry.padded_duration())
    }

    /// Retime entries in place and return the end of the timeline.
    ///
    /// Original timestamps are left untouched.
    pub fn retime(&self, entries: &mut [SubtitleEntry], pauses: &PauseMap) -> f64 {
        let mut clock = pauses.head().unwrap_or(0.0);

        for entry in entries.iter_mut() {
            let duration = self.duration_for(entry);
            entry.start_time = clock;
            entry.end_time = clock + duration;
            clock = entry.end_time;

            if let Some(pause) = pauses.after(entry.seq_num) {
                clock += pause;
            }
        }

        debug!("Retimed {} entries, timeline ends at {:.3}s", entries.len(), clock);
        clock
    }
}
