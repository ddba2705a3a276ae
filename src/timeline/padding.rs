/*!
 * Slice padding around each entry.
 *
 * Padding widens an entry's audio slice so lead-in breaths and trailing decay are
 * kept. Each side is capped by the configured maximum and by half the silence to the
 * neighbouring entry, so adjacent slices never overlap.
 */

use crate::app_config::PaddingConfig;
use crate::subtitle_processor::SubtitleEntry;

/// Assign `padding_start` / `padding_end` to every entry from its original timing.
///
/// Only entries without any padding yet are touched, so calling this twice leaves
/// the first result in place.
pub fn apply_padding(entries: &mut [SubtitleEntry], config: &PaddingConfig) {
    if entries.iter().any(|e| e.padding_start > 0.0 || e.padding_end > 0.0) {
        return;
    }

    let windows: Vec<(f64, f64)> = entries
        .iter()
        .map(|e| (e.original_start_time(), e.original_end_time()))
        .collect();

    for (i, entry) in entries.iter_mut().enumerate() {
        let (start, end) = windows[i];

        let gap_before = match i.checked_sub(1) {
            Some(prev) => (start - windows[prev].1).max(0.0),
            None => start,
        };
        let gap_after = windows.get(i + 1).map(|next| (next.0 - end).max(0.0));

        let half_before = if i == 0 { gap_before } else { gap_before / 2.0 };
        entry.padding_start = config.start_cap.min(half_before).max(0.0);
        entry.padding_end = match gap_after {
            Some(gap) => config.end_cap.min(gap / 2.0).max(0.0),
            None => config.end_cap.max(0.0),
        };
    }
}
