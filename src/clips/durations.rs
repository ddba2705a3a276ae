/*!
 * Clip duration resolution.
 *
 * Clips are placed on the retimed timeline either one per entry, or by aligning an
 * externally authored visual subtitle against the retimed entries. Every clip
 * except the last is lengthened by the transition so that, after crossfading, each
 * clip's transition begins exactly at its slot start.
 */

use log::{debug, warn};

use crate::subtitle_processor::SubtitleEntry;
use crate::timeline::aligner::Alignment;

/// Shortest slot a clip may be given
const MIN_SLOT: f64 = 0.1;

/// Where one clip sits on the timeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipSlot {
    pub start: f64,
    /// Slot length before the transition overlap is added
    pub length: f64,
    /// Whether the start came from the timeline rather than an even-division fallback
    pub anchored: bool,
}

/// One clip per retimed entry.
///
/// Clip `i` covers entry `i` and the pause after it; the first clip also covers any
/// head silence. With fewer clips than entries the last clip runs to the end of the
/// timeline; surplus clips are ignored.
pub fn one_to_one_slots(entries: &[SubtitleEntry], clip_count: usize) -> Vec<ClipSlot> {
    let count = clip_count.min(entries.len());
    if clip_count > entries.len() {
        warn!("{} clips for {} entries, ignoring the surplus", clip_count, entries.len());
    }
    let Some(timeline_end) = entries.last().map(|e| e.end_time) else {
        return Vec::new();
    };

    let starts: Vec<f64> = (0..count)
        .map(|i| if i == 0 { 0.0 } else { entries[i].start_time })
        .collect();

    slots_from_starts(&starts, &vec![true; count], timeline_end)
}

/// Clip slots from the alignment of a visual subtitle (one clip per visual entry).
///
/// Aligned entries anchor their clip at the aligned start. Runs of unaligned entries
/// share the span between the surrounding anchors evenly, so a clip never gets a
/// zero-length slot.
pub fn aligned_slots(alignments: &[Alignment], timeline_end: f64) -> Vec<ClipSlot> {
    let n = alignments.len();
    if n == 0 {
        return Vec::new();
    }

    let mut starts: Vec<Option<f64>> = alignments.iter().map(|a| a.time_range().map(|(s, _)| s)).collect();
    let anchored: Vec<bool> = starts.iter().map(Option::is_some).collect();
    // The visual track always begins with the timeline
    starts[0] = Some(0.0);

    let mut resolved = vec![0.0; n];
    let mut prev = 0usize;
    resolved[0] = 0.0;

    for i in 1..=n {
        let anchor = if i == n { Some(timeline_end) } else { starts[i] };
        let Some(anchor_time) = anchor else {
            continue;
        };

        let from = resolved[prev];
        let to = anchor_time.max(from);
        let steps = (i - prev) as f64;
        for (k, slot) in resolved.iter_mut().enumerate().take(i).skip(prev + 1) {
            *slot = from + (to - from) * (k - prev) as f64 / steps;
        }
        if i < n {
            resolved[i] = to;
        }
        prev = i;
    }

    let unaligned = anchored.iter().filter(|a| !**a).count();
    if unaligned > 0 {
        debug!("{} of {} visual entries placed by even division", unaligned, n);
    }

    slots_from_starts(&resolved, &anchored, timeline_end)
}

/// Clip durations to feed the crossfade builder
pub fn clip_durations(slots: &[ClipSlot], transition: f64) -> Vec<f64> {
    slots
        .iter()
        .enumerate()
        .map(|(i, slot)| {
            if i + 1 < slots.len() {
                slot.length + transition
            } else {
                slot.length
            }
        })
        .collect()
}

fn slots_from_starts(starts: &[f64], anchored: &[bool], timeline_end: f64) -> Vec<ClipSlot> {
    starts
        .iter()
        .enumerate()
        .map(|(i, start)| {
            let end = starts.get(i + 1).copied().unwrap_or(timeline_end);
            ClipSlot {
                start: *start,
                length: (end - start).max(MIN_SLOT),
                anchored: anchored[i],
            }
        })
        .collect()
}
