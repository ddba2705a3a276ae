/*!
 * Voiceover stitching.
 *
 * Valid segments and generated silences are listed in entry order, following the
 * pause map, and joined by a single concatenation that re-encodes once. One silence
 * file is generated per distinct millisecond-rounded duration and reused.
 */

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::encoder::{ConcatMode, Encoder, concat_manifest};
use crate::errors::{EncoderError, SyncError};
use crate::file_utils::WorkDir;
use crate::subtitle_processor::SubtitleEntry;
use crate::timeline::pauses::PauseMap;
use crate::voiceover::slicer::VoSegment;

/// Result of a successful stitch
#[derive(Debug, Clone, PartialEq)]
pub struct StitchResult {
    pub output: PathBuf,
    pub manifest: PathBuf,
    /// Files in concatenation order
    pub items: Vec<PathBuf>,
    /// Entries whose segment was replaced by silence
    pub filled_entries: Vec<usize>,
    /// Entries left out of the track entirely; they take no time on the stitched clock
    pub dropped_entries: Vec<usize>,
    /// Sum of the listed durations
    pub expected_duration: f64,
    /// Probed length of the output, if the probe succeeded
    pub measured_duration: Option<f64>,
}

/// Joins segments and pauses into one continuous track
#[derive(Debug, Clone)]
pub struct VoiceoverStitcher {
    encoder: Arc<dyn Encoder>,
    fill_missing: bool,
    cancel: CancellationToken,
}

impl VoiceoverStitcher {
    /// Create a new stitcher; with `fill_missing` an unusable segment is replaced
    /// by silence of its theoretical length
    pub fn new(encoder: Arc<dyn Encoder>, fill_missing: bool) -> Self {
        Self {
            encoder,
            fill_missing,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop before the final concatenation once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub async fn stitch(
        &self,
        entries: &[SubtitleEntry],
        segments: &[VoSegment],
        pauses: &PauseMap,
        work_dir: &WorkDir,
    ) -> Result<StitchResult, SyncError> {
        let by_index: HashMap<usize, &VoSegment> = segments.iter().map(|s| (s.index, s)).collect();
        let mut silences: HashMap<u64, PathBuf> = HashMap::new();
        let mut items = Vec::new();
        let mut filled_entries = Vec::new();
        let mut dropped_entries = Vec::new();
        let mut expected = 0.0;

        if let Some(head) = pauses.head() {
            expected += self.push_silence(head, work_dir, &mut silences, &mut items).await?;
        }

        for entry in entries {
            match by_index.get(&entry.seq_num) {
                Some(segment) if segment.is_valid => {
                    items.push(segment.path.clone());
                    expected += segment.actual_duration.unwrap_or(segment.requested_duration);
                }
                _ if self.fill_missing => {
                    debug!("Filling entry {} with {:.3}s of silence", entry.seq_num, entry.padded_duration());
                    expected += self
                        .push_silence(entry.padded_duration(), work_dir, &mut silences, &mut items)
                        .await?;
                    filled_entries.push(entry.seq_num);
                }
                _ => {
                    warn!("Entry {} has no usable segment and is left out", entry.seq_num);
                    dropped_entries.push(entry.seq_num);
                }
            }

            if let Some(pause) = pauses.after(entry.seq_num) {
                expected += self.push_silence(pause, work_dir, &mut silences, &mut items).await?;
            }
        }

        if items.is_empty() {
            return Err(SyncError::Config("Nothing to stitch: no usable segments".to_string()));
        }

        let manifest = work_dir.concat_list();
        tokio::fs::write(&manifest, concat_manifest(&items)).await?;

        if self.cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let output = work_dir.stitched_voiceover();
        info!(
            "Stitching {} files ({} distinct silences) into {:?}",
            items.len(),
            silences.len(),
            output
        );

        if let Err(e) = self.encoder.concat(&manifest, &output, ConcatMode::AudioEncode).await {
            if tokio::fs::remove_file(&output).await.is_ok() {
                debug!("Removed partial output {:?}", output);
            }
            return Err(if e.is_cancelled() { SyncError::Cancelled } else { SyncError::Stitch(e) });
        }

        let measured_duration = match self.encoder.probe_duration(&output).await {
            Ok(duration) => Some(duration),
            Err(e) => {
                warn!("Could not measure stitched voiceover: {}", e.summary());
                None
            }
        };

        Ok(StitchResult {
            output,
            manifest,
            items,
            filled_entries,
            dropped_entries,
            expected_duration: expected,
            measured_duration,
        })
    }

    /// Append a silence of `seconds` (ms-rounded) to `items`, generating it once.
    /// Returns the duration actually listed.
    async fn push_silence(
        &self,
        seconds: f64,
        work_dir: &WorkDir,
        cache: &mut HashMap<u64, PathBuf>,
        items: &mut Vec<PathBuf>,
    ) -> Result<f64, SyncError> {
        let millis = (seconds * 1000.0).round().max(0.0) as u64;
        if millis == 0 {
            return Ok(0.0);
        }
        let rounded = millis as f64 / 1000.0;

        if let Some(path) = cache.get(&millis) {
            items.push(path.clone());
            return Ok(rounded);
        }

        let path = work_dir.silence_path(rounded);
        self.encoder
            .generate_silence(rounded, &path)
            .await
            .map_err(stitch_error)?;
        cache.insert(millis, path.clone());
        items.push(path);
        Ok(rounded)
    }
}

fn stitch_error(error: EncoderError) -> SyncError {
    if error.is_cancelled() {
        SyncError::Cancelled
    } else {
        SyncError::Stitch(error)
    }
}
