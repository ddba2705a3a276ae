/*!
 * Voiceover slicing.
 *
 * Every entry is cut out of the source voiceover using its original timing widened
 * by its padding. Cuts run in parallel up to a fixed worker limit. A failed or
 * inaccurate cut is recorded on its segment and the run carries on.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::app_config::SlicerConfig;
use crate::encoder::{Encoder, SliceRequest};
use crate::errors::{EncoderError, SyncError};
use crate::file_utils::WorkDir;
use crate::subtitle_processor::SubtitleEntry;

/// One sliced voiceover segment
#[derive(Debug, Clone, PartialEq)]
pub struct VoSegment {
    /// Sequence number of the entry this segment belongs to
    pub index: usize,
    pub path: PathBuf,
    pub requested_start: f64,
    pub requested_end: f64,
    pub requested_duration: f64,
    /// Measured length, `None` when the cut or the probe failed
    pub actual_duration: Option<f64>,
    pub is_valid: bool,
    /// Absolute difference between measured and requested duration
    pub drift: f64,
    pub error: Option<String>,
    /// Non-fatal remark, such as the window being clamped to the audio length
    pub warning: Option<String>,
}

impl VoSegment {
    fn planned(entry: &SubtitleEntry, path: PathBuf, start: f64, end: f64, warning: Option<String>) -> Self {
        Self {
            index: entry.seq_num,
            path,
            requested_start: start,
            requested_end: end,
            requested_duration: (end - start).max(0.0),
            actual_duration: None,
            is_valid: false,
            drift: 0.0,
            error: None,
            warning,
        }
    }

    /// Whether the segment was cut and measured at all
    pub fn was_measured(&self) -> bool {
        self.actual_duration.is_some()
    }
}

enum SliceResult {
    Done(VoSegment),
    Cancelled,
}

/// Cuts the source voiceover into one file per entry
#[derive(Debug, Clone)]
pub struct VoiceoverSlicer {
    encoder: Arc<dyn Encoder>,
    config: SlicerConfig,
    workers: usize,
    cancel: CancellationToken,
}

impl VoiceoverSlicer {
    /// Create a slicer running at most `workers` cuts at a time
    pub fn new(encoder: Arc<dyn Encoder>, config: SlicerConfig, workers: usize) -> Self {
        Self {
            encoder,
            config,
            workers: workers.max(1),
            cancel: CancellationToken::new(),
        }
    }

    /// Stop issuing new cuts once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Slice every entry of `entries` out of `audio`.
    ///
    /// Segments come back ordered by entry. `progress` is called with
    /// `(completed, total)` as cuts finish.
    pub async fn slice_all<F>(
        &self,
        audio: &Path,
        entries: &[SubtitleEntry],
        work_dir: &WorkDir,
        progress: F,
    ) -> Result<Vec<VoSegment>, SyncError>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        if self.cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let total_audio = self.encoder.probe_duration(audio).await.map_err(cancel_aware)?;
        info!(
            "Slicing {} segments from {:?} ({:.3}s) with {} workers",
            entries.len(),
            audio,
            total_audio,
            self.workers
        );

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let completed = AtomicUsize::new(0);
        let total = entries.len();

        let results = stream::iter(entries.iter())
            .map(|entry| {
                let semaphore = semaphore.clone();
                let completed = &completed;
                let progress = &progress;
                async move {
                    let Ok(_permit) = semaphore.acquire().await else {
                        return SliceResult::Cancelled;
                    };
                    if self.cancel.is_cancelled() {
                        return SliceResult::Cancelled;
                    }

                    let segment = self.slice_one(audio, entry, total_audio, work_dir).await;
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress(done, total);

                    match segment {
                        Some(segment) => SliceResult::Done(segment),
                        None => SliceResult::Cancelled,
                    }
                }
            })
            .buffer_unordered(self.workers)
            .collect::<Vec<_>>()
            .await;

        let mut segments = Vec::with_capacity(results.len());
        for result in results {
            match result {
                SliceResult::Done(segment) => segments.push(segment),
                SliceResult::Cancelled => return Err(SyncError::Cancelled),
            }
        }

        // Completion order is arbitrary
        segments.sort_by_key(|s| s.index);

        let valid = segments.iter().filter(|s| s.is_valid).count();
        info!("Sliced {}/{} segments within tolerance", valid, segments.len());

        Ok(segments)
    }

    /// Cut and measure one segment; `None` means the run was cancelled mid-way
    async fn slice_one(
        &self,
        audio: &Path,
        entry: &SubtitleEntry,
        total_audio: f64,
        work_dir: &WorkDir,
    ) -> Option<VoSegment> {
        let (start, requested_end) = entry.slice_window();
        let mut end = requested_end;
        let mut warning = None;

        if end > total_audio {
            let message = format!(
                "Segment {} end {:.3}s clamped to audio length {:.3}s",
                entry.seq_num, end, total_audio
            );
            warn!("{}", message);
            warning = Some(message);
            end = total_audio;
        }

        let path = work_dir.segment_path(entry.seq_num);
        let mut segment = VoSegment::planned(entry, path.clone(), start, end, warning);

        if end <= start {
            segment.error = Some(format!(
                "Empty slice window {:.3}s..{:.3}s for entry {}",
                start, end, entry.seq_num
            ));
            warn!("{}", segment.error.as_deref().unwrap_or_default());
            return Some(segment);
        }

        let request = SliceRequest {
            input: audio.to_path_buf(),
            output: path.clone(),
            start,
            duration: segment.requested_duration,
        };

        if let Err(e) = self.encoder.slice(&request).await {
            if e.is_cancelled() {
                return None;
            }
            warn!("Segment {} could not be cut: {}", entry.seq_num, e.summary());
            segment.error = Some(e.to_string());
            return Some(segment);
        }

        match self.encoder.probe_duration(&path).await {
            Ok(actual) => {
                segment.actual_duration = Some(actual);
                segment.drift = (actual - segment.requested_duration).abs();
                segment.is_valid = segment.drift <= self.config.drift_tolerance();

                if !segment.is_valid {
                    let message = format!(
                        "Segment {} drift {:.0}ms exceeds {}ms tolerance",
                        entry.seq_num,
                        segment.drift * 1000.0,
                        self.config.drift_tolerance_ms
                    );
                    warn!("{}", message);
                    segment.error = Some(message);
                } else {
                    debug!("Segment {} ok, drift {:.1}ms", entry.seq_num, segment.drift * 1000.0);
                }
            }
            Err(e) if e.is_cancelled() => return None,
            Err(e) => {
                warn!("Segment {} could not be measured: {}", entry.seq_num, e.summary());
                segment.error = Some(e.to_string());
            }
        }

        Some(segment)
    }
}

fn cancel_aware(error: EncoderError) -> SyncError {
    if error.is_cancelled() {
        SyncError::Cancelled
    } else {
        SyncError::Encoder(error)
    }
}
