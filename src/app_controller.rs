use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::app_config::Config;
use crate::clips::{
    AssemblyManifest, AssemblyOutcome, ClipAssembler, ClipSlot, aligned_slots, clip_durations, one_to_one_slots,
};
use crate::concurrency::ConcurrencyProfile;
use crate::encoder::{Encoder, FfmpegEncoder};
use crate::errors::SyncError;
use crate::file_utils::{FileManager, WorkDir};
use crate::subtitle_processor::{OverlayMap, SubtitleCollection, SubtitleEntry};
use crate::timeline::pauses::remap_by_alignment;
use crate::timeline::{
    ExpansionStats, FuzzyAligner, PauseCalculator, PauseMap, Retimer, SentenceExpander, apply_padding,
};
use crate::voiceover::{ValidationReport, VoSegment, VoiceoverSlicer, VoiceoverStitcher};

// @module: Synchronization run orchestration

/// Everything a single synchronization run needs
#[derive(Debug, Clone, Default)]
pub struct SyncRequest {
    /// Source subtitle matching the recorded voiceover
    pub subtitle: PathBuf,
    /// Recorded voiceover
    pub audio: PathBuf,
    /// Run directory; a fresh one under the workspace root when absent
    pub work_dir: Option<PathBuf>,
    /// Advisory pauses keyed by entry (or script) index
    pub hints: HashMap<usize, f64>,
    /// Advisory overlays keyed by entry (or script) index
    pub overlays: OverlayMap,
    /// Caller's own segmentation; when present, hints and overlays are keyed by it
    pub script: Option<PathBuf>,
}

impl SyncRequest {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(subtitle: P, audio: Q) -> Self {
        Self {
            subtitle: subtitle.into(),
            audio: audio.into(),
            ..Default::default()
        }
    }

    pub fn with_work_dir<P: Into<PathBuf>>(mut self, work_dir: P) -> Self {
        self.work_dir = Some(work_dir.into());
        self
    }

    pub fn with_hints(mut self, hints: HashMap<usize, f64>) -> Self {
        self.hints = hints;
        self
    }

    pub fn with_overlays(mut self, overlays: OverlayMap) -> Self {
        self.overlays = overlays;
        self
    }

    pub fn with_script<P: Into<PathBuf>>(mut self, script: P) -> Self {
        self.script = Some(script.into());
        self
    }
}

/// Expanded, padded entries with their pauses, before any audio work
#[derive(Debug, Clone)]
pub struct TimelinePlan {
    pub entries: Vec<SubtitleEntry>,
    pub pauses: PauseMap,
    /// Overlays keyed by expanded entry index
    pub overlays: OverlayMap,
}

/// Result of a synchronization run
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub work_dir: PathBuf,
    pub expanded_subtitle: PathBuf,
    pub stitched_voiceover: PathBuf,
    /// Retimed entries
    pub entries: Vec<SubtitleEntry>,
    pub pauses: PauseMap,
    pub stats: ExpansionStats,
    pub report: ValidationReport,
    /// End of the retimed timeline
    pub timeline_duration: f64,
}

#[derive(Serialize)]
struct RunSummary<'a> {
    finished_at: String,
    subtitle: &'a Path,
    audio: &'a Path,
    stats: &'a ExpansionStats,
    report: &'a ValidationReport,
    pauses: Vec<(i64, f64)>,
}

/// Drives the synchronization pipeline and clip assembly
pub struct SyncController {
    config: Config,
    encoder: Arc<dyn Encoder>,
    cancel: CancellationToken,
}

impl SyncController {
    /// Create a controller backed by the ffmpeg encoder
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        let cancel = CancellationToken::new();
        let encoder = FfmpegEncoder::new(config.encoder.clone()).with_cancellation(cancel.clone());
        Ok(Self {
            config,
            encoder: Arc::new(encoder),
            cancel,
        })
    }

    /// Create a controller around any encoder
    pub fn with_encoder(config: Config, encoder: Arc<dyn Encoder>) -> Self {
        Self {
            config,
            encoder,
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token that stops the run before its next subprocess launch
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Expand, pad and compute pauses.
    ///
    /// With a `script`, hints and overlays are keyed by script entry and are moved
    /// onto the expanded entry where the aligned script text ends.
    pub fn build_timeline(
        &self,
        source: &[SubtitleEntry],
        hints: &HashMap<usize, f64>,
        overlays: &OverlayMap,
        script: Option<&[SubtitleEntry]>,
    ) -> TimelinePlan {
        let sync = &self.config.sync;

        let mut entries = SentenceExpander::new(sync.expander.clone()).expand(source);
        apply_padding(&mut entries, &sync.padding);

        let calculator = PauseCalculator::new(sync.pauses.clone());
        let rule_based = calculator.calculate(&entries);

        let (hints, overlays) = match script {
            Some(script) => {
                let alignments = FuzzyAligner::new(sync.aligner.clone()).align(script, &entries);
                let aligned = alignments.iter().filter(|a| a.is_aligned()).count();
                info!("Aligned {}/{} script entries", aligned, alignments.len());
                (remap_by_alignment(hints, &alignments), remap_by_alignment(overlays, &alignments))
            }
            None => (hints.clone(), overlays.clone()),
        };

        let pauses = calculator.merge_sources(&rule_based, &hints, &overlays);
        debug!("{} pauses totalling {:.3}s", pauses.len(), pauses.total());

        TimelinePlan {
            entries,
            pauses,
            overlays,
        }
    }

    /// Run the whole synchronization: expand, slice, stitch, retime
    pub async fn run(&self, request: SyncRequest) -> Result<SyncOutcome> {
        let start_time = Instant::now();

        FileManager::require_file(&request.subtitle, "Subtitle file")?;
        FileManager::require_file(&request.audio, "Voiceover audio")?;

        let source = SubtitleCollection::read_from_file(&request.subtitle)
            .with_context(|| format!("Failed to read subtitle file: {:?}", request.subtitle))?;
        let script = match &request.script {
            Some(path) => Some(
                SubtitleCollection::read_from_file(path)
                    .with_context(|| format!("Failed to read script file: {:?}", path))?
                    .entries,
            ),
            None => None,
        };

        let plan = self.build_timeline(&source.entries, &request.hints, &request.overlays, script.as_deref());
        info!(
            "Expanded {} entries into {} ({} pauses)",
            source.entries.len(),
            plan.entries.len(),
            plan.pauses.len()
        );

        let work_dir = WorkDir::new(self.resolve_work_dir(&request));
        work_dir.create()?;
        work_dir.reset_segments()?;
        info!("Working directory: {}", work_dir.root().display());

        let result = self.synchronize(&request, &source.entries, plan, &work_dir).await;

        match result {
            Ok(outcome) => {
                info!(
                    "Synchronization completed in {}.",
                    Self::format_duration(start_time.elapsed())
                );
                Ok(outcome)
            }
            Err(SyncError::Cancelled) => {
                let stitched = work_dir.stitched_voiceover();
                if stitched.exists() {
                    if let Err(e) = std::fs::remove_file(&stitched) {
                        warn!("Failed to remove partial voiceover {:?}: {}", stitched, e);
                    }
                }
                warn!("Synchronization cancelled");
                Err(SyncError::Cancelled.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn synchronize(
        &self,
        request: &SyncRequest,
        original: &[SubtitleEntry],
        plan: TimelinePlan,
        work_dir: &WorkDir,
    ) -> Result<SyncOutcome, SyncError> {
        let sync = &self.config.sync;
        let profile = ConcurrencyProfile::detect(&sync.slicer, &sync.crossfade);
        let TimelinePlan {
            mut entries,
            pauses,
            overlays,
        } = plan;

        let progress_bar = self.slice_progress_bar(entries.len() as u64);
        let slicer = VoiceoverSlicer::new(self.encoder.clone(), sync.slicer.clone(), profile.slice_workers)
            .with_cancellation(self.cancel.clone());
        let segments = slicer
            .slice_all(&request.audio, &entries, work_dir, |done, _| {
                progress_bar.set_position(done as u64)
            })
            .await;
        progress_bar.finish_and_clear();
        let segments = segments?;

        let stitcher = VoiceoverStitcher::new(self.encoder.clone(), sync.slicer.fill_missing_with_silence)
            .with_cancellation(self.cancel.clone());
        let stitched = stitcher.stitch(&entries, &segments, &pauses, work_dir).await?;

        let timeline_duration = Retimer::with_measured(measured_durations(&segments))
            .with_dropped(stitched.dropped_entries.iter().copied())
            .retime(&mut entries, &pauses);

        let collection = SubtitleCollection {
            source_file: work_dir.expanded_subtitle(),
            entries,
        };
        collection
            .write_to_file(work_dir.expanded_subtitle(), Some(&overlays))
            .map_err(|e| SyncError::Config(format!("Failed to write expanded subtitle: {}", e)))?;

        let stats = ExpansionStats::compute(original, &collection.entries, &pauses);
        let report = ValidationReport::from_segments(
            &segments,
            sync.slicer.drift_tolerance(),
            sync.slicer.drift_ceiling(),
            stitched.filled_entries.clone(),
            stitched.expected_duration,
            stitched.measured_duration,
        );
        info!("{}", stats);
        if report.is_clean() {
            info!("{}", report);
        } else {
            warn!("{}", report);
        }

        self.write_summary(request, &stats, &report, &pauses, work_dir);

        Ok(SyncOutcome {
            work_dir: work_dir.root().to_path_buf(),
            expanded_subtitle: work_dir.expanded_subtitle(),
            stitched_voiceover: stitched.output,
            entries: collection.entries,
            pauses,
            stats,
            report,
            timeline_duration,
        })
    }

    /// Place clips on a retimed timeline and chain them into `output`
    pub async fn assemble<R: Rng + ?Sized>(
        &self,
        manifest: &AssemblyManifest,
        timeline: &Path,
        output: &Path,
        rng: &mut R,
    ) -> Result<AssemblyOutcome> {
        let crossfade = &self.config.sync.crossfade;
        let entries = SubtitleCollection::read_from_file(timeline)
            .with_context(|| format!("Failed to read timeline subtitle: {:?}", timeline))?
            .entries;
        let timeline_end = entries.last().map(|e| e.end_time).unwrap_or_default();

        let slots = self.clip_slots(manifest, &entries, timeline_end)?;
        let clips = &manifest.clips[..slots.len()];
        let durations = clip_durations(&slots, crossfade.transition_duration);

        let profile = ConcurrencyProfile::detect(&self.config.sync.slicer, crossfade);
        let assembler = ClipAssembler::new(
            self.encoder.clone(),
            crossfade.clone(),
            profile.render_workers,
            clips_dir_for(output),
        )
        .with_cancellation(self.cancel.clone());

        let prepared = assembler.prepare_clips(clips, &durations, rng).await?;
        let outcome = assembler.assemble(&prepared, output).await?;
        info!(
            "Assembled {} clips into {} ({})",
            prepared.len(),
            outcome.output.display(),
            outcome.rung
        );
        Ok(outcome)
    }

    /// Clip slots for a manifest, by alignment when a visual subtitle is given
    pub fn clip_slots(
        &self,
        manifest: &AssemblyManifest,
        entries: &[SubtitleEntry],
        timeline_end: f64,
    ) -> Result<Vec<ClipSlot>> {
        if manifest.clips.is_empty() {
            return Err(anyhow!("Assembly manifest lists no clips"));
        }

        let slots = match &manifest.visual_subtitle {
            Some(path) => {
                let visual = SubtitleCollection::read_from_file(path)
                    .with_context(|| format!("Failed to read visual subtitle: {:?}", path))?
                    .entries;
                if visual.len() != manifest.clips.len() {
                    return Err(anyhow!(
                        "Visual subtitle has {} entries but the manifest lists {} clips",
                        visual.len(),
                        manifest.clips.len()
                    ));
                }
                let alignments = FuzzyAligner::new(self.config.sync.aligner.clone()).align(&visual, entries);
                aligned_slots(&alignments, timeline_end)
            }
            None => one_to_one_slots(entries, manifest.clips.len()),
        };

        if slots.is_empty() {
            return Err(anyhow!("Timeline has no entries to place clips on"));
        }
        Ok(slots)
    }

    fn resolve_work_dir(&self, request: &SyncRequest) -> PathBuf {
        if let Some(dir) = &request.work_dir {
            return dir.clone();
        }
        let stem = request
            .subtitle
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "run".to_string());
        let run_id = Uuid::new_v4().simple().to_string();
        self.config
            .workspace
            .resolve_root()
            .join(format!("{}_{}", stem, &run_id[..8]))
    }

    fn slice_progress_bar(&self, total: u64) -> ProgressBar {
        if !self.config.workspace.show_progress {
            return ProgressBar::hidden();
        }
        let progress_bar = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} segments ({percent}%) {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar
    }

    fn write_summary(
        &self,
        request: &SyncRequest,
        stats: &ExpansionStats,
        report: &ValidationReport,
        pauses: &PauseMap,
        work_dir: &WorkDir,
    ) {
        let summary = RunSummary {
            finished_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            subtitle: &request.subtitle,
            audio: &request.audio,
            stats,
            report,
            pauses: pauses.iter().collect(),
        };
        let path = work_dir.root().join("sync_report.json");
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => {
                if let Err(e) = FileManager::write_to_file(&path, &json) {
                    warn!("Failed to write run summary: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize run summary: {}", e),
        }
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

/// Measured durations of the segments that made it into the stitched track
pub fn measured_durations(segments: &[VoSegment]) -> HashMap<usize, f64> {
    segments
        .iter()
        .filter(|s| s.is_valid)
        .filter_map(|s| s.actual_duration.map(|d| (s.index, d)))
        .collect()
}

fn clips_dir_for(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "assembly".to_string());
    output
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("{}_clips", stem))
}
