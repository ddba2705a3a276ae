/*!
 * Visual track assembly.
 *
 * Stills are first rendered into clips with Ken Burns motion (bounded parallel
 * renders). The clips are then joined with crossfades, falling back step by step
 * when the encoder rejects a graph:
 * 1. video and audio crossfade (silence-backed if any clip has no audio)
 * 2. video-only crossfade over generated silence
 * 3. plain concatenation
 */

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use log::{info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::app_config::CrossfadeConfig;
use crate::clips::motion::{MotionType, configure_motion, random_motion, zoompan_filter};
use crate::clips::offsets::{AudioTrack, CrossfadePlan, crossfade_topology};
use crate::encoder::{ConcatMode, Encoder, FilterGraphJob, MediaInput, concat_manifest};
use crate::errors::{EncoderError, SyncError};
use crate::file_utils::{FileManager, MediaKind};

/// Kind of visual asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipKind {
    Video,
    Still,
}

/// One visual asset as handed over by the asset broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSource {
    pub path: PathBuf,

    /// Detected from the extension when absent
    #[serde(default)]
    pub kind: Option<ClipKind>,

    /// Ken Burns motion for stills; random when absent
    #[serde(default)]
    pub motion: Option<MotionType>,

    /// Whether a video clip carries its own audio
    #[serde(default)]
    pub has_audio: bool,
}

impl ClipSource {
    pub fn resolved_kind(&self) -> ClipKind {
        self.kind.unwrap_or(match FileManager::detect_media_kind(&self.path) {
            MediaKind::Image => ClipKind::Still,
            _ => ClipKind::Video,
        })
    }
}

/// Input file of the `assemble` command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyManifest {
    pub clips: Vec<ClipSource>,

    /// Subtitle authored for the visual track; clips are then placed by alignment
    #[serde(default)]
    pub visual_subtitle: Option<PathBuf>,
}

impl AssemblyManifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = FileManager::read_to_string(&path)?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse assembly manifest: {:?}", path.as_ref()))
    }
}

/// A clip ready to be chained
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedClip {
    pub path: PathBuf,
    pub has_audio: bool,
    pub duration: f64,
}

/// Which rung of the fallback ladder produced the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRung {
    Crossfade,
    VideoOnlyCrossfade,
    PlainConcat,
}

impl fmt::Display for TransitionRung {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransitionRung::Crossfade => "crossfade",
            TransitionRung::VideoOnlyCrossfade => "video-only crossfade",
            TransitionRung::PlainConcat => "plain concat",
        };
        write!(f, "{}", name)
    }
}

/// Result of a successful assembly
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyOutcome {
    pub output: PathBuf,
    pub rung: TransitionRung,
    pub plan: CrossfadePlan,
    /// Diagnostics of the rungs that failed before `rung` succeeded
    pub failed_attempts: Vec<String>,
}

/// Renders stills and chains clips with transitions
#[derive(Debug, Clone)]
pub struct ClipAssembler {
    encoder: Arc<dyn Encoder>,
    config: CrossfadeConfig,
    workers: usize,
    clips_dir: PathBuf,
    cancel: CancellationToken,
}

impl ClipAssembler {
    /// Create an assembler writing intermediate clips to `clips_dir`
    pub fn new(encoder: Arc<dyn Encoder>, config: CrossfadeConfig, workers: usize, clips_dir: PathBuf) -> Self {
        Self {
            encoder,
            config,
            workers: workers.max(1),
            clips_dir,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Turn sources into chainable clips of the given durations.
    ///
    /// Motions are drawn from `rng` in clip order before any rendering starts.
    pub async fn prepare_clips<R: Rng + ?Sized>(
        &self,
        sources: &[ClipSource],
        durations: &[f64],
        rng: &mut R,
    ) -> Result<Vec<PreparedClip>, SyncError> {
        if sources.len() != durations.len() {
            return Err(SyncError::Config(format!(
                "{} clips but {} durations",
                sources.len(),
                durations.len()
            )));
        }

        let motions: Vec<Option<MotionType>> = sources
            .iter()
            .map(|s| match s.resolved_kind() {
                ClipKind::Still => Some(s.motion.unwrap_or_else(|| random_motion(rng))),
                ClipKind::Video => None,
            })
            .collect();

        FileManager::ensure_dir(&self.clips_dir).map_err(|e| SyncError::Config(e.to_string()))?;
        let semaphore = Arc::new(Semaphore::new(self.workers));

        let results = stream::iter(sources.iter().enumerate())
            .map(|(i, source)| {
                let semaphore = semaphore.clone();
                let motion = motions[i];
                let duration = durations[i];
                async move {
                    let Some(motion) = motion else {
                        return Ok(PreparedClip {
                            path: source.path.clone(),
                            has_audio: source.has_audio,
                            duration,
                        });
                    };

                    let _permit = semaphore.acquire().await.map_err(|_| SyncError::Cancelled)?;
                    if self.cancel.is_cancelled() {
                        return Err(SyncError::Cancelled);
                    }

                    let job = self.still_job(i, source, motion, duration);
                    self.encoder.run_filter_graph(&job).await.map_err(cancel_aware)?;
                    Ok(PreparedClip {
                        path: job.output,
                        has_audio: false,
                        duration,
                    })
                }
            })
            .buffered(self.workers)
            .collect::<Vec<Result<PreparedClip, SyncError>>>()
            .await;

        results.into_iter().collect()
    }

    fn still_job(&self, index: usize, source: &ClipSource, motion: MotionType, duration: f64) -> FilterGraphJob {
        let params = configure_motion(motion);
        let zoompan = zoompan_filter(&params, duration, self.config.fps, self.config.width, self.config.height);

        FilterGraphJob {
            label: format!("ken burns clip {} ({})", index + 1, motion),
            inputs: vec![MediaInput::File(source.path.clone())],
            filter_complex: format!("[0:v]{}[v]", zoompan),
            maps: vec!["[v]".to_string()],
            output_args: vec![
                "-t".to_string(),
                format!("{:.3}", duration),
                "-c:v".to_string(),
                "libx264".to_string(),
                "-pix_fmt".to_string(),
                "yuv420p".to_string(),
                "-r".to_string(),
                self.config.fps.to_string(),
            ],
            output: self.clips_dir.join(format!("clip_{:03}.mp4", index + 1)),
            timeout: None,
        }
    }

    fn crossfade_job(&self, plan: &CrossfadePlan, clips: &[PreparedClip], rung: TransitionRung, output: &Path) -> FilterGraphJob {
        let mut inputs: Vec<MediaInput> = clips.iter().map(|c| MediaInput::File(c.path.clone())).collect();

        let audio = match rung {
            TransitionRung::Crossfade if clips.iter().all(|c| c.has_audio) => AudioTrack::Crossfade,
            _ => {
                inputs.push(MediaInput::Silence {
                    duration: plan.total_duration,
                });
                AudioTrack::Silence { input: clips.len() }
            }
        };
        let topology = crossfade_topology(plan, &self.config, audio);

        FilterGraphJob {
            label: rung.to_string(),
            inputs,
            filter_complex: topology.filter_complex,
            maps: topology.maps,
            output_args: vec![
                "-c:v".to_string(),
                "libx264".to_string(),
                "-pix_fmt".to_string(),
                "yuv420p".to_string(),
                "-r".to_string(),
                self.config.fps.to_string(),
                "-c:a".to_string(),
                "aac".to_string(),
                "-t".to_string(),
                format!("{:.3}", plan.total_duration),
            ],
            output: output.to_path_buf(),
            timeout: None,
        }
    }

    /// Chain prepared clips into `output`, walking the fallback ladder
    pub async fn assemble(&self, clips: &[PreparedClip], output: &Path) -> Result<AssemblyOutcome, SyncError> {
        if clips.is_empty() {
            return Err(SyncError::Config("No clips to assemble".to_string()));
        }

        let durations: Vec<f64> = clips.iter().map(|c| c.duration).collect();
        let plan = CrossfadePlan::new(&durations, self.config.transition_duration);
        let mut failed_attempts = Vec::new();

        info!(
            "Assembling {} clips, {:.3}s with {:.3}s transitions",
            clips.len(),
            plan.total_duration,
            plan.transition
        );

        let rungs = if clips.iter().all(|c| c.has_audio) {
            vec![TransitionRung::Crossfade, TransitionRung::VideoOnlyCrossfade]
        } else {
            vec![TransitionRung::VideoOnlyCrossfade]
        };

        for rung in rungs {
            if self.cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            let job = self.crossfade_job(&plan, clips, rung, output);
            match self.encoder.run_filter_graph(&job).await {
                Ok(()) => {
                    info!("Clips assembled with {}", rung);
                    return Ok(AssemblyOutcome {
                        output: output.to_path_buf(),
                        rung,
                        plan,
                        failed_attempts,
                    });
                }
                Err(e) if e.is_cancelled() => return Err(SyncError::Cancelled),
                Err(e) => {
                    warn!("{} failed, falling back: {}", rung, e.summary());
                    failed_attempts.push(format!("{}: {}", rung, e));
                }
            }
        }

        if self.cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let manifest = self.clips_dir.join("clips_concat.txt");
        let paths: Vec<&Path> = clips.iter().map(|c| c.path.as_path()).collect();
        FileManager::write_to_file(&manifest, &concat_manifest(&paths)).map_err(|e| SyncError::Config(e.to_string()))?;

        match self.encoder.concat(&manifest, output, ConcatMode::StreamCopy).await {
            Ok(()) => {
                warn!("Clips assembled without transitions");
                Ok(AssemblyOutcome {
                    output: output.to_path_buf(),
                    rung: TransitionRung::PlainConcat,
                    plan,
                    failed_attempts,
                })
            }
            Err(e) if e.is_cancelled() => Err(SyncError::Cancelled),
            Err(e) => {
                failed_attempts.push(format!("{}: {}", TransitionRung::PlainConcat, e));
                Err(SyncError::Transition {
                    attempts: failed_attempts,
                })
            }
        }
    }
}

fn cancel_aware(error: EncoderError) -> SyncError {
    if error.is_cancelled() {
        SyncError::Cancelled
    } else {
        SyncError::Encoder(error)
    }
}
