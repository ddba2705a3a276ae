/*!
 * External media encoder boundary.
 *
 * The synchronization engine never touches samples itself. It computes slice
 * boundaries, concatenation manifests and filter graphs and hands them to an
 * [`Encoder`]. Production runs use [`ffmpeg::FfmpegEncoder`]; tests use
 * [`mock::MockEncoder`], which returns deterministic durations.
 */

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::EncoderError;

pub mod ffmpeg;
pub mod mock;

pub use ffmpeg::FfmpegEncoder;
pub use mock::{EncoderCall, MockEncoder};

/// Cut `[start, start + duration)` of `input` into a lossless audio file
#[derive(Debug, Clone, PartialEq)]
pub struct SliceRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub start: f64,
    pub duration: f64,
}

/// How a concatenation manifest is turned into a single file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatMode {
    /// Copy streams as they are
    StreamCopy,
    /// Re-encode the audio once to the configured final codec
    AudioEncode,
}

/// One input of a filter graph job
#[derive(Debug, Clone, PartialEq)]
pub enum MediaInput {
    /// Plain media file
    File(PathBuf),
    /// Generated stereo silence of `duration` seconds
    Silence { duration: f64 },
}

/// A single filter-graph invocation
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGraphJob {
    /// Short name used in logs and fallback diagnostics
    pub label: String,
    pub inputs: Vec<MediaInput>,
    pub filter_complex: String,
    /// Output stream selectors, e.g. `[v]` or `2:a`
    pub maps: Vec<String>,
    /// Codec and container arguments placed before the output path
    pub output_args: Vec<String>,
    pub output: PathBuf,
    /// Overrides the encoder's default filter timeout
    pub timeout: Option<Duration>,
}

/// Operations the engine needs from a media encoder.
///
/// Every call is an independent, idempotent invocation that overwrites its output.
#[async_trait]
pub trait Encoder: Send + Sync + Debug {
    /// Cut a segment out of a source file
    async fn slice(&self, request: &SliceRequest) -> Result<(), EncoderError>;

    /// Join the files listed in a concat manifest
    async fn concat(&self, manifest: &Path, output: &Path, mode: ConcatMode) -> Result<(), EncoderError>;

    /// Measure the duration of a media file in seconds
    async fn probe_duration(&self, path: &Path) -> Result<f64, EncoderError>;

    /// Write a silent audio file of the given length
    async fn generate_silence(&self, duration: f64, output: &Path) -> Result<(), EncoderError>;

    /// Run a complex filter graph
    async fn run_filter_graph(&self, job: &FilterGraphJob) -> Result<(), EncoderError>;
}

/// Render a concat demuxer manifest for the given files, in order
pub fn concat_manifest<P: AsRef<Path>>(paths: &[P]) -> String {
    let mut manifest = String::new();
    for path in paths {
        let escaped = path.as_ref().to_string_lossy().replace('\'', "'\\''");
        manifest.push_str(&format!("file '{}'\n", escaped));
    }
    manifest
}

/// Read the file list back out of a concat manifest
pub fn parse_concat_manifest(manifest: &str) -> Vec<PathBuf> {
    manifest
        .lines()
        .filter_map(|line| line.trim().strip_prefix("file "))
        .map(|quoted| {
            let inner = quoted.trim().trim_start_matches('\'').trim_end_matches('\'');
            PathBuf::from(inner.replace("'\\''", "'"))
        })
        .collect()
}
