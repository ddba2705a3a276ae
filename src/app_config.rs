use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Timeline synchronization settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// External encoder settings
    #[serde(default)]
    pub encoder: EncoderConfig,

    /// Working directory settings
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// All tuning knobs of the synchronization engine
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SyncConfig {
    /// Sentence expansion settings
    #[serde(default)]
    pub expander: ExpanderConfig,

    /// Slice padding settings
    #[serde(default)]
    pub padding: PaddingConfig,

    /// Pause rules and overlay reading times
    #[serde(default)]
    pub pauses: PauseConfig,

    /// Fuzzy alignment settings
    #[serde(default)]
    pub aligner: AlignerConfig,

    /// Voiceover slicing and validation settings
    #[serde(default)]
    pub slicer: SlicerConfig,

    /// Visual clip transition settings
    #[serde(default)]
    pub crossfade: CrossfadeConfig,
}

/// Sentence expander configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExpanderConfig {
    /// Sentences longer than this (seconds) are split into word chunks
    #[serde(default = "default_max_entry_duration")]
    pub max_entry_duration: f64,

    /// Target number of words per chunk
    #[serde(default = "default_chunk_words")]
    pub chunk_words: usize,

    /// Lower bound for any chunk duration (seconds)
    #[serde(default = "default_min_chunk_duration")]
    pub min_chunk_duration: f64,
}

impl Default for ExpanderConfig {
    fn default() -> Self {
        Self {
            max_entry_duration: default_max_entry_duration(),
            chunk_words: default_chunk_words(),
            min_chunk_duration: default_min_chunk_duration(),
        }
    }
}

/// Slice padding configuration
///
/// Lead-in padding is kept short so the previous entry's tail never bleeds in,
/// trail-off padding is longer so decaying syllables are not clipped.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaddingConfig {
    /// Maximum padding before an entry (seconds)
    #[serde(default = "default_padding_start_cap")]
    pub start_cap: f64,

    /// Maximum padding after an entry (seconds)
    #[serde(default = "default_padding_end_cap")]
    pub end_cap: f64,
}

impl Default for PaddingConfig {
    fn default() -> Self {
        Self {
            start_cap: default_padding_start_cap(),
            end_cap: default_padding_end_cap(),
        }
    }
}

/// Pause durations (seconds) inserted after entries
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PauseConfig {
    /// Pause after scripture or citation markers
    #[serde(default = "default_citation_pause")]
    pub citation: f64,

    /// Pause after a trailing question mark
    #[serde(default = "default_question_pause")]
    pub question: f64,

    /// Pause after a trailing ellipsis
    #[serde(default = "default_ellipsis_pause")]
    pub ellipsis: f64,

    /// Pause after a trailing period or exclamation mark
    #[serde(default = "default_period_pause")]
    pub period: f64,

    /// Pause after a trailing comma, semicolon or colon
    #[serde(default = "default_comma_pause")]
    pub comma: f64,

    /// Case-insensitive substrings marking scripture or citation entries
    #[serde(default = "default_citation_markers")]
    pub citation_markers: Vec<String>,

    /// Overlay minimum reading time model
    #[serde(default)]
    pub overlay: OverlayTimingConfig,
}

impl Default for PauseConfig {
    fn default() -> Self {
        Self {
            citation: default_citation_pause(),
            question: default_question_pause(),
            ellipsis: default_ellipsis_pause(),
            period: default_period_pause(),
            comma: default_comma_pause(),
            citation_markers: default_citation_markers(),
            overlay: OverlayTimingConfig::default(),
        }
    }
}

/// Minimum on-screen reading time for text overlays
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OverlayTimingConfig {
    /// Seconds added per overlay word
    #[serde(default = "default_seconds_per_word")]
    pub seconds_per_word: f64,

    /// Extra seconds when the overlay carries Arabic text
    #[serde(default = "default_arabic_bonus")]
    pub arabic_bonus: f64,

    /// Lower clamp for the reading time
    #[serde(default = "default_overlay_min")]
    pub min: f64,

    /// Upper clamp for the reading time
    #[serde(default = "default_overlay_max")]
    pub max: f64,
}

impl Default for OverlayTimingConfig {
    fn default() -> Self {
        Self {
            seconds_per_word: default_seconds_per_word(),
            arabic_bonus: default_arabic_bonus(),
            min: default_overlay_min(),
            max: default_overlay_max(),
        }
    }
}

/// Fuzzy aligner configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AlignerConfig {
    /// Minimum similarity for a sentence-level window (exclusive)
    #[serde(default = "default_sentence_threshold")]
    pub sentence_threshold: f32,

    /// Minimum similarity for a word-level match (inclusive)
    #[serde(default = "default_word_threshold")]
    pub word_threshold: f32,

    /// Largest number of consecutive source entries joined into one window
    #[serde(default = "default_max_window")]
    pub max_window: usize,

    /// How many cursor positions ahead a sentence window may start
    #[serde(default = "default_sentence_lookahead")]
    pub sentence_lookahead: usize,

    /// Source entries flattened for the word-level fallback
    #[serde(default = "default_word_lookahead")]
    pub word_lookahead: usize,

    /// Safety pad around word-level matches (seconds)
    #[serde(default = "default_word_pad")]
    pub word_pad: f64,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            sentence_threshold: default_sentence_threshold(),
            word_threshold: default_word_threshold(),
            max_window: default_max_window(),
            sentence_lookahead: default_sentence_lookahead(),
            word_lookahead: default_word_lookahead(),
            word_pad: default_word_pad(),
        }
    }
}

/// Voiceover slicing configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SlicerConfig {
    /// Drift above which a segment is invalid (milliseconds)
    #[serde(default = "default_drift_tolerance_ms")]
    pub drift_tolerance_ms: u64,

    /// Drift above which a segment is reported as severe (milliseconds)
    #[serde(default = "default_drift_ceiling_ms")]
    pub drift_ceiling_ms: u64,

    /// Explicit slice concurrency; derived from the host when unset
    #[serde(default)]
    pub concurrent_slices: Option<usize>,

    /// Cores left free when deriving the slice concurrency
    #[serde(default = "default_reserved_cores")]
    pub reserved_cores: usize,

    /// Replace missing segments with silence of their theoretical length
    #[serde(default = "default_true")]
    pub fill_missing_with_silence: bool,
}

impl Default for SlicerConfig {
    fn default() -> Self {
        Self {
            drift_tolerance_ms: default_drift_tolerance_ms(),
            drift_ceiling_ms: default_drift_ceiling_ms(),
            concurrent_slices: None,
            reserved_cores: default_reserved_cores(),
            fill_missing_with_silence: true,
        }
    }
}

impl SlicerConfig {
    /// Drift tolerance in seconds
    pub fn drift_tolerance(&self) -> f64 {
        self.drift_tolerance_ms as f64 / 1000.0
    }

    /// Drift ceiling in seconds
    pub fn drift_ceiling(&self) -> f64 {
        self.drift_ceiling_ms as f64 / 1000.0
    }
}

/// Crossfade configuration for the visual track
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CrossfadeConfig {
    /// Transition length (seconds)
    #[serde(default = "default_transition_duration")]
    pub transition_duration: f64,

    /// xfade transition name
    #[serde(default = "default_transition_name")]
    pub transition: String,

    /// Concurrent still-image render jobs
    #[serde(default = "default_render_workers")]
    pub render_workers: usize,

    /// Output frame rate
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Output width
    #[serde(default = "default_width")]
    pub width: u32,

    /// Output height
    #[serde(default = "default_height")]
    pub height: u32,
}

impl Default for CrossfadeConfig {
    fn default() -> Self {
        Self {
            transition_duration: default_transition_duration(),
            transition: default_transition_name(),
            render_workers: default_render_workers(),
            fps: default_fps(),
            width: default_width(),
            height: default_height(),
        }
    }
}

/// External encoder configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EncoderConfig {
    /// ffmpeg executable
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// ffprobe executable
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,

    /// Timeout for heavy filter-graph invocations (seconds)
    #[serde(default = "default_filter_timeout_secs")]
    pub filter_timeout_secs: u64,

    /// Audio sample rate of generated segments and silence
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Bitrate of the final stitched track
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            filter_timeout_secs: default_filter_timeout_secs(),
            sample_rate: default_sample_rate(),
            audio_bitrate: default_audio_bitrate(),
        }
    }
}

/// Working directory configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct WorkspaceConfig {
    /// Root for per-run working directories; the user cache dir when unset
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Show a progress bar while slicing
    #[serde(default)]
    pub show_progress: bool,
}

impl WorkspaceConfig {
    /// Resolve the root under which run directories are created
    pub fn resolve_root(&self) -> PathBuf {
        match &self.root {
            Some(root) => root.clone(),
            None => dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("vosync"),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_max_entry_duration() -> f64 {
    12.0
}

fn default_chunk_words() -> usize {
    15
}

fn default_min_chunk_duration() -> f64 {
    0.8
}

fn default_padding_start_cap() -> f64 {
    0.05
}

fn default_padding_end_cap() -> f64 {
    0.15
}

fn default_citation_pause() -> f64 {
    1.5
}

fn default_question_pause() -> f64 {
    0.8
}

fn default_ellipsis_pause() -> f64 {
    0.7
}

fn default_period_pause() -> f64 {
    0.6
}

fn default_comma_pause() -> f64 {
    0.3
}

fn default_citation_markers() -> Vec<String> {
    ["QS.", "Q.S.", "HR.", "H.R.", "(QS", "(HR"]
        .iter()
        .map(|m| m.to_string())
        .collect()
}

fn default_seconds_per_word() -> f64 {
    0.3
}

fn default_arabic_bonus() -> f64 {
    1.0
}

fn default_overlay_min() -> f64 {
    1.5
}

fn default_overlay_max() -> f64 {
    6.0
}

fn default_sentence_threshold() -> f32 {
    0.7
}

fn default_word_threshold() -> f32 {
    0.8
}

fn default_max_window() -> usize {
    4
}

fn default_sentence_lookahead() -> usize {
    3
}

fn default_word_lookahead() -> usize {
    10
}

fn default_word_pad() -> f64 {
    0.15
}

fn default_drift_tolerance_ms() -> u64 {
    100
}

fn default_drift_ceiling_ms() -> u64 {
    200
}

fn default_reserved_cores() -> usize {
    1
}

fn default_transition_duration() -> f64 {
    0.5
}

fn default_transition_name() -> String {
    "fade".to_string()
}

fn default_render_workers() -> usize {
    2
}

fn default_fps() -> u32 {
    30
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_filter_timeout_secs() -> u64 {
    600
}

fn default_sample_rate() -> u32 {
    44_100
}

fn default_audio_bitrate() -> String {
    "192k".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let sync = &self.sync;

        if sync.slicer.drift_tolerance_ms > sync.slicer.drift_ceiling_ms {
            return Err(anyhow!(
                "Drift tolerance ({}ms) must not exceed the drift ceiling ({}ms)",
                sync.slicer.drift_tolerance_ms,
                sync.slicer.drift_ceiling_ms
            ));
        }

        for (name, value) in [
            ("sentence_threshold", sync.aligner.sentence_threshold),
            ("word_threshold", sync.aligner.word_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("Aligner {} must be between 0.0 and 1.0, got {}", name, value));
            }
        }

        if sync.aligner.max_window == 0 {
            return Err(anyhow!("Aligner max_window must be at least 1"));
        }

        if sync.expander.chunk_words == 0 {
            return Err(anyhow!("Expander chunk_words must be at least 1"));
        }

        if sync.expander.max_entry_duration <= 0.0 {
            return Err(anyhow!("Expander max_entry_duration must be positive"));
        }

        if sync.padding.start_cap < 0.0 || sync.padding.end_cap < 0.0 {
            return Err(anyhow!("Padding caps must not be negative"));
        }

        let pauses = &sync.pauses;
        if [pauses.citation, pauses.question, pauses.ellipsis, pauses.period, pauses.comma]
            .iter()
            .any(|p| *p < 0.0)
        {
            return Err(anyhow!("Pause durations must not be negative"));
        }

        if pauses.overlay.min > pauses.overlay.max {
            return Err(anyhow!(
                "Overlay reading time min ({}) exceeds max ({})",
                pauses.overlay.min,
                pauses.overlay.max
            ));
        }

        if sync.crossfade.transition_duration < 0.0 {
            return Err(anyhow!("Transition duration must not be negative"));
        }

        if sync.crossfade.render_workers == 0 {
            return Err(anyhow!("At least one render worker is required"));
        }

        if self.encoder.ffmpeg_path.trim().is_empty() || self.encoder.ffprobe_path.trim().is_empty() {
            return Err(anyhow!("Encoder executable paths must not be empty"));
        }

        Ok(())
    }
}
