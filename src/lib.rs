/*!
 * # vosync - voiceover / subtitle / clip timeline synchronization
 *
 * A Rust library that turns a loosely timed subtitle file and a recorded
 * voiceover into a contiguous, gap-explicit timeline that subtitles, narration
 * and visual clips can share.
 *
 * ## Features
 *
 * - Parse and write SRT subtitles, including overlay marker blocks
 * - Split long entries into sentences and word chunks with proportional timing
 * - Compute punctuation pauses merged with external hints and overlay reading time
 * - Fuzzy-align independently segmented texts (sentence pass, word fallback)
 * - Slice the voiceover per entry, validate drift and stitch with explicit silences
 * - Retime entries from measured segment durations
 * - Place visual clips on the timeline and chain them with crossfades
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: Subtitle records and the SRT codec
 * - `timeline`: Pure timeline computation:
 *   - `timeline::expander`: Sentence and chunk expansion
 *   - `timeline::padding`: Slice padding
 *   - `timeline::pauses`: Pause rules, hints and overlay minimums
 *   - `timeline::aligner`: Fuzzy text alignment
 *   - `timeline::retimer`: Cumulative retiming
 * - `voiceover`: Slicing, stitching and drift validation
 * - `clips`: Clip slots, Ken Burns motion and crossfade assembly
 * - `encoder`: External encoder boundary (ffmpeg and a deterministic mock)
 * - `concurrency`: Host-derived worker limits
 * - `file_utils`: File system operations and the run directory layout
 * - `app_controller`: Synchronization run orchestration
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod clips;
pub mod concurrency;
pub mod encoder;
pub mod errors;
pub mod file_utils;
pub mod subtitle_processor;
pub mod timeline;
pub mod voiceover;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{SyncController, SyncOutcome, SyncRequest};
pub use encoder::{Encoder, FfmpegEncoder, MockEncoder};
pub use errors::{AppError, EncoderError, SubtitleError, SyncError};
pub use subtitle_processor::{SubtitleCollection, SubtitleEntry};
