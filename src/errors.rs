/*!
 * Error types for the vosync library.
 *
 * This module contains custom error types for the different stages of a
 * synchronization run, using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when invoking the external encoder
#[derive(Error, Debug, Clone)]
pub enum EncoderError {
    /// The encoder process could not be started at all
    #[error("Failed to start {program}: {message}")]
    Spawn {
        /// Program that was invoked
        program: String,
        /// OS level error message
        message: String,
    },

    /// The encoder ran and reported a failure
    #[error("{program} exited with status {status:?}: {stderr}")]
    Failed {
        /// Program that was invoked
        program: String,
        /// Exit status code, if the process was not killed by a signal
        status: Option<i32>,
        /// Diagnostic text exactly as the process printed it
        stderr: String,
    },

    /// The encoder did not finish within the allotted time
    #[error("{program} timed out after {secs} seconds")]
    Timeout {
        /// Program that was invoked
        program: String,
        /// Timeout that elapsed
        secs: u64,
    },

    /// The run was cancelled before the invocation was issued
    #[error("Encoder invocation cancelled")]
    Cancelled,

    /// The encoder output could not be interpreted
    #[error("Failed to probe {path:?}: {message}")]
    Probe {
        /// File that was probed
        path: PathBuf,
        /// Reason the probe result was unusable
        message: String,
    },
}

impl EncoderError {
    /// Short, log-friendly diagnostic with the ffmpeg banner noise stripped.
    ///
    /// The stored `stderr` is never modified; this is only for log lines.
    pub fn summary(&self) -> String {
        match self {
            EncoderError::Failed { program, status, stderr } => {
                format!("{} exited with status {:?}: {}", program, status, filter_encoder_stderr(stderr))
            }
            other => other.to_string(),
        }
    }

    /// Whether this error is a cancellation rather than a genuine failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EncoderError::Cancelled)
    }
}

/// Filter encoder stderr to only show meaningful error lines, stripping the
/// version banner, build configuration, and stream metadata noise.
pub fn filter_encoder_stderr(stderr: &str) -> String {
    let noise_prefixes = [
        "ffmpeg version",
        "ffprobe version",
        "  built with",
        "  configuration:",
        "  lib",
        "Input #",
        "  Metadata:",
        "  Duration:",
        "  Stream #",
        "      Metadata:",
        "Output #",
        "Stream mapping:",
        "Press [q]",
        "size=",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .filter(|line| {
            if line.trim().is_empty() {
                return false;
            }
            !noise_prefixes.iter().any(|p| line.starts_with(p))
        })
        .collect();

    if meaningful.is_empty() {
        "unknown encoder error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}

/// Errors that can occur while reading subtitle content
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// No block in the input produced a usable entry
    #[error("No valid subtitle entries were found in {0}")]
    Empty(String),

    /// The subtitle file could not be read or written
    #[error("Subtitle file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that abort a synchronization run
#[derive(Error, Debug)]
pub enum SyncError {
    /// The final concatenated voiceover could not be produced
    #[error("Failed to stitch voiceover: {0}")]
    Stitch(#[source] EncoderError),

    /// Every rung of the transition fallback ladder failed
    #[error("Failed to render transitions: {}", .attempts.join(" | "))]
    Transition {
        /// Diagnostic of each attempt, in ladder order
        attempts: Vec<String>,
    },

    /// The run was cancelled by the caller
    #[error("Synchronization cancelled")]
    Cancelled,

    /// The configuration or inputs make the run impossible
    #[error("Invalid synchronization input: {0}")]
    Config(String),

    /// Error from the encoder outside the stitch/transition stages
    #[error("Encoder error: {0}")]
    Encoder(#[from] EncoderError),

    /// Error with subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Working directory error
    #[error("Working directory error: {0}")]
    Io(#[from] std::io::Error),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from a synchronization run
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
