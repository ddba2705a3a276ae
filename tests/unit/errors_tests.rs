/*!
 * Tests for the error taxonomy
 */

use std::error::Error;
use vosync::errors::{AppError, EncoderError, SubtitleError, SyncError};

fn failed(stderr: &str) -> EncoderError {
    EncoderError::Failed {
        program: "ffmpeg".to_string(),
        status: Some(1),
        stderr: stderr.to_string(),
    }
}

#[test]
fn test_stitchError_shouldCarryEncoderDiagnosticUnmodified() {
    let raw = "ffmpeg version 6.0\n[concat @ 0x1] Impossible to open 'segment_002.wav'\n";
    let error = SyncError::Stitch(failed(raw));

    assert!(error.to_string().contains("Impossible to open 'segment_002.wav'"));
    let source = error.source().expect("stitch error should expose its cause");
    assert!(source.to_string().contains("ffmpeg version 6.0"));
}

#[test]
fn test_transitionError_shouldListEveryAttempt() {
    let error = SyncError::Transition {
        attempts: vec!["crossfade: a".to_string(), "plain concat: b".to_string()],
    };
    assert_eq!(error.to_string(), "Failed to render transitions: crossfade: a | plain concat: b");
}

#[test]
fn test_encoderError_isCancelled_shouldOnlyMatchCancellation() {
    assert!(EncoderError::Cancelled.is_cancelled());
    assert!(!failed("boom").is_cancelled());
    assert!(
        !EncoderError::Timeout {
            program: "ffmpeg".to_string(),
            secs: 5
        }
        .is_cancelled()
    );
}

#[test]
fn test_syncError_fromEncoderError_shouldWrap() {
    let error: SyncError = failed("Invalid data found when processing input").into();
    assert!(matches!(error, SyncError::Encoder(_)));
}

#[test]
fn test_appError_conversions_shouldPreserveMessages() {
    let from_subtitle: AppError = SubtitleError::Empty("talk.srt".to_string()).into();
    assert!(from_subtitle.to_string().contains("talk.srt"));

    let from_sync: AppError = SyncError::Cancelled.into();
    assert_eq!(from_sync.to_string(), "Sync error: Synchronization cancelled");

    let from_anyhow: AppError = anyhow::anyhow!("something odd").into();
    assert!(matches!(from_anyhow, AppError::Unknown(_)));
}
