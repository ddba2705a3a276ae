/*!
 * Integration tests for clip assembly and the transition fallback ladder
 */

use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use vosync::app_config::CrossfadeConfig;
use vosync::app_controller::SyncController;
use vosync::clips::{AssemblyManifest, ClipAssembler, ClipSource, PreparedClip, TransitionRung};
use vosync::encoder::{ConcatMode, EncoderCall, MediaInput, MockEncoder};
use vosync::errors::SyncError;

use crate::common;

fn video_clips(dir: &Path, has_audio: bool) -> Vec<PreparedClip> {
    [10.0, 8.0, 6.0]
        .iter()
        .enumerate()
        .map(|(i, duration)| PreparedClip {
            path: dir.join(format!("clip_{}.mp4", i + 1)),
            has_audio,
            duration: *duration,
        })
        .collect()
}

/// Mock that knows the clip durations, so a plain concat can be measured
fn encoder_for(clips: &[PreparedClip]) -> MockEncoder {
    clips
        .iter()
        .fold(MockEncoder::new(), |encoder, clip| encoder.with_duration(&clip.path, clip.duration))
}

fn assembler(encoder: &MockEncoder, dir: &Path) -> ClipAssembler {
    let config = CrossfadeConfig {
        transition_duration: 1.0,
        ..CrossfadeConfig::default()
    };
    ClipAssembler::new(Arc::new(encoder.clone()), config, 2, dir.join("clips"))
}

fn filter_jobs(encoder: &MockEncoder) -> Vec<vosync::encoder::FilterGraphJob> {
    encoder
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            EncoderCall::FilterGraph(job) => Some(job),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_assemble_clipsWithAudio_shouldCrossfadeBothTracks() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let clips = video_clips(temp_dir.path(), true);
    let encoder = encoder_for(&clips);
    let output = temp_dir.path().join("final.mp4");

    let outcome = assembler(&encoder, temp_dir.path()).assemble(&clips, &output).await?;

    assert_eq!(outcome.rung, TransitionRung::Crossfade);
    assert!(outcome.failed_attempts.is_empty());
    assert_eq!(outcome.plan.offsets, vec![0.0, 9.0, 16.0]);
    assert_eq!(outcome.plan.total_duration, 22.0);

    let jobs = filter_jobs(&encoder);
    assert_eq!(jobs.len(), 1);
    assert!(jobs[0].filter_complex.contains("xfade=transition=fade:duration=1.000:offset=9.000"));
    assert!(jobs[0].filter_complex.contains("acrossfade"));
    assert_eq!(jobs[0].inputs.len(), 3);
    assert!(output.exists());
    Ok(())
}

#[tokio::test]
async fn test_assemble_crossfadeRejected_shouldFallBackToVideoOnlyOverSilence() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let clips = video_clips(temp_dir.path(), true);
    let encoder = encoder_for(&clips).with_failing_filter_graphs(1);
    let output = temp_dir.path().join("final.mp4");

    let outcome = assembler(&encoder, temp_dir.path()).assemble(&clips, &output).await?;

    assert_eq!(outcome.rung, TransitionRung::VideoOnlyCrossfade);
    assert_eq!(outcome.failed_attempts.len(), 1);
    assert!(outcome.failed_attempts[0].contains("unconnected output"));

    let jobs = filter_jobs(&encoder);
    let fallback = jobs.last().unwrap();
    assert!(!fallback.filter_complex.contains("acrossfade"));
    assert_eq!(fallback.inputs.last(), Some(&MediaInput::Silence { duration: 22.0 }));
    assert_eq!(fallback.maps, vec!["[vout]".to_string(), "3:a".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_assemble_bothCrossfadesRejected_shouldConcatWithoutTransitions() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let clips = video_clips(temp_dir.path(), true);
    let encoder = encoder_for(&clips).with_failing_filter_graphs(2);
    let output = temp_dir.path().join("final.mp4");

    let outcome = assembler(&encoder, temp_dir.path()).assemble(&clips, &output).await?;

    assert_eq!(outcome.rung, TransitionRung::PlainConcat);
    assert_eq!(outcome.failed_attempts.len(), 2);
    assert_eq!(encoder.filter_attempts(), 2);
    assert!(encoder.calls().iter().any(|call| matches!(
        call,
        EncoderCall::Concat { mode: ConcatMode::StreamCopy, .. }
    )));
    assert_eq!(encoder.duration_of(&output), Some(24.0));
    Ok(())
}

#[tokio::test]
async fn test_assemble_everyRungRejected_shouldReportAllAttempts() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let clips = video_clips(temp_dir.path(), true);
    let encoder = encoder_for(&clips).with_failing_filter_graphs(2).with_failing_concat();
    let output = temp_dir.path().join("final.mp4");

    let error = assembler(&encoder, temp_dir.path())
        .assemble(&clips, &output)
        .await
        .expect_err("every rung fails");

    match error {
        SyncError::Transition { attempts } => {
            assert_eq!(attempts.len(), 3);
            assert!(attempts[2].starts_with("plain concat"));
        }
        other => panic!("expected a transition error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_assemble_clipsWithoutAudio_shouldStartAtVideoOnlyRung() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let clips = video_clips(temp_dir.path(), false);
    let encoder = encoder_for(&clips);
    let output = temp_dir.path().join("final.mp4");

    let outcome = assembler(&encoder, temp_dir.path()).assemble(&clips, &output).await?;

    assert_eq!(outcome.rung, TransitionRung::VideoOnlyCrossfade);
    let jobs = filter_jobs(&encoder);
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].label, "video-only crossfade");
    Ok(())
}

#[tokio::test]
async fn test_assemble_cancelled_shouldNotInvokeEncoder() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let clips = video_clips(temp_dir.path(), true);
    let encoder = encoder_for(&clips);
    let token = tokio_util::sync::CancellationToken::new();
    token.cancel();

    let result = assembler(&encoder, temp_dir.path())
        .with_cancellation(token)
        .assemble(&clips, &temp_dir.path().join("final.mp4"))
        .await;

    assert!(matches!(result, Err(SyncError::Cancelled)));
    assert!(encoder.calls().is_empty());
    Ok(())
}

fn still(path: &str) -> ClipSource {
    ClipSource {
        path: PathBuf::from(path),
        kind: None,
        motion: None,
        has_audio: false,
    }
}

async fn assemble_stills(temp_dir: &Path, seed: u64) -> Result<(MockEncoder, vosync::clips::AssemblyOutcome)> {
    let timeline = common::create_test_subtitle(
        temp_dir,
        "expanded.srt",
        "1
00:00:00,000 --> 00:00:02,000
Halo dunia.

2
00:00:02,600 --> 00:00:05,100
Ini contoh.
",
    )?;
    let manifest = AssemblyManifest {
        clips: vec![still("a.png"), still("b.jpg")],
        visual_subtitle: None,
    };
    let encoder = MockEncoder::new();
    let controller = SyncController::with_encoder(common::unpadded_config(), Arc::new(encoder.clone()));
    let mut rng = StdRng::seed_from_u64(seed);

    let outcome = controller
        .assemble(&manifest, &timeline, &temp_dir.join("final.mp4"), &mut rng)
        .await?;
    Ok((encoder, outcome))
}

#[tokio::test]
async fn test_controllerAssemble_stillsOnRetimedTimeline_shouldLineUpWithEntries() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;

    let (encoder, outcome) = assemble_stills(temp_dir.path(), 7).await?;

    // Second clip fades in exactly where the second entry starts
    common::assert_close(outcome.plan.offsets[1], 2.6);
    common::assert_close(outcome.plan.total_duration, 5.1);
    assert_eq!(outcome.rung, TransitionRung::VideoOnlyCrossfade);

    let jobs = filter_jobs(&encoder);
    assert_eq!(jobs.len(), 3);
    assert!(jobs[..2].iter().all(|job| job.filter_complex.contains("zoompan")));
    assert!(temp_dir.path().join("final_clips").join("clip_001.mp4").exists());
    Ok(())
}

#[tokio::test]
async fn test_controllerAssemble_sameSeed_shouldPickSameMotions() -> Result<()> {
    let first_dir = common::create_temp_dir()?;
    let second_dir = common::create_temp_dir()?;

    let (first, _) = assemble_stills(first_dir.path(), 99).await?;
    let (second, _) = assemble_stills(second_dir.path(), 99).await?;

    let labels = |encoder: &MockEncoder| -> Vec<String> {
        let mut labels: Vec<String> = filter_jobs(encoder).into_iter().map(|job| job.label).collect();
        labels.sort();
        labels
    };
    assert_eq!(labels(&first), labels(&second));
    Ok(())
}
