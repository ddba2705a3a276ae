/*!
 * Integration tests for the synchronization workflow, run against the mock encoder
 */

use anyhow::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use vosync::app_config::Config;
use vosync::app_controller::{SyncController, SyncRequest};
use vosync::encoder::{ConcatMode, EncoderCall, MockEncoder, parse_concat_manifest};
use vosync::errors::SyncError;
use vosync::file_utils::FileManager;
use vosync::subtitle_processor::{OverlayType, SubtitleCollection, TextOverlay};

use crate::common;

struct Fixture {
    _temp_dir: tempfile::TempDir,
    subtitle: PathBuf,
    audio: PathBuf,
    work_dir: PathBuf,
}

fn fixture(srt: &str) -> Result<Fixture> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let subtitle = common::create_test_subtitle(temp_dir.path(), "talk.srt", srt)?;
    let audio = common::create_test_audio(temp_dir.path(), "talk.wav")?;
    let work_dir = temp_dir.path().join("run");
    Ok(Fixture {
        _temp_dir: temp_dir,
        subtitle,
        audio,
        work_dir,
    })
}

fn controller(config: Config, encoder: &MockEncoder) -> SyncController {
    SyncController::with_encoder(config, Arc::new(encoder.clone()))
}

fn request(f: &Fixture) -> SyncRequest {
    SyncRequest::new(&f.subtitle, &f.audio).with_work_dir(&f.work_dir)
}

fn concat_inputs(encoder: &MockEncoder) -> Vec<PathBuf> {
    let manifest = encoder
        .calls()
        .into_iter()
        .find_map(|call| match call {
            EncoderCall::Concat { manifest, .. } => Some(manifest),
            _ => None,
        })
        .expect("a concat call");
    parse_concat_manifest(&std::fs::read_to_string(manifest).unwrap())
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect()
}

#[tokio::test]
async fn test_sync_twoEntries_withoutPadding_shouldRetimeSecondEntryTo2_6() -> Result<()> {
    let f = fixture(common::TWO_ENTRY_SRT)?;
    let encoder = MockEncoder::new().with_duration(&f.audio, 6.0);

    let outcome = controller(common::unpadded_config(), &encoder).run(request(&f)).await?;

    common::assert_close(outcome.entries[0].start_time, 0.0);
    common::assert_close(outcome.entries[1].start_time, 2.6);
    common::assert_close(outcome.entries[1].end_time, 5.1);
    common::assert_close(outcome.timeline_duration, 5.1);
    common::assert_close(outcome.pauses.after(1).unwrap_or_default(), 0.6);

    // The stitched track and the retimed subtitle agree
    assert_eq!(outcome.report.ok, 2);
    assert!(outcome.report.is_clean());
    common::assert_close(outcome.report.measured_duration.unwrap_or_default(), 5.1);

    let written = SubtitleCollection::read_from_file(&outcome.expanded_subtitle)?;
    common::assert_close(written.entries[1].start_time, 2.6);

    assert_eq!(
        file_names(&concat_inputs(&encoder)),
        vec!["segment_001.wav", "silence_0.600s.wav", "segment_002.wav"]
    );
    assert!(FileManager::file_exists(&outcome.stitched_voiceover));
    assert!(FileManager::file_exists(outcome.work_dir.join("sync_report.json")));
    Ok(())
}

#[tokio::test]
async fn test_sync_withDefaultPadding_shouldSliceWiderAndShiftByPadding() -> Result<()> {
    let f = fixture(common::TWO_ENTRY_SRT)?;
    let encoder = MockEncoder::new().with_duration(&f.audio, 6.0);
    let mut config = Config::default();
    config.workspace.show_progress = false;

    let outcome = controller(config, &encoder).run(request(&f)).await?;

    // 2.0s + 0.15s trailing padding, then the 0.6s period pause
    common::assert_close(outcome.entries[1].start_time, 2.75);
    let slices: Vec<(f64, f64)> = encoder
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            EncoderCall::Slice(request) => Some((request.start, request.duration)),
            _ => None,
        })
        .collect();
    assert_eq!(slices.len(), 2);
    assert!(slices.iter().any(|(start, duration)| (start - 2.45).abs() < 1e-6 && (duration - 2.7).abs() < 1e-6));
    Ok(())
}

#[tokio::test]
async fn test_sync_driftedSegment_shouldBeExcludedAndFilledWithSilence() -> Result<()> {
    let f = fixture(common::TWO_ENTRY_SRT)?;
    let encoder = MockEncoder::new()
        .with_duration(&f.audio, 6.0)
        .with_slice_drift("segment_002", 0.15);

    let outcome = controller(common::unpadded_config(), &encoder).run(request(&f)).await?;

    assert_eq!(outcome.report.drifted, 1);
    assert_eq!(outcome.report.filled_entries, vec![2]);
    assert!(!outcome.report.is_clean());
    // The drifted cut is not trusted for retiming
    common::assert_close(outcome.entries[1].end_time, 5.1);
    assert_eq!(
        file_names(&concat_inputs(&encoder)),
        vec!["segment_001.wav", "silence_0.600s.wav", "silence_2.500s.wav"]
    );
    Ok(())
}

#[tokio::test]
async fn test_sync_severeDrift_shouldBeReportedSeparately() -> Result<()> {
    let f = fixture(common::TWO_ENTRY_SRT)?;
    let encoder = MockEncoder::new()
        .with_duration(&f.audio, 6.0)
        .with_slice_drift("segment_001", -0.3);

    let outcome = controller(common::unpadded_config(), &encoder).run(request(&f)).await?;

    assert_eq!(outcome.report.severe, 1);
    assert_eq!(outcome.report.ok, 1);
    assert!(outcome.report.max_drift > 0.2);
    Ok(())
}

#[tokio::test]
async fn test_sync_failedSlice_shouldNotAbortTheRun() -> Result<()> {
    let f = fixture(common::TWO_ENTRY_SRT)?;
    let encoder = MockEncoder::new()
        .with_duration(&f.audio, 6.0)
        .with_failing_output("segment_001");

    let outcome = controller(common::unpadded_config(), &encoder).run(request(&f)).await?;

    assert_eq!(outcome.report.failed, 1);
    assert_eq!(outcome.report.filled_entries, vec![1]);
    common::assert_close(outcome.entries[1].start_time, 2.6);
    Ok(())
}

#[tokio::test]
async fn test_sync_failedSliceWithoutFill_shouldKeepSubtitleOnStitchedClock() -> Result<()> {
    let f = fixture(common::TWO_ENTRY_SRT)?;
    let encoder = MockEncoder::new()
        .with_duration(&f.audio, 6.0)
        .with_failing_output("segment_001");
    let mut config = common::unpadded_config();
    config.sync.slicer.fill_missing_with_silence = false;

    let outcome = controller(config, &encoder).run(request(&f)).await?;

    assert!(outcome.report.filled_entries.is_empty());
    assert_eq!(
        file_names(&concat_inputs(&encoder)),
        vec!["silence_0.600s.wav", "segment_002.wav"]
    );
    // The dropped entry takes no time, only its pause remains
    common::assert_close(outcome.entries[0].duration(), 0.0);
    common::assert_close(outcome.entries[1].start_time, 0.6);
    common::assert_close(outcome.timeline_duration, 3.1);
    common::assert_close(outcome.report.measured_duration.unwrap_or_default(), outcome.timeline_duration);
    Ok(())
}

#[tokio::test]
async fn test_sync_subMillisecondHint_shouldKeepSubtitleAndAudioOnSameGrid() -> Result<()> {
    let f = fixture(common::TWO_ENTRY_SRT)?;
    let encoder = MockEncoder::new().with_duration(&f.audio, 6.0);
    let hints: HashMap<usize, f64> = [(1, 2.0004)].into_iter().collect();

    let outcome = controller(common::unpadded_config(), &encoder)
        .run(request(&f).with_hints(hints))
        .await?;

    assert_eq!(outcome.pauses.after(1), Some(2.0));
    assert!(file_names(&concat_inputs(&encoder)).contains(&"silence_2.000s.wav".to_string()));
    common::assert_close(outcome.entries[1].start_time, 4.0);
    common::assert_close(outcome.report.measured_duration.unwrap_or_default(), outcome.timeline_duration);
    Ok(())
}

#[tokio::test]
async fn test_sync_failedConcat_shouldSurfaceStitchErrorWithDiagnostic() -> Result<()> {
    let f = fixture(common::TWO_ENTRY_SRT)?;
    let encoder = MockEncoder::new().with_duration(&f.audio, 6.0).with_failing_concat();

    let error = controller(common::unpadded_config(), &encoder)
        .run(request(&f))
        .await
        .expect_err("stitching must fail");

    match error.downcast_ref::<SyncError>() {
        Some(SyncError::Stitch(inner)) => assert!(inner.to_string().contains("complex filters")),
        other => panic!("expected a stitch error, got {:?}", other),
    }
    assert!(!f.work_dir.join("stitched_vo.mp3").exists());
    Ok(())
}

#[tokio::test]
async fn test_sync_cancelledBeforeStart_shouldReturnCancelledWithoutCuts() -> Result<()> {
    let f = fixture(common::TWO_ENTRY_SRT)?;
    let encoder = MockEncoder::new().with_duration(&f.audio, 6.0);
    let controller = controller(common::unpadded_config(), &encoder);
    controller.cancellation_token().cancel();

    let error = controller.run(request(&f)).await.expect_err("run must be cancelled");

    assert!(matches!(error.downcast_ref::<SyncError>(), Some(SyncError::Cancelled)));
    assert!(encoder.calls().iter().all(|call| !matches!(call, EncoderCall::Slice(_))));
    assert!(!f.work_dir.join("stitched_vo.mp3").exists());
    Ok(())
}

#[tokio::test]
async fn test_sync_cancelledWithUnremovableOutput_shouldStillReportCancelled() -> Result<()> {
    let f = fixture(common::TWO_ENTRY_SRT)?;
    // A directory where the stitched track goes cannot be removed as a file
    let blocker = f.work_dir.join("stitched_vo.mp3");
    std::fs::create_dir_all(&blocker)?;
    let encoder = MockEncoder::new().with_duration(&f.audio, 6.0);
    let controller = controller(common::unpadded_config(), &encoder);
    controller.cancellation_token().cancel();

    let error = controller.run(request(&f)).await.expect_err("run must be cancelled");

    assert!(matches!(error.downcast_ref::<SyncError>(), Some(SyncError::Cancelled)));
    assert!(blocker.is_dir());
    Ok(())
}

#[tokio::test]
async fn test_sync_hintsAndOverlays_shouldLengthenPausesAndWriteMarkers() -> Result<()> {
    let f = fixture(common::TWO_ENTRY_SRT)?;
    let encoder = MockEncoder::new().with_duration(&f.audio, 6.0);
    let hints: HashMap<usize, f64> = [(1, 2.0)].into_iter().collect();
    let overlays = [(
        1,
        TextOverlay {
            overlay_type: OverlayType::Quote,
            text: Some("Sabar itu indah".to_string()),
            reference: None,
            arabic: None,
        },
    )]
    .into_iter()
    .collect();

    let outcome = controller(common::unpadded_config(), &encoder)
        .run(request(&f).with_hints(hints).with_overlays(overlays))
        .await?;

    common::assert_close(outcome.entries[1].start_time, 4.0);
    let written = FileManager::read_to_string(&outcome.expanded_subtitle)?;
    assert!(written.contains("00:00:02,000 --> 00:00:04,000\n[OVERLAY:Quote]"));
    Ok(())
}

#[tokio::test]
async fn test_sync_withScript_shouldRemapHintsOntoExpandedEntries() -> Result<()> {
    let f = fixture(common::LECTURE_SRT)?;
    let script = common::create_test_subtitle(f.work_dir.parent().unwrap(), "script.srt", common::LECTURE_SRT)?;
    let encoder = MockEncoder::new().with_duration(&f.audio, 20.0);
    // Keyed by the script's second entry, which the expander split in two
    let hints: HashMap<usize, f64> = [(2, 3.0)].into_iter().collect();

    let outcome = controller(common::unpadded_config(), &encoder)
        .run(request(&f).with_script(&script).with_hints(hints))
        .await?;

    assert_eq!(outcome.entries.len(), 4);
    assert_eq!(outcome.stats.sentence_count, 2);
    // Lands after the last sentence of the split entry, above its citation pause
    common::assert_close(outcome.pauses.after(3).unwrap_or_default(), 3.0);
    common::assert_close(outcome.entries[3].start_time - outcome.entries[2].end_time, 3.0);
    Ok(())
}

#[tokio::test]
async fn test_sync_rerunInSameWorkDir_shouldBeIdempotent() -> Result<()> {
    let f = fixture(common::TWO_ENTRY_SRT)?;
    let encoder = MockEncoder::new().with_duration(&f.audio, 6.0);
    let controller = controller(common::unpadded_config(), &encoder);

    let first = controller.run(request(&f)).await?;
    let second = controller.run(request(&f)).await?;

    assert_eq!(first.entries, second.entries);
    let wavs = FileManager::find_files(f.work_dir.join("vo_segments"), "wav")?;
    assert_eq!(file_names(&wavs), vec!["segment_001.wav", "segment_002.wav", "silence_0.600s.wav"]);
    Ok(())
}

#[test]
fn test_sync_missingAudio_shouldFailBeforeAnyEncoderCall() -> Result<()> {
    let f = fixture(common::TWO_ENTRY_SRT)?;
    let encoder = MockEncoder::new();
    let request = SyncRequest::new(&f.subtitle, Path::new("/definitely/not/here.wav"));

    let result = tokio_test::block_on(async { controller(common::unpadded_config(), &encoder).run(request).await });

    let error = result.expect_err("missing audio must fail");
    assert!(error.to_string().contains("Voiceover audio"));
    assert!(encoder.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_sync_stitchedManifest_shouldUseSingleAudioEncodePass() -> Result<()> {
    let f = fixture(common::LECTURE_SRT)?;
    let encoder = MockEncoder::new().with_duration(&f.audio, 20.0);

    controller(common::unpadded_config(), &encoder).run(request(&f)).await?;

    let concats: Vec<ConcatMode> = encoder
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            EncoderCall::Concat { mode, .. } => Some(mode),
            _ => None,
        })
        .collect();
    assert_eq!(concats, vec![ConcatMode::AudioEncode]);
    // Head silence of one second comes first
    let inputs = file_names(&concat_inputs(&encoder));
    assert_eq!(inputs[0], "silence_1.000s.wav");
    Ok(())
}
