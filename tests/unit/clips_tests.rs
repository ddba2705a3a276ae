/*!
 * Tests for crossfade offsets, clip slots and motion
 */

use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::sync::Arc;

use vosync::app_controller::SyncController;
use vosync::clips::{
    AssemblyManifest, ClipSource, CrossfadePlan, MotionType, clip_durations, configure_motion, crossfade_offsets,
    one_to_one_slots, random_motion,
};
use vosync::encoder::MockEncoder;

use crate::common;

fn clip(path: &str) -> ClipSource {
    ClipSource {
        path: PathBuf::from(path),
        kind: None,
        motion: None,
        has_audio: false,
    }
}

#[test]
fn test_crossfadeOffsets_tenEightSix_shouldBeNineAndSixteen() {
    let offsets = crossfade_offsets(&[10.0, 8.0, 6.0], 1.0);
    assert_eq!(offsets[1], 9.0);
    assert_eq!(offsets[2], 16.0);

    let plan = CrossfadePlan::new(&[10.0, 8.0, 6.0], 1.0);
    assert_eq!(plan.total_duration, 22.0);
    assert_eq!(plan.clip_count(), 3);
}

#[test]
fn test_oneToOneSlots_onRetimedEntries_shouldStartClipsAtEntryStarts() {
    let mut entries = vec![
        common::entry(1, 0.0, 2.0, "Halo dunia."),
        common::entry(2, 2.6, 5.1, "Ini contoh."),
        common::entry(3, 5.7, 7.0, "Selesai."),
    ];
    entries[0].start_time = 0.0;

    let slots = one_to_one_slots(&entries, 3);
    let durations = clip_durations(&slots, 0.5);
    let offsets = crossfade_offsets(&durations, 0.5);

    for (offset, entry) in offsets.iter().zip(&entries).skip(1) {
        common::assert_close(*offset, entry.start_time);
    }
    let plan = CrossfadePlan::new(&durations, 0.5);
    common::assert_close(plan.total_duration, 7.0);
}

#[test]
fn test_clipSlots_withVisualSubtitle_shouldAnchorAlignedEntries() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let visual = common::create_test_subtitle(
        temp_dir.path(),
        "visual.srt",
        "1
00:00:00,000 --> 00:00:01,000
Welcome to the lecture.

2
00:00:01,000 --> 00:00:02,000
A caption nobody spoke aloud.

3
00:00:02,000 --> 00:00:03,000
Let us begin, shall we?
",
    )?;
    let timeline = vec![
        common::entry(1, 0.0, 3.0, "Welcome to the lecture."),
        common::entry(2, 3.6, 6.0, "Today we talk about patience."),
        common::entry(3, 6.6, 9.0, "Let us begin, shall we?"),
    ];
    let manifest = AssemblyManifest {
        clips: vec![clip("a.png"), clip("b.png"), clip("c.png")],
        visual_subtitle: Some(visual),
    };
    let controller = SyncController::with_encoder(common::unpadded_config(), Arc::new(MockEncoder::new()));

    let slots = controller.clip_slots(&manifest, &timeline, 9.0)?;

    assert_eq!(slots.len(), 3);
    assert!(slots[0].anchored && !slots[1].anchored && slots[2].anchored);
    common::assert_close(slots[2].start, 6.6);
    // The unaligned caption takes the stretch between its neighbours
    common::assert_close(slots[1].start, 3.3);
    common::assert_close(slots[2].length, 2.4);
    Ok(())
}

#[test]
fn test_clipSlots_visualCountMismatch_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let visual = common::create_test_subtitle(temp_dir.path(), "visual.srt", common::TWO_ENTRY_SRT)?;
    let manifest = AssemblyManifest {
        clips: vec![clip("a.png")],
        visual_subtitle: Some(visual),
    };
    let controller = SyncController::with_encoder(common::unpadded_config(), Arc::new(MockEncoder::new()));

    let timeline = vec![common::entry(1, 0.0, 2.0, "Halo dunia.")];
    assert!(controller.clip_slots(&manifest, &timeline, 2.0).is_err());
    Ok(())
}

#[test]
fn test_motion_seededSelection_shouldBeReproducibleAndValid() {
    let mut rng = StdRng::seed_from_u64(42);
    let motions: Vec<MotionType> = (0..20).map(|_| random_motion(&mut rng)).collect();

    let mut again = StdRng::seed_from_u64(42);
    let repeated: Vec<MotionType> = (0..20).map(|_| random_motion(&mut again)).collect();
    assert_eq!(motions, repeated);

    for motion in MotionType::ALL {
        let params = configure_motion(motion);
        assert!(params.start_zoom >= 1.0 && params.end_zoom >= 1.0);
        assert!((0.0..=1.0).contains(&params.start_x) && (0.0..=1.0).contains(&params.end_y));
    }
}

#[test]
fn test_motionType_serde_shouldUseSnakeCase() {
    let json = serde_json::to_string(&MotionType::ZoomIn).unwrap();
    assert_eq!(json, "\"zoom_in\"");
    let parsed: MotionType = serde_json::from_str("\"pan_down\"").unwrap();
    assert_eq!(parsed, MotionType::PanDown);
}
