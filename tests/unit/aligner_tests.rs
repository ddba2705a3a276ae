/*!
 * Tests for fuzzy alignment and hint remapping
 */

use anyhow::Result;
use std::collections::HashMap;

use vosync::app_config::{AlignerConfig, ExpanderConfig};
use vosync::subtitle_processor::SubtitleCollection;
use vosync::timeline::pauses::remap_by_alignment;
use vosync::timeline::{FuzzyAligner, MatchMethod, SentenceExpander, TextMatcher};

use crate::common;

fn aligner() -> FuzzyAligner {
    FuzzyAligner::new(AlignerConfig::default())
}

#[test]
fn test_textMatcher_shouldIgnoreCaseAndPunctuation() {
    let matcher = TextMatcher;
    assert_eq!(matcher.similarity("Halo, dunia!", "halo dunia"), 1.0);
    assert!(matcher.matches("Welcom to the lectur", "Welcome to the lecture.", 0.8));
    assert!(!matcher.matches("Completely different", "Welcome to the lecture.", 0.7));
}

#[test]
fn test_align_scriptAgainstExpandedTimeline_shouldCoverSplitSentences() -> Result<()> {
    let script = SubtitleCollection::parse_srt_string(common::LECTURE_SRT)?;
    let expanded = SentenceExpander::new(ExpanderConfig::default()).expand(&script);

    let alignments = aligner().align(&script, &expanded);

    assert_eq!(alignments.len(), 3);
    assert!(alignments.iter().all(|a| a.is_aligned()));
    let second = alignments[1].window.as_ref().unwrap();
    assert_eq!(second.method, MatchMethod::Sentence);
    assert_eq!((second.first_source_seq, second.last_source_seq), (2, 3));
    assert_eq!(alignments[2].window.as_ref().unwrap().first_source_seq, 4);
    Ok(())
}

#[test]
fn test_align_withTranscriptionErrors_shouldStillMatch() {
    let source = vec![
        common::entry(1, 0.0, 2.0, "Welcome to the lecture."),
        common::entry(2, 2.5, 5.0, "Today we talk about patience."),
    ];
    let target = vec![
        common::entry(1, 0.0, 0.0, "Welcom to the lectur"),
        common::entry(2, 0.0, 0.0, "today we talk about patients"),
    ];

    let alignments = aligner().align(&target, &source);

    assert_eq!(alignments[0].time_range(), Some((0.0, 2.0)));
    assert_eq!(alignments[1].time_range(), Some((2.5, 5.0)));
    assert!(alignments[1].window.as_ref().unwrap().score < 1.0);
}

#[test]
fn test_remapByAlignment_shouldMoveHintsToLastSourceEntryAndDropUnaligned() -> Result<()> {
    let script = SubtitleCollection::parse_srt_string(common::LECTURE_SRT)?;
    let expanded = SentenceExpander::new(ExpanderConfig::default()).expand(&script);
    let mut alignments = aligner().align(&script, &expanded);
    // Pretend the last script entry could not be placed
    alignments[2].window = None;

    let hints: HashMap<usize, f64> = [(2, 2.0), (3, 1.0)].into_iter().collect();
    let remapped = remap_by_alignment(&hints, &alignments);

    assert_eq!(remapped.len(), 1);
    assert_eq!(remapped.get(&3), Some(&2.0));
    Ok(())
}

#[test]
fn test_align_emptyTarget_shouldReturnNothing() {
    let source = vec![common::entry(1, 0.0, 1.0, "Halo.")];
    assert!(aligner().align(&[], &source).is_empty());
}
