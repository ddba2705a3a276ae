/*!
 * Tests for expansion, padding, pauses and retiming
 */

use anyhow::Result;
use std::collections::HashMap;

use vosync::app_config::{Config, ExpanderConfig, PaddingConfig, PauseConfig};
use vosync::subtitle_processor::{EntryOrigin, OverlayType, SubtitleCollection, TextOverlay};
use vosync::timeline::pauses::overlay_reading_time;
use vosync::timeline::{ExpansionStats, HEAD_INDEX, PauseCalculator, Retimer, SentenceExpander, apply_padding};

use crate::common;

fn expander() -> SentenceExpander {
    SentenceExpander::new(ExpanderConfig::default())
}

#[test]
fn test_expand_multiSentenceEntry_shouldSplitProportionally() -> Result<()> {
    let entries = SubtitleCollection::parse_srt_string(common::LECTURE_SRT)?;
    let expanded = expander().expand(&entries);

    assert_eq!(expanded.len(), 4);
    assert_eq!(expanded[1].text, "Today we talk about patience.");
    assert_eq!(expanded[2].text, "It is mentioned in QS. Al-Baqarah 153.");
    assert_eq!(expanded[1].origin, EntryOrigin::Sentence);
    assert_eq!(expanded[2].parent, 2);

    // 5 and 7 words over six seconds
    common::assert_close(expanded[1].duration(), 2.5);
    common::assert_close(expanded[2].duration(), 3.5);
    common::assert_close(expanded[1].duration() + expanded[2].duration(), entries[1].duration());

    let seqs: Vec<usize> = expanded.iter().map(|e| e.seq_num).collect();
    assert_eq!(seqs, vec![1, 2, 3, 4]);
    Ok(())
}

#[test]
fn test_expand_shortEntries_shouldBeIdempotent() -> Result<()> {
    let entries = SubtitleCollection::parse_srt_string(common::TWO_ENTRY_SRT)?;
    let once = expander().expand(&entries);
    let twice = expander().expand(&once);

    assert_eq!(once, entries);
    assert_eq!(twice, once);
    Ok(())
}

#[test]
fn test_expand_longRunOnEntry_shouldChunkAndKeepTotalDuration() {
    let text = (1..=40).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ");
    let entries = vec![common::entry(1, 0.0, 20.0, &text)];

    let expanded = expander().expand(&entries);

    assert_eq!(expanded.len(), 3);
    assert!(expanded.iter().all(|e| e.origin == EntryOrigin::Chunk));
    let total: f64 = expanded.iter().map(|e| e.duration()).sum();
    common::assert_close(total, 20.0);
    common::assert_close(expanded[2].end_time, 20.0);
}

#[test]
fn test_pauses_ruleAndHint_shouldMergeAsMaxNotSum() {
    let entries = vec![common::entry(1, 0.0, 2.0, "Halo dunia."), common::entry(2, 2.0, 4.0, "Ini contoh.")];
    let calculator = PauseCalculator::new(PauseConfig::default());
    let rule_based = calculator.calculate(&entries);
    common::assert_close(rule_based.after(1).unwrap_or_default(), 0.6);

    let hints: HashMap<usize, f64> = [(1, 2.0)].into_iter().collect();
    let merged = calculator.merge_sources(&rule_based, &hints, &HashMap::new());

    common::assert_close(merged.after(1).unwrap_or_default(), 2.0);
}

#[test]
fn test_pauses_overlay_shouldActAsLowerBound() {
    let entries = vec![common::entry(1, 0.0, 2.0, "Allah berfirman,"), common::entry(2, 2.0, 4.0, "Sabar.")];
    let config = PauseConfig::default();
    let calculator = PauseCalculator::new(config.clone());
    let overlay = TextOverlay {
        overlay_type: OverlayType::QuranVerse,
        text: Some("Indeed Allah is with the patient".to_string()),
        reference: Some("QS 2:153".to_string()),
        arabic: Some("إن الله مع الصابرين".to_string()),
    };
    let reading_time = overlay_reading_time(&overlay, &config.overlay);
    let overlays = [(1, overlay)].into_iter().collect();

    let merged = calculator.merge_sources(&calculator.calculate(&entries), &HashMap::new(), &overlays);

    assert!(reading_time > config.comma);
    common::assert_close(merged.after(1).unwrap_or_default(), reading_time);
}

#[test]
fn test_pauses_headSilence_shouldUseSentinelIndex() {
    let mut entries = vec![common::entry(1, 1.5, 3.0, "Mulai."), common::entry(2, 3.0, 4.0, "Lanjut.")];
    apply_padding(&mut entries, &PaddingConfig { start_cap: 0.0, end_cap: 0.0 });

    let pauses = PauseCalculator::new(PauseConfig::default()).calculate(&entries);

    common::assert_close(pauses.get(HEAD_INDEX).unwrap_or_default(), 1.5);
    // Last entry never gets a trailing pause
    assert!(pauses.after(2).is_none());
}

/// Two entries, 0.5s apart, trailing periods: the second lands at 2.0 + 0.6
#[test]
fn test_timeline_endToEnd_withoutPadding_shouldRetimeSecondEntryTo2_6() -> Result<()> {
    let config = common::unpadded_config();
    let source = SubtitleCollection::parse_srt_string(common::TWO_ENTRY_SRT)?;

    let mut entries = SentenceExpander::new(config.sync.expander.clone()).expand(&source);
    assert_eq!(entries.len(), 2);
    apply_padding(&mut entries, &config.sync.padding);

    let pauses = PauseCalculator::new(config.sync.pauses.clone()).calculate(&entries);
    common::assert_close(pauses.after(1).unwrap_or_default(), 0.6);

    let end = Retimer::new().retime(&mut entries, &pauses);

    common::assert_close(entries[1].start_time, 2.6);
    common::assert_close(entries[1].end_time, 5.1);
    common::assert_close(end, 5.1);
    // Original timing survives retiming
    common::assert_close(entries[1].original_start_time(), 2.5);
    Ok(())
}

#[test]
fn test_retimer_measuredDurations_shouldWinOverTheory() {
    let mut entries = vec![common::entry(1, 0.0, 2.0, "A."), common::entry(2, 2.0, 3.0, "B.")];
    let pauses = [(1, 0.3)].into_iter().collect();
    let retimer = Retimer::with_measured([(1, 2.04)].into_iter().collect());

    retimer.retime(&mut entries, &pauses);

    common::assert_close(entries[0].end_time, 2.04);
    common::assert_close(entries[1].start_time, 2.34);
}

#[test]
fn test_expansionStats_shouldCountOriginsAndPauses() -> Result<()> {
    let config = Config::default();
    let source = SubtitleCollection::parse_srt_string(common::LECTURE_SRT)?;
    let expanded = SentenceExpander::new(config.sync.expander.clone()).expand(&source);
    let pauses = PauseCalculator::new(config.sync.pauses.clone()).calculate(&expanded);

    let stats = ExpansionStats::compute(&source, &expanded, &pauses);

    assert_eq!(stats.original_count, 3);
    assert_eq!(stats.expanded_count, 4);
    assert_eq!(stats.sentence_count, 2);
    assert_eq!(stats.parsed_count, 2);
    assert_eq!(stats.pause_count, pauses.len());
    Ok(())
}
