use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context, anyhow};
use log::{warn, debug};
use serde::{Deserialize, Serialize};

use crate::errors::SubtitleError;

// @module: Subtitle records, parsing and serialization

// @const: Time range line, comma or dot as millisecond separator
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}):(\d{2}):(\d{2})[,.](\d{1,3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{1,3})").unwrap()
});

// @const: Inline HTML-like tags such as <i> or <font color="...">
static HTML_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

// @const: Brace style tags such as {\an8}
static BRACE_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^}]*\}").unwrap());

// @const: Spaced ASCII dash used as a dialogue or aside marker
static SPACED_DASH_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|\s)-+(\s|$)").unwrap());

static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static BLOCK_SEPARATOR_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n[ \t]*\r?\n").unwrap());

/// Tag opening an overlay marker block
pub const OVERLAY_TAG_PREFIX: &str = "[OVERLAY:";

/// How an entry came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryOrigin {
    /// Read from a subtitle file unchanged
    Parsed,
    /// One sentence of a longer parsed entry
    Sentence,
    /// A word chunk of an over-long sentence
    Chunk,
}

// @struct: Single timed subtitle entry
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    // @field: Sequence number (1-based)
    pub seq_num: usize,

    // @field: Working start time in seconds
    pub start_time: f64,

    // @field: Working end time in seconds
    pub end_time: f64,

    // Captured once, at parse or expansion time; audio slicing reads these.
    original_start_time: f64,
    original_end_time: f64,

    // @field: Extra audio kept before the entry when slicing
    pub padding_start: f64,

    // @field: Extra audio kept after the entry when slicing
    pub padding_end: f64,

    // @field: Subtitle text
    pub text: String,

    // @field: Whether the entry was split from a longer one
    pub origin: EntryOrigin,

    // @field: Sequence number of the parsed entry this one came from
    pub parent: usize,
}

impl SubtitleEntry {
    /// Creates a new entry whose original timestamps equal its working ones
    pub fn new(seq_num: usize, start_time: f64, end_time: f64, text: String) -> Self {
        SubtitleEntry {
            seq_num,
            start_time,
            end_time,
            original_start_time: start_time,
            original_end_time: end_time,
            padding_start: 0.0,
            padding_end: 0.0,
            text,
            origin: EntryOrigin::Parsed,
            parent: seq_num,
        }
    }

    // @creates: Validated subtitle entry
    // @validates: Time range and non-empty text
    pub fn new_validated(seq_num: usize, start_time: f64, end_time: f64, text: String) -> Result<Self> {
        if end_time <= start_time {
            return Err(anyhow!(
                "Invalid time range: end time {:.3} <= start time {:.3}",
                end_time, start_time
            ));
        }

        let trimmed_text = text.trim();
        if trimmed_text.is_empty() {
            return Err(anyhow!("Empty subtitle text for entry {}", seq_num));
        }

        Ok(Self::new(seq_num, start_time, end_time, trimmed_text.to_string()))
    }

    /// Creates an entry split out of `parent`, capturing its sub-window as the original timing
    pub fn split_from(parent: &SubtitleEntry, start_time: f64, end_time: f64, text: String, origin: EntryOrigin) -> Self {
        SubtitleEntry {
            seq_num: parent.seq_num,
            start_time,
            end_time,
            original_start_time: start_time,
            original_end_time: end_time,
            padding_start: 0.0,
            padding_end: 0.0,
            text,
            origin,
            parent: parent.parent,
        }
    }

    /// Start time as it was in the source audio
    pub fn original_start_time(&self) -> f64 {
        self.original_start_time
    }

    /// End time as it was in the source audio
    pub fn original_end_time(&self) -> f64 {
        self.original_end_time
    }

    /// Working duration
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Speech duration in the source audio
    pub fn original_duration(&self) -> f64 {
        self.original_end_time - self.original_start_time
    }

    /// Theoretical length of the padded audio slice
    pub fn padded_duration(&self) -> f64 {
        self.original_duration() + self.padding_start + self.padding_end
    }

    /// Slice window in the source audio, before clamping to its length
    pub fn slice_window(&self) -> (f64, f64) {
        (
            (self.original_start_time - self.padding_start).max(0.0),
            self.original_end_time + self.padding_end,
        )
    }

    /// Number of whitespace separated words
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Parse a subtitle timestamp (HH:MM:SS,mmm or HH:MM:SS.mmm) to seconds
    pub fn parse_timestamp(timestamp: &str) -> Result<f64> {
        let parts: Vec<&str> = timestamp.trim().split(&[':', ',', '.'][..]).collect();

        if parts.len() != 4 {
            return Err(anyhow!("Invalid timestamp format: {}", timestamp));
        }

        let hours: u64 = parts[0].parse().context("Failed to parse hours")?;
        let minutes: u64 = parts[1].parse().context("Failed to parse minutes")?;
        let seconds: u64 = parts[2].parse().context("Failed to parse seconds")?;
        let millis = parse_millis(parts[3]).context("Failed to parse milliseconds")?;

        if minutes >= 60 || seconds >= 60 {
            return Err(anyhow!("Invalid time components in timestamp: {}", timestamp));
        }

        let total_ms = hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis;
        Ok(total_ms as f64 / 1000.0)
    }

    /// Format seconds as a subtitle timestamp (HH:MM:SS,mmm)
    pub fn format_timestamp(seconds: f64) -> String {
        let ms = (seconds.max(0.0) * 1000.0).round() as u64;
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let secs = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
    }

    /// Convert start time to formatted timestamp
    pub fn format_start_time(&self) -> String {
        Self::format_timestamp(self.start_time)
    }

    /// Convert end time to formatted timestamp
    pub fn format_end_time(&self) -> String {
        Self::format_timestamp(self.end_time)
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(f, "{} --> {}", self.format_start_time(), self.format_end_time())?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Milliseconds field; "5" means 500ms the same way "5" after a decimal point would
fn parse_millis(field: &str) -> Result<u64> {
    if field.is_empty() || field.len() > 3 {
        return Err(anyhow!("Invalid millisecond field: {}", field));
    }
    let value: u64 = field.parse()?;
    Ok(value * 10u64.pow(3 - field.len() as u32))
}

/// Kind of on-screen text overlay shown in the gap after an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverlayType {
    QuranVerse,
    Hadith,
    Quote,
    KeyPoint,
}

impl OverlayType {
    /// Base reading time in seconds before per-word time is added
    pub fn base_reading_time(&self) -> f64 {
        match self {
            OverlayType::QuranVerse => 2.0,
            OverlayType::Hadith => 1.5,
            OverlayType::Quote => 1.0,
            OverlayType::KeyPoint => 0.8,
        }
    }
}

impl fmt::Display for OverlayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OverlayType::QuranVerse => "QuranVerse",
            OverlayType::Hadith => "Hadith",
            OverlayType::Quote => "Quote",
            OverlayType::KeyPoint => "KeyPoint",
        };
        write!(f, "{}", name)
    }
}

/// Text overlay hint supplied by the content-classification layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    /// Overlay kind
    #[serde(rename = "type")]
    pub overlay_type: OverlayType,

    /// Display text (translation)
    #[serde(default)]
    pub text: Option<String>,

    /// Source reference, e.g. a surah and verse number
    #[serde(default)]
    pub reference: Option<String>,

    /// Original Arabic text
    #[serde(default)]
    pub arabic: Option<String>,
}

impl TextOverlay {
    /// Words the viewer has to read; falls back to the reference
    pub fn word_count(&self) -> usize {
        self.text
            .as_deref()
            .or(self.reference.as_deref())
            .map(|t| t.split_whitespace().count())
            .unwrap_or(0)
    }

    /// Marker block lines
    pub fn marker_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("{}{}]", OVERLAY_TAG_PREFIX, self.overlay_type)];
        if let Some(reference) = self.reference.as_deref().filter(|r| !r.trim().is_empty()) {
            lines.push(format!("[REF] {}", reference.trim()));
        }
        if let Some(arabic) = self.arabic.as_deref().filter(|a| !a.trim().is_empty()) {
            lines.push(format!("[ARABIC] {}", arabic.trim()));
        }
        lines
    }
}

/// Overlays keyed by entry sequence number
pub type OverlayMap = HashMap<usize, TextOverlay>;

/// Collection of subtitle entries with metadata
#[derive(Debug, Clone)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// List of subtitle entries
    pub entries: Vec<SubtitleEntry>,
}

impl SubtitleCollection {
    /// Create a new subtitle collection
    pub fn new(source_file: PathBuf) -> Self {
        SubtitleCollection {
            source_file,
            entries: Vec::new(),
        }
    }

    /// Read and parse a subtitle file
    pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;
        let entries = Self::parse_srt_string(&content)
            .with_context(|| format!("Failed to parse subtitle file: {}", path.display()))?;

        Ok(SubtitleCollection {
            source_file: path.to_path_buf(),
            entries,
        })
    }

    /// Write subtitles to a file, optionally interleaving overlay marker blocks
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P, overlays: Option<&OverlayMap>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        fs::write(path, Self::to_srt_string(&self.entries, overlays))
            .with_context(|| format!("Failed to write subtitle file: {}", path.display()))?;

        Ok(())
    }

    /// Total span from the first start to the last end
    pub fn total_duration(&self) -> f64 {
        match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => last.end_time - first.start_time,
            _ => 0.0,
        }
    }

    /// Parse subtitle content into entries
    ///
    /// Malformed blocks are skipped with a warning; only content without a single
    /// usable block is an error.
    pub fn parse_srt_string(content: &str) -> Result<Vec<SubtitleEntry>, SubtitleError> {
        let content = content.trim_start_matches('\u{feff}');
        let mut entries = Vec::new();

        for (block_index, block) in BLOCK_SEPARATOR_REGEX.split(content).enumerate() {
            let lines: Vec<&str> = block
                .lines()
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .collect();
            if lines.is_empty() {
                continue;
            }

            let Some(arrow_pos) = lines.iter().position(|l| l.contains("-->")) else {
                warn!("Skipping subtitle block {} without a time range: {:?}", block_index + 1, lines[0]);
                continue;
            };

            let Some((start, end)) = Self::parse_time_range(lines[arrow_pos]) else {
                warn!("Skipping subtitle block {} with unparsable time range: {}", block_index + 1, lines[arrow_pos]);
                continue;
            };

            // Index line is optional; recover it from position otherwise
            let seq_num = arrow_pos
                .checked_sub(1)
                .and_then(|i| lines[i].parse::<usize>().ok())
                .unwrap_or(entries.len() + 1);

            let text_lines = &lines[arrow_pos + 1..];
            if text_lines.first().is_some_and(|l| l.starts_with(OVERLAY_TAG_PREFIX)) {
                debug!("Skipping overlay marker block at {}", SubtitleEntry::format_timestamp(start));
                continue;
            }

            let text = clean_text(&text_lines.join(" "));
            match SubtitleEntry::new_validated(seq_num, start, end, text) {
                Ok(entry) => entries.push(entry),
                Err(e) => debug!("Skipping subtitle block {}: {}", block_index + 1, e),
            }
        }

        if entries.is_empty() {
            warn!("No valid subtitle entries found in content");
            return Err(SubtitleError::Empty("subtitle content".to_string()));
        }

        entries.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        let overlap_count = entries
            .windows(2)
            .filter(|pair| pair[0].end_time > pair[1].start_time)
            .count();
        if overlap_count > 0 {
            warn!("Found {} overlapping subtitle entries", overlap_count);
        }

        for (i, entry) in entries.iter_mut().enumerate() {
            entry.seq_num = i + 1;
            entry.parent = i + 1;
        }

        Ok(entries)
    }

    /// Serialize entries, interleaving an overlay marker block in the gap after an
    /// entry when an overlay exists for it and the gap to the next entry is positive
    pub fn to_srt_string(entries: &[SubtitleEntry], overlays: Option<&OverlayMap>) -> String {
        let mut output = String::new();
        let mut block_num = 1;

        for (i, entry) in entries.iter().enumerate() {
            output.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                block_num,
                entry.format_start_time(),
                entry.format_end_time(),
                entry.text
            ));
            block_num += 1;

            let overlay = overlays.and_then(|o| o.get(&entry.seq_num));
            let next = entries.get(i + 1);
            if let (Some(overlay), Some(next)) = (overlay, next) {
                // Gap measured on the millisecond grid the file is written with
                let gap_start = SubtitleEntry::format_timestamp(entry.end_time);
                let gap_end = SubtitleEntry::format_timestamp(next.start_time);
                if next.start_time > entry.end_time && gap_start != gap_end {
                    output.push_str(&format!(
                        "{}\n{} --> {}\n{}\n\n",
                        block_num,
                        gap_start,
                        gap_end,
                        overlay.marker_lines().join("\n")
                    ));
                    block_num += 1;
                } else {
                    debug!("No gap after entry {} for its overlay marker", entry.seq_num);
                }
            }
        }

        output
    }

    /// Parse a time range line into start and end seconds
    fn parse_time_range(line: &str) -> Option<(f64, f64)> {
        let caps = TIMESTAMP_REGEX.captures(line)?;
        let to_seconds = |start_idx: usize| -> Option<f64> {
            let field = |i: usize| caps.get(start_idx + i).map(|m| m.as_str());
            let hours: u64 = field(0)?.parse().ok()?;
            let minutes: u64 = field(1)?.parse().ok()?;
            let seconds: u64 = field(2)?.parse().ok()?;
            let millis = parse_millis(field(3)?).ok()?;
            if minutes >= 60 || seconds >= 60 {
                return None;
            }
            Some(((hours * 3600 + minutes * 60 + seconds) * 1000 + millis) as f64 / 1000.0)
        };
        Some((to_seconds(1)?, to_seconds(5)?))
    }
}

/// Strip style tags, normalize dashes to spaces and collapse whitespace
pub fn clean_text(text: &str) -> String {
    let without_html = HTML_TAG_REGEX.replace_all(text, " ");
    let without_braces = BRACE_TAG_REGEX.replace_all(&without_html, " ");
    let dashes_normalized: String = without_braces
        .chars()
        .map(|c| match c {
            '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2015}' => ' ',
            other => other,
        })
        .collect();
    let without_spaced_dash = SPACED_DASH_REGEX.replace_all(&dashes_normalized, " ");
    WHITESPACE_REGEX.replace_all(&without_spaced_dash, " ").trim().to_string()
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Collection")?;
        writeln!(f, "Source: {:?}", self.source_file)?;
        writeln!(f, "Entries: {}", self.entries.len())?;
        Ok(())
    }
}
