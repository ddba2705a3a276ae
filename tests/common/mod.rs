/*!
 * Common test utilities for the vosync test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use vosync::app_config::Config;
use vosync::subtitle_processor::SubtitleEntry;

/// Route library logs to the test output; safe to call from every test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Two short entries with a half-second gap
pub const TWO_ENTRY_SRT: &str = "1
00:00:00,000 --> 00:00:02,000
Halo dunia.

2
00:00:02,500 --> 00:00:05,000
Ini contoh.
";

/// Three entries, the second long enough to split into sentences
pub const LECTURE_SRT: &str = "1
00:00:01,000 --> 00:00:04,000
Welcome to the lecture.

2
00:00:04,500 --> 00:00:10,500
Today we talk about patience. It is mentioned in QS. Al-Baqarah 153.

3
00:00:11,000 --> 00:00:14,000
Let us begin, shall we?
";

/// Creates a sample subtitle file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    create_test_file(dir, filename, content)
}

/// Creates an empty placeholder standing in for a recorded voiceover
pub fn create_test_audio(dir: &Path, filename: &str) -> Result<PathBuf> {
    create_test_file(dir, filename, "")
}

/// Default configuration with padding disabled so retimed values are easy to reason about
pub fn unpadded_config() -> Config {
    let mut config = Config::default();
    config.sync.padding.start_cap = 0.0;
    config.sync.padding.end_cap = 0.0;
    config.workspace.show_progress = false;
    config
}

/// Shorthand for a parsed entry
pub fn entry(seq_num: usize, start: f64, end: f64, text: &str) -> SubtitleEntry {
    SubtitleEntry::new(seq_num, start, end, text.to_string())
}

/// Approximate float comparison
pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {:.6}, got {:.6}",
        expected,
        actual
    );
}
