use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File, directory and working-directory utilities

const EXPANDED_SUBTITLE: &str = "expanded.srt";
const SEGMENTS_DIR: &str = "vo_segments";
const CONCAT_LIST: &str = "concat_list.txt";
const STITCHED_VOICEOVER: &str = "stitched_vo.mp3";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Find files with a specific extension in a directory
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();
        let extension = extension.trim_start_matches('.');

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
            {
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content).with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Check that a required input exists and is a file
    pub fn require_file<P: AsRef<Path>>(path: P, what: &str) -> Result<()> {
        let path = path.as_ref();
        if !Self::file_exists(path) {
            return Err(anyhow!("{} does not exist: {:?}", what, path));
        }
        Ok(())
    }

    /// Classify a media path by extension
    pub fn detect_media_kind<P: AsRef<Path>>(path: P) -> MediaKind {
        let Some(ext) = path.as_ref().extension() else {
            return MediaKind::Unknown;
        };
        let ext = ext.to_string_lossy().to_lowercase();

        // Not exhaustive, covers what stock brokers and editors hand out
        let video_extensions = ["mp4", "mkv", "avi", "mov", "webm", "m4v", "mpg", "mpeg", "ts"];
        let image_extensions = ["jpg", "jpeg", "png", "webp", "bmp"];
        let audio_extensions = ["wav", "mp3", "m4a", "aac", "flac", "ogg", "opus"];

        if ext == "srt" {
            MediaKind::Subtitle
        } else if video_extensions.contains(&ext.as_str()) {
            MediaKind::Video
        } else if image_extensions.contains(&ext.as_str()) {
            MediaKind::Image
        } else if audio_extensions.contains(&ext.as_str()) {
            MediaKind::Audio
        } else {
            MediaKind::Unknown
        }
    }
}

/// Media categories the engine deals with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Subtitle file (SRT)
    Subtitle,
    /// Audio file
    Audio,
    /// Video clip
    Video,
    /// Still image, animated with Ken Burns motion
    Image,
    /// Unknown file type
    Unknown,
}

/// Per-run working directory layout.
///
/// ```text
/// <root>/expanded.srt
/// <root>/vo_segments/segment_NNN.wav
/// <root>/vo_segments/silence_<seconds>s.wav
/// <root>/vo_segments/concat_list.txt
/// <root>/stitched_vo.mp3
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    /// Layout rooted at `root`; nothing is created until [`WorkDir::create`]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Create the root and segment directories
    pub fn create(&self) -> Result<()> {
        FileManager::ensure_dir(&self.root)?;
        FileManager::ensure_dir(self.segments_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn expanded_subtitle(&self) -> PathBuf {
        self.root.join(EXPANDED_SUBTITLE)
    }

    pub fn segments_dir(&self) -> PathBuf {
        self.root.join(SEGMENTS_DIR)
    }

    /// Slice for entry `seq_num`, zero-padded to three digits
    pub fn segment_path(&self, seq_num: usize) -> PathBuf {
        self.segments_dir().join(format!("segment_{:03}.wav", seq_num))
    }

    /// Cached silence file for a millisecond-rounded duration
    pub fn silence_path(&self, seconds: f64) -> PathBuf {
        self.segments_dir().join(format!("silence_{:.3}s.wav", seconds))
    }

    pub fn concat_list(&self) -> PathBuf {
        self.segments_dir().join(CONCAT_LIST)
    }

    pub fn stitched_voiceover(&self) -> PathBuf {
        self.root.join(STITCHED_VOICEOVER)
    }

    /// Remove every output of a previous run so a rerun starts clean
    pub fn reset_segments(&self) -> Result<()> {
        let segments_dir = self.segments_dir();
        if FileManager::dir_exists(&segments_dir) {
            for stale in FileManager::find_files(&segments_dir, "wav")? {
                fs::remove_file(&stale).with_context(|| format!("Failed to remove stale segment: {:?}", stale))?;
            }
        }

        for stale in [self.concat_list(), self.stitched_voiceover(), self.expanded_subtitle()] {
            if FileManager::file_exists(&stale) {
                fs::remove_file(&stale).with_context(|| format!("Failed to remove stale output: {:?}", stale))?;
            }
        }

        self.create()
    }
}
