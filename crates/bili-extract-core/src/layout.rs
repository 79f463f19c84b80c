use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Descriptor file at the top of every item folder
pub const DESCRIPTOR_FILENAME: &str = "entry.json";

/// Quality-tier directory holding the DASH tracks (client default)
pub const DEFAULT_QUALITY_DIR: &str = "16";

pub const VIDEO_FILENAME: &str = "video.m4s";
pub const AUDIO_FILENAME: &str = "audio.m4s";

/// Storage convention of the client's offline cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub descriptor: String,
    pub quality_dir: String,
    pub video: String,
    pub audio: String,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            descriptor: DESCRIPTOR_FILENAME.to_string(),
            quality_dir: DEFAULT_QUALITY_DIR.to_string(),
            video: VIDEO_FILENAME.to_string(),
            audio: AUDIO_FILENAME.to_string(),
        }
    }
}

impl Layout {
    pub fn with_quality_dir(mut self, quality_dir: impl Into<String>) -> Self {
        self.quality_dir = quality_dir.into();
        self
    }

    pub fn descriptor_path(&self, item_dir: &Path) -> PathBuf {
        item_dir.join(&self.descriptor)
    }

    pub fn video_path(&self, item_dir: &Path) -> PathBuf {
        item_dir.join(&self.quality_dir).join(&self.video)
    }

    pub fn audio_path(&self, item_dir: &Path) -> PathBuf {
        item_dir.join(&self.quality_dir).join(&self.audio)
    }
}

/// List the immediate child directories of `dir` in a stable order.
///
/// Names are compared as a text prefix followed by a trailing number, so
/// `1, 2, 10` and `c_9, c_10` keep numeric order and bare numbers come first.
/// Plain files are ignored.
pub fn list_child_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        } else {
            tracing::warn!("Ignoring stray file: {}", path.display());
        }
    }

    dirs.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    Ok(dirs)
}

fn sort_key(path: &Path) -> (String, Option<u64>, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let prefix = name.trim_end_matches(|c: char| c.is_ascii_digit());
    let number = name[prefix.len()..].parse::<u64>().ok();
    (prefix.to_string(), number, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_track_paths() {
        let layout = Layout::default();
        let item = Path::new("/dl/123/c_456");
        assert_eq!(layout.video_path(item), Path::new("/dl/123/c_456/16/video.m4s"));
        assert_eq!(layout.audio_path(item), Path::new("/dl/123/c_456/16/audio.m4s"));
        assert_eq!(layout.descriptor_path(item), Path::new("/dl/123/c_456/entry.json"));

        let hq = Layout::default().with_quality_dir("80");
        assert_eq!(hq.video_path(item), Path::new("/dl/123/c_456/80/video.m4s"));
    }

    #[test]
    fn test_list_child_dirs_order() {
        let dir = tempdir().unwrap();
        for name in ["10", "2", "1", "c_99", "c_100", "c_9", "b"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("stray.txt"), b"x").unwrap();

        let names: Vec<String> = list_child_dirs(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["1", "2", "10", "b", "c_9", "c_99", "c_100"]);
    }

    #[test]
    fn test_list_missing_dir() {
        let dir = tempdir().unwrap();
        let err = list_child_dirs(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
