use std::fmt;
use std::path::{Path, PathBuf};

use crate::descriptor::MediaDescriptor;
use crate::error::Result;
use crate::layout::Layout;

/// One downloaded item: a video track, an audio track and its descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    /// Folder holding `entry.json` and the quality directory
    root_path: PathBuf,
    /// DASH video track (not checked for existence)
    video_path: PathBuf,
    /// DASH audio track (not checked for existence)
    audio_path: PathBuf,
    descriptor: MediaDescriptor,
}

impl MediaItem {
    /// Open an item folder using the default storage layout.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_layout(path, &Layout::default())
    }

    pub fn open_with_layout(path: &Path, layout: &Layout) -> Result<Self> {
        let descriptor = MediaDescriptor::load(&layout.descriptor_path(path))?;
        Ok(Self {
            root_path: path.to_path_buf(),
            video_path: layout.video_path(path),
            audio_path: layout.audio_path(path),
            descriptor,
        })
    }

    pub fn title(&self) -> &str {
        self.descriptor.part_title()
    }

    pub fn collection_name(&self) -> &str {
        self.descriptor.collection_title()
    }

    pub fn cover_url(&self) -> &str {
        self.descriptor.cover_url()
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn video_path(&self) -> &Path {
        &self.video_path
    }

    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }

    pub fn descriptor(&self) -> &MediaDescriptor {
        &self.descriptor
    }

    /// True when the part title differs from the title of the containing work.
    pub fn is_part_of_collection(&self) -> bool {
        self.title() != self.collection_name()
    }
}

impl fmt::Display for MediaItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}
