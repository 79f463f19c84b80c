use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::layout::{list_child_dirs, Layout};
use crate::media::MediaItem;

/// Items stored under one download group, e.g. the pages of a multi-part video.
///
/// The name is taken from the first item when the folder is opened. Members
/// are assumed to share it; this is not checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    root_path: PathBuf,
    name: String,
    items: Vec<MediaItem>,
}

impl Collection {
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_layout(path, &Layout::default())
    }

    /// Open every child folder of `path` as an item, in listing order.
    pub fn open_with_layout(path: &Path, layout: &Layout) -> Result<Self> {
        let items = list_child_dirs(path)?
            .iter()
            .map(|child| MediaItem::open_with_layout(child, layout))
            .collect::<Result<Vec<_>>>()?;

        let name = items
            .first()
            .map(|item| item.collection_name().to_string())
            .ok_or_else(|| Error::EmptyCollection {
                path: path.to_path_buf(),
            })?;

        Ok(Self {
            root_path: path.to_path_buf(),
            name,
            items,
        })
    }

    /// Add an item at the end. No deduplication.
    pub fn append(&mut self, item: MediaItem) {
        self.items.push(item);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Owned copy of the members; changing it does not touch the collection.
    pub fn content(&self) -> Vec<MediaItem> {
        self.items.clone()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MediaItem> {
        self.items.iter()
    }

    pub fn titles(&self) -> Vec<&str> {
        self.items.iter().map(MediaItem::title).collect()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a MediaItem;
    type IntoIter = std::slice::Iter<'a, MediaItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.titles())
    }
}
