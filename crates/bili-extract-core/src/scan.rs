use std::fmt;
use std::path::Path;

use tracing::{debug, info};

use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::layout::{list_child_dirs, Layout};
use crate::media::MediaItem;

/// One classified download group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEntry {
    Item(MediaItem),
    Group(Collection),
}

impl CatalogEntry {
    /// Item title or collection name
    pub fn name(&self) -> &str {
        match self {
            CatalogEntry::Item(item) => item.title(),
            CatalogEntry::Group(coll) => coll.name(),
        }
    }

    pub fn as_item(&self) -> Option<&MediaItem> {
        match self {
            CatalogEntry::Item(item) => Some(item),
            CatalogEntry::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&Collection> {
        match self {
            CatalogEntry::Item(_) => None,
            CatalogEntry::Group(coll) => Some(coll),
        }
    }

    /// Every item in this entry, in stored order
    pub fn items(&self) -> std::slice::Iter<'_, MediaItem> {
        match self {
            CatalogEntry::Item(item) => std::slice::from_ref(item).iter(),
            CatalogEntry::Group(coll) => coll.iter(),
        }
    }
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogEntry::Item(item) => item.fmt(f),
            CatalogEntry::Group(coll) => coll.fmt(f),
        }
    }
}

/// Everything found under a download root, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<CatalogEntry> {
        self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CatalogEntry> {
        self.entries.iter()
    }

    /// Standalone items and collection members, flattened in order.
    pub fn items(&self) -> impl Iterator<Item = &MediaItem> {
        self.entries.iter().flat_map(CatalogEntry::items)
    }

    pub fn collection_count(&self) -> usize {
        self.entries.iter().filter(|e| e.as_group().is_some()).count()
    }

    /// Keep only entries whose [`CatalogEntry::name`] equals `name`.
    pub fn retain_named(&mut self, name: &str) {
        self.entries.retain(|e| e.name() == name);
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a CatalogEntry;
    type IntoIter = std::slice::Iter<'a, CatalogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Scan a download root (normally `tv.danmaku.bili/download`) with the default layout.
pub fn scan(root: &Path) -> Result<Catalog> {
    scan_with_layout(root, &Layout::default())
}

/// Scan a download root and classify each group folder.
///
/// A group with exactly one child folder is a standalone item; anything else
/// is opened as a [`Collection`]. A collection that has lost all but one of
/// its items is therefore reported as a standalone item.
///
/// The first failing item aborts the scan.
pub fn scan_with_layout(root: &Path, layout: &Layout) -> Result<Catalog> {
    if !root.is_dir() {
        return Err(Error::ScanRootNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut entries = Vec::new();
    for group in list_child_dirs(root)? {
        let children = list_child_dirs(&group)?;
        let entry = match children.as_slice() {
            [only] => {
                debug!("{}: single item", group.display());
                CatalogEntry::Item(MediaItem::open_with_layout(only, layout)?)
            }
            _ => {
                debug!("{}: collection of {}", group.display(), children.len());
                CatalogEntry::Group(Collection::open_with_layout(&group, layout)?)
            }
        };
        entries.push(entry);
    }

    let catalog = Catalog { entries };
    info!(
        "Scanned {}: {} entries, {} collections, {} items",
        root.display(),
        catalog.len(),
        catalog.collection_count(),
        catalog.items().count()
    );
    Ok(catalog)
}
