use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::media::MediaItem;
use crate::scan::{Catalog, CatalogEntry};

#[derive(Debug, Serialize)]
pub struct Manifest<'a> {
    entries: Vec<ManifestEntry<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum ManifestEntry<'a> {
    Item(ManifestItem<'a>),
    Collection {
        name: &'a str,
        source: String,
        items: Vec<ManifestItem<'a>>,
    },
}

#[derive(Debug, Serialize)]
struct ManifestItem<'a> {
    title: &'a str,
    collection: &'a str,
    cover: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    bvid: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Local>>,
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
}

fn display_path(path: &Path, base: Option<&Path>) -> String {
    base.and_then(|b| path.strip_prefix(b).ok())
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

impl<'a> Manifest<'a> {
    /// Describe `catalog`. `outputs` maps item folders to the files exported
    /// from them; output paths are written relative to `output_dir`.
    pub fn new(
        catalog: &'a Catalog,
        outputs: &HashMap<PathBuf, PathBuf>,
        output_dir: Option<&Path>,
    ) -> Self {
        let item = |m: &'a MediaItem| ManifestItem {
            title: m.title(),
            collection: m.collection_name(),
            cover: m.cover_url(),
            bvid: m.descriptor().bvid(),
            updated_at: m.descriptor().updated_at(),
            source: display_path(m.root_path(), None),
            output: outputs
                .get(m.root_path())
                .map(|out| display_path(out, output_dir)),
        };

        let entries = catalog
            .iter()
            .map(|entry| match entry {
                CatalogEntry::Item(m) => ManifestEntry::Item(item(m)),
                CatalogEntry::Group(coll) => ManifestEntry::Collection {
                    name: coll.name(),
                    source: display_path(coll.root_path(), None),
                    items: coll.iter().map(item).collect(),
                },
            })
            .collect();

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Write the manifest as pretty-printed JSON.
pub fn write_manifest(manifest: &Manifest, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, manifest)?;
    Ok(())
}
