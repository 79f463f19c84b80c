//! Catalog and export the offline downloads of the Bilibili Android client.
//!
//! The client stores every download under `tv.danmaku.bili/download` as
//! `<group>/<item>/entry.json` plus a quality directory holding separate DASH
//! `video.m4s` and `audio.m4s` tracks. [`scan`] turns that tree into a
//! [`Catalog`] of standalone items and collections; [`Exporter`] hands items to
//! ffmpeg; [`process`] runs the whole batch.

pub mod cancel;
pub mod collection;
pub mod descriptor;
pub mod error;
pub mod export;
pub mod layout;
pub mod manifest;
pub mod media;
pub mod naming;
pub mod scan;
pub mod writer;

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

pub use cancel::{CancellationToken, CancelledError};
pub use collection::Collection;
pub use descriptor::MediaDescriptor;
pub use error::{Error, Result};
pub use export::{ExportError, ExportKind, Exporter, Ffmpeg, TranscodeJob, Transcoder};
pub use layout::Layout;
pub use media::MediaItem;
pub use scan::{scan, scan_with_layout, Catalog, CatalogEntry};

fn default_jobs() -> usize {
    1
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Download root, normally `.../tv.danmaku.bili/download`
    pub input: PathBuf,
    pub output: PathBuf,
    #[serde(default)]
    pub kind: ExportKind,
    /// Output extension; the kind's default when unset
    #[serde(default)]
    pub format: Option<String>,
    /// Stream copy instead of re-encoding
    #[serde(default)]
    pub copy: bool,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: PathBuf,
    /// Export collection members into a folder named after the collection
    #[serde(default)]
    pub collection_dirs: bool,
    /// Use titles verbatim instead of sanitizing them for the filesystem
    #[serde(default)]
    pub raw_names: bool,
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    /// Write a JSON manifest of the catalog and the exported files here
    #[serde(default)]
    pub manifest: Option<PathBuf>,
    /// Only export the entry with this item title or collection name
    #[serde(default)]
    pub only: Option<String>,
}

impl ExportOptions {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            kind: ExportKind::default(),
            format: None,
            copy: false,
            layout: Layout::default(),
            ffmpeg: default_ffmpeg(),
            collection_dirs: false,
            raw_names: false,
            jobs: default_jobs(),
            manifest: None,
            only: None,
        }
    }

    pub fn format(&self) -> &str {
        self.format
            .as_deref()
            .unwrap_or_else(|| self.kind.default_format())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResult {
    /// Catalog entries selected for export
    pub entries: u64,
    pub collections: u64,
    pub files_written: u64,
}

/// Scan and export with ffmpeg.
pub fn process(options: &ExportOptions) -> anyhow::Result<ProcessResult> {
    let exporter = Exporter::new(Ffmpeg::new(&options.ffmpeg));
    process_with(options, &exporter, None)
}

/// Scan `options.input`, export every selected item through `exporter`, and
/// optionally write the manifest.
pub fn process_with<T: Transcoder>(
    options: &ExportOptions,
    exporter: &Exporter<T>,
    cancel_token: Option<&CancellationToken>,
) -> anyhow::Result<ProcessResult> {
    let mut catalog = scan_with_layout(&options.input, &options.layout)
        .with_context(|| format!("scanning {}", options.input.display()))?;

    if let Some(only) = &options.only {
        catalog.retain_named(only);
        if catalog.is_empty() {
            anyhow::bail!("no item or collection named \"{}\"", only);
        }
    }

    let name: &naming::NameFn = if options.raw_names {
        &naming::default_name
    } else {
        &naming::sanitized_name
    };
    let placement = writer::Placement {
        output_dir: &options.output,
        format: options.format(),
        collection_dirs: options.collection_dirs,
        name,
    };
    let assignments = writer::assign_outputs(&catalog, &placement);
    info!(
        "Exporting {} items as {} ({}) to {}",
        assignments.len(),
        options.kind,
        options.format(),
        options.output.display()
    );

    let outputs: HashMap<PathBuf, PathBuf> = writer::write_outputs(
        exporter,
        &assignments,
        options.kind,
        options.copy,
        options.jobs,
        cancel_token,
    )?;

    if let Some(path) = &options.manifest {
        let manifest = manifest::Manifest::new(&catalog, &outputs, Some(&options.output));
        manifest::write_manifest(&manifest, path)
            .with_context(|| format!("writing manifest {}", path.display()))?;
    }

    Ok(ProcessResult {
        entries: catalog.len() as u64,
        collections: catalog.collection_count() as u64,
        files_written: outputs.len() as u64,
    })
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::fs;
    use std::path::{Path, PathBuf};

    /// Create `<parent>/<name>` laid out the way the client stores a download.
    pub fn write_item(parent: &Path, name: &str, part: &str, collection: &str) -> PathBuf {
        let dir = parent.join(name);
        fs::create_dir_all(dir.join("16")).unwrap();
        let entry = serde_json::json!({
            "title": collection,
            "cover": "http://i0.hdslb.com/bfs/archive/cover.jpg",
            "page_data": { "part": part },
        });
        fs::write(dir.join("entry.json"), entry.to_string()).unwrap();
        fs::write(dir.join("16").join("video.m4s"), b"video").unwrap();
        fs::write(dir.join("16").join("audio.m4s"), b"audio").unwrap();
        dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults_from_json() {
        let json = r#"{"input": "/sdcard/download", "output": "/tmp/out", "kind": "audio"}"#;
        let options: ExportOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.kind, ExportKind::Audio);
        assert_eq!(options.format(), "mp3");
        assert_eq!(options.jobs, 1);
        assert_eq!(options.ffmpeg, PathBuf::from("ffmpeg"));
        assert_eq!(options.layout, Layout::default());
        assert!(!options.copy);
    }

    #[test]
    fn test_format_override() {
        let mut options = ExportOptions::new("in", "out");
        assert_eq!(options.format(), "mp4");
        options.format = Some("mkv".to_string());
        assert_eq!(options.format(), "mkv");
    }
}
