use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::cancel::CancellationToken;
use crate::export::{output_path, ExportKind, Exporter, Transcoder};
use crate::media::MediaItem;
use crate::naming::{indexed_name, sanitize_file_name, NameFn};
use crate::scan::{Catalog, CatalogEntry};

/// How output paths are chosen for a batch.
pub struct Placement<'a> {
    pub output_dir: &'a Path,
    pub format: &'a str,
    /// Put collection members under `<output_dir>/<collection name>/`
    pub collection_dirs: bool,
    pub name: &'a NameFn,
}

/// Output path for one item of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment<'c> {
    pub item: &'c MediaItem,
    pub dest: PathBuf,
}

/// Assign destination paths for every item in `catalog`, in catalog order.
///
/// Names that collide inside the batch get ` (1)`, ` (2)`, ... suffixes.
/// Paths differing only in letter case collide too, since Windows and macOS
/// treat them as one file. Existing files on disk are overwritten.
pub fn assign_outputs<'c>(catalog: &'c Catalog, placement: &Placement) -> Vec<Assignment<'c>> {
    let mut used_paths: HashSet<String> = HashSet::new();
    let mut assignments = Vec::new();

    for entry in catalog {
        let (sub_dir, indexed) = match entry {
            CatalogEntry::Item(_) => (placement.output_dir.to_path_buf(), None),
            CatalogEntry::Group(coll) if placement.collection_dirs => (
                placement.output_dir.join(sanitize_file_name(coll.name())),
                Some(coll.len()),
            ),
            CatalogEntry::Group(_) => (placement.output_dir.to_path_buf(), None),
        };

        for (idx, item) in entry.items().enumerate() {
            let stem = match indexed {
                Some(total) => indexed_name(idx, total, &(placement.name)(item)),
                None => (placement.name)(item),
            };

            let mut dest = output_path(&sub_dir, &stem, placement.format);
            let mut counter = 1u32;
            while used_paths.contains(&fold_case(&dest)) {
                dest = output_path(&sub_dir, &format!("{} ({})", stem, counter), placement.format);
                counter += 1;
            }

            used_paths.insert(fold_case(&dest));
            assignments.push(Assignment { item, dest });
        }
    }

    assignments
}

fn fold_case(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

/// Run the exports on a pool of `jobs` threads; the first failure stops the batch.
///
/// Returns item folder -> written file.
pub fn write_outputs<T: Transcoder>(
    exporter: &Exporter<T>,
    assignments: &[Assignment],
    kind: ExportKind,
    copy: bool,
    jobs: usize,
    cancel_token: Option<&CancellationToken>,
) -> anyhow::Result<HashMap<PathBuf, PathBuf>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()?;

    let pb = ProgressBar::new(assignments.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40}] {pos}/{len} exporting {msg}")
            .unwrap(),
    );

    pool.install(|| {
        assignments
            .par_iter()
            .try_for_each(|a| -> anyhow::Result<()> {
                if let Some(token) = cancel_token {
                    token.check()?;
                }

                debug!("Exporting {} -> {}", a.item.root_path().display(), a.dest.display());
                pb.set_message(a.item.title().to_string());
                exporter
                    .export_to(kind, a.item, &a.dest, copy)
                    .with_context(|| format!("exporting \"{}\"", a.item.title()))?;

                if let Some(ms) = a.item.descriptor().updated_at_millis() {
                    let ft = filetime::FileTime::from_unix_time(
                        ms.div_euclid(1000),
                        (ms.rem_euclid(1000) * 1_000_000) as u32,
                    );
                    filetime::set_file_mtime(&a.dest, ft).ok();
                }

                pb.inc(1);
                Ok(())
            })
    })?;

    pb.finish_and_clear();
    info!("Wrote {} files", assignments.len());

    Ok(assignments
        .iter()
        .map(|a| (a.item.root_path().to_path_buf(), a.dest.clone()))
        .collect())
}
