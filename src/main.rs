use std::path::PathBuf;

use anyhow::Context;
use bili_extract_core::layout::DEFAULT_QUALITY_DIR;
use bili_extract_core::manifest::Manifest;
use bili_extract_core::{
    process_with, scan_with_layout, CancellationToken, CatalogEntry, ExportKind, ExportOptions,
    Exporter, Ffmpeg, Layout,
};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bili-extract", version, about = "Export Bilibili Android offline downloads to standard audio/video files")]
struct Cli {
    /// More logging (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the items and collections found in a download directory
    List {
        /// Download directory (tv.danmaku.bili/download)
        root: PathBuf,

        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,

        /// Quality directory holding video.m4s and audio.m4s
        #[arg(long, default_value = DEFAULT_QUALITY_DIR)]
        quality_dir: String,
    },
    /// Export downloads through ffmpeg
    Export(ExportArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// Download directory (tv.danmaku.bili/download)
    root: PathBuf,

    /// Output directory
    #[arg(short, long)]
    output: PathBuf,

    /// What to export: merged, video or audio
    #[arg(long, default_value = "merged")]
    kind: ExportKind,

    /// Output extension (default: mp4, or mp3 for audio)
    #[arg(long)]
    format: Option<String>,

    /// Copy streams instead of re-encoding
    #[arg(long)]
    copy: bool,

    /// Quality directory holding video.m4s and audio.m4s
    #[arg(long, default_value = DEFAULT_QUALITY_DIR)]
    quality_dir: String,

    /// ffmpeg executable
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Put collection episodes in a folder named after the collection
    #[arg(long)]
    collection_dirs: bool,

    /// Use titles as file names without replacing invalid characters
    #[arg(long)]
    raw_names: bool,

    /// Number of ffmpeg processes to run at once
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,

    /// Write a JSON manifest of the catalog and exported files
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Only export the item or collection with this name
    #[arg(long)]
    only: Option<String>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn list(root: PathBuf, json: bool, quality_dir: String) -> anyhow::Result<()> {
    let layout = Layout::default().with_quality_dir(quality_dir);
    let catalog = scan_with_layout(&root, &layout)
        .with_context(|| format!("scanning {}", root.display()))?;

    if json {
        let manifest = Manifest::new(&catalog, &Default::default(), None);
        serde_json::to_writer_pretty(std::io::stdout().lock(), &manifest)?;
        println!();
        return Ok(());
    }

    for entry in &catalog {
        match entry {
            CatalogEntry::Item(item) => println!("{}", item),
            CatalogEntry::Group(coll) => {
                println!("{} ({} items)", coll.name(), coll.len());
                for (i, item) in coll.iter().enumerate() {
                    println!("  {:>3}. {}", i + 1, item);
                }
            }
        }
    }
    Ok(())
}

fn export(args: ExportArgs) -> anyhow::Result<()> {
    let t_total = std::time::Instant::now();

    let options = ExportOptions {
        input: args.root,
        output: args.output,
        kind: args.kind,
        format: args.format,
        copy: args.copy,
        layout: Layout::default().with_quality_dir(args.quality_dir),
        ffmpeg: args.ffmpeg,
        collection_dirs: args.collection_dirs,
        raw_names: args.raw_names,
        jobs: args.jobs,
        manifest: args.manifest,
        only: args.only,
    };

    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupted, stopping after the running exports finish");
        handler_token.cancel();
    })?;

    let exporter = Exporter::new(Ffmpeg::new(&options.ffmpeg));
    let result = process_with(&options, &exporter, Some(&token))?;

    info!(
        "Done! {} entries ({} collections), {} files written ({:.2}s)",
        result.entries,
        result.collections,
        result.files_written,
        t_total.elapsed().as_secs_f64()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::List {
            root,
            json,
            quality_dir,
        } => list(root, json, quality_dir),
        Command::Export(args) => export(args),
    }
}
