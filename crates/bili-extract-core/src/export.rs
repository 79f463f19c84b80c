use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::media::MediaItem;
use crate::naming::NameFn;

/// Which tracks of an item end up in the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    /// Audio and video muxed into one container
    #[default]
    Merged,
    /// Video track only
    Video,
    /// Audio track only
    Audio,
}

impl ExportKind {
    /// Extension used when the caller does not pick one
    pub fn default_format(self) -> &'static str {
        match self {
            ExportKind::Merged | ExportKind::Video => "mp4",
            ExportKind::Audio => "mp3",
        }
    }

    /// Input tracks in the order they are handed to the transcoder
    pub fn inputs(self, item: &MediaItem) -> Vec<PathBuf> {
        match self {
            ExportKind::Merged => vec![item.audio_path().to_path_buf(), item.video_path().to_path_buf()],
            ExportKind::Video => vec![item.video_path().to_path_buf()],
            ExportKind::Audio => vec![item.audio_path().to_path_buf()],
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportKind::Merged => "merged",
            ExportKind::Video => "video",
            ExportKind::Audio => "audio",
        })
    }
}

impl FromStr for ExportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "merged" | "merge" | "both" => Ok(ExportKind::Merged),
            "video" => Ok(ExportKind::Video),
            "audio" => Ok(ExportKind::Audio),
            other => Err(format!("unknown export kind '{other}' (expected merged, video or audio)")),
        }
    }
}

/// One transcoder invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeJob {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    /// Copy streams instead of re-encoding
    pub copy: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status} while writing {}: {stderr}", output.display())]
    Failed {
        program: String,
        status: ExitStatus,
        output: PathBuf,
        stderr: String,
    },

    #[error("cannot create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Runs a [`TranscodeJob`]. Implementations must be safe to call from several
/// threads at once; jobs never share an output file.
pub trait Transcoder: Send + Sync {
    fn run(&self, job: &TranscodeJob) -> Result<(), ExportError>;
}

/// The `ffmpeg` command-line tool.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    binary: PathBuf,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Ffmpeg {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Builds the command line for a job: overwrite without asking, only
    /// report errors, every input in order, then the output file.
    pub fn build_command(&self, job: &TranscodeJob) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-y").arg("-hide_banner").arg("-loglevel").arg("error");

        for input in &job.inputs {
            cmd.arg("-i").arg(input);
        }
        if job.copy {
            cmd.arg("-c").arg("copy");
        }

        cmd.arg(&job.output);
        cmd
    }

    fn program(&self) -> String {
        self.binary.display().to_string()
    }
}

impl Transcoder for Ffmpeg {
    fn run(&self, job: &TranscodeJob) -> Result<(), ExportError> {
        let mut cmd = self.build_command(job);
        debug!("Running {:?}", cmd);

        let out = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ExportError::Spawn {
                program: self.program(),
                source,
            })?;

        if !out.status.success() {
            return Err(ExportError::Failed {
                program: self.program(),
                status: out.status,
                output: job.output.clone(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// `<dest_dir>/<stem>.<format>`
pub fn output_path(dest_dir: &Path, stem: &str, format: &str) -> PathBuf {
    dest_dir.join(format!("{stem}.{format}"))
}

/// Exports items through a [`Transcoder`].
#[derive(Debug, Clone, Default)]
pub struct Exporter<T = Ffmpeg> {
    transcoder: T,
}

impl<T: Transcoder> Exporter<T> {
    pub fn new(transcoder: T) -> Self {
        Self { transcoder }
    }

    pub fn transcoder(&self) -> &T {
        &self.transcoder
    }

    /// Export `item` to `<dest_dir>/<name(item)>.<format>` and return that path.
    pub fn export(
        &self,
        kind: ExportKind,
        item: &MediaItem,
        dest_dir: &Path,
        format: &str,
        copy: bool,
        name: &NameFn,
    ) -> Result<PathBuf, ExportError> {
        let output = output_path(dest_dir, &name(item), format);
        self.export_to(kind, item, &output, copy)?;
        Ok(output)
    }

    /// Export `item` to an already chosen output path.
    pub fn export_to(
        &self,
        kind: ExportKind,
        item: &MediaItem,
        output: &Path,
        copy: bool,
    ) -> Result<(), ExportError> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ExportError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let job = TranscodeJob {
            inputs: kind.inputs(item),
            output: output.to_path_buf(),
            copy,
        };
        self.transcoder.run(&job)
    }

    /// Video track only, without audio.
    pub fn extract_video(
        &self,
        item: &MediaItem,
        dest_dir: &Path,
        format: &str,
        copy: bool,
        name: &NameFn,
    ) -> Result<PathBuf, ExportError> {
        self.export(ExportKind::Video, item, dest_dir, format, copy, name)
    }

    /// Audio track only.
    pub fn extract_audio(
        &self,
        item: &MediaItem,
        dest_dir: &Path,
        format: &str,
        copy: bool,
        name: &NameFn,
    ) -> Result<PathBuf, ExportError> {
        self.export(ExportKind::Audio, item, dest_dir, format, copy, name)
    }

    /// Both tracks muxed into one file.
    pub fn extract_and_merge(
        &self,
        item: &MediaItem,
        dest_dir: &Path,
        format: &str,
        copy: bool,
        name: &NameFn,
    ) -> Result<PathBuf, ExportError> {
        self.export(ExportKind::Merged, item, dest_dir, format, copy, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::default_name;
    use crate::testutil::write_item;
    use std::ffi::OsStr;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct Recorder {
        jobs: Mutex<Vec<TranscodeJob>>,
    }

    impl Transcoder for Recorder {
        fn run(&self, job: &TranscodeJob) -> Result<(), ExportError> {
            self.jobs.lock().unwrap().push(job.clone());
            Ok(())
        }
    }

    fn item() -> (tempfile::TempDir, MediaItem) {
        let dir = tempdir().unwrap();
        let path = write_item(dir.path(), "c_1", "EP1", "Show");
        let item = MediaItem::open(&path).unwrap();
        (dir, item)
    }

    #[test]
    fn test_ffmpeg_command_line() {
        let job = TranscodeJob {
            inputs: vec![PathBuf::from("a.m4s"), PathBuf::from("v.m4s")],
            output: PathBuf::from("out/EP1.mp4"),
            copy: true,
        };
        let cmd = Ffmpeg::default().build_command(&job);
        assert_eq!(cmd.get_program(), OsStr::new("ffmpeg"));

        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            [
                "-y", "-hide_banner", "-loglevel", "error", "-i", "a.m4s", "-i", "v.m4s", "-c",
                "copy", "out/EP1.mp4"
            ]
        );
    }

    #[test]
    fn test_ffmpeg_reencode_has_no_codec_flag() {
        let job = TranscodeJob {
            inputs: vec![PathBuf::from("a.m4s")],
            output: PathBuf::from("EP1.mp3"),
            copy: false,
        };
        let cmd = Ffmpeg::new("/opt/ffmpeg/bin/ffmpeg").build_command(&job);
        assert_eq!(cmd.get_program(), OsStr::new("/opt/ffmpeg/bin/ffmpeg"));
        assert!(!cmd.get_args().any(|a| a == "-c"));
    }

    #[test]
    fn test_merge_passes_audio_then_video() {
        let (dir, item) = item();
        let out_dir = dir.path().join("out");
        let exporter = Exporter::new(Recorder::default());

        let out = exporter
            .extract_and_merge(&item, &out_dir, "mkv", true, &default_name)
            .unwrap();
        assert_eq!(out, out_dir.join("EP1.mkv"));
        assert!(out_dir.is_dir());

        let jobs = exporter.transcoder().jobs.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].inputs, [item.audio_path(), item.video_path()]);
        assert!(jobs[0].copy);
    }

    #[test]
    fn test_single_track_exports() {
        let (dir, item) = item();
        let exporter = Exporter::new(Recorder::default());

        exporter
            .extract_video(&item, dir.path(), "mp4", false, &default_name)
            .unwrap();
        exporter
            .extract_audio(&item, dir.path(), "mp3", false, &default_name)
            .unwrap();

        let jobs = exporter.transcoder().jobs.lock().unwrap();
        assert_eq!(jobs[0].inputs, [item.video_path()]);
        assert_eq!(jobs[0].output, dir.path().join("EP1.mp4"));
        assert_eq!(jobs[1].inputs, [item.audio_path()]);
        assert_eq!(jobs[1].output, dir.path().join("EP1.mp3"));
    }

    #[test]
    fn test_custom_naming() {
        let (dir, item) = item();
        let exporter = Exporter::new(Recorder::default());
        let name = |m: &MediaItem| format!("{} - {}", m.collection_name(), m.title());

        let out = exporter
            .export(ExportKind::Audio, &item, dir.path(), "flac", false, &name)
            .unwrap();
        assert_eq!(out, dir.path().join("Show - EP1.flac"));
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("merged".parse::<ExportKind>().unwrap(), ExportKind::Merged);
        assert_eq!("Audio".parse::<ExportKind>().unwrap(), ExportKind::Audio);
        assert!("subtitle".parse::<ExportKind>().is_err());
        assert_eq!(ExportKind::Audio.default_format(), "mp3");
        assert_eq!(ExportKind::Merged.to_string(), "merged");
    }

    #[test]
    fn test_missing_binary() {
        let (dir, item) = item();
        let exporter = Exporter::new(Ffmpeg::new(dir.path().join("no-such-ffmpeg")));
        let err = exporter
            .extract_video(&item, dir.path(), "mp4", true, &default_name)
            .unwrap_err();
        assert!(matches!(err, ExportError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit() {
        let (dir, item) = item();
        let exporter = Exporter::new(Ffmpeg::new("false"));
        let err = exporter
            .extract_video(&item, dir.path(), "mp4", true, &default_name)
            .unwrap_err();
        assert!(matches!(err, ExportError::Failed { .. }));
    }
}
