#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bili_extract_core::{ExportError, TranscodeJob, Transcoder};

/// Create `<parent>/<name>` laid out the way the client stores a download.
pub fn write_item(parent: &Path, name: &str, part: &str, collection: &str) -> PathBuf {
    write_item_with(
        parent,
        name,
        serde_json::json!({
            "title": collection,
            "cover": "http://i0.hdslb.com/bfs/archive/cover.jpg",
            "page_data": { "part": part },
        }),
    )
}

pub fn write_item_with(parent: &Path, name: &str, entry: serde_json::Value) -> PathBuf {
    let dir = parent.join(name);
    fs::create_dir_all(dir.join("16")).unwrap();
    fs::write(dir.join("entry.json"), entry.to_string()).unwrap();
    fs::write(dir.join("16").join("video.m4s"), b"video").unwrap();
    fs::write(dir.join("16").join("audio.m4s"), b"audio").unwrap();
    dir
}

/// Stands in for ffmpeg: records each job and concatenates the inputs into
/// the output file.
#[derive(Default)]
pub struct FakeTranscoder {
    pub jobs: Mutex<Vec<TranscodeJob>>,
}

impl Transcoder for FakeTranscoder {
    fn run(&self, job: &TranscodeJob) -> Result<(), ExportError> {
        let mut data = Vec::new();
        for input in &job.inputs {
            data.extend(fs::read(input).map_err(|source| ExportError::Spawn {
                program: "fake".to_string(),
                source,
            })?);
        }
        fs::write(&job.output, data).map_err(|source| ExportError::Spawn {
            program: "fake".to_string(),
            source,
        })?;
        self.jobs.lock().unwrap().push(job.clone());
        Ok(())
    }
}
