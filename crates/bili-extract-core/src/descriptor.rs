use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Fields of `entry.json` that naming and grouping rely on.
///
/// Only `title`, `cover` and `page_data.part` are required; the rest are read
/// when the client wrote them and dropped when their type is unexpected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    /// Title of the containing work
    title: String,
    /// Thumbnail URL
    cover: String,
    page_data: PageData,
    #[serde(default, deserialize_with = "lenient")]
    bvid: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    owner_name: Option<String>,
    /// Last update, in milliseconds since the epoch
    #[serde(default, deserialize_with = "lenient")]
    time_update_stamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PageData {
    /// Title of this part
    part: String,
    #[serde(default, deserialize_with = "lenient")]
    page: Option<u32>,
}

/// Optional field: any value that does not fit `T` reads as `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl MediaDescriptor {
    /// Read and parse the descriptor file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::DescriptorNotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(Error::io(path, e)),
        };
        Self::parse(path, &bytes)
    }

    /// Parse descriptor bytes; `path` is only used for error reporting.
    pub fn parse(path: &Path, bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|source| Error::DescriptorMalformed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn part_title(&self) -> &str {
        &self.page_data.part
    }

    pub fn collection_title(&self) -> &str {
        &self.title
    }

    pub fn cover_url(&self) -> &str {
        &self.cover
    }

    pub fn page(&self) -> Option<u32> {
        self.page_data.page
    }

    pub fn bvid(&self) -> Option<&str> {
        self.bvid.as_deref()
    }

    pub fn owner_name(&self) -> Option<&str> {
        self.owner_name.as_deref()
    }

    pub fn updated_at_millis(&self) -> Option<i64> {
        self.time_update_stamp
    }

    pub fn updated_at(&self) -> Option<DateTime<Local>> {
        let utc = DateTime::from_timestamp_millis(self.time_update_stamp?)?;
        Some(utc.with_timezone(&Local))
    }
}
