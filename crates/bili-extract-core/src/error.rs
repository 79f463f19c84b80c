use std::path::PathBuf;

/// Errors raised while scanning a download directory.
///
/// Every variant is fatal to the scan that produced it: nothing is skipped
/// and no partial catalog is returned.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("download root not found or not a directory: {}", path.display())]
    ScanRootNotFound { path: PathBuf },

    #[error("descriptor not found: {}", path.display())]
    DescriptorNotFound { path: PathBuf },

    #[error("malformed descriptor {}: {source}", path.display())]
    DescriptorMalformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("collection folder has no items: {}", path.display())]
    EmptyCollection { path: PathBuf },

    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
