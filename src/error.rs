use std::path::PathBuf;

use thiserror::Error;

/// Library error type for picture-frame operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The configured picture directory is missing or not a directory.
    #[error("invalid picture directory: {0}")]
    BadDir(String),

    /// An image could not be opened or decoded.
    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The file is listed in the catalog but no decoder is built in for it.
    #[error("no decoder for {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Moving a picture into the deleted-pictures directory failed.
    #[error("failed to move {} into {}: {source}", .path.display(), .dest.display())]
    Quarantine {
        path: PathBuf,
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Image buffer manipulation failed (resize, composite).
    #[error("image processing error: {0}")]
    Processing(String),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn decode(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Decode {
            path: path.into(),
            source,
        }
    }
}
