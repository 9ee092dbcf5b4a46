//! Error types for archive packaging operations.
//!
//! Covers manifest failures propagated from the reader, I/O failures while
//! walking the add-on or writing the archive, and compression errors.

use crate::error::Condition;
use crate::manifest::ManifestError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors arising from packaging a single add-on.
#[derive(Debug, Error)]
pub enum PackagingError {
    /// The add-on's manifest could not be read; passed through unchanged.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// An I/O operation failed (walking sources, writing the archive).
    #[error("I/O error while packaging {path}: {source}")]
    Io {
        /// The file or directory being processed.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The zip writer rejected an entry or failed to finish the archive.
    #[error("failed to write archive {path}: {source}")]
    Zip {
        /// The archive being written.
        path: Utf8PathBuf,
        /// The underlying compression error.
        #[source]
        source: zip::result::ZipError,
    },

    /// A source file name is not valid UTF-8 and cannot become an entry name.
    #[error("file name is not valid UTF-8: {0}")]
    NonUtf8Path(std::path::PathBuf),
}

impl PackagingError {
    /// Return the user-visible condition for this failure.
    #[must_use]
    pub const fn condition(&self) -> Condition {
        match self {
            Self::Manifest(err) => err.condition(),
            Self::Io { .. } | Self::Zip { .. } | Self::NonUtf8Path(_) => {
                Condition::ArchiveWriteFailure
            }
        }
    }
}
