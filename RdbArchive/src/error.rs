//! Error types for `RdbArchive`

use std::path::PathBuf;

use thiserror::Error;

/// The error type for `RdbArchive` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Batch Configuration Errors ====================
    /// The dispatcher was used in a state that does not allow the call,
    /// e.g. configuring or starting while a batch is still running.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A selected hash does not resolve to any entry in the archive.
    #[error("no archive entry with hash {hash:08x}")]
    EntryNotFound {
        /// The unresolved hash.
        hash: u32,
    },

    /// A job references an entry index past the end of the archive.
    #[error("entry index {index} out of range (archive has {count} entries)")]
    EntryOutOfRange {
        /// The requested entry index.
        index: usize,
        /// The number of entries in the archive.
        count: usize,
    },

    // ==================== Extraction Errors ====================
    /// The archive could not extract one entry.
    #[error("failed to extract entry {entry} to {}: {message}", path.display())]
    ExtractionFailed {
        /// The entry index.
        entry: usize,
        /// The destination path.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    // ==================== File System Errors ====================
    /// Invalid file path (absolute, or escaping the output directory).
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Directory traversal error.
    #[error("directory walk error: {0}")]
    WalkDirError(String),
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDirError(err.to_string())
    }
}

/// A specialized Result type for `RdbArchive` operations.
pub type Result<T> = std::result::Result<T, Error>;
