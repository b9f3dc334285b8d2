use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("RdbArchive error: {0}")]
    Archive(#[from] rdbarchive::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
