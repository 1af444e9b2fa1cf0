use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Couldn't list directory {path:?}: {source}")]
    ListDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Couldn't create output directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Couldn't read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Couldn't write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Couldn't resolve the current directory: {0}")]
    CurrentDir(std::io::Error),

    #[error("Chunk size must be at least 1")]
    InvalidChunkSize,

    #[error("Config Error: {0}")]
    Config(#[from] config::ConfigError),
}
