// Tue Jan 13 2026 - Alex

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("failed to open corpus {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to map corpus {path}: {source}")]
    Map {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corpus {0} is empty")]
    Empty(PathBuf),
    #[error("corpus {0} is not a regular file")]
    NotAFile(PathBuf),
    #[error("chunk index {index} out of range for {parts} readers")]
    ChunkOutOfRange { index: usize, parts: usize },
}
