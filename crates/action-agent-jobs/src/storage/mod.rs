//! Durable storage of non-blocking job results.

use std::path::PathBuf;

use thiserror::Error;

pub mod results;

pub use results::{JobArtifacts, JobStatus, ResultsStorage, StatusRecord, read_status};

/// Storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed status record: {0}")]
    Serialize(#[from] serde_json::Error),
}
