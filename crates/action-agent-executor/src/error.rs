//! Errors raised while processing a request.

use std::path::PathBuf;

use action_agent_core::{ConnectionError, RequestError};
use action_agent_jobs::StorageError;
use thiserror::Error;

/// Category of a processing error; decides which reply, if any, is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Module resolution or execution failed; answered with an RPC error.
    Request,
    /// The job directory could not be created.
    RequestProcessing,
    /// The job result files could not be initialized.
    Persistence,
    /// The execution unit could not be started.
    Spawn,
    /// An outbound send failed; logged and dropped.
    Transport,
    /// The processor cannot start at all.
    Fatal,
}

/// Request processor error.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("{0}")]
    RequestProcessing(String),
    #[error("failed to initialize result files: {0}")]
    Persistence(#[from] StorageError),
    #[error("failed to start action task: {0}")]
    Spawn(String),
    #[error(transparent)]
    Transport(#[from] ConnectionError),
    #[error("failed to create the results directory '{}': {source}", .path.display())]
    Fatal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessorError {
    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Request(_) => ErrorKind::Request,
            Self::RequestProcessing(_) => ErrorKind::RequestProcessing,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::Spawn(_) => ErrorKind::Spawn,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Fatal { .. } => ErrorKind::Fatal,
        }
    }
}
