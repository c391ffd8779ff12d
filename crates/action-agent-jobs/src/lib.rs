//! Job bookkeeping for the action request agent.
//!
//! Provides:
//! - `ResultsStorage` - on-disk status and output files of one job
//! - `read_status` / `JobArtifacts` - readers for status pollers
//! - `TaskRegistry` - running execution units and their reclamation

pub mod registry;
pub mod storage;

pub use registry::TaskRegistry;
pub use storage::{
    JobArtifacts, JobStatus, ResultsStorage, StatusRecord, StorageError, read_status,
};
