//! Action request orchestration.
//!
//! Provides:
//! - `RequestProcessor` - entry point for blocking and non-blocking requests
//! - `Replier` - the outbound reply protocol
//! - `non_blocking_action_task` - body of one non-blocking job

pub mod error;
pub mod processor;
pub mod reply;
pub mod task;

pub use error::{ErrorKind, ProcessorError};
pub use processor::RequestProcessor;
pub use reply::Replier;
pub use task::{DoneGuard, NonBlockingJob, non_blocking_action_task};

#[cfg(test)]
pub(crate) mod testing;
