//! Collaborator traits: modules that run actions and the outbound connector.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::{ActionOutcome, ActionRequest};

/// Identifier of one non-blocking job; also the name of its spool directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh job id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the id as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failure to run a requested action. Always answered with an RPC error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("unknown action '{action}' for module '{module}'")]
    UnknownAction { module: String, action: String },
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    #[error("{0}")]
    Execution(String),
}

/// Transport failure on an outbound send.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("send timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection closed")]
    Closed,
    #[error("transport error: {0}")]
    Transport(String),
}

/// A module that knows how to run its actions.
///
/// Execution may be slow or spawn external processes; the blocking path
/// awaits it inline and the non-blocking path awaits it on a detached task.
#[async_trait]
pub trait Module: Send + Sync {
    /// Module name.
    fn name(&self) -> &str;

    /// Run the action named by the request.
    async fn execute_action(&self, request: &ActionRequest) -> Result<ActionOutcome, RequestError>;
}

/// Outbound side of the pub/sub connection.
///
/// Shared by the orchestrator and every execution unit, so implementations
/// must tolerate concurrent sends.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Send one message to `recipients`, giving up after `timeout`.
    async fn send(
        &self,
        recipients: &[String],
        message_type: &str,
        timeout: Duration,
        data: Value,
        debug: &[Value],
    ) -> Result<(), ConnectionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_ids_are_unique() {
        assert_ne!(JobId::generate(), JobId::generate());
    }

    #[test]
    fn test_unknown_action_message() {
        let err = RequestError::UnknownAction {
            module: "pkg".into(),
            action: "nuke".into(),
        };
        assert_eq!(err.to_string(), "unknown action 'nuke' for module 'pkg'");
    }
}
