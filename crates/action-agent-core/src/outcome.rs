//! Action outcomes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of running one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Output captured from an external process.
    External { stdout: String, stderr: String },
    /// Structured result from in-process module logic.
    Internal { results: Value },
}

impl ActionOutcome {
    /// Outcome of an external process.
    #[must_use]
    pub fn external(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::External {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Outcome of in-process logic.
    #[must_use]
    pub const fn internal(results: Value) -> Self {
        Self::Internal { results }
    }

    /// Value carried in the `results` field of replies.
    ///
    /// External stdout is parsed as JSON when possible and passed as a string
    /// otherwise.
    #[must_use]
    pub fn results(&self) -> Value {
        match self {
            Self::Internal { results } => results.clone(),
            Self::External { stdout, .. } => serde_json::from_str(stdout)
                .unwrap_or_else(|_| Value::String(stdout.clone())),
        }
    }
}
