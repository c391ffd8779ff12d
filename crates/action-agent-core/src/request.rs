//! Action requests as delivered by the dispatch layer.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How the sender expects the action to be run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    /// Caller waits for the results in the direct reply.
    Blocking,
    /// Caller gets a job id straight away and collects results later.
    NonBlocking,
}

impl RequestType {
    /// Name used in log lines.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blocking => "blocking",
            Self::NonBlocking => "non-blocking",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully parsed action request.
///
/// Built once by the dispatch layer and never mutated afterwards. Execution
/// units take it by value, so there is no aliasing back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Message id of the request.
    pub id: String,
    /// Transaction id echoed in every reply.
    pub transaction_id: String,
    /// Endpoint that sent the request; all replies go here.
    pub sender: String,
    /// Module that owns the action.
    pub module: String,
    /// Action to run.
    pub action: String,
    /// Blocking or non-blocking execution.
    #[serde(rename = "type")]
    pub request_type: RequestType,
    /// Structured action parameters.
    #[serde(default)]
    pub params: Value,
    /// Serialized parameters, kept for audit logging and the job status record.
    #[serde(default)]
    pub params_txt: String,
    /// Whether a non-blocking job should reply on completion.
    #[serde(default)]
    pub notify_outcome: bool,
    /// Valid debug chunks from the parsed message.
    #[serde(default)]
    pub debug: Vec<Value>,
    /// Number of debug chunks that failed to parse.
    #[serde(default)]
    pub num_invalid_debug: usize,
}

impl ActionRequest {
    /// Create a request with no parameters or debug chunks.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        transaction_id: impl Into<String>,
        sender: impl Into<String>,
        module: impl Into<String>,
        action: impl Into<String>,
        request_type: RequestType,
    ) -> Self {
        Self {
            id: id.into(),
            transaction_id: transaction_id.into(),
            sender: sender.into(),
            module: module.into(),
            action: action.into(),
            request_type,
            params: Value::Null,
            params_txt: String::new(),
            notify_outcome: false,
            debug: Vec::new(),
            num_invalid_debug: 0,
        }
    }

    /// Attach parameters; the serialized form is derived from the value.
    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params_txt = if params.is_null() {
            String::new()
        } else {
            params.to_string()
        };
        self.params = params;
        self
    }

    /// Ask for a proactive reply when the job completes.
    #[must_use]
    pub const fn with_notify_outcome(mut self, notify: bool) -> Self {
        self.notify_outcome = notify;
        self
    }

    /// Attach debug chunks.
    #[must_use]
    pub fn with_debug(mut self, debug: Vec<Value>, num_invalid: usize) -> Self {
        self.debug = debug;
        self.num_invalid_debug = num_invalid;
        self
    }

    /// True for non-blocking requests.
    #[must_use]
    pub fn is_non_blocking(&self) -> bool {
        self.request_type == RequestType::NonBlocking
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_params_sets_text() {
        let req = ActionRequest::new("r1", "t1", "ctl", "m", "a", RequestType::Blocking)
            .with_params(json!({"path": "/tmp"}));
        assert_eq!(req.params_txt, r#"{"path":"/tmp"}"#);
    }

    #[test]
    fn test_null_params_leave_text_empty() {
        let req = ActionRequest::new("r1", "t1", "ctl", "m", "a", RequestType::Blocking)
            .with_params(Value::Null);
        assert!(req.params_txt.is_empty());
    }

    #[test]
    fn test_deserialize_request_type() {
        let req: ActionRequest = serde_json::from_value(json!({
            "id": "r1",
            "transaction_id": "t1",
            "sender": "cth://ctl",
            "module": "m",
            "action": "a",
            "type": "non_blocking",
            "notify_outcome": true
        }))
        .unwrap();
        assert!(req.is_non_blocking());
        assert!(req.notify_outcome);
        assert!(req.debug.is_empty());
        assert_eq!(req.request_type.to_string(), "non-blocking");
    }
}
