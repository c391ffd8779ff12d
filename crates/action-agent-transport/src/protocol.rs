//! Wire protocol for replies sent back to requesters.
//!
//! Field names are part of the wire contract; do not rename them.

use action_agent_core::ActionRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Acknowledgement of a non-blocking request.
pub const PROVISIONAL_RESPONSE_TYPE: &str = "rpc_provisional_response";
/// Results of a blocking request.
pub const BLOCKING_RESPONSE_TYPE: &str = "rpc_blocking_response";
/// Results of a completed non-blocking job.
pub const NON_BLOCKING_RESPONSE_TYPE: &str = "rpc_non_blocking_response";
/// Failure to process or run a request.
pub const RPC_ERROR_MSG_TYPE: &str = "rpc_error_message";
/// Connection-level error.
pub const CORE_ERROR_MSG_TYPE: &str = "error_message";

/// A payload that knows its message type.
pub trait OutboundMessage: Serialize {
    /// Message type sent alongside the payload.
    const MESSAGE_TYPE: &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionalResponse {
    pub transaction_id: String,
    pub success: bool,
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProvisionalResponse {
    /// Build the acknowledgement; an empty `error` means the job started.
    #[must_use]
    pub fn new(transaction_id: &str, job_id: &str, error: &str) -> Self {
        Self {
            transaction_id: transaction_id.to_owned(),
            success: error.is_empty(),
            job_id: job_id.to_owned(),
            error: (!error.is_empty()).then(|| error.to_owned()),
        }
    }
}

impl OutboundMessage for ProvisionalResponse {
    const MESSAGE_TYPE: &'static str = PROVISIONAL_RESPONSE_TYPE;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockingResponse {
    pub transaction_id: String,
    pub results: Value,
}

impl OutboundMessage for BlockingResponse {
    const MESSAGE_TYPE: &'static str = BLOCKING_RESPONSE_TYPE;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonBlockingResponse {
    pub transaction_id: String,
    pub job_id: String,
    pub results: Value,
}

impl OutboundMessage for NonBlockingResponse {
    const MESSAGE_TYPE: &'static str = NON_BLOCKING_RESPONSE_TYPE;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub transaction_id: String,
    /// Id of the request that failed.
    pub id: String,
    pub description: String,
}

impl OutboundMessage for RpcError {
    const MESSAGE_TYPE: &'static str = RPC_ERROR_MSG_TYPE;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreError {
    pub id: String,
    pub description: String,
}

impl OutboundMessage for CoreError {
    const MESSAGE_TYPE: &'static str = CORE_ERROR_MSG_TYPE;
}

/// A message as handed to the connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub recipients: Vec<String>,
    pub message_type: String,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub debug: Vec<Value>,
}

/// Collect the debug chunks to echo back for a request.
///
/// Malformed chunks were dropped at parse time; their count is only logged.
#[must_use]
pub fn wrap_debug(request: &ActionRequest) -> Vec<Value> {
    let bad = request.num_invalid_debug;
    if bad > 0 {
        tracing::warn!(
            request_id = %request.id,
            "Message {} contained {} bad debug chunk{}",
            request.id,
            bad,
            if bad == 1 { "" } else { "s" }
        );
    }
    request.debug.clone()
}
