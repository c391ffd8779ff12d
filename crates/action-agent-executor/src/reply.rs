//! Outbound replies.
//!
//! Every send is best effort: a transport failure is logged with the full
//! request identity and dropped. Nothing is retried.

use std::{sync::Arc, time::Duration};

use action_agent_core::{ActionRequest, Connector, JobId};
use action_agent_transport::{
    BlockingResponse, CoreError, NonBlockingResponse, OutboundMessage, ProvisionalResponse,
    RpcError, wrap_debug,
};
use serde_json::Value;

use crate::ProcessorError;

/// Builds and sends the reply messages.
///
/// Cheap to clone; each execution unit holds its own copy.
#[derive(Clone)]
pub struct Replier {
    connector: Arc<dyn Connector>,
    timeout: Duration,
}

impl Replier {
    /// Create a replier sending through `connector` with `timeout` per message.
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>, timeout: Duration) -> Self {
        Self { connector, timeout }
    }

    /// Acknowledge a non-blocking request. An empty `error` means the job
    /// was started.
    pub async fn reply_provisional(&self, request: &ActionRequest, job_id: &JobId, error: &str) {
        let msg = ProvisionalResponse::new(&request.transaction_id, job_id.as_str(), error);
        let debug = wrap_debug(request);

        match self.send(&request.sender, &msg, &debug).await {
            Ok(()) => tracing::info!(
                request_id = %request.id,
                job_id = %job_id,
                "Sent provisional response for request {} by {}, transaction {}",
                request.id,
                request.sender,
                request.transaction_id
            ),
            Err(e) => tracing::error!(
                request_id = %request.id,
                kind = ?e.kind(),
                "Failed to send provisional response for request {} by {}, transaction {} \
                 (no further attempts): {e}",
                request.id,
                request.sender,
                request.transaction_id
            ),
        }
    }

    /// Send the results of a blocking request.
    pub async fn reply_blocking(&self, request: &ActionRequest, results: Value) {
        let msg = BlockingResponse {
            transaction_id: request.transaction_id.clone(),
            results,
        };
        let debug = wrap_debug(request);

        match self.send(&request.sender, &msg, &debug).await {
            Ok(()) => tracing::info!(
                request_id = %request.id,
                "Sent response for blocking request {} by {}, transaction {}",
                request.id,
                request.sender,
                request.transaction_id
            ),
            Err(e) => tracing::error!(
                request_id = %request.id,
                kind = ?e.kind(),
                "Failed to reply to blocking request {} from {}, transaction {}: {e}",
                request.id,
                request.sender,
                request.transaction_id
            ),
        }
    }

    /// Send the results of a completed non-blocking job.
    ///
    /// Debug chunks already went out with the provisional response.
    pub async fn reply_non_blocking(&self, request: &ActionRequest, results: Value, job_id: &JobId) {
        let msg = NonBlockingResponse {
            transaction_id: request.transaction_id.clone(),
            job_id: job_id.to_string(),
            results,
        };

        match self.send(&request.sender, &msg, &[]).await {
            Ok(()) => tracing::info!(
                request_id = %request.id,
                job_id = %job_id,
                "Sent response for non-blocking request {} by {}, transaction {}",
                request.id,
                request.sender,
                request.transaction_id
            ),
            Err(e) => tracing::error!(
                request_id = %request.id,
                job_id = %job_id,
                kind = ?e.kind(),
                "Failed to reply to non-blocking request {} by {}, transaction {} \
                 (no further attempts): {e}",
                request.id,
                request.sender,
                request.transaction_id
            ),
        }
    }

    /// Report a failed request to its sender.
    pub async fn reply_rpc_error(&self, request: &ActionRequest, description: &str) {
        let msg = RpcError {
            transaction_id: request.transaction_id.clone(),
            id: request.id.clone(),
            description: description.to_string(),
        };

        match self.send(&request.sender, &msg, &[]).await {
            Ok(()) => tracing::info!(
                request_id = %request.id,
                "Replied to {} request {} by {}, transaction {}, with an RPC error message",
                request.request_type,
                request.id,
                request.sender,
                request.transaction_id
            ),
            Err(e) => tracing::error!(
                request_id = %request.id,
                kind = ?e.kind(),
                "Failed to send RPC error message for {} request {} by {}, transaction {} \
                 (no further attempts): {e}",
                request.request_type,
                request.id,
                request.sender,
                request.transaction_id
            ),
        }
    }

    /// Send a connection-level error about `request_id` to `endpoints`.
    pub async fn reply_core_error(&self, request_id: &str, description: &str, endpoints: &[String]) {
        let msg = CoreError {
            id: request_id.to_string(),
            description: description.to_string(),
        };

        match self.send_to(endpoints, &msg, &[]).await {
            Ok(()) => tracing::info!(
                request_id,
                "Replied to request {request_id} with a core error message"
            ),
            Err(e) => tracing::error!(
                request_id,
                ?endpoints,
                kind = ?e.kind(),
                "Failed to send core error message for request {request_id}: {e}"
            ),
        }
    }

    async fn send<M: OutboundMessage>(
        &self,
        recipient: &str,
        msg: &M,
        debug: &[Value],
    ) -> Result<(), ProcessorError> {
        self.send_to(&[recipient.to_string()], msg, debug).await
    }

    async fn send_to<M: OutboundMessage>(
        &self,
        recipients: &[String],
        msg: &M,
        debug: &[Value],
    ) -> Result<(), ProcessorError> {
        let data = serde_json::to_value(msg).map_err(|e| {
            action_agent_core::ConnectionError::Transport(format!("cannot encode message: {e}"))
        })?;
        self.connector
            .send(recipients, M::MESSAGE_TYPE, self.timeout, data, debug)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingConnector, RecordingConnector, request};
    use action_agent_core::RequestType;
    use action_agent_transport::protocol::{
        BLOCKING_RESPONSE_TYPE, CORE_ERROR_MSG_TYPE, NON_BLOCKING_RESPONSE_TYPE,
        PROVISIONAL_RESPONSE_TYPE, RPC_ERROR_MSG_TYPE,
    };
    use serde_json::json;

    fn replier(connector: Arc<dyn Connector>) -> Replier {
        Replier::new(connector, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_provisional_carries_debug() {
        let connector = Arc::new(RecordingConnector::default());
        let req = request(RequestType::NonBlocking).with_debug(vec![json!({"hop": 1})], 1);
        let job_id = JobId::from("job-1".to_string());

        replier(connector.clone())
            .reply_provisional(&req, &job_id, "")
            .await;

        let sent = connector.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message_type, PROVISIONAL_RESPONSE_TYPE);
        assert_eq!(sent[0].recipients, vec![req.sender.clone()]);
        assert_eq!(
            sent[0].data,
            json!({"transaction_id": "t1", "success": true, "job_id": "job-1"})
        );
        assert_eq!(sent[0].debug, vec![json!({"hop": 1})]);
    }

    #[tokio::test]
    async fn test_blocking_response() {
        let connector = Arc::new(RecordingConnector::default());
        let req = request(RequestType::Blocking);

        replier(connector.clone())
            .reply_blocking(&req, json!({"answer": 42}))
            .await;

        let sent = connector.sent();
        assert_eq!(sent[0].message_type, BLOCKING_RESPONSE_TYPE);
        assert_eq!(sent[0].data["results"], json!({"answer": 42}));
        assert_eq!(sent[0].data["transaction_id"], "t1");
    }

    #[tokio::test]
    async fn test_non_blocking_response_has_no_debug() {
        let connector = Arc::new(RecordingConnector::default());
        let req = request(RequestType::NonBlocking).with_debug(vec![json!({"hop": 1})], 0);
        let job_id = JobId::from("job-9".to_string());

        replier(connector.clone())
            .reply_non_blocking(&req, json!("done"), &job_id)
            .await;

        let sent = connector.sent();
        assert_eq!(sent[0].message_type, NON_BLOCKING_RESPONSE_TYPE);
        assert_eq!(sent[0].data["job_id"], "job-9");
        assert_eq!(sent[0].data["results"], "done");
        assert!(sent[0].debug.is_empty());
    }

    #[tokio::test]
    async fn test_rpc_error() {
        let connector = Arc::new(RecordingConnector::default());
        let req = request(RequestType::Blocking);

        replier(connector.clone())
            .reply_rpc_error(&req, "unknown action")
            .await;

        let sent = connector.sent();
        assert_eq!(sent[0].message_type, RPC_ERROR_MSG_TYPE);
        assert_eq!(
            sent[0].data,
            json!({"transaction_id": "t1", "id": "r1", "description": "unknown action"})
        );
    }

    #[tokio::test]
    async fn test_core_error_goes_to_all_endpoints() {
        let connector = Arc::new(RecordingConnector::default());
        let endpoints = vec!["cth://a".to_string(), "cth://b".to_string()];

        replier(connector.clone())
            .reply_core_error("r7", "bad envelope", &endpoints)
            .await;

        let sent = connector.sent();
        assert_eq!(sent[0].message_type, CORE_ERROR_MSG_TYPE);
        assert_eq!(sent[0].recipients, endpoints);
        assert_eq!(sent[0].data, json!({"id": "r7", "description": "bad envelope"}));
    }

    #[tokio::test]
    async fn test_transport_failure_is_swallowed() {
        let connector = Arc::new(FailingConnector::default());
        let req = request(RequestType::Blocking);
        let replier = replier(connector.clone());

        replier.reply_blocking(&req, json!(null)).await;
        replier.reply_rpc_error(&req, "boom").await;

        assert_eq!(connector.attempts(), 2);
    }
}
