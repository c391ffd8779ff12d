//! In-process connector backed by a tokio channel.
//!
//! Envelopes are forwarded to a receiver owned by whatever actually writes to
//! the wire (a socket task, stdout, a test).

use std::time::Duration;

use action_agent_core::{ConnectionError, Connector};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc::{self, error::SendTimeoutError};

use crate::protocol::Envelope;

/// Connector that hands envelopes to a bounded mpsc channel.
#[derive(Clone)]
pub struct ChannelConnector {
    tx: mpsc::Sender<Envelope>,
}

impl ChannelConnector {
    /// Create a connector and the receiver that drains it.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Connector for ChannelConnector {
    async fn send(
        &self,
        recipients: &[String],
        message_type: &str,
        timeout: Duration,
        data: Value,
        debug: &[Value],
    ) -> Result<(), ConnectionError> {
        if recipients.is_empty() {
            return Err(ConnectionError::Transport("no recipients".to_string()));
        }

        let envelope = Envelope {
            recipients: recipients.to_vec(),
            message_type: message_type.to_string(),
            data,
            debug: debug.to_vec(),
        };

        self.tx
            .send_timeout(envelope, timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => ConnectionError::Timeout(timeout),
                SendTimeoutError::Closed(_) => ConnectionError::Closed,
            })
    }
}
