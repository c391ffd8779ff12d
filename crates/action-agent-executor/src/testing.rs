//! Test doubles for connectors and modules.

use std::{
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use action_agent_core::{
    ActionOutcome, ActionRequest, ConnectionError, Connector, Module, RequestError, RequestType,
};
use action_agent_transport::Envelope;
use async_trait::async_trait;
use serde_json::Value;

pub fn request(request_type: RequestType) -> ActionRequest {
    ActionRequest::new("r1", "t1", "cth://controller", "m", "a", request_type)
}

/// Records every envelope, optionally after a delay.
#[derive(Default)]
pub struct RecordingConnector {
    sent: Mutex<Vec<Envelope>>,
    delay: Option<Duration>,
}

impl RecordingConnector {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            sent: Mutex::default(),
            delay: Some(delay),
        }
    }

    pub fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for RecordingConnector {
    async fn send(
        &self,
        recipients: &[String],
        message_type: &str,
        _timeout: Duration,
        data: Value,
        debug: &[Value],
    ) -> Result<(), ConnectionError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.sent.lock().unwrap().push(Envelope {
            recipients: recipients.to_vec(),
            message_type: message_type.to_string(),
            data,
            debug: debug.to_vec(),
        });
        Ok(())
    }
}

/// Fails every send.
#[derive(Default)]
pub struct FailingConnector {
    attempts: AtomicUsize,
}

impl FailingConnector {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FailingConnector {
    async fn send(
        &self,
        _recipients: &[String],
        _message_type: &str,
        _timeout: Duration,
        _data: Value,
        _debug: &[Value],
    ) -> Result<(), ConnectionError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ConnectionError::Transport("broker unreachable".to_string()))
    }
}

enum Script {
    Ok(ActionOutcome),
    Err(RequestError),
    Panic,
}

/// Module that returns a fixed result.
pub struct ScriptedModule {
    script: Script,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedModule {
    fn new(script: Script, delay: Option<Duration>) -> Self {
        Self {
            script,
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn ok(outcome: ActionOutcome) -> Self {
        Self::new(Script::Ok(outcome), None)
    }

    pub fn err(error: RequestError) -> Self {
        Self::new(Script::Err(error), None)
    }

    pub fn slow(outcome: ActionOutcome, delay: Duration) -> Self {
        Self::new(Script::Ok(outcome), Some(delay))
    }

    pub fn panicking() -> Self {
        Self::new(Script::Panic, None)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Module for ScriptedModule {
    fn name(&self) -> &str {
        "m"
    }

    async fn execute_action(&self, _request: &ActionRequest) -> Result<ActionOutcome, RequestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.script {
            Script::Ok(outcome) => Ok(outcome.clone()),
            Script::Err(error) => Err(error.clone()),
            Script::Panic => panic!("module crashed"),
        }
    }
}
