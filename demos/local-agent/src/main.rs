//! Local agent reading action requests from stdin.
//!
//! Run with: cargo run -p local-agent
//!
//! Each stdin line is a JSON action request, e.g.
//! `{"id":"r1","transaction_id":"t1","sender":"cth://me","module":"echo","action":"sleep","type":"non_blocking","params":{"secs":1},"notify_outcome":true}`
//!
//! Outbound messages are printed to stdout, one JSON envelope per line. Job
//! results land under `$ACTION_AGENT_SPOOL_DIR` (default `./spool`).

use std::{collections::HashMap, sync::Arc, time::Duration};

use action_agent_core::{ActionOutcome, ActionRequest, AgentConfig, Module, RequestError};
use action_agent_executor::RequestProcessor;
use action_agent_transport::ChannelConnector;
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    task::JoinSet,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Built-in module: `echo` returns its params, `sleep` waits `secs` first.
struct EchoModule;

#[async_trait]
impl Module for EchoModule {
    fn name(&self) -> &str {
        "echo"
    }

    async fn execute_action(&self, request: &ActionRequest) -> Result<ActionOutcome, RequestError> {
        match request.action.as_str() {
            "echo" => Ok(ActionOutcome::internal(request.params.clone())),
            "sleep" => {
                let secs = request
                    .params
                    .get("secs")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| RequestError::InvalidParams("'secs' must be an integer".into()))?;
                tokio::time::sleep(Duration::from_secs(secs)).await;
                Ok(ActionOutcome::internal(json!({ "slept": secs })))
            }
            _ => Err(RequestError::UnknownAction {
                module: request.module.clone(),
                action: request.action.clone(),
            }),
        }
    }
}

/// Stand-in for modules that are not installed.
struct MissingModule;

#[async_trait]
impl Module for MissingModule {
    fn name(&self) -> &str {
        "missing"
    }

    async fn execute_action(&self, request: &ActionRequest) -> Result<ActionOutcome, RequestError> {
        Err(RequestError::Execution(format!(
            "unknown module '{}'",
            request.module
        )))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout only carries envelopes.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AgentConfig::from_env().unwrap_or_else(|| AgentConfig::new("spool"));
    tracing::info!("Using spool directory '{}'", config.spool_dir.display());

    let (connector, mut outbound) = ChannelConnector::new(256);
    let processor = Arc::new(RequestProcessor::new(Arc::new(connector), config)?);

    // Forward outbound envelopes to stdout.
    let writer_task = tokio::spawn(async move {
        while let Some(envelope) = outbound.recv().await {
            match serde_json::to_string(&envelope) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::error!("Failed to serialize envelope: {e}"),
            }
        }
    });

    let mut modules: HashMap<String, Arc<dyn Module>> = HashMap::new();
    let echo: Arc<dyn Module> = Arc::new(EchoModule);
    modules.insert(echo.name().to_string(), echo);
    let missing: Arc<dyn Module> = Arc::new(MissingModule);

    let mut in_flight = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let mut request: ActionRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Invalid request: {e}");
                report_invalid(&processor, &line, &e.to_string()).await;
                continue;
            }
        };
        if request.params_txt.is_empty() && !request.params.is_null() {
            request.params_txt = request.params.to_string();
        }

        let module = modules
            .get(&request.module)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&missing));
        let processor = Arc::clone(&processor);
        in_flight.spawn(async move { processor.process_request(module, request).await });
    }

    while let Some(res) = in_flight.join_next().await {
        if let Err(e) = res {
            tracing::error!("Request handler failed: {e}");
        }
    }
    processor.wait_for_jobs().await;
    drop(processor);
    writer_task.await?;

    Ok(())
}

/// Tell the sender of an unparseable request, when we can tell who it is.
async fn report_invalid(processor: &RequestProcessor, line: &str, description: &str) {
    let Ok(raw) = serde_json::from_str::<Value>(line) else {
        return;
    };
    let (Some(id), Some(sender)) = (
        raw.get("id").and_then(Value::as_str),
        raw.get("sender").and_then(Value::as_str),
    ) else {
        return;
    };
    processor
        .reply_core_error(id, description, &[sender.to_string()])
        .await;
}
