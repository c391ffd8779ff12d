//! Request processor: entry point for every action request.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, atomic::AtomicBool},
};

use action_agent_core::{ActionRequest, AgentConfig, Connector, JobId, Module, RequestType};
use action_agent_jobs::{ResultsStorage, TaskRegistry};
use tokio::sync::oneshot;

use crate::{
    ProcessorError, Replier,
    task::{NonBlockingJob, non_blocking_action_task},
};

/// Runs action requests and drives the reply protocol.
///
/// Blocking requests run inline and are answered with a blocking response.
/// Non-blocking requests get a job directory under the spool root, an
/// execution unit of their own, and an immediate provisional response.
///
/// Safe to call concurrently for distinct requests.
pub struct RequestProcessor {
    replier: Replier,
    spool_dir: PathBuf,
    registry: TaskRegistry,
}

impl RequestProcessor {
    /// Create a processor, creating the spool directory if needed.
    ///
    /// # Errors
    /// Returns a fatal error if the spool directory cannot be created.
    pub fn new(connector: Arc<dyn Connector>, config: AgentConfig) -> Result<Self, ProcessorError> {
        let AgentConfig {
            spool_dir,
            msg_timeout,
        } = config;

        if !spool_dir.exists() {
            tracing::info!("Creating spool directory '{}'", spool_dir.display());
            std::fs::create_dir_all(&spool_dir).map_err(|source| ProcessorError::Fatal {
                path: spool_dir.clone(),
                source,
            })?;
        }

        Ok(Self {
            replier: Replier::new(connector, msg_timeout),
            spool_dir,
            registry: TaskRegistry::new("action-jobs"),
        })
    }

    /// Root under which job directories are created.
    #[must_use]
    pub fn spool_dir(&self) -> &Path {
        &self.spool_dir
    }

    /// Directory holding the result files of `job_id`.
    #[must_use]
    pub fn job_dir(&self, job_id: &JobId) -> PathBuf {
        self.spool_dir.join(job_id.as_str())
    }

    /// Number of execution units not yet reclaimed.
    #[must_use]
    pub fn tracked_jobs(&self) -> usize {
        self.registry.len()
    }

    /// Wait for every running job to finish.
    pub async fn wait_for_jobs(&self) {
        self.registry.join_all().await;
    }

    /// Process one request.
    ///
    /// Never fails: request errors become RPC error replies and job start-up
    /// failures are reported in the provisional response.
    pub async fn process_request(&self, module: Arc<dyn Module>, request: ActionRequest) {
        tracing::info!(
            request_id = %request.id,
            transaction_id = %request.transaction_id,
            sender = %request.sender,
            "Processing {} request {}: '{} {}' with input {}",
            request.request_type,
            request.id,
            request.module,
            request.action,
            if request.params_txt.is_empty() { "none" } else { request.params_txt.as_str() }
        );

        let result = match request.request_type {
            RequestType::Blocking => self.process_blocking_request(module.as_ref(), &request).await,
            RequestType::NonBlocking => {
                self.process_non_blocking_request(module, &request, &JobId::generate())
                    .await;
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::error!(
                request_id = %request.id,
                kind = ?e.kind(),
                "Failed to process {} request {} by {}, transaction {}: {e}",
                request.request_type,
                request.id,
                request.sender,
                request.transaction_id
            );
            self.replier.reply_rpc_error(&request, &e.to_string()).await;
        }
    }

    /// Send a connection-level error to `endpoints`.
    pub async fn reply_core_error(&self, request_id: &str, description: &str, endpoints: &[String]) {
        self.replier
            .reply_core_error(request_id, description, endpoints)
            .await;
    }

    async fn process_blocking_request(
        &self,
        module: &dyn Module,
        request: &ActionRequest,
    ) -> Result<(), ProcessorError> {
        let outcome = module.execute_action(request).await?;
        self.replier.reply_blocking(request, outcome.results()).await;
        Ok(())
    }

    async fn process_non_blocking_request(
        &self,
        module: Arc<dyn Module>,
        request: &ActionRequest,
        job_id: &JobId,
    ) {
        let (provisional_tx, provisional_rx) = oneshot::channel();

        let err_msg = match self.start_job(module, request, job_id, provisional_rx).await {
            Ok(()) => String::new(),
            Err(e) => {
                tracing::error!(
                    request_id = %request.id,
                    job_id = %job_id,
                    kind = ?e.kind(),
                    "Failed to start '{} {}' job: {e}",
                    request.module,
                    request.action
                );
                e.to_string()
            }
        };

        self.replier
            .reply_provisional(request, job_id, &err_msg)
            .await;
        // The unit may already have finished; it is fine if nobody listens.
        let _ = provisional_tx.send(());
    }

    async fn start_job(
        &self,
        module: Arc<dyn Module>,
        request: &ActionRequest,
        job_id: &JobId,
        provisional_sent: oneshot::Receiver<()>,
    ) -> Result<(), ProcessorError> {
        // Checked before touching the disk so a unit that cannot run leaves
        // no `running` job behind.
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ProcessorError::Spawn(e.to_string()))?;
        let results_dir = self.job_dir(job_id);

        if !results_dir.exists() {
            tracing::debug!(
                job_id = %job_id,
                "Creating results directory for the '{} {}' job for request transaction {}",
                request.module,
                request.action,
                request.transaction_id
            );
            tokio::fs::create_dir(&results_dir).await.map_err(|e| {
                ProcessorError::RequestProcessing(format!(
                    "failed to create directory '{}': {e}",
                    results_dir.display()
                ))
            })?;
        }

        let storage = ResultsStorage::create(request, &results_dir).await?;

        tracing::debug!(
            request_id = %request.id,
            job_id = %job_id,
            "Starting '{} {}' job for non-blocking request {} by {}, transaction {}",
            request.module,
            request.action,
            request.id,
            request.sender,
            request.transaction_id
        );

        let done = Arc::new(AtomicBool::new(false));
        let handle = runtime.spawn(non_blocking_action_task(NonBlockingJob {
            module,
            request: request.clone(),
            job_id: job_id.clone(),
            storage,
            replier: self.replier.clone(),
            provisional_sent,
            done: Arc::clone(&done),
        }));
        self.registry.add(handle, done);

        Ok(())
    }
}
