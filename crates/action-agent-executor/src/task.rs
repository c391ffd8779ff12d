//! Body of a non-blocking job.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use action_agent_core::{ActionRequest, JobId, Module};
use action_agent_jobs::ResultsStorage;
use tokio::sync::oneshot;

use crate::Replier;

/// Sets the completion flag when dropped, on every exit path of the unit.
pub struct DoneGuard(Arc<AtomicBool>);

impl DoneGuard {
    #[must_use]
    pub const fn new(done: Arc<AtomicBool>) -> Self {
        Self(done)
    }
}

impl Drop for DoneGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Everything one execution unit owns.
pub struct NonBlockingJob {
    pub module: Arc<dyn Module>,
    pub request: ActionRequest,
    pub job_id: JobId,
    pub storage: ResultsStorage,
    pub replier: Replier,
    /// Resolves once the provisional response has gone out.
    pub provisional_sent: oneshot::Receiver<()>,
    pub done: Arc<AtomicBool>,
}

/// Format an elapsed time the way the status file records it.
#[must_use]
pub fn format_duration(elapsed: Duration) -> String {
    format!("{:.6} s", elapsed.as_secs_f64())
}

/// Run the action, reply if asked to, and record the results on disk.
///
/// Only request errors from the module are handled here; anything else
/// unwinds, and the done flag is still set by the guard.
pub async fn non_blocking_action_task(job: NonBlockingJob) {
    let NonBlockingJob {
        module,
        request,
        job_id,
        mut storage,
        replier,
        provisional_sent,
        done,
    } = job;
    let _done = DoneGuard::new(done);
    let start = Instant::now();

    let result = module.execute_action(&request).await;
    // Only the action itself is timed, not the replies around it.
    let duration = format_duration(start.elapsed());

    // Replies for this job must not overtake its provisional response. A
    // dropped sender means the orchestrator is gone; carry on regardless.
    let _ = provisional_sent.await;

    let (outcome, exec_error) = match result {
        Ok(outcome) => {
            if request.notify_outcome {
                replier
                    .reply_non_blocking(&request, outcome.results(), &job_id)
                    .await;
            }
            (Some(outcome), String::new())
        }
        Err(e) => {
            let exec_error = e.to_string();
            tracing::warn!(
                job_id = %job_id,
                module = %request.module,
                action = %request.action,
                "Job failed: {exec_error}"
            );
            replier.reply_rpc_error(&request, &exec_error).await;
            (None, exec_error)
        }
    };

    if let Err(e) = storage.write(outcome.as_ref(), &exec_error, &duration).await {
        tracing::error!(
            job_id = %job_id,
            "Failed to store results of the '{} {}' job: {e}",
            request.module,
            request.action
        );
    }

    tracing::debug!(job_id = %job_id, %duration, "Job completed");
}
