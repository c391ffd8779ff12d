//! Registry of running execution units.

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use futures::FutureExt;
use tokio::task::JoinHandle;

/// A spawned unit and the flag it sets when it is done.
struct RunningTask {
    handle: JoinHandle<()>,
    done: Arc<AtomicBool>,
}

/// Keeps the handles of running execution units and reclaims finished ones.
///
/// The stored list is the only state shared between the spawning side and
/// the units themselves; the units only ever touch their own `done` flag.
pub struct TaskRegistry {
    name: String,
    tasks: Mutex<Vec<RunningTask>>,
}

impl TaskRegistry {
    /// Create an empty registry; `name` shows up in log lines.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Track a spawned unit, reclaiming any that have already finished.
    ///
    /// Never waits on a running unit.
    pub fn add(&self, handle: JoinHandle<()>, done: Arc<AtomicBool>) {
        let mut tasks = self.lock();
        self.reap(&mut tasks);
        tasks.push(RunningTask { handle, done });
        tracing::trace!(registry = %self.name, tracked = tasks.len(), "Task added");
    }

    /// Number of tracked units, including finished ones not yet reclaimed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Reclaim finished units now.
    pub fn reap_finished(&self) {
        let mut tasks = self.lock();
        self.reap(&mut tasks);
    }

    /// Wait for every tracked unit to finish.
    pub async fn join_all(&self) {
        let tasks = std::mem::take(&mut *self.lock());
        if !tasks.is_empty() {
            tracing::debug!(registry = %self.name, "Waiting for {} task(s)", tasks.len());
        }
        for task in tasks {
            if let Err(e) = task.handle.await {
                tracing::error!(registry = %self.name, "Task failed: {e}");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RunningTask>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reap(&self, tasks: &mut Vec<RunningTask>) {
        tasks.retain_mut(|task| {
            if !task.done.load(Ordering::Acquire) {
                return true;
            }
            // The flag is set just before the task returns; keep it until
            // the handle actually resolves.
            match (&mut task.handle).now_or_never() {
                None => true,
                Some(Ok(())) => false,
                Some(Err(e)) => {
                    tracing::error!(registry = %self.name, "Task failed: {e}");
                    false
                }
            }
        });
    }
}

impl Drop for TaskRegistry {
    fn drop(&mut self) {
        let running = self
            .lock()
            .iter()
            .filter(|t| !t.done.load(Ordering::Acquire))
            .count();
        if running > 0 {
            tracing::warn!(
                registry = %self.name,
                "Dropping registry with {running} unit(s) still running; they are detached"
            );
        }
    }
}
