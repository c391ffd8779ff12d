//! Result files of one non-blocking job.
//!
//! Each job owns `<spool_dir>/<job_id>/` holding three newline-terminated
//! files:
//! - `status` - a JSON [`StatusRecord`]
//! - `stdout` - captured output or the serialized internal result
//! - `stderr` - captured error output or the execution failure line
//!
//! The status moves from `running` to `completed` exactly once, and it reads
//! `completed` whether or not the action succeeded. Pollers must look at
//! `stderr` to tell a failed job from a successful one.

use std::path::{Path, PathBuf};

use action_agent_core::{ActionOutcome, ActionRequest};
use serde::{Deserialize, Serialize};

use super::StorageError;

/// Name of the status file inside a job directory.
pub const STATUS_FILE: &str = "status";
/// Name of the stdout file inside a job directory.
pub const STDOUT_FILE: &str = "stdout";
/// Name of the stderr file inside a job directory.
pub const STDERR_FILE: &str = "stderr";

/// Input recorded when the request carried no parameters.
pub const NO_INPUT: &str = "none";

/// Lifecycle state recorded in the status file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
}

/// Contents of the status file. Field names are read by external tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub module: String,
    pub action: String,
    pub status: JobStatus,
    /// Elapsed wall time, e.g. `"1.250000 s"`.
    pub duration: String,
    /// Serialized request parameters, or `"none"`.
    pub input: String,
}

impl StatusRecord {
    fn running(request: &ActionRequest) -> Self {
        let input = if request.params_txt.is_empty() {
            NO_INPUT.to_string()
        } else {
            request.params_txt.clone()
        };
        Self {
            module: request.module.clone(),
            action: request.action.clone(),
            status: JobStatus::Running,
            duration: "0 s".to_string(),
            input,
        }
    }

    /// True once the job has finished, successfully or not.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }
}

/// Writer for the result files of one job.
#[derive(Debug)]
pub struct ResultsStorage {
    status: StatusRecord,
    status_path: PathBuf,
    out_path: PathBuf,
    err_path: PathBuf,
}

impl ResultsStorage {
    /// Initialize the result files in `job_dir`: empty output files and a
    /// `running` status.
    ///
    /// # Errors
    /// Returns error if any of the three files cannot be written. The job
    /// must not be started in that case.
    pub async fn create(request: &ActionRequest, job_dir: &Path) -> Result<Self, StorageError> {
        let storage = Self {
            status: StatusRecord::running(request),
            status_path: job_dir.join(STATUS_FILE),
            out_path: job_dir.join(STDOUT_FILE),
            err_path: job_dir.join(STDERR_FILE),
        };

        write_file(&storage.out_path, "").await?;
        write_file(&storage.err_path, "").await?;
        storage.write_status().await?;

        Ok(storage)
    }

    /// Current status record.
    #[must_use]
    pub const fn status(&self) -> &StatusRecord {
        &self.status
    }

    /// Record the end of the job.
    ///
    /// The status file is written first so a reader never sees `completed`
    /// next to stale output. An empty `exec_error` means the action ran and
    /// `outcome` holds its output; otherwise the failure goes to `stderr` and
    /// `stdout` stays empty. Every file is attempted even if an earlier write
    /// failed; the first error is returned.
    ///
    /// # Errors
    /// Returns the first I/O error hit.
    pub async fn write(
        &mut self,
        outcome: Option<&ActionOutcome>,
        exec_error: &str,
        duration: &str,
    ) -> Result<(), StorageError> {
        self.status.status = JobStatus::Completed;
        self.status.duration = duration.to_string();
        let status_result = self.write_status().await;

        let output_result = if exec_error.is_empty() {
            match outcome {
                Some(ActionOutcome::External { stdout, stderr }) => {
                    let out = write_file(&self.out_path, &format!("{stdout}\n")).await;
                    if stderr.is_empty() {
                        out
                    } else {
                        let err = write_file(&self.err_path, &format!("{stderr}\n")).await;
                        out.and(err)
                    }
                }
                Some(ActionOutcome::Internal { results }) => {
                    write_file(&self.out_path, &format!("{results}\n")).await
                }
                None => Ok(()),
            }
        } else {
            let msg = format!(
                "Failed to execute '{} {}': {exec_error}\n",
                self.status.module, self.status.action
            );
            write_file(&self.err_path, &msg).await
        };

        status_result.and(output_result)
    }

    async fn write_status(&self) -> Result<(), StorageError> {
        let mut text = serde_json::to_string(&self.status)?;
        text.push('\n');
        write_file(&self.status_path, &text).await
    }
}

async fn write_file(path: &Path, contents: &str) -> Result<(), StorageError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })
}

async fn read_file(path: &Path) -> Result<String, StorageError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Read the status file of a job.
///
/// # Errors
/// Returns error if the file is missing or not a valid status record.
pub async fn read_status(job_dir: &Path) -> Result<StatusRecord, StorageError> {
    let text = read_file(&job_dir.join(STATUS_FILE)).await?;
    Ok(serde_json::from_str(text.trim_end())?)
}

/// Everything a poller can learn about a job from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobArtifacts {
    pub status: StatusRecord,
    pub stdout: String,
    pub stderr: String,
}

impl JobArtifacts {
    /// Load all three files of a job.
    ///
    /// # Errors
    /// Returns error if any file is missing or the status is malformed.
    pub async fn load(job_dir: &Path) -> Result<Self, StorageError> {
        Ok(Self {
            status: read_status(job_dir).await?,
            stdout: read_file(&job_dir.join(STDOUT_FILE)).await?,
            stderr: read_file(&job_dir.join(STDERR_FILE)).await?,
        })
    }

    /// True when the job completed without an execution failure.
    ///
    /// External actions may write to stderr and still succeed, so this only
    /// looks for the failure line written by [`ResultsStorage::write`].
    /// The check is textual: an external action whose own stderr begins
    /// with `Failed to execute '` is reported as failed too.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status.is_completed() && !self.stderr.starts_with("Failed to execute '")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_agent_core::RequestType;
    use serde_json::json;
    use tempfile::TempDir;
    use tokio_test::assert_err;

    fn request() -> ActionRequest {
        ActionRequest::new("r1", "t1", "cth://ctl", "pkg", "install", RequestType::NonBlocking)
    }

    #[tokio::test]
    async fn test_create_initializes_files() {
        let dir = TempDir::new().unwrap();
        let storage = ResultsStorage::create(&request(), dir.path()).await.unwrap();
        assert_eq!(storage.status().status, JobStatus::Running);

        let artifacts = JobArtifacts::load(dir.path()).await.unwrap();
        assert_eq!(artifacts.stdout, "");
        assert_eq!(artifacts.stderr, "");
        assert_eq!(artifacts.status.duration, "0 s");
        assert_eq!(artifacts.status.input, NO_INPUT);
        assert!(!artifacts.status.is_completed());
    }

    #[tokio::test]
    async fn test_status_file_layout() {
        let dir = TempDir::new().unwrap();
        let req = request().with_params(json!({"name": "vim"}));
        ResultsStorage::create(&req, dir.path()).await.unwrap();

        let text = std::fs::read_to_string(dir.path().join(STATUS_FILE)).unwrap();
        assert!(text.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({
                "module": "pkg",
                "action": "install",
                "status": "running",
                "duration": "0 s",
                "input": r#"{"name":"vim"}"#
            })
        );
    }

    #[tokio::test]
    async fn test_create_fails_without_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let err = assert_err!(ResultsStorage::create(&request(), &missing).await);
        assert!(matches!(err, StorageError::Io { .. }));
    }

    #[tokio::test]
    async fn test_write_external_outcome() {
        let dir = TempDir::new().unwrap();
        let mut storage = ResultsStorage::create(&request(), dir.path()).await.unwrap();
        let outcome = ActionOutcome::external("installed", "deprecated flag");
        storage.write(Some(&outcome), "", "1.5 s").await.unwrap();

        let artifacts = JobArtifacts::load(dir.path()).await.unwrap();
        assert!(artifacts.status.is_completed());
        assert_eq!(artifacts.status.duration, "1.5 s");
        assert_eq!(artifacts.stdout, "installed\n");
        assert_eq!(artifacts.stderr, "deprecated flag\n");
        assert!(artifacts.succeeded());
    }

    #[tokio::test]
    async fn test_succeeded_matches_failure_line_textually() {
        let dir = TempDir::new().unwrap();
        let mut storage = ResultsStorage::create(&request(), dir.path()).await.unwrap();
        let outcome = ActionOutcome::external("", "Failed to execute 'x y': looked bad");
        storage.write(Some(&outcome), "", "0.1 s").await.unwrap();

        let artifacts = JobArtifacts::load(dir.path()).await.unwrap();
        assert!(artifacts.status.is_completed());
        assert!(!artifacts.succeeded());
    }

    #[tokio::test]
    async fn test_write_internal_outcome() {
        let dir = TempDir::new().unwrap();
        let mut storage = ResultsStorage::create(&request(), dir.path()).await.unwrap();
        let outcome = ActionOutcome::internal(json!({"version": "1.2"}));
        storage.write(Some(&outcome), "", "0.1 s").await.unwrap();

        let artifacts = JobArtifacts::load(dir.path()).await.unwrap();
        assert_eq!(artifacts.stdout, "{\"version\":\"1.2\"}\n");
        assert_eq!(artifacts.stderr, "");
    }

    #[tokio::test]
    async fn test_write_failure_is_still_completed() {
        let dir = TempDir::new().unwrap();
        let mut storage = ResultsStorage::create(&request(), dir.path()).await.unwrap();
        storage.write(None, "package not found", "0.2 s").await.unwrap();

        let artifacts = JobArtifacts::load(dir.path()).await.unwrap();
        assert!(artifacts.status.is_completed());
        assert_eq!(artifacts.stdout, "");
        assert_eq!(
            artifacts.stderr,
            "Failed to execute 'pkg install': package not found\n"
        );
        assert!(!artifacts.succeeded());
    }

    #[tokio::test]
    async fn test_write_reports_io_error_after_status() {
        let dir = TempDir::new().unwrap();
        let mut storage = ResultsStorage::create(&request(), dir.path()).await.unwrap();
        // A directory in place of stdout makes the output write fail.
        std::fs::remove_file(dir.path().join(STDOUT_FILE)).unwrap();
        std::fs::create_dir(dir.path().join(STDOUT_FILE)).unwrap();

        let outcome = ActionOutcome::internal(json!(1));
        assert_err!(storage.write(Some(&outcome), "", "0.3 s").await);

        let status = read_status(dir.path()).await.unwrap();
        assert!(status.is_completed());
        assert_eq!(status.duration, "0.3 s");
    }
}
