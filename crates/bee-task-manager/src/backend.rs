//! `WorkloadBackend` -- the three-operation contract (`submit`/`query`/
//! `cancel`) every workload manager adapter implements, plus the canonical
//! state-mapping table for each.

use crate::error::TmError;
use crate::types::JobState;
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

#[async_trait]
pub trait WorkloadBackend: Send + Sync {
    async fn submit(&self, script: &str) -> Result<String, TmError>;
    async fn query(&self, job_id: &str) -> Result<JobState, TmError>;
    async fn cancel(&self, job_id: &str) -> Result<(), TmError>;
}

fn unmapped(raw: &str) -> JobState {
    tracing::warn!(raw_state = raw, "unmapped backend state, downgrading to zombie");
    JobState::Zombie
}

/// Slurm adapter. `submit`/`query`/`cancel` would normally shell out to
/// `sbatch`/`squeue`/`scancel` (or speak to `slurmrestd`); this build treats
/// those calls as opaque I/O behind the trait so the mapping table is the
/// part under test.
pub struct SlurmBackend;

impl SlurmBackend {
    pub fn canonical(raw: &str) -> JobState {
        match raw {
            "PENDING" => JobState::Pending,
            "RUNNING" | "CONFIGURING" | "COMPLETING" => JobState::Running,
            "COMPLETED" => JobState::Completed,
            "FAILED" | "TIMEOUT" | "NODE_FAIL" => JobState::Failed,
            "CANCELLED" => JobState::Cancelled,
            other => unmapped(other),
        }
    }
}

#[async_trait]
impl WorkloadBackend for SlurmBackend {
    async fn submit(&self, _script: &str) -> Result<String, TmError> {
        Err(TmError::SubmitFail("slurm backend not wired to a cluster in this build".into()))
    }

    async fn query(&self, _job_id: &str) -> Result<JobState, TmError> {
        Err(TmError::BackendError("slurm backend not wired to a cluster in this build".into()))
    }

    async fn cancel(&self, _job_id: &str) -> Result<(), TmError> {
        Err(TmError::BackendError("slurm backend not wired to a cluster in this build".into()))
    }
}

/// LSF adapter, same shape as `SlurmBackend`.
pub struct LsfBackend;

impl LsfBackend {
    pub fn canonical(raw: &str) -> JobState {
        match raw {
            "PEND" => JobState::Pending,
            "RUN" => JobState::Running,
            "DONE" => JobState::Completed,
            "QUIT" => JobState::Failed,
            "PSUSP" | "USUSP" | "SSUSP" => JobState::Paused,
            other => unmapped(other),
        }
    }
}

#[async_trait]
impl WorkloadBackend for LsfBackend {
    async fn submit(&self, _script: &str) -> Result<String, TmError> {
        Err(TmError::SubmitFail("lsf backend not wired to a cluster in this build".into()))
    }

    async fn query(&self, _job_id: &str) -> Result<JobState, TmError> {
        Err(TmError::BackendError("lsf backend not wired to a cluster in this build".into()))
    }

    async fn cancel(&self, _job_id: &str) -> Result<(), TmError> {
        Err(TmError::BackendError("lsf backend not wired to a cluster in this build".into()))
    }
}

/// The "no workload manager" backend: runs the job script as a plain local
/// process and derives canonical state from its exit status. Exists for
/// single-node development and the test suite.
#[derive(Default)]
pub struct SimpleBackend {
    children: Mutex<HashMap<String, Child>>,
}

impl SimpleBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkloadBackend for SimpleBackend {
    async fn submit(&self, script: &str) -> Result<String, TmError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        let child = cmd
            .spawn()
            .map_err(|e| TmError::SubmitFail(format!("failed to spawn job: {e}")))?;
        let job_id = child
            .id()
            .ok_or_else(|| TmError::SubmitFail("spawned process has no pid".to_string()))?
            .to_string();
        self.children.lock().await.insert(job_id.clone(), child);
        Ok(job_id)
    }

    async fn query(&self, job_id: &str) -> Result<JobState, TmError> {
        let mut children = self.children.lock().await;
        let Some(child) = children.get_mut(job_id) else {
            return Ok(JobState::Zombie);
        };
        match child.try_wait() {
            Ok(None) => Ok(JobState::Running),
            Ok(Some(status)) => {
                children.remove(job_id);
                Ok(if status.success() {
                    JobState::Completed
                } else {
                    JobState::Failed
                })
            }
            Err(e) => Err(TmError::BackendError(format!("wait failed: {e}"))),
        }
    }

    async fn cancel(&self, job_id: &str) -> Result<(), TmError> {
        let mut children = self.children.lock().await;
        if let Some(mut child) = children.remove(job_id) {
            child
                .kill()
                .await
                .map_err(|e| TmError::BackendError(format!("kill failed: {e}")))?;
        }
        Ok(())
    }
}
