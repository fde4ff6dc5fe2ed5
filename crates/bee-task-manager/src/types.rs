//! Wire types shared between the WFM, the TM and its backend adapters.

use bee_common::{TaskId, WorkflowId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Node/rank shape for an MPI launch, carried through to the job script's
/// directives.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MpiRequirement {
    pub nodes: u32,
    pub tasks_per_node: u32,
}

/// A task as handed to the TM by the WFM: already scheduled (has a start
/// time is not the TM's concern, only the rendered command matters), with
/// everything the adapter needs to build a job script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub task_id: TaskId,
    pub wf_id: WorkflowId,
    pub name: String,
    pub workdir: PathBuf,
    #[serde(default)]
    pub mpi: Option<MpiRequirement>,
    /// Command tokens produced by the (external) container-runtime
    /// interface's `run_text(task)`.
    pub command: Vec<String>,
}

/// The canonical job state set every backend adapter maps into. Distinct
/// from the graph store's `TaskState` -- this is what the TM tracks for an
/// in-flight backend job, not the workflow-level task lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
    Zombie,
    SubmitFail,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled | JobState::Zombie | JobState::SubmitFail
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self).unwrap_or_default();
        write!(f, "{}", s.as_str().unwrap_or("UNKNOWN"))
    }
}

/// A job being monitored in `job_queue`.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub task_id: TaskId,
    pub wf_id: WorkflowId,
    pub name: String,
    pub job_id: String,
    pub state: JobState,
}

/// The payload the TM PUTs to the WFM on every state change.
#[derive(Debug, Clone, Serialize)]
pub struct TaskUpdate {
    pub task_id: TaskId,
    pub job_state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_info: Option<serde_json::Value>,
}
