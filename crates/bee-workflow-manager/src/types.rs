//! Wire types for the WFM's two HTTP surfaces: the client-facing submission
//! API and the TM callback.

use bee_common::{TaskId, WorkflowId};
use bee_graph_store::{Task, TaskState, Workflow};
use serde::{Deserialize, Serialize};

/// What a `workflow_archive` tarball is expected to contain in place of a
/// real CWL parse: CWL parsing is an external collaborator per spec scope,
/// so the archive carries the already-parsed `Workflow` value object and
/// its `Task`s as `workflow.json`, exactly the shape that collaborator
/// would hand to `GraphStore::initialize_workflow`/`load_task`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedWorkflow {
    pub workflow: Workflow,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub wf_id: WorkflowId,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub msg: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TaskStateView {
    pub task_id: TaskId,
    pub name: String,
    pub state: TaskState,
}

#[derive(Debug, Serialize)]
pub struct WorkflowStatusResponse {
    pub wf_id: WorkflowId,
    pub name: String,
    pub status: String,
    pub tasks: Vec<TaskStateView>,
}

#[derive(Debug, Serialize)]
pub struct WorkflowSummary {
    pub name: String,
    pub id: WorkflowId,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct PauseResumeRequest {
    pub option: PauseResumeOption,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PauseResumeOption {
    Pause,
    Resume,
}

/// Body of the TM's `PUT /workflows/{wf_id}/update/` callback.
#[derive(Debug, Deserialize)]
pub struct TaskUpdateBody {
    pub task_id: TaskId,
    pub job_state: JobStateWire,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub task_info: Option<serde_json::Value>,
}

/// Mirrors `bee_task_manager::JobState` without a crate dependency on the
/// TM: the WFM only needs to know the canonical job-state vocabulary, not
/// the TM's internal queue types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStateWire {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
    Zombie,
    SubmitFail,
}

impl JobStateWire {
    /// Maps the TM's job-state vocabulary onto the graph store's task
    /// lifecycle. `TaskState` has no `PENDING` member, so both `PENDING`
    /// and `RUNNING` become `RUNNING` -- from the WFM's point of view the
    /// task is in flight either way. `ZOMBIE` is reported as `FAILED`
    /// already by the TM but is mapped
    /// defensively here too.
    pub fn to_task_state(self) -> TaskState {
        match self {
            JobStateWire::Pending | JobStateWire::Running => TaskState::Running,
            JobStateWire::Paused => TaskState::Paused,
            JobStateWire::Completed => TaskState::Completed,
            JobStateWire::Failed | JobStateWire::Zombie | JobStateWire::SubmitFail => TaskState::Failed,
            JobStateWire::Cancelled => TaskState::Cancelled,
        }
    }
}
