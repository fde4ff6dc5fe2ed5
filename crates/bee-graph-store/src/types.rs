//! Data model: `Workflow`, `Task`, ports, requirements/hints and state enums.

use bee_common::{TaskId, WorkflowId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    Waiting,
    Ready,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
    Restarted,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed | TaskState::Cancelled)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, TaskState::Ready | TaskState::Running | TaskState::Paused)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowState {
    Pending,
    Running,
    Paused,
    Failed,
    Archived,
}

/// A class tag, key and value. Hints are advisory; requirements must be
/// honoured or the task they're attached to is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirement {
    pub class: String,
    pub key: String,
    pub value: serde_json::Value,
}

pub type Hint = Requirement;

/// A `StepInput` or `StepOutput`. `value` is `null` until bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    pub declared_type: String,
    pub source: Option<String>,
    pub default: Option<serde_json::Value>,
    pub value: Option<serde_json::Value>,
    pub glob: Option<String>,
    pub prefix: Option<String>,
    pub position: Option<u32>,
}

impl Port {
    pub fn new(id: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            declared_type: declared_type.into(),
            source: None,
            default: None,
            value: None,
            glob: None,
            prefix: None,
            position: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_glob(mut self, glob: impl Into<String>) -> Self {
        self.glob = Some(glob.into());
        self
    }

    /// True once this port has either a bound value or can fall back to a default.
    pub fn is_satisfied(&self) -> bool {
        self.value.is_some() || self.default.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub workflow_id: WorkflowId,
    pub name: String,
    pub base_command: String,
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
    pub requirements: Vec<Requirement>,
    pub hints: Vec<Hint>,
    pub stdout: Option<String>,
    #[serde(default)]
    pub state: TaskState,
    #[serde(default)]
    pub restart_count: u32,
    #[serde(default)]
    pub parent: Option<TaskId>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Default for TaskState {
    fn default() -> Self {
        TaskState::Waiting
    }
}

impl Task {
    pub fn new(workflow_id: WorkflowId, name: impl Into<String>, base_command: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            workflow_id,
            name: name.into(),
            base_command: base_command.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            requirements: Vec::new(),
            hints: Vec::new(),
            stdout: None,
            state: TaskState::Waiting,
            restart_count: 0,
            parent: None,
            metadata: HashMap::new(),
        }
    }

    /// `CheckpointRequirement` hint governs whether a failed task is eligible
    /// for restart; retries are bounded by the caller's configured maximum.
    pub fn has_checkpoint_requirement(&self) -> bool {
        self.hints.iter().any(|h| h.class == "CheckpointRequirement")
    }

    pub fn requirement(&self, class: &str, key: &str) -> Option<&serde_json::Value> {
        self.requirements
            .iter()
            .find(|r| r.class == class && r.key == key)
            .map(|r| &r.value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
    pub requirements: Vec<Requirement>,
    pub hints: Vec<Hint>,
    pub state: WorkflowState,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: WorkflowId::new(),
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            requirements: Vec::new(),
            hints: Vec::new(),
            state: WorkflowState::Pending,
        }
    }
}
