//! In-memory property graph backing the Workflow State Engine.
//!
//! Nodes are `Workflow` and `Task`; edges are `Begins` (task is a
//! workflow-entry task) and `Depends` (consumer task depends on the task
//! that produces one of its inputs). Dependency derivation at `load_task`
//! time makes load order irrelevant: each task is compared against every
//! port already known in the workflow, in both directions.
//!
//! Every mutating operation takes the single write lock for its whole
//! duration, so concurrent readers see either the pre- or post-state of a
//! mutation, never a partial write.

use std::collections::{HashMap, HashSet};

use bee_common::{TaskId, WorkflowId};
use parking_lot::RwLock;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::GraphStoreError;
use crate::types::{Task, TaskState, Workflow, WorkflowState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NodeKey {
    Workflow(WorkflowId),
    Task(TaskId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeKind {
    Begins,
    Depends,
}

struct Inner {
    workflows: HashMap<WorkflowId, Workflow>,
    tasks: HashMap<TaskId, Task>,
    tasks_by_workflow: HashMap<WorkflowId, Vec<TaskId>>,
    graph: DiGraph<NodeKey, EdgeKind>,
    node_index: HashMap<NodeKey, NodeIndex>,
    available: bool,
}

impl Inner {
    fn new() -> Self {
        Self {
            workflows: HashMap::new(),
            tasks: HashMap::new(),
            tasks_by_workflow: HashMap::new(),
            graph: DiGraph::new(),
            node_index: HashMap::new(),
            available: true,
        }
    }

    fn node_for(&mut self, key: NodeKey) -> NodeIndex {
        *self
            .node_index
            .entry(key)
            .or_insert_with(|| self.graph.add_node(key))
    }

    /// Installs edges for `task_id` by comparing every input/output port
    /// against every other port already known in the workflow, in both
    /// directions — see `load_task` in the graph store contract.
    fn derive_edges(&mut self, workflow_id: WorkflowId, task_id: TaskId) {
        let wf_input_ids: HashSet<String> = self
            .workflows
            .get(&workflow_id)
            .map(|w| w.inputs.iter().map(|p| p.id.clone()).collect())
            .unwrap_or_default();

        let sibling_ids: Vec<TaskId> = self
            .tasks_by_workflow
            .get(&workflow_id)
            .cloned()
            .unwrap_or_default();

        let task_node = self.node_for(NodeKey::Task(task_id));
        let wf_node = self.node_for(NodeKey::Workflow(workflow_id));

        let task_input_sources: Vec<Option<String>> = self.tasks[&task_id]
            .inputs
            .iter()
            .map(|p| p.source.clone())
            .collect();
        let task_output_ids: Vec<String> = self.tasks[&task_id]
            .outputs
            .iter()
            .map(|p| p.id.clone())
            .collect();

        for source in task_input_sources.iter().flatten() {
            if wf_input_ids.contains(source) {
                self.graph.update_edge(task_node, wf_node, EdgeKind::Begins);
            }
            for &sibling in &sibling_ids {
                if sibling == task_id {
                    continue;
                }
                let produces = self.tasks[&sibling]
                    .outputs
                    .iter()
                    .any(|o| &o.id == source);
                if produces {
                    let sibling_node = self.node_for(NodeKey::Task(sibling));
                    self.graph.update_edge(task_node, sibling_node, EdgeKind::Depends);
                }
            }
        }

        for &sibling in &sibling_ids {
            if sibling == task_id {
                continue;
            }
            let consumes = self.tasks[&sibling].inputs.iter().any(|i| {
                i.source
                    .as_ref()
                    .map(|s| task_output_ids.contains(s))
                    .unwrap_or(false)
            });
            if consumes {
                let sibling_node = self.node_for(NodeKey::Task(sibling));
                self.graph.update_edge(sibling_node, task_node, EdgeKind::Depends);
            }
        }
    }

    fn dependency_ids(&self, task_id: TaskId) -> Vec<TaskId> {
        let Some(&node) = self.node_index.get(&NodeKey::Task(task_id)) else {
            return Vec::new();
        };
        self.graph
            .edges(node)
            .filter(|e| *e.weight() == EdgeKind::Depends)
            .filter_map(|e| match self.graph[e.target()] {
                NodeKey::Task(t) => Some(t),
                NodeKey::Workflow(_) => None,
            })
            .collect()
    }

    fn dependent_ids(&self, task_id: TaskId) -> Vec<TaskId> {
        let Some(&node) = self.node_index.get(&NodeKey::Task(task_id)) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(node, petgraph::Direction::Incoming)
            .filter(|e| *e.weight() == EdgeKind::Depends)
            .filter_map(|e| match self.graph[e.source()] {
                NodeKey::Task(t) => Some(t),
                NodeKey::Workflow(_) => None,
            })
            .collect()
    }

    fn has_task_cycle(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }
}

pub struct GraphStore {
    inner: RwLock<Inner>,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::new()),
        }
    }

    /// Test/fault-injection hook: flips the store into or out of the
    /// `StoreUnavailable` state every CRUD operation checks first.
    pub fn set_available(&self, available: bool) {
        self.inner.write().available = available;
    }

    fn check_available(&self, inner: &Inner) -> Result<(), GraphStoreError> {
        if inner.available {
            Ok(())
        } else {
            Err(GraphStoreError::Unavailable)
        }
    }

    pub fn initialize_workflow(&self, wf: Workflow) -> Result<(), GraphStoreError> {
        let mut inner = self.inner.write();
        self.check_available(&inner)?;
        if inner.workflows.contains_key(&wf.id) {
            return Err(GraphStoreError::WorkflowExists(wf.id.to_string()));
        }
        inner.node_for(NodeKey::Workflow(wf.id));
        inner.tasks_by_workflow.insert(wf.id, Vec::new());
        inner.workflows.insert(wf.id, wf);
        Ok(())
    }

    /// Adds a task node and derives its `BEGINS`/`DEPENDS` edges. Loading the
    /// same task id twice is a no-op.
    pub fn load_task(&self, task: Task) -> Result<(), GraphStoreError> {
        let mut inner = self.inner.write();
        self.check_available(&inner)?;
        if !inner.workflows.contains_key(&task.workflow_id) {
            return Err(GraphStoreError::WorkflowNotFound(task.workflow_id.to_string()));
        }
        if inner.tasks.contains_key(&task.id) {
            return Ok(());
        }
        let workflow_id = task.workflow_id;
        let task_id = task.id;
        inner.tasks_by_workflow.get_mut(&workflow_id).unwrap().push(task_id);
        inner.tasks.insert(task_id, task);
        inner.node_for(NodeKey::Task(task_id));
        inner.derive_edges(workflow_id, task_id);
        if inner.has_task_cycle() {
            inner.tasks.remove(&task_id);
            inner.tasks_by_workflow.get_mut(&workflow_id).unwrap().retain(|t| *t != task_id);
            return Err(GraphStoreError::Invariant(format!(
                "loading task {task_id} would introduce a cycle"
            )));
        }
        Ok(())
    }

    /// Sets every workflow-entry task with no unsatisfied dependency from
    /// `WAITING` to `READY`, filling its inputs from workflow inputs/defaults.
    pub fn execute_workflow(&self, wf_id: WorkflowId) -> Result<Vec<TaskId>, GraphStoreError> {
        let mut inner = self.inner.write();
        self.check_available(&inner)?;
        if !inner.workflows.contains_key(&wf_id) {
            return Err(GraphStoreError::WorkflowNotFound(wf_id.to_string()));
        }
        inner.workflows.get_mut(&wf_id).unwrap().state = WorkflowState::Running;

        let task_ids = inner.tasks_by_workflow.get(&wf_id).cloned().unwrap_or_default();
        let wf_inputs = inner.workflows[&wf_id].inputs.clone();
        let mut made_ready = Vec::new();
        for task_id in task_ids {
            // A workflow-entry task is one with no task-to-task dependency --
            // either it has no inputs at all, or its inputs are all sourced
            // from workflow-level parameters (a BEGINS edge).
            if !inner.dependency_ids(task_id).is_empty() {
                continue;
            }
            let task = inner.tasks.get_mut(&task_id).unwrap();
            if task.state != TaskState::Waiting {
                continue;
            }
            for input in task.inputs.iter_mut() {
                if input.value.is_some() {
                    continue;
                }
                if let Some(source) = &input.source {
                    if let Some(wf_in) = wf_inputs.iter().find(|p| &p.id == source) {
                        input.value = wf_in.value.clone().or_else(|| wf_in.default.clone());
                    }
                }
            }
            if task.inputs.iter().all(|i| i.is_satisfied()) {
                task.state = TaskState::Ready;
                made_ready.push(task_id);
            }
        }
        Ok(made_ready)
    }

    pub fn pause_workflow(&self, wf_id: WorkflowId) -> Result<(), GraphStoreError> {
        self.transition_workflow(wf_id, WorkflowState::Running, WorkflowState::Paused)
    }

    pub fn resume_workflow(&self, wf_id: WorkflowId) -> Result<(), GraphStoreError> {
        self.transition_workflow(wf_id, WorkflowState::Paused, WorkflowState::Running)
    }

    fn transition_workflow(
        &self,
        wf_id: WorkflowId,
        from: WorkflowState,
        to: WorkflowState,
    ) -> Result<(), GraphStoreError> {
        let mut inner = self.inner.write();
        self.check_available(&inner)?;
        let wf = inner
            .workflows
            .get_mut(&wf_id)
            .ok_or_else(|| GraphStoreError::WorkflowNotFound(wf_id.to_string()))?;
        if wf.state != from {
            return Err(GraphStoreError::Invariant(format!(
                "cannot move workflow {wf_id} from {:?} to {:?}",
                wf.state, to
            )));
        }
        wf.state = to;
        Ok(())
    }

    /// Sets every task to `WAITING`, clears all port values, and reassigns
    /// the workflow id. Returns the new id for convenience.
    pub fn reset_workflow(&self, wf_id: WorkflowId, new_id: WorkflowId) -> Result<(), GraphStoreError> {
        let mut inner = self.inner.write();
        self.check_available(&inner)?;
        if !inner.workflows.contains_key(&wf_id) {
            return Err(GraphStoreError::WorkflowNotFound(wf_id.to_string()));
        }
        let task_ids = inner.tasks_by_workflow.get(&wf_id).cloned().unwrap_or_default();
        for task_id in &task_ids {
            let task = inner.tasks.get_mut(task_id).unwrap();
            task.state = TaskState::Waiting;
            task.workflow_id = new_id;
            for p in task.inputs.iter_mut().chain(task.outputs.iter_mut()) {
                p.value = None;
            }
        }
        let mut wf = inner.workflows.remove(&wf_id).unwrap();
        wf.id = new_id;
        wf.state = WorkflowState::Pending;
        for p in wf.inputs.iter_mut().chain(wf.outputs.iter_mut()) {
            p.value = None;
        }
        inner.workflows.insert(new_id, wf);
        let tasks = inner.tasks_by_workflow.remove(&wf_id).unwrap();
        inner.tasks_by_workflow.insert(new_id, tasks);
        Ok(())
    }

    /// Sets every `WAITING` task whose every input now has a value or a
    /// default to `READY`.
    pub fn initialize_ready_tasks(&self, wf_id: WorkflowId) -> Result<Vec<TaskId>, GraphStoreError> {
        let mut inner = self.inner.write();
        self.check_available(&inner)?;
        let task_ids = inner
            .tasks_by_workflow
            .get(&wf_id)
            .ok_or_else(|| GraphStoreError::WorkflowNotFound(wf_id.to_string()))?
            .clone();
        let mut made_ready = Vec::new();
        for task_id in task_ids {
            let task = inner.tasks.get_mut(&task_id).unwrap();
            if task.state == TaskState::Waiting && task.inputs.iter().all(|i| i.is_satisfied()) {
                task.state = TaskState::Ready;
                made_ready.push(task_id);
            }
        }
        Ok(made_ready)
    }

    /// Given `t` is in a terminal state, propagates its output values to
    /// downstream inputs and matching workflow outputs, fills defaults where
    /// still null, then runs `initialize_ready_tasks` and returns the new
    /// ready set.
    pub fn finalize_task(&self, task_id: TaskId) -> Result<Vec<TaskId>, GraphStoreError> {
        let wf_id = {
            let mut inner = self.inner.write();
            self.check_available(&inner)?;
            let task = inner
                .tasks
                .get(&task_id)
                .ok_or_else(|| GraphStoreError::TaskNotFound(task_id.to_string()))?;
            if !task.state.is_terminal() {
                return Err(GraphStoreError::Invariant(format!(
                    "finalize_task called on non-terminal task {task_id}"
                )));
            }
            let wf_id = task.workflow_id;
            let dependents = inner.dependent_ids(task_id);
            let outputs = task.outputs.clone();

            for dependent_id in dependents {
                let dependent = inner.tasks.get_mut(&dependent_id).unwrap();
                for input in dependent.inputs.iter_mut() {
                    if let Some(source) = &input.source {
                        if let Some(output) = outputs.iter().find(|o| &o.id == source) {
                            if let Some(v) = &output.value {
                                input.value = Some(v.clone());
                            }
                        }
                    }
                }
            }

            // Fill defaults for inputs whose every dependency is now terminal.
            let task_ids = inner.tasks_by_workflow[&wf_id].clone();
            for other_id in &task_ids {
                let deps_terminal = inner
                    .dependency_ids(*other_id)
                    .iter()
                    .all(|d| inner.tasks[d].state.is_terminal());
                if !deps_terminal {
                    continue;
                }
                let other = inner.tasks.get_mut(other_id).unwrap();
                for input in other.inputs.iter_mut() {
                    if input.value.is_none() {
                        input.value = input.default.clone();
                    }
                }
            }

            if let Some(wf) = inner.workflows.get_mut(&wf_id) {
                for wf_out in wf.outputs.iter_mut() {
                    if let Some(source) = &wf_out.source {
                        if let Some(output) = outputs.iter().find(|o| &o.id == source) {
                            if wf_out.value.is_none() {
                                wf_out.value = output.value.clone();
                            }
                        }
                    }
                }
            }
            wf_id
        };
        self.initialize_ready_tasks(wf_id)
    }

    /// Adds `new` linked as a child of `old` with state `RESTARTED`,
    /// enforcing `max_restarts`.
    pub fn restart_task(&self, old_id: TaskId, max_restarts: u32) -> Result<Task, GraphStoreError> {
        let mut inner = self.inner.write();
        self.check_available(&inner)?;
        let old = inner
            .tasks
            .get(&old_id)
            .ok_or_else(|| GraphStoreError::TaskNotFound(old_id.to_string()))?
            .clone();
        if old.restart_count >= max_restarts {
            return Err(GraphStoreError::RestartLimitExceeded(old_id.to_string()));
        }
        let mut new_task = old.clone();
        new_task.id = TaskId::new();
        new_task.parent = Some(old_id);
        new_task.restart_count = old.restart_count + 1;
        new_task.state = TaskState::Restarted;
        for p in new_task.inputs.iter_mut().chain(new_task.outputs.iter_mut()) {
            p.value = None;
        }

        let workflow_id = new_task.workflow_id;
        inner
            .tasks_by_workflow
            .get_mut(&workflow_id)
            .unwrap()
            .push(new_task.id);
        inner.tasks.insert(new_task.id, new_task.clone());
        inner.node_for(NodeKey::Task(new_task.id));
        inner.derive_edges(workflow_id, new_task.id);
        Ok(new_task)
    }

    pub fn get_ready_tasks(&self, wf_id: WorkflowId) -> Vec<Task> {
        let inner = self.inner.read();
        inner
            .tasks_by_workflow
            .get(&wf_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.tasks.get(id))
                    .filter(|t| t.state == TaskState::Ready)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_dependent_tasks(&self, task_id: TaskId) -> Vec<TaskId> {
        self.inner.read().dependent_ids(task_id)
    }

    pub fn get_task_state(&self, task_id: TaskId) -> Result<TaskState, GraphStoreError> {
        self.inner
            .read()
            .tasks
            .get(&task_id)
            .map(|t| t.state.clone())
            .ok_or_else(|| GraphStoreError::TaskNotFound(task_id.to_string()))
    }

    pub fn set_task_state(&self, task_id: TaskId, state: TaskState) -> Result<(), GraphStoreError> {
        let mut inner = self.inner.write();
        self.check_available(&inner)?;
        let task = inner
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| GraphStoreError::TaskNotFound(task_id.to_string()))?;
        task.state = state;
        Ok(())
    }

    /// Sets the value of one of `task_id`'s output ports. Used by the WFM
    /// when resolving a completed task's `glob` (or the placeholder `"temp"`
    /// sentinel) before calling `finalize_task`.
    pub fn set_output_value(
        &self,
        task_id: TaskId,
        port_id: &str,
        value: serde_json::Value,
    ) -> Result<(), GraphStoreError> {
        let mut inner = self.inner.write();
        self.check_available(&inner)?;
        let task = inner
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| GraphStoreError::TaskNotFound(task_id.to_string()))?;
        let port = task
            .outputs
            .iter_mut()
            .find(|o| o.id == port_id)
            .ok_or_else(|| GraphStoreError::Invariant(format!("no output port {port_id} on task {task_id}")))?;
        port.value = Some(value);
        Ok(())
    }

    pub fn get_task(&self, task_id: TaskId) -> Result<Task, GraphStoreError> {
        self.inner
            .read()
            .tasks
            .get(&task_id)
            .cloned()
            .ok_or_else(|| GraphStoreError::TaskNotFound(task_id.to_string()))
    }

    pub fn get_task_metadata(
        &self,
        task_id: TaskId,
        key: &str,
    ) -> Result<Option<serde_json::Value>, GraphStoreError> {
        Ok(self
            .inner
            .read()
            .tasks
            .get(&task_id)
            .ok_or_else(|| GraphStoreError::TaskNotFound(task_id.to_string()))?
            .metadata
            .get(key)
            .cloned())
    }

    pub fn set_task_metadata(
        &self,
        task_id: TaskId,
        key: String,
        value: serde_json::Value,
    ) -> Result<(), GraphStoreError> {
        let mut inner = self.inner.write();
        self.check_available(&inner)?;
        let task = inner
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| GraphStoreError::TaskNotFound(task_id.to_string()))?;
        task.metadata.insert(key, value);
        Ok(())
    }

    pub fn workflow_completed(&self, wf_id: WorkflowId) -> bool {
        let inner = self.inner.read();
        match inner.tasks_by_workflow.get(&wf_id) {
            Some(ids) if !ids.is_empty() => {
                ids.iter().all(|id| inner.tasks[id].state.is_terminal())
            }
            Some(_) => true,
            None => false,
        }
    }

    pub fn empty(&self, wf_id: WorkflowId) -> bool {
        self.inner
            .read()
            .tasks_by_workflow
            .get(&wf_id)
            .map(|ids| ids.is_empty())
            .unwrap_or(true)
    }

    pub fn cleanup(&self, wf_id: WorkflowId) {
        let mut inner = self.inner.write();
        if let Some(task_ids) = inner.tasks_by_workflow.remove(&wf_id) {
            for id in task_ids {
                inner.tasks.remove(&id);
                if let Some(idx) = inner.node_index.remove(&NodeKey::Task(id)) {
                    inner.graph.remove_node(idx);
                }
            }
        }
        inner.workflows.remove(&wf_id);
        if let Some(idx) = inner.node_index.remove(&NodeKey::Workflow(wf_id)) {
            inner.graph.remove_node(idx);
        }
    }

    pub fn get_workflow(&self, wf_id: WorkflowId) -> Result<Workflow, GraphStoreError> {
        self.inner
            .read()
            .workflows
            .get(&wf_id)
            .cloned()
            .ok_or_else(|| GraphStoreError::WorkflowNotFound(wf_id.to_string()))
    }

    pub fn list_workflows(&self) -> Vec<Workflow> {
        self.inner.read().workflows.values().cloned().collect()
    }

    pub fn set_workflow_state(&self, wf_id: WorkflowId, state: WorkflowState) -> Result<(), GraphStoreError> {
        let mut inner = self.inner.write();
        let wf = inner
            .workflows
            .get_mut(&wf_id)
            .ok_or_else(|| GraphStoreError::WorkflowNotFound(wf_id.to_string()))?;
        wf.state = state;
        Ok(())
    }

    pub fn list_tasks(&self, wf_id: WorkflowId) -> Vec<Task> {
        let inner = self.inner.read();
        inner
            .tasks_by_workflow
            .get(&wf_id)
            .map(|ids| ids.iter().filter_map(|id| inner.tasks.get(id)).cloned().collect())
            .unwrap_or_default()
    }
}
