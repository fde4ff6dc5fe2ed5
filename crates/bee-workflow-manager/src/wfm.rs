//! The Workflow Manager facade: owns the per-workflow state machine and the
//! event flow between the Graph Store, the Scheduler and the Task Manager.
//!
//! ```text
//! Pending --start--> Running --pause--> Paused
//!                      |  ^               |
//!                      |  +------resume---+
//!                      |
//!                      +--complete--> Archived
//!                      +--cancel----> Archived
//!                      +--fail------> Archived
//! ```

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use bee_common::{BeeConfig, TaskId, WorkflowId};
use bee_graph_store::{GraphStore, Task, TaskState, Workflow, WorkflowState};
use bee_scheduler::{choose, Resource, ScheduleOpts};
use parking_lot::RwLock;

use crate::archive;
use crate::dispatch;
use crate::error::WfmError;
use crate::tm_client::TmClient;
use crate::types::JobStateWire;

/// A task is only eligible for an automatic restart when it carries a
/// `CheckpointRequirement` hint; retries are bounded by this monotonic
/// counter, reset only by a fresh workflow submission.
pub const DEFAULT_MAX_RESTARTS: u32 = 3;

pub struct Wfm {
    pub graph: Arc<GraphStore>,
    pub tm: TmClient,
    pub config: BeeConfig,
    resources: RwLock<Vec<Resource>>,
    /// Tasks already handed to the TM this lifecycle -- guards against
    /// re-dispatching the same task id on a subsequent scheduler pass
    /// (no double submit).
    dispatched: RwLock<HashSet<TaskId>>,
}

impl Wfm {
    pub fn new(graph: Arc<GraphStore>, tm: TmClient, config: BeeConfig, resources: Vec<Resource>) -> Self {
        Self {
            graph,
            tm,
            config,
            resources: RwLock::new(resources),
            dispatched: RwLock::new(HashSet::new()),
        }
    }

    pub fn set_resources(&self, resources: Vec<Resource>) {
        *self.resources.write() = resources;
    }

    pub fn workflow_dir(&self, wf_id: WorkflowId) -> PathBuf {
        self.config.workdir.join("workflows").join(wf_id.to_string())
    }

    /// Registers a parsed workflow and its tasks. The CWL parse itself is
    /// an external collaborator's job; this is where its output
    /// enters the orchestration core.
    pub fn submit(&self, wf: Workflow, tasks: Vec<Task>) -> Result<WorkflowId, WfmError> {
        let wf_id = wf.id;
        std::fs::create_dir_all(self.workflow_dir(wf_id))?;
        self.graph.initialize_workflow(wf)?;
        for task in tasks {
            self.graph.load_task(task)?;
        }
        Ok(wf_id)
    }

    /// `Pending -> Running`, releasing the workflow's entry tasks.
    pub async fn start(&self, wf_id: WorkflowId) -> Result<(), WfmError> {
        let wf = self.graph.get_workflow(wf_id)?;
        if wf.state != WorkflowState::Pending {
            return Err(WfmError::BadTransition(format!(
                "cannot start workflow {wf_id} from {:?}",
                wf.state
            )));
        }
        let ready = self.graph.execute_workflow(wf_id)?;
        self.schedule_and_dispatch(wf_id, ready).await?;
        self.maybe_archive(wf_id).await?;
        Ok(())
    }

    /// `Running -> Paused`. Newly arriving TM state updates still get
    /// written to the graph store while paused; they just don't trigger a
    /// new scheduler invocation until resume.
    pub fn pause(&self, wf_id: WorkflowId) -> Result<(), WfmError> {
        self.graph
            .pause_workflow(wf_id)
            .map_err(|_| WfmError::BadTransition(format!("cannot pause workflow {wf_id}")))
    }

    /// `Paused -> Running`, then hands every currently-ready task to the
    /// scheduler and the TM.
    pub async fn resume(&self, wf_id: WorkflowId) -> Result<(), WfmError> {
        self.graph
            .resume_workflow(wf_id)
            .map_err(|_| WfmError::BadTransition(format!("cannot resume workflow {wf_id}")))?;
        let ready: Vec<TaskId> = self.graph.get_ready_tasks(wf_id).into_iter().map(|t| t.id).collect();
        self.schedule_and_dispatch(wf_id, ready).await
    }

    /// Best-effort cancel: requests a TM cancel for every non-terminal
    /// task, marks them `CANCELLED`, and archives.
    pub async fn cancel(&self, wf_id: WorkflowId) -> Result<(), WfmError> {
        self.cancel_non_terminal_tasks(wf_id).await?;
        self.archive(wf_id).await
    }

    /// Requests a TM cancel for every task in `wf_id` not already terminal
    /// and marks it `CANCELLED`. Shared by `cancel()` and the terminal-
    /// failure path in `on_task_state`, both of which must leave every task
    /// terminal before archiving.
    async fn cancel_non_terminal_tasks(&self, wf_id: WorkflowId) -> Result<(), WfmError> {
        let tasks = self.graph.list_tasks(wf_id);
        for task in &tasks {
            if !task.state.is_terminal() {
                let _ = self.tm.cancel(task.id).await;
                self.graph.set_task_state(task.id, TaskState::Cancelled)?;
            }
        }
        Ok(())
    }

    /// The TM's state-change callback, funneled here per workflow. Delivery
    /// is at-least-once; applying the same `(task_id, state)` twice is a
    /// no-op by construction, since a task already in a
    /// terminal state is never re-finalized.
    pub async fn on_task_state(
        &self,
        wf_id: WorkflowId,
        task_id: TaskId,
        job_state: JobStateWire,
        output: Option<serde_json::Value>,
    ) -> Result<(), WfmError> {
        let current = self.graph.get_task_state(task_id)?;
        if current.is_terminal() {
            tracing::debug!(task_id = %task_id, "ignoring update for already-terminal task");
            return Ok(());
        }

        let new_state = job_state.to_task_state();
        self.graph.set_task_state(task_id, new_state.clone())?;

        if !new_state.is_terminal() {
            return Ok(());
        }

        if new_state == TaskState::Completed {
            self.resolve_outputs(task_id, output)?;
        }

        let ready = self.graph.finalize_task(task_id)?;

        if new_state == TaskState::Failed {
            if let Some(new_task) = self.try_restart(task_id).await? {
                self.schedule_and_dispatch(wf_id, vec![new_task]).await?;
            } else if self.task_required(wf_id, task_id) {
                self.graph.set_workflow_state(wf_id, WorkflowState::Failed)?;
                // A required task's unrestarted failure ends the workflow
                // immediately -- sweep the remaining siblings to CANCELLED
                // so every task is terminal and archive unconditionally,
                // rather than via `maybe_archive`'s `workflow_completed()`
                // check, which can never pass while siblings are pending.
                self.cancel_non_terminal_tasks(wf_id).await?;
                return self.archive(wf_id).await;
            }
        }

        let wf_state = self.graph.get_workflow(wf_id)?.state;
        if wf_state != WorkflowState::Paused && wf_state != WorkflowState::Failed {
            self.schedule_and_dispatch(wf_id, ready).await?;
        }

        self.maybe_archive(wf_id).await?;
        Ok(())
    }

    /// Sets output port values from a `glob` match when one was declared,
    /// else a `"temp"` placeholder sentinel when neither is available.
    fn resolve_outputs(&self, task_id: TaskId, output: Option<serde_json::Value>) -> Result<(), WfmError> {
        let task = self.graph.get_task(task_id)?;
        for port in &task.outputs {
            let value = match (&port.glob, &output) {
                (Some(glob), _) => serde_json::Value::String(glob.clone()),
                (None, Some(v)) => v.clone(),
                (None, None) => serde_json::Value::String("temp".to_string()),
            };
            self.graph.set_output_value(task_id, &port.id, value)?;
        }
        Ok(())
    }

    /// Restarts `task_id` if it carries a `CheckpointRequirement` hint and
    /// hasn't exhausted its restart budget; returns the new task id.
    async fn try_restart(&self, task_id: TaskId) -> Result<Option<TaskId>, WfmError> {
        let task = self.graph.get_task(task_id)?;
        if !task.has_checkpoint_requirement() {
            return Ok(None);
        }
        match self.graph.restart_task(task_id, DEFAULT_MAX_RESTARTS) {
            Ok(new_task) => {
                self.graph.set_task_state(new_task.id, TaskState::Ready)?;
                Ok(Some(new_task.id))
            }
            Err(e) => {
                tracing::warn!(task_id = %task_id, error = %e, "restart budget exhausted");
                Ok(None)
            }
        }
    }

    /// Whether `task_id` failing should fail the whole workflow. The data
    /// model has no notion of an optional task, so every task is required
    /// for completion.
    fn task_required(&self, _wf_id: WorkflowId, _task_id: TaskId) -> bool {
        true
    }

    /// Runs the scheduler over `ready_ids` against the current resource
    /// inventory and hands every resulting allocation to the TM. Tasks that
    /// come back unscheduleable stay `READY` for the next invocation.
    async fn schedule_and_dispatch(&self, wf_id: WorkflowId, ready_ids: Vec<TaskId>) -> Result<(), WfmError> {
        if ready_ids.is_empty() {
            return Ok(());
        }
        let tasks: Vec<Task> = ready_ids
            .iter()
            .filter_map(|id| self.graph.get_task(*id).ok())
            .collect();

        let mut sched_tasks = Vec::with_capacity(tasks.len());
        for t in &tasks {
            sched_tasks.push(dispatch::sched_task_for(t)?);
        }

        let resources = self.resources.read().clone();
        let algorithm = choose(
            sched_tasks.len(),
            self.config.scheduler.mars_threshold,
            false,
            &self.config.scheduler.default_algorithm,
        );
        let opts = ScheduleOpts { now: now_seconds() };
        algorithm.schedule_all(&mut sched_tasks, &resources, &opts)?;

        let workflow_dir = self.workflow_dir(wf_id);
        for (task, sched) in tasks.iter().zip(sched_tasks.iter()) {
            if sched.allocations.is_empty() {
                continue;
            }
            if !self.dispatched.write().insert(task.id) {
                continue;
            }
            let scheduled_task = dispatch::scheduled_task_for(task, &workflow_dir);
            self.tm.submit(&scheduled_task).await?;
        }
        Ok(())
    }

    async fn maybe_archive(&self, wf_id: WorkflowId) -> Result<(), WfmError> {
        if self.graph.workflow_completed(wf_id) {
            self.archive(wf_id).await?;
        }
        Ok(())
    }

    /// Serializes the workflow directory into a tarball, marks the
    /// workflow `Archived`, and releases the task ids it dispatched (so a
    /// purge/reset can reuse the lineage without tripping the no-double-
    /// submit guard).
    async fn archive(&self, wf_id: WorkflowId) -> Result<(), WfmError> {
        let wf = self.graph.get_workflow(wf_id)?;
        if wf.state == WorkflowState::Archived {
            return Ok(());
        }
        let workflow_dir = self.workflow_dir(wf_id);
        archive::write_archive(&workflow_dir, &self.config.archive_root, wf_id)?;
        self.graph.set_workflow_state(wf_id, WorkflowState::Archived)?;
        tracing::info!(wf_id = %wf_id, "workflow archived");
        Ok(())
    }
}

fn now_seconds() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
