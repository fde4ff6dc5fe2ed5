//! The tick loop: `submit_jobs` then `update_jobs`, run every
//! `tick_interval_secs`. Not re-entrant -- the caller is expected to await
//! one `check_tasks` call to completion before the next timer fires.

use crate::backend::WorkloadBackend;
use crate::script;
use crate::state::TmState;
use crate::types::{JobRecord, JobState, TaskUpdate};
use crate::wfm_client::WfmClient;
use bee_common::config::BackendKind;
use std::sync::Arc;

pub struct Tm {
    pub state: Arc<TmState>,
    pub backend: Arc<dyn WorkloadBackend>,
    pub backend_kind: BackendKind,
    pub wfm: WfmClient,
}

impl Tm {
    pub async fn check_tasks(&self) {
        self.submit_jobs().await;
        self.update_jobs().await;
    }

    /// Drains `submit_queue`. A task is popped from the queue only after the
    /// backend has acknowledged it one way or the other, guaranteeing
    /// at-most-once submission.
    async fn submit_jobs(&self) {
        loop {
            let task = {
                let mut queues = self.state.queues.lock().await;
                match queues.submit_queue.pop_front() {
                    Some(t) => t,
                    None => break,
                }
            };
            let script = script::render(&task, self.backend_kind);
            match self.backend.submit(&script).await {
                Ok(job_id) => {
                    tracing::info!(task_id = %task.task_id, job_id = %job_id, "job submitted");
                    let record = JobRecord {
                        task_id: task.task_id,
                        wf_id: task.wf_id,
                        name: task.name.clone(),
                        job_id,
                        state: JobState::Pending,
                    };
                    self.state.queues.lock().await.job_queue.push(record);
                    self.report(task.wf_id, task.task_id, JobState::Pending).await;
                }
                Err(e) => {
                    tracing::warn!(task_id = %task.task_id, error = %e, "submission failed");
                    self.report(task.wf_id, task.task_id, JobState::SubmitFail).await;
                }
            }
        }
    }

    /// Polls every entry in `job_queue`, maps backend state to canonical
    /// state, reports changes upstream, and drops terminal entries.
    async fn update_jobs(&self) {
        let snapshot: Vec<JobRecord> = self.state.queues.lock().await.job_queue.clone();

        for record in snapshot {
            let outcome = self.backend.query(&record.job_id).await;
            let new_state = match outcome {
                Ok(state) => {
                    self.state.queues.lock().await.poll_failures.remove(&record.task_id);
                    state
                }
                Err(e) => {
                    let mut queues = self.state.queues.lock().await;
                    let failures = queues.poll_failures.entry(record.task_id).or_insert(0);
                    *failures += 1;
                    tracing::warn!(task_id = %record.task_id, error = %e, failures = *failures, "poll failed");
                    if *failures >= self.state.max_poll_failures {
                        JobState::Zombie
                    } else {
                        continue;
                    }
                }
            };

            if new_state != record.state {
                tracing::info!(task_id = %record.task_id, from = %record.state, to = %new_state, "job state changed");
                let reported = if new_state == JobState::Zombie {
                    JobState::Failed
                } else {
                    new_state
                };
                self.report(record.wf_id, record.task_id, reported).await;

                let mut queues = self.state.queues.lock().await;
                if let Some(entry) = queues.job_queue.iter_mut().find(|j| j.task_id == record.task_id) {
                    entry.state = new_state;
                }
            }

            if new_state.is_terminal() {
                let mut queues = self.state.queues.lock().await;
                queues.job_queue.retain(|j| j.task_id != record.task_id);
                queues.poll_failures.remove(&record.task_id);
            }
        }
    }

    pub(crate) async fn report(&self, wf_id: bee_common::WorkflowId, task_id: bee_common::TaskId, job_state: JobState) {
        let update = TaskUpdate {
            task_id,
            job_state,
            metadata: None,
            output: None,
            task_info: None,
        };
        self.wfm.report(wf_id, &update).await;
    }
}
