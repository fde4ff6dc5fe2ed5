//! `submit_queue` and `job_queue` behind one lock, per the concurrency
//! contract: tick takes a snapshot under the lock, does I/O without
//! holding it, then re-acquires to apply results.

use crate::types::{JobRecord, JobState, ScheduledTask};
use bee_common::{TaskId, WorkflowId};
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

#[derive(Default)]
pub struct TmQueues {
    pub submit_queue: VecDeque<ScheduledTask>,
    pub job_queue: Vec<JobRecord>,
    pub poll_failures: HashMap<TaskId, u32>,
}

/// Shared TM state: the two queues plus the failure counters used to
/// escalate a transiently-unreachable job to `ZOMBIE`.
pub struct TmState {
    pub queues: Mutex<TmQueues>,
    pub max_poll_failures: u32,
}

impl TmState {
    pub fn new(max_poll_failures: u32) -> Self {
        Self {
            queues: Mutex::new(TmQueues::default()),
            max_poll_failures,
        }
    }

    pub async fn submit(&self, task: ScheduledTask) {
        self.queues.lock().await.submit_queue.push_back(task);
    }

    /// Drops a task from `submit_queue` if still pending, or removes its
    /// `job_queue` entry (and any `poll_failures` counter) and returns the
    /// job id so the caller can issue the backend cancel outside the lock.
    /// The entry is removed here, not left for the next tick to discover
    /// missing, since the backend itself drops it as soon as it is cancelled.
    pub async fn cancel(&self, task_id: TaskId) -> CancelOutcome {
        let mut queues = self.queues.lock().await;
        if let Some(pos) = queues.submit_queue.iter().position(|t| t.task_id == task_id) {
            queues.submit_queue.remove(pos);
            return CancelOutcome::RemovedFromSubmitQueue;
        }
        if let Some(pos) = queues.job_queue.iter().position(|j| j.task_id == task_id) {
            let record = queues.job_queue.remove(pos);
            queues.poll_failures.remove(&task_id);
            return CancelOutcome::InFlight {
                job_id: record.job_id,
                wf_id: record.wf_id,
            };
        }
        CancelOutcome::NotFound
    }

    pub async fn last_known_state(&self, task_id: TaskId) -> Option<JobState> {
        self.queues
            .lock()
            .await
            .job_queue
            .iter()
            .find(|j| j.task_id == task_id)
            .map(|j| j.state)
    }
}

pub enum CancelOutcome {
    RemovedFromSubmitQueue,
    InFlight { job_id: String, wf_id: WorkflowId },
    NotFound,
}
