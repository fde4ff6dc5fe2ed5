//! WFM -> TM calls: hand a scheduled task to the Task Manager, or ask it to
//! cancel one. Mirrors `bee_task_manager::http`'s route shapes exactly since
//! the two crates speak the same contract.

use crate::error::WfmError;
use bee_task_manager::ScheduledTask;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct TmClient {
    client: reqwest::Client,
    base_url: String,
}

impl TmClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub async fn submit(&self, task: &ScheduledTask) -> Result<(), WfmError> {
        let url = format!("{}/tasks/submit", self.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "task": task }))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| WfmError::TmUnreachable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(WfmError::TmUnreachable(format!("tm rejected submit: {}", resp.status())));
        }
        Ok(())
    }

    pub async fn cancel(&self, task_id: bee_common::TaskId) -> Result<(), WfmError> {
        let url = format!("{}/tasks/{}", self.base_url.trim_end_matches('/'), task_id);
        let resp = self
            .client
            .delete(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| WfmError::TmUnreachable(e.to_string()))?;
        if !resp.status().is_success() {
            tracing::warn!(task_id = %task_id, status = %resp.status(), "tm cancel returned non-success");
        }
        Ok(())
    }
}
