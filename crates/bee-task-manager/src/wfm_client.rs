//! Upstream reporting: PUTs state-change messages to the WFM. Delivery is
//! at-least-once -- a failed PUT is retried with exponential backoff, never
//! dropped silently.

use crate::types::TaskUpdate;
use bee_common::WorkflowId;
use std::time::Duration;

const BASE_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 5;

#[derive(Clone)]
pub struct WfmClient {
    client: reqwest::Client,
    base_url: String,
    base_backoff: Duration,
}

impl WfmClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            base_backoff: BASE_BACKOFF,
        }
    }

    /// Same as `new` with a caller-chosen base backoff, so integration
    /// tests against an unreachable WFM don't have to wait out the
    /// production 1s/2s/4s/8s retry ladder.
    pub fn with_base_backoff(base_url: impl Into<String>, base_backoff: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            base_backoff,
        }
    }

    pub async fn report(&self, wf_id: WorkflowId, update: &TaskUpdate) {
        let url = format!("{}/workflows/{}/update/", self.base_url.trim_end_matches('/'), wf_id);
        let mut backoff = self.base_backoff;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.client.put(&url).json(update).send().await {
                Ok(resp) if resp.status().is_success() => return,
                Ok(resp) => {
                    tracing::warn!(status = %resp.status(), attempt, "wfm rejected task update");
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "wfm unreachable for task update");
                }
            }
            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
        tracing::error!(task_id = %update.task_id, "giving up reporting task update to wfm");
    }
}
