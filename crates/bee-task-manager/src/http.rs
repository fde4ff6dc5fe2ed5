//! The TM's HTTP surface exposed to the WFM: submit, cancel, query.

use crate::state::CancelOutcome;
use crate::tick::Tm;
use crate::types::{JobState, ScheduledTask};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub tm: Arc<Tm>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tasks/submit", post(submit_task))
        .route("/tasks", delete(cancel_all))
        .route("/tasks/:id", delete(cancel_one))
        .route("/tasks/:id", get(query_task))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok", "service": "bee-tm"}))
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    task: ScheduledTask,
}

#[derive(Debug, Serialize)]
struct SubmitResponse {
    msg: String,
    status: String,
}

async fn submit_task(State(state): State<AppState>, Json(req): Json<SubmitRequest>) -> (StatusCode, Json<SubmitResponse>) {
    let name = req.task.name.clone();
    state.tm.state.submit(req.task).await;
    tracing::info!(task = %name, "added to submit queue");
    (
        StatusCode::OK,
        Json(SubmitResponse {
            msg: "Task Added!".to_string(),
            status: "ok".to_string(),
        }),
    )
}

#[derive(Debug, Serialize)]
struct CancelResponse {
    msg: String,
    status: String,
}

async fn cancel_one(State(state): State<AppState>, Path(id): Path<uuid::Uuid>) -> (StatusCode, Json<CancelResponse>) {
    let task_id = bee_common::TaskId(id);
    let msg = match state.tm.state.cancel(task_id).await {
        CancelOutcome::RemovedFromSubmitQueue => "removed from submit queue".to_string(),
        CancelOutcome::InFlight { job_id, wf_id } => {
            if let Err(e) = state.tm.backend.cancel(&job_id).await {
                tracing::warn!(task_id = %task_id, error = %e, "backend cancel failed");
            }
            // Report CANCELLED now rather than waiting for the next tick --
            // the `job_queue` entry is already gone, so a later poll would
            // find nothing and misreport this as ZOMBIE/FAILED instead.
            state.tm.report(wf_id, task_id, JobState::Cancelled).await;
            format!("cancel requested for job {job_id}")
        }
        CancelOutcome::NotFound => "unknown task".to_string(),
    };
    (
        StatusCode::OK,
        Json(CancelResponse {
            msg,
            status: "ok".to_string(),
        }),
    )
}

async fn cancel_all(State(state): State<AppState>) -> (StatusCode, Json<CancelResponse>) {
    let records = {
        let mut queues = state.tm.state.queues.lock().await;
        queues.submit_queue.clear();
        queues.poll_failures.clear();
        std::mem::take(&mut queues.job_queue)
    };
    for record in &records {
        if let Err(e) = state.tm.backend.cancel(&record.job_id).await {
            tracing::warn!(job_id = %record.job_id, error = %e, "backend cancel failed");
        }
        state.tm.report(record.wf_id, record.task_id, JobState::Cancelled).await;
    }
    (
        StatusCode::OK,
        Json(CancelResponse {
            msg: format!("cancelled {} in-flight jobs", records.len()),
            status: "ok".to_string(),
        }),
    )
}

#[derive(Debug, Serialize)]
struct QueryResponse {
    job_state: Option<String>,
}

async fn query_task(State(state): State<AppState>, Path(id): Path<uuid::Uuid>) -> Json<QueryResponse> {
    let task_id = bee_common::TaskId(id);
    let job_state = state.tm.state.last_known_state(task_id).await.map(|s| s.to_string());
    Json(QueryResponse { job_state })
}
