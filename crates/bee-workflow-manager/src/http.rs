//! The WFM's two HTTP surfaces: the client-facing submission API
//! and the TM callback.

use std::io::Read;
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use bee_common::{TaskId, WorkflowId};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::archive;
use crate::error::WfmError;
use crate::types::{
    ErrorResponse, PauseResumeOption, PauseResumeRequest, SubmitResponse, TaskStateView, TaskUpdateBody,
    WorkflowStatusResponse, WorkflowSummary,
};
use crate::wfm::Wfm;

#[derive(Clone)]
pub struct AppState {
    pub wfm: Arc<Wfm>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/workflows", post(submit_workflow))
        .route("/workflows", get(list_workflows))
        .route("/workflows/:id", get(get_workflow))
        .route("/workflows/:id", patch(pause_resume))
        .route("/workflows/:id", delete(cancel_workflow))
        .route("/workflows/:id/start", post(start_workflow))
        .route("/workflows/:id/archive", get(download_archive))
        .route("/workflows/:id/update/", put(task_update))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok", "service": "bee-wfm"}))
}

fn error_response(e: WfmError) -> (StatusCode, Json<ErrorResponse>) {
    let bee_err: bee_common::BeeError = e.into();
    let status = StatusCode::from_u16(bee_err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorResponse {
            msg: bee_err.to_string(),
            status: "error",
        }),
    )
}

/// `POST /workflows`: multipart submission. `workflow_archive` is
/// a tar.gz whose `workflow.json` entry carries the already-parsed
/// `Workflow`/`Task`s -- CWL parsing is an external collaborator, not
/// reimplemented here (see `types::ParsedWorkflow`).
async fn submit_workflow(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitResponse>), (StatusCode, Json<ErrorResponse>)> {
    let mut archive_bytes: Option<Vec<u8>> = None;

    loop {
        let field = multipart.next_field().await.map_err(|e| {
            error_response(WfmError::BadRequest(format!("malformed multipart body: {e}")))
        })?;
        let Some(field) = field else { break };
        if field.name() == Some("workflow_archive") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| error_response(WfmError::BadRequest(e.to_string())))?;
            archive_bytes = Some(bytes.to_vec());
        }
    }

    let archive_bytes =
        archive_bytes.ok_or_else(|| error_response(WfmError::BadRequest("missing workflow_archive field".into())))?;

    let parsed = extract_parsed_workflow(&archive_bytes)
        .map_err(|e| error_response(WfmError::BadRequest(e)))?;

    let wf_id = state
        .wfm
        .submit(parsed.workflow, parsed.tasks)
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            wf_id,
            status: "ok",
        }),
    ))
}

fn extract_parsed_workflow(archive_bytes: &[u8]) -> Result<crate::types::ParsedWorkflow, String> {
    let decoder = flate2::read::GzDecoder::new(archive_bytes);
    let mut tar = tar::Archive::new(decoder);
    let entries = tar.entries().map_err(|e| format!("reading archive: {e}"))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| format!("reading archive entry: {e}"))?;
        let path = entry.path().map_err(|e| e.to_string())?.to_path_buf();
        if path.file_name().map(|n| n == "workflow.json").unwrap_or(false) {
            let mut contents = String::new();
            entry.read_to_string(&mut contents).map_err(|e| e.to_string())?;
            return serde_json::from_str(&contents).map_err(|e| format!("parsing workflow.json: {e}"));
        }
    }
    Err("workflow_archive has no workflow.json entry".to_string())
}

async fn start_workflow(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    state.wfm.start(WorkflowId(id)).await.map_err(error_response)?;
    Ok(StatusCode::OK)
}

async fn pause_resume(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<PauseResumeRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let wf_id = WorkflowId(id);
    match req.option {
        PauseResumeOption::Pause => state.wfm.pause(wf_id).map_err(error_response)?,
        PauseResumeOption::Resume => state.wfm.resume(wf_id).await.map_err(error_response)?,
    }
    Ok(StatusCode::OK)
}

async fn cancel_workflow(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    state.wfm.cancel(WorkflowId(id)).await.map_err(error_response)?;
    Ok(StatusCode::OK)
}

async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<Json<WorkflowStatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    let wf_id = WorkflowId(id);
    let wf = state.wfm.graph.get_workflow(wf_id).map_err(|e| error_response(e.into()))?;
    let tasks = state
        .wfm
        .graph
        .list_tasks(wf_id)
        .into_iter()
        .map(|t| TaskStateView {
            task_id: t.id,
            name: t.name,
            state: t.state,
        })
        .collect();
    Ok(Json(WorkflowStatusResponse {
        wf_id,
        name: wf.name,
        status: format!("{:?}", wf.state),
        tasks,
    }))
}

async fn list_workflows(State(state): State<AppState>) -> Json<Vec<WorkflowSummary>> {
    let summaries = state
        .wfm
        .graph
        .list_workflows()
        .into_iter()
        .map(|wf| WorkflowSummary {
            name: wf.name,
            id: wf.id,
            status: format!("{:?}", wf.state),
        })
        .collect();
    Json(summaries)
}

async fn download_archive(State(state): State<AppState>, Path(id): Path<uuid::Uuid>) -> impl IntoResponse {
    let wf_id = WorkflowId(id);
    let path = archive::archive_path(&state.wfm.config.archive_root, wf_id);
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/gzip".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{wf_id}.tgz\""),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(_) => error_response(WfmError::NotFound(format!("no archive for workflow {wf_id}"))).into_response(),
    }
}

/// `PUT /workflows/{wf_id}/update/`: the TM's state-change callback.
async fn task_update(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(body): Json<TaskUpdateBody>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let wf_id = WorkflowId(id);
    let task_id: TaskId = body.task_id;
    state
        .wfm
        .on_task_state(wf_id, task_id, body.job_state, body.output)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::OK)
}
