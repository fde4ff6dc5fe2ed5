use axum::extract::{Path as AxumPath, State as AxumState};
use axum::routing::put;
use axum::Router;
use bee_common::config::BackendKind;
use bee_common::{TaskId, WorkflowId};
use bee_task_manager::backend::SimpleBackend;
use bee_task_manager::http::{self, AppState};
use bee_task_manager::tick::Tm;
use bee_task_manager::types::ScheduledTask;
use bee_task_manager::{JobState, TmState, WfmClient};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

fn sample_task(name: &str) -> ScheduledTask {
    ScheduledTask {
        task_id: TaskId::new(),
        wf_id: WorkflowId::new(),
        name: name.to_string(),
        workdir: PathBuf::from("/tmp/bee-tm-tests"),
        mpi: None,
        command: vec!["true".to_string()],
    }
}

fn make_tm() -> Arc<Tm> {
    Arc::new(Tm {
        state: Arc::new(TmState::new(3)),
        backend: Arc::new(SimpleBackend::new()),
        backend_kind: BackendKind::Simple,
        // No WFM listening in these tests; the reporting path retries and
        // gives up without panicking. A tiny backoff keeps the test fast.
        wfm: WfmClient::with_base_backoff("http://127.0.0.1:0", std::time::Duration::from_millis(5)),
    })
}

#[tokio::test]
async fn submit_moves_task_from_submit_queue_to_job_queue() {
    let tm = make_tm();
    tm.state.submit(sample_task("noop")).await;
    assert_eq!(tm.state.queues.lock().await.submit_queue.len(), 1);

    tm.check_tasks().await;

    let queues = tm.state.queues.lock().await;
    assert_eq!(queues.submit_queue.len(), 0);
    assert_eq!(queues.job_queue.len(), 1);
}

#[tokio::test]
async fn completed_job_is_removed_from_job_queue() {
    let tm = make_tm();
    tm.state.submit(sample_task("quick")).await;
    tm.check_tasks().await;
    assert_eq!(tm.state.queues.lock().await.job_queue.len(), 1);

    // The spawned `true` process exits almost immediately; give it a moment
    // then poll again.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    tm.check_tasks().await;

    assert_eq!(tm.state.queues.lock().await.job_queue.len(), 0);
}

#[tokio::test]
async fn cancel_before_submission_drops_from_submit_queue() {
    let tm = make_tm();
    let task = sample_task("never-runs");
    let task_id = task.task_id;
    tm.state.submit(task).await;

    let outcome = tm.state.cancel(task_id).await;
    assert!(matches!(outcome, bee_task_manager::CancelOutcome::RemovedFromSubmitQueue));
    assert_eq!(tm.state.queues.lock().await.submit_queue.len(), 0);
}

#[tokio::test]
async fn unknown_task_query_returns_none() {
    let tm = make_tm();
    assert!(tm.state.last_known_state(TaskId::new()).await.is_none());
}

#[test]
fn unmapped_backend_state_maps_to_zombie() {
    use bee_task_manager::backend::SlurmBackend;
    assert_eq!(SlurmBackend::canonical("SOME_FUTURE_STATE"), JobState::Zombie);
}

/// Minimal mock WFM HTTP server capturing every `PUT /workflows/:id/update/`
/// body it receives, standing in for `bee-workflow-manager`.
#[derive(Clone, Default)]
struct MockWfm {
    updates: Arc<Mutex<Vec<serde_json::Value>>>,
}

async fn mock_update(
    AxumState(mock): AxumState<MockWfm>,
    AxumPath(_wf_id): AxumPath<uuid::Uuid>,
    axum::Json(body): axum::Json<serde_json::Value>,
) -> axum::http::StatusCode {
    mock.updates.lock().unwrap().push(body);
    axum::http::StatusCode::OK
}

async fn spawn_mock_wfm() -> (MockWfm, String) {
    let mock = MockWfm::default();
    let app = Router::new()
        .route("/workflows/:id/update/", put(mock_update))
        .with_state(mock.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (mock, format!("http://{addr}"))
}

#[tokio::test]
async fn cancelling_an_in_flight_job_reports_cancelled_not_failed() {
    let (mock, wfm_addr) = spawn_mock_wfm().await;
    let tm = Arc::new(Tm {
        state: Arc::new(TmState::new(3)),
        backend: Arc::new(SimpleBackend::new()),
        backend_kind: BackendKind::Simple,
        wfm: WfmClient::new(wfm_addr),
    });

    let mut task = sample_task("long-runner");
    task.command = vec!["sleep".to_string(), "5".to_string()];
    let task_id = task.task_id;
    tm.state.submit(task).await;
    tm.check_tasks().await;
    assert_eq!(tm.state.queues.lock().await.job_queue.len(), 1);

    let app = http::router(AppState { tm: tm.clone() });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let tm_addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let resp = reqwest::Client::new()
        .delete(format!("http://{tm_addr}/tasks/{}", task_id.0))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    // The cancel already removed the job_queue entry, so this tick has
    // nothing left to poll for the task and can't downgrade it to ZOMBIE.
    assert_eq!(tm.state.queues.lock().await.job_queue.len(), 0);
    tm.check_tasks().await;

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let reported: Vec<String> = mock
        .updates
        .lock()
        .unwrap()
        .iter()
        .filter(|u| u["task_id"] == serde_json::json!(task_id))
        .map(|u| u["job_state"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(reported, vec!["PENDING", "CANCELLED"]);
}
