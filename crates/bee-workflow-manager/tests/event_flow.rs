//! End-to-end exercise of the WFM's event flow against a real `GraphStore`
//! and a minimal mock Task Manager HTTP server standing in for
//! `bee-task-manager`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, post};
use axum::{Json, Router};
use bee_common::config::BeeConfig;
use bee_graph_store::{GraphStore, Port, Requirement, Task, Workflow};
use bee_scheduler::{Capacity, Resource};
use bee_workflow_manager::types::JobStateWire;
use bee_workflow_manager::{TmClient, Wfm};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct MockTm {
    submitted: Arc<Mutex<Vec<serde_json::Value>>>,
    cancelled: Arc<Mutex<Vec<uuid::Uuid>>>,
}

async fn mock_submit(State(mock): State<MockTm>, Json(body): Json<serde_json::Value>) -> StatusCode {
    mock.submitted.lock().unwrap().push(body);
    StatusCode::OK
}

async fn mock_cancel(State(mock): State<MockTm>, Path(id): Path<uuid::Uuid>) -> StatusCode {
    mock.cancelled.lock().unwrap().push(id);
    StatusCode::OK
}

async fn spawn_mock_tm() -> (MockTm, String) {
    let mock = MockTm::default();
    let app = Router::new()
        .route("/tasks/submit", post(mock_submit))
        .route("/tasks/:id", delete(mock_cancel))
        .with_state(mock.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (mock, format!("http://{addr}"))
}

fn resource_capacity(nodes: u32) -> Resource {
    Resource {
        id: "r0".to_string(),
        capacity: Capacity {
            nodes,
            cores_per_node: 4,
            mem_per_node_mb: 4096,
            accelerators: 0,
        },
    }
}

fn resource_requirements(task: &mut Task, nodes: u64, max_runtime: i64) {
    task.requirements.push(Requirement {
        class: "ResourceRequirement".into(),
        key: "nodes".into(),
        value: serde_json::json!(nodes),
    });
    task.requirements.push(Requirement {
        class: "ResourceRequirement".into(),
        key: "mem_per_node".into(),
        value: serde_json::json!(1024),
    });
    task.requirements.push(Requirement {
        class: "ResourceRequirement".into(),
        key: "max_runtime".into(),
        value: serde_json::json!(max_runtime),
    });
}

fn test_config(workdir: &std::path::Path) -> BeeConfig {
    let mut cfg = BeeConfig::default();
    cfg.workdir = workdir.join("work");
    cfg.archive_root = workdir.join("archives");
    cfg
}

fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("bee-wfm-test-{}", uuid::Uuid::new_v4()))
}

/// Builds a linear two-task workflow: A (workflow entry) -> B (depends on
/// A's output).
fn linear_workflow() -> (Workflow, Task, Task) {
    let wf = Workflow::new("linear");
    let wf_id = wf.id;

    let mut a = Task::new(wf_id, "A", "echo");
    a.outputs.push(Port::new("a.out", "File").with_glob("a.txt"));
    resource_requirements(&mut a, 1, 10);

    let mut b = Task::new(wf_id, "B", "cat");
    b.inputs.push(Port::new("b.in", "File").with_source("a.out"));
    resource_requirements(&mut b, 1, 10);

    (wf, a, b)
}

#[tokio::test]
async fn start_dispatches_the_entry_task_only() {
    let (mock, tm_addr) = spawn_mock_tm().await;
    let dir = temp_dir();
    let graph = Arc::new(GraphStore::new());
    let tm = TmClient::new(tm_addr);
    let wfm = Arc::new(Wfm::new(graph.clone(), tm, test_config(&dir), vec![resource_capacity(2)]));

    let (wf, a, b) = linear_workflow();
    let wf_id = wf.id;
    let a_id = a.id;
    wfm.submit(wf, vec![a, b]).unwrap();

    wfm.start(wf_id).await.unwrap();

    // Only A is a workflow-entry task with no unsatisfied dependency.
    let submitted = mock.submitted.lock().unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0]["task"]["task_id"], serde_json::json!(a_id));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn completing_a_dispatches_b_and_propagates_value() {
    let (mock, tm_addr) = spawn_mock_tm().await;
    let dir = temp_dir();
    let graph = Arc::new(GraphStore::new());
    let tm = TmClient::new(tm_addr);
    let wfm = Arc::new(Wfm::new(graph.clone(), tm, test_config(&dir), vec![resource_capacity(2)]));

    let (wf, a, b) = linear_workflow();
    let wf_id = wf.id;
    let a_id = a.id;
    let b_id = b.id;
    wfm.submit(wf, vec![a, b]).unwrap();
    wfm.start(wf_id).await.unwrap();

    wfm.on_task_state(wf_id, a_id, JobStateWire::Completed, None).await.unwrap();

    let submitted = mock.submitted.lock().unwrap();
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[1]["task"]["task_id"], serde_json::json!(b_id));
    drop(submitted);

    let b_task = graph.get_task(b_id).unwrap();
    assert_eq!(b_task.inputs[0].value, Some(serde_json::json!("a.txt")));

    // Finish the chain and confirm the workflow archives.
    wfm.on_task_state(wf_id, b_id, JobStateWire::Completed, None).await.unwrap();
    let wf_after = graph.get_workflow(wf_id).unwrap();
    assert_eq!(wf_after.state, bee_graph_store::WorkflowState::Archived);
    assert!(bee_workflow_manager::archive::archive_path(&wfm.config.archive_root, wf_id).exists());

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn pause_blocks_dispatch_until_resume() {
    let (mock, tm_addr) = spawn_mock_tm().await;
    let dir = temp_dir();
    let graph = Arc::new(GraphStore::new());
    let tm = TmClient::new(tm_addr);
    let wfm = Arc::new(Wfm::new(graph.clone(), tm, test_config(&dir), vec![resource_capacity(2)]));

    let (wf, a, b) = linear_workflow();
    let wf_id = wf.id;
    let a_id = a.id;
    wfm.submit(wf, vec![a, b]).unwrap();
    wfm.start(wf_id).await.unwrap();
    assert_eq!(mock.submitted.lock().unwrap().len(), 1);

    wfm.pause(wf_id).unwrap();
    wfm.on_task_state(wf_id, a_id, JobStateWire::Completed, None).await.unwrap();

    // B became READY (finalize_task ran) but paused means it is not handed
    // to the TM yet.
    assert_eq!(mock.submitted.lock().unwrap().len(), 1);

    wfm.resume(wf_id).await.unwrap();
    assert_eq!(mock.submitted.lock().unwrap().len(), 2);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn cancel_marks_non_terminal_tasks_cancelled_and_archives() {
    let (mock, tm_addr) = spawn_mock_tm().await;
    let dir = temp_dir();
    let graph = Arc::new(GraphStore::new());
    let tm = TmClient::new(tm_addr);
    let wfm = Arc::new(Wfm::new(graph.clone(), tm, test_config(&dir), vec![resource_capacity(2)]));

    let (wf, a, b) = linear_workflow();
    let wf_id = wf.id;
    let a_id = a.id;
    wfm.submit(wf, vec![a, b.clone()]).unwrap();
    wfm.start(wf_id).await.unwrap();

    wfm.cancel(wf_id).await.unwrap();

    assert!(mock.cancelled.lock().unwrap().contains(&a_id.0));
    let wf_after = graph.get_workflow(wf_id).unwrap();
    assert_eq!(wf_after.state, bee_graph_store::WorkflowState::Archived);
    let b_after = graph.get_task(b.id).unwrap();
    assert_eq!(b_after.state, bee_graph_store::TaskState::Cancelled);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn zero_task_workflow_archives_immediately_on_start() {
    let (_mock, tm_addr) = spawn_mock_tm().await;
    let dir = temp_dir();
    let graph = Arc::new(GraphStore::new());
    let tm = TmClient::new(tm_addr);
    let wfm = Arc::new(Wfm::new(graph.clone(), tm, test_config(&dir), vec![resource_capacity(2)]));

    let wf = Workflow::new("empty");
    let wf_id = wf.id;
    wfm.submit(wf, vec![]).unwrap();
    wfm.start(wf_id).await.unwrap();

    let wf_after = graph.get_workflow(wf_id).unwrap();
    assert_eq!(wf_after.state, bee_graph_store::WorkflowState::Archived);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn required_task_failure_cancels_siblings_and_archives() {
    let (mock, tm_addr) = spawn_mock_tm().await;
    let dir = temp_dir();
    let graph = Arc::new(GraphStore::new());
    let tm = TmClient::new(tm_addr);
    let wfm = Arc::new(Wfm::new(graph.clone(), tm, test_config(&dir), vec![resource_capacity(2)]));

    // Two independent entry tasks, A and C, so C is still non-terminal
    // (dispatched, not yet reported) when A fails.
    let wf = Workflow::new("fan-out");
    let wf_id = wf.id;
    let mut a = Task::new(wf_id, "A", "false");
    resource_requirements(&mut a, 1, 10);
    let a_id = a.id;
    let mut c = Task::new(wf_id, "C", "sleep");
    resource_requirements(&mut c, 1, 10);
    let c_id = c.id;
    wfm.submit(wf, vec![a, c]).unwrap();
    wfm.start(wf_id).await.unwrap();
    assert_eq!(mock.submitted.lock().unwrap().len(), 2);

    wfm.on_task_state(wf_id, a_id, JobStateWire::Failed, None).await.unwrap();

    let wf_after = graph.get_workflow(wf_id).unwrap();
    assert_eq!(wf_after.state, bee_graph_store::WorkflowState::Archived);
    let c_after = graph.get_task(c_id).unwrap();
    assert_eq!(c_after.state, bee_graph_store::TaskState::Cancelled);
    assert!(mock.cancelled.lock().unwrap().contains(&c_id.0));
    assert!(bee_workflow_manager::archive::archive_path(&wfm.config.archive_root, wf_id).exists());

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn idempotent_update_on_terminal_task_is_a_no_op() {
    let (mock, tm_addr) = spawn_mock_tm().await;
    let dir = temp_dir();
    let graph = Arc::new(GraphStore::new());
    let tm = TmClient::new(tm_addr);
    let wfm = Arc::new(Wfm::new(graph.clone(), tm, test_config(&dir), vec![resource_capacity(2)]));

    let (wf, a, b) = linear_workflow();
    let wf_id = wf.id;
    let a_id = a.id;
    wfm.submit(wf, vec![a, b]).unwrap();
    wfm.start(wf_id).await.unwrap();

    wfm.on_task_state(wf_id, a_id, JobStateWire::Completed, None).await.unwrap();
    let after_first = mock.submitted.lock().unwrap().len();

    // Delivery is at-least-once; a duplicate completion for A must not
    // re-finalize or re-dispatch B.
    wfm.on_task_state(wf_id, a_id, JobStateWire::Completed, None).await.unwrap();
    assert_eq!(mock.submitted.lock().unwrap().len(), after_first);

    std::fs::remove_dir_all(&dir).ok();
}
