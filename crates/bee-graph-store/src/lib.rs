//! Workflow State Engine: a transactional dependency graph of workflows,
//! tasks and ports, with ready-set computation and value propagation.

pub mod error;
pub mod store;
pub mod types;

pub use error::GraphStoreError;
pub use store::GraphStore;
pub use types::{Hint, Port, Requirement, Task, TaskState, Workflow, WorkflowState};

#[cfg(test)]
mod tests {
    use super::*;
    use bee_common::WorkflowId;

    fn linear_workflow() -> (GraphStore, WorkflowId, Task, Task, Task) {
        let store = GraphStore::new();
        let wf = Workflow::new("linear");
        let wf_id = wf.id;
        store.initialize_workflow(wf).unwrap();

        let mut a = Task::new(wf_id, "A", "echo a");
        a.outputs.push(Port::new("a.out", "File").with_glob("a.txt"));

        let mut b = Task::new(wf_id, "B", "echo b");
        b.inputs.push(Port::new("b.in", "File").with_source("a.out"));
        b.outputs.push(Port::new("b.out", "File").with_glob("b.txt"));

        let mut c = Task::new(wf_id, "C", "echo c");
        c.inputs.push(Port::new("c.in", "File").with_source("b.out"));

        (store, wf_id, a, b, c)
    }

    #[test]
    fn load_order_is_irrelevant() {
        // Load C, then A, then B -- edges must still form A -> B -> C.
        let (store, wf_id, a, b, c) = linear_workflow();
        let (c_id, a_id, b_id) = (c.id, a.id, b.id);
        store.load_task(c).unwrap();
        store.load_task(a).unwrap();
        store.load_task(b).unwrap();

        assert_eq!(store.get_dependent_tasks(a_id), vec![b_id]);
        assert_eq!(store.get_dependent_tasks(b_id), vec![c_id]);
    }

    #[test]
    fn load_task_is_idempotent() {
        let (store, wf_id, a, _b, _c) = linear_workflow();
        let a_again = a.clone();
        store.load_task(a).unwrap();
        store.load_task(a_again).unwrap();
        assert_eq!(store.list_tasks(wf_id).len(), 1);
    }

    #[test]
    fn finalize_propagates_values_and_unblocks_successor() {
        let (store, wf_id, a, b, c) = linear_workflow();
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        store.load_task(a).unwrap();
        store.load_task(b).unwrap();
        store.load_task(c).unwrap();
        store.execute_workflow(wf_id).unwrap();

        assert_eq!(store.get_task_state(a_id).unwrap(), TaskState::Ready);
        assert_eq!(store.get_task_state(b_id).unwrap(), TaskState::Waiting);

        // As the WFM does on task completion: resolve the glob output, then finalize.
        store
            .set_output_value(a_id, "a.out", serde_json::json!("/data/a.txt"))
            .unwrap();
        store.set_task_state(a_id, TaskState::Completed).unwrap();
        let ready = store.finalize_task(a_id).unwrap();

        assert_eq!(ready, vec![b_id]);
        let b_task = store.get_task(b_id).unwrap();
        assert_eq!(b_task.inputs[0].value, Some(serde_json::json!("/data/a.txt")));
        assert_eq!(store.get_task_state(c_id).unwrap(), TaskState::Waiting);
    }

    #[test]
    fn cycle_is_rejected() {
        let store = GraphStore::new();
        let wf = Workflow::new("cyclic");
        let wf_id = wf.id;
        store.initialize_workflow(wf).unwrap();

        let mut a = Task::new(wf_id, "A", "echo a");
        a.inputs.push(Port::new("a.in", "File").with_source("b.out"));
        a.outputs.push(Port::new("a.out", "File"));
        let a_id = a.id;

        let mut b = Task::new(wf_id, "B", "echo b");
        b.inputs.push(Port::new("b.in", "File").with_source("a.out"));
        b.outputs.push(Port::new("b.out", "File"));

        store.load_task(a).unwrap();
        let err = store.load_task(b);
        assert!(err.is_err());
        assert_eq!(store.list_tasks(wf_id).len(), 1);
        let _ = a_id;
    }

    #[test]
    fn zero_task_workflow_is_immediately_completable() {
        let store = GraphStore::new();
        let wf = Workflow::new("empty");
        let wf_id = wf.id;
        store.initialize_workflow(wf).unwrap();
        assert!(store.empty(wf_id));
        assert!(store.workflow_completed(wf_id));
    }

    #[test]
    fn unscheduleable_task_stays_waiting() {
        let store = GraphStore::new();
        let wf = Workflow::new("stuck");
        let wf_id = wf.id;
        store.initialize_workflow(wf).unwrap();
        let mut t = Task::new(wf_id, "T", "echo t");
        t.inputs.push(Port::new("t.in", "File").with_source("nothing.out"));
        let t_id = t.id;
        store.load_task(t).unwrap();
        store.execute_workflow(wf_id).unwrap();
        assert_eq!(store.get_task_state(t_id).unwrap(), TaskState::Waiting);
        assert!(!store.workflow_completed(wf_id));
    }

    #[test]
    fn restart_enforces_bounded_counter() {
        let store = GraphStore::new();
        let wf = Workflow::new("restartable");
        let wf_id = wf.id;
        store.initialize_workflow(wf).unwrap();
        let mut t = Task::new(wf_id, "R", "echo r");
        t.hints.push(Hint {
            class: "CheckpointRequirement".to_string(),
            key: "enabled".to_string(),
            value: serde_json::json!(true),
        });
        let t_id = t.id;
        store.load_task(t).unwrap();

        let mut current = t_id;
        for _ in 0..3 {
            let restarted = store.restart_task(current, 3).unwrap();
            assert_eq!(restarted.state, TaskState::Restarted);
            current = restarted.id;
        }
        let fourth = store.restart_task(current, 3);
        assert!(fourth.is_err());
    }

    #[test]
    fn idempotent_state_update() {
        let store = GraphStore::new();
        let wf = Workflow::new("idempotent");
        let wf_id = wf.id;
        store.initialize_workflow(wf).unwrap();
        let t = Task::new(wf_id, "T", "echo t");
        let t_id = t.id;
        store.load_task(t).unwrap();
        store.set_task_state(t_id, TaskState::Running).unwrap();
        store.set_task_state(t_id, TaskState::Running).unwrap();
        assert_eq!(store.get_task_state(t_id).unwrap(), TaskState::Running);
    }
}
