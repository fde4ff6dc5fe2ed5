//! Translates a graph-store `Task` into what the scheduler and the task
//! manager each need: a `SchedTask` (requirements only) and, once an
//! allocation exists, a `ScheduledTask` (a runnable command).

use crate::error::WfmError;
use bee_graph_store::Task;
use bee_scheduler::{Capacity, SchedTask, TaskRequirements};
use bee_task_manager::{MpiRequirement, ScheduledTask};
use std::path::Path;

fn requirement_u64(task: &Task, class: &str, key: &str, default: u64) -> u64 {
    task.requirement(class, key)
        .and_then(|v| v.as_u64())
        .unwrap_or(default)
}

/// Builds the scheduler's view of `task`: `max_runtime`, `nodes`,
/// `mem_per_node` are required; the rest default to modest values
/// when the workflow author didn't specify them.
pub fn sched_task_for(task: &Task) -> Result<SchedTask, WfmError> {
    let max_runtime = task
        .requirement("ResourceRequirement", "max_runtime")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| WfmError::BadRequest(format!("task {} missing ResourceRequirement/max_runtime", task.id)))?;
    let nodes = task
        .requirement("ResourceRequirement", "nodes")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| WfmError::BadRequest(format!("task {} missing ResourceRequirement/nodes", task.id)))?
        as u32;
    let mem_per_node_mb = task
        .requirement("ResourceRequirement", "mem_per_node")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| WfmError::BadRequest(format!("task {} missing ResourceRequirement/mem_per_node", task.id)))?;

    Ok(SchedTask::new(
        task.id,
        TaskRequirements {
            max_runtime,
            capacity: Capacity {
                nodes,
                cores_per_node: requirement_u64(task, "ResourceRequirement", "cores_per_node", 1) as u32,
                mem_per_node_mb,
                accelerators: requirement_u64(task, "ResourceRequirement", "accelerators", 0) as u32,
            },
        },
    ))
}

fn mpi_requirement(task: &Task) -> Option<MpiRequirement> {
    let nodes = task.requirement("MPIRequirement", "nodes")?.as_u64()? as u32;
    let tasks_per_node = task
        .requirement("MPIRequirement", "tasks_per_node")
        .and_then(|v| v.as_u64())
        .unwrap_or(1) as u32;
    Some(MpiRequirement { nodes, tasks_per_node })
}

/// Renders `task`'s inputs into command tokens, standing in for the
/// (external) container-runtime interface's `run_text(task)`: the base
/// command followed by each input's value, ordered by its CLI `position`
/// hint and preceded by its `prefix` when one is declared.
fn render_command(task: &Task) -> Vec<String> {
    let mut bound: Vec<(u32, Vec<String>)> = task
        .inputs
        .iter()
        .enumerate()
        .map(|(i, port)| {
            let position = port.position.unwrap_or(1_000_000 + i as u32);
            let mut tokens = Vec::new();
            if let Some(prefix) = &port.prefix {
                tokens.push(prefix.clone());
            }
            if let Some(value) = port.value.as_ref().or(port.default.as_ref()) {
                tokens.push(value_to_token(value));
            }
            (position, tokens)
        })
        .collect();
    bound.sort_by_key(|(pos, _)| *pos);

    let mut command = vec![task.base_command.clone()];
    for (_, tokens) in bound {
        command.extend(tokens);
    }
    command
}

fn value_to_token(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn scheduled_task_for(task: &Task, workdir: &Path) -> ScheduledTask {
    ScheduledTask {
        task_id: task.id,
        wf_id: task.workflow_id,
        name: task.name.clone(),
        workdir: workdir.to_path_buf(),
        mpi: mpi_requirement(task),
        command: render_command(task),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bee_common::WorkflowId;
    use bee_graph_store::{Port, Requirement};
    use std::path::PathBuf;

    fn task_with_resources(max_runtime: i64, nodes: u64, mem: u64) -> Task {
        let mut t = Task::new(WorkflowId::new(), "t", "echo");
        t.requirements.push(Requirement {
            class: "ResourceRequirement".into(),
            key: "max_runtime".into(),
            value: serde_json::json!(max_runtime),
        });
        t.requirements.push(Requirement {
            class: "ResourceRequirement".into(),
            key: "nodes".into(),
            value: serde_json::json!(nodes),
        });
        t.requirements.push(Requirement {
            class: "ResourceRequirement".into(),
            key: "mem_per_node".into(),
            value: serde_json::json!(mem),
        });
        t
    }

    #[test]
    fn sched_task_extracts_required_fields() {
        let t = task_with_resources(10, 2, 4096);
        let sched = sched_task_for(&t).unwrap();
        assert_eq!(sched.requirements.max_runtime, 10);
        assert_eq!(sched.requirements.capacity.nodes, 2);
        assert_eq!(sched.requirements.capacity.mem_per_node_mb, 4096);
    }

    #[test]
    fn missing_requirement_is_a_bad_request() {
        let t = Task::new(WorkflowId::new(), "t", "echo");
        assert!(sched_task_for(&t).is_err());
    }

    #[test]
    fn command_orders_inputs_by_position_and_applies_prefix() {
        let mut t = task_with_resources(1, 1, 1);
        t.inputs.push(Port::new("b", "string").with_default(serde_json::json!("second")));
        t.inputs[0].position = Some(2);
        t.inputs.push(Port::new("a", "string").with_default(serde_json::json!("first")));
        t.inputs[1].position = Some(1);
        t.inputs[1].prefix = Some("--name".to_string());

        let cmd = render_command(&t);
        assert_eq!(cmd, vec!["echo", "--name", "first", "second"]);
    }

    #[test]
    fn scheduled_task_carries_mpi_requirement() {
        let mut t = task_with_resources(1, 2, 1);
        t.requirements.push(Requirement {
            class: "MPIRequirement".into(),
            key: "nodes".into(),
            value: serde_json::json!(2),
        });
        t.requirements.push(Requirement {
            class: "MPIRequirement".into(),
            key: "tasks_per_node".into(),
            value: serde_json::json!(4),
        });
        let scheduled = scheduled_task_for(&t, &PathBuf::from("/tmp/bee"));
        let mpi = scheduled.mpi.unwrap();
        assert_eq!(mpi.nodes, 2);
        assert_eq!(mpi.tasks_per_node, 4);
    }
}
