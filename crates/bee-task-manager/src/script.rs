//! Job script templating: a task plus its backend-specific directives,
//! rendered into a runnable shell script.

use crate::types::ScheduledTask;
use bee_common::config::BackendKind;

/// Composes a shell script: shebang, backend directives, stdout/stderr
/// paths under `workdir/workflows/{wf_id}/{name}-{id}/`, node/rank
/// directives derived from `MpiRequirement`, then the pre-rendered command.
pub fn render(task: &ScheduledTask, backend: BackendKind) -> String {
    let run_dir = task
        .workdir
        .join("workflows")
        .join(task.wf_id.to_string())
        .join(format!("{}-{}", task.name, task.task_id));
    let job_name = format!("{}-{}", task.name, task.task_id);

    let mut lines = vec!["#!/bin/sh".to_string()];
    match backend {
        BackendKind::Slurm => {
            lines.push(format!("#SBATCH --job-name={job_name}"));
            lines.push(format!("#SBATCH --output={}/stdout", run_dir.display()));
            lines.push(format!("#SBATCH --error={}/stderr", run_dir.display()));
            if let Some(mpi) = task.mpi {
                lines.push(format!("#SBATCH --nodes={}", mpi.nodes));
                lines.push(format!("#SBATCH --ntasks-per-node={}", mpi.tasks_per_node));
            }
        }
        BackendKind::Lsf => {
            lines.push(format!("#BSUB -J {job_name}"));
            lines.push(format!("#BSUB -o {}/stdout", run_dir.display()));
            lines.push(format!("#BSUB -e {}/stderr", run_dir.display()));
            if let Some(mpi) = task.mpi {
                lines.push(format!("#BSUB -n {}", mpi.nodes * mpi.tasks_per_node));
            }
        }
        BackendKind::Simple => {
            lines.push(format!("# job: {job_name}"));
            lines.push(format!("mkdir -p {}", run_dir.display()));
        }
    }
    lines.push(task.command.join(" "));
    lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use bee_common::{TaskId, WorkflowId};
    use std::path::PathBuf;

    fn sample_task() -> ScheduledTask {
        ScheduledTask {
            task_id: TaskId::new(),
            wf_id: WorkflowId::new(),
            name: "hello".to_string(),
            workdir: PathBuf::from("/tmp/bee"),
            mpi: Some(crate::types::MpiRequirement {
                nodes: 2,
                tasks_per_node: 4,
            }),
            command: vec!["echo".to_string(), "hi".to_string()],
        }
    }

    #[test]
    fn slurm_script_carries_node_directives() {
        let script = render(&sample_task(), BackendKind::Slurm);
        assert!(script.starts_with("#!/bin/sh\n"));
        assert!(script.contains("#SBATCH --nodes=2"));
        assert!(script.contains("#SBATCH --ntasks-per-node=4"));
        assert!(script.ends_with("echo hi\n"));
    }

    #[test]
    fn simple_script_has_no_scheduler_directives() {
        let script = render(&sample_task(), BackendKind::Simple);
        assert!(!script.contains("#SBATCH"));
        assert!(!script.contains("#BSUB"));
        assert!(script.contains("echo hi"));
    }
}
