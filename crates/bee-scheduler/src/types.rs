//! Resource inventory, requirements and allocation types.

use bee_common::TaskId;
use serde::{Deserialize, Serialize};

/// A capacity vector: nodes, cores-per-node, memory-per-node, optional
/// accelerators. Used both for a resource's total capacity and for a task's
/// requested capacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Capacity {
    pub nodes: u32,
    pub cores_per_node: u32,
    pub mem_per_node_mb: u64,
    pub accelerators: u32,
}

impl Capacity {
    pub fn fits_within(&self, total: &Capacity) -> bool {
        self.nodes <= total.nodes
            && self.cores_per_node <= total.cores_per_node
            && self.mem_per_node_mb <= total.mem_per_node_mb
            && self.accelerators <= total.accelerators
    }

    pub fn saturating_sub(&self, other: &Capacity) -> Capacity {
        Capacity {
            nodes: self.nodes.saturating_sub(other.nodes),
            cores_per_node: self.cores_per_node.saturating_sub(other.cores_per_node),
            mem_per_node_mb: self.mem_per_node_mb.saturating_sub(other.mem_per_node_mb),
            accelerators: self.accelerators.saturating_sub(other.accelerators),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub capacity: Capacity,
}

/// Required task fields per the scheduler contract: `max_runtime`, `nodes`,
/// `mem_per_node` are mandatory; the rest are algorithm-specific.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TaskRequirements {
    pub max_runtime: i64,
    pub capacity: Capacity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    pub task_id: TaskId,
    pub resource_id: String,
    pub start_time: i64,
    pub max_runtime: i64,
    pub requested_capacity: Capacity,
}

impl Allocation {
    /// For a queried interval `[s, s+d)`, an allocation `[s', s'+d')`
    /// overlaps iff `s < s'+d' ∧ s' < s+d`.
    pub fn overlaps(&self, start: i64, duration: i64) -> bool {
        start < self.start_time + self.max_runtime && self.start_time < start + duration
    }
}

/// A task as seen by the scheduler: an identity, its requirements, and the
/// allocation(s) assigned to it. Empty `allocations` means unscheduleable
/// (or not yet scheduled).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedTask {
    pub id: TaskId,
    pub requirements: TaskRequirements,
    #[serde(default)]
    pub allocations: Vec<Allocation>,
}

impl SchedTask {
    pub fn new(id: TaskId, requirements: TaskRequirements) -> Self {
        Self {
            id,
            requirements,
            allocations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleOpts {
    pub now: i64,
}
