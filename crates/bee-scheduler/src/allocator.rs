//! `TaskAllocator` — tracks allocations made so far during one `schedule_all`
//! pass and answers "does this fit" / "can this run now" / "when does
//! capacity next free up" queries against the resource inventory.

use crate::types::{Allocation, Capacity, Resource, TaskRequirements};
use bee_common::TaskId;

pub struct TaskAllocator<'a> {
    resources: &'a [Resource],
    allocations: Vec<Allocation>,
}

impl<'a> TaskAllocator<'a> {
    pub fn new(resources: &'a [Resource]) -> Self {
        Self {
            resources,
            allocations: Vec::new(),
        }
    }

    /// True if some resource's raw capacity could ever satisfy `req`,
    /// independent of time.
    pub fn fits_requirements(&self, req: &TaskRequirements) -> bool {
        self.resources.iter().any(|r| req.capacity.fits_within(&r.capacity))
    }

    /// Remaining capacity on `resource` over `[start, start+duration)`:
    /// capacity minus the sum of overlapping allocations' capacities.
    fn remaining_capacity(&self, resource: &Resource, start: i64, duration: i64) -> Capacity {
        let mut remaining = resource.capacity;
        for alloc in self.allocations.iter().filter(|a| a.resource_id == resource.id) {
            if alloc.overlaps(start, duration) {
                remaining = remaining.saturating_sub(&alloc.requested_capacity);
            }
        }
        remaining
    }

    /// True if some resource has enough remaining capacity for `req` over
    /// `[start_time, start_time + req.max_runtime)`.
    pub fn can_run_now(&self, req: &TaskRequirements, start_time: i64) -> bool {
        self.best_resource(req, start_time).is_some()
    }

    /// Resources are tried in id order so that, among equally-fitting
    /// candidates, the lower-id resource wins the tie-break.
    fn best_resource(&self, req: &TaskRequirements, start_time: i64) -> Option<&'a Resource> {
        let mut candidates: Vec<&Resource> = self
            .resources
            .iter()
            .filter(|r| req.capacity.fits_within(&r.capacity))
            .collect();
        candidates.sort_by(|a, b| a.id.cmp(&b.id));
        candidates
            .into_iter()
            .find(|r| req.capacity.fits_within(&self.remaining_capacity(r, start_time, req.max_runtime)))
    }

    /// The next time any existing allocation ends after `start_time`, or
    /// `start_time + 1` if no later end time exists (guards against an
    /// infinite FCFS loop on a query that should be unreachable given
    /// `fits_requirements` held).
    pub fn get_next_end_time(&self, start_time: i64) -> i64 {
        self.allocations
            .iter()
            .map(|a| a.start_time + a.max_runtime)
            .filter(|&end| end > start_time)
            .min()
            .unwrap_or(start_time + 1)
    }

    /// All distinct allocation end times, used by Backfill to search for a
    /// task's shadow time.
    pub fn get_end_times(&self) -> Vec<i64> {
        let mut times: Vec<i64> = self.allocations.iter().map(|a| a.start_time + a.max_runtime).collect();
        times.sort_unstable();
        times.dedup();
        times
    }

    /// Records an allocation for `task_id` on the best-fitting resource at
    /// `start_time` and returns it. Caller must have already verified
    /// `can_run_now`.
    pub fn allocate(&mut self, task_id: TaskId, req: &TaskRequirements, start_time: i64) -> Vec<Allocation> {
        let Some(resource) = self.best_resource(req, start_time) else {
            return Vec::new();
        };
        let alloc = Allocation {
            task_id,
            resource_id: resource.id.clone(),
            start_time,
            max_runtime: req.max_runtime,
            requested_capacity: req.capacity,
        };
        self.allocations.push(alloc.clone());
        vec![alloc]
    }
}
