//! Scheduler: given a batch of ready tasks and a resource inventory,
//! assigns start times and resource allocations under a pluggable algorithm.

pub mod algorithms;
pub mod allocator;
pub mod error;
pub mod types;

pub use algorithms::{choose, Algorithm, Backfill, Fcfs, Mars, Sjf};
pub use error::SchedulerError;
pub use types::{Allocation, Capacity, Resource, ScheduleOpts, SchedTask, TaskRequirements};
