//! Shared types for the BEE orchestration core.
//!
//! Every service crate (`bee-graph-store`, `bee-scheduler`, `bee-task-manager`,
//! `bee-workflow-manager`) depends on this crate for identifiers, the
//! cross-cutting error type, configuration loading and telemetry setup.

pub mod config;
pub mod error;
pub mod ids;
pub mod telemetry;

pub use config::BeeConfig;
pub use error::BeeError;
pub use ids::{TaskId, WorkflowId};
