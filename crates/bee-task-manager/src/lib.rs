//! Task Manager: bridges scheduled tasks to a workload backend, polls for
//! state changes, and reports them to the Workflow Manager.

pub mod backend;
pub mod error;
pub mod http;
pub mod script;
pub mod state;
pub mod tick;
pub mod types;
pub mod wfm_client;

pub use backend::{LsfBackend, SimpleBackend, SlurmBackend, WorkloadBackend};
pub use error::TmError;
pub use state::{CancelOutcome, TmState};
pub use tick::Tm;
pub use types::{JobRecord, JobState, MpiRequirement, ScheduledTask, TaskUpdate};
pub use wfm_client::WfmClient;
