//! Workflow Manager: the facade coordinating the Graph Store, the
//! Scheduler and the Task Manager; owns the per-workflow state machine,
//! event dispatch and archiving.

pub mod archive;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod tm_client;
pub mod types;
pub mod wfm;

pub use error::WfmError;
pub use tm_client::TmClient;
pub use wfm::Wfm;
