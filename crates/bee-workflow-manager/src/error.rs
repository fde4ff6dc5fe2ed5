use bee_common::BeeError;
use bee_graph_store::GraphStoreError;
use bee_scheduler::SchedulerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WfmError {
    #[error(transparent)]
    GraphStore(#[from] GraphStoreError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error("invalid transition: {0}")]
    BadTransition(String),
    #[error("malformed submission: {0}")]
    BadRequest(String),
    #[error("archive I/O failed: {0}")]
    ArchiveIo(String),
    #[error("task manager unreachable: {0}")]
    TmUnreachable(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for WfmError {
    fn from(e: std::io::Error) -> Self {
        WfmError::ArchiveIo(e.to_string())
    }
}

impl From<WfmError> for BeeError {
    fn from(e: WfmError) -> Self {
        match e {
            WfmError::GraphStore(g) => g.into(),
            WfmError::Scheduler(s) => s.into(),
            WfmError::BadTransition(m) => BeeError::BadRequest(m),
            WfmError::BadRequest(m) => BeeError::BadRequest(m),
            WfmError::ArchiveIo(m) => BeeError::Invariant(m),
            WfmError::TmUnreachable(m) => BeeError::BackendError(m),
            WfmError::NotFound(m) => BeeError::NotFound(m),
        }
    }
}
