use bee_common::BeeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphStoreError {
    #[error("workflow {0} already exists")]
    WorkflowExists(String),

    #[error("workflow {0} not found")]
    WorkflowNotFound(String),

    #[error("task {0} not found")]
    TaskNotFound(String),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("restart limit exceeded for task {0}")]
    RestartLimitExceeded(String),

    #[error("graph store unavailable")]
    Unavailable,
}

impl From<GraphStoreError> for BeeError {
    fn from(e: GraphStoreError) -> Self {
        match e {
            GraphStoreError::WorkflowNotFound(_) | GraphStoreError::TaskNotFound(_) => {
                BeeError::NotFound(e.to_string())
            }
            GraphStoreError::WorkflowExists(_) | GraphStoreError::Invariant(_) => {
                BeeError::Invariant(e.to_string())
            }
            GraphStoreError::RestartLimitExceeded(_) => BeeError::BadRequest(e.to_string()),
            GraphStoreError::Unavailable => BeeError::StoreUnavailable(e.to_string()),
        }
    }
}
