use bee_common::BeeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TmError {
    #[error("unknown task: {0}")]
    NotFound(String),
    #[error("malformed request: {0}")]
    BadRequest(String),
    #[error("workload backend error: {0}")]
    BackendError(String),
    #[error("backend refused submission: {0}")]
    SubmitFail(String),
}

impl From<TmError> for BeeError {
    fn from(e: TmError) -> Self {
        match e {
            TmError::NotFound(m) => BeeError::NotFound(m),
            TmError::BadRequest(m) => BeeError::BadRequest(m),
            TmError::BackendError(m) => BeeError::BackendError(m),
            TmError::SubmitFail(m) => BeeError::SubmitFail(m),
        }
    }
}
