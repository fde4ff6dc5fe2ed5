use bee_common::BeeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("malformed task requirements: {0}")]
    MalformedRequirements(String),
}

impl From<SchedulerError> for BeeError {
    fn from(e: SchedulerError) -> Self {
        BeeError::BadRequest(e.to_string())
    }
}
