//! Cross-cutting error taxonomy.
//!
//! Each service crate keeps its own narrower error enum for precise internal
//! matching and converts into `BeeError` at its HTTP boundary, the way a
//! status code is picked once, in one place.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BeeError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("backend error: {0}")]
    BackendError(String),

    #[error("submit failed: {0}")]
    SubmitFail(String),

    #[error("build error: {0}")]
    BuildError(String),
}

impl BeeError {
    /// HTTP status code this error maps to at a service boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            BeeError::NotFound(_) => 404,
            BeeError::BadRequest(_) => 400,
            BeeError::Invariant(_) => 500,
            BeeError::StoreUnavailable(_) => 503,
            BeeError::BackendError(_) => 502,
            BeeError::SubmitFail(_) => 500,
            BeeError::BuildError(_) => 418,
        }
    }
}
