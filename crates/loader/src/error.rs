use thiserror::Error;

use fontreq_core::LoadError;

/// Errors raised by the [`crate::WorkerPool`] when accepting work.
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("worker pool is shut down")]
    ShutDown,

    #[error("job did not finish within {0:?}")]
    Timeout(std::time::Duration),

    #[error("job ended without producing a result")]
    Abandoned,
}

impl From<PoolError> for LoadError {
    fn from(e: PoolError) -> Self {
        match e {
            // A job that vanished without a result was a failed resolution.
            PoolError::Abandoned => LoadError::LoadFailed,
            PoolError::Timeout(after) => LoadError::Timeout(after),
            other => LoadError::Rejected(other.to_string()),
        }
    }
}

/// Errors raised when posting a task to an [`crate::ExecutionContext`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("execution context '{0}' is closed")]
    Closed(String),
}
