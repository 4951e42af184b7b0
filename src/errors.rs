//! Structured error taxonomy shared by the evaluation core, the API layer,
//! and the worker. Three kinds, per the error handling design: `NotFound`,
//! `Validation`, `Internal`.

use thiserror::Error;

/// The only error type the evaluation core returns. Callers map `kind()` to
/// a transport-specific representation (HTTP status, ack/nack decision).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Coarse classification used by transports to decide status codes and
/// retry behavior without matching on the error variant directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Internal,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        CoreError::NotFound(msg.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
