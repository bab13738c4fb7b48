use std::fmt;

use thiserror::Error;

/// Coarse error taxonomy the engine surfaces across its module boundary.
///
/// Collaborators (an RPC layer, a sequencer) map each kind to their own
/// wire-level status; nothing backend-specific ever crosses this boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    FailedPrecondition,
    InvalidArgument,
    ResourceExhausted,
    Aborted,
    Internal,
    Unavailable,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not_found",
            Self::FailedPrecondition => "failed_precondition",
            Self::InvalidArgument => "invalid_argument",
            Self::ResourceExhausted => "resource_exhausted",
            Self::Aborted => "aborted",
            Self::Internal => "internal",
            Self::Unavailable => "unavailable",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct StorageError {
    pub kind: ErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FailedPrecondition, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceExhausted, message)
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Aborted, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, message)
    }

    /// A generic, backend-agnostic cancellation signal (spec §5): mapped to
    /// `Aborted` since the caller's recourse is the same as a transient
    /// isolation conflict — retry the whole operation.
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Aborted, "operation cancelled")
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::not_found(err.to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => Self::unavailable(err.to_string()),
            sqlx::Error::Database(db_err) => {
                // Postgres SQLSTATE 40001/40P01: serialization_failure / deadlock_detected.
                match db_err.code().as_deref() {
                    Some("40001") | Some("40P01") => Self::aborted(err.to_string()),
                    _ => Self::internal(err.to_string()),
                }
            }
            _ => Self::internal(err.to_string()),
        }
    }
}

/// Postgres SQLSTATE `23505`: a unique-key conflict. Callers in the queue
/// path (spec §4.2) must check this *before* routing an error through
/// `From<sqlx::Error>`, since a duplicate `leaf_identity_hash` is part of
/// the contract, not a failure.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505")
    )
}

pub type StorageResult<T> = Result<T, StorageError>;
