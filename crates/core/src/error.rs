//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic progression failures (validation,
/// membership rules, capacity). Storage and economy concerns belong to infra.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed job definition).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// No job with this name is configured.
    #[error("unknown job: {0}")]
    UnknownJob(String),

    /// The sentinel "none" job cannot be joined or left.
    #[error("the none job cannot be joined or left")]
    NoneJob,

    /// The player already holds this job.
    #[error("job already held: {0}")]
    AlreadyHeld(String),

    /// The player does not hold this job.
    #[error("job not held: {0}")]
    NotHeld(String),

    /// The player holds the configured maximum number of jobs.
    #[error("job limit reached ({max})")]
    JobLimitReached { max: usize },

    /// Every slot of the job is taken.
    #[error("no free slots for job: {0}")]
    NoFreeSlots(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn unknown_job(name: impl Into<String>) -> Self {
        Self::UnknownJob(name.into())
    }
}
