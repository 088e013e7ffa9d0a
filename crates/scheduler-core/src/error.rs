//! Core domain errors for the scheduler.

use thiserror::Error;

/// Errors raised by the scheduling domain (schedule parsing, job
/// construction). Storage and broker errors live in their own crates.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid schedule: {reason}")]
    InvalidSchedule { reason: String },

    #[error("schedule has no future occurrence (already exhausted or in the past)")]
    PastSchedule,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn invalid_schedule(reason: impl Into<String>) -> Self {
        Error::InvalidSchedule {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
