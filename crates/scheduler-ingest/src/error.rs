//! Glue error type aggregating the subsystems the ingest service touches.
//! Shape mirrors `rustpress_core::error::Error`'s aggregation via `#[from]`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Database(#[from] scheduler_database::Error),

    #[error(transparent)]
    Broker(#[from] scheduler_broker::Error),

    #[error(transparent)]
    Core(#[from] scheduler_core::Error),

    #[error("invalid cancel message: {reason}")]
    InvalidCancel { reason: String },

    #[error("malformed command body: {reason}")]
    Decode { reason: String },
}

impl IngestError {
    pub fn invalid_cancel(reason: impl Into<String>) -> Self {
        IngestError::InvalidCancel {
            reason: reason.into(),
        }
    }

    pub fn decode(reason: impl Into<String>) -> Self {
        IngestError::Decode {
            reason: reason.into(),
        }
    }

    /// Decode/validation failures are rejected no-requeue (routed to DLQ);
    /// everything else gets a requeue so the broker redelivers — spec.md
    /// §4.3's dispatch table.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            IngestError::InvalidCancel { .. }
                | IngestError::Decode { .. }
                | IngestError::Core(scheduler_core::Error::PastSchedule)
                | IngestError::Core(scheduler_core::Error::InvalidSchedule { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
