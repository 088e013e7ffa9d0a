//! Storage errors. Mirrors `rustpress_core::error::Error`'s `Database`
//! variant shape (message + boxed source), narrowed to what the job
//! repository needs.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A transient I/O failure against the store. Callers roll back and
    /// retry at the next tick / redelivery (spec §4.2, §7).
    #[error("database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A non-transient schema problem. Fatal: the process should exit
    /// non-zero and let the orchestrator restart it after a fix.
    #[error("schema error: {message}")]
    SchemaMismatch { message: String },
}

impl Error {
    pub fn database(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Database {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Error::SchemaMismatch {
            message: message.into(),
        }
    }

    /// Whether the caller should roll back and retry, vs. treat this as fatal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Database { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
