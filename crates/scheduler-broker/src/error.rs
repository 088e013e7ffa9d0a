//! Broker errors. Shape mirrors `scheduler_database::error::Error`: named
//! variants, a `source`, and a retryability classification.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Connecting or reconnecting to the broker failed.
    #[error("broker connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Declaring exchanges/queues at startup failed. Fatal — the topology is
    /// a precondition for everything else.
    #[error("failed to declare broker topology: {message}")]
    TopologyDeclaration {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A publish did not receive a positive confirmation from the broker.
    #[error("publish to {routing_key} was not confirmed")]
    ConfirmationFailure { routing_key: String },

    /// A message body wasn't valid JSON, or didn't decode into the expected shape.
    #[error("malformed message: {message}")]
    Decode { message: String },
}

impl Error {
    pub fn connection(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn topology(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::TopologyDeclaration {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn confirmation_failure(routing_key: impl Into<String>) -> Self {
        Error::ConfirmationFailure {
            routing_key: routing_key.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Error::Decode {
            message: message.into(),
        }
    }

    /// Whether the caller should back off and retry (connection churn) vs.
    /// treat this as fatal (topology) or message-scoped (decode/confirm).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
