//! Command ingest service: decode schedule requests/cancellations off the
//! inbox queue and apply them to the job store.

pub mod error;
pub mod service;

pub use error::{IngestError, Result};
pub use service::{handle_command, run};
