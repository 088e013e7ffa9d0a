//! Due-dispatch service: claims due rows, publishes fire events under
//! publisher confirms, and advances or finishes each row.

pub mod error;
pub mod service;

pub use error::{DispatchError, Result};
pub use service::{run, DispatchConfig};
