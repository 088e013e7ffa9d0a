//! Durable storage for jobs. `JobRepository` is the only interface the rest
//! of the system uses; `pg` and `in_memory` are its two implementations.

pub mod error;
pub mod in_memory;
pub mod job_repository;
pub mod migrate;
pub mod pg;

pub use error::{Error, Result};
pub use in_memory::InMemoryJobRepository;
pub use job_repository::{ClaimedBatch, JobRepository};
pub use migrate::{Migration, Migrator};
pub use pg::PgJobRepository;
