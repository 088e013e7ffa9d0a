//! The `JobRepository` trait: the sole mediator of durability (spec §4.2).
//!
//! Grounded on `rustpress_jobs::queue::Queue` (async_trait, Result-returning
//! methods over a pool) and `examples/original_source/src/repo.py`'s
//! `JobRepo` (exact operation set: `insert_job`, `cancel_job`,
//! `lock_due_jobs`, `reschedule`, `mark_done`).

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scheduler_core::Job;
use uuid::Uuid;

#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a new job, idempotent on `id`. Returns `true` if this call
    /// inserted the row, `false` if a row with that id already existed.
    async fn insert(&self, job: &Job) -> Result<bool>;

    /// Mark a pending job cancelled. Returns the number of rows affected
    /// (0 or 1) — 0 means the row didn't exist or was no longer pending.
    async fn cancel(&self, id: Uuid) -> Result<u64>;

    /// Begin a transaction, select up to `limit` due rows under row locks
    /// (skipping rows already locked by concurrent claimers), and return a
    /// handle that keeps those rows locked until `commit`/`rollback`.
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Box<dyn ClaimedBatch>>;
}

/// A batch of locked rows plus the open transaction holding those locks.
/// The caller must publish events for every job in `jobs()`, call
/// `reschedule`/`mark_done` for each, and then `commit` — or `rollback` on
/// any failure along the way, per spec §4.4's publisher-confirm gate.
#[async_trait]
pub trait ClaimedBatch: Send {
    /// Jobs in this batch, already ordered ascending by `next_run_at`
    /// (spec §4.4's within-batch ordering requirement).
    fn jobs(&self) -> &[Job];

    async fn reschedule(&mut self, id: Uuid, next_run_at: DateTime<Utc>, retries: i32) -> Result<()>;

    async fn mark_done(&mut self, id: Uuid) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
