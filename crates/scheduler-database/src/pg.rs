//! Postgres-backed `JobRepository`. Grounded on
//! `rustpress_jobs::queue::JobQueue` for the sqlx usage style and on
//! `examples/original_source/src/repo.py` for the exact query shapes
//! (`ON CONFLICT DO NOTHING`, `FOR UPDATE SKIP LOCKED`).

use crate::error::{Error, Result};
use crate::job_repository::{ClaimedBatch, JobRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scheduler_core::{Job, JobStatus, ScheduleSpec};
use sqlx::{PgPool, Postgres, Transaction};
use std::str::FromStr;
use uuid::Uuid;

pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    job_type: String,
    payload: serde_json::Value,
    rrule: Option<String>,
    next_run_at: DateTime<Utc>,
    retries: i32,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = Error;

    fn try_from(row: JobRow) -> std::result::Result<Self, Self::Error> {
        // `timezone` is not a persisted column (spec §3) — it's display-only
        // metadata that lives alongside the RRULE at the producer, never in
        // the jobs table. Reconstructed rows default to "UTC"; `next_after`
        // never reads it. DTSTART is reconstructed from `created_at`, which
        // was set from the same instant the RRULE was anchored to at ingest.
        let spec = match row.rrule {
            Some(rule) => ScheduleSpec::Rrule {
                rule,
                timezone: "UTC".to_string(),
                dtstart: row.created_at,
            },
            None => ScheduleSpec::At(row.next_run_at),
        };
        let status = JobStatus::from_str(&row.status)
            .map_err(|e| Error::schema_mismatch(format!("unreadable job status: {e}")))?;
        Ok(Job {
            id: row.id,
            job_type: row.job_type,
            payload: row.payload,
            spec,
            next_run_at: row.next_run_at,
            retries: row.retries,
            status,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn insert(&self, job: &Job) -> Result<bool> {
        let rrule = job.spec.rrule_body();
        let result = sqlx::query(
            r#"
            INSERT INTO jobs (id, job_type, payload, rrule, next_run_at, retries, status, created_at)
            VALUES ($1, $2, $3, $4, $5, 0, 'pending', $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(job.id)
        .bind(&job.job_type)
        .bind(&job.payload)
        .bind(rrule)
        .bind(job.next_run_at)
        .bind(job.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::database("failed to insert job", e))?;

        let inserted = result.rows_affected() > 0;
        if !inserted {
            tracing::info!(job_id = %job.id, "duplicate insert, ignored");
        }
        Ok(inserted)
    }

    async fn cancel(&self, id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'cancelled' WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::database("failed to cancel job", e))?;

        Ok(result.rows_affected())
    }

    async fn claim_due(&self, now: DateTime<Utc>, limit: i64) -> Result<Box<dyn ClaimedBatch>> {
        let mut tx: Transaction<'static, Postgres> = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::database("failed to begin claim transaction", e))?;

        let rows: Vec<JobRow> = sqlx::query_as(
            r#"
            SELECT id, job_type, payload, rrule, next_run_at, retries, status, created_at
            FROM jobs
            WHERE status = 'pending' AND next_run_at <= $1
            ORDER BY next_run_at ASC
            LIMIT $2
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| Error::database("failed to claim due jobs", e))?;

        let mut jobs = Vec::with_capacity(rows.len());
        for row in rows {
            jobs.push(Job::try_from(row)?);
        }

        Ok(Box::new(PgClaimedBatch {
            tx: Some(tx),
            jobs,
        }))
    }
}

struct PgClaimedBatch {
    tx: Option<Transaction<'static, Postgres>>,
    jobs: Vec<Job>,
}

impl PgClaimedBatch {
    fn tx_mut(&mut self) -> &mut Transaction<'static, Postgres> {
        self.tx.as_mut().expect("transaction already consumed")
    }
}

#[async_trait]
impl ClaimedBatch for PgClaimedBatch {
    fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    async fn reschedule(&mut self, id: Uuid, next_run_at: DateTime<Utc>, retries: i32) -> Result<()> {
        sqlx::query("UPDATE jobs SET next_run_at = $2, retries = $3 WHERE id = $1")
            .bind(id)
            .bind(next_run_at)
            .bind(retries)
            .execute(self.tx_mut())
            .await
            .map_err(|e| Error::database("failed to reschedule job", e))?;
        Ok(())
    }

    async fn mark_done(&mut self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE jobs SET status = 'done' WHERE id = $1")
            .bind(id)
            .execute(self.tx_mut())
            .await
            .map_err(|e| Error::database("failed to mark job done", e))?;
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        let tx = self.tx.take().expect("transaction already consumed");
        tx.commit()
            .await
            .map_err(|e| Error::database("failed to commit claim batch", e))
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        let tx = self.tx.take().expect("transaction already consumed");
        tx.rollback()
            .await
            .map_err(|e| Error::database("failed to roll back claim batch", e))
    }
}

/// Check DB connectivity — used by `scheduler-health`.
pub async fn ping(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| Error::database("database ping failed", e))?;
    Ok(())
}
