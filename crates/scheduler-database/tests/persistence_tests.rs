//! Integration tests for the job store's schema and repository contract.
//!
//! No live Postgres instance is assumed here — these check migration SQL
//! structure and exercise `InMemoryJobRepository` against the same
//! `JobRepository` trait the Postgres-backed implementation honors.

use chrono::{Duration, Utc};
use scheduler_core::{Job, JobStatus, ScheduleSpec};
use scheduler_database::{InMemoryJobRepository, JobRepository, Migrator};
use uuid::Uuid;

fn one_shot(at: chrono::DateTime<Utc>) -> Job {
    Job::new(
        Uuid::new_v4(),
        "notification",
        serde_json::json!({"channel": "email"}),
        ScheduleSpec::one_shot(at),
        at,
        Utc::now(),
    )
}

#[test]
fn jobs_migration_creates_expected_table_and_index() {
    let migrator = Migrator::new();
    let migrations = migrator.migration_sql();

    let create = &migrations[0];
    assert!(create.contains("CREATE TABLE jobs"));
    assert!(create.contains("id UUID PRIMARY KEY"));
    assert!(create.contains("next_run_at TIMESTAMPTZ NOT NULL"));
    assert!(create.contains("status VARCHAR(20) NOT NULL DEFAULT 'pending'"));
    assert!(create.contains("CREATE INDEX idx_jobs_due ON jobs (status, next_run_at)"));
}

#[tokio::test]
async fn insert_then_claim_then_commit_marks_job_done() {
    let repo = InMemoryJobRepository::new();
    let job = one_shot(Utc::now() - Duration::seconds(5));

    assert!(repo.insert(&job).await.unwrap());

    let mut batch = repo.claim_due(Utc::now(), 10).await.unwrap();
    assert_eq!(batch.jobs().len(), 1);
    batch.mark_done(job.id).await.unwrap();
    batch.commit().await.unwrap();

    let stored = repo.get(job.id).await.unwrap();
    assert_eq!(stored.status, JobStatus::Done);
}

#[tokio::test]
async fn cancel_excludes_job_from_future_claims() {
    let repo = InMemoryJobRepository::new();
    let job = one_shot(Utc::now() + Duration::seconds(5));
    repo.insert(&job).await.unwrap();

    let affected = repo.cancel(job.id).await.unwrap();
    assert_eq!(affected, 1);

    let mut batch = repo.claim_due(Utc::now() + Duration::seconds(10), 10).await.unwrap();
    assert!(batch.jobs().is_empty());
    batch.commit().await.unwrap();
}

#[tokio::test]
async fn duplicate_insert_is_rejected_by_primary_key() {
    let repo = InMemoryJobRepository::new();
    let job = one_shot(Utc::now() + Duration::seconds(30));

    assert!(repo.insert(&job).await.unwrap());
    assert!(!repo.insert(&job).await.unwrap());
    assert_eq!(repo.len().await, 1);
}
