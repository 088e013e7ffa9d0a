//! Non-durable `JobRepository` for unit tests that don't need Postgres.
//! Grounded on `examples/original_source/src/task_scheduler/repository/in_memory.py`.

use crate::error::Result;
use crate::job_repository::{ClaimedBatch, JobRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scheduler_core::{Job, JobStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct State {
    jobs: HashMap<Uuid, Job>,
    /// Rows currently claimed by an in-flight batch, simulating the row
    /// locks + skip-locked behavior of the real store.
    locked: std::collections::HashSet<Uuid>,
}

/// Thread-safe, in-memory stand-in for `PgJobRepository`. Claims held by one
/// batch are invisible to concurrent `claim_due` calls until committed or
/// rolled back, the same contract Postgres gives us via row locks.
#[derive(Clone, Default)]
pub struct InMemoryJobRepository {
    state: Arc<Mutex<State>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: Uuid) -> Option<Job> {
        self.state.lock().await.jobs.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.jobs.len()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn insert(&self, job: &Job) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.jobs.contains_key(&job.id) {
            return Ok(false);
        }
        state.jobs.insert(job.id, job.clone());
        Ok(true)
    }

    async fn cancel(&self, id: Uuid) -> Result<u64> {
        let mut state = self.state.lock().await;
        match state.jobs.get_mut(&id) {
            Some(job) if job.status == JobStatus::Pending => {
                job.status = JobStatus::Cancelled;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn claim_due(&self, now: DateTime<Utc>, limit: i64) -> Result<Box<dyn ClaimedBatch>> {
        let mut state = self.state.lock().await;
        let mut candidates: Vec<Job> = state
            .jobs
            .values()
            .filter(|j| {
                j.status == JobStatus::Pending
                    && j.next_run_at <= now
                    && !state.locked.contains(&j.id)
            })
            .cloned()
            .collect();
        candidates.sort_by_key(|j| j.next_run_at);
        candidates.truncate(limit.max(0) as usize);

        for job in &candidates {
            state.locked.insert(job.id);
        }

        Ok(Box::new(InMemoryClaimedBatch {
            state: self.state.clone(),
            jobs: candidates,
            mutations: Vec::new(),
        }))
    }
}

enum Mutation {
    Reschedule {
        id: Uuid,
        next_run_at: DateTime<Utc>,
        retries: i32,
    },
    MarkDone {
        id: Uuid,
    },
}

struct InMemoryClaimedBatch {
    state: Arc<Mutex<State>>,
    jobs: Vec<Job>,
    mutations: Vec<Mutation>,
}

#[async_trait]
impl ClaimedBatch for InMemoryClaimedBatch {
    fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    async fn reschedule(&mut self, id: Uuid, next_run_at: DateTime<Utc>, retries: i32) -> Result<()> {
        self.mutations.push(Mutation::Reschedule {
            id,
            next_run_at,
            retries,
        });
        Ok(())
    }

    async fn mark_done(&mut self, id: Uuid) -> Result<()> {
        self.mutations.push(Mutation::MarkDone { id });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut state = self.state.lock().await;
        for mutation in self.mutations {
            match mutation {
                Mutation::Reschedule {
                    id,
                    next_run_at,
                    retries,
                } => {
                    if let Some(job) = state.jobs.get_mut(&id) {
                        job.next_run_at = next_run_at;
                        job.retries = retries;
                    }
                }
                Mutation::MarkDone { id } => {
                    if let Some(job) = state.jobs.get_mut(&id) {
                        job.status = JobStatus::Done;
                    }
                }
            }
        }
        for job in &self.jobs {
            state.locked.remove(&job.id);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let mut state = self.state.lock().await;
        for job in &self.jobs {
            state.locked.remove(&job.id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler_core::ScheduleSpec;

    fn one_shot_job(at: DateTime<Utc>) -> Job {
        Job::new(
            Uuid::new_v4(),
            "notification",
            serde_json::json!({}),
            ScheduleSpec::one_shot(at),
            at,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn duplicate_insert_returns_false() {
        let repo = InMemoryJobRepository::new();
        let job = one_shot_job(Utc::now());
        assert!(repo.insert(&job).await.unwrap());
        assert!(!repo.insert(&job).await.unwrap());
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn cancel_then_insert_does_not_reset_status() {
        let repo = InMemoryJobRepository::new();
        let job = one_shot_job(Utc::now() + chrono::Duration::seconds(10));
        repo.insert(&job).await.unwrap();
        assert_eq!(repo.cancel(job.id).await.unwrap(), 1);
        // duplicate insert with same id: returns false, row stays cancelled
        assert!(!repo.insert(&job).await.unwrap());
        let fetched = repo.get(job.id).await.unwrap();
        assert_eq!(fetched.status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancel_on_done_is_noop() {
        let repo = InMemoryJobRepository::new();
        let job = one_shot_job(Utc::now() - chrono::Duration::seconds(1));
        repo.insert(&job).await.unwrap();
        let batch = repo.claim_due(Utc::now(), 10).await.unwrap();
        batch.commit().await.unwrap();
        // simulate dispatch having already marked it done
        {
            let mut state = repo.state.lock().await;
            state.jobs.get_mut(&job.id).unwrap().status = JobStatus::Done;
        }
        assert_eq!(repo.cancel(job.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_claims_see_disjoint_batches() {
        let repo = InMemoryJobRepository::new();
        for _ in 0..10 {
            let job = one_shot_job(Utc::now() - chrono::Duration::seconds(1));
            repo.insert(&job).await.unwrap();
        }

        let now = Utc::now();
        let batch_a = repo.claim_due(now, 5).await.unwrap();
        let batch_b = repo.claim_due(now, 5).await.unwrap();

        let ids_a: std::collections::HashSet<_> = batch_a.jobs().iter().map(|j| j.id).collect();
        let ids_b: std::collections::HashSet<_> = batch_b.jobs().iter().map(|j| j.id).collect();
        assert!(ids_a.is_disjoint(&ids_b));
        assert_eq!(ids_a.len() + ids_b.len(), 10);
    }

    #[tokio::test]
    async fn rollback_releases_locks_for_next_claim() {
        let repo = InMemoryJobRepository::new();
        let job = one_shot_job(Utc::now() - chrono::Duration::seconds(1));
        repo.insert(&job).await.unwrap();

        let batch = repo.claim_due(Utc::now(), 10).await.unwrap();
        assert_eq!(batch.jobs().len(), 1);
        batch.rollback().await.unwrap();

        let batch2 = repo.claim_due(Utc::now(), 10).await.unwrap();
        assert_eq!(batch2.jobs().len(), 1);
    }
}
