//! Due-dispatch tick loop. Grounded on spec.md §4.4's pseudocode, with the
//! tick-and-sleep shape of `rustpress_jobs::scheduler::Scheduler::run`.

use crate::error::Result;
use chrono::Duration as ChronoDuration;
use scheduler_broker::{JsonPublisher, ScheduleDue, ROUTING_KEY_DUE};
use scheduler_core::Clock;
use scheduler_database::JobRepository;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Max rows claimed per tick (spec.md §6 `LOCK_BATCH`, default 500).
    pub lock_batch: i64,
    /// Idle sleep after an empty claim (spec.md §6 `TICK_MS`, default 500ms).
    pub tick_interval: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            lock_batch: 500,
            tick_interval: Duration::from_millis(500),
        }
    }
}

/// Run the tick loop until `shutdown` fires. Each iteration claims, publishes,
/// advances, and commits one batch; an empty batch sleeps for
/// `tick_interval` before looping again.
///
/// Shutdown is bounded by `shutdown_timeout`: a tick already in flight when
/// `shutdown` fires is given up to that long to commit before the loop gives
/// up on it. `tick`'s claimed batch holds an open transaction, so letting it
/// run past the deadline drops that transaction, rolling it back (spec §7).
pub async fn run(
    repo: Arc<dyn JobRepository>,
    publisher: Arc<JsonPublisher>,
    clock: Arc<dyn Clock>,
    config: DispatchConfig,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
    shutdown_timeout: Duration,
) -> Result<()> {
    loop {
        let tick_fut = tick(repo.as_ref(), publisher.as_ref(), clock.as_ref(), config.lock_batch);
        tokio::pin!(tick_fut);

        tokio::select! {
            result = &mut tick_fut => {
                if !result? {
                    tokio::select! {
                        _ = shutdown.recv() => {
                            tracing::info!("dispatch shutting down");
                            return Ok(());
                        }
                        _ = tokio::time::sleep(config.tick_interval) => {}
                    }
                }
            }
            _ = shutdown.recv() => {
                tracing::info!(?shutdown_timeout, "dispatch shutting down, draining in-flight tick");
                match tokio::time::timeout(shutdown_timeout, tick_fut).await {
                    Ok(Ok(_)) => tracing::info!("in-flight tick drained cleanly"),
                    Ok(Err(e)) => tracing::warn!(error = %e, "in-flight tick failed while draining"),
                    Err(_) => tracing::warn!("drain deadline exceeded, in-flight transaction rolled back"),
                }
                return Ok(());
            }
        }
    }
}

/// Claim, publish, and advance/finish one batch. Returns `true` if the batch
/// was non-empty (caller should not sleep before the next tick).
async fn tick(
    repo: &dyn JobRepository,
    publisher: &JsonPublisher,
    clock: &dyn Clock,
    lock_batch: i64,
) -> Result<bool> {
    let now = clock.now();
    let mut batch = repo.claim_due(now, lock_batch).await?;

    if batch.jobs().is_empty() {
        batch.commit().await?;
        return Ok(false);
    }

    let jobs = batch.jobs().to_vec();
    for job in &jobs {
        let event = ScheduleDue {
            id: job.id,
            job_type: job.job_type.clone(),
            payload: job.payload.clone(),
            fired_at: now,
            attempt: job.next_attempt(),
        };

        if let Err(e) = publisher.publish(ROUTING_KEY_DUE, &event).await {
            tracing::warn!(kind = "publish", id = %job.id, attempt = job.next_attempt(), error = %e, "publish not confirmed, rolling back batch");
            batch.rollback().await?;
            return Ok(true);
        }

        if job.is_recurring() {
            let next = job
                .spec
                .next_after(job.next_run_at + ChronoDuration::microseconds(1))?;
            match next {
                Some(next_run_at) => {
                    batch
                        .reschedule(job.id, next_run_at, job.next_attempt())
                        .await?;
                }
                None => batch.mark_done(job.id).await?,
            }
        } else {
            batch.mark_done(job.id).await?;
        }
    }

    batch.commit().await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler_core::{FixedClock, Job, JobStatus, ScheduleSpec};
    use scheduler_database::InMemoryJobRepository;
    use uuid::Uuid;

    fn one_shot(at: chrono::DateTime<chrono::Utc>) -> Job {
        Job::new(
            Uuid::new_v4(),
            "notification",
            serde_json::json!({}),
            ScheduleSpec::one_shot(at),
            at,
            chrono::Utc::now(),
        )
    }

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.lock_batch, 500);
        assert_eq!(config.tick_interval, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn empty_claim_reports_no_work_without_mutating_anything() {
        let repo = InMemoryJobRepository::new();
        let clock = FixedClock::new(chrono::Utc::now());
        let mut batch = repo.claim_due(clock.now(), 10).await.unwrap();
        assert!(batch.jobs().is_empty());
        batch.commit().await.unwrap();
    }

    #[tokio::test]
    async fn one_shot_job_claim_marks_done_after_commit() {
        let repo = InMemoryJobRepository::new();
        let clock = FixedClock::new(chrono::Utc::now());
        let job = one_shot(clock.now() - chrono::Duration::seconds(1));
        repo.insert(&job).await.unwrap();

        let mut batch = repo.claim_due(clock.now(), 10).await.unwrap();
        assert_eq!(batch.jobs().len(), 1);
        batch.mark_done(job.id).await.unwrap();
        batch.commit().await.unwrap();

        let fetched = repo.get(job.id).await.unwrap();
        assert_eq!(fetched.status, JobStatus::Done);
    }
}
