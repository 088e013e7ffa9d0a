//! Command ingest service. Grounded on spec.md §4.3's decode → dispatch →
//! ack/reject state machine, and on
//! `examples/original_source/src/adapters/message_broker.py`'s
//! qos/ack/nack-on-error shape.

use crate::error::{IngestError, Result};
use chrono::Duration as ChronoDuration;
use futures::StreamExt;
use scheduler_broker::{
    consumer, ScheduleCancel, ScheduleField, ScheduleRequest, ROUTING_KEY_CANCEL,
    ROUTING_KEY_REQUEST,
};
use scheduler_core::{Clock, Job, ScheduleSpec};
use scheduler_database::JobRepository;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Decode and apply one command body for the given routing key. Returns
/// `Ok(())` on success (including a duplicate insert, which is logged but
/// not an error) or an `IngestError` the caller classifies via
/// `is_permanent` to decide ack/reject/nack.
pub async fn handle_command(
    repo: &dyn JobRepository,
    clock: &dyn Clock,
    routing_key: &str,
    body: &[u8],
) -> Result<()> {
    match routing_key {
        ROUTING_KEY_REQUEST => handle_request(repo, clock, body).await,
        ROUTING_KEY_CANCEL => handle_cancel(repo, body).await,
        other => {
            tracing::warn!(routing_key = other, "ignoring unrecognized routing key");
            Ok(())
        }
    }
}

async fn handle_request(repo: &dyn JobRepository, clock: &dyn Clock, body: &[u8]) -> Result<()> {
    let request: ScheduleRequest =
        serde_json::from_slice(body).map_err(|e| IngestError::decode(e.to_string()))?;

    let now = clock.now();

    // DTSTART is fixed here, at creation, and reused verbatim as `created_at`
    // so a Postgres round-trip reconstructs the identical anchor (see
    // `scheduler_database::pg::TryFrom<JobRow>`). For a one-shot schedule the
    // query anchor is `now` itself — `at == now` is still rejected as past.
    // For an RRULE, the sole/first occurrence is DTSTART truncated to whole
    // seconds (RRULE has no sub-second precision), which can be up to just
    // under a second earlier than `now` — the query anchor is pulled back a
    // full second to still select it.
    let (spec, query_anchor) = match request.schedule {
        ScheduleField::At { at } => (ScheduleSpec::one_shot(at), now),
        ScheduleField::Rrule { rrule } => (
            ScheduleSpec::recurring(rrule, "UTC", now)?,
            now - ChronoDuration::seconds(1),
        ),
    };

    let next_run_at = spec
        .next_after(query_anchor)?
        .ok_or(scheduler_core::Error::PastSchedule)?;

    let job = Job::new(request.id, request.job_type, request.payload, spec, next_run_at, now);

    let inserted = repo.insert(&job).await?;
    if !inserted {
        tracing::info!(job_id = %job.id, "duplicate schedule request, ignored");
    }
    Ok(())
}

async fn handle_cancel(repo: &dyn JobRepository, body: &[u8]) -> Result<()> {
    let cancel: ScheduleCancel =
        serde_json::from_slice(body).map_err(|e| IngestError::decode(e.to_string()))?;
    if cancel.id == Uuid::nil() {
        return Err(IngestError::invalid_cancel("id must not be nil"));
    }

    let affected = repo.cancel(cancel.id).await?;
    if affected == 0 {
        tracing::info!(job_id = %cancel.id, "cancel had no effect (already terminal or unknown)");
    }
    Ok(())
}

/// Run the inbox consume loop until the channel closes or `shutdown` fires.
/// One in-flight handler at a time per call; run several of these
/// concurrently (one per `tokio::spawn`) to use the configured prefetch.
///
/// Shutdown is bounded: a delivery already being handled when `shutdown`
/// fires gets up to `shutdown_timeout` to finish (ack/reject/nack) before
/// the loop gives up on it and returns.
pub async fn run(
    channel: &lapin::Channel,
    queue_name: &str,
    prefetch: u16,
    repo: Arc<dyn JobRepository>,
    clock: Arc<dyn Clock>,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
    shutdown_timeout: Duration,
) -> Result<()> {
    let mut consumer = consumer::consume(channel, queue_name, prefetch)
        .await
        .map_err(IngestError::Broker)?;

    loop {
        let next_fut = consumer.next();
        tokio::pin!(next_fut);

        tokio::select! {
            next = &mut next_fut => {
                if !handle_delivery(next, repo.as_ref(), clock.as_ref()).await {
                    break;
                }
            }
            _ = shutdown.recv() => {
                tracing::info!(?shutdown_timeout, "ingest shutting down, draining in-flight delivery");
                match tokio::time::timeout(shutdown_timeout, next_fut).await {
                    Ok(next) => { handle_delivery(next, repo.as_ref(), clock.as_ref()).await; }
                    Err(_) => tracing::warn!("drain deadline exceeded, abandoning in-flight delivery"),
                }
                break;
            }
        }
    }

    Ok(())
}

/// Handle one delivery from the consumer stream. Returns `false` once the
/// stream has closed, telling the caller to stop looping.
async fn handle_delivery(
    next: Option<lapin::Result<lapin::message::Delivery>>,
    repo: &dyn JobRepository,
    clock: &dyn Clock,
) -> bool {
    let Some(delivery) = next else {
        tracing::warn!("inbox consumer stream closed");
        return false;
    };
    let delivery = match delivery {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!(kind = "consume", error = %e, "delivery error");
            return true;
        }
    };

    let routing_key = delivery.routing_key.as_str().to_string();
    let result = handle_command(repo, clock, &routing_key, &delivery.data).await;

    match result {
        Ok(()) => {
            if let Err(e) = consumer::ack(&delivery).await {
                tracing::warn!(kind = "ack", routing_key = %routing_key, error = %e, "failed to ack");
            }
        }
        Err(e) if e.is_permanent() => {
            tracing::warn!(kind = "permanent", routing_key = %routing_key, error = %e, "rejecting without requeue");
            if let Err(e) = consumer::reject_no_requeue(&delivery).await {
                tracing::warn!(kind = "reject", routing_key = %routing_key, error = %e, "failed to reject");
            }
        }
        Err(e) => {
            tracing::warn!(kind = "transient", routing_key = %routing_key, error = %e, "requeuing");
            if let Err(e) = consumer::nack_requeue(&delivery).await {
                tracing::warn!(kind = "nack", routing_key = %routing_key, error = %e, "failed to nack");
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler_core::FixedClock;
    use scheduler_database::InMemoryJobRepository;

    fn request_body(id: Uuid, at: chrono::DateTime<chrono::Utc>) -> Vec<u8> {
        serde_json::to_vec(&ScheduleRequest {
            id,
            job_type: "notification".to_string(),
            payload: serde_json::json!({}),
            schedule: ScheduleField::At { at },
        })
        .unwrap()
    }

    #[tokio::test]
    async fn request_inserts_a_pending_job() {
        let repo = InMemoryJobRepository::new();
        let clock = FixedClock::new(chrono::Utc::now());
        let id = Uuid::new_v4();
        let future = clock.now() + chrono::Duration::seconds(60);

        handle_command(&repo, &clock, ROUTING_KEY_REQUEST, &request_body(id, future))
            .await
            .unwrap();

        let job = repo.get(id).await.unwrap();
        assert_eq!(job.status, scheduler_core::JobStatus::Pending);
    }

    #[tokio::test]
    async fn past_one_shot_request_is_rejected() {
        let repo = InMemoryJobRepository::new();
        let clock = FixedClock::new(chrono::Utc::now());
        let id = Uuid::new_v4();
        let past = clock.now() - chrono::Duration::seconds(60);

        let result = handle_command(&repo, &clock, ROUTING_KEY_REQUEST, &request_body(id, past)).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().is_permanent());
        assert_eq!(repo.len().await, 0);
    }

    #[tokio::test]
    async fn cancel_marks_job_cancelled() {
        let repo = InMemoryJobRepository::new();
        let clock = FixedClock::new(chrono::Utc::now());
        let id = Uuid::new_v4();
        let future = clock.now() + chrono::Duration::seconds(60);
        handle_command(&repo, &clock, ROUTING_KEY_REQUEST, &request_body(id, future))
            .await
            .unwrap();

        let cancel_body = serde_json::to_vec(&ScheduleCancel { id }).unwrap();
        handle_command(&repo, &clock, ROUTING_KEY_CANCEL, &cancel_body)
            .await
            .unwrap();

        let job = repo.get(id).await.unwrap();
        assert_eq!(job.status, scheduler_core::JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn malformed_body_is_permanent_error() {
        let repo = InMemoryJobRepository::new();
        let clock = FixedClock::new(chrono::Utc::now());
        let result = handle_command(&repo, &clock, ROUTING_KEY_REQUEST, b"not json").await;
        assert!(result.unwrap_err().is_permanent());
    }

    #[tokio::test]
    async fn unknown_routing_key_is_ignored() {
        let repo = InMemoryJobRepository::new();
        let clock = FixedClock::new(chrono::Utc::now());
        handle_command(&repo, &clock, "bogus", b"{}").await.unwrap();
    }

    #[tokio::test]
    async fn rrule_count_one_request_is_accepted_and_fires_once() {
        use chrono::SubsecRound;

        let repo = InMemoryJobRepository::new();
        // Whole-second instant: the RRULE anchor is truncated to whole
        // seconds, so asserting `next_run_at == clock.now()` below needs
        // `clock.now()` to already be on a second boundary.
        let clock = FixedClock::new(chrono::Utc::now().trunc_subsecs(0));
        let id = Uuid::new_v4();
        let body = serde_json::to_vec(&ScheduleRequest {
            id,
            job_type: "digest".to_string(),
            payload: serde_json::json!({}),
            schedule: ScheduleField::Rrule {
                rrule: "FREQ=SECONDLY;COUNT=1".to_string(),
            },
        })
        .unwrap();

        handle_command(&repo, &clock, ROUTING_KEY_REQUEST, &body)
            .await
            .unwrap();

        let job = repo.get(id).await.unwrap();
        assert_eq!(job.status, scheduler_core::JobStatus::Pending);
        assert_eq!(job.next_run_at, clock.now());
        assert_eq!(job.spec.next_after(job.next_run_at).unwrap(), None);
    }
}
