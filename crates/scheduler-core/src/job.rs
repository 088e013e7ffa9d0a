//! The persisted job entity. See spec §3 for the invariants this type
//! encodes; `scheduler-database` is the only crate allowed to mutate rows,
//! this crate just defines the shape.

use crate::schedule::ScheduleSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Done,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Done => "done",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "done" => Ok(JobStatus::Done),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// A scheduled job row.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: Uuid,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub spec: ScheduleSpec,
    pub next_run_at: DateTime<Utc>,
    pub retries: i32,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Construct a brand-new pending job. `next_run_at` is the caller's
    /// already-computed `spec.next_after(now)` result — the repository
    /// doesn't recompute it on insert.
    pub fn new(
        id: Uuid,
        job_type: impl Into<String>,
        payload: serde_json::Value,
        spec: ScheduleSpec,
        next_run_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            job_type: job_type.into(),
            payload,
            spec,
            next_run_at,
            retries: 0,
            status: JobStatus::Pending,
            created_at,
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.spec.is_recurring()
    }

    /// The `attempt` number that would be stamped on the fire event if this
    /// row were dispatched right now.
    pub fn next_attempt(&self) -> i32 {
        self.retries + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_round_trips_through_str() {
        for status in [JobStatus::Pending, JobStatus::Done, JobStatus::Cancelled] {
            let parsed: JobStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn one_shot_job_attempt_is_always_one() {
        let job = Job::new(
            Uuid::new_v4(),
            "notification",
            serde_json::json!({}),
            ScheduleSpec::one_shot(Utc::now()),
            Utc::now(),
            Utc::now(),
        );
        assert_eq!(job.next_attempt(), 1);
        assert!(!job.is_recurring());
    }
}
