//! Wire shapes for commands and events. Grounded on spec.md §6 and
//! `examples/original_source/src/scripts/send_job.py`'s `build_event`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `schedule: {"at": ...}` or `schedule: {"rrule": ...}` in a `ScheduleRequest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScheduleField {
    At { at: DateTime<Utc> },
    Rrule { rrule: String },
}

/// Routing key `request` on the command exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub id: Uuid,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub schedule: ScheduleField,
}

/// Routing key `cancel` on the command exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleCancel {
    pub id: Uuid,
}

/// Routing key `due` on the event exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDue {
    pub id: Uuid,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub fired_at: DateTime<Utc>,
    pub attempt: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_request_with_at_round_trips() {
        let req = ScheduleRequest {
            id: Uuid::new_v4(),
            job_type: "notification".to_string(),
            payload: serde_json::json!({"to": "me"}),
            schedule: ScheduleField::At { at: Utc::now() },
        };
        let encoded = serde_json::to_string(&req).unwrap();
        let decoded: ScheduleRequest = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.id, req.id);
        assert!(matches!(decoded.schedule, ScheduleField::At { .. }));
    }

    #[test]
    fn schedule_request_with_rrule_round_trips() {
        let req = ScheduleRequest {
            id: Uuid::new_v4(),
            job_type: "digest".to_string(),
            payload: serde_json::json!({}),
            schedule: ScheduleField::Rrule {
                rrule: "FREQ=DAILY".to_string(),
            },
        };
        let encoded = serde_json::to_string(&req).unwrap();
        let decoded: ScheduleRequest = serde_json::from_str(&encoded).unwrap();
        assert!(matches!(decoded.schedule, ScheduleField::Rrule { rrule } if rrule == "FREQ=DAILY"));
    }

    #[test]
    fn cancel_decodes_bare_id() {
        let body = serde_json::json!({"id": Uuid::new_v4()});
        let decoded: ScheduleCancel = serde_json::from_value(body).unwrap();
        assert!(!decoded.id.is_nil());
    }
}
