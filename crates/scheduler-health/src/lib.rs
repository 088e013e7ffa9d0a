//! Liveness/readiness checks. Grounded on `rustpress_health::checker`'s
//! `HealthChecker`/`ComponentStatus`/`HealthReport` shape, narrowed to the
//! two dependencies this system has: the store and the broker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub message: Option<String>,
}

impl ComponentHealth {
    fn up() -> Self {
        Self {
            status: ComponentStatus::Up,
            message: None,
        }
    }

    fn down(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Down,
            message: Some(message.into()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthReport {
    pub timestamp: DateTime<Utc>,
    pub database: ComponentHealth,
    pub broker: ComponentHealth,
}

impl HealthReport {
    /// Whether every component reported healthy — the CLI's `health`
    /// subcommand exits non-zero when this is false.
    pub fn is_healthy(&self) -> bool {
        self.database.status == ComponentStatus::Up && self.broker.status == ComponentStatus::Up
    }
}

/// Ping the database pool and the broker URL, returning a combined report.
/// Never fails: a connectivity failure is reported as a `Down` component,
/// not an `Err`.
pub async fn check(pool: &sqlx::PgPool, broker_url: &str) -> HealthReport {
    let database = match scheduler_database::pg::ping(pool).await {
        Ok(()) => ComponentHealth::up(),
        Err(e) => {
            tracing::warn!(kind = "health", component = "database", error = %e, "check failed");
            ComponentHealth::down(e.to_string())
        }
    };

    let broker = match scheduler_broker::connection::ping(broker_url).await {
        Ok(()) => ComponentHealth::up(),
        Err(e) => {
            tracing::warn!(kind = "health", component = "broker", error = %e, "check failed");
            ComponentHealth::down(e.to_string())
        }
    };

    HealthReport {
        timestamp: Utc::now(),
        database,
        broker,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_up_is_healthy() {
        let report = HealthReport {
            timestamp: Utc::now(),
            database: ComponentHealth::up(),
            broker: ComponentHealth::up(),
        };
        assert!(report.is_healthy());
    }

    #[test]
    fn any_down_is_unhealthy() {
        let report = HealthReport {
            timestamp: Utc::now(),
            database: ComponentHealth::up(),
            broker: ComponentHealth::down("connection refused"),
        };
        assert!(!report.is_healthy());
    }
}
