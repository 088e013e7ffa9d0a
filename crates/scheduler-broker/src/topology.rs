//! Exchange/queue names and idempotent topology declaration. Grounded on
//! `examples/original_source/src/amqp.py`'s `AMQPConfig`/`declare_topology`.

use crate::error::{Error, Result};
use lapin::options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{Channel, ExchangeKind};

/// Broker object names. Defaults match spec.md §6; callers may override for
/// test isolation.
#[derive(Debug, Clone)]
pub struct Topology {
    pub command_exchange: String,
    pub event_exchange: String,
    pub inbox_queue: String,
    pub due_queue: String,
    pub dead_letter_exchange: String,
    pub dead_letter_queue: String,
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            command_exchange: "schedule.commands".to_string(),
            event_exchange: "schedule.events".to_string(),
            inbox_queue: "schedule_inbox".to_string(),
            due_queue: "schedule_due".to_string(),
            dead_letter_exchange: "schedule.dlq".to_string(),
            dead_letter_queue: "schedule_dead".to_string(),
        }
    }
}

pub const ROUTING_KEY_REQUEST: &str = "request";
pub const ROUTING_KEY_CANCEL: &str = "cancel";
pub const ROUTING_KEY_DUE: &str = "due";

/// Declare every exchange, queue, and binding. Idempotent: safe to call on
/// every service startup, matching `declare_topology`'s role in the original.
pub async fn declare_topology(channel: &Channel, topology: &Topology) -> Result<()> {
    let durable_exchange = ExchangeDeclareOptions {
        durable: true,
        ..Default::default()
    };
    let durable_queue = QueueDeclareOptions {
        durable: true,
        ..Default::default()
    };

    channel
        .exchange_declare(
            &topology.command_exchange,
            ExchangeKind::Topic,
            durable_exchange,
            FieldTable::default(),
        )
        .await
        .map_err(|e| Error::topology("failed to declare command exchange", e))?;

    channel
        .exchange_declare(
            &topology.event_exchange,
            ExchangeKind::Topic,
            durable_exchange,
            FieldTable::default(),
        )
        .await
        .map_err(|e| Error::topology("failed to declare event exchange", e))?;

    channel
        .exchange_declare(
            &topology.dead_letter_exchange,
            ExchangeKind::Fanout,
            durable_exchange,
            FieldTable::default(),
        )
        .await
        .map_err(|e| Error::topology("failed to declare dead-letter exchange", e))?;

    channel
        .queue_declare(
            &topology.dead_letter_queue,
            durable_queue,
            FieldTable::default(),
        )
        .await
        .map_err(|e| Error::topology("failed to declare dead-letter queue", e))?;

    channel
        .queue_bind(
            &topology.dead_letter_queue,
            &topology.dead_letter_exchange,
            "#",
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(|e| Error::topology("failed to bind dead-letter queue", e))?;

    let mut inbox_args = FieldTable::default();
    inbox_args.insert(
        "x-dead-letter-exchange".into(),
        AMQPValue::LongString(topology.dead_letter_exchange.clone().into()),
    );
    channel
        .queue_declare(&topology.inbox_queue, durable_queue, inbox_args)
        .await
        .map_err(|e| Error::topology("failed to declare inbox queue", e))?;

    channel
        .queue_bind(
            &topology.inbox_queue,
            &topology.command_exchange,
            ROUTING_KEY_REQUEST,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(|e| Error::topology("failed to bind inbox queue to request", e))?;

    channel
        .queue_bind(
            &topology.inbox_queue,
            &topology.command_exchange,
            ROUTING_KEY_CANCEL,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(|e| Error::topology("failed to bind inbox queue to cancel", e))?;

    channel
        .queue_declare(&topology.due_queue, durable_queue, FieldTable::default())
        .await
        .map_err(|e| Error::topology("failed to declare due queue", e))?;

    channel
        .queue_bind(
            &topology.due_queue,
            &topology.event_exchange,
            ROUTING_KEY_DUE,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(|e| Error::topology("failed to bind due queue", e))?;

    tracing::info!("broker topology declared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_names_match_spec_defaults() {
        let topology = Topology::default();
        assert_eq!(topology.command_exchange, "schedule.commands");
        assert_eq!(topology.event_exchange, "schedule.events");
        assert_eq!(topology.inbox_queue, "schedule_inbox");
        assert_eq!(topology.due_queue, "schedule_due");
        assert_eq!(topology.dead_letter_exchange, "schedule.dlq");
        assert_eq!(topology.dead_letter_queue, "schedule_dead");
    }
}
