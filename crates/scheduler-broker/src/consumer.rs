//! Queue consumption helper. Grounded on
//! `examples/original_source/src/amqp.py`'s `start_consumer`.

use crate::error::{Error, Result};
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions, BasicRejectOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, Consumer};

/// Sets QoS and returns a consumer over `queue_name`. The caller drives the
/// resulting stream and is responsible for ack/nack/reject on every
/// delivery — see `ack`/`reject_no_requeue`/`nack_requeue` below.
pub async fn consume(channel: &Channel, queue_name: &str, prefetch: u16) -> Result<Consumer> {
    channel
        .basic_qos(prefetch, BasicQosOptions::default())
        .await
        .map_err(|e| Error::connection("failed to set prefetch", e))?;

    channel
        .basic_consume(
            queue_name,
            "scheduler",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(|e| Error::connection("failed to start consumer", e))
}

/// Acknowledge successful handling.
pub async fn ack(delivery: &lapin::message::Delivery) -> Result<()> {
    delivery
        .ack(BasicAckOptions::default())
        .await
        .map_err(|e| Error::connection("ack failed", e))
}

/// Decode/validation failures: routes to the dead-letter queue via the
/// inbox queue's `x-dead-letter-exchange` argument.
pub async fn reject_no_requeue(delivery: &lapin::message::Delivery) -> Result<()> {
    delivery
        .reject(BasicRejectOptions { requeue: false })
        .await
        .map_err(|e| Error::connection("reject failed", e))
}

/// Unexpected failures: the broker redelivers.
pub async fn nack_requeue(delivery: &lapin::message::Delivery) -> Result<()> {
    delivery
        .nack(BasicNackOptions {
            requeue: true,
            ..Default::default()
        })
        .await
        .map_err(|e| Error::connection("nack failed", e))
}
