//! Ad-hoc command/event publishers for manual testing, bypassing the
//! ingest/dispatch services entirely. Grounded on
//! `examples/original_source/src/send_job.py` and `send_due_job.py`.

use crate::config::Config;
use crate::ProducerCommand;
use chrono::{Duration, Utc};
use scheduler_broker::{
    JsonPublisher, ScheduleCancel, ScheduleDue, ScheduleField, ScheduleRequest, Topology,
    ROUTING_KEY_CANCEL, ROUTING_KEY_DUE, ROUTING_KEY_REQUEST,
};
use uuid::Uuid;

pub async fn run(command: ProducerCommand) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let connection = scheduler_broker::connect(&config.rabbit_url).await?;
    let channel = connection.create_channel().await?;
    let topology = Topology::default();
    scheduler_broker::declare_topology(&channel, &topology).await?;

    match command {
        ProducerCommand::Request {
            job_type,
            payload,
            at,
            rrule,
            delay,
        } => {
            let schedule = resolve_schedule(at, rrule, delay)?;
            let publisher =
                JsonPublisher::new(channel, topology.command_exchange.clone()).await?;
            let request = ScheduleRequest {
                id: Uuid::new_v4(),
                job_type,
                payload: serde_json::from_str(&payload)?,
                schedule,
            };
            publisher.publish(ROUTING_KEY_REQUEST, &request).await?;
            println!("published request {}", request.id);
        }
        ProducerCommand::Cancel { id } => {
            let publisher =
                JsonPublisher::new(channel, topology.command_exchange.clone()).await?;
            let cancel = ScheduleCancel { id };
            publisher.publish(ROUTING_KEY_CANCEL, &cancel).await?;
            println!("published cancel {id}");
        }
        ProducerCommand::Due {
            job_type,
            payload,
            count,
        } => {
            let publisher = JsonPublisher::new(channel, topology.event_exchange.clone()).await?;
            let body: serde_json::Value = serde_json::from_str(&payload)?;
            for _ in 0..count {
                let event = ScheduleDue {
                    id: Uuid::new_v4(),
                    job_type: job_type.clone(),
                    payload: body.clone(),
                    fired_at: Utc::now(),
                    attempt: 1,
                };
                publisher.publish(ROUTING_KEY_DUE, &event).await?;
            }
            println!("published {count} due event(s)");
        }
    }

    Ok(())
}

fn resolve_schedule(
    at: Option<chrono::DateTime<Utc>>,
    rrule: Option<String>,
    delay: Option<i64>,
) -> anyhow::Result<ScheduleField> {
    match (at, rrule, delay) {
        (Some(at), None, None) => Ok(ScheduleField::At { at }),
        (None, Some(rrule), None) => Ok(ScheduleField::Rrule { rrule }),
        (None, None, Some(delay)) => Ok(ScheduleField::At {
            at: Utc::now() + Duration::seconds(delay),
        }),
        _ => Err(anyhow::anyhow!(
            "exactly one of --at, --rrule, or --delay must be given"
        )),
    }
}
