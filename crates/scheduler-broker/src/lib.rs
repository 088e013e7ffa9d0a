//! AMQP topology, publishing, and consumption for the scheduler.

pub mod connection;
pub mod consumer;
pub mod error;
pub mod messages;
pub mod publisher;
pub mod topology;

pub use connection::connect;
pub use error::{Error, Result};
pub use messages::{ScheduleCancel, ScheduleDue, ScheduleField, ScheduleRequest};
pub use publisher::JsonPublisher;
pub use topology::{declare_topology, Topology, ROUTING_KEY_CANCEL, ROUTING_KEY_DUE, ROUTING_KEY_REQUEST};
