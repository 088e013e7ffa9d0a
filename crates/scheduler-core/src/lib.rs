//! # scheduler-core
//!
//! Domain types shared by every scheduler service: the injected clock, the
//! schedule specification value object, the RRULE builder, the job entity,
//! and the domain error type. No I/O lives here.

pub mod clock;
pub mod error;
pub mod job;
pub mod rrule_builder;
pub mod schedule;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Error, Result};
pub use job::{Job, JobStatus};
pub use rrule_builder::{RRuleBuilder, RRuleBuilderError};
pub use schedule::ScheduleSpec;
