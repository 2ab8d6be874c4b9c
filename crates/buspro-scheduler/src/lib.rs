//! Polling scheduler for bus consumers.
//!
//! The scheduler knows nothing about the bus protocol. It asks a
//! [`Refresher`] to refresh consumers by id, on a fixed interval per
//! consumer or on a shared default cadence, and lets push updates postpone
//! the next poll.

pub mod error;
mod queue;
pub mod registry;
pub mod runner;
pub mod scheduler;

pub use error::RefreshError;
pub use registry::{ConsumerRegistry, RefreshConsumer};
pub use runner::{spawn, SchedulerHandle};
pub use scheduler::{QueueKind, Refresher, ScheduledItemInfo, Scheduler, TickReport};
