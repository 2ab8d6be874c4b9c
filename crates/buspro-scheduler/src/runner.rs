//! Background task driving a [`Scheduler`].
//!
//! The runner owns the scheduler and serialises ticks with incoming commands.
//! [`SchedulerHandle`] is cheap to clone and its methods are synchronous, so
//! telegram handlers can call [`SchedulerHandle::notify`] directly.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::scheduler::{ScheduledItemInfo, Scheduler};

enum Command {
    Register {
        consumer_id: String,
        interval: Duration,
    },
    Unregister {
        consumer_id: String,
    },
    Notify {
        consumer_id: String,
        reschedule: bool,
    },
    Snapshot(oneshot::Sender<Vec<ScheduledItemInfo>>),
    Shutdown,
}

/// Command side of a running scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SchedulerHandle {
    /// Returns `false` once the runner has stopped.
    pub fn register(&self, consumer_id: impl Into<String>, interval: Duration) -> bool {
        self.send(Command::Register {
            consumer_id: consumer_id.into(),
            interval,
        })
    }

    pub fn unregister(&self, consumer_id: impl Into<String>) -> bool {
        self.send(Command::Unregister {
            consumer_id: consumer_id.into(),
        })
    }

    /// Report a push update. See [`Scheduler::notify`].
    pub fn notify(&self, consumer_id: impl Into<String>, reschedule: bool) -> bool {
        self.send(Command::Notify {
            consumer_id: consumer_id.into(),
            reschedule,
        })
    }

    /// Current schedule, or `None` if the runner is gone.
    pub async fn snapshot(&self) -> Option<Vec<ScheduledItemInfo>> {
        let (tx, rx) = oneshot::channel();
        if !self.send(Command::Snapshot(tx)) {
            return None;
        }
        rx.await.ok()
    }

    /// Ask the runner to exit after the current step.
    pub fn shutdown(&self) -> bool {
        self.send(Command::Shutdown)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, command: Command) -> bool {
        if self.tx.send(command).is_err() {
            warn!(category = "scheduler", "Scheduler runner is not running");
            return false;
        }
        true
    }
}

/// Spawn the runner. The join handle yields the scheduler back on shutdown.
pub fn spawn(scheduler: Scheduler, tick: Duration) -> (SchedulerHandle, JoinHandle<Scheduler>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(scheduler, tick, rx));
    (SchedulerHandle { tx }, task)
}

async fn run(
    mut scheduler: Scheduler,
    tick: Duration,
    mut rx: mpsc::UnboundedReceiver<Command>,
) -> Scheduler {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;

    info!(
        category = "scheduler",
        tick_ms = tick.as_millis() as u64,
        default_interval_secs = scheduler.default_interval().as_secs(),
        "Scheduler started"
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let report = scheduler.tick().await;
                if !report.serviced.is_empty() || !report.removed.is_empty() {
                    debug!(
                        category = "scheduler",
                        serviced = ?report.serviced,
                        removed = ?report.removed,
                        "Tick"
                    );
                }
            }
            command = rx.recv() => match command {
                Some(Command::Register { consumer_id, interval: every }) => {
                    scheduler.register(consumer_id, every);
                }
                Some(Command::Unregister { consumer_id }) => {
                    scheduler.unregister(&consumer_id);
                }
                Some(Command::Notify { consumer_id, reschedule }) => {
                    scheduler.notify(&consumer_id, reschedule);
                }
                Some(Command::Snapshot(reply)) => {
                    let _ = reply.send(scheduler.snapshot());
                }
                Some(Command::Shutdown) | None => break,
            },
        }
    }

    info!(category = "scheduler", items = scheduler.len(), "Scheduler stopped");
    scheduler
}
