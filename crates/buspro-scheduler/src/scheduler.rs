//! Adaptive polling scheduler.
//!
//! Consumers with a positive interval live in the interval queue and are
//! refreshed every `interval`. Consumers registered with a zero interval are
//! opportunistic: they share the scheduler's default interval and live in a
//! second queue. Each [`Scheduler::tick`] services at most one due item from
//! each queue.
//!
//! Push updates reach the scheduler through [`Scheduler::notify`]. With
//! `reschedule = true` the item's next poll is pushed out by a full interval;
//! with `reschedule = false` the planned poll is left alone.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use buspro_core::config::SchedulerConfig;

use crate::error::RefreshError;
use crate::queue::{DueQueue, QueueEntry};

/// Performs the refresh for a consumer id.
#[async_trait]
pub trait Refresher: Send + Sync {
    async fn refresh(&self, consumer_id: &str) -> Result<(), RefreshError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueKind {
    Interval,
    Opportunistic,
}

#[derive(Debug, Clone)]
struct ItemState {
    interval: Duration,
    kind: QueueKind,
    next_due: Instant,
    seq: u64,
}

/// Diagnostic view of one scheduled item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledItemInfo {
    pub consumer_id: String,
    pub queue: QueueKind,
    /// Effective polling period.
    pub interval: Duration,
    /// Time until the next poll; zero when overdue.
    pub due_in: Duration,
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub serviced: Vec<String>,
    /// Consumers dropped because they no longer exist.
    pub removed: Vec<String>,
    pub failed: Vec<String>,
}

pub struct Scheduler {
    refresher: Arc<dyn Refresher>,
    default_interval: Duration,
    items: HashMap<String, ItemState>,
    interval_queue: DueQueue,
    opportunistic_queue: DueQueue,
    next_seq: u64,
}

impl Scheduler {
    pub fn new(refresher: Arc<dyn Refresher>, default_interval: Duration) -> Self {
        Self {
            refresher,
            default_interval,
            items: HashMap::new(),
            interval_queue: DueQueue::default(),
            opportunistic_queue: DueQueue::default(),
            next_seq: 0,
        }
    }

    pub fn from_config(refresher: Arc<dyn Refresher>, config: &SchedulerConfig) -> Self {
        Self::new(refresher, config.default_interval())
    }

    pub fn default_interval(&self) -> Duration {
        self.default_interval
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, consumer_id: &str) -> bool {
        self.items.contains_key(consumer_id)
    }

    /// Schedule `consumer_id`. A zero `interval` makes it opportunistic.
    ///
    /// The first poll is one (effective) interval from now. Registering an
    /// id again replaces its schedule.
    pub fn register(&mut self, consumer_id: impl Into<String>, interval: Duration) {
        let consumer_id = consumer_id.into();
        let (kind, effective) = if interval.is_zero() {
            (QueueKind::Opportunistic, self.default_interval)
        } else {
            (QueueKind::Interval, interval)
        };

        let next_due = Instant::now() + effective;
        let seq = self.bump_seq();
        self.items.insert(
            consumer_id.clone(),
            ItemState {
                interval: effective,
                kind,
                next_due,
                seq,
            },
        );
        self.queue_mut(kind).push(consumer_id.clone(), next_due, seq);

        debug!(
            category = "scheduler",
            consumer = %consumer_id,
            queue = ?kind,
            interval_ms = effective.as_millis() as u64,
            "Consumer scheduled"
        );
    }

    /// Stop polling `consumer_id`. Returns `false` if it was not scheduled.
    pub fn unregister(&mut self, consumer_id: &str) -> bool {
        let removed = self.items.remove(consumer_id).is_some();
        if removed {
            debug!(category = "scheduler", consumer = %consumer_id, "Consumer unscheduled");
            self.maybe_compact();
        }
        removed
    }

    /// Record a push update for `consumer_id`.
    ///
    /// With `reschedule` the next poll moves to now + interval. Returns
    /// `false` for unknown ids.
    pub fn notify(&mut self, consumer_id: &str, reschedule: bool) -> bool {
        if !self.items.contains_key(consumer_id) {
            trace!(category = "scheduler", consumer = %consumer_id, "Notify for unknown consumer");
            return false;
        }
        if !reschedule {
            trace!(category = "scheduler", consumer = %consumer_id, "Notify without reschedule");
            return true;
        }

        let seq = self.bump_seq();
        let now = Instant::now();
        let Some(item) = self.items.get_mut(consumer_id) else {
            return false;
        };
        item.next_due = now + item.interval;
        item.seq = seq;
        let (kind, next_due) = (item.kind, item.next_due);

        self.queue_mut(kind).push(consumer_id.to_string(), next_due, seq);
        trace!(category = "scheduler", consumer = %consumer_id, "Poll postponed by push update");
        self.maybe_compact();
        true
    }

    /// Service at most one due item from each queue.
    pub async fn tick(&mut self) -> TickReport {
        let now = Instant::now();
        let mut report = TickReport::default();

        for kind in [QueueKind::Interval, QueueKind::Opportunistic] {
            let items = &self.items;
            let due = match kind {
                QueueKind::Interval => &mut self.interval_queue,
                QueueKind::Opportunistic => &mut self.opportunistic_queue,
            }
            .pop_due(now, |entry| is_live(items, entry));

            if let Some(entry) = due {
                self.service(entry.consumer_id, &mut report).await;
            }
        }
        report
    }

    /// Items ordered by next poll.
    pub fn snapshot(&self) -> Vec<ScheduledItemInfo> {
        let now = Instant::now();
        let mut items: Vec<(&String, &ItemState)> = self.items.iter().collect();
        items.sort_by(|a, b| a.1.next_due.cmp(&b.1.next_due).then(a.1.seq.cmp(&b.1.seq)));
        items
            .into_iter()
            .map(|(id, item)| ScheduledItemInfo {
                consumer_id: id.clone(),
                queue: item.kind,
                interval: item.interval,
                due_in: item.next_due.saturating_duration_since(now),
            })
            .collect()
    }

    /// The next poll is due one interval after this refresh started.
    async fn service(&mut self, consumer_id: String, report: &mut TickReport) {
        trace!(category = "scheduler", consumer = %consumer_id, "Refreshing");

        let started = Instant::now();
        match self.refresher.refresh(&consumer_id).await {
            Ok(()) => {
                self.requeue(&consumer_id, started);
                report.serviced.push(consumer_id);
            }
            Err(e) if e.is_not_found() => {
                warn!(
                    category = "scheduler",
                    consumer = %consumer_id,
                    "Consumer not found, removing from schedule"
                );
                self.items.remove(&consumer_id);
                report.removed.push(consumer_id);
            }
            Err(e) => {
                error!(
                    category = "scheduler",
                    consumer = %consumer_id,
                    error = %e,
                    "Refresh failed"
                );
                self.requeue(&consumer_id, started);
                report.failed.push(consumer_id);
            }
        }
    }

    fn requeue(&mut self, consumer_id: &str, started: Instant) {
        let seq = self.bump_seq();
        let Some(item) = self.items.get_mut(consumer_id) else {
            return;
        };
        item.next_due = started + item.interval;
        item.seq = seq;
        let (kind, next_due) = (item.kind, item.next_due);
        self.queue_mut(kind).push(consumer_id.to_string(), next_due, seq);
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        seq
    }

    fn queue_mut(&mut self, kind: QueueKind) -> &mut DueQueue {
        match kind {
            QueueKind::Interval => &mut self.interval_queue,
            QueueKind::Opportunistic => &mut self.opportunistic_queue,
        }
    }

    fn maybe_compact(&mut self) {
        let limit = 2 * self.items.len() + 32;
        if self.interval_queue.len() + self.opportunistic_queue.len() <= limit {
            return;
        }
        let items = &self.items;
        self.interval_queue.compact(|entry| is_live(items, entry));
        self.opportunistic_queue.compact(|entry| is_live(items, entry));
        info!(
            category = "scheduler",
            items = self.items.len(),
            slots = self.interval_queue.len() + self.opportunistic_queue.len(),
            "Compacted scheduler queues"
        );
    }
}

fn is_live(items: &HashMap<String, ItemState>, entry: &QueueEntry) -> bool {
    items
        .get(&entry.consumer_id)
        .is_some_and(|item| item.seq == entry.seq)
}
