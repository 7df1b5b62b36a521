//! Change feed and refresh throttle
//!
//! Committed transitions publish an [`OrderChange`] on the [`ChangeFeed`]
//! (at-least-once, consumers must be idempotent). Observers do not reload
//! on every change: [`RefreshThrottle`] coalesces bursts under a minimum
//! interval, while new-order notifications bypass it down to a spacing
//! floor.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use shared::order::OrderStatus;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Change feed capacity
const CHANGE_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
}

/// Notification that an order changed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderChange {
    pub order_id: String,
    pub kind: ChangeKind,
    pub status: OrderStatus,
    pub at: DateTime<Utc>,
}

/// Broadcast of committed order changes
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<OrderChange>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish; having no subscriber is not an error
    pub fn publish(&self, change: OrderChange) {
        let _ = self.tx.send(change);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderChange> {
        self.tx.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshDecision {
    Now,
    After(Duration),
}

/// Pure refresh scheduling
#[derive(Debug, Clone)]
pub struct RefreshThrottle {
    min_interval: Duration,
    new_order_spacing: Duration,
    last_refresh: Option<Instant>,
    scheduled: Option<Instant>,
}

impl RefreshThrottle {
    pub fn new(min_interval: Duration, new_order_spacing: Duration) -> Self {
        Self {
            min_interval,
            new_order_spacing,
            last_refresh: None,
            scheduled: None,
        }
    }

    /// Decide when to refresh after a change observed at `now`
    ///
    /// A pending scheduled refresh absorbs later changes; a new order may
    /// pull it earlier but never closer than `new_order_spacing` to the
    /// previous refresh.
    pub fn on_change(&mut self, kind: ChangeKind, now: Instant) -> RefreshDecision {
        let gap = match kind {
            ChangeKind::Created => self.new_order_spacing,
            ChangeKind::Updated => self.min_interval,
        };
        let earliest = self.last_refresh.map_or(now, |last| last + gap).max(now);
        let due = match self.scheduled {
            Some(scheduled) if scheduled <= earliest => scheduled,
            _ => earliest,
        };

        if due <= now {
            self.fired(now);
            RefreshDecision::Now
        } else {
            self.scheduled = Some(due);
            RefreshDecision::After(due - now)
        }
    }

    /// Record that a refresh happened at `now`
    pub fn fired(&mut self, now: Instant) {
        self.last_refresh = Some(now);
        self.scheduled = None;
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled.is_some()
    }
}

/// Coalesced refresh notification
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshSignal {
    pub order_ids: BTreeSet<String>,
    /// At least one order in the batch is new
    pub has_new_orders: bool,
    /// Some notifications were dropped, reload everything
    pub lagged: bool,
}

impl RefreshSignal {
    fn push(&mut self, change: &OrderChange) {
        self.order_ids.insert(change.order_id.clone());
        self.has_new_orders |= change.kind == ChangeKind::Created;
    }

    fn is_empty(&self) -> bool {
        self.order_ids.is_empty() && !self.lagged
    }
}

/// Turn raw changes into throttled refresh signals
pub fn coalesce(
    rx: broadcast::Receiver<OrderChange>,
    throttle: RefreshThrottle,
) -> impl Stream<Item = RefreshSignal> {
    futures::stream::unfold((rx, throttle), |(mut rx, mut throttle)| async move {
        let mut batch = RefreshSignal::default();
        let mut deadline: Option<tokio::time::Instant> = None;

        loop {
            let received = match deadline {
                Some(at) => {
                    tokio::select! {
                        r = rx.recv() => Some(r),
                        _ = tokio::time::sleep_until(at) => None,
                    }
                }
                None => Some(rx.recv().await),
            };

            let kind = match received {
                // Scheduled refresh is due
                None => {
                    throttle.fired(Instant::now());
                    return Some((batch, (rx, throttle)));
                }
                Some(Ok(change)) => {
                    batch.push(&change);
                    change.kind
                }
                Some(Err(RecvError::Lagged(skipped))) => {
                    tracing::warn!(skipped, "Change feed lagged, forcing full refresh");
                    batch.lagged = true;
                    ChangeKind::Updated
                }
                Some(Err(RecvError::Closed)) => {
                    if batch.is_empty() {
                        return None;
                    }
                    return Some((batch, (rx, throttle)));
                }
            };

            match throttle.on_change(kind, Instant::now()) {
                RefreshDecision::Now => return Some((batch, (rx, throttle))),
                RefreshDecision::After(wait) => {
                    deadline = Some(tokio::time::Instant::now() + wait);
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn throttle() -> RefreshThrottle {
        RefreshThrottle::new(ms(2000), ms(500))
    }

    #[test]
    fn test_first_change_refreshes_now() {
        let mut t = throttle();
        assert_eq!(t.on_change(ChangeKind::Updated, Instant::now()), RefreshDecision::Now);
    }

    #[test]
    fn test_burst_is_coalesced_under_min_interval() {
        let mut t = throttle();
        let t0 = Instant::now();
        assert_eq!(t.on_change(ChangeKind::Updated, t0), RefreshDecision::Now);
        assert_eq!(
            t.on_change(ChangeKind::Updated, t0 + ms(100)),
            RefreshDecision::After(ms(1900))
        );
        // Absorbed by the already scheduled refresh
        assert_eq!(
            t.on_change(ChangeKind::Updated, t0 + ms(1500)),
            RefreshDecision::After(ms(500))
        );
        assert!(t.is_scheduled());
    }

    #[test]
    fn test_new_orders_bypass_interval_down_to_spacing() {
        let mut t = throttle();
        let t0 = Instant::now();
        assert_eq!(t.on_change(ChangeKind::Updated, t0), RefreshDecision::Now);
        assert_eq!(
            t.on_change(ChangeKind::Created, t0 + ms(200)),
            RefreshDecision::After(ms(300))
        );
        assert_eq!(t.on_change(ChangeKind::Created, t0 + ms(600)), RefreshDecision::Now);
    }

    #[test]
    fn test_created_pulls_scheduled_refresh_earlier() {
        let mut t = throttle();
        let t0 = Instant::now();
        t.on_change(ChangeKind::Updated, t0);
        assert_eq!(
            t.on_change(ChangeKind::Updated, t0 + ms(100)),
            RefreshDecision::After(ms(1900))
        );
        assert_eq!(
            t.on_change(ChangeKind::Created, t0 + ms(100)),
            RefreshDecision::After(ms(400))
        );
    }

    #[test]
    fn test_interval_elapsed_refreshes_now() {
        let mut t = throttle();
        let t0 = Instant::now();
        t.on_change(ChangeKind::Updated, t0);
        assert_eq!(t.on_change(ChangeKind::Updated, t0 + ms(2500)), RefreshDecision::Now);
    }

    fn change(id: &str, kind: ChangeKind) -> OrderChange {
        OrderChange {
            order_id: id.to_string(),
            kind,
            status: OrderStatus::Pending,
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_coalesce_batches_burst() {
        let feed = ChangeFeed::new();
        let stream = coalesce(feed.subscribe(), RefreshThrottle::new(ms(80), ms(10)));
        futures::pin_mut!(stream);

        feed.publish(change("a", ChangeKind::Updated));
        let first = stream.next().await.unwrap();
        assert_eq!(first.order_ids.len(), 1);

        feed.publish(change("b", ChangeKind::Updated));
        feed.publish(change("c", ChangeKind::Updated));
        feed.publish(change("b", ChangeKind::Updated));
        let second = tokio::time::timeout(ms(2000), stream.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            second.order_ids.into_iter().collect::<Vec<_>>(),
            vec!["b".to_string(), "c".to_string()]
        );
        assert!(!second.has_new_orders);
    }

    #[tokio::test]
    async fn test_coalesce_ends_when_feed_dropped() {
        let feed = ChangeFeed::new();
        let stream = coalesce(feed.subscribe(), throttle());
        drop(feed);
        futures::pin_mut!(stream);
        assert!(stream.next().await.is_none());
    }
}
