//! Change notifications for the database backend.
//!
//! Every successful upsert is published to all live subscriptions, tagged
//! with the writer that made it. A subscription ends when it is dropped,
//! when the feed is closed, or when the feed itself goes away.

use crate::models::ChangeEvent;
use futures::Stream;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, watch};
use tracing::debug;

const FEED_CAPACITY: usize = 256;

/// One writer on a shared table. Ids are unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WriterId(u64);

impl WriterId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        WriterId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A published change and the writer it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub origin: WriterId,
    pub event: ChangeEvent,
}

pub struct ChangeFeed {
    changes: broadcast::Sender<Change>,
    closed: watch::Sender<bool>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(FEED_CAPACITY);
        let (closed, _) = watch::channel(false);
        Self { changes, closed }
    }

    /// Returns how many subscriptions saw the event.
    pub fn publish(&self, origin: WriterId, event: ChangeEvent) -> usize {
        self.changes.send(Change { origin, event }).unwrap_or(0)
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            changes: self.changes.subscribe(),
            closed: self.closed.subscribe(),
        }
    }

    /// Ends every current and future subscription.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }
}

/// Handle on the change feed. Dropping it releases the subscription.
pub struct Subscription {
    changes: broadcast::Receiver<Change>,
    closed: watch::Receiver<bool>,
}

impl Subscription {
    /// Next change, or `None` once the feed is closed and drained. Events
    /// missed by a slow subscriber are skipped.
    pub async fn next(&mut self) -> Option<Change> {
        loop {
            match self.changes.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "change subscription lagged");
                    continue;
                }
                Err(broadcast::error::TryRecvError::Closed) => return None,
                Err(broadcast::error::TryRecvError::Empty) => {}
            }

            let closed = *self.closed.borrow();
            if closed {
                return None;
            }

            tokio::select! {
                biased;
                received = self.changes.recv() => match received {
                    Ok(event) => return Some(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "change subscription lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
                changed = self.closed.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }
            }
        }
    }

    pub fn unsubscribe(self) {}

    /// Bare events, whoever wrote them.
    pub fn into_stream(self) -> impl Stream<Item = ChangeEvent> + Send + 'static {
        futures::stream::unfold(self, |mut subscription| async move {
            let change = subscription.next().await?;
            Some((change.event, subscription))
        })
    }
}
