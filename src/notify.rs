//! Change-notification channel.
//!
//! Present on an instance only when its schema requests the observable
//! capability. The subscriber aggregate is an immutable `Arc<Vec<_>>`
//! republished through an optimistic compare-and-swap retry loop, so
//! subscribe/unsubscribe are safe under concurrent multi-writer use without
//! taking a lock. Dispatch iterates whatever aggregate existed at the
//! triggering set's read, in subscription order.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;

use crate::Result;
use crate::entity::Entity;

/// Callback invoked with `(entity, property_name)` after a property stores a
/// new value. An `Err` aborts dispatch and propagates to the set caller.
pub type ChangeCallback = Arc<dyn Fn(&Entity, &str) -> Result<()> + Send + Sync>;

/// Token returned by [`NotificationChannel::subscribe`]; removal is by token
/// since callbacks have no identity of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Clone)]
struct Subscriber {
    id: SubscriptionId,
    callback: ChangeCallback,
}

/// Lock-free multi-subscriber callback aggregate.
pub struct NotificationChannel {
    subscribers: ArcSwap<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl NotificationChannel {
    pub fn new() -> Self {
        Self {
            subscribers: ArcSwap::from_pointee(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a callback. Invocation order across subscribers is
    /// subscription order.
    pub fn subscribe(&self, callback: ChangeCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));

        loop {
            let cur = self.subscribers.load_full();
            let mut next = (*cur).clone();
            next.push(Subscriber { id, callback: callback.clone() });

            let prev = self.subscribers.compare_and_swap(&cur, Arc::new(next));
            if Arc::ptr_eq(&prev, &cur) {
                return id;
            }
        }
    }

    /// Remove a callback by token. Returns false when the token is unknown
    /// (or already removed).
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        loop {
            let cur = self.subscribers.load_full();
            if !cur.iter().any(|s| s.id == id) {
                return false;
            }

            let mut next = (*cur).clone();
            next.retain(|s| s.id != id);

            let prev = self.subscribers.compare_and_swap(&cur, Arc::new(next));
            if Arc::ptr_eq(&prev, &cur) {
                return true;
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load().len()
    }

    /// Invoke every subscriber in subscription order. The aggregate read
    /// here is the only snapshot guarantee.
    pub(crate) fn dispatch(&self, entity: &Entity, property: &str) -> Result<()> {
        let subscribers = self.subscribers.load();
        if subscribers.is_empty() {
            return Ok(());
        }

        tracing::trace!(property, subscribers = subscribers.len(), "dispatching change");
        for subscriber in subscribers.iter() {
            (subscriber.callback)(entity, property)?;
        }
        Ok(())
    }
}

impl Default for NotificationChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationChannel")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
