use crate::{ServiceStatus, lock};

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::watch;

type Callback = dyn Fn(&ServiceStatus) + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// In-process pub/sub of status snapshots.
///
/// Holds the latest snapshot and the live subscriber set. Every publish gets
/// a sequence number; each subscriber remembers the last sequence it saw, so
/// a stale snapshot is never delivered after a newer one.
///
/// Callbacks run on the publishing thread and must not publish into the same
/// channel.
#[derive(Clone)]
pub struct StatusChannel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    state: Mutex<ChannelState>,
    live: watch::Sender<usize>,
}

struct ChannelState {
    latest: ServiceStatus,
    sequence: u64,
    next_id: u64,
    subscribers: Vec<Arc<Subscriber>>,
}

struct Subscriber {
    id: SubscriptionId,
    active: AtomicBool,
    last_delivered: Mutex<u64>,
    callback: Box<Callback>,
}

impl Subscriber {
    fn deliver(&self, sequence: u64, status: &ServiceStatus) {
        let mut last = lock(&self.last_delivered);
        if sequence <= *last || !self.active.load(Ordering::Acquire) {
            return;
        }
        *last = sequence;

        let outcome = catch_unwind(AssertUnwindSafe(|| (self.callback)(status)));
        if outcome.is_err() {
            log::warn!(
                "Status subscriber {} panicked while handling '{}'",
                self.id,
                status.state()
            );
        }
    }
}

impl StatusChannel {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                state: Mutex::new(ChannelState {
                    latest: ServiceStatus::stopped(),
                    sequence: 1,
                    next_id: 1,
                    subscribers: Vec::new(),
                }),
                live: watch::Sender::new(0),
            }),
        }
    }

    /// Store `status` as the latest snapshot and fan it out in subscription order.
    pub fn publish(&self, status: ServiceStatus) {
        let (sequence, subscribers) = {
            let mut state = lock(&self.inner.state);
            state.sequence += 1;
            state.latest = status.clone();
            (state.sequence, state.subscribers.clone())
        };

        log::debug!(
            "Publishing status '{}' (seq {}) to {} subscribers",
            status.state(),
            sequence,
            subscribers.len()
        );

        for subscriber in subscribers {
            subscriber.deliver(sequence, &status);
        }
    }

    /// Register `callback` and deliver the current snapshot to it before returning.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ServiceStatus) + Send + Sync + 'static,
    {
        let (subscriber, sequence, latest) = {
            let mut state = lock(&self.inner.state);
            let id = SubscriptionId(state.next_id);
            state.next_id += 1;

            let subscriber = Arc::new(Subscriber {
                id,
                active: AtomicBool::new(true),
                last_delivered: Mutex::new(0),
                callback: Box::new(callback),
            });
            state.subscribers.push(subscriber.clone());
            self.inner.live.send_replace(state.subscribers.len());

            (subscriber, state.sequence, state.latest.clone())
        };

        log::debug!(
            "Status subscriber {} registered ({} live)",
            subscriber.id,
            self.subscriber_count()
        );

        subscriber.deliver(sequence, &latest);

        Subscription {
            id: subscriber.id,
            channel: Arc::downgrade(&self.inner),
            released: AtomicBool::new(false),
        }
    }

    /// Remove a subscriber. Unknown or already removed ids are ignored.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        subscription.unsubscribe();
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.state).subscribers.len()
    }

    /// Live subscriber count, for pausing work nobody is watching.
    pub fn watch_subscribers(&self) -> watch::Receiver<usize> {
        self.inner.live.subscribe()
    }

    pub fn latest(&self) -> ServiceStatus {
        lock(&self.inner.state).latest.clone()
    }
}

impl ChannelInner {
    fn remove(&self, id: SubscriptionId) -> bool {
        let mut state = lock(&self.state);
        let Some(index) = state.subscribers.iter().position(|s| s.id == id) else {
            return false;
        };

        let subscriber = state.subscribers.remove(index);
        subscriber.active.store(false, Ordering::Release);
        self.live.send_replace(state.subscribers.len());
        true
    }
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StatusChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusChannel")
            .field("latest", &self.latest())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle returned by [`StatusChannel::subscribe`].
///
/// Dropping it unsubscribes. Holds only a weak link, so it never keeps the
/// channel alive.
pub struct Subscription {
    id: SubscriptionId,
    channel: Weak<ChannelInner>,
    released: AtomicBool,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        !self.released.load(Ordering::Acquire) && self.channel.strong_count() > 0
    }

    /// Idempotent.
    pub fn unsubscribe(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(channel) = self.channel.upgrade()
            && channel.remove(self.id)
        {
            log::debug!("Status subscriber {} removed", self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
