#![forbid(unsafe_code)]

//! Replay-latest multicast channel.
//!
//! # Design
//!
//! [`ReplayChannel<T>`] stores the most recently published value behind an
//! `Arc` and a list of weak subscriber callbacks. Publishing swaps the stored
//! value, snapshots the live callbacks, releases the state lock and then
//! invokes each callback in registration order.
//!
//! Deliveries are serialised by a reentrant delivery lock. Two threads
//! publishing at once never interleave their fan-outs, while a callback that
//! publishes or subscribes on the same thread re-enters without deadlock.
//!
//! # Invariants
//!
//! 1. A new subscriber receives the latest value (if any) before any later
//!    publication, and never receives the same publication twice.
//! 2. Subscribers are notified in registration order.
//! 3. `Completed` is delivered at most once per subscriber; nothing follows it.
//! 4. After completion, `publish` fails with [`ChannelClosed`] and delivers
//!    nothing.
//! 5. The state lock is never held while a callback runs.
//!
//! # Failure Modes
//!
//! - **Dropped guard mid-fan-out**: a callback whose [`Subscription`] is
//!   dropped while a publication is being delivered may still receive that
//!   one publication. It receives nothing afterwards.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, trace};

use crate::subscription::Subscription;

/// A value delivered to a subscriber callback.
#[derive(Debug)]
pub enum Notification<'a, T> {
    /// A published value (live or replayed).
    Next(&'a T),
    /// The channel finished; no further values will arrive.
    Completed,
}

// Manual impls: deriving would require `T: Clone`.
impl<T> Clone for Notification<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Notification<'_, T> {}

impl<'a, T> Notification<'a, T> {
    /// The carried value, or `None` for `Completed`.
    #[must_use]
    pub fn value(self) -> Option<&'a T> {
        match self {
            Self::Next(value) => Some(value),
            Self::Completed => None,
        }
    }

    /// Whether this is the completion signal.
    #[must_use]
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Returned by [`ReplayChannel::publish`] once the channel has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelClosed;

impl std::fmt::Display for ChannelClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "publish on a completed channel")
    }
}

impl std::error::Error for ChannelClosed {}

type Callback<T> = Arc<dyn Fn(Notification<'_, T>) + Send + Sync>;
type CallbackWeak<T> = Weak<dyn Fn(Notification<'_, T>) + Send + Sync>;

struct ChannelState<T> {
    latest: Option<Arc<T>>,
    completed: bool,
    published: u64,
    /// Stored weak; dead entries are pruned on publish.
    subscribers: Vec<CallbackWeak<T>>,
}

/// Prune dead subscribers and upgrade the live ones.
fn live_callbacks<T>(subscribers: &mut Vec<CallbackWeak<T>>) -> Vec<Callback<T>> {
    subscribers.retain(|weak| weak.strong_count() > 0);
    subscribers.iter().filter_map(Weak::upgrade).collect()
}

/// A multicast channel that replays its latest value to new subscribers.
///
/// Dropping the channel completes it.
pub struct ReplayChannel<T> {
    state: Mutex<ChannelState<T>>,
    delivery: ReentrantMutex<()>,
}

impl<T> Default for ReplayChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ReplayChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ReplayChannel")
            .field("latest", &state.latest)
            .field("completed", &state.completed)
            .field("published", &state.published)
            .field("subscriber_count", &state.subscribers.len())
            .finish()
    }
}

impl<T> ReplayChannel<T> {
    /// Create an open channel with no value and no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChannelState {
                latest: None,
                completed: false,
                published: 0,
                subscribers: Vec::new(),
            }),
            delivery: ReentrantMutex::new(()),
        }
    }

    /// Publish a value to every live subscriber, in registration order.
    ///
    /// The value becomes the replay value for future subscribers before any
    /// callback runs.
    pub fn publish(&self, value: T) -> Result<(), ChannelClosed> {
        let _delivery = self.delivery.lock();
        let (value, callbacks) = {
            let mut state = self.state.lock();
            if state.completed {
                return Err(ChannelClosed);
            }
            let value = Arc::new(value);
            state.latest = Some(Arc::clone(&value));
            state.published += 1;
            (value, live_callbacks(&mut state.subscribers))
        };

        trace!(subscribers = callbacks.len(), "replay channel publish");
        for callback in &callbacks {
            callback(Notification::Next(&*value));
        }
        Ok(())
    }

    /// Mark the channel finished and signal every live subscriber.
    ///
    /// Returns `true` only for the call that performed the completion.
    pub fn complete(&self) -> bool {
        let _delivery = self.delivery.lock();
        let callbacks = {
            let mut state = self.state.lock();
            if state.completed {
                return false;
            }
            state.completed = true;
            let mut subscribers = std::mem::take(&mut state.subscribers);
            live_callbacks(&mut subscribers)
        };

        debug!(subscribers = callbacks.len(), "replay channel completed");
        for callback in &callbacks {
            callback(Notification::Completed);
        }
        true
    }

    /// The most recently published value, if any.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<T>> {
        self.state.lock().latest.clone()
    }

    /// Whether [`complete`](Self::complete) has run.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state.lock().completed
    }

    /// Number of registered subscribers, including dropped guards not yet
    /// pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    /// Number of successful publications since creation.
    #[must_use]
    pub fn published_count(&self) -> u64 {
        self.state.lock().published
    }
}

impl<T: Send + Sync + 'static> ReplayChannel<T> {
    /// Subscribe to the channel.
    ///
    /// The callback first receives the latest value, if one was published,
    /// then every later publication. On a completed channel it receives the
    /// latest value (if any) followed by `Completed`, and is not registered.
    pub fn subscribe(
        &self,
        callback: impl Fn(Notification<'_, T>) + Send + Sync + 'static,
    ) -> Subscription {
        let _delivery = self.delivery.lock();
        let strong: Callback<T> = Arc::new(callback);
        let (latest, completed) = {
            let mut state = self.state.lock();
            if !state.completed {
                state.subscribers.push(Arc::downgrade(&strong));
            }
            (state.latest.clone(), state.completed)
        };

        if let Some(value) = latest {
            strong(Notification::Next(&*value));
        }
        if completed {
            strong(Notification::Completed);
        }
        Subscription::new(strong)
    }
}

impl<T> Drop for ReplayChannel<T> {
    fn drop(&mut self) {
        self.complete();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
