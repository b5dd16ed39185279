#![forbid(unsafe_code)]

//! Thread-safe observable sequence.
//!
//! # Design
//!
//! [`ObservableSequence<T>`] keeps a `Vec<T>` inside a
//! `ReentrantMutex<RefCell<..>>` shared through an `Arc`. Every mutation
//! validates, applies, queues its change event(s) followed by one snapshot,
//! and drains the queue into the two replay channels before releasing the
//! lock.
//!
//! ```text
//! append("c")                       change channel       snapshot channel
//! ┌──────────────┐  queue          ┌─────────────────┐  ┌──────────────┐
//! │ lock         │ ───────────────▶│ Insert(2, "c")  │─▶│ [a, b, c]    │
//! │ validate     │                 └─────────────────┘  └──────────────┘
//! │ mutate       │
//! │ drain queue  │  (lock held until the snapshot is delivered)
//! └──────────────┘
//! ```
//!
//! # Reentrancy
//!
//! A subscriber may mutate the same sequence from inside its callback. The
//! reentrant lock lets it in; the nested mutation updates state at once but
//! its publications go to the back of the queue. The outer drain delivers
//! them after the publications already queued, so subscribers always observe
//! whole `(changes, snapshot)` groups and the last snapshot delivered is the
//! current state.
//!
//! # Failure Modes
//!
//! - **Mutating inside [`with`](ObservableSequence::with)**: the closure runs
//!   under a shared borrow; calling a mutating method from it panics.
//! - **Panicking subscriber**: the panic unwinds through the mutating call.
//!   Publications still queued at that point are delivered by the next
//!   successful mutation.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::ops::Range;
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use seqcast_channel::{Notification, ReplayChannel, Subscription};
use tracing::{debug, trace};

use crate::change::ChangeEvent;
use crate::config::{DisposePolicy, ReplacePolicy, SequenceConfig};
use crate::error::{SequenceError, SequenceResult};

/// A queued channel operation.
enum Publication<T> {
    Change(ChangeEvent<T>),
    Snapshot(Vec<T>),
    Complete,
}

struct State<T> {
    items: Vec<T>,
    /// Bumped once per publishing mutation.
    version: u64,
    disposed: bool,
    pending: VecDeque<Publication<T>>,
    /// True while some frame on the owning thread is draining `pending`.
    draining: bool,
}

struct Shared<T> {
    state: ReentrantMutex<RefCell<State<T>>>,
    snapshots: ReplayChannel<Vec<T>>,
    changes: ReplayChannel<ChangeEvent<T>>,
    config: SequenceConfig,
}

/// Result of a validated mutation: the events to publish and the value
/// handed back to the caller. No events means no-op.
struct Applied<T, R> {
    changes: Vec<ChangeEvent<T>>,
    output: R,
}

impl<T, R> Applied<T, R> {
    fn single(change: ChangeEvent<T>, output: R) -> Self {
        Self {
            changes: vec![change],
            output,
        }
    }

    fn unchanged(output: R) -> Self {
        Self {
            changes: Vec::new(),
            output,
        }
    }
}

/// Resets the draining flag even if a subscriber panics.
struct DrainGuard<'a, T>(&'a RefCell<State<T>>);

impl<T> Drop for DrainGuard<'_, T> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.0.try_borrow_mut() {
            state.draining = false;
        }
    }
}

/// A mutable ordered collection that broadcasts snapshots and change events.
///
/// Cloning creates a new handle to the **same** sequence. When the last
/// handle is dropped both channels complete.
///
/// # Invariants
///
/// 1. Each successful mutation publishes its change event(s), then exactly
///    one snapshot, with no other publication in between.
/// 2. A rejected call changes nothing and publishes nothing.
/// 3. Readers only ever receive copies of the contents.
pub struct ObservableSequence<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for ObservableSequence<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ObservableSequence<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.shared.state.lock();
        let state = guard.borrow();
        f.debug_struct("ObservableSequence")
            .field("label", &self.shared.config.label())
            .field("items", &state.items)
            .field("version", &state.version)
            .field("disposed", &state.disposed)
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for ObservableSequence<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T: Clone + Send + Sync + 'static> From<Vec<T>> for ObservableSequence<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T: Clone + Send + Sync + 'static> FromIterator<T> for ObservableSequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T: Clone + Send + Sync + 'static> ObservableSequence<T> {
    /// Create a sequence with the default configuration.
    #[must_use]
    pub fn new(initial: Vec<T>) -> Self {
        Self::with_config(initial, SequenceConfig::default())
    }

    /// Create a sequence with an explicit configuration.
    #[must_use]
    pub fn with_config(initial: Vec<T>, config: SequenceConfig) -> Self {
        let snapshots = ReplayChannel::new();
        if config.publish_initial_snapshot {
            // Fresh channel; cannot be closed yet.
            let _ = snapshots.publish(initial.clone());
        }
        debug!(label = config.label(), len = initial.len(), "sequence created");
        Self {
            shared: Arc::new(Shared {
                state: ReentrantMutex::new(RefCell::new(State {
                    items: initial,
                    version: 0,
                    disposed: false,
                    pending: VecDeque::new(),
                    draining: false,
                })),
                snapshots,
                changes: ReplayChannel::new(),
                config,
            }),
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Copy of the current contents.
    #[must_use]
    pub fn current_value(&self) -> Vec<T> {
        self.shared.state.lock().borrow().items.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.state.lock().borrow().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the element at `index`, if present.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        self.shared.state.lock().borrow().items.get(index).cloned()
    }

    /// Run `f` against the contents under the lock, without copying.
    ///
    /// # Panics
    ///
    /// Panics if `f` mutates this sequence.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        let guard = self.shared.state.lock();
        let state = guard.borrow();
        f(&state.items)
    }

    /// Number of publishing mutations so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.state.lock().borrow().version
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shared.state.lock().borrow().disposed
    }

    #[must_use]
    pub fn config(&self) -> &SequenceConfig {
        &self.shared.config
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Subscribe to full snapshots. Replays the latest snapshot, if any.
    pub fn subscribe_snapshots(
        &self,
        callback: impl Fn(Notification<'_, Vec<T>>) + Send + Sync + 'static,
    ) -> Subscription {
        let _guard = self.shared.state.lock();
        self.shared.snapshots.subscribe(callback)
    }

    /// Subscribe to change events. Replays the latest change, if any.
    pub fn subscribe_changes(
        &self,
        callback: impl Fn(Notification<'_, ChangeEvent<T>>) + Send + Sync + 'static,
    ) -> Subscription {
        let _guard = self.shared.state.lock();
        self.shared.changes.subscribe(callback)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Replace the whole contents.
    ///
    /// Publishes one composite of inserts describing the new contents; the
    /// previous contents are not reported as removed.
    pub fn set_value(&self, items: impl IntoIterator<Item = T>) -> SequenceResult<()> {
        let items: Vec<T> = items.into_iter().collect();
        self.mutate("set_value", move |current| {
            let change = ChangeEvent::composite(
                items
                    .iter()
                    .cloned()
                    .enumerate()
                    .map(|(index, element)| ChangeEvent::insert(index, element)),
            );
            *current = items;
            Ok(Applied::single(change, ()))
        })
        .or_else(|err| self.tolerate(err, ()))
    }

    /// Remove and return the first element; no-op when empty.
    pub fn remove_first(&self) -> SequenceResult<Option<T>> {
        self.mutate("remove_first", |items| {
            if items.is_empty() {
                return Ok(Applied::unchanged(None));
            }
            let element = items.remove(0);
            Ok(Applied::single(
                ChangeEvent::remove(0, element.clone()),
                Some(element),
            ))
        })
        .or_else(|err| self.tolerate(err, None))
    }

    /// Remove and return the last element; no-op when empty.
    pub fn remove_last(&self) -> SequenceResult<Option<T>> {
        self.mutate("remove_last", |items| {
            let Some(element) = items.pop() else {
                return Ok(Applied::unchanged(None));
            };
            let index = items.len();
            Ok(Applied::single(
                ChangeEvent::remove(index, element.clone()),
                Some(element),
            ))
        })
        .or_else(|err| self.tolerate(err, None))
    }

    /// Remove and return the element at `index`.
    pub fn remove_at(&self, index: usize) -> SequenceResult<T> {
        self.mutate("remove_at", |items| {
            check_index(index, items.len())?;
            let element = items.remove(index);
            Ok(Applied::single(
                ChangeEvent::remove(index, element.clone()),
                element,
            ))
        })
    }

    /// Remove everything.
    ///
    /// Publishes one composite listing every original position, even when
    /// the sequence was already empty.
    pub fn remove_all(&self) -> SequenceResult<()> {
        self.mutate("remove_all", |items| {
            let change = ChangeEvent::composite(
                items
                    .drain(..)
                    .enumerate()
                    .map(|(index, element)| ChangeEvent::remove(index, element)),
            );
            Ok(Applied::single(change, ()))
        })
        .or_else(|err| self.tolerate(err, ()))
    }

    /// Append one element.
    pub fn append(&self, element: T) -> SequenceResult<()> {
        self.mutate("append", move |items| {
            items.push(element.clone());
            Ok(Applied::single(
                ChangeEvent::insert(items.len() - 1, element),
                (),
            ))
        })
        .or_else(|err| self.tolerate(err, ()))
    }

    /// Append several elements, keeping their order.
    pub fn append_all(&self, elements: impl IntoIterator<Item = T>) -> SequenceResult<()> {
        let elements: Vec<T> = elements.into_iter().collect();
        self.mutate("append_all", move |items| {
            let base = items.len();
            let change = ChangeEvent::composite(
                elements
                    .iter()
                    .cloned()
                    .enumerate()
                    .map(|(offset, element)| ChangeEvent::insert(base + offset, element)),
            );
            items.extend(elements);
            Ok(Applied::single(change, ()))
        })
        .or_else(|err| self.tolerate(err, ()))
    }

    /// Insert `element` so that it ends up at `index` (`0..=len`).
    pub fn insert(&self, index: usize, element: T) -> SequenceResult<()> {
        self.mutate("insert", move |items| {
            if index > items.len() {
                return Err(SequenceError::IndexOutOfRange {
                    index,
                    len: items.len(),
                });
            }
            items.insert(index, element.clone());
            Ok(Applied::single(ChangeEvent::insert(index, element), ()))
        })
        .or_else(|err| self.tolerate(err, ()))
    }

    /// Exchange the elements at `a` and `b`.
    pub fn swap(&self, a: usize, b: usize) -> SequenceResult<()> {
        self.mutate("swap", |items| {
            check_index(a, items.len())?;
            check_index(b, items.len())?;
            let change = ChangeEvent::moved(a, b, items[a].clone(), items[b].clone());
            items.swap(a, b);
            Ok(Applied::single(change, ()))
        })
        .or_else(|err| self.tolerate(err, ()))
    }

    /// Overwrite the positions starting at `range.start` with `replacement`.
    ///
    /// Publishes a composite of removals, then a separate composite of
    /// insertions, then one snapshot. How a replacement whose length differs
    /// from `range` is handled depends on [`ReplacePolicy`].
    pub fn replace(
        &self,
        range: Range<usize>,
        replacement: impl IntoIterator<Item = T>,
    ) -> SequenceResult<()> {
        let replacement: Vec<T> = replacement.into_iter().collect();
        let policy = self.shared.config.replace_policy;
        self.mutate("replace", move |items| {
            let len = items.len();
            if range.start > range.end || range.end > len {
                return Err(SequenceError::RangeOutOfBounds {
                    start: range.start,
                    end: range.end,
                    len,
                });
            }
            match policy {
                ReplacePolicy::Strict if replacement.len() != range.len() => {
                    return Err(SequenceError::ReplacementLengthMismatch {
                        range_len: range.len(),
                        replacement_len: replacement.len(),
                    });
                }
                ReplacePolicy::Positional if range.start + replacement.len() > len => {
                    return Err(SequenceError::RangeOutOfBounds {
                        start: range.start,
                        end: range.start + replacement.len(),
                        len,
                    });
                }
                _ => {}
            }

            let mut removed = Vec::with_capacity(replacement.len());
            let mut inserted = Vec::with_capacity(replacement.len());
            for (offset, element) in replacement.into_iter().enumerate() {
                let index = range.start + offset;
                let old = std::mem::replace(&mut items[index], element.clone());
                removed.push(ChangeEvent::remove(index, old));
                inserted.push(ChangeEvent::insert(index, element));
            }
            Ok(Applied {
                changes: vec![
                    ChangeEvent::Composite(removed),
                    ChangeEvent::Composite(inserted),
                ],
                output: (),
            })
        })
        .or_else(|err| self.tolerate(err, ()))
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Complete both channels and refuse further mutations.
    ///
    /// Publications already queued are delivered first. Returns `true` only
    /// for the call that performed the disposal.
    pub fn dispose(&self) -> bool {
        let guard = self.shared.state.lock();
        {
            let mut state = guard.borrow_mut();
            if state.disposed {
                return false;
            }
            state.disposed = true;
            state.pending.push_back(Publication::Complete);
        }
        debug!(label = self.shared.config.label(), "sequence disposed");
        self.drain(&guard);
        true
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn mutate<R>(
        &self,
        op: &'static str,
        apply: impl FnOnce(&mut Vec<T>) -> SequenceResult<Applied<T, R>>,
    ) -> SequenceResult<R> {
        let guard = self.shared.state.lock();
        let output = {
            let mut state = guard.borrow_mut();
            if state.disposed {
                return Err(self.rejected(op, SequenceError::Disposed));
            }
            let Applied { changes, output } =
                apply(&mut state.items).map_err(|err| self.rejected(op, err))?;
            if changes.is_empty() {
                trace!(op, label = self.shared.config.label(), "sequence mutation was a no-op");
                return Ok(output);
            }

            state.version += 1;
            let snapshot = state.items.clone();
            state
                .pending
                .extend(changes.into_iter().map(Publication::Change));
            state.pending.push_back(Publication::Snapshot(snapshot));
            debug!(
                op,
                label = self.shared.config.label(),
                len = state.items.len(),
                version = state.version,
                "sequence mutated"
            );
            output
        };
        self.drain(&guard);
        Ok(output)
    }

    /// Deliver queued publications in order. Nested calls on the same thread
    /// return immediately and leave the work to the outermost drain.
    fn drain(&self, cell: &RefCell<State<T>>) {
        {
            let mut state = cell.borrow_mut();
            if state.draining {
                return;
            }
            state.draining = true;
        }
        let _reset = DrainGuard(cell);

        loop {
            let next = cell.borrow_mut().pending.pop_front();
            let Some(publication) = next else {
                break;
            };
            let delivered = match publication {
                Publication::Change(event) => {
                    trace!(kind = event.kind().as_str(), "publishing change");
                    self.shared.changes.publish(event)
                }
                Publication::Snapshot(items) => {
                    trace!(len = items.len(), "publishing snapshot");
                    self.shared.snapshots.publish(items)
                }
                Publication::Complete => {
                    self.shared.changes.complete();
                    self.shared.snapshots.complete();
                    Ok(())
                }
            };
            if let Err(err) = delivered {
                trace!(error = %err, "dropping publication");
            }
        }
    }

    fn rejected(&self, op: &'static str, err: SequenceError) -> SequenceError {
        debug!(op, label = self.shared.config.label(), error = %err, "sequence mutation rejected");
        err
    }

    /// Map `Disposed` to `neutral` under [`DisposePolicy::Ignore`].
    fn tolerate<R>(&self, err: SequenceError, neutral: R) -> SequenceResult<R> {
        match (err, self.shared.config.dispose_policy) {
            (SequenceError::Disposed, DisposePolicy::Ignore) => Ok(neutral),
            (err, _) => Err(err),
        }
    }
}

fn check_index(index: usize, len: usize) -> SequenceResult<()> {
    if index < len {
        Ok(())
    } else {
        Err(SequenceError::IndexOutOfRange { index, len })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
