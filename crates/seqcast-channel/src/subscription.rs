#![forbid(unsafe_code)]

//! RAII subscription guard.

use std::any::Any;

/// RAII guard for a subscriber callback.
///
/// The channel only holds a weak reference to each callback. The guard owns
/// the strong one, so dropping it makes the callback unreachable: it will
/// not be invoked by any publication that starts after the drop, and the
/// dead entry is pruned on the next publish.
pub struct Subscription {
    /// Type-erased strong reference keeping the callback `Arc` alive.
    _guard: Box<dyn Any + Send + Sync>,
}

impl Subscription {
    pub(crate) fn new(guard: impl Any + Send + Sync) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }

    /// Stop delivery. Equivalent to dropping the guard.
    pub fn unsubscribe(self) {}
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
