//! Liveness Guard.
//!
//! Marks an object as live while a decision on it is pending. The marker is
//! a per-object atomic counter, independent of the host's own reference
//! counting, so several callers can hold decisions on the same object at
//! once. [`LiveGuard`] releases its marker on drop, which covers early
//! returns, authority failures and unwinding alike.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use tracing::trace;

use crate::types::InodeId;

/// Table of live markers keyed by object identity.
#[derive(Debug, Default)]
pub struct LivenessTable {
    markers: RwLock<HashMap<InodeId, AtomicUsize>>,
}

impl LivenessTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` live until the returned guard is dropped.
    pub fn acquire(&self, id: InodeId) -> LiveGuard<'_> {
        // Increment under the read lock so `release` cannot remove a marker
        // between lookup and increment.
        let bumped = {
            let markers = self.markers.read().unwrap_or_else(PoisonError::into_inner);
            markers
                .get(&id)
                .map(|count| count.fetch_add(1, Ordering::AcqRel))
        };
        if bumped.is_none() {
            let mut markers = self.markers.write().unwrap_or_else(PoisonError::into_inner);
            markers
                .entry(id)
                .or_insert_with(|| AtomicUsize::new(0))
                .fetch_add(1, Ordering::AcqRel);
        }
        trace!(object = %id, "object marked live");
        LiveGuard { table: self, id }
    }

    fn release(&self, id: InodeId) {
        let drained = {
            let markers = self.markers.read().unwrap_or_else(PoisonError::into_inner);
            markers
                .get(&id)
                .map(|count| count.fetch_sub(1, Ordering::AcqRel) == 1)
                .unwrap_or(false)
        };
        if drained {
            let mut markers = self.markers.write().unwrap_or_else(PoisonError::into_inner);
            // Someone may have re-acquired after the decrement.
            if markers
                .get(&id)
                .is_some_and(|count| count.load(Ordering::Acquire) == 0)
            {
                markers.remove(&id);
            }
        }
        trace!(object = %id, "object live marker released");
    }

    /// Current number of live markers on `id`.
    pub fn count(&self, id: InodeId) -> usize {
        self.markers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .map(|count| count.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    /// Whether any decision is pending on `id`.
    pub fn is_live(&self, id: InodeId) -> bool {
        self.count(id) > 0
    }

    /// Number of objects with at least one marker.
    pub fn live_objects(&self) -> usize {
        self.markers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Scoped live marker; released on drop.
#[derive(Debug)]
#[must_use = "the object is only live while the guard is held"]
pub struct LiveGuard<'a> {
    table: &'a LivenessTable,
    id: InodeId,
}

impl LiveGuard<'_> {
    /// Object held live by this guard.
    pub fn id(&self) -> InodeId {
        self.id
    }
}

impl Drop for LiveGuard<'_> {
    fn drop(&mut self) {
        self.table.release(self.id);
    }
}
