//! Change queues and numbered deltas
//!
//! The authority records every committed field change into a [`ChangeQueue`]. Once per
//! tick the queue is drained into a [`Delta`] carrying a per-actor sequence number, which
//! observers feed through a [`DeltaTracker`] so duplicated or reordered deltas are dropped.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tether_core::ActorId;
use tracing::debug;

/// Batch of field changes for one actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta<F> {
    /// Actor the changes belong to
    pub actor: ActorId,
    /// Monotonic per-actor sequence number, starting at 1
    pub sequence: u64,
    /// Changes in commit order
    pub changes: Vec<F>,
}

/// Authoritative changes waiting to be broadcast
#[derive(Debug, Clone)]
pub struct ChangeQueue<F> {
    pending: Vec<F>,
    last_sequence: u64,
}

impl<F> ChangeQueue<F> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            last_sequence: 0,
        }
    }

    /// Record a committed change
    pub fn push(&mut self, change: F) {
        self.pending.push(change);
    }

    /// Changes recorded since the last drain
    pub fn pending(&self) -> &[F] {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drain pending changes into the next delta, or `None` if nothing changed
    pub fn take_delta(&mut self, actor: ActorId) -> Option<Delta<F>> {
        if self.pending.is_empty() {
            return None;
        }
        self.last_sequence += 1;
        Some(Delta {
            actor,
            sequence: self.last_sequence,
            changes: std::mem::take(&mut self.pending),
        })
    }
}

impl<F> Default for ChangeQueue<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer-side bookkeeping of the last applied sequence per actor
#[derive(Debug, Clone, Default)]
pub struct DeltaTracker {
    last_applied: HashMap<ActorId, u64>,
}

impl DeltaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the delta is newer than anything applied for its actor
    pub fn accept<F>(&mut self, delta: &Delta<F>) -> bool {
        let last = self.last_applied.entry(delta.actor).or_insert(0);
        if delta.sequence <= *last {
            debug!(
                "Dropping stale delta {} for actor {} (last applied {})",
                delta.sequence, delta.actor, last
            );
            return false;
        }
        *last = delta.sequence;
        true
    }

    /// Forget an actor, e.g. after it despawned
    pub fn forget(&mut self, actor: ActorId) {
        self.last_applied.remove(&actor);
    }
}
