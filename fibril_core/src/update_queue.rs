// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pending state transitions.
//!
//! An [`UpdateQueue`] is a circular singly linked list stored in a `Vec`, with
//! `pending` pointing at the most recently enqueued entry. The entry after
//! `pending` is therefore the oldest, so both enqueue and an in-order walk
//! start from a single index.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::fiber::INVALID;
use crate::lanes::Lanes;

/// A state transition.
pub enum Action<S> {
    /// Replace the state with a new value.
    Replace(S),
    /// Compute the next state from the previous one.
    Reduce(Box<dyn FnOnce(&S) -> S>),
}

impl<S> Action<S> {
    /// Applies the transition to `state`.
    #[must_use]
    pub fn apply(self, state: S) -> S {
        match self {
            Self::Replace(next) => next,
            Self::Reduce(f) => f(&state),
        }
    }
}

impl<S> fmt::Debug for Action<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace(_) => f.write_str("Replace(..)"),
            Self::Reduce(_) => f.write_str("Reduce(..)"),
        }
    }
}

struct Update<S> {
    action: Option<Action<S>>,
    lane: Lanes,
    next: u32,
}

/// Updates waiting to be folded into a state value on the next render.
pub struct UpdateQueue<S> {
    updates: Vec<Update<S>>,
    pending: u32,
}

impl<S> Default for UpdateQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for UpdateQueue<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateQueue")
            .field("len", &self.len())
            .field("lanes", &self.pending_lanes())
            .finish()
    }
}

impl<S> UpdateQueue<S> {
    /// Creates an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            updates: Vec::new(),
            pending: INVALID,
        }
    }

    /// Returns `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending == INVALID
    }

    /// Number of pending updates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    /// Union of the lanes of all pending updates.
    #[must_use]
    pub fn pending_lanes(&self) -> Lanes {
        self.updates
            .iter()
            .fold(Lanes::empty(), |acc, update| acc | update.lane)
    }

    /// Appends an update tagged with `lane`.
    pub fn enqueue(&mut self, action: Action<S>, lane: Lanes) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "update counts stay far below u32::MAX"
        )]
        let idx = self.updates.len() as u32;
        let next = if self.pending == INVALID {
            idx
        } else {
            let last = self.pending as usize;
            let first = self.updates[last].next;
            self.updates[last].next = idx;
            first
        };
        self.updates.push(Update {
            action: Some(action),
            lane,
            next,
        });
        self.pending = idx;
    }

    /// Folds every update tagged `lane` into `base`, oldest first.
    ///
    /// Updates at other lanes are kept, in their original order, for a later
    /// drain. The queue is detached before the walk, so updates enqueued by
    /// an action land in the next drain rather than this one.
    pub fn drain(&mut self, base: S, lane: Lanes) -> S {
        let mut state = base;
        for (action, update_lane) in self.take_ordered() {
            if update_lane == lane {
                state = action.apply(state);
            } else {
                self.enqueue(action, update_lane);
            }
        }
        state
    }

    /// Moves the updates of `older` in front of the ones already queued.
    pub fn prepend(&mut self, older: Self) {
        let newer = core::mem::replace(self, older).take_ordered();
        for (action, lane) in newer {
            self.enqueue(action, lane);
        }
    }

    /// Empties the queue, returning its updates oldest first.
    fn take_ordered(&mut self) -> Vec<(Action<S>, Lanes)> {
        if self.pending == INVALID {
            return Vec::new();
        }
        let mut updates = core::mem::take(&mut self.updates);
        let last = core::mem::replace(&mut self.pending, INVALID);

        let mut ordered = Vec::with_capacity(updates.len());
        let mut idx = updates[last as usize].next;
        loop {
            let update = &mut updates[idx as usize];
            if let Some(action) = update.action.take() {
                ordered.push((action, update.lane));
            }
            if idx == last {
                break;
            }
            idx = update.next;
        }
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_drain_returns_base() {
        let mut q = UpdateQueue::<i32>::new();
        assert_eq!(q.drain(7, Lanes::SYNC), 7, "base");
        assert!(q.is_empty(), "still empty");
    }

    #[test]
    fn updates_fold_in_enqueue_order() {
        let mut q = UpdateQueue::new();
        q.enqueue(Action::Reduce(Box::new(|n: &i32| n + 1)), Lanes::SYNC);
        q.enqueue(Action::Reduce(Box::new(|n: &i32| n * 10)), Lanes::SYNC);
        q.enqueue(Action::Reduce(Box::new(|n: &i32| n + 2)), Lanes::SYNC);
        assert_eq!(q.drain(1, Lanes::SYNC), 22, "(1 + 1) * 10 + 2");
        assert!(q.is_empty(), "consumed");
        assert_eq!(q.drain(5, Lanes::SYNC), 5, "second drain is a no-op");
    }

    #[test]
    fn replace_discards_previous_state() {
        let mut q = UpdateQueue::new();
        q.enqueue(Action::Reduce(Box::new(|n: &i32| n + 1)), Lanes::SYNC);
        q.enqueue(Action::Replace(100), Lanes::SYNC);
        q.enqueue(Action::Reduce(Box::new(|n: &i32| n + 1)), Lanes::SYNC);
        assert_eq!(q.drain(0, Lanes::SYNC), 101, "replace then increment");
    }

    #[test]
    fn other_lanes_are_kept_in_order() {
        let mut q = UpdateQueue::new();
        q.enqueue(Action::Reduce(Box::new(|n: &i32| n * 2)), Lanes::DEFAULT);
        q.enqueue(Action::Reduce(Box::new(|n: &i32| n + 1)), Lanes::SYNC);
        q.enqueue(Action::Reduce(Box::new(|n: &i32| n + 3)), Lanes::DEFAULT);

        assert_eq!(q.drain(1, Lanes::SYNC), 2, "only the sync update");
        assert_eq!(q.len(), 2, "two deferred updates left");
        assert_eq!(q.pending_lanes(), Lanes::DEFAULT, "deferred lane");
        assert_eq!(q.drain(2, Lanes::DEFAULT), 7, "2 * 2 + 3");
        assert!(q.is_empty(), "all consumed");
    }

    #[test]
    fn prepend_keeps_older_updates_first() {
        let mut q = UpdateQueue::new();
        q.enqueue(Action::Reduce(Box::new(|n: &i32| n + 1)), Lanes::SYNC);
        let mut detached = core::mem::take(&mut q);
        q.enqueue(Action::Replace(10), Lanes::SYNC);
        detached.enqueue(Action::Reduce(Box::new(|n: &i32| n * 3)), Lanes::DEFAULT);

        q.prepend(detached);
        assert_eq!(q.len(), 3, "nothing lost");
        assert_eq!(q.drain(0, Lanes::SYNC), 10, "1, then replaced by 10");
        assert_eq!(q.drain(2, Lanes::DEFAULT), 6, "deferred update kept");
    }
}
