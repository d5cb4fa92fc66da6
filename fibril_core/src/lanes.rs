// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Update priorities and per-root pending-work bookkeeping.
//!
//! A lane is a single bit; a set of lanes is their union. Lower bits are
//! higher priority. Only [`Lanes::SYNC`] is ever produced by
//! [`request_update_lane`]; [`Lanes::DEFAULT`] exists so the scheduling path
//! is exercised with more than one priority.
//!
//! [`LaneTracker`] records which lanes each root has pending and, per lane,
//! which roots are waiting for a flush. The waiting set is kept in an
//! [`understory_dirty::DirtyTracker`] with one channel per lane, so a flush
//! drains exactly the roots marked for its lane in a deterministic order.

use alloc::vec::Vec;

use bitflags::bitflags;
use understory_dirty::{Channel, CycleHandling, DirtyTracker};

bitflags! {
    /// A set of update priorities.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Lanes: u32 {
        /// Synchronous priority, flushed in the next microtask.
        const SYNC = 1 << 0;
        /// Deferred priority, flushed from a host callback.
        const DEFAULT = 1 << 1;
    }
}

/// The empty lane set.
pub const NO_LANES: Lanes = Lanes::empty();

impl Lanes {
    /// Returns the highest-priority (lowest) bit in the set, or the empty set.
    #[inline]
    #[must_use]
    pub const fn highest_priority(self) -> Self {
        Self::from_bits_retain(self.bits() & self.bits().wrapping_neg())
    }

    /// Returns `true` if the set contains exactly one lane.
    #[inline]
    #[must_use]
    pub const fn is_single(self) -> bool {
        self.bits().is_power_of_two()
    }

    /// The dirty channel that tracks roots waiting on this lane.
    ///
    /// Only meaningful for a single lane.
    #[inline]
    #[must_use]
    pub(crate) fn channel(self) -> Channel {
        debug_assert!(self.is_single(), "channel of a lane set");
        #[expect(
            clippy::cast_possible_truncation,
            reason = "lane bits fit in u32, so the bit position is below 32"
        )]
        Channel::new(self.bits().trailing_zeros() as u8)
    }
}

/// Returns the union of two lane sets.
#[inline]
#[must_use]
pub const fn merge_lanes(a: Lanes, b: Lanes) -> Lanes {
    a.union(b)
}

/// Returns the lane a newly requested update is tagged with.
///
/// Every update is synchronous for now.
#[inline]
#[must_use]
pub const fn request_update_lane() -> Lanes {
    Lanes::SYNC
}

/// Per-root pending lanes plus the per-lane set of roots awaiting a flush.
#[derive(Debug)]
pub struct LaneTracker {
    pending: Vec<Lanes>,
    scheduled: DirtyTracker<u32>,
}

impl Default for LaneTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LaneTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            scheduled: DirtyTracker::with_cycle_handling(CycleHandling::Error),
        }
    }

    /// Makes room for a root index.
    pub fn register_root(&mut self, root: u32) {
        let idx = root as usize;
        if self.pending.len() <= idx {
            self.pending.resize(idx + 1, NO_LANES);
        }
    }

    /// Lanes with outstanding updates on `root`.
    #[must_use]
    pub fn pending_lanes(&self, root: u32) -> Lanes {
        self.pending.get(root as usize).copied().unwrap_or(NO_LANES)
    }

    /// The lane the next render of `root` should process.
    #[must_use]
    pub fn next_lane(&self, root: u32) -> Lanes {
        self.pending_lanes(root).highest_priority()
    }

    /// Returns `true` if any root has pending lanes.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.iter().any(|lanes| !lanes.is_empty())
    }

    /// Records an update on `root` at `lane`.
    pub fn mark_root_updated(&mut self, root: u32, lane: Lanes) {
        self.register_root(root);
        self.pending[root as usize] |= lane;
    }

    /// Removes `lane` from the pending set of `root`.
    pub fn mark_root_finished(&mut self, root: u32, lane: Lanes) {
        if let Some(pending) = self.pending.get_mut(root as usize) {
            pending.remove(lane);
        }
    }

    /// Queues `root` for the next flush of `lane`.
    pub fn mark_scheduled(&mut self, root: u32, lane: Lanes) {
        self.scheduled.mark(root, lane.channel());
    }

    /// Takes every root queued for `lane`, in deterministic order.
    pub fn take_scheduled(&mut self, lane: Lanes) -> Vec<u32> {
        self.scheduled
            .drain(lane.channel())
            .deterministic()
            .run()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_priority_picks_lowest_bit() {
        let both = merge_lanes(Lanes::SYNC, Lanes::DEFAULT);
        assert_eq!(both.highest_priority(), Lanes::SYNC, "sync wins");
        assert_eq!(
            Lanes::DEFAULT.highest_priority(),
            Lanes::DEFAULT,
            "single lane"
        );
        assert_eq!(NO_LANES.highest_priority(), NO_LANES, "empty stays empty");
    }

    #[test]
    fn requested_lane_is_sync() {
        assert_eq!(request_update_lane(), Lanes::SYNC, "sync");
    }

    #[test]
    fn pending_lanes_grow_and_shrink() {
        let mut lanes = LaneTracker::new();
        lanes.register_root(0);
        assert_eq!(lanes.next_lane(0), NO_LANES, "fresh root");

        lanes.mark_root_updated(0, Lanes::DEFAULT);
        lanes.mark_root_updated(0, Lanes::SYNC);
        assert_eq!(lanes.next_lane(0), Lanes::SYNC, "sync first");

        lanes.mark_root_finished(0, Lanes::SYNC);
        assert_eq!(lanes.next_lane(0), Lanes::DEFAULT, "then default");
        assert!(lanes.has_pending(), "default still pending");

        lanes.mark_root_finished(0, Lanes::DEFAULT);
        assert!(!lanes.has_pending(), "drained");
    }

    #[test]
    fn scheduled_roots_drain_once_per_lane() {
        let mut lanes = LaneTracker::new();
        lanes.mark_scheduled(2, Lanes::SYNC);
        lanes.mark_scheduled(0, Lanes::SYNC);
        lanes.mark_scheduled(2, Lanes::SYNC);
        lanes.mark_scheduled(1, Lanes::DEFAULT);

        let mut sync = lanes.take_scheduled(Lanes::SYNC);
        sync.sort_unstable();
        assert_eq!(sync, [0, 2], "deduplicated sync roots");
        assert!(lanes.take_scheduled(Lanes::SYNC).is_empty(), "drained");
        assert_eq!(lanes.take_scheduled(Lanes::DEFAULT), [1], "default root");
    }
}
