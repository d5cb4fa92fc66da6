// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Root scheduling: configuration, the task queue, and update bookkeeping.
//!
//! Updates never render inline. [`Dispatch`](crate::hooks::Dispatch) and
//! [`Reconciler::render`](crate::reconciler::Reconciler::render) record the
//! update on its root and queue a task:
//!
//! - Synchronous work is queued once as a microtask. Every update that lands
//!   before the microtask runs is folded into the same render.
//! - Deferred work and passive-effect flushes are queued as callbacks,
//!   ordered by lane.
//!
//! The host drains the queue through
//! [`Reconciler::run_until_idle`](crate::reconciler::Reconciler::run_until_idle)
//! (or the finer-grained `run_*` methods) and may install a
//! [`HostScheduler`] to be woken when something is queued.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt;

use crate::backend::HostScheduler;
use crate::fiber::RootId;
use crate::lanes::{LaneTracker, Lanes};

/// When passive effects run relative to the commit that produced them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PassiveEffectMode {
    /// Queue a callback task; effects run when the host drains callbacks, or
    /// earlier if the same root renders again first.
    Deferred,
    /// Run effects right after the commit, before the flush returns.
    AfterCommit,
}

/// Configuration for the [`Reconciler`](crate::reconciler::Reconciler).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// When passive effects run.
    pub passive_effects: PassiveEffectMode,
    /// Maximum number of renders one synchronous flush may perform before it
    /// gives up with [`NestedUpdateLimit`](crate::RenderError::NestedUpdateLimit).
    pub nested_update_limit: u32,
}

impl ReconcilerConfig {
    /// Deferred passive effects; the shape of a browser-style event loop.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            passive_effects: PassiveEffectMode::Deferred,
            nested_update_limit: 50,
        }
    }

    /// Effects run inside the flush that committed them; convenient for
    /// tests and headless hosts.
    #[must_use]
    pub const fn synchronous() -> Self {
        Self {
            passive_effects: PassiveEffectMode::AfterCommit,
            nested_update_limit: 50,
        }
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A unit of queued work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Task {
    /// Render and commit every root scheduled at this lane.
    PerformWork(Lanes),
    /// Run the pending passive effects of a root.
    FlushPassiveEffects(RootId),
}

/// Microtasks plus lane-ordered callbacks, each deduplicated.
#[derive(Debug, Default)]
pub struct TaskQueue {
    microtasks: VecDeque<Task>,
    callbacks: Vec<(Lanes, Task)>,
}

impl TaskQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no task is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.microtasks.is_empty() && self.callbacks.is_empty()
    }

    /// Queues a microtask. Returns `false` if an identical one is queued.
    pub fn push_microtask(&mut self, task: Task) -> bool {
        if self.microtasks.contains(&task) {
            return false;
        }
        self.microtasks.push_back(task);
        true
    }

    /// Queues a callback at `lane`. Returns `false` if an identical one is
    /// queued.
    pub fn push_callback(&mut self, lane: Lanes, task: Task) -> bool {
        if self.callbacks.iter().any(|(_, t)| *t == task) {
            return false;
        }
        self.callbacks.push((lane, task));
        true
    }

    /// Takes the oldest microtask.
    pub fn pop_microtask(&mut self) -> Option<Task> {
        self.microtasks.pop_front()
    }

    /// Takes the oldest callback of the highest-priority lane.
    pub fn pop_callback(&mut self) -> Option<Task> {
        let (idx, _) = self
            .callbacks
            .iter()
            .enumerate()
            .min_by_key(|(idx, (lane, _))| (lane.bits(), *idx))?;
        Some(self.callbacks.remove(idx).1)
    }
}

/// State shared between the reconciler and every dispatch handle.
pub(crate) struct Schedule {
    pub(crate) lanes: LaneTracker,
    pub(crate) tasks: TaskQueue,
    host: Box<dyn HostScheduler>,
}

impl fmt::Debug for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schedule")
            .field("lanes", &self.lanes)
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}

impl Schedule {
    pub(crate) fn new(host: Box<dyn HostScheduler>) -> Self {
        Self {
            lanes: LaneTracker::new(),
            tasks: TaskQueue::new(),
            host,
        }
    }

    /// Records an update on `root` and makes sure a flush is queued.
    pub(crate) fn schedule_update(&mut self, root: RootId, lane: Lanes) {
        self.lanes.mark_root_updated(root.0, lane);
        self.ensure_root_is_scheduled(root);
    }

    /// Queues the flush for the highest-priority pending lane of `root`.
    pub(crate) fn ensure_root_is_scheduled(&mut self, root: RootId) {
        let lane = self.lanes.next_lane(root.0);
        if lane.is_empty() {
            return;
        }
        self.lanes.mark_scheduled(root.0, lane);
        let task = Task::PerformWork(lane);
        if lane == Lanes::SYNC {
            if self.tasks.push_microtask(task) {
                self.host.schedule_microtask();
            }
        } else if self.tasks.push_callback(lane, task) {
            self.host.schedule_callback(lane);
        }
    }

    /// Queues a passive-effect flush for `root`.
    pub(crate) fn schedule_passive_flush(&mut self, root: RootId) {
        if self
            .tasks
            .push_callback(Lanes::DEFAULT, Task::FlushPassiveEffects(root))
        {
            self.host.schedule_callback(Lanes::DEFAULT);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn microtasks_are_deduplicated() {
        let mut q = TaskQueue::new();
        assert!(q.push_microtask(Task::PerformWork(Lanes::SYNC)));
        assert!(!q.push_microtask(Task::PerformWork(Lanes::SYNC)));
        assert_eq!(q.pop_microtask(), Some(Task::PerformWork(Lanes::SYNC)));
        assert!(q.is_empty());
    }

    #[test]
    fn callbacks_pop_by_lane_then_age() {
        let mut q = TaskQueue::new();
        q.push_callback(Lanes::DEFAULT, Task::FlushPassiveEffects(RootId(0)));
        q.push_callback(Lanes::DEFAULT, Task::PerformWork(Lanes::DEFAULT));
        q.push_callback(Lanes::SYNC, Task::FlushPassiveEffects(RootId(1)));
        assert_eq!(q.pop_callback(), Some(Task::FlushPassiveEffects(RootId(1))));
        assert_eq!(q.pop_callback(), Some(Task::FlushPassiveEffects(RootId(0))));
        assert_eq!(q.pop_callback(), Some(Task::PerformWork(Lanes::DEFAULT)));
        assert_eq!(q.pop_callback(), None);
    }

    #[derive(Default)]
    struct CountingHost {
        microtasks: alloc::rc::Rc<core::cell::Cell<u32>>,
    }

    impl HostScheduler for CountingHost {
        fn schedule_microtask(&mut self) {
            self.microtasks.set(self.microtasks.get() + 1);
        }
    }

    #[test]
    fn repeated_updates_wake_the_host_once() {
        let host = CountingHost::default();
        let count = host.microtasks.clone();
        let mut schedule = Schedule::new(Box::new(host));
        schedule.lanes.register_root(0);
        for _ in 0..3 {
            schedule.schedule_update(RootId(0), Lanes::SYNC);
        }
        assert_eq!(count.get(), 1);
        assert_eq!(schedule.lanes.take_scheduled(Lanes::SYNC), [0]);
        assert_eq!(
            schedule.tasks.pop_microtask(),
            Some(Task::PerformWork(Lanes::SYNC))
        );
    }

    #[test]
    fn presets() {
        assert_eq!(
            ReconcilerConfig::new().passive_effects,
            PassiveEffectMode::Deferred
        );
        assert_eq!(
            ReconcilerConfig::synchronous().passive_effects,
            PassiveEffectMode::AfterCommit
        );
        assert_eq!(ReconcilerConfig::default(), ReconcilerConfig::new());
    }
}
