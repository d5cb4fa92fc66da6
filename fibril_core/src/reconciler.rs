// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The top-level driver: roots, render passes, and commits.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::backend::{HostAdapter, HostScheduler, NoopScheduler};
use crate::commit::{CommitContext, PendingPassiveEffects};
use crate::element::Child;
use crate::error::RenderError;
use crate::fiber::{FiberId, FiberInput, FiberKind, FiberState, FiberStore, INVALID, RootId};
use crate::lanes::{Lanes, NO_LANES, request_update_lane};
use crate::scheduler::{PassiveEffectMode, ReconcilerConfig, Schedule, Task};
use crate::trace::{
    AbortReason, CommitSummary, PhaseBeginEvent, PhaseEndEvent, PhaseKind, RenderAbortedEvent,
    Tracer,
};
use crate::update_queue::{Action, UpdateQueue};
use crate::work_loop::RenderContext;

/// Per-root bookkeeping.
struct Root<H> {
    container: H,
    /// Root fiber of the committed tree.
    current: u32,
    /// Root fiber of a finished but not yet committed tree.
    finished_work: u32,
    finished_lane: Lanes,
    update_queue: UpdateQueue<Child>,
    passive: PendingPassiveEffects,
}

/// Renders descriptions into an output medium through a [`HostAdapter`].
///
/// # Lifecycle
///
/// ```text
///   render(root, child) / Dispatch::set
///       │ enqueue update, mark lane pending, queue task
///       ▼
///   run_until_idle()
///       │ microtask: PerformWork(SYNC)
///       ▼
///   render pass ──► commit ──► passive effects (now or as a callback)
/// ```
///
/// A render pass never touches attached output. If it fails the committed
/// tree stays exactly as it was.
pub struct Reconciler<A: HostAdapter> {
    adapter: A,
    fibers: FiberStore<A::Handle>,
    roots: Vec<Root<A::Handle>>,
    schedule: Rc<RefCell<Schedule>>,
    weak_schedule: Weak<RefCell<Schedule>>,
    config: ReconcilerConfig,
    pass_index: u64,
}

impl<A: HostAdapter> fmt::Debug for Reconciler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("fibers", &self.fibers)
            .field("roots", &self.roots.len())
            .field("config", &self.config)
            .field("pass_index", &self.pass_index)
            .finish_non_exhaustive()
    }
}

impl<A: HostAdapter> Reconciler<A> {
    /// Creates a reconciler that is drained by polling.
    pub fn new(adapter: A, config: ReconcilerConfig) -> Self {
        Self::with_host_scheduler(adapter, config, NoopScheduler)
    }

    /// Creates a reconciler that wakes `host` whenever work is queued.
    pub fn with_host_scheduler(
        adapter: A,
        config: ReconcilerConfig,
        host: impl HostScheduler + 'static,
    ) -> Self {
        let schedule = Rc::new(RefCell::new(Schedule::new(Box::new(host))));
        let weak_schedule = Rc::downgrade(&schedule);
        Self {
            adapter,
            fibers: FiberStore::new(),
            roots: Vec::new(),
            schedule,
            weak_schedule,
            config,
            pass_index: 0,
        }
    }

    // -- Accessors --

    /// The output adapter.
    #[must_use]
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// The output adapter, mutably.
    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    /// The fiber store, for inspection.
    #[must_use]
    pub fn fibers(&self) -> &FiberStore<A::Handle> {
        &self.fibers
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> ReconcilerConfig {
        self.config
    }

    /// Number of render passes started so far, including aborted ones.
    #[must_use]
    pub fn pass_count(&self) -> u64 {
        self.pass_index
    }

    /// The output container of `root`.
    #[must_use]
    pub fn container(&self, root: RootId) -> Option<&A::Handle> {
        self.roots.get(root.0 as usize).map(|r| &r.container)
    }

    /// The root fiber of the committed tree.
    #[must_use]
    pub fn current_fiber(&self, root: RootId) -> Option<FiberId> {
        self.roots
            .get(root.0 as usize)
            .map(|r| self.fibers.id_at(r.current))
    }

    /// Lanes with updates that have not been rendered yet.
    #[must_use]
    pub fn pending_lanes(&self, root: RootId) -> Lanes {
        self.schedule.borrow().lanes.pending_lanes(root.0)
    }

    /// Returns `true` if a task is queued or any root has pending lanes.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        let schedule = self.schedule.borrow();
        !schedule.tasks.is_empty() || schedule.lanes.has_pending()
    }

    /// Returns `true` if `root` has committed effects that have not run.
    #[must_use]
    pub fn has_pending_passive_effects(&self, root: RootId) -> bool {
        self.roots
            .get(root.0 as usize)
            .is_some_and(|r| !r.passive.is_empty())
    }

    // -- Roots and updates --

    /// Creates a root rendering into `container`.
    pub fn create_root(&mut self, container: A::Handle) -> RootId {
        let fiber = self
            .fibers
            .allocate(FiberKind::HostRoot, None, None, FiberInput::Root);
        self.fibers.state_node[fiber as usize] = Some(container.clone());
        self.fibers.memoized_state[fiber as usize] = FiberState::Root(Child::Empty);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "root counts stay far below u32::MAX"
        )]
        let id = RootId(self.roots.len() as u32);
        self.roots.push(Root {
            container,
            current: fiber,
            finished_work: INVALID,
            finished_lane: NO_LANES,
            update_queue: UpdateQueue::new(),
            passive: PendingPassiveEffects::default(),
        });
        self.schedule.borrow_mut().lanes.register_root(id.0);
        id
    }

    /// Schedules `child` to become the content of `root`.
    pub fn render(&mut self, root: RootId, child: impl Into<Child>) -> Result<(), RenderError> {
        self.update_container(root, child.into(), request_update_lane())
    }

    /// Schedules `child` to become the content of `root` at `lane`.
    pub fn update_container(
        &mut self,
        root: RootId,
        child: Child,
        lane: Lanes,
    ) -> Result<(), RenderError> {
        let entry = self
            .roots
            .get_mut(root.0 as usize)
            .ok_or(RenderError::UnknownRoot(root))?;
        entry.update_queue.enqueue(Action::Replace(child), lane);
        self.schedule.borrow_mut().schedule_update(root, lane);
        Ok(())
    }

    /// Schedules removal of everything rendered into `root`.
    pub fn unmount(&mut self, root: RootId) -> Result<(), RenderError> {
        self.render(root, Child::Empty)
    }

    // -- Driving --

    /// Renders and commits every root with pending synchronous work.
    pub fn flush_sync_work(&mut self) -> Result<(), RenderError> {
        self.flush_sync_work_traced(&mut Tracer::none())
    }

    /// [`flush_sync_work`](Self::flush_sync_work) with tracing.
    pub fn flush_sync_work_traced(&mut self, tracer: &mut Tracer<'_>) -> Result<(), RenderError> {
        self.perform_scheduled_work(Lanes::SYNC, tracer)
    }

    /// Runs the pending passive effects of `root`, then flushes any
    /// synchronous work they scheduled.
    pub fn flush_passive_effects(&mut self, root: RootId) -> Result<(), RenderError> {
        let mut tracer = Tracer::none();
        self.flush_root_passive_effects(root, &mut tracer);
        self.flush_sync_work_traced(&mut tracer)
    }

    /// Runs every queued microtask, including ones queued along the way.
    pub fn run_microtasks(&mut self) -> Result<(), RenderError> {
        self.run_microtasks_traced(&mut Tracer::none())
    }

    /// [`run_microtasks`](Self::run_microtasks) with tracing.
    pub fn run_microtasks_traced(&mut self, tracer: &mut Tracer<'_>) -> Result<(), RenderError> {
        loop {
            let task = self.schedule.borrow_mut().tasks.pop_microtask();
            let Some(task) = task else {
                return Ok(());
            };
            self.run_task(task, tracer)?;
        }
    }

    /// Runs the next microtask, or failing that the next callback.
    ///
    /// Returns `false` if nothing was queued.
    pub fn run_next_task(&mut self) -> Result<bool, RenderError> {
        self.run_next_task_traced(&mut Tracer::none())
    }

    /// [`run_next_task`](Self::run_next_task) with tracing.
    pub fn run_next_task_traced(&mut self, tracer: &mut Tracer<'_>) -> Result<bool, RenderError> {
        let task = {
            let mut schedule = self.schedule.borrow_mut();
            schedule
                .tasks
                .pop_microtask()
                .or_else(|| schedule.tasks.pop_callback())
        };
        let Some(task) = task else {
            return Ok(false);
        };
        self.run_task(task, tracer)?;
        Ok(true)
    }

    /// Runs queued tasks until none are left.
    pub fn run_until_idle(&mut self) -> Result<(), RenderError> {
        self.run_until_idle_traced(&mut Tracer::none())
    }

    /// [`run_until_idle`](Self::run_until_idle) with tracing.
    pub fn run_until_idle_traced(&mut self, tracer: &mut Tracer<'_>) -> Result<(), RenderError> {
        while self.run_next_task_traced(tracer)? {}
        Ok(())
    }

    /// Runs one task.
    pub fn run_task(&mut self, task: Task, tracer: &mut Tracer<'_>) -> Result<(), RenderError> {
        match task {
            Task::PerformWork(lane) => self.perform_scheduled_work(lane, tracer),
            Task::FlushPassiveEffects(root) => {
                self.flush_root_passive_effects(root, tracer);
                self.perform_scheduled_work(Lanes::SYNC, tracer)
            }
        }
    }

    // -- Internals --

    /// Renders every root scheduled at `lane`, repeating while renders and
    /// their effects schedule more.
    fn perform_scheduled_work(
        &mut self,
        lane: Lanes,
        tracer: &mut Tracer<'_>,
    ) -> Result<(), RenderError> {
        let limit = self.config.nested_update_limit;
        let mut renders = 0_u32;
        loop {
            let scheduled = self.schedule.borrow_mut().lanes.take_scheduled(lane);
            if scheduled.is_empty() {
                return Ok(());
            }
            for (i, &root) in scheduled.iter().enumerate() {
                if renders >= limit {
                    let mut schedule = self.schedule.borrow_mut();
                    for &abandoned in &scheduled[i..] {
                        schedule.lanes.mark_root_finished(abandoned, lane);
                    }
                    return Err(RenderError::NestedUpdateLimit { limit });
                }
                match self.perform_work_on_root(RootId(root), lane, tracer) {
                    Ok(rendered) => renders += u32::from(rendered),
                    Err(e) => {
                        let mut schedule = self.schedule.borrow_mut();
                        for &rest in &scheduled[i + 1..] {
                            schedule.ensure_root_is_scheduled(RootId(rest));
                        }
                        return Err(e);
                    }
                }
            }
        }
    }

    /// Renders and commits `root` at `lane` if that is its most urgent
    /// pending lane. Returns whether a render ran.
    fn perform_work_on_root(
        &mut self,
        root: RootId,
        lane: Lanes,
        tracer: &mut Tracer<'_>,
    ) -> Result<bool, RenderError> {
        if root.0 as usize >= self.roots.len() {
            return Err(RenderError::UnknownRoot(root));
        }
        let next = self.schedule.borrow().lanes.next_lane(root.0);
        if next.is_empty() {
            return Ok(false);
        }
        if next != lane {
            self.schedule.borrow_mut().ensure_root_is_scheduled(root);
            return Ok(false);
        }

        // Effects of the previous commit see the tree they were created for.
        self.flush_root_passive_effects(root, tracer);

        // Updates arriving from here on mark the lane again and get their
        // own render.
        self.schedule
            .borrow_mut()
            .lanes
            .mark_root_finished(root.0, lane);

        self.render_root(root, lane, tracer)?;
        self.commit_root(root, tracer);
        Ok(true)
    }

    fn render_root(
        &mut self,
        root: RootId,
        lane: Lanes,
        tracer: &mut Tracer<'_>,
    ) -> Result<(), RenderError> {
        self.pass_index += 1;
        let pass_index = self.pass_index;
        tracer.phase_begin(&PhaseBeginEvent {
            pass_index,
            root,
            phase: PhaseKind::Render,
            lane,
        });

        let entry = &mut self.roots[root.0 as usize];
        self.fibers.begin_tracking();
        let result = RenderContext::new(
            &mut self.adapter,
            &mut self.fibers,
            &mut entry.update_queue,
            &self.weak_schedule,
            tracer,
            root,
            lane,
            pass_index,
        )
        .render(entry.current);

        let outcome = match result {
            Ok(finished) => {
                self.fibers.end_tracking();
                entry.finished_work = finished;
                entry.finished_lane = lane;
                Ok(())
            }
            Err(e) => {
                self.fibers.release_tracked();
                tracer.render_aborted(&RenderAbortedEvent {
                    pass_index,
                    root,
                    lane,
                    reason: AbortReason::from(&e),
                });
                Err(e)
            }
        };
        tracer.phase_end(&PhaseEndEvent {
            pass_index,
            root,
            phase: PhaseKind::Render,
            lane,
        });
        outcome
    }

    fn commit_root(&mut self, root: RootId, tracer: &mut Tracer<'_>) {
        let entry = &mut self.roots[root.0 as usize];
        let finished = core::mem::replace(&mut entry.finished_work, INVALID);
        let lane = core::mem::replace(&mut entry.finished_lane, NO_LANES);
        if finished == INVALID {
            return;
        }
        let pass_index = self.pass_index;
        tracer.phase_begin(&PhaseBeginEvent {
            pass_index,
            root,
            phase: PhaseKind::Commit,
            lane,
        });

        let summary = CommitContext::new(
            &mut self.adapter,
            &mut self.fibers,
            &mut entry.passive,
            tracer,
            CommitSummary::new(pass_index, root, lane),
        )
        .commit(finished);
        entry.current = finished;
        let has_passive = !entry.passive.is_empty();

        tracer.commit_summary(&summary);
        tracer.phase_end(&PhaseEndEvent {
            pass_index,
            root,
            phase: PhaseKind::Commit,
            lane,
        });

        {
            let mut schedule = self.schedule.borrow_mut();
            if has_passive && self.config.passive_effects == PassiveEffectMode::Deferred {
                schedule.schedule_passive_flush(root);
            }
            schedule.ensure_root_is_scheduled(root);
        }
        if has_passive && self.config.passive_effects == PassiveEffectMode::AfterCommit {
            self.flush_root_passive_effects(root, tracer);
        }
    }

    /// Runs the effects collected by earlier commits of `root`. Returns
    /// whether there were any.
    fn flush_root_passive_effects(&mut self, root: RootId, tracer: &mut Tracer<'_>) -> bool {
        let Some(entry) = self.roots.get_mut(root.0 as usize) else {
            return false;
        };
        let pending = core::mem::take(&mut entry.passive);
        if pending.is_empty() {
            return false;
        }
        let pass_index = self.pass_index;
        tracer.phase_begin(&PhaseBeginEvent {
            pass_index,
            root,
            phase: PhaseKind::PassiveEffects,
            lane: NO_LANES,
        });
        pending.run();
        tracer.phase_end(&PhaseEndEvent {
            pass_index,
            root,
            phase: PhaseKind::PassiveEffects,
            lane: NO_LANES,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::format;
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::{Cell, OnceCell};

    use super::*;
    use crate::element::{Component, Element, PropValue};
    use crate::flags::Flags;
    use crate::hooks::{Destroy, Dispatch};
    use crate::test_host::{Op, RecordingHost};

    type Log = Rc<RefCell<Vec<String>>>;

    fn setup(config: ReconcilerConfig) -> (Reconciler<RecordingHost>, RootId, u32) {
        let mut host = RecordingHost::default();
        let container = host.container();
        let mut r = Reconciler::new(host, config);
        let root = r.create_root(container);
        (r, root, container)
    }

    fn list(keys: &[&str]) -> Child {
        Element::host("ul")
            .children(
                keys.iter()
                    .map(|k| Element::host("li").key(*k).child(*k))
                    .collect::<Vec<_>>(),
            )
            .into()
    }

    fn mounted(child: Child) -> (Reconciler<RecordingHost>, RootId, u32) {
        let (mut r, root, c) = setup(ReconcilerConfig::new());
        r.render(root, child).unwrap();
        r.run_until_idle().unwrap();
        r.adapter_mut().take_ops();
        (r, root, c)
    }

    #[test]
    fn render_waits_for_the_flush() {
        let (mut r, root, c) = setup(ReconcilerConfig::new());
        r.render(root, list(&["a", "b"])).unwrap();
        assert!(r.adapter().ops.is_empty());
        assert!(r.has_pending_work());
        r.run_until_idle().unwrap();
        assert_eq!(r.adapter().markup(c), "<ul><li>a</li><li>b</li></ul>");
        assert!(!r.has_pending_work());
    }

    #[test]
    fn identical_render_is_a_no_op() {
        let (mut r, root, _) = mounted(list(&["a", "b"]));
        r.render(root, list(&["a", "b"])).unwrap();
        r.schedule
            .borrow_mut()
            .lanes
            .mark_root_finished(root.0, Lanes::SYNC);
        r.render_root(root, Lanes::SYNC, &mut Tracer::none())
            .unwrap();

        let finished = r.roots[root.0 as usize].finished_work;
        let fibers = &r.fibers;
        for fiber in fibers.descendants(fibers.id_at(finished)) {
            assert_eq!(fibers.flags(fiber), Flags::empty(), "{fiber:?}");
            assert_eq!(fibers.subtree_flags(fiber), Flags::empty(), "{fiber:?}");
        }

        r.commit_root(root, &mut Tracer::none());
        r.run_until_idle().unwrap();
        assert!(r.adapter().ops.is_empty());
    }

    #[test]
    fn moving_last_key_to_front_appends_two() {
        let (mut r, root, c) = mounted(list(&["a", "b", "c"]));
        r.render(root, list(&["c", "a", "b"])).unwrap();
        r.run_until_idle().unwrap();
        assert_eq!(r.adapter().markup(c), "<ul><li>c</li><li>a</li><li>b</li></ul>");
        let ops = r.adapter_mut().take_ops();
        assert_eq!(ops.len(), 2, "{ops:?}");
        assert!(ops.iter().all(|op| matches!(op, Op::Append(..))), "{ops:?}");
    }

    #[test]
    fn moving_first_key_to_back_appends_one() {
        let (mut r, root, c) = mounted(list(&["a", "b", "c"]));
        r.render(root, list(&["b", "c", "a"])).unwrap();
        r.run_until_idle().unwrap();
        assert_eq!(r.adapter().markup(c), "<ul><li>b</li><li>c</li><li>a</li></ul>");
        assert_eq!(r.adapter_mut().take_ops().len(), 1);
    }

    #[test]
    fn insertion_uses_the_next_stable_sibling() {
        let (mut r, root, c) = mounted(list(&["a", "c"]));
        r.render(root, list(&["a", "b", "c"])).unwrap();
        r.run_until_idle().unwrap();
        assert_eq!(r.adapter().markup(c), "<ul><li>a</li><li>b</li><li>c</li></ul>");
        let ops = r.adapter_mut().take_ops();
        assert!(ops.iter().any(|op| matches!(op, Op::Insert(..))), "{ops:?}");
        assert!(!ops.iter().any(|op| matches!(op, Op::Remove(..))), "{ops:?}");
    }

    #[test]
    fn type_change_at_same_key_replaces_output() {
        let (mut r, root, c) = mounted(Element::host("div").key("x").child("1").into());
        r.render(root, Element::host("span").key("x").child("1"))
            .unwrap();
        r.run_until_idle().unwrap();
        assert_eq!(r.adapter().markup(c), "<span>1</span>");
        let ops = r.adapter_mut().take_ops();
        assert!(
            ops.iter()
                .any(|op| matches!(op, Op::Create(_, tag) if tag == "span")),
            "{ops:?}"
        );
        assert!(
            ops.iter()
                .any(|op| matches!(op, Op::Remove(parent, _) if *parent == c)),
            "{ops:?}"
        );
    }

    #[test]
    fn text_change_updates_in_place() {
        let (mut r, root, c) = mounted(Element::host("p").child("old").into());
        r.render(root, Element::host("p").child("new")).unwrap();
        r.run_until_idle().unwrap();
        assert_eq!(r.adapter().markup(c), "<p>new</p>");
        let ops = r.adapter_mut().take_ops();
        assert!(matches!(ops.as_slice(), [Op::UpdateText(_, t)] if t == "new"), "{ops:?}");
    }

    #[test]
    fn attribute_change_commits_an_update() {
        let (mut r, root, _) = mounted(Element::host("p").attr("id", "a").into());
        r.render(root, Element::host("p").attr("id", "b")).unwrap();
        r.run_until_idle().unwrap();
        let ops = r.adapter_mut().take_ops();
        assert!(matches!(ops.as_slice(), [Op::Update(_)]), "{ops:?}");
    }

    #[test]
    fn removing_a_component_removes_each_host_root() {
        let pair = Component::new("Pair", |_, _| {
            Ok(vec![Child::from(Element::host("i")), Element::host("b").into()].into())
        });
        let (mut r, root, c) = mounted(
            Element::host("div")
                .child(Element::component(&pair))
                .child(Element::host("u"))
                .into(),
        );
        assert_eq!(r.adapter().markup(c), "<div><i></i><b></b><u></u></div>");

        r.render(
            root,
            Element::host("div").children(vec![Child::Empty, Element::host("u").into()]),
        )
        .unwrap();
        r.run_until_idle().unwrap();
        assert_eq!(r.adapter().markup(c), "<div><u></u></div>");
        let removes = r
            .adapter()
            .ops
            .iter()
            .filter(|op| matches!(op, Op::Remove(..)))
            .count();
        assert_eq!(removes, 2);
    }

    #[test]
    fn updates_before_a_flush_render_once() {
        let renders = Rc::new(Cell::new(0));
        let slot: Rc<RefCell<Option<Dispatch<i64>>>> = Rc::default();
        let app = {
            let renders = renders.clone();
            let slot = slot.clone();
            Component::new("App", move |_, hooks| {
                renders.set(renders.get() + 1);
                let (count, set_count) = hooks.use_state(|| 1210_i64)?;
                *slot.borrow_mut() = Some(set_count);
                Ok(Element::host("div").child(count).into())
            })
        };
        let (mut r, _, c) = mounted(Element::component(&app).into());
        assert_eq!(r.adapter().markup(c), "<div>1210</div>");

        let set = slot.borrow().clone().unwrap();
        for _ in 0..3 {
            set.update(|n| n + 1);
        }
        assert_eq!(renders.get(), 1);
        r.run_until_idle().unwrap();
        assert_eq!(renders.get(), 2);
        assert_eq!(r.adapter().markup(c), "<div>1213</div>");

        let passes = r.pass_count();
        r.run_until_idle().unwrap();
        assert_eq!(r.pass_count(), passes, "second drain renders nothing");
    }

    #[test]
    fn reducer_may_dispatch_to_its_own_hook() {
        let log = Log::default();
        let slot: Rc<RefCell<Option<Dispatch<i32>>>> = Rc::default();
        let app = {
            let log = log.clone();
            let slot = slot.clone();
            Component::new("App", move |_, hooks| {
                let (n, set) = hooks.use_state(|| 0)?;
                *slot.borrow_mut() = Some(set);
                log.borrow_mut().push(format!("render {n}"));
                Ok(Child::text(n))
            })
        };
        let (mut r, _, c) = mounted(Element::component(&app).into());

        let set = slot.borrow().clone().unwrap();
        let inner = set.clone();
        set.update(move |n| {
            inner.set(100);
            n + 1
        });
        r.run_until_idle().unwrap();
        assert_eq!(*log.borrow(), ["render 0", "render 1", "render 100"]);
        assert_eq!(r.adapter().markup(c), "100");
    }

    #[test]
    fn deep_component_chain_mounts_and_unmounts() {
        const DEPTH: i64 = 100_000;
        let chain: Rc<OnceCell<Component>> = Rc::default();
        let link = Rc::downgrade(&chain);
        let component = Component::new("Link", move |props, _| {
            let Some(&PropValue::Int(depth)) = props.get("depth") else {
                return Ok(Child::Empty);
            };
            if depth == 0 {
                return Ok(Element::host("b").into());
            }
            let next = link.upgrade().and_then(|c| c.get().cloned());
            Ok(next.map_or(Child::Empty, |next| {
                Element::component(&next).attr("depth", depth - 1).into()
            }))
        });
        assert!(chain.set(component.clone()).is_ok());

        let (mut r, root, c) = setup(ReconcilerConfig::new());
        r.render(root, Element::component(&component).attr("depth", DEPTH))
            .unwrap();
        r.run_until_idle().unwrap();
        assert_eq!(r.adapter().markup(c), "<b></b>");

        r.unmount(root).unwrap();
        r.run_until_idle().unwrap();
        assert_eq!(r.adapter().markup(c), "");
        assert_eq!(r.fibers().live_count(), 2);
    }

    fn logging_effect(log: &Log, dep: &Rc<Cell<i32>>) -> Component {
        let log = log.clone();
        let dep = dep.clone();
        Component::new("Fx", move |_, hooks| {
            let d = dep.get();
            let log = log.clone();
            hooks.use_effect(
                move || {
                    log.borrow_mut().push(format!("create {d}"));
                    Some(Box::new(move || log.borrow_mut().push(format!("destroy {d}"))) as Destroy)
                },
                Some(d),
            )?;
            Ok(Child::Empty)
        })
    }

    #[test]
    fn effects_follow_deps_and_clean_up_once() {
        let log = Log::default();
        let dep = Rc::new(Cell::new(0));
        let fx = logging_effect(&log, &dep);
        let (mut r, root, _) = setup(ReconcilerConfig::new());

        r.render(root, Element::component(&fx)).unwrap();
        r.run_microtasks().unwrap();
        assert!(log.borrow().is_empty(), "effects are deferred");
        assert!(r.has_pending_passive_effects(root));
        r.run_until_idle().unwrap();
        assert_eq!(*log.borrow(), ["create 0"]);

        r.render(root, Element::component(&fx)).unwrap();
        r.run_until_idle().unwrap();
        assert_eq!(*log.borrow(), ["create 0"], "same deps");

        dep.set(1);
        r.render(root, Element::component(&fx)).unwrap();
        r.run_until_idle().unwrap();
        assert_eq!(*log.borrow(), ["create 0", "destroy 0", "create 1"]);

        r.unmount(root).unwrap();
        r.run_until_idle().unwrap();
        r.run_until_idle().unwrap();
        assert_eq!(
            *log.borrow(),
            ["create 0", "destroy 0", "create 1", "destroy 1"]
        );
    }

    fn nested(fx: &Component, show: bool) -> Child {
        let section = show.then(|| Element::host("section").child(Element::component(fx)));
        Element::host("div").children(section).into()
    }

    #[test]
    fn deleting_a_parent_cleans_up_nested_effects() {
        let log = Log::default();
        let dep = Rc::new(Cell::new(0));
        let fx = logging_effect(&log, &dep);
        let (mut r, root, c) = mounted(nested(&fx, true));
        assert_eq!(*log.borrow(), ["create 0"]);

        r.render(root, nested(&fx, false)).unwrap();
        r.run_until_idle().unwrap();
        assert_eq!(r.adapter().markup(c), "<div></div>");
        assert_eq!(*log.borrow(), ["create 0", "destroy 0"]);
        assert!(!r.has_pending_passive_effects(root));
    }

    #[test]
    fn deletion_after_a_pending_rerun_destroys_once() {
        let log = Log::default();
        let dep = Rc::new(Cell::new(0));
        let fx = logging_effect(&log, &dep);
        let (mut r, root, c) = mounted(nested(&fx, true));

        dep.set(1);
        r.render(root, nested(&fx, true)).unwrap();
        r.run_microtasks().unwrap();
        assert!(r.has_pending_passive_effects(root), "re-run not flushed yet");

        r.render(root, nested(&fx, false)).unwrap();
        r.run_until_idle().unwrap();
        assert_eq!(r.adapter().markup(c), "<div></div>");
        assert_eq!(
            *log.borrow(),
            ["create 0", "destroy 0", "create 1", "destroy 1"]
        );
    }

    #[test]
    fn pending_effects_run_before_the_next_render() {
        let log = Log::default();
        let slot: Rc<RefCell<Option<Dispatch<i32>>>> = Rc::default();
        let app = {
            let log = log.clone();
            let slot = slot.clone();
            Component::new("App", move |_, hooks| {
                let (n, set) = hooks.use_state(|| 0)?;
                *slot.borrow_mut() = Some(set);
                log.borrow_mut().push(format!("render {n}"));
                let log = log.clone();
                hooks.use_effect(
                    move || {
                        log.borrow_mut().push(format!("effect {n}"));
                        None
                    },
                    Some(n),
                )?;
                Ok(Child::text(n))
            })
        };
        let (mut r, root, _) = setup(ReconcilerConfig::new());
        r.render(root, Element::component(&app)).unwrap();
        r.run_microtasks().unwrap();

        slot.borrow().clone().unwrap().set(1);
        r.run_microtasks().unwrap();
        assert_eq!(*log.borrow(), ["render 0", "effect 0", "render 1"]);
        r.run_until_idle().unwrap();
        assert_eq!(
            *log.borrow(),
            ["render 0", "effect 0", "render 1", "effect 1"]
        );
    }

    #[test]
    fn hook_count_change_aborts_without_commit() {
        let extra = Rc::new(Cell::new(true));
        let app = {
            let extra = extra.clone();
            Component::new("App", move |_, hooks| {
                if extra.get() {
                    hooks.use_state(|| 0)?;
                }
                hooks.use_state(|| 1)?;
                Ok(Element::host("p").child("x").into())
            })
        };
        let (mut r, root, c) = mounted(Element::component(&app).into());
        let before = r.current_fiber(root);
        let live = r.fibers().live_count();

        extra.set(false);
        r.render(root, Element::component(&app)).unwrap();
        assert_eq!(
            r.run_until_idle(),
            Err(RenderError::HookCountMismatch {
                expected: 2,
                found: 1
            })
        );
        assert!(r.adapter().ops.is_empty());
        assert_eq!(r.adapter().markup(c), "<p>x</p>");
        assert_eq!(r.current_fiber(root), before);
        assert_eq!(r.fibers().live_count(), live);
    }

    #[test]
    fn hook_kind_change_aborts() {
        let effect_first = Rc::new(Cell::new(false));
        let app = {
            let effect_first = effect_first.clone();
            Component::new("App", move |_, hooks| {
                if effect_first.get() {
                    hooks.use_effect(|| None, Some(()))?;
                    hooks.use_state(|| 0)?;
                } else {
                    hooks.use_state(|| 0)?;
                    hooks.use_effect(|| None, Some(()))?;
                }
                Ok(Child::Empty)
            })
        };
        let (mut r, root, _) = mounted(Element::component(&app).into());
        effect_first.set(true);
        r.render(root, Element::component(&app)).unwrap();
        assert_eq!(
            r.run_until_idle(),
            Err(RenderError::HookKindMismatch { index: 0 })
        );
    }

    #[test]
    fn self_feeding_effect_hits_the_limit() {
        let app = Component::new("Loop", |_, hooks| {
            let (n, set) = hooks.use_state(|| 0_u32)?;
            hooks.use_effect(
                move || {
                    set.set(n + 1);
                    None
                },
                None::<()>,
            )?;
            Ok(Child::text(n))
        });
        let config = ReconcilerConfig {
            nested_update_limit: 5,
            ..ReconcilerConfig::synchronous()
        };
        let (mut r, root, _) = setup(config);
        r.render(root, Element::component(&app)).unwrap();
        assert_eq!(
            r.run_until_idle(),
            Err(RenderError::NestedUpdateLimit { limit: 5 })
        );
        assert_eq!(r.pass_count(), 5);
    }

    #[test]
    fn deferred_lane_waits_for_callbacks() {
        let (mut r, root, c) = setup(ReconcilerConfig::new());
        r.update_container(root, "later".into(), Lanes::DEFAULT)
            .unwrap();
        r.run_microtasks().unwrap();
        assert_eq!(r.pass_count(), 0);
        assert_eq!(r.pending_lanes(root), Lanes::DEFAULT);

        r.render(root, "now").unwrap();
        r.run_microtasks().unwrap();
        assert_eq!(r.adapter().markup(c), "now");

        r.run_until_idle().unwrap();
        assert_eq!(r.adapter().markup(c), "later");
        assert_eq!(r.pending_lanes(root), NO_LANES);
    }

    #[test]
    fn unknown_root_is_rejected() {
        let (mut r, _, _) = setup(ReconcilerConfig::new());
        assert_eq!(
            r.render(RootId(7), "x"),
            Err(RenderError::UnknownRoot(RootId(7)))
        );
    }

    #[test]
    fn unmount_releases_fibers() {
        let (mut r, root, c) = mounted(list(&["a", "b"]));
        r.unmount(root).unwrap();
        r.run_until_idle().unwrap();
        assert_eq!(r.adapter().markup(c), "");
        assert_eq!(r.fibers().live_count(), 2, "only the two root fibers");
    }
}
