// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-component state and effect slots.
//!
//! A component receives a [`Hooks`] context for the duration of one render.
//! Each `use_*` call claims the next slot in call order. On the first render
//! the slots are created; on later renders slot `i` is matched against slot
//! `i` of the previous render, so components must call the same hooks in the
//! same order every time. A mismatch aborts the render with a
//! [`RenderError`].

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::any::Any;
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::element::{Child, ElementType, Props};
use crate::error::RenderError;
use crate::fiber::{FiberState, FiberStore, INVALID, RootId};
use crate::flags::{Flags, HookFlags};
use crate::lanes::{Lanes, request_update_lane};
use crate::scheduler::Schedule;
use crate::update_queue::{Action, UpdateQueue};

/// Cleanup returned by an effect, run before the effect re-runs or when its
/// component unmounts.
pub type Destroy = Box<dyn FnOnce()>;

type Create = Box<dyn FnOnce() -> Option<Destroy>>;

/// A passive effect record.
///
/// The cleanup slot is shared by every render's record for the same hook
/// position, so a later render can run the cleanup an earlier one produced.
pub(crate) struct Effect {
    tag: Cell<HookFlags>,
    create: RefCell<Option<Create>>,
    destroy: Rc<RefCell<Option<Destroy>>>,
    deps: Option<Rc<dyn Any>>,
}

impl Effect {
    pub(crate) fn has(&self, flags: HookFlags) -> bool {
        self.tag.get().contains(flags)
    }

    pub(crate) fn clear(&self, flags: HookFlags) {
        self.tag.set(self.tag.get().difference(flags));
    }

    pub(crate) fn run_destroy(&self) {
        let destroy = self.destroy.borrow_mut().take();
        if let Some(destroy) = destroy {
            destroy();
        }
    }

    pub(crate) fn run_create(&self) {
        let create = self.create.borrow_mut().take();
        if let Some(create) = create {
            let destroy = create();
            *self.destroy.borrow_mut() = destroy;
        }
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("tag", &self.tag.get())
            .field("has_deps", &self.deps.is_some())
            .finish_non_exhaustive()
    }
}

/// One hook slot.
#[derive(Clone)]
pub(crate) enum Hook {
    State {
        value: Rc<dyn Any>,
        queue: Rc<dyn Any>,
    },
    Effect(Rc<Effect>),
}

/// Enqueues updates to one state hook.
///
/// Dispatching never renders directly: it records the update, marks the root
/// as having pending work, and schedules a flush. Several dispatches before
/// the flush are folded into one render.
pub struct Dispatch<S> {
    queue: Rc<RefCell<UpdateQueue<S>>>,
    schedule: Weak<RefCell<Schedule>>,
    root: RootId,
}

impl<S> Clone for Dispatch<S> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            schedule: self.schedule.clone(),
            root: self.root,
        }
    }
}

impl<S> PartialEq for Dispatch<S> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.queue, &other.queue)
    }
}

impl<S> fmt::Debug for Dispatch<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("root", &self.root)
            .field("pending", &self.queue.borrow().len())
            .finish()
    }
}

impl<S: 'static> Dispatch<S> {
    /// Replaces the state.
    pub fn set(&self, value: S) {
        self.dispatch(Action::Replace(value));
    }

    /// Computes the next state from the previous one.
    ///
    /// `f` runs during the next render, not now. Updates it dispatches land
    /// in the render after that one.
    pub fn update(&self, f: impl FnOnce(&S) -> S + 'static) {
        self.dispatch(Action::Reduce(Box::new(f)));
    }

    /// Enqueues an action.
    pub fn dispatch(&self, action: Action<S>) {
        let lane = request_update_lane();
        self.queue.borrow_mut().enqueue(action, lane);
        if let Some(schedule) = self.schedule.upgrade() {
            schedule.borrow_mut().schedule_update(self.root, lane);
        }
    }
}

/// What a finished component render leaves on its fiber.
pub(crate) struct RenderedHooks {
    pub(crate) hooks: Vec<Hook>,
    pub(crate) effects: Vec<Rc<Effect>>,
    pub(crate) flags: Flags,
}

/// The hook context of one component render.
pub struct Hooks<'r> {
    fiber: u32,
    mount: bool,
    previous: &'r [Hook],
    cursor: usize,
    hooks: Vec<Hook>,
    effects: Vec<Rc<Effect>>,
    flags: Flags,
    lane: Lanes,
    root: RootId,
    schedule: &'r Weak<RefCell<Schedule>>,
}

impl fmt::Debug for Hooks<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("fiber", &self.fiber)
            .field("mount", &self.mount)
            .field("cursor", &self.cursor)
            .field("lane", &self.lane)
            .finish_non_exhaustive()
    }
}

impl<'r> Hooks<'r> {
    fn new(
        fiber: u32,
        previous: Option<&'r [Hook]>,
        lane: Lanes,
        root: RootId,
        schedule: &'r Weak<RefCell<Schedule>>,
    ) -> Self {
        Self {
            fiber,
            mount: previous.is_none(),
            previous: previous.unwrap_or(&[]),
            cursor: 0,
            hooks: Vec::new(),
            effects: Vec::new(),
            flags: Flags::empty(),
            lane,
            root,
            schedule,
        }
    }

    /// A context with no component behind it; every hook call fails.
    #[cfg(test)]
    pub(crate) fn detached(schedule: &'r Weak<RefCell<Schedule>>) -> Self {
        Self::new(INVALID, None, Lanes::SYNC, RootId(INVALID), schedule)
    }

    /// Returns `true` on the component's first render.
    #[must_use]
    pub fn is_mount(&self) -> bool {
        self.mount
    }

    /// A state value plus a handle for updating it.
    ///
    /// `init` runs only on the first render. Later renders fold the pending
    /// updates of the current lane into the previous value.
    pub fn use_state<S: Clone + 'static>(
        &mut self,
        init: impl FnOnce() -> S,
    ) -> Result<(S, Dispatch<S>), RenderError> {
        self.ensure_rendering()?;
        let index = self.hooks.len();
        let (value, queue) = if self.mount {
            (init(), Rc::new(RefCell::new(UpdateQueue::<S>::new())))
        } else {
            let Hook::State { value, queue } = self.next_previous()? else {
                return Err(RenderError::HookKindMismatch { index });
            };
            let queue = Rc::downcast::<RefCell<UpdateQueue<S>>>(queue)
                .map_err(|_| RenderError::HookKindMismatch { index })?;
            let base = value
                .downcast_ref::<S>()
                .ok_or(RenderError::HookKindMismatch { index })?
                .clone();
            // Reducers may dispatch to this hook, so none run under a borrow.
            let mut batch = core::mem::take(&mut *queue.borrow_mut());
            let next = batch.drain(base, self.lane);
            queue.borrow_mut().prepend(batch);
            (next, queue)
        };
        self.hooks.push(Hook::State {
            value: Rc::new(value.clone()),
            queue: queue.clone(),
        });
        let dispatch = Dispatch {
            queue,
            schedule: self.schedule.clone(),
            root: self.root,
        };
        Ok((value, dispatch))
    }

    /// Registers a passive effect.
    ///
    /// `create` runs after the commit that first includes this render, and
    /// again after any commit whose `deps` differ from the previous render's.
    /// `None` deps mean "changed on every render". The cleanup `create`
    /// returns runs before the next re-run and on unmount.
    pub fn use_effect<D: PartialEq + 'static>(
        &mut self,
        create: impl FnOnce() -> Option<Destroy> + 'static,
        deps: Option<D>,
    ) -> Result<(), RenderError> {
        self.ensure_rendering()?;
        let index = self.hooks.len();
        let deps = deps.map(|d| Rc::new(d) as Rc<dyn Any>);
        let (tag, destroy) = if self.mount {
            (HookFlags::PASSIVE | HookFlags::HAS_EFFECT, Rc::default())
        } else {
            let Hook::Effect(prev) = self.next_previous()? else {
                return Err(RenderError::HookKindMismatch { index });
            };
            let tag = if deps_equal::<D>(prev.deps.as_ref(), deps.as_ref()) {
                HookFlags::PASSIVE
            } else {
                HookFlags::PASSIVE | HookFlags::HAS_EFFECT
            };
            (tag, prev.destroy.clone())
        };
        if tag.contains(HookFlags::HAS_EFFECT) {
            self.flags |= Flags::PASSIVE_EFFECT;
        }
        let effect = Rc::new(Effect {
            tag: Cell::new(tag),
            create: RefCell::new(Some(Box::new(create))),
            destroy,
            deps,
        });
        self.effects.push(effect.clone());
        self.hooks.push(Hook::Effect(effect));
        Ok(())
    }

    fn ensure_rendering(&self) -> Result<(), RenderError> {
        if self.fiber == INVALID {
            return Err(RenderError::HookOutsideComponent);
        }
        Ok(())
    }

    fn next_previous(&mut self) -> Result<Hook, RenderError> {
        let hook = self
            .previous
            .get(self.cursor)
            .cloned()
            .ok_or(RenderError::HookCountMismatch {
                expected: self.previous.len(),
                found: self.cursor + 1,
            })?;
        self.cursor += 1;
        Ok(hook)
    }

    fn finish(self) -> Result<RenderedHooks, RenderError> {
        if !self.mount && self.cursor != self.previous.len() {
            return Err(RenderError::HookCountMismatch {
                expected: self.previous.len(),
                found: self.cursor,
            });
        }
        Ok(RenderedHooks {
            hooks: self.hooks,
            effects: self.effects,
            flags: self.flags,
        })
    }
}

fn deps_equal<D: PartialEq + 'static>(
    prev: Option<&Rc<dyn Any>>,
    next: Option<&Rc<dyn Any>>,
) -> bool {
    match (prev, next) {
        (Some(prev), Some(next)) => {
            match (prev.downcast_ref::<D>(), next.downcast_ref::<D>()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
        }
        _ => false,
    }
}

/// Renders the function component at `wip` and records its hooks.
///
/// Mount versus update is decided by whether the fiber has a committed peer.
pub(crate) fn render_with_hooks<H>(
    fibers: &mut FiberStore<H>,
    wip: u32,
    lane: Lanes,
    root: RootId,
    schedule: &Weak<RefCell<Schedule>>,
) -> Result<Child, RenderError> {
    let current = fibers.alternate[wip as usize];
    let store = &*fibers;
    let Some(ElementType::Component(component)) = &store.ty[wip as usize] else {
        return Ok(Child::Empty);
    };
    let fallback = Props::default();
    let props = store.pending_input[wip as usize]
        .props()
        .unwrap_or(&fallback);
    let previous = (current != INVALID).then(|| store.hooks_at(current));

    let mut hooks = Hooks::new(wip, previous, lane, root, schedule);
    let children = component.render(props, &mut hooks)?;
    let rendered = hooks.finish()?;

    let w = wip as usize;
    fibers.memoized_state[w] = FiberState::Hooks(rendered.hooks);
    fibers.effects[w] = rendered.effects;
    fibers.flags[w] |= rendered.flags;
    Ok(children)
}
