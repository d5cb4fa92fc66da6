// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The render phase: building a work-in-progress tree.
//!
//! Rendering walks the tree iteratively. [`begin_work`] produces a fiber's
//! children; when a fiber has none, it is completed and the walk moves to
//! its sibling, or climbs to complete the parent. Completion creates output
//! nodes for newly mounted host fibers, flags changed ones for update, and
//! bubbles descendant flags up into `subtree_flags`.
//!
//! Nothing here mutates attached output. The only adapter calls are for
//! detached nodes: creating them and assembling new subtrees.
//!
//! [`begin_work`]: RenderContext::begin_work

use alloc::rc::{Rc, Weak};
use core::cell::RefCell;

use crate::backend::HostAdapter;
use crate::element::{Child, ElementType};
use crate::error::RenderError;
use crate::fiber::{FiberInput, FiberKind, FiberState, FiberStore, INVALID, RootId};
use crate::flags::Flags;
use crate::hooks::render_with_hooks;
use crate::lanes::Lanes;
use crate::reconcile::ChildReconciler;
use crate::scheduler::Schedule;
use crate::trace::Tracer;
use crate::update_queue::UpdateQueue;

/// Borrowed state for one render pass.
pub(crate) struct RenderContext<'a, 't, A: HostAdapter> {
    adapter: &'a mut A,
    fibers: &'a mut FiberStore<A::Handle>,
    root_queue: &'a mut UpdateQueue<Child>,
    schedule: &'a Weak<RefCell<Schedule>>,
    tracer: &'a mut Tracer<'t>,
    root: RootId,
    lane: Lanes,
    pass_index: u64,
    work_in_progress: u32,
}

impl<'a, 't, A: HostAdapter> RenderContext<'a, 't, A> {
    pub(crate) fn new(
        adapter: &'a mut A,
        fibers: &'a mut FiberStore<A::Handle>,
        root_queue: &'a mut UpdateQueue<Child>,
        schedule: &'a Weak<RefCell<Schedule>>,
        tracer: &'a mut Tracer<'t>,
        root: RootId,
        lane: Lanes,
        pass_index: u64,
    ) -> Self {
        Self {
            adapter,
            fibers,
            root_queue,
            schedule,
            tracer,
            root,
            lane,
            pass_index,
            work_in_progress: INVALID,
        }
    }

    /// Renders the tree under the committed root fiber `current`.
    ///
    /// Returns the finished work-in-progress root. On error the partial tree
    /// is left for the caller to discard.
    pub(crate) fn render(mut self, current: u32) -> Result<u32, RenderError> {
        let root = self.fibers.create_work_in_progress(current, FiberInput::Root);
        self.work_in_progress = root;
        while self.work_in_progress != INVALID {
            self.perform_unit_of_work(self.work_in_progress)?;
        }
        Ok(root)
    }

    fn perform_unit_of_work(&mut self, fiber: u32) -> Result<(), RenderError> {
        let next = self.begin_work(fiber)?;
        let f = fiber as usize;
        self.fibers.memoized_input[f] = Some(self.fibers.pending_input[f].clone());
        if next == INVALID {
            self.complete_unit_of_work(fiber);
        } else {
            self.work_in_progress = next;
        }
        Ok(())
    }

    /// Produces the children of `fiber`; returns the first, or [`INVALID`].
    fn begin_work(&mut self, fiber: u32) -> Result<u32, RenderError> {
        let f = fiber as usize;
        match self.fibers.kind[f] {
            FiberKind::HostRoot => {
                let base = match &self.fibers.memoized_state[f] {
                    FiberState::Root(child) => child.clone(),
                    _ => Child::Empty,
                };
                let next = self.root_queue.drain(base, self.lane);
                self.fibers.memoized_state[f] = FiberState::Root(next.clone());
                Ok(self.reconcile_children(fiber, &next))
            }
            FiberKind::HostComponent => {
                let children = match &self.fibers.pending_input[f] {
                    FiberInput::Props(props) => props.children.clone(),
                    _ => Child::Empty,
                };
                Ok(self.reconcile_children(fiber, &children))
            }
            FiberKind::HostText => Ok(INVALID),
            FiberKind::FunctionComponent => {
                let children =
                    render_with_hooks(self.fibers, fiber, self.lane, self.root, self.schedule)?;
                Ok(self.reconcile_children(fiber, &children))
            }
            FiberKind::Fragment => {
                let children = match &self.fibers.pending_input[f] {
                    FiberInput::Fragment(children) => children.clone(),
                    _ => Child::Empty,
                };
                Ok(self.reconcile_children(fiber, &children))
            }
        }
    }

    fn reconcile_children(&mut self, fiber: u32, children: &Child) -> u32 {
        let current = self.fibers.alternate[fiber as usize];
        let (track, current_first) = if current == INVALID {
            (false, INVALID)
        } else {
            (true, self.fibers.first_child[current as usize])
        };
        let first = ChildReconciler::new(self.fibers, track, self.tracer, self.pass_index)
            .reconcile(fiber, current_first, children);
        self.fibers.first_child[fiber as usize] = first;
        first
    }

    fn complete_unit_of_work(&mut self, fiber: u32) {
        let mut node = fiber;
        loop {
            self.complete_work(node);
            let sibling = self.fibers.next_sibling[node as usize];
            if sibling != INVALID {
                self.work_in_progress = sibling;
                return;
            }
            node = self.fibers.parent[node as usize];
            self.work_in_progress = node;
            if node == INVALID {
                return;
            }
        }
    }

    fn complete_work(&mut self, fiber: u32) {
        let f = fiber as usize;
        let current = self.fibers.alternate[f];
        match self.fibers.kind[f] {
            FiberKind::HostComponent => {
                if current != INVALID && self.fibers.state_node[f].is_some() {
                    let old = self.fibers.memoized_input[current as usize]
                        .as_ref()
                        .and_then(FiberInput::props);
                    let new = self.fibers.pending_input[f].props();
                    let changed = match (old, new) {
                        (Some(old), Some(new)) => !old.attrs_eq(new),
                        _ => true,
                    };
                    if changed {
                        self.fibers.flags[f] |= Flags::UPDATE;
                    }
                } else if let Some(ElementType::Host(tag)) = &self.fibers.ty[f] {
                    let props = match &self.fibers.pending_input[f] {
                        FiberInput::Props(props) => props.clone(),
                        _ => Rc::default(),
                    };
                    let handle = self.adapter.create_instance(tag, &props);
                    self.append_all_children(&handle, fiber);
                    self.fibers.state_node[f] = Some(handle);
                }
            }
            FiberKind::HostText => {
                let text = self.fibers.pending_input[f].text().unwrap_or("");
                if current != INVALID && self.fibers.state_node[f].is_some() {
                    let old = self.fibers.memoized_input[current as usize]
                        .as_ref()
                        .and_then(FiberInput::text);
                    if old != Some(text) {
                        self.fibers.flags[f] |= Flags::UPDATE;
                    }
                } else {
                    let handle = self.adapter.create_text_instance(text);
                    self.fibers.state_node[f] = Some(handle);
                }
            }
            FiberKind::HostRoot | FiberKind::FunctionComponent | FiberKind::Fragment => {}
        }
        self.bubble_properties(fiber);
    }

    /// Attaches the nearest host descendants of `fiber` to `parent`.
    fn append_all_children(&mut self, parent: &A::Handle, fiber: u32) {
        let mut node = self.fibers.first_child[fiber as usize];
        while node != INVALID {
            let n = node as usize;
            if self.fibers.kind[n].is_host() {
                if let Some(child) = &self.fibers.state_node[n] {
                    self.adapter.append_initial_child(parent, child);
                }
            } else if self.fibers.first_child[n] != INVALID {
                node = self.fibers.first_child[n];
                continue;
            }
            while self.fibers.next_sibling[node as usize] == INVALID {
                node = self.fibers.parent[node as usize];
                if node == INVALID || node == fiber {
                    return;
                }
            }
            node = self.fibers.next_sibling[node as usize];
        }
    }

    fn bubble_properties(&mut self, fiber: u32) {
        let mut subtree = Flags::empty();
        let mut child = self.fibers.first_child[fiber as usize];
        while child != INVALID {
            let c = child as usize;
            subtree |= self.fibers.subtree_flags[c] | self.fibers.flags[c];
            self.fibers.parent[c] = fiber;
            child = self.fibers.next_sibling[c];
        }
        self.fibers.subtree_flags[fiber as usize] |= subtree;
    }
}
