// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The commit phase: applying a finished tree to the output medium.
//!
//! The mutation pass descends only into subtrees whose `subtree_flags`
//! intersect [`Flags::MUTATION_MASK`] and handles each flagged fiber on the
//! way back up, so children are placed before their parents. Per fiber the
//! order is placement, passive-effect collection, update, then deletion of
//! former children.
//!
//! Passive effects are only collected here; they run later, in three stages:
//! cleanups of unmounted components, cleanups of effects about to re-run,
//! then the effect bodies.

use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::backend::HostAdapter;
use crate::element::Props;
use crate::fiber::{FiberKind, FiberStore, INVALID};
use crate::flags::{Flags, HookFlags};
use crate::hooks::Effect;
use crate::trace::{CommitSummary, Tracer, WarningEvent, WarningKind};
#[cfg(feature = "trace-rich")]
use crate::trace::{FiberMutation, MutationOp};

/// Effects collected by commits and not yet run.
#[derive(Debug, Default)]
pub(crate) struct PendingPassiveEffects {
    unmount: Vec<Vec<Rc<Effect>>>,
    update: Vec<Vec<Rc<Effect>>>,
}

impl PendingPassiveEffects {
    pub(crate) fn is_empty(&self) -> bool {
        self.unmount.is_empty() && self.update.is_empty()
    }

    /// Runs unmount cleanups, then re-run cleanups, then effect bodies.
    pub(crate) fn run(self) {
        for effects in &self.unmount {
            for effect in effects {
                if effect.has(HookFlags::PASSIVE) {
                    effect.run_destroy();
                    effect.clear(HookFlags::PASSIVE);
                }
            }
        }
        let changed = HookFlags::PASSIVE | HookFlags::HAS_EFFECT;
        for effects in &self.update {
            for effect in effects {
                if effect.has(changed) {
                    effect.run_destroy();
                }
            }
        }
        for effects in &self.update {
            for effect in effects {
                if effect.has(changed) {
                    effect.run_create();
                }
            }
        }
    }
}

/// Borrowed state for one commit.
pub(crate) struct CommitContext<'a, 't, A: HostAdapter> {
    adapter: &'a mut A,
    fibers: &'a mut FiberStore<A::Handle>,
    passive: &'a mut PendingPassiveEffects,
    tracer: &'a mut Tracer<'t>,
    summary: CommitSummary,
    #[cfg(feature = "trace-rich")]
    mutations: Vec<FiberMutation>,
}

impl<'a, 't, A: HostAdapter> CommitContext<'a, 't, A> {
    pub(crate) fn new(
        adapter: &'a mut A,
        fibers: &'a mut FiberStore<A::Handle>,
        passive: &'a mut PendingPassiveEffects,
        tracer: &'a mut Tracer<'t>,
        summary: CommitSummary,
    ) -> Self {
        Self {
            adapter,
            fibers,
            passive,
            tracer,
            summary,
            #[cfg(feature = "trace-rich")]
            mutations: Vec::new(),
        }
    }

    /// Applies every mutation recorded under `finished`.
    pub(crate) fn commit(mut self, finished: u32) -> CommitSummary {
        let f = finished as usize;
        let pending = self.fibers.flags[f] | self.fibers.subtree_flags[f];
        if pending.intersects(Flags::MUTATION_MASK) {
            self.summary.mutation_pass = true;
            self.commit_mutation_effects(finished);
        }
        #[cfg(feature = "trace-rich")]
        if !self.mutations.is_empty() {
            self.tracer
                .fiber_mutations(self.summary.pass_index, &self.mutations);
        }
        self.summary
    }

    fn commit_mutation_effects(&mut self, finished: u32) {
        let mut next = finished;
        while next != INVALID {
            let child = self.fibers.first_child[next as usize];
            if child != INVALID
                && self.fibers.subtree_flags[next as usize].intersects(Flags::MUTATION_MASK)
            {
                next = child;
                continue;
            }
            while next != INVALID {
                self.commit_mutation_effects_on_fiber(next);
                if next == finished {
                    return;
                }
                let sibling = self.fibers.next_sibling[next as usize];
                if sibling != INVALID {
                    next = sibling;
                    break;
                }
                next = self.fibers.parent[next as usize];
            }
        }
    }

    fn commit_mutation_effects_on_fiber(&mut self, fiber: u32) {
        let f = fiber as usize;
        let flags = self.fibers.flags[f];

        if flags.contains(Flags::PLACEMENT) {
            self.commit_placement(fiber);
            self.fibers.flags[f].remove(Flags::PLACEMENT);
            self.summary.placements += 1;
            #[cfg(feature = "trace-rich")]
            self.record(fiber, MutationOp::Placement);
        }
        if flags.contains(Flags::PASSIVE_EFFECT) {
            if self.fibers.kind[f] == FiberKind::FunctionComponent {
                self.passive.update.push(self.fibers.effects[f].clone());
                self.summary.passive_effects += 1;
                #[cfg(feature = "trace-rich")]
                self.record(fiber, MutationOp::PassiveEffect);
            }
            self.fibers.flags[f].remove(Flags::PASSIVE_EFFECT);
        }
        if flags.contains(Flags::UPDATE) {
            self.commit_update(fiber);
            self.fibers.flags[f].remove(Flags::UPDATE);
            self.summary.updates += 1;
            #[cfg(feature = "trace-rich")]
            self.record(fiber, MutationOp::Update);
        }
        if flags.contains(Flags::CHILD_DELETION) {
            let deletions = core::mem::take(&mut self.fibers.deletions[f]);
            for child in deletions {
                #[cfg(feature = "trace-rich")]
                self.record(child, MutationOp::Deletion);
                self.commit_deletion(child);
                self.summary.deletions += 1;
            }
            self.fibers.flags[f].remove(Flags::CHILD_DELETION);
        }
    }

    #[cfg(feature = "trace-rich")]
    fn record(&mut self, fiber: u32, op: MutationOp) {
        self.mutations.push(FiberMutation { fiber, op });
    }

    // -- Placement --

    fn commit_placement(&mut self, fiber: u32) {
        let Some(parent) = self.host_parent(fiber) else {
            self.tracer.warning(&WarningEvent {
                pass_index: self.summary.pass_index,
                kind: WarningKind::MissingHostParent,
                fiber,
            });
            return;
        };
        let before = self.host_sibling(fiber);
        self.insert_or_append(fiber, &parent, before.as_ref());
    }

    /// The handle of the nearest host or root ancestor.
    fn host_parent(&self, fiber: u32) -> Option<A::Handle> {
        let mut node = self.fibers.parent[fiber as usize];
        while node != INVALID {
            let n = node as usize;
            if self.fibers.kind[n].is_host_parent() {
                return self.fibers.state_node[n].clone();
            }
            node = self.fibers.parent[n];
        }
        None
    }

    /// The output node `fiber`'s output must be inserted before: the first
    /// stable host node that follows it in document order under the same
    /// host parent. `None` means append.
    fn host_sibling(&self, fiber: u32) -> Option<A::Handle> {
        let fibers = &*self.fibers;
        let mut node = fiber;
        'siblings: loop {
            while fibers.next_sibling[node as usize] == INVALID {
                let parent = fibers.parent[node as usize];
                if parent == INVALID || fibers.kind[parent as usize].is_host_parent() {
                    return None;
                }
                node = parent;
            }
            node = fibers.next_sibling[node as usize];

            while !fibers.kind[node as usize].is_host() {
                // A moving subtree is not a stable anchor.
                if fibers.flags[node as usize].contains(Flags::PLACEMENT) {
                    continue 'siblings;
                }
                let child = fibers.first_child[node as usize];
                if child == INVALID {
                    continue 'siblings;
                }
                node = child;
            }

            if !fibers.flags[node as usize].contains(Flags::PLACEMENT) {
                return fibers.state_node[node as usize].clone();
            }
        }
    }

    /// Attaches the top host nodes under `fiber` to `parent`, in order.
    fn insert_or_append(&mut self, fiber: u32, parent: &A::Handle, before: Option<&A::Handle>) {
        let mut node = fiber;
        while node != INVALID {
            let n = node as usize;
            if !self.fibers.kind[n].is_host() {
                node = self.fibers.preorder_next(node, fiber);
                continue;
            }
            if let Some(handle) = &self.fibers.state_node[n] {
                match before {
                    Some(before) => self.adapter.insert_before(parent, handle, before),
                    None => self.adapter.append_child(parent, handle),
                }
            }
            node = self.fibers.preorder_skip(node, fiber);
        }
    }

    // -- Update --

    fn commit_update(&mut self, fiber: u32) {
        let f = fiber as usize;
        let current = self.fibers.alternate[f];
        let Some(handle) = &self.fibers.state_node[f] else {
            return;
        };
        let old = (current != INVALID)
            .then(|| self.fibers.memoized_input[current as usize].as_ref())
            .flatten();
        let new = self.fibers.memoized_input[f].as_ref();
        match self.fibers.kind[f] {
            FiberKind::HostComponent => {
                let fallback = Props::default();
                let old = old.and_then(|input| input.props()).unwrap_or(&fallback);
                let new = new.and_then(|input| input.props()).unwrap_or(&fallback);
                self.adapter.commit_update(handle, old, new);
            }
            FiberKind::HostText => {
                let old = old.and_then(|input| input.text()).unwrap_or("");
                let new = new.and_then(|input| input.text()).unwrap_or("");
                self.adapter.commit_text_update(handle, old, new);
            }
            FiberKind::HostRoot | FiberKind::FunctionComponent | FiberKind::Fragment => {}
        }
    }

    // -- Deletion --

    /// Unmounts the committed subtree rooted at `child` and frees its slots.
    fn commit_deletion(&mut self, child: u32) {
        let mut host_roots = Vec::new();
        let mut visited = Vec::new();
        let mut node = child;
        while node != INVALID {
            let n = node as usize;
            match self.fibers.kind[n] {
                FiberKind::HostComponent | FiberKind::HostText => {
                    if !self.has_host_ancestor_within(node, child) {
                        host_roots.push(node);
                    }
                }
                FiberKind::FunctionComponent => {
                    if !self.fibers.effects[n].is_empty() {
                        self.passive.unmount.push(self.fibers.effects[n].clone());
                    }
                }
                FiberKind::HostRoot | FiberKind::Fragment => {}
            }
            visited.push(node);
            node = self.fibers.preorder_next(node, child);
        }

        if !host_roots.is_empty() {
            if let Some(parent) = self.host_parent(child) {
                for &host in &host_roots {
                    if let Some(handle) = &self.fibers.state_node[host as usize] {
                        self.adapter.remove_child(&parent, handle);
                    }
                }
            }
        }

        for fiber in visited {
            let peer = self.fibers.alternate[fiber as usize];
            self.fibers.release(fiber);
            if peer != INVALID {
                self.fibers.release(peer);
            }
        }
    }

    fn has_host_ancestor_within(&self, fiber: u32, boundary: u32) -> bool {
        let mut node = fiber;
        while node != boundary {
            node = self.fibers.parent[node as usize];
            if node == INVALID {
                return false;
            }
            if self.fibers.kind[node as usize].is_host() {
                return true;
            }
        }
        false
    }
}
