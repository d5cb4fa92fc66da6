// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays fiber storage with allocation, pairing, and topology.

use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::element::{Child, ElementType, Key, Props};
use crate::flags::Flags;
use crate::hooks::{Effect, Hook};

use super::id::{FiberId, INVALID};
use super::traverse::{Children, Descendants};

/// What a fiber represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FiberKind {
    /// The top of a tree; its handle is the output container.
    HostRoot,
    /// A host output node.
    HostComponent,
    /// A host text node.
    HostText,
    /// A function component.
    FunctionComponent,
    /// A transparent grouping node.
    Fragment,
}

impl FiberKind {
    /// Returns `true` for kinds that own an output node.
    #[inline]
    #[must_use]
    pub const fn is_host(self) -> bool {
        matches!(self, Self::HostComponent | Self::HostText)
    }

    /// Returns `true` for kinds whose handle can hold children.
    #[inline]
    #[must_use]
    pub const fn is_host_parent(self) -> bool {
        matches!(self, Self::HostComponent | Self::HostRoot)
    }
}

/// The input a fiber is rendered from.
#[derive(Clone, Debug, PartialEq)]
pub enum FiberInput {
    /// Root fibers read their child from the root update queue.
    Root,
    /// Host and component props.
    Props(Rc<Props>),
    /// Text content.
    Text(Rc<str>),
    /// The children of a fragment.
    Fragment(Child),
}

impl FiberInput {
    /// The props, if this input carries any.
    #[must_use]
    pub fn props(&self) -> Option<&Props> {
        match self {
            Self::Props(props) => Some(props),
            _ => None,
        }
    }

    /// The text, if this is a text input.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// State carried across renders.
#[derive(Clone, Default)]
pub(crate) enum FiberState {
    #[default]
    Empty,
    /// The child description last rendered into a root.
    Root(Child),
    /// The hook list of a function component.
    Hooks(Vec<Hook>),
}

/// Struct-of-arrays storage for every fiber of every root.
///
/// Fibers are addressed by [`FiberId`] handles. Internally, each fiber occupies
/// a slot in parallel arrays. Released fibers are recycled via a free list,
/// and generation counters prevent stale handle access.
///
/// Each committed fiber may be paired with a work-in-progress peer through
/// `alternate`. The pair is always mutual: if `a.alternate == b` then
/// `b.alternate == a`.
pub struct FiberStore<H> {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) index: Vec<u32>,
    pub(crate) alternate: Vec<u32>,

    // -- Identity --
    pub(crate) kind: Vec<FiberKind>,
    pub(crate) key: Vec<Option<Key>>,
    pub(crate) ty: Vec<Option<ElementType>>,

    // -- Render state --
    pub(crate) pending_input: Vec<FiberInput>,
    pub(crate) memoized_input: Vec<Option<FiberInput>>,
    pub(crate) memoized_state: Vec<FiberState>,
    pub(crate) effects: Vec<Vec<Rc<Effect>>>,
    pub(crate) state_node: Vec<Option<H>>,

    // -- Mutation flags --
    pub(crate) flags: Vec<Flags>,
    pub(crate) subtree_flags: Vec<Flags>,
    pub(crate) deletions: Vec<Vec<u32>>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) alive: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Render-session tracking --
    pub(crate) tracking: bool,
    pub(crate) created: Vec<u32>,
}

impl<H> core::fmt::Debug for FiberStore<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FiberStore")
            .field("slots", &self.len)
            .field("live", &self.live_count())
            .finish_non_exhaustive()
    }
}

impl<H> Default for FiberStore<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> FiberStore<H> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            index: Vec::new(),
            alternate: Vec::new(),
            kind: Vec::new(),
            key: Vec::new(),
            ty: Vec::new(),
            pending_input: Vec::new(),
            memoized_input: Vec::new(),
            memoized_state: Vec::new(),
            effects: Vec::new(),
            state_node: Vec::new(),
            flags: Vec::new(),
            subtree_flags: Vec::new(),
            deletions: Vec::new(),
            generation: Vec::new(),
            alive: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            tracking: false,
            created: Vec::new(),
        }
    }

    // -- Allocation --

    /// Allocates an unlinked fiber and returns its slot index.
    pub(crate) fn allocate(
        &mut self,
        kind: FiberKind,
        key: Option<Key>,
        ty: Option<ElementType>,
        input: FiberInput,
    ) -> u32 {
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.generation[i] += 1;
            self.alive[i] = true;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.index[i] = 0;
            self.alternate[i] = INVALID;
            self.kind[i] = kind;
            self.key[i] = key;
            self.ty[i] = ty;
            self.pending_input[i] = input;
            self.memoized_input[i] = None;
            self.memoized_state[i] = FiberState::Empty;
            self.state_node[i] = None;
            self.flags[i] = Flags::empty();
            self.subtree_flags[i] = Flags::empty();
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.index.push(0);
            self.alternate.push(INVALID);
            self.kind.push(kind);
            self.key.push(key);
            self.ty.push(ty);
            self.pending_input.push(input);
            self.memoized_input.push(None);
            self.memoized_state.push(FiberState::Empty);
            self.effects.push(Vec::new());
            self.state_node.push(None);
            self.flags.push(Flags::empty());
            self.subtree_flags.push(Flags::empty());
            self.deletions.push(Vec::new());
            self.generation.push(0);
            self.alive.push(true);
            idx
        };
        if self.tracking {
            self.created.push(idx);
        }
        idx
    }

    /// Returns a slot to the free list and unpairs its peer.
    ///
    /// Drops everything the slot owns (hooks, effects, output handle), so
    /// stale handles and stale peers cannot observe it again.
    pub(crate) fn release(&mut self, idx: u32) {
        let i = idx as usize;
        if !self.alive[i] {
            return;
        }
        let peer = self.alternate[i];
        if peer != INVALID && self.alternate[peer as usize] == idx {
            self.alternate[peer as usize] = INVALID;
        }
        self.alive[i] = false;
        self.parent[i] = INVALID;
        self.first_child[i] = INVALID;
        self.next_sibling[i] = INVALID;
        self.alternate[i] = INVALID;
        self.key[i] = None;
        self.ty[i] = None;
        self.pending_input[i] = FiberInput::Root;
        self.memoized_input[i] = None;
        self.memoized_state[i] = FiberState::Empty;
        self.effects[i].clear();
        self.state_node[i] = None;
        self.deletions[i].clear();
        self.generation[i] += 1;
        self.free_list.push(idx);
    }

    /// Starts recording every slot allocated from now on.
    pub(crate) fn begin_tracking(&mut self) {
        self.tracking = true;
        self.created.clear();
    }

    /// Stops recording allocations and keeps what was created.
    pub(crate) fn end_tracking(&mut self) {
        self.tracking = false;
        self.created.clear();
    }

    /// Stops recording and releases every slot allocated since
    /// [`begin_tracking`](Self::begin_tracking).
    pub(crate) fn release_tracked(&mut self) {
        self.tracking = false;
        let created = core::mem::take(&mut self.created);
        for &idx in &created {
            self.release(idx);
        }
    }

    // -- Pairing --

    /// Returns the work-in-progress peer of `current`, ready to render `input`.
    ///
    /// Reuses the existing peer slot when there is one, resetting its flags
    /// and deletion list; otherwise allocates a new slot and pairs it. Either
    /// way the peer starts from `current`'s children, memoized input, state,
    /// and output handle.
    pub(crate) fn create_work_in_progress(&mut self, current: u32, input: FiberInput) -> u32
    where
        H: Clone,
    {
        let c = current as usize;
        let mut wip = self.alternate[c];
        if wip == INVALID {
            wip = self.allocate(self.kind[c], self.key[c].clone(), self.ty[c].clone(), input);
            self.alternate[wip as usize] = current;
            self.alternate[c] = wip;
        } else {
            let w = wip as usize;
            self.pending_input[w] = input;
            self.flags[w] = Flags::empty();
            self.subtree_flags[w] = Flags::empty();
            self.deletions[w].clear();
            self.ty[w] = self.ty[c].clone();
            self.key[w] = self.key[c].clone();
        }
        let w = wip as usize;
        self.first_child[w] = self.first_child[c];
        self.next_sibling[w] = INVALID;
        self.index[w] = self.index[c];
        self.memoized_input[w] = self.memoized_input[c].clone();
        self.memoized_state[w] = self.memoized_state[c].clone();
        self.effects[w] = self.effects[c].clone();
        self.state_node[w] = self.state_node[c].clone();
        wip
    }

    // -- Topology helpers --

    /// Next fiber of a pre-order walk bounded by `root`.
    pub(crate) fn preorder_next(&self, idx: u32, root: u32) -> u32 {
        let child = self.first_child[idx as usize];
        if child != INVALID {
            return child;
        }
        self.preorder_skip(idx, root)
    }

    /// Like [`preorder_next`](Self::preorder_next), without entering the
    /// children of `idx`.
    pub(crate) fn preorder_skip(&self, idx: u32, root: u32) -> u32 {
        let mut node = idx;
        loop {
            if node == root {
                return INVALID;
            }
            let sibling = self.next_sibling[node as usize];
            if sibling != INVALID {
                return sibling;
            }
            node = self.parent[node as usize];
            if node == INVALID {
                return INVALID;
            }
        }
    }

    /// Returns the hook list of a component fiber.
    pub(crate) fn hooks_at(&self, idx: u32) -> &[Hook] {
        match &self.memoized_state[idx as usize] {
            FiberState::Hooks(hooks) => hooks,
            _ => &[],
        }
    }

    /// Returns the host handle of a fiber, if it has one.
    pub(crate) fn handle_at(&self, idx: u32) -> Option<&H> {
        self.state_node[idx as usize].as_ref()
    }

    /// Builds a handle for a live slot.
    pub(crate) fn id_at(&self, idx: u32) -> FiberId {
        FiberId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    // -- Query API --

    /// Returns whether the given handle refers to a live fiber.
    #[must_use]
    pub fn is_alive(&self, id: FiberId) -> bool {
        id.idx < self.len
            && self.generation[id.idx as usize] == id.generation
            && self.alive[id.idx as usize]
    }

    /// Number of live fibers.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.alive.iter().filter(|&&alive| alive).count()
    }

    /// The fiber's kind.
    #[must_use]
    pub fn kind(&self, id: FiberId) -> FiberKind {
        self.validate(id);
        self.kind[id.idx as usize]
    }

    /// The fiber's key.
    #[must_use]
    pub fn key(&self, id: FiberId) -> Option<&Key> {
        self.validate(id);
        self.key[id.idx as usize].as_ref()
    }

    /// The element type the fiber was created from.
    #[must_use]
    pub fn element_type(&self, id: FiberId) -> Option<&ElementType> {
        self.validate(id);
        self.ty[id.idx as usize].as_ref()
    }

    /// The input the fiber last finished rendering with.
    #[must_use]
    pub fn memoized_input(&self, id: FiberId) -> Option<&FiberInput> {
        self.validate(id);
        self.memoized_input[id.idx as usize].as_ref()
    }

    /// The fiber's own mutation flags.
    #[must_use]
    pub fn flags(&self, id: FiberId) -> Flags {
        self.validate(id);
        self.flags[id.idx as usize]
    }

    /// Union of all descendant flags.
    #[must_use]
    pub fn subtree_flags(&self, id: FiberId) -> Flags {
        self.validate(id);
        self.subtree_flags[id.idx as usize]
    }

    /// Position among the siblings of the last render.
    #[must_use]
    pub fn sibling_index(&self, id: FiberId) -> u32 {
        self.validate(id);
        self.index[id.idx as usize]
    }

    /// The fiber's output handle.
    #[must_use]
    pub fn handle(&self, id: FiberId) -> Option<&H> {
        self.validate(id);
        self.handle_at(id.idx)
    }

    /// The parent fiber.
    #[must_use]
    pub fn parent(&self, id: FiberId) -> Option<FiberId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.id_at(p))
    }

    /// The peer in the other tree, if paired.
    #[must_use]
    pub fn peer(&self, id: FiberId) -> Option<FiberId> {
        self.validate(id);
        let a = self.alternate[id.idx as usize];
        (a != INVALID).then(|| self.id_at(a))
    }

    /// Iterates the direct children.
    pub fn children(&self, id: FiberId) -> Children<'_, H> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Walks the subtree rooted at `id` in pre-order, `id` first.
    pub fn descendants(&self, id: FiberId) -> Descendants<'_, H> {
        self.validate(id);
        Descendants::new(self, id.idx)
    }

    fn validate(&self, id: FiberId) {
        assert!(
            self.is_alive(id),
            "stale FiberId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }
}
