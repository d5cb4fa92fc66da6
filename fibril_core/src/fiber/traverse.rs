// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use super::id::{FiberId, INVALID};
use super::store::FiberStore;

/// An iterator over the direct children of a fiber.
///
/// Created by [`FiberStore::children`].
#[derive(Debug)]
pub struct Children<'a, H> {
    store: &'a FiberStore<H>,
    current: u32,
}

impl<'a, H> Children<'a, H> {
    pub(crate) fn new(store: &'a FiberStore<H>, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }
}

impl<H> Iterator for Children<'_, H> {
    type Item = FiberId;

    fn next(&mut self) -> Option<FiberId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.next_sibling[idx as usize];
        Some(self.store.id_at(idx))
    }
}

/// A depth-first pre-order walk over a subtree, root included.
///
/// Created by [`FiberStore::descendants`].
#[derive(Debug)]
pub struct Descendants<'a, H> {
    store: &'a FiberStore<H>,
    root: u32,
    next: u32,
}

impl<'a, H> Descendants<'a, H> {
    pub(crate) fn new(store: &'a FiberStore<H>, root: u32) -> Self {
        Self {
            store,
            root,
            next: root,
        }
    }
}

impl<H> Iterator for Descendants<'_, H> {
    type Item = FiberId;

    fn next(&mut self) -> Option<FiberId> {
        let idx = self.next;
        if idx == INVALID {
            return None;
        }
        self.next = self.store.preorder_next(idx, self.root);
        Some(self.store.id_at(idx))
    }
}
