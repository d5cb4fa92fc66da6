// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Child reconciliation: diffing a child description against the previous
//! children of a fiber.
//!
//! The result is a freshly linked list of work-in-progress children. Reused
//! fibers come from [`FiberStore::create_work_in_progress`], so their output
//! handles and hook state carry over. Dropped fibers are recorded on the
//! parent's deletion list and the parent is flagged
//! [`CHILD_DELETION`](Flags::CHILD_DELETION).
//!
//! # Moves in keyed lists
//!
//! Lists are matched by key (or by position for unkeyed children). Walking
//! the new list left to right, a reused fiber whose previous position is
//! below the highest previous position reused so far is flagged as a move;
//! otherwise that position becomes the new watermark. Fibers that only
//! shift forward therefore stay put:
//!
//! ```text
//!   [A, B, C] -> [C, A, B]   moves A and B
//!   [A, B, C] -> [B, C, A]   moves A
//! ```

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::element::{Child, Element, ElementType, Key};
use crate::fiber::{FiberInput, FiberKind, FiberStore, INVALID};
use crate::flags::Flags;
use crate::trace::{Tracer, WarningEvent, WarningKind};

/// Position key of a previous child: its explicit key, or its index.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SlotKey {
    Key(Key),
    Index(u32),
}

pub(crate) struct ChildReconciler<'a, 't, H> {
    fibers: &'a mut FiberStore<H>,
    track_side_effects: bool,
    tracer: &'a mut Tracer<'t>,
    pass_index: u64,
}

impl<'a, 't, H: Clone> ChildReconciler<'a, 't, H> {
    /// `track_side_effects` is `false` while mounting a brand-new subtree:
    /// nothing below it needs placing or deleting individually.
    pub(crate) fn new(
        fibers: &'a mut FiberStore<H>,
        track_side_effects: bool,
        tracer: &'a mut Tracer<'t>,
        pass_index: u64,
    ) -> Self {
        Self {
            fibers,
            track_side_effects,
            tracer,
            pass_index,
        }
    }

    /// Reconciles `new_child` against the previous children starting at
    /// `current_first`. Returns the first new child, or [`INVALID`].
    pub(crate) fn reconcile(
        &mut self,
        return_fiber: u32,
        current_first: u32,
        new_child: &Child,
    ) -> u32 {
        let mut child = new_child;
        // An unkeyed fragment at the top of a child description is
        // transparent.
        while let Child::Element(Element {
            ty: ElementType::Fragment,
            key: None,
            props,
        }) = child
        {
            child = &props.children;
        }

        match child {
            Child::Element(element) => {
                let fiber = self.reconcile_single_element(return_fiber, current_first, element);
                self.place_single_child(fiber)
            }
            Child::Text(text) => {
                let fiber = self.reconcile_single_text(return_fiber, current_first, text);
                self.place_single_child(fiber)
            }
            Child::List(list) => self.reconcile_children_array(return_fiber, current_first, list),
            Child::Empty => {
                self.delete_remaining_children(return_fiber, current_first);
                INVALID
            }
        }
    }

    fn reconcile_single_element(
        &mut self,
        return_fiber: u32,
        current_first: u32,
        element: &Element,
    ) -> u32 {
        let mut current = current_first;
        while current != INVALID {
            let c = current as usize;
            let next = self.fibers.next_sibling[c];
            if self.fibers.key[c] == element.key {
                if self.fibers.ty[c].as_ref() == Some(&element.ty) {
                    let existing = self.use_fiber(current, input_for(element));
                    self.fibers.parent[existing as usize] = return_fiber;
                    self.delete_remaining_children(return_fiber, next);
                    return existing;
                }
                // Same key, different type: nothing after it can match.
                self.delete_remaining_children(return_fiber, current);
                break;
            }
            self.delete_child(return_fiber, current);
            current = next;
        }
        let fiber = self.create_from_element(element);
        self.fibers.parent[fiber as usize] = return_fiber;
        fiber
    }

    fn reconcile_single_text(
        &mut self,
        return_fiber: u32,
        current_first: u32,
        text: &Rc<str>,
    ) -> u32 {
        let mut current = current_first;
        while current != INVALID {
            let c = current as usize;
            let next = self.fibers.next_sibling[c];
            if self.fibers.key[c].is_none() {
                if self.fibers.kind[c] == FiberKind::HostText {
                    let existing = self.use_fiber(current, FiberInput::Text(text.clone()));
                    self.fibers.parent[existing as usize] = return_fiber;
                    self.delete_remaining_children(return_fiber, next);
                    return existing;
                }
                self.delete_remaining_children(return_fiber, current);
                break;
            }
            self.delete_child(return_fiber, current);
            current = next;
        }
        let fiber = self.create_text(text);
        self.fibers.parent[fiber as usize] = return_fiber;
        fiber
    }

    fn reconcile_children_array(
        &mut self,
        return_fiber: u32,
        current_first: u32,
        list: &[Child],
    ) -> u32 {
        let mut existing = BTreeMap::new();
        let mut current = current_first;
        while current != INVALID {
            let c = current as usize;
            let slot = match &self.fibers.key[c] {
                Some(key) => SlotKey::Key(key.clone()),
                None => SlotKey::Index(self.fibers.index[c]),
            };
            existing.insert(slot, current);
            current = self.fibers.next_sibling[c];
        }

        let mut last_placed_index = 0;
        let mut first = INVALID;
        let mut last = INVALID;
        for (i, child) in list.iter().enumerate() {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "child lists stay far below u32::MAX entries"
            )]
            let i = i as u32;
            let Some(fiber) = self.update_from_map(&mut existing, return_fiber, i, child) else {
                continue;
            };
            let f = fiber as usize;
            self.fibers.index[f] = i;
            self.fibers.parent[f] = return_fiber;
            self.fibers.next_sibling[f] = INVALID;
            if last == INVALID {
                first = fiber;
            } else {
                self.fibers.next_sibling[last as usize] = fiber;
            }
            last = fiber;

            if !self.track_side_effects {
                continue;
            }
            let current = self.fibers.alternate[f];
            if current == INVALID {
                self.fibers.flags[f] |= Flags::PLACEMENT;
                continue;
            }
            let old_index = self.fibers.index[current as usize];
            if old_index < last_placed_index {
                self.fibers.flags[f] |= Flags::PLACEMENT;
            } else {
                last_placed_index = old_index;
            }
        }

        let mut leftover: Vec<u32> = existing.into_values().collect();
        leftover.sort_unstable_by_key(|&fiber| self.fibers.index[fiber as usize]);
        for fiber in leftover {
            self.delete_child(return_fiber, fiber);
        }
        first
    }

    fn update_from_map(
        &mut self,
        existing: &mut BTreeMap<SlotKey, u32>,
        return_fiber: u32,
        i: u32,
        child: &Child,
    ) -> Option<u32> {
        match child {
            Child::Text(text) => {
                let slot = SlotKey::Index(i);
                if let Some(&before) = existing.get(&slot) {
                    if self.fibers.kind[before as usize] == FiberKind::HostText {
                        existing.remove(&slot);
                        return Some(self.use_fiber(before, FiberInput::Text(text.clone())));
                    }
                }
                Some(self.create_text(text))
            }
            Child::Element(element) => {
                let slot = match &element.key {
                    Some(key) => SlotKey::Key(key.clone()),
                    None => SlotKey::Index(i),
                };
                if let Some(&before) = existing.get(&slot) {
                    if self.fibers.ty[before as usize].as_ref() == Some(&element.ty) {
                        existing.remove(&slot);
                        return Some(self.use_fiber(before, input_for(element)));
                    }
                }
                Some(self.create_from_element(element))
            }
            Child::List(_) => {
                self.tracer.warning(&WarningEvent {
                    pass_index: self.pass_index,
                    kind: WarningKind::NestedChildList,
                    fiber: return_fiber,
                });
                None
            }
            Child::Empty => None,
        }
    }

    fn place_single_child(&mut self, fiber: u32) -> u32 {
        if self.track_side_effects && self.fibers.alternate[fiber as usize] == INVALID {
            self.fibers.flags[fiber as usize] |= Flags::PLACEMENT;
        }
        fiber
    }

    fn delete_child(&mut self, return_fiber: u32, child: u32) {
        if !self.track_side_effects {
            return;
        }
        let r = return_fiber as usize;
        self.fibers.deletions[r].push(child);
        self.fibers.flags[r] |= Flags::CHILD_DELETION;
    }

    fn delete_remaining_children(&mut self, return_fiber: u32, first: u32) {
        if !self.track_side_effects {
            return;
        }
        let mut child = first;
        while child != INVALID {
            self.delete_child(return_fiber, child);
            child = self.fibers.next_sibling[child as usize];
        }
    }

    fn use_fiber(&mut self, current: u32, input: FiberInput) -> u32 {
        let fiber = self.fibers.create_work_in_progress(current, input);
        self.fibers.index[fiber as usize] = 0;
        self.fibers.next_sibling[fiber as usize] = INVALID;
        fiber
    }

    fn create_from_element(&mut self, element: &Element) -> u32 {
        let kind = match element.ty {
            ElementType::Host(_) => FiberKind::HostComponent,
            ElementType::Component(_) => FiberKind::FunctionComponent,
            ElementType::Fragment => FiberKind::Fragment,
        };
        self.fibers.allocate(
            kind,
            element.key.clone(),
            Some(element.ty.clone()),
            input_for(element),
        )
    }

    fn create_text(&mut self, text: &Rc<str>) -> u32 {
        self.fibers
            .allocate(FiberKind::HostText, None, None, FiberInput::Text(text.clone()))
    }
}

fn input_for(element: &Element) -> FiberInput {
    match element.ty {
        ElementType::Fragment => FiberInput::Fragment(element.props.children.clone()),
        ElementType::Host(_) | ElementType::Component(_) => {
            FiberInput::Props(element.props.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::element::{Component, Props};

    fn keyed(keys: &[&str]) -> Child {
        Child::List(
            keys.iter()
                .map(|k| Element::host("li").key(*k).child(*k).into())
                .collect(),
        )
    }

    /// Mounts `children` under a fresh parent, as the committed tree.
    fn mount(store: &mut FiberStore<u32>, children: &Child) -> u32 {
        let parent = store.allocate(
            FiberKind::HostComponent,
            None,
            Some(ElementType::Host("ul".into())),
            FiberInput::Props(Rc::new(Props::new())),
        );
        let mut tracer = Tracer::none();
        let first =
            ChildReconciler::new(store, false, &mut tracer, 0).reconcile(parent, INVALID, children);
        store.first_child[parent as usize] = first;
        parent
    }

    /// Reconciles `children` against the committed `parent`; returns the
    /// work-in-progress parent.
    fn update(store: &mut FiberStore<u32>, parent: u32, children: &Child) -> u32 {
        let wip = store.create_work_in_progress(parent, FiberInput::Props(Rc::new(Props::new())));
        let current_first = store.first_child[parent as usize];
        let mut tracer = Tracer::none();
        let first = ChildReconciler::new(store, true, &mut tracer, 0).reconcile(
            wip,
            current_first,
            children,
        );
        store.first_child[wip as usize] = first;
        wip
    }

    fn placed_keys(store: &FiberStore<u32>, parent: u32) -> Vec<Key> {
        store
            .children(store.id_at(parent))
            .filter(|&c| store.flags(c).contains(Flags::PLACEMENT))
            .filter_map(|c| store.key(c).cloned())
            .collect()
    }

    fn child_keys(store: &FiberStore<u32>, parent: u32) -> Vec<Key> {
        store
            .children(store.id_at(parent))
            .filter_map(|c| store.key(c).cloned())
            .collect()
    }

    #[test]
    fn mount_flags_nothing() {
        let mut store = FiberStore::new();
        let parent = mount(&mut store, &keyed(&["a", "b"]));
        assert_eq!(child_keys(&store, parent), [Key::from("a"), Key::from("b")]);
        assert!(placed_keys(&store, parent).is_empty());
    }

    #[test]
    fn identical_list_reuses_every_fiber() {
        let mut store = FiberStore::new();
        let parent = mount(&mut store, &keyed(&["a", "b", "c"]));
        let wip = update(&mut store, parent, &keyed(&["a", "b", "c"]));
        assert!(placed_keys(&store, wip).is_empty());
        assert_eq!(store.flags[wip as usize], Flags::empty());
        for c in store.children(store.id_at(wip)) {
            assert!(store.peer(c).is_some(), "reused");
        }
    }

    #[test]
    fn moving_last_to_front_places_the_rest() {
        let mut store = FiberStore::new();
        let parent = mount(&mut store, &keyed(&["a", "b", "c"]));
        let wip = update(&mut store, parent, &keyed(&["c", "a", "b"]));
        assert_eq!(child_keys(&store, wip), [Key::from("c"), Key::from("a"), Key::from("b")]);
        assert_eq!(placed_keys(&store, wip), [Key::from("a"), Key::from("b")]);
        assert!(store.deletions[wip as usize].is_empty());
    }

    #[test]
    fn moving_first_to_back_places_only_it() {
        let mut store = FiberStore::new();
        let parent = mount(&mut store, &keyed(&["a", "b", "c"]));
        let wip = update(&mut store, parent, &keyed(&["b", "c", "a"]));
        assert_eq!(placed_keys(&store, wip), [Key::from("a")]);
    }

    #[test]
    fn removed_and_inserted_keys() {
        let mut store = FiberStore::new();
        let parent = mount(&mut store, &keyed(&["a", "b", "c"]));
        let wip = update(&mut store, parent, &keyed(&["a", "d", "c"]));
        assert_eq!(placed_keys(&store, wip), [Key::from("d")]);
        assert!(store.flags[wip as usize].contains(Flags::CHILD_DELETION));
        let deleted: Vec<Key> = store.deletions[wip as usize]
            .iter()
            .filter_map(|&d| store.key[d as usize].clone())
            .collect();
        assert_eq!(deleted, [Key::from("b")]);
    }

    #[test]
    fn type_change_at_same_key_replaces() {
        let mut store = FiberStore::new();
        let parent = mount(&mut store, &Element::host("div").key("x").into());
        let old = store.first_child[parent as usize];
        let wip = update(&mut store, parent, &Element::host("span").key("x").into());
        let new = store.first_child[wip as usize];
        assert_eq!(store.alternate[new as usize], INVALID, "fresh fiber");
        assert!(store.flags[new as usize].contains(Flags::PLACEMENT));
        assert_eq!(store.deletions[wip as usize], [old]);
    }

    #[test]
    fn key_match_with_type_change_drops_later_siblings() {
        let mut store = FiberStore::new();
        let parent = mount(
            &mut store,
            &Child::List(vec![
                Element::host("a").key("x").into(),
                Element::host("b").key("y").into(),
            ]),
        );
        let wip = update(&mut store, parent, &Element::host("c").key("x").into());
        assert_eq!(store.deletions[wip as usize].len(), 2);
    }

    #[test]
    fn single_text_reuses_text_fiber() {
        let mut store = FiberStore::new();
        let parent = mount(&mut store, &"hello".into());
        let wip = update(&mut store, parent, &"world".into());
        let text = store.first_child[wip as usize];
        assert_ne!(store.alternate[text as usize], INVALID);
        assert_eq!(store.pending_input[text as usize], FiberInput::Text("world".into()));
        assert!(store.deletions[wip as usize].is_empty());
    }

    #[test]
    fn single_text_reuses_a_later_text_sibling() {
        let mut store = FiberStore::new();
        let parent = mount(
            &mut store,
            &Child::List(vec![Element::host("i").key("k").into(), "x".into()]),
        );
        let old_i = store.first_child[parent as usize];
        let old_text = store.next_sibling[old_i as usize];
        let wip = update(&mut store, parent, &"y".into());
        let text = store.first_child[wip as usize];
        assert_eq!(store.alternate[text as usize], old_text);
        assert_eq!(store.deletions[wip as usize], [old_i]);
    }

    #[test]
    fn unkeyed_element_before_text_stops_the_scan() {
        let mut store = FiberStore::new();
        let parent = mount(&mut store, &Child::List(vec![Element::host("p").into(), "x".into()]));
        let wip = update(&mut store, parent, &"y".into());
        let text = store.first_child[wip as usize];
        assert_eq!(store.alternate[text as usize], INVALID, "fresh text");
        assert_eq!(store.deletions[wip as usize].len(), 2);
    }

    #[test]
    fn empty_deletes_everything() {
        let mut store = FiberStore::new();
        let parent = mount(&mut store, &keyed(&["a", "b"]));
        let wip = update(&mut store, parent, &Child::Empty);
        assert_eq!(store.first_child[wip as usize], INVALID);
        assert_eq!(store.deletions[wip as usize].len(), 2);
    }

    #[test]
    fn nested_lists_and_empty_entries_are_skipped() {
        let mut store = FiberStore::new();
        let list = Child::List(vec![
            "a".into(),
            Child::Empty,
            Child::List(vec!["ignored".into()]),
            "b".into(),
        ]);
        let parent = mount(&mut store, &list);
        let texts: Vec<u32> = store
            .children(store.id_at(parent))
            .map(|c| store.sibling_index(c))
            .collect();
        assert_eq!(texts, [0, 3], "positions keep their list index");
    }

    #[test]
    fn unkeyed_top_level_fragment_is_transparent() {
        let mut store = FiberStore::new();
        let parent = mount(&mut store, &Element::fragment(keyed(&["a", "b"])).into());
        assert_eq!(child_keys(&store, parent), [Key::from("a"), Key::from("b")]);
        let keyed_fragment = mount(&mut store, &Element::fragment(keyed(&["a"])).key("f").into());
        let first = store.first_child[keyed_fragment as usize];
        assert_eq!(store.kind[first as usize], FiberKind::Fragment);
    }

    #[test]
    fn component_identity_decides_reuse() {
        let a = Component::new("A", |_, _| Ok(Child::Empty));
        let b = Component::new("B", |_, _| Ok(Child::Empty));
        let mut store = FiberStore::new();
        let parent = mount(&mut store, &Element::component(&a).into());
        let wip = update(&mut store, parent, &Element::component(&a).into());
        let same = store.first_child[wip as usize];
        assert_ne!(store.alternate[same as usize], INVALID);

        let parent = mount(&mut store, &Element::component(&a).into());
        let wip = update(&mut store, parent, &Element::component(&b).into());
        assert_eq!(store.deletions[wip as usize].len(), 1);
    }
}
