// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The node arena and its [`HostAdapter`] implementation.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::vec::Vec;

use fibril_core::backend::HostAdapter;
use fibril_core::element::{Handler, PropValue, Props};

/// Handle to a node owned by a [`MemoryHost`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

/// What a node holds.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// A root container. Serializes as its children only.
    Container,
    /// A tagged element with attributes.
    Element {
        /// Element type name.
        tag: Rc<str>,
        /// Attributes from the last committed props.
        attrs: BTreeMap<Rc<str>, PropValue>,
    },
    /// A text leaf.
    Text(Rc<str>),
}

/// One node in the arena.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// Node payload.
    pub kind: NodeKind,
    /// Attached parent, if any.
    pub parent: Option<NodeId>,
    /// Attached children in order.
    pub children: Vec<NodeId>,
}

/// One adapter call, as recorded in the mutation log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    /// An element was created.
    Create {
        /// The new node.
        node: NodeId,
        /// Its tag.
        tag: Rc<str>,
    },
    /// A text node was created.
    CreateText {
        /// The new node.
        node: NodeId,
        /// Its content.
        text: Rc<str>,
    },
    /// A child was attached while building a detached subtree.
    AppendInitial {
        /// Parent node.
        parent: NodeId,
        /// Appended node.
        child: NodeId,
    },
    /// A child was moved or attached at the end of `parent`.
    Append {
        /// Parent node.
        parent: NodeId,
        /// Appended node.
        child: NodeId,
    },
    /// A child was moved or attached before `before`.
    Insert {
        /// Parent node.
        parent: NodeId,
        /// Inserted node.
        child: NodeId,
        /// Anchor sibling.
        before: NodeId,
    },
    /// A child was detached.
    Remove {
        /// Former parent.
        parent: NodeId,
        /// Detached node.
        child: NodeId,
    },
    /// Element attributes were replaced.
    Update {
        /// Updated node.
        node: NodeId,
    },
    /// Text content was replaced.
    UpdateText {
        /// Updated node.
        node: NodeId,
        /// New content.
        text: Rc<str>,
    },
}

/// An in-memory output medium.
///
/// Nodes are never freed: a removed node stays addressable (with no parent)
/// so tests can inspect what was detached.
#[derive(Clone, Debug, Default)]
pub struct MemoryHost {
    nodes: Vec<Node>,
    log: Vec<Mutation>,
}

fn attrs_of(props: &Props) -> BTreeMap<Rc<str>, PropValue> {
    props
        .attrs()
        .map(|(name, value)| (Rc::from(name), value.clone()))
        .collect()
}

impl MemoryHost {
    /// Creates an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a root container for [`Reconciler::create_root`].
    ///
    /// [`Reconciler::create_root`]: fibril_core::Reconciler::create_root
    pub fn create_container(&mut self) -> NodeId {
        self.alloc(NodeKind::Container)
    }

    /// Number of nodes ever created, containers included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the node for `id`.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    /// Attached children of `id`, empty for unknown ids.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |n| n.children.as_slice())
    }

    /// Attached parent of `id`.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Tag of an element node.
    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.kind {
            NodeKind::Element { tag, .. } => Some(&**tag),
            _ => None,
        }
    }

    /// Content of a text node.
    #[must_use]
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.kind {
            NodeKind::Text(text) => Some(&**text),
            _ => None,
        }
    }

    /// Committed attribute `name` of an element node.
    #[must_use]
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&PropValue> {
        match &self.node(id)?.kind {
            NodeKind::Element { attrs, .. } => attrs.get(name),
            _ => None,
        }
    }

    /// Committed handler attribute `name` of an element node.
    #[must_use]
    pub fn handler(&self, id: NodeId, name: &str) -> Option<Handler> {
        match self.attr(id, name)? {
            PropValue::Handler(h) => Some(h.clone()),
            _ => None,
        }
    }

    /// Invokes handler `name` on `id`. Returns `false` if there is none.
    pub fn fire(&self, id: NodeId, name: &str) -> bool {
        let Some(handler) = self.handler(id, name) else {
            return false;
        };
        handler.call();
        true
    }

    /// First attached element with `tag` under `root`, in document order.
    #[must_use]
    pub fn find_by_tag(&self, root: NodeId, tag: &str) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if self.tag(id) == Some(tag) {
                return Some(id);
            }
            stack.extend(self.children(id).iter().rev());
        }
        None
    }

    /// The mutation log since the last [`take_mutations`](Self::take_mutations).
    #[must_use]
    pub fn mutations(&self) -> &[Mutation] {
        &self.log
    }

    /// Drains the mutation log.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        core::mem::take(&mut self.log)
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "node counts stay far below u32::MAX"
        )]
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        let len = self.nodes.len();
        assert!((id.0 as usize) < len, "unknown NodeId {id:?}");
        &mut self.nodes[id.0 as usize]
    }

    /// Detaches `child` from wherever it is attached.
    fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.node_mut(child).parent.take() {
            self.node_mut(parent).children.retain(|&c| c != child);
        }
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, before: Option<NodeId>) {
        self.detach(child);
        self.node_mut(child).parent = Some(parent);
        let children = &mut self.node_mut(parent).children;
        let at = before
            .and_then(|b| children.iter().position(|&c| c == b))
            .unwrap_or(children.len());
        children.insert(at, child);
    }
}

impl HostAdapter for MemoryHost {
    type Handle = NodeId;

    fn create_instance(&mut self, ty: &str, props: &Props) -> NodeId {
        let tag: Rc<str> = Rc::from(ty);
        let node = self.alloc(NodeKind::Element {
            tag: tag.clone(),
            attrs: attrs_of(props),
        });
        self.log.push(Mutation::Create { node, tag });
        node
    }

    fn create_text_instance(&mut self, text: &str) -> NodeId {
        let text: Rc<str> = Rc::from(text);
        let node = self.alloc(NodeKind::Text(text.clone()));
        self.log.push(Mutation::CreateText { node, text });
        node
    }

    fn append_initial_child(&mut self, parent: &NodeId, child: &NodeId) {
        self.attach(*parent, *child, None);
        self.log.push(Mutation::AppendInitial {
            parent: *parent,
            child: *child,
        });
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) {
        self.attach(*parent, *child, None);
        self.log.push(Mutation::Append {
            parent: *parent,
            child: *child,
        });
    }

    fn insert_before(&mut self, parent: &NodeId, child: &NodeId, before: &NodeId) {
        self.attach(*parent, *child, Some(*before));
        self.log.push(Mutation::Insert {
            parent: *parent,
            child: *child,
            before: *before,
        });
    }

    fn remove_child(&mut self, parent: &NodeId, child: &NodeId) {
        self.detach(*child);
        self.log.push(Mutation::Remove {
            parent: *parent,
            child: *child,
        });
    }

    fn commit_update(&mut self, handle: &NodeId, _old: &Props, new: &Props) {
        if let NodeKind::Element { attrs, .. } = &mut self.node_mut(*handle).kind {
            *attrs = attrs_of(new);
        }
        self.log.push(Mutation::Update { node: *handle });
    }

    fn commit_text_update(&mut self, handle: &NodeId, _old: &str, new: &str) {
        let text: Rc<str> = Rc::from(new);
        if let NodeKind::Text(content) = &mut self.node_mut(*handle).kind {
            *content = text.clone();
        }
        self.log.push(Mutation::UpdateText {
            node: *handle,
            text,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_moves_between_parents() {
        let mut host = MemoryHost::new();
        let a = host.create_container();
        let b = host.create_container();
        let t = host.create_text_instance("x");
        host.append_child(&a, &t);
        host.append_child(&b, &t);
        assert!(host.children(a).is_empty());
        assert_eq!(host.children(b), [t]);
        assert_eq!(host.parent(t), Some(b));
    }

    #[test]
    fn insert_before_orders_children() {
        let mut host = MemoryHost::new();
        let root = host.create_container();
        let a = host.create_text_instance("a");
        let c = host.create_text_instance("c");
        let b = host.create_text_instance("b");
        host.append_child(&root, &a);
        host.append_child(&root, &c);
        host.insert_before(&root, &b, &c);
        assert_eq!(host.children(root), [a, b, c]);

        // Reinserting an attached node moves it.
        host.insert_before(&root, &c, &a);
        assert_eq!(host.children(root), [c, a, b]);
    }

    #[test]
    fn remove_keeps_the_node_addressable() {
        let mut host = MemoryHost::new();
        let root = host.create_container();
        let p = host.create_instance("p", &Props::new());
        host.append_child(&root, &p);
        host.remove_child(&root, &p);
        assert_eq!(host.parent(p), None);
        assert_eq!(host.tag(p), Some("p"));
        assert_eq!(host.take_mutations().len(), 3);
        assert!(host.mutations().is_empty());
    }

    #[test]
    fn fire_without_handler_is_false() {
        let mut host = MemoryHost::new();
        let mut props = Props::new();
        props.set("title", "hi");
        let p = host.create_instance("p", &props);
        assert!(!host.fire(p, "title"));
        assert!(!host.fire(p, "onClick"));
    }

    #[test]
    #[should_panic(expected = "unknown NodeId")]
    fn unknown_node_panics() {
        let mut host = MemoryHost::new();
        let root = host.create_container();
        host.append_child(&root, &NodeId(9));
    }
}
