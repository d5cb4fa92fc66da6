// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A recording [`HostAdapter`] for unit tests.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::backend::HostAdapter;
use crate::element::Props;

/// One adapter call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Op {
    Create(u32, String),
    CreateText(u32, String),
    AppendInitial(u32, u32),
    Append(u32, u32),
    Insert(u32, u32, u32),
    Remove(u32, u32),
    Update(u32),
    UpdateText(u32, String),
}

#[derive(Debug)]
enum Node {
    Element(String),
    Text(String),
}

/// Records every call and keeps a child-order model for assertions.
#[derive(Debug, Default)]
pub(crate) struct RecordingHost {
    next: u32,
    pub(crate) ops: Vec<Op>,
    nodes: BTreeMap<u32, Node>,
    children: BTreeMap<u32, Vec<u32>>,
}

impl RecordingHost {
    pub(crate) fn container(&mut self) -> u32 {
        self.alloc(Node::Element("root".to_string()))
    }

    pub(crate) fn take_ops(&mut self) -> Vec<Op> {
        core::mem::take(&mut self.ops)
    }

    /// Serializes the children of `handle` as compact markup.
    pub(crate) fn markup(&self, handle: u32) -> String {
        let mut out = String::new();
        for &child in self.children.get(&handle).into_iter().flatten() {
            match &self.nodes[&child] {
                Node::Text(text) => out.push_str(text),
                Node::Element(tag) => {
                    out.push_str(&format!("<{tag}>{}</{tag}>", self.markup(child)));
                }
            }
        }
        out
    }

    fn alloc(&mut self, node: Node) -> u32 {
        let id = self.next;
        self.next += 1;
        self.nodes.insert(id, node);
        id
    }

    fn detach(&mut self, parent: u32, child: u32) {
        if let Some(list) = self.children.get_mut(&parent) {
            list.retain(|&c| c != child);
        }
    }
}

impl HostAdapter for RecordingHost {
    type Handle = u32;

    fn create_instance(&mut self, ty: &str, _props: &Props) -> u32 {
        let id = self.alloc(Node::Element(ty.to_string()));
        self.ops.push(Op::Create(id, ty.to_string()));
        id
    }

    fn create_text_instance(&mut self, text: &str) -> u32 {
        let id = self.alloc(Node::Text(text.to_string()));
        self.ops.push(Op::CreateText(id, text.to_string()));
        id
    }

    fn append_initial_child(&mut self, parent: &u32, child: &u32) {
        self.children.entry(*parent).or_default().push(*child);
        self.ops.push(Op::AppendInitial(*parent, *child));
    }

    fn append_child(&mut self, parent: &u32, child: &u32) {
        self.detach(*parent, *child);
        self.children.entry(*parent).or_default().push(*child);
        self.ops.push(Op::Append(*parent, *child));
    }

    fn insert_before(&mut self, parent: &u32, child: &u32, before: &u32) {
        self.detach(*parent, *child);
        let list = self.children.entry(*parent).or_default();
        let at = list.iter().position(|c| c == before).unwrap_or(list.len());
        list.insert(at, *child);
        self.ops.push(Op::Insert(*parent, *child, *before));
    }

    fn remove_child(&mut self, parent: &u32, child: &u32) {
        self.detach(*parent, *child);
        self.ops.push(Op::Remove(*parent, *child));
    }

    fn commit_update(&mut self, handle: &u32, _old: &Props, _new: &Props) {
        self.ops.push(Op::Update(*handle));
    }

    fn commit_text_update(&mut self, handle: &u32, _old: &str, new: &str) {
        if let Some(Node::Text(text)) = self.nodes.get_mut(handle) {
            *text = new.to_string();
        }
        self.ops.push(Op::UpdateText(*handle, new.to_string()));
    }
}
