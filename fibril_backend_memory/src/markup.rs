// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact markup serialization.

use alloc::format;
use alloc::string::String;
use core::fmt::Write;

use fibril_core::element::PropValue;

use crate::host::{MemoryHost, NodeId, NodeKind};

impl MemoryHost {
    /// Serializes `id` as markup.
    ///
    /// Containers serialize as their children. Elements print non-handler
    /// attributes in name order; text is escaped.
    #[must_use]
    pub fn markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Container) => self.children_markup(id, &mut out),
            Some(_) => self.write_node(id, &mut out),
            None => {}
        }
        out
    }

    fn children_markup(&self, id: NodeId, out: &mut String) {
        for &child in self.children(id) {
            self.write_node(child, out);
        }
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Container => self.children_markup(id, out),
            NodeKind::Text(text) => escape(text, out),
            NodeKind::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    if matches!(value, PropValue::Handler(_)) {
                        continue;
                    }
                    let _ = write!(out, " {name}=\"");
                    escape(&format!("{value}"), out);
                    out.push('"');
                }
                out.push('>');
                self.children_markup(id, out);
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

fn escape(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}
