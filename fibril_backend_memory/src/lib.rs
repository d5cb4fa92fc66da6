// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory output medium for fibril.
//!
//! [`MemoryHost`] implements [`HostAdapter`] over a node arena:
//!
//! - every adapter call is appended to a [`Mutation`] log, so tests can
//!   assert on exactly what a commit did
//! - [`MemoryHost::markup`] serializes a subtree as compact markup
//! - [`MemoryHost::fire`] invokes a handler attribute, which is how tests and
//!   demos simulate input
//!
//! ```
//! use fibril_backend_memory::MemoryHost;
//! use fibril_core::{Element, Reconciler, ReconcilerConfig};
//!
//! let mut host = MemoryHost::new();
//! let container = host.create_container();
//! let mut reconciler = Reconciler::new(host, ReconcilerConfig::new());
//! let root = reconciler.create_root(container);
//!
//! reconciler
//!     .render(root, Element::host("p").attr("id", "greeting").child("hello"))
//!     .unwrap();
//! reconciler.run_until_idle().unwrap();
//! assert_eq!(
//!     reconciler.adapter().markup(container),
//!     r#"<p id="greeting">hello</p>"#
//! );
//! ```

#![no_std]

extern crate alloc;

mod host;
mod markup;

pub use fibril_core::backend::HostAdapter;
pub use host::{MemoryHost, Mutation, Node, NodeId, NodeKind};
