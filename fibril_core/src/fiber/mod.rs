// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fiber storage, identity, and traversal.
//!
//! Every root owns two trees of fibers: the committed (current) tree and the
//! work-in-progress tree being rendered. Both live in one [`FiberStore`];
//! paired fibers point at each other through their `alternate` slot, so a
//! render reuses the previous work-in-progress slots instead of allocating.

mod id;
mod store;
mod traverse;

pub use id::{FiberId, INVALID, RootId};
pub use store::{FiberInput, FiberKind, FiberStore};
pub(crate) use store::FiberState;
pub use traverse::{Children, Descendants};
