// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental tree reconciliation.
//!
//! `fibril_core` turns immutable tree descriptions into a minimal sequence of
//! output mutations. It is `no_std` compatible (with `alloc`) and stores
//! fibers in struct-of-arrays form with index handles.
//!
//! # Architecture
//!
//! ```text
//!   render(root, element) / Dispatch::set
//!       │  UpdateQueue + lanes
//!       ▼
//!   Schedule ──► TaskQueue ──► Reconciler::run_until_idle()
//!                                   │
//!                 ┌─────────────────┘
//!                 ▼
//!   render pass (begin / complete) ──► finished tree
//!                                          │
//!                 ┌────────────────────────┘
//!                 ▼
//!   commit ──► HostAdapter calls ──► passive effects
//! ```
//!
//! **[`element`]**: Descriptions: elements, props, keys, components.
//!
//! **[`fiber`]**: Struct-of-arrays fiber store with generational handles.
//! Current and work-in-progress fibers are paired through `alternate`.
//!
//! **[`hooks`]**: The [`Hooks`](hooks::Hooks) context: `use_state` and
//! `use_effect`, matched by call order across renders.
//!
//! **[`lanes`]**: Update priorities and per-root pending bookkeeping, with
//! scheduled roots tracked by `understory_dirty`.
//!
//! **[`update_queue`]**: Circular queues of pending state transitions.
//!
//! **[`scheduler`]**: Configuration and the microtask / callback queue.
//!
//! **[`reconciler`]**: The [`Reconciler`](reconciler::Reconciler) driver.
//!
//! **[`backend`]**: The [`HostAdapter`](backend::HostAdapter) trait output
//! media implement, and the optional
//! [`HostScheduler`](backend::HostScheduler) wake-up hook.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! render and commit instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-fiber
//!   mutation events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod backend;
pub mod element;
pub mod error;
pub mod fiber;
pub mod flags;
pub mod hooks;
pub mod lanes;
pub mod reconciler;
pub mod scheduler;
pub mod trace;
pub mod update_queue;

mod commit;
mod reconcile;
mod work_loop;

#[cfg(test)]
mod test_host;

pub use element::{Child, Component, Element, Key, Props};
pub use error::RenderError;
pub use hooks::{Dispatch, Hooks};
pub use reconciler::Reconciler;
pub use scheduler::ReconcilerConfig;
