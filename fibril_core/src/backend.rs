// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend contract for output media.
//!
//! The reconciler never touches an output tree directly. A backend crate
//! provides a [`HostAdapter`] that creates, links, and updates output nodes,
//! and optionally a [`HostScheduler`] that arranges for queued work to run.
//!
//! # Crate boundaries
//!
//! `fibril_core` owns the description model, the fiber trees, rendering,
//! commit, and scheduling bookkeeping. Backend crates depend on
//! `fibril_core` and provide the output glue. Application code depends on
//! both and drives the task queue from its event loop.
//!
//! # Event loop pseudocode
//!
//! ```rust,ignore
//! let mut reconciler = Reconciler::new(host, ReconcilerConfig::new());
//! let root = reconciler.create_root(container);
//! reconciler.render(root, Element::component(&app))?;
//!
//! loop {
//!     // Microtasks first (synchronous renders), then deferred callbacks
//!     // (passive effects, lower-priority renders).
//!     reconciler.run_until_idle()?;
//!     wait_for_input_and_fire_handlers();
//! }
//! ```

use crate::element::Props;
use crate::lanes::Lanes;

/// Creates and mutates output nodes on behalf of the reconciler.
///
/// All calls happen during commit, except [`create_instance`],
/// [`create_text_instance`], and [`append_initial_child`], which happen while
/// a newly created subtree is completed and before it is attached anywhere.
///
/// [`create_instance`]: Self::create_instance
/// [`create_text_instance`]: Self::create_text_instance
/// [`append_initial_child`]: Self::append_initial_child
pub trait HostAdapter {
    /// A reference to an output node. Root containers are handles too.
    type Handle: Clone;

    /// Creates a detached output node of type `ty`.
    fn create_instance(&mut self, ty: &str, props: &Props) -> Self::Handle;

    /// Creates a detached text node.
    fn create_text_instance(&mut self, text: &str) -> Self::Handle;

    /// Appends `child` to a node that is not yet attached.
    fn append_initial_child(&mut self, parent: &Self::Handle, child: &Self::Handle);

    /// Appends `child` as the last child of an attached `parent`.
    ///
    /// If `child` is already a child of `parent` it moves to the end.
    fn append_child(&mut self, parent: &Self::Handle, child: &Self::Handle);

    /// Inserts `child` before `before` in `parent`.
    ///
    /// If `child` is already a child of `parent` it moves.
    fn insert_before(&mut self, parent: &Self::Handle, child: &Self::Handle, before: &Self::Handle);

    /// Removes `child` from `parent`.
    fn remove_child(&mut self, parent: &Self::Handle, child: &Self::Handle);

    /// Applies changed attributes to an existing node.
    fn commit_update(&mut self, handle: &Self::Handle, old: &Props, new: &Props);

    /// Replaces the content of a text node.
    fn commit_text_update(&mut self, handle: &Self::Handle, old: &str, new: &str);
}

/// Wakes the host event loop when the reconciler queues work.
///
/// The reconciler keeps its own task queue; these hooks only tell the host
/// that a drain is due. Both default to doing nothing, which suits hosts that
/// poll [`Reconciler::run_until_idle`](crate::reconciler::Reconciler::run_until_idle)
/// after every event.
pub trait HostScheduler {
    /// A microtask was queued; drain microtasks before yielding.
    fn schedule_microtask(&mut self) {}

    /// A deferred callback was queued at `lane`.
    fn schedule_callback(&mut self, lane: Lanes) {
        _ = lane;
    }
}

/// A [`HostScheduler`] that ignores all wake-ups.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopScheduler;

impl HostScheduler for NoopScheduler {}
