// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for render and commit passes.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! reconciler calls at each stage. All method bodies default to no-ops, so
//! implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! The core has no clock. Sinks that want timestamps read their own (see the
//! `fibril_debug` recorder).
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates per-fiber [`FiberMutation`]
//!   events and the corresponding `TraceSink` method.

use crate::error::RenderError;
use crate::fiber::RootId;
use crate::lanes::Lanes;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of a pass is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Building the work-in-progress tree.
    Render,
    /// Applying output mutations and swapping trees.
    Commit,
    /// Running effect cleanups and effect bodies.
    PassiveEffects,
}

/// Non-fatal conditions the reconciler tolerated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// A list appeared directly inside a child list and was skipped.
    NestedChildList,
    /// A placed fiber had no host ancestor to attach to.
    MissingHostParent,
}

/// Why a render was abandoned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AbortReason {
    /// Hook count or kind differed from the previous render.
    HookMismatch,
    /// A hook ran with no component render in progress.
    HookOutsideComponent,
    /// A component returned an error.
    Component,
    /// Too many nested synchronous renders.
    NestedUpdateLimit,
    /// The root was not known.
    UnknownRoot,
}

impl From<&RenderError> for AbortReason {
    fn from(e: &RenderError) -> Self {
        match e {
            RenderError::HookCountMismatch { .. } | RenderError::HookKindMismatch { .. } => {
                Self::HookMismatch
            }
            RenderError::HookOutsideComponent => Self::HookOutsideComponent,
            RenderError::Component(_) => Self::Component,
            RenderError::NestedUpdateLimit { .. } => Self::NestedUpdateLimit,
            RenderError::UnknownRoot(_) => Self::UnknownRoot,
        }
    }
}

/// What commit did to a fiber.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MutationOp {
    /// Output inserted or moved.
    Placement,
    /// Attributes or text updated.
    Update,
    /// Subtree removed.
    Deletion,
    /// Passive effects queued.
    PassiveEffect,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Marks the beginning of a phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Monotonic render-pass counter.
    pub pass_index: u64,
    /// Which root.
    pub root: RootId,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// The lane being processed.
    pub lane: Lanes,
}

/// Marks the end of a phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Monotonic render-pass counter.
    pub pass_index: u64,
    /// Which root.
    pub root: RootId,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// The lane being processed.
    pub lane: Lanes,
}

/// Per-commit mutation counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitSummary {
    /// Monotonic render-pass counter.
    pub pass_index: u64,
    /// Which root.
    pub root: RootId,
    /// The committed lane.
    pub lane: Lanes,
    /// Whether the mutation pass ran at all.
    pub mutation_pass: bool,
    /// Fibers placed.
    pub placements: u32,
    /// Fibers updated.
    pub updates: u32,
    /// Subtrees deleted.
    pub deletions: u32,
    /// Fibers whose passive effects were queued.
    pub passive_effects: u32,
}

impl CommitSummary {
    /// A summary with all counts at zero.
    #[must_use]
    pub const fn new(pass_index: u64, root: RootId, lane: Lanes) -> Self {
        Self {
            pass_index,
            root,
            lane,
            mutation_pass: false,
            placements: 0,
            updates: 0,
            deletions: 0,
            passive_effects: 0,
        }
    }
}

/// A tolerated problem.
#[derive(Clone, Copy, Debug)]
pub struct WarningEvent {
    /// Monotonic render-pass counter.
    pub pass_index: u64,
    /// What happened.
    pub kind: WarningKind,
    /// Slot index of the fiber involved.
    pub fiber: u32,
}

/// Emitted when a render is abandoned.
#[derive(Clone, Copy, Debug)]
pub struct RenderAbortedEvent {
    /// Monotonic render-pass counter.
    pub pass_index: u64,
    /// Which root.
    pub root: RootId,
    /// The lane being processed.
    pub lane: Lanes,
    /// Why.
    pub reason: AbortReason,
}

/// A per-commit fiber mutation record.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FiberMutation {
    /// Slot index of the fiber.
    pub fiber: u32,
    /// What commit did.
    pub op: MutationOp,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the reconciler.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called at the beginning of a phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called after each commit.
    fn on_commit_summary(&mut self, s: &CommitSummary) {
        _ = s;
    }

    /// Called for tolerated problems.
    fn on_warning(&mut self, e: &WarningEvent) {
        _ = e;
    }

    /// Called when a render is abandoned.
    fn on_render_aborted(&mut self, e: &RenderAbortedEvent) {
        _ = e;
    }

    /// Called with per-commit fiber mutations (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    fn on_fiber_mutations(&mut self, pass_index: u64, mutations: &[FiberMutation]) {
        _ = (pass_index, mutations);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Returns `true` if events reach a sink.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CommitSummary`].
    #[inline]
    pub fn commit_summary(&mut self, summary: &CommitSummary) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_commit_summary(summary);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = summary;
        }
    }

    /// Emits a [`WarningEvent`].
    #[inline]
    pub fn warning(&mut self, e: &WarningEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_warning(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RenderAbortedEvent`].
    #[inline]
    pub fn render_aborted(&mut self, e: &RenderAbortedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_render_aborted(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits per-fiber mutations.
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn fiber_mutations(&mut self, pass_index: u64, mutations: &[FiberMutation]) {
        if let Some(s) = &mut self.sink {
            s.on_fiber_mutations(pass_index, mutations);
        }
    }
}
