// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, each stamped with the
//! nanoseconds elapsed since the recorder was created. [`decode`] reads them
//! back as an iterator of [`Record`].
//!
//! Rich events ([`on_fiber_mutations`](TraceSink::on_fiber_mutations)) store
//! only the count.

use std::time::Instant;

use fibril_core::fiber::RootId;
use fibril_core::lanes::Lanes;
use fibril_core::trace::{
    AbortReason, CommitSummary, FiberMutation, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    RenderAbortedEvent, TraceSink, WarningEvent, WarningKind,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_PHASE_BEGIN: u8 = 1;
const TAG_PHASE_END: u8 = 2;
const TAG_COMMIT_SUMMARY: u8 = 3;
const TAG_WARNING: u8 = 4;
const TAG_RENDER_ABORTED: u8 = 5;
const TAG_FIBER_MUTATIONS_COUNT: u8 = 6;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug)]
pub struct RecorderSink {
    start: Instant,
    buf: Vec<u8>,
}

impl Default for RecorderSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderSink {
    /// Creates an empty recorder whose clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Creates an empty recorder measuring from `start`.
    #[must_use]
    pub fn starting_at(start: Instant) -> Self {
        Self {
            start,
            buf: Vec::new(),
        }
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn begin_record(&mut self, tag: u8) {
        let elapsed = self.start.elapsed().as_nanos();
        self.write_u8(tag);
        self.write_u64(u64::try_from(elapsed).unwrap_or(u64::MAX));
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_phase_event(&mut self, pass_index: u64, root: RootId, phase: PhaseKind, lane: Lanes) {
        self.write_u64(pass_index);
        self.write_u32(root.0);
        self.write_u8(match phase {
            PhaseKind::Render => 0,
            PhaseKind::Commit => 1,
            PhaseKind::PassiveEffects => 2,
        });
        self.write_u32(lane.bits());
    }
}

impl TraceSink for RecorderSink {
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.begin_record(TAG_PHASE_BEGIN);
        self.write_phase_event(e.pass_index, e.root, e.phase, e.lane);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.begin_record(TAG_PHASE_END);
        self.write_phase_event(e.pass_index, e.root, e.phase, e.lane);
    }

    fn on_commit_summary(&mut self, s: &CommitSummary) {
        self.begin_record(TAG_COMMIT_SUMMARY);
        self.write_u64(s.pass_index);
        self.write_u32(s.root.0);
        self.write_u32(s.lane.bits());
        self.write_u8(u8::from(s.mutation_pass));
        self.write_u32(s.placements);
        self.write_u32(s.updates);
        self.write_u32(s.deletions);
        self.write_u32(s.passive_effects);
    }

    fn on_warning(&mut self, e: &WarningEvent) {
        self.begin_record(TAG_WARNING);
        self.write_u64(e.pass_index);
        self.write_u8(match e.kind {
            WarningKind::NestedChildList => 0,
            WarningKind::MissingHostParent => 1,
        });
        self.write_u32(e.fiber);
    }

    fn on_render_aborted(&mut self, e: &RenderAbortedEvent) {
        self.begin_record(TAG_RENDER_ABORTED);
        self.write_u64(e.pass_index);
        self.write_u32(e.root.0);
        self.write_u32(e.lane.bits());
        self.write_u8(match e.reason {
            AbortReason::HookMismatch => 0,
            AbortReason::HookOutsideComponent => 1,
            AbortReason::Component => 2,
            AbortReason::NestedUpdateLimit => 3,
            AbortReason::UnknownRoot => 4,
        });
    }

    fn on_fiber_mutations(&mut self, pass_index: u64, mutations: &[FiberMutation]) {
        self.begin_record(TAG_FIBER_MUTATIONS_COUNT);
        self.write_u64(pass_index);
        self.write_u32(u32::try_from(mutations.len()).unwrap_or(u32::MAX));
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`CommitSummary`].
    CommitSummary(CommitSummary),
    /// A [`WarningEvent`].
    Warning(WarningEvent),
    /// A [`RenderAbortedEvent`].
    RenderAborted(RenderAbortedEvent),
    /// Fiber-mutation count for a pass.
    FiberMutationsCount {
        /// Render-pass counter.
        pass_index: u64,
        /// Number of mutated fibers.
        count: u32,
    },
}

/// One decoded record.
#[derive(Clone, Debug)]
pub struct Record {
    /// Nanoseconds since the recorder started.
    pub at_ns: u64,
    /// The event.
    pub event: RecordedEvent,
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`Record`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded records.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_lane(&mut self) -> Option<Lanes> {
        self.read_u32().map(Lanes::from_bits_retain)
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        Some(match self.read_u8()? {
            0 => PhaseKind::Render,
            1 => PhaseKind::Commit,
            _ => PhaseKind::PassiveEffects,
        })
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            pass_index: self.read_u64()?,
            root: RootId(self.read_u32()?),
            phase: self.read_phase()?,
            lane: self.read_lane()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            pass_index: self.read_u64()?,
            root: RootId(self.read_u32()?),
            phase: self.read_phase()?,
            lane: self.read_lane()?,
        }))
    }

    fn decode_commit_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::CommitSummary(CommitSummary {
            pass_index: self.read_u64()?,
            root: RootId(self.read_u32()?),
            lane: self.read_lane()?,
            mutation_pass: self.read_u8()? != 0,
            placements: self.read_u32()?,
            updates: self.read_u32()?,
            deletions: self.read_u32()?,
            passive_effects: self.read_u32()?,
        }))
    }

    fn decode_warning(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Warning(WarningEvent {
            pass_index: self.read_u64()?,
            kind: match self.read_u8()? {
                0 => WarningKind::NestedChildList,
                _ => WarningKind::MissingHostParent,
            },
            fiber: self.read_u32()?,
        }))
    }

    fn decode_render_aborted(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::RenderAborted(RenderAbortedEvent {
            pass_index: self.read_u64()?,
            root: RootId(self.read_u32()?),
            lane: self.read_lane()?,
            reason: match self.read_u8()? {
                0 => AbortReason::HookMismatch,
                1 => AbortReason::HookOutsideComponent,
                2 => AbortReason::Component,
                3 => AbortReason::NestedUpdateLimit,
                _ => AbortReason::UnknownRoot,
            },
        }))
    }

    fn decode_fiber_mutations_count(&mut self) -> Option<RecordedEvent> {
        let pass_index = self.read_u64()?;
        let count = self.read_u32()?;
        Some(RecordedEvent::FiberMutationsCount { pass_index, count })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        let at_ns = self.read_u64()?;
        let event = match tag {
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_COMMIT_SUMMARY => self.decode_commit_summary(),
            TAG_WARNING => self.decode_warning(),
            TAG_RENDER_ABORTED => self.decode_render_aborted(),
            TAG_FIBER_MUTATIONS_COUNT => self.decode_fiber_mutations_count(),
            _ => None, // unknown tag → stop iteration
        }?;
        Some(Record { at_ns, event })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
