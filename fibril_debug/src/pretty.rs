// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use fibril_core::trace::{
    CommitSummary, FiberMutation, PhaseBeginEvent, PhaseEndEvent, PhaseKind, RenderAbortedEvent,
    TraceSink, WarningEvent,
};

use crate::lane_name;

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn phase_name(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Render => "render",
        PhaseKind::Commit => "commit",
        PhaseKind::PassiveEffects => "effects",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] pass={} root={} {} lane={}",
            e.pass_index,
            e.root.0,
            phase_name(e.phase),
            lane_name(e.lane),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] pass={} root={} {}",
            e.pass_index,
            e.root.0,
            phase_name(e.phase),
        );
    }

    fn on_commit_summary(&mut self, s: &CommitSummary) {
        let mutation = if s.mutation_pass { "ran" } else { "skipped" };
        let _ = writeln!(
            self.writer,
            "[commit] pass={} root={} lane={} mutations={mutation} placed={} updated={} \
             deleted={} effects={}",
            s.pass_index,
            s.root.0,
            lane_name(s.lane),
            s.placements,
            s.updates,
            s.deletions,
            s.passive_effects,
        );
    }

    fn on_warning(&mut self, e: &WarningEvent) {
        let _ = writeln!(
            self.writer,
            "[warning] pass={} fiber={} {:?}",
            e.pass_index, e.fiber, e.kind,
        );
    }

    fn on_render_aborted(&mut self, e: &RenderAbortedEvent) {
        let _ = writeln!(
            self.writer,
            "[aborted] pass={} root={} lane={} reason={:?}",
            e.pass_index,
            e.root.0,
            lane_name(e.lane),
            e.reason,
        );
    }

    fn on_fiber_mutations(&mut self, pass_index: u64, mutations: &[FiberMutation]) {
        let _ = writeln!(
            self.writer,
            "[fibers] pass={pass_index} mutations={}",
            mutations.len(),
        );
    }
}

#[cfg(test)]
mod tests {
    use fibril_core::fiber::RootId;
    use fibril_core::lanes::Lanes;

    use super::*;

    #[test]
    fn pretty_print_commit() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_commit_summary(&CommitSummary {
            placements: 2,
            ..CommitSummary::new(3, RootId(0), Lanes::SYNC)
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.starts_with("[commit]"), "got: {output}");
        assert!(output.contains("pass=3"), "got: {output}");
        assert!(output.contains("lane=sync"), "got: {output}");
        assert!(output.contains("placed=2"), "got: {output}");
    }

    #[test]
    fn passive_phase_has_no_lane() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_phase_begin(&PhaseBeginEvent {
            pass_index: 1,
            root: RootId(0),
            phase: PhaseKind::PassiveEffects,
            lane: Lanes::empty(),
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(output, "[phase:begin] pass=1 root=0 effects lane=none\n");
    }
}
