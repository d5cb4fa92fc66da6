// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//! Each root is shown as its own process.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::lane_name;
use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for record in decode(bytes) {
        let ts = nanos_to_us(record.at_ns);
        match record.event {
            RecordedEvent::PhaseBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": format!("{:?}", e.phase),
                    "cat": "Pass",
                    "ts": ts,
                    "pid": e.root.0,
                    "tid": 0,
                    "args": {
                        "pass_index": e.pass_index,
                        "lane": lane_name(e.lane),
                    }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": format!("{:?}", e.phase),
                    "cat": "Pass",
                    "ts": ts,
                    "pid": e.root.0,
                    "tid": 0,
                    "args": {
                        "pass_index": e.pass_index,
                    }
                }));
            }
            RecordedEvent::CommitSummary(s) => {
                events.push(json!({
                    "ph": "i",
                    "name": "CommitSummary",
                    "cat": "Summary",
                    "ts": ts,
                    "pid": s.root.0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "pass_index": s.pass_index,
                        "lane": lane_name(s.lane),
                        "mutation_pass": s.mutation_pass,
                        "placements": s.placements,
                        "updates": s.updates,
                        "deletions": s.deletions,
                        "passive_effects": s.passive_effects,
                    }
                }));
            }
            RecordedEvent::Warning(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("{:?}", e.kind),
                    "cat": "Warning",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "pass_index": e.pass_index,
                        "fiber": e.fiber,
                    }
                }));
            }
            RecordedEvent::RenderAborted(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "RenderAborted",
                    "cat": "Pass",
                    "ts": ts,
                    "pid": e.root.0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "pass_index": e.pass_index,
                        "lane": lane_name(e.lane),
                        "reason": format!("{:?}", e.reason),
                    }
                }));
            }
            RecordedEvent::FiberMutationsCount { pass_index, count } => {
                events.push(json!({
                    "ph": "i",
                    "name": "FiberMutations",
                    "cat": "Rich",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "pass_index": pass_index,
                        "count": count,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn nanos_to_us(ns: u64) -> f64 {
    ns as f64 / 1000.0
}
