// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and Chrome trace export for fibril
//! diagnostics.
//!
//! This crate provides [`TraceSink`](fibril_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: compact binary recording, stamped with
//!   elapsed time, with [`recorder::decode`] for playback.
//! - [`chrome::export`]: writes Chrome Trace Event Format JSON from recorded
//!   bytes.

pub mod chrome;
pub mod pretty;
pub mod recorder;

use fibril_core::lanes::Lanes;

/// Short display name for a lane set.
pub(crate) fn lane_name(lane: Lanes) -> String {
    if lane.is_empty() {
        "none".to_owned()
    } else if lane == Lanes::SYNC {
        "sync".to_owned()
    } else if lane == Lanes::DEFAULT {
        "default".to_owned()
    } else {
        format!("{:#x}", lane.bits())
    }
}
