// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A counter driven through the reconciler with tracing enabled.
//!
//! Mounts a counter component on the in-memory host, clicks its button a few
//! times (each click dispatches three updates), and records every pass to
//! both a [`PrettyPrintSink`](fibril_debug::pretty::PrettyPrintSink) and a
//! [`RecorderSink`](fibril_debug::recorder::RecorderSink). The recording is
//! exported as a Chrome trace JSON file.

use std::fs::File;
use std::io::BufWriter;

use fibril_backend_memory::MemoryHost;
use fibril_core::element::{Child, Component, Element, Handler};
use fibril_core::trace::{
    CommitSummary, FiberMutation, PhaseBeginEvent, PhaseEndEvent, RenderAbortedEvent, TraceSink,
    Tracer, WarningEvent,
};
use fibril_core::{Reconciler, ReconcilerConfig};

use fibril_debug::pretty::PrettyPrintSink;
use fibril_debug::recorder::RecorderSink;

const CLICKS: u32 = 4;

/// Forwards every event to both sinks.
struct DemoSink {
    pretty: PrettyPrintSink,
    recorder: RecorderSink,
}

impl TraceSink for DemoSink {
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.pretty.on_phase_begin(e);
        self.recorder.on_phase_begin(e);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.pretty.on_phase_end(e);
        self.recorder.on_phase_end(e);
    }

    fn on_commit_summary(&mut self, s: &CommitSummary) {
        self.pretty.on_commit_summary(s);
        self.recorder.on_commit_summary(s);
    }

    fn on_warning(&mut self, e: &WarningEvent) {
        self.pretty.on_warning(e);
        self.recorder.on_warning(e);
    }

    fn on_render_aborted(&mut self, e: &RenderAbortedEvent) {
        self.pretty.on_render_aborted(e);
        self.recorder.on_render_aborted(e);
    }

    fn on_fiber_mutations(&mut self, pass_index: u64, mutations: &[FiberMutation]) {
        self.pretty.on_fiber_mutations(pass_index, mutations);
        self.recorder.on_fiber_mutations(pass_index, mutations);
    }
}

fn counter() -> Component {
    Component::new("Counter", |_, hooks| {
        let (count, set_count) = hooks.use_state(|| 1210_i64)?;
        hooks.use_effect(
            move || {
                println!("  effect: count is {count}");
                None
            },
            Some(count),
        )?;
        let on_click = Handler::new(move || {
            set_count.update(|n| n + 1);
            set_count.update(|n| n + 1);
            set_count.update(|n| n + 1);
        });
        let history: Vec<Child> = (0..=(count - 1210) / 3)
            .map(|step| Element::host("li").key(step).child(1210 + step * 3).into())
            .collect();
        Ok(Element::host("div")
            .child(Element::host("button").attr("onClick", on_click).child("+3"))
            .child(Element::host("span").child(count))
            .child(Element::host("ul").children(history))
            .into())
    })
}

fn main() {
    let mut sink = DemoSink {
        pretty: PrettyPrintSink::new(Box::new(std::io::stdout())),
        recorder: RecorderSink::new(),
    };

    let mut host = MemoryHost::new();
    let container = host.create_container();
    let mut reconciler = Reconciler::new(host, ReconcilerConfig::new());
    let root = reconciler.create_root(container);

    reconciler
        .render(root, Element::component(&counter()))
        .expect("root exists");
    reconciler
        .run_until_idle_traced(&mut Tracer::new(&mut sink))
        .expect("initial render");
    println!("mounted: {}", reconciler.adapter().markup(container));

    for click in 1..=CLICKS {
        let button = reconciler
            .adapter()
            .find_by_tag(container, "button")
            .expect("button is mounted");
        reconciler.adapter().fire(button, "onClick");
        reconciler
            .run_until_idle_traced(&mut Tracer::new(&mut sink))
            .expect("update render");
        println!("click {click}: {}", reconciler.adapter().markup(container));
    }

    reconciler.unmount(root).expect("root exists");
    reconciler
        .run_until_idle_traced(&mut Tracer::new(&mut sink))
        .expect("unmount");

    // -- export Chrome trace -----------------------------------------------
    let path = "trace.json";
    let file = File::create(path).expect("failed to create trace.json");
    let mut writer = BufWriter::new(file);
    fibril_debug::chrome::export(sink.recorder.as_bytes(), &mut writer)
        .expect("failed to write Chrome trace");

    println!("Wrote {path} ({} passes)", reconciler.pass_count());
}
