//! Snapshot assembly and emission
//!
//! [`produce_snapshot`] orchestrates one full trace event: the label pass,
//! globals, every stack frame innermost-first, the heap graph, and the
//! captured program output, assembled into a [`TraceEvent`]. [`Tracer`]
//! pairs that with a [`TraceSink`] and emits each finished record as one
//! atomic unit; all per-call state is released afterwards.
//!
//! The record's field names and tuple conventions are a fixed contract with
//! the downstream visualizer and must not drift.

use crate::runtime::symbols::RuntimeView;
use crate::trace::errors::TraceError;
use crate::trace::heap::HeapGraph;
use crate::trace::walk::{build_address_index, encode_table};
use log::debug;
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::{self, Write};

/// One rendered stack frame, innermost first in [`TraceEvent::stack_to_render`].
///
/// `frame_id` counts depth from the outermost frame: the outermost frame's
/// id equals the stack depth and ids decrease toward the innermost frame.
/// `is_parent`, `is_zombie`, and `parent_frame_id_list` are fixed for this
/// interpreter (no closures, no generators) but the front end expects them.
#[derive(Debug, Clone, Serialize)]
pub struct FrameRecord {
    pub func_name: String,
    pub frame_id: usize,
    pub unique_hash: String,
    pub is_highlighted: bool,
    pub is_parent: bool,
    pub is_zombie: bool,
    pub parent_frame_id_list: Vec<usize>,
    pub encoded_locals: Map<String, Value>,
    pub ordered_varnames: Vec<String>,
}

/// One structured record describing full visible program state at one step.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    pub line: u32,
    pub event: String,
    pub ordered_globals: Vec<String>,
    pub globals: Map<String, Value>,
    pub stdout: String,
    pub func_name: String,
    pub heap: Map<String, Value>,
    pub stack_to_render: Vec<FrameRecord>,
}

/// Event kind carried by every emitted record.
pub const EVENT_KIND: &str = "step";

/// Produce one trace event from the current runtime view.
///
/// Returns `Ok(None)` when no call stack is active (before execution
/// starts) — that is not an error, nothing is emitted.
pub fn produce_snapshot(
    view: &RuntimeView<'_>,
    line: u32,
) -> Result<Option<TraceEvent>, TraceError> {
    let Some(innermost) = view.stack.innermost() else {
        return Ok(None);
    };

    // Label pass must complete before any encoding.
    let address_index = build_address_index(view);
    debug!(
        "snapshot at line {}: {} labeled addresses, {} frames",
        line,
        address_index.len(),
        view.stack.depth()
    );

    let mut heap = HeapGraph::new();
    let (ordered_globals, globals) = encode_table(view.globals, true, view, &mut heap)?;

    let depth = view.stack.depth();
    let mut stack_to_render = Vec::with_capacity(depth);
    for (i, frame) in view.stack.frames().iter().rev().enumerate() {
        // Depth id counted from the outermost frame: outermost = depth,
        // decreasing toward the innermost.
        let frame_id = i + 1;
        let (ordered_varnames, encoded_locals) =
            encode_table(&frame.locals, false, view, &mut heap)?;
        stack_to_render.push(FrameRecord {
            func_name: frame.function_name.clone(),
            frame_id,
            unique_hash: format!("{}_{}", frame.function_name, frame_id),
            is_highlighted: i == 0,
            is_parent: false,
            is_zombie: false,
            parent_frame_id_list: Vec::new(),
            encoded_locals,
            ordered_varnames,
        });
    }

    // After all variable encoding, so aliasing checks saw the full heap.
    heap.insert_null_sentinel();

    Ok(Some(TraceEvent {
        line,
        event: EVENT_KIND.to_string(),
        ordered_globals,
        globals,
        stdout: view.captured_output(),
        func_name: innermost.function_name.clone(),
        heap: heap.into_map(),
        stack_to_render,
    }))
}

/// Destination for finished trace events.
pub trait TraceSink {
    fn emit(&mut self, event: &TraceEvent) -> io::Result<()>;
}

/// Writes each event as one JSON record per line.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesSink { writer }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TraceSink for JsonLinesSink<W> {
    fn emit(&mut self, event: &TraceEvent) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

/// Per-step tracer: produces a snapshot and hands it to the sink.
#[derive(Debug)]
pub struct Tracer<S: TraceSink> {
    sink: S,
}

impl<S: TraceSink> Tracer<S> {
    pub fn new(sink: S) -> Self {
        Tracer { sink }
    }

    /// Trace one execution step. Returns whether an event was emitted.
    pub fn step(&mut self, view: &RuntimeView<'_>, line: u32) -> Result<bool, TraceError> {
        match produce_snapshot(view, line)? {
            Some(event) => {
                self.sink.emit(&event).map_err(|e| TraceError::Emit {
                    detail: e.to_string(),
                })?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Recover the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }
}
