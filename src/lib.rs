//! # Introduction
//!
//! ctrace walks a C interpreter's live symbol tables and call stack at a
//! chosen execution point and serializes everything a step-by-step program
//! visualizer needs: every visible variable, the call stack, and a
//! deduplicated, address-keyed heap-object graph.
//!
//! ## Trace pipeline
//!
//! ```text
//! RuntimeView → scope walk → value extraction → scalar encoding / heap graph → TraceEvent → sink
//! ```
//!
//! 1. [`runtime`] — the read-only boundary the tracer consumes: type
//!    descriptors, symbol tables, the call stack, a bounds-checked
//!    [`runtime::memory::MemoryImage`], and captured program output.
//! 2. [`trace`] — the tracer core: extracts a normalized
//!    [`trace::extract::TracedValue`] per symbol, encodes scalars in place,
//!    builds heap entries for arrays and aggregates, and assembles one
//!    [`trace::snapshot::TraceEvent`] per step.
//!
//! The interpreter itself (lexing, parsing, evaluation, storage allocation)
//! is an external host. It populates the [`runtime`] structures, then calls
//! [`trace::snapshot::Tracer::step`] once per traced source line; the tracer
//! never mutates interpreter state and retains nothing between calls.

pub mod runtime;
pub mod trace;
