//! Interpreter-side boundary model
//!
//! This module defines the read-only structures the tracer consumes:
//! - [`types`]: Closed-variant type descriptors ([`types::TypeDesc`])
//! - [`memory`]: Bounds-checked storage image ([`memory::MemoryImage`])
//! - [`symbols`]: Symbol tables, stack frames, and the per-snapshot
//!   [`symbols::RuntimeView`] context
//!
//! The interpreter host owns all of this data and keeps it alive for the
//! duration of program execution; the tracer borrows it for one snapshot
//! call and never mutates it.
//!
//! # Type Sizes
//!
//! Unlike real C, the storage model uses fixed, platform-independent sizes:
//! - `char`: 1 byte, `short`: 2, `int`: 4, `long`: 8
//! - unsigned variants match their signed counterparts
//! - floating point: 8 bytes
//! - pointer: 8 bytes (regardless of pointee type)
//! - struct: sum of field sizes, union: largest field (no padding)

pub mod memory;
pub mod symbols;
pub mod types;

pub use memory::{Address, MemoryImage};
pub use symbols::{CallStack, OutputBuffer, RuntimeView, StackFrame, SymbolEntry, SymbolTable};
pub use types::{Member, TypeDesc};
