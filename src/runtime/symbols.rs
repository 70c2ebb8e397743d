//! Symbol tables, stack frames, and the per-snapshot runtime view
//!
//! This module provides the tracer's window onto the interpreter:
//! - [`SymbolEntry`]: one named variable with its type and storage address
//! - [`SymbolTable`]: declaration-ordered table of entries
//! - [`StackFrame`] / [`CallStack`]: function activation records,
//!   innermost frame last
//! - [`OutputBuffer`]: program output captured since execution began
//! - [`RuntimeView`]: the read-only context borrowed for one snapshot call
//!
//! Declaration order is load-bearing: the emitted `ordered_globals` and
//! per-frame `ordered_varnames` lists must reproduce it verbatim.

use super::memory::{Address, MemoryImage};
use super::types::TypeDesc;
use rustc_hash::FxHashMap;

/// One variable in a symbol table.
#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub name: String,
    pub ty: TypeDesc,
    /// Base address of this variable's storage.
    pub address: Address,
    /// Only addressable entries (variables with real storage, not macros or
    /// named constants) participate in tracing.
    pub addressable: bool,
}

impl SymbolEntry {
    pub fn new(name: impl Into<String>, ty: TypeDesc, address: Address) -> Self {
        SymbolEntry {
            name: name.into(),
            ty,
            address,
            addressable: true,
        }
    }

    pub fn non_addressable(mut self) -> Self {
        self.addressable = false;
        self
    }
}

/// A symbol table that remembers declaration order.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: FxHashMap<String, SymbolEntry>,
    declaration_order: Vec<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Declare a variable. Redeclaring a name replaces the entry but keeps
    /// its original position in declaration order.
    pub fn declare(&mut self, entry: SymbolEntry) {
        if !self.entries.contains_key(&entry.name) {
            self.declaration_order.push(entry.name.clone());
        }
        self.entries.insert(entry.name.clone(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&SymbolEntry> {
        self.entries.get(name)
    }

    /// Entries in declaration order.
    pub fn iter_ordered(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.declaration_order
            .iter()
            .filter_map(|name| self.entries.get(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Stack frame for a function call.
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub function_name: String,
    pub locals: SymbolTable,
}

impl StackFrame {
    pub fn new(function_name: impl Into<String>) -> Self {
        StackFrame {
            function_name: function_name.into(),
            locals: SymbolTable::new(),
        }
    }
}

/// The call stack. The innermost (currently executing) frame is last.
#[derive(Debug, Clone, Default)]
pub struct CallStack {
    frames: Vec<StackFrame>,
}

impl CallStack {
    pub fn new() -> Self {
        CallStack::default()
    }

    pub fn push_frame(&mut self, function_name: impl Into<String>) {
        self.frames.push(StackFrame::new(function_name));
    }

    pub fn pop_frame(&mut self) -> Option<StackFrame> {
        self.frames.pop()
    }

    /// The currently executing frame.
    pub fn innermost(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    pub fn innermost_mut(&mut self) -> Option<&mut StackFrame> {
        self.frames.last_mut()
    }

    /// All frames, outermost first.
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Program output captured since execution began.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    text: String,
}

impl OutputBuffer {
    pub fn new() -> Self {
        OutputBuffer::default()
    }

    pub fn print(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn contents(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// The read-only context for one snapshot call.
///
/// Everything the tracer touches comes through this view; nothing is
/// reached through process-wide state. The borrow ends when the snapshot
/// call returns.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeView<'a> {
    pub globals: &'a SymbolTable,
    pub stack: &'a CallStack,
    pub memory: &'a MemoryImage,
    pub output: Option<&'a OutputBuffer>,
}

impl<'a> RuntimeView<'a> {
    pub fn new(globals: &'a SymbolTable, stack: &'a CallStack, memory: &'a MemoryImage) -> Self {
        RuntimeView {
            globals,
            stack,
            memory,
            output: None,
        }
    }

    pub fn with_output(mut self, output: &'a OutputBuffer) -> Self {
        self.output = Some(output);
        self
    }

    /// Captured program output, or an empty string when no buffer is
    /// attached. Never fails.
    pub fn captured_output(&self) -> String {
        self.output.map(|o| o.contents().to_string()).unwrap_or_default()
    }
}
