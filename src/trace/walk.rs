//! Scope walking
//!
//! Two passes over the visible symbol tables:
//!
//! 1. [`build_address_index`] — label pass. Registers every addressable
//!    symbol's address under a qualified name (`"func.name"` for locals,
//!    bare `"name"` for globals), innermost frame first. Runs to completion
//!    before any encoding so pointer targets can be resolved symbolically
//!    by a consuming front end.
//! 2. [`encode_table`] — encode pass. Walks one table in declaration order,
//!    extracts each addressable entry, and dispatches it to the scalar
//!    encoder or the heap builder. Unsupported kinds are logged and
//!    skipped; a corrupt-state error aborts the whole snapshot.
//!
//! The interpreter parks its own exit status in a reserved global; anything
//! with that prefix never reaches the output.

use crate::runtime::memory::Address;
use crate::runtime::symbols::{RuntimeView, SymbolTable};
use crate::trace::encode::{encode_pointer, encode_scalar, Framing};
use crate::trace::errors::TraceError;
use crate::trace::extract::{extract, TracedValue};
use crate::trace::heap::HeapGraph;
use log::warn;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

/// Interpreter-internal globals carry this prefix and are never emitted.
pub const RESERVED_GLOBAL_PREFIX: &str = "__exit_value";

/// Address → qualified display name, rebuilt every snapshot.
pub type AddressIndex = FxHashMap<Address, String>;

/// Label pass: index every addressable symbol's address.
pub fn build_address_index(view: &RuntimeView<'_>) -> AddressIndex {
    let mut index = AddressIndex::default();

    for frame in view.stack.frames().iter().rev() {
        for entry in frame.locals.iter_ordered() {
            if !entry.addressable {
                continue;
            }
            index.insert(
                entry.address,
                format!("{}.{}", frame.function_name, entry.name),
            );
        }
    }

    for entry in view.globals.iter_ordered() {
        if !entry.addressable {
            continue;
        }
        index.insert(entry.address, entry.name.clone());
    }

    index
}

/// Encode pass over one symbol table.
///
/// Returns the names in declaration order and the name → encoded-value map.
/// `skip_reserved` is set for the global table only.
pub fn encode_table(
    table: &SymbolTable,
    skip_reserved: bool,
    view: &RuntimeView<'_>,
    heap: &mut HeapGraph,
) -> Result<(Vec<String>, Map<String, Value>), TraceError> {
    let mut ordered_names = Vec::new();
    let mut encoded = Map::new();

    for entry in table.iter_ordered() {
        if !entry.addressable {
            continue;
        }
        if skip_reserved && entry.name.starts_with(RESERVED_GLOBAL_PREFIX) {
            continue;
        }

        let traced = match extract(&entry.name, &entry.ty, entry.address, view) {
            Ok(traced) => traced,
            Err(TraceError::UnsupportedKind { kind, name }) => {
                warn!("skipping variable '{}': unsupported kind '{}'", name, kind);
                continue;
            }
            Err(other) => return Err(other),
        };

        let value = match &traced {
            TracedValue::Scalar { address, value, .. } => {
                encode_scalar(*address, value, Framing::TopLevel)
            }
            TracedValue::Pointer {
                address, target, ..
            } => encode_pointer(*address, *target, Framing::TopLevel),
            aggregate => heap.build(aggregate, view)?,
        };

        ordered_names.push(entry.name.clone());
        encoded.insert(entry.name.clone(), value);
    }

    Ok((ordered_names, encoded))
}
