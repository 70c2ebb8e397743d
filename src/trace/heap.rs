//! Heap object graph
//!
//! [`HeapGraph`] accumulates one snapshot's heap entries, keyed by the
//! decimal string form of each object's base address. Variables and fields
//! that hold an array, struct, or union receive a `["REF", key]` token at
//! the use site; the entry itself is built once. Re-encountering an address
//! within the same snapshot reuses the existing entry (check-then-insert),
//! so aliased objects appear exactly once.
//!
//! Entry shapes:
//! - `["ARRAY", dims, elem...]` — scalar leaves encoded in place, pointer
//!   leaves as `["REF", target]`, aggregate leaves as nested
//!   `["STRUCT"|"UNION", ...]` objects built per element
//! - `["STRUCT"|"UNION", tag, [], member...]` — the third slot is a fixed
//!   empty placeholder that keeps struct entries positionally compatible
//!   with array entries
//! - key `"0"`: `["NULLPOINTER", "NULL"]`, inserted once per snapshot so a
//!   null target always resolves
//!
//! Array elements of aggregate type are inlined rather than re-keyed:
//! element 0 shares its base address with the array itself, so giving each
//! element its own heap entry would collide with the array's key.

use crate::runtime::memory::Address;
use crate::runtime::symbols::RuntimeView;
use crate::runtime::types::{Member, POINTER_SIZE_BYTES};
use crate::trace::encode::{encode_element, encode_pointer, encode_scalar, Framing};
use crate::trace::errors::TraceError;
use crate::trace::extract::{extract, AggregateKind, TracedValue};
use log::warn;
use serde_json::{json, Map, Value};

/// Address key of the null-pointer sentinel entry.
pub const NULL_SENTINEL_KEY: &str = "0";

fn reference(key: &str) -> Value {
    json!(["REF", key])
}

/// One snapshot's heap entries, keyed by stringified base address.
#[derive(Debug, Default)]
pub struct HeapGraph {
    entries: Map<String, Value>,
}

impl HeapGraph {
    pub fn new() -> Self {
        HeapGraph::default()
    }

    /// Number of entries built so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the graph, yielding the wire-format heap map.
    pub fn into_map(self) -> Map<String, Value> {
        self.entries
    }

    /// Insert the fixed null-pointer sentinel under address key `"0"`.
    pub fn insert_null_sentinel(&mut self) {
        self.entries
            .insert(NULL_SENTINEL_KEY.to_string(), json!(["NULLPOINTER", "NULL"]));
    }

    /// Build the heap entry for `value` (if one does not already exist) and
    /// return the reference token for the use site.
    ///
    /// Scalars and pointers have no heap identity; passed here they encode
    /// in place and no entry is created.
    pub fn build(
        &mut self,
        value: &TracedValue<'_>,
        view: &RuntimeView<'_>,
    ) -> Result<Value, TraceError> {
        match value {
            TracedValue::Scalar { address, value, .. } => {
                Ok(encode_scalar(*address, value, Framing::TopLevel))
            }
            TracedValue::Pointer {
                address, target, ..
            } => Ok(encode_pointer(*address, *target, Framing::TopLevel)),

            TracedValue::ScalarArray {
                address,
                dims,
                len,
                leaf,
                ..
            } => {
                let key = address.to_string();
                if !self.entries.contains_key(&key) {
                    let mut entry = vec![json!("ARRAY"), json!(dims)];
                    for i in 0..*len {
                        let elem_addr = address + (i * leaf.size_bytes()) as u64;
                        entry.push(encode_element(*leaf, elem_addr, view)?);
                    }
                    self.entries.insert(key.clone(), Value::Array(entry));
                }
                Ok(reference(&key))
            }

            TracedValue::PointerArray {
                address, dims, len, ..
            } => {
                let key = address.to_string();
                if !self.entries.contains_key(&key) {
                    let mut entry = vec![json!("ARRAY"), json!(dims)];
                    for i in 0..*len {
                        let elem_addr = address + (i * POINTER_SIZE_BYTES) as u64;
                        let target = view
                            .memory
                            .read_addr(elem_addr)
                            .map_err(TraceError::corrupt)?;
                        entry.push(reference(&target.to_string()));
                    }
                    self.entries.insert(key.clone(), Value::Array(entry));
                }
                Ok(reference(&key))
            }

            TracedValue::AggregateArray {
                address,
                dims,
                len,
                elem_size,
                kind,
                tag,
                members,
                ..
            } => {
                let key = address.to_string();
                if !self.entries.contains_key(&key) {
                    // Reserve the key before recursing: element 0 lives at
                    // the array's own base address.
                    self.entries.insert(key.clone(), Value::Null);
                    let mut entry = vec![json!("ARRAY"), json!(dims)];
                    for i in 0..*len {
                        let elem_base = address + (i * elem_size) as u64;
                        entry.push(self.aggregate_object(*kind, tag, members, elem_base, view)?);
                    }
                    self.entries.insert(key.clone(), Value::Array(entry));
                }
                Ok(reference(&key))
            }

            TracedValue::Aggregate {
                address,
                kind,
                tag,
                members,
                ..
            } => {
                let key = address.to_string();
                if !self.entries.contains_key(&key) {
                    // Reserve first so a nested member at offset 0 refers
                    // back here instead of rebuilding the same address.
                    self.entries.insert(key.clone(), Value::Null);
                    let entry = self.aggregate_object(*kind, tag, members, *address, view)?;
                    self.entries.insert(key.clone(), entry);
                }
                Ok(reference(&key))
            }
        }
    }

    /// Build a `["STRUCT"|"UNION", tag, [], member...]` object for the
    /// instance based at `base`, recursing into aggregate members.
    fn aggregate_object(
        &mut self,
        kind: AggregateKind,
        tag: &str,
        members: &[Member],
        base: Address,
        view: &RuntimeView<'_>,
    ) -> Result<Value, TraceError> {
        let mut entry = vec![json!(kind.tag_token()), json!(tag), json!([])];

        let mut offset = 0usize;
        for member in members {
            let field_address = base + offset as u64;
            // Union members all start at the base.
            if kind == AggregateKind::Struct {
                offset += member.ty.size_bytes();
            }

            let field = match extract(&member.name, &member.ty, field_address, view) {
                Ok(field) => field,
                Err(TraceError::UnsupportedKind {
                    kind: field_kind,
                    name,
                }) => {
                    warn!(
                        "skipping field '{}' of {} '{}': unsupported kind '{}'",
                        name,
                        kind.tag_token().to_lowercase(),
                        tag,
                        field_kind
                    );
                    continue;
                }
                Err(other) => return Err(other),
            };

            let encoded = match &field {
                TracedValue::Scalar { address, value, .. } => {
                    encode_scalar(*address, value, Framing::Field(&member.name))
                }
                TracedValue::Pointer {
                    address, target, ..
                } => encode_pointer(*address, *target, Framing::Field(&member.name)),
                nested => {
                    let token = self.build(nested, view)?;
                    json!([&member.name, token])
                }
            };
            entry.push(encoded);
        }

        Ok(Value::Array(entry))
    }
}
