//! Value extraction
//!
//! Normalizes one symbol (or one struct field) into a [`TracedValue`]: a
//! closed variant that tells the encoder and the heap builder everything
//! they need without re-inspecting the type descriptor. Array types are
//! collapsed to their leaf kind with up to three published dimensions, and
//! a pointer-to-char is rewritten as a char array over the target string so
//! it traces exactly like `char[]`.
//!
//! All reads go through the bounds-checked [`MemoryImage`] accessors; a
//! mismatch between descriptor and storage surfaces as
//! [`TraceError::CorruptRuntimeState`] instead of a wild read.

use crate::runtime::memory::Address;
use crate::runtime::symbols::RuntimeView;
use crate::runtime::types::{Member, TypeDesc};
use crate::trace::errors::TraceError;

/// Leaf scalar kinds an array can be collapsed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Int,
    Short,
    Char,
    Long,
    UnsignedInt,
    UnsignedShort,
    UnsignedLong,
    FloatingPoint,
}

impl ScalarKind {
    /// Element stride in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            ScalarKind::Char => 1,
            ScalarKind::Short | ScalarKind::UnsignedShort => 2,
            ScalarKind::Int | ScalarKind::UnsignedInt => 4,
            ScalarKind::Long | ScalarKind::UnsignedLong => 8,
            ScalarKind::FloatingPoint => 8,
        }
    }
}

/// A scalar payload read from storage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarValue {
    Int(i64),
    Uint(u64),
    Char(u8),
    Float(f64),
}

/// Struct vs. union, for heap-entry tagging and member offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Struct,
    Union,
}

impl AggregateKind {
    /// The wire tag for heap entries of this kind.
    pub fn tag_token(self) -> &'static str {
        match self {
            AggregateKind::Struct => "STRUCT",
            AggregateKind::Union => "UNION",
        }
    }
}

/// One extracted value, normalized for encoding.
///
/// Borrows the name, tag, and member table from interpreter-owned data;
/// nothing here outlives the snapshot call that produced it.
#[derive(Debug, Clone)]
pub enum TracedValue<'a> {
    /// A scalar read from its own storage slot.
    Scalar {
        name: &'a str,
        address: Address,
        value: ScalarValue,
    },
    /// A pointer; `target` is the address it holds.
    Pointer {
        name: &'a str,
        address: Address,
        target: Address,
    },
    /// Array collapsed to a scalar leaf (includes `char*` strings, which
    /// are re-addressed at the string storage itself).
    ScalarArray {
        name: &'a str,
        address: Address,
        dims: Vec<usize>,
        len: usize,
        leaf: ScalarKind,
    },
    /// Array of pointers; elements are referenced, never dereferenced.
    PointerArray {
        name: &'a str,
        address: Address,
        dims: Vec<usize>,
        len: usize,
    },
    /// Array of structs or unions, laid out contiguously.
    AggregateArray {
        name: &'a str,
        address: Address,
        dims: Vec<usize>,
        len: usize,
        elem_size: usize,
        kind: AggregateKind,
        tag: &'a str,
        members: &'a [Member],
    },
    /// A single struct or union instance based at `address`.
    Aggregate {
        name: &'a str,
        address: Address,
        kind: AggregateKind,
        tag: &'a str,
        members: &'a [Member],
    },
}

impl TracedValue<'_> {
    pub fn name(&self) -> &str {
        match self {
            TracedValue::Scalar { name, .. }
            | TracedValue::Pointer { name, .. }
            | TracedValue::ScalarArray { name, .. }
            | TracedValue::PointerArray { name, .. }
            | TracedValue::AggregateArray { name, .. }
            | TracedValue::Aggregate { name, .. } => name,
        }
    }

    pub fn address(&self) -> Address {
        match self {
            TracedValue::Scalar { address, .. }
            | TracedValue::Pointer { address, .. }
            | TracedValue::ScalarArray { address, .. }
            | TracedValue::PointerArray { address, .. }
            | TracedValue::AggregateArray { address, .. }
            | TracedValue::Aggregate { address, .. } => *address,
        }
    }
}

fn scalar_kind(ty: &TypeDesc) -> Option<ScalarKind> {
    match ty {
        TypeDesc::Int => Some(ScalarKind::Int),
        TypeDesc::Short => Some(ScalarKind::Short),
        TypeDesc::Char => Some(ScalarKind::Char),
        TypeDesc::Long => Some(ScalarKind::Long),
        TypeDesc::UnsignedInt => Some(ScalarKind::UnsignedInt),
        TypeDesc::UnsignedShort => Some(ScalarKind::UnsignedShort),
        TypeDesc::UnsignedLong => Some(ScalarKind::UnsignedLong),
        TypeDesc::FloatingPoint => Some(ScalarKind::FloatingPoint),
        _ => None,
    }
}

/// Read one scalar of `kind` at `address` through the checked accessors.
pub(crate) fn read_scalar(
    view: &RuntimeView<'_>,
    kind: ScalarKind,
    address: Address,
) -> Result<ScalarValue, TraceError> {
    let mem = view.memory;
    let value = match kind {
        ScalarKind::Int => ScalarValue::Int(mem.read_i32(address).map_err(TraceError::corrupt)? as i64),
        ScalarKind::Short => {
            ScalarValue::Int(mem.read_i16(address).map_err(TraceError::corrupt)? as i64)
        }
        ScalarKind::Long => ScalarValue::Int(mem.read_i64(address).map_err(TraceError::corrupt)?),
        ScalarKind::UnsignedInt => {
            ScalarValue::Uint(mem.read_u32(address).map_err(TraceError::corrupt)? as u64)
        }
        ScalarKind::UnsignedShort => {
            ScalarValue::Uint(mem.read_u16(address).map_err(TraceError::corrupt)? as u64)
        }
        ScalarKind::UnsignedLong => {
            ScalarValue::Uint(mem.read_u64(address).map_err(TraceError::corrupt)?)
        }
        ScalarKind::Char => ScalarValue::Char(mem.read_u8(address).map_err(TraceError::corrupt)?),
        ScalarKind::FloatingPoint => {
            ScalarValue::Float(mem.read_f64(address).map_err(TraceError::corrupt)?)
        }
    };
    Ok(value)
}

/// Extract the value named `name` of type `ty` stored at `address`.
///
/// For a struct field, the caller passes the field's absolute address
/// (aggregate base plus member offset); the extractor itself never needs to
/// know whether it is looking at a top-level slot or an embedded one.
pub fn extract<'a>(
    name: &'a str,
    ty: &'a TypeDesc,
    address: Address,
    view: &RuntimeView<'_>,
) -> Result<TracedValue<'a>, TraceError> {
    match ty {
        TypeDesc::Array { .. } => {
            let Some((dims, leaf)) = ty.array_shape() else {
                return Err(TraceError::corrupt(format!(
                    "array descriptor for '{}' has no shape",
                    name
                )));
            };
            extract_array(name, ty, leaf, dims, address)
        }

        TypeDesc::Pointer { points_to } => {
            let target = view
                .memory
                .read_addr(address)
                .map_err(TraceError::corrupt)?;
            if matches!(**points_to, TypeDesc::Char) && target != 0 {
                // C-string case: trace as a char array over the target
                // storage, element count strlen + 1.
                let len = view
                    .memory
                    .read_cstring_len(target)
                    .map_err(TraceError::corrupt)?
                    + 1;
                Ok(TracedValue::ScalarArray {
                    name,
                    address: target,
                    dims: vec![len],
                    len,
                    leaf: ScalarKind::Char,
                })
            } else {
                Ok(TracedValue::Pointer {
                    name,
                    address,
                    target,
                })
            }
        }

        TypeDesc::Struct { tag, members } => Ok(TracedValue::Aggregate {
            name,
            address,
            kind: AggregateKind::Struct,
            tag,
            members,
        }),

        TypeDesc::Union { tag, members } => Ok(TracedValue::Aggregate {
            name,
            address,
            kind: AggregateKind::Union,
            tag,
            members,
        }),

        TypeDesc::Void | TypeDesc::Enum { .. } | TypeDesc::Function => {
            Err(TraceError::UnsupportedKind {
                kind: ty.kind_name(),
                name: name.to_string(),
            })
        }

        scalar => {
            // Remaining kinds are all scalar.
            let Some(kind) = scalar_kind(scalar) else {
                return Err(TraceError::UnsupportedKind {
                    kind: scalar.kind_name(),
                    name: name.to_string(),
                });
            };
            let value = read_scalar(view, kind, address)?;
            Ok(TracedValue::Scalar {
                name,
                address,
                value,
            })
        }
    }
}

fn extract_array<'a>(
    name: &'a str,
    ty: &TypeDesc,
    leaf: &'a TypeDesc,
    dims: Vec<usize>,
    address: Address,
) -> Result<TracedValue<'a>, TraceError> {
    let leaf_size = leaf.size_bytes();
    if leaf_size == 0 {
        return Err(TraceError::UnsupportedKind {
            kind: leaf.kind_name(),
            name: name.to_string(),
        });
    }
    let len = ty.size_bytes() / leaf_size;

    match leaf {
        TypeDesc::Pointer { .. } => Ok(TracedValue::PointerArray {
            name,
            address,
            dims,
            len,
        }),
        TypeDesc::Struct { tag, members } => Ok(TracedValue::AggregateArray {
            name,
            address,
            dims,
            len,
            elem_size: leaf_size,
            kind: AggregateKind::Struct,
            tag,
            members,
        }),
        TypeDesc::Union { tag, members } => Ok(TracedValue::AggregateArray {
            name,
            address,
            dims,
            len,
            elem_size: leaf_size,
            kind: AggregateKind::Union,
            tag,
            members,
        }),
        other => match scalar_kind(other) {
            Some(kind) => Ok(TracedValue::ScalarArray {
                name,
                address,
                dims,
                len,
                leaf: kind,
            }),
            None => Err(TraceError::UnsupportedKind {
                kind: other.kind_name(),
                name: name.to_string(),
            }),
        },
    }
}
