//! Scalar wire encoding
//!
//! Converts scalar and pointer values into the tagged tuples the visualizer
//! front end consumes:
//!
//! - integers and chars: `["ADDR", address, value]`
//! - pointers: `["POINTS", target, address]`
//! - floating point: a bare number
//!
//! A char value is a one-character string; the NUL byte is spelled as the
//! two-character escape `"\0"` so it survives JSON. Inside a struct member
//! list the tuple is wrapped a second time as `[fieldName, tuple]`, selected
//! via [`Framing::Field`]. Array elements are read lazily from their own
//! storage at encode time rather than from a pre-materialized payload.

use crate::runtime::memory::Address;
use crate::runtime::symbols::RuntimeView;
use crate::trace::errors::TraceError;
use crate::trace::extract::{read_scalar, ScalarKind, ScalarValue};
use serde_json::{json, Value};

/// Encoding context: a top-level variable slot or a named struct field.
#[derive(Debug, Clone, Copy)]
pub enum Framing<'a> {
    TopLevel,
    Field(&'a str),
}

fn frame(tuple: Value, framing: Framing<'_>) -> Value {
    match framing {
        Framing::TopLevel => tuple,
        Framing::Field(name) => json!([name, tuple]),
    }
}

fn char_repr(byte: u8) -> String {
    if byte == 0 {
        "\\0".to_string()
    } else {
        char::from(byte).to_string()
    }
}

fn scalar_json(value: &ScalarValue) -> Value {
    match value {
        ScalarValue::Int(i) => json!(i),
        ScalarValue::Uint(u) => json!(u),
        ScalarValue::Char(b) => json!(char_repr(*b)),
        ScalarValue::Float(f) => json!(f),
    }
}

/// Encode a scalar read from `address`.
pub fn encode_scalar(address: Address, value: &ScalarValue, framing: Framing<'_>) -> Value {
    let tuple = match value {
        // Floats are bare numbers, not tuples.
        ScalarValue::Float(f) => json!(f),
        other => json!(["ADDR", address, scalar_json(other)]),
    };
    frame(tuple, framing)
}

/// Encode a pointer stored at `address` holding `target`.
pub fn encode_pointer(address: Address, target: Address, framing: Framing<'_>) -> Value {
    frame(json!(["POINTS", target, address]), framing)
}

/// Encode one array element in place, reading it from its own storage.
pub fn encode_element(
    leaf: ScalarKind,
    address: Address,
    view: &RuntimeView<'_>,
) -> Result<Value, TraceError> {
    let value = read_scalar(view, leaf, address)?;
    Ok(encode_scalar(address, &value, Framing::TopLevel))
}
