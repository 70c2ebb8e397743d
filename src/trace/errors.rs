//! Trace error types
//!
//! [`TraceError`] covers the two failure classes of the tracer core plus
//! sink write failures. `UnsupportedKind` is local-recoverable: the walker
//! logs it and skips the offending variable or field. `CorruptRuntimeState`
//! aborts the current snapshot only, never the interpreted program.

use std::fmt;

/// Errors raised while producing or emitting a snapshot.
#[derive(Debug, Clone)]
pub enum TraceError {
    /// A type kind the tracer cannot encode (void, enum, function).
    UnsupportedKind { kind: &'static str, name: String },

    /// A type descriptor disagreed with the memory it claims to describe.
    CorruptRuntimeState { detail: String },

    /// The sink failed to write the finished record.
    Emit { detail: String },
}

impl TraceError {
    pub(crate) fn corrupt(detail: impl Into<String>) -> Self {
        TraceError::CorruptRuntimeState {
            detail: detail.into(),
        }
    }
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceError::UnsupportedKind { kind, name } => {
                write!(f, "cannot trace '{}': unsupported type kind '{}'", name, kind)
            }
            TraceError::CorruptRuntimeState { detail } => {
                write!(f, "interpreter memory inconsistent: {}", detail)
            }
            TraceError::Emit { detail } => {
                write!(f, "failed to emit trace record: {}", detail)
            }
        }
    }
}

impl std::error::Error for TraceError {}
