//! Tracer core
//!
//! This module turns one [`crate::runtime::RuntimeView`] into one
//! [`snapshot::TraceEvent`]:
//! - [`extract`]: symbol → normalized [`extract::TracedValue`]
//! - [`encode`]: scalar/pointer wire tuples
//! - [`heap`]: deduplicated, address-keyed heap-object graph
//! - [`walk`]: label and encode passes over globals and frames
//! - [`snapshot`]: event assembly, sinks, and the per-step [`snapshot::Tracer`]
//! - [`errors`]: [`errors::TraceError`]
//!
//! Everything here is transient: built fresh per snapshot call, released
//! when the event has been emitted.

pub mod encode;
pub mod errors;
pub mod extract;
pub mod heap;
pub mod snapshot;
pub mod walk;

pub use errors::TraceError;
pub use snapshot::{produce_snapshot, FrameRecord, JsonLinesSink, TraceEvent, TraceSink, Tracer};
pub use walk::{build_address_index, AddressIndex};
