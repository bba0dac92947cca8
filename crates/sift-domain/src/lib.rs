//! Sift Domain Layer
//!
//! Core value types and trait interfaces for windowed, cited record extraction.
//! Everything the engine and its adapters share lives here; no I/O.
//!
//! ## Key Concepts
//!
//! - **Window**: a contiguous, possibly overlapping slice of the source document
//! - **CharInterval**: a half-open character span used for citations
//! - **RawExtraction**: the model's unvalidated output for one record
//! - **ValidatedRecord**: a schema-conformant record, optionally cited
//! - **TypeDescriptor / SchemaSet**: record types resolved by name
//! - **Completion**: the language-model capability injected by the caller
//!
//! All offsets count characters (Unicode scalar values), never bytes.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod interval;
pub mod record;
pub mod schema;
pub mod traits;
pub mod window;

// Re-exports for convenience
pub use interval::{CharInterval, IntervalError};
pub use record::{Payload, RawExtraction, ValidatedRecord};
pub use schema::{FieldKind, FieldSpec, RecordSchema, SchemaEntry, SchemaError, SchemaSet, TypeDescriptor};
pub use traits::{CapabilityError, Completion, CompletionRequest};
pub use window::{byte_offset, char_len, slice_chars, Window};
