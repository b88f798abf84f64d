//! List operations
//!
//! Maps the four list actions (read, create, update, destroy) onto the
//! query encoder and the request pipeline.

pub mod adapter;
pub mod operation;

pub use adapter::{unwrap_envelope, ListDataAdapter};
pub use operation::{ListState, Operation, OperationResult, Record, RecordSchema, DEFAULT_ID_FIELD};
