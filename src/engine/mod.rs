//! High-level operations: write engine and query engine.

pub mod query;
pub mod write;

pub use query::{ContextOptions, QueryEngine};
pub use write::{ImportFormat, ImportReport, WriteEngine};
