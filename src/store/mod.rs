//! Durable log I/O and the entry store built on it.

pub mod entry_store;
pub mod filter;
pub mod reader;
pub mod writer;

pub use entry_store::{latest_by_id, EntryStore, SearchResult, Snapshot};
pub use filter::SearchFilter;
pub use reader::{LogReader, ScanReport};
pub use writer::LogWriter;
