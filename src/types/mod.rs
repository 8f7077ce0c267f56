//! All data types for the process memory library.

pub mod entry;
pub mod error;
pub mod record;

pub use entry::{Entry, EntryBuilder, EntrySummary};
pub use error::{PmemError, PmemResult};
pub use record::{CorruptLine, Resolved, Versioned};

/// Default traversal depth for relationship queries.
pub const DEFAULT_DEPTH: u32 = 1;

/// Characters kept per requested word when truncating summaries.
pub const CHARS_PER_WORD: usize = 6;

/// Required top-level fields of every log record.
pub const REQUIRED_FIELDS: [&str; 3] = ["id", "timestamp", "type"];

/// Returns the current UTC time as an RFC 3339 string.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
