//! Read-side views over log records.

use serde::Serialize;

use super::Entry;

/// One record of an id's history, tagged by whether it is the authoritative
/// (latest) version. Older records stay physically present in the log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "version", content = "entry", rename_all = "snake_case")]
pub enum Versioned {
    /// The latest record for the id, by file order.
    Current(Entry),
    /// A record shadowed by a later one with the same id.
    Historical(Entry),
}

impl Versioned {
    /// The wrapped entry regardless of version.
    pub fn entry(&self) -> &Entry {
        match self {
            Self::Current(e) | Self::Historical(e) => e,
        }
    }

    /// Whether this is the authoritative record.
    pub fn is_current(&self) -> bool {
        matches!(self, Self::Current(_))
    }
}

/// A graph node resolved back to its payload.
///
/// Serialized adjacently tagged (`{"kind": ..., "node": ...}`) so an entry
/// carrying its own `kind` field cannot collide with the tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "node", rename_all = "snake_case")]
pub enum Resolved {
    /// A node backed by a real entry.
    Entry(Entry),
    /// A link target that no record in the log carries.
    Dangling { id: String },
}

impl Resolved {
    /// The node id.
    pub fn id(&self) -> &str {
        match self {
            Self::Entry(e) => &e.id,
            Self::Dangling { id } => id,
        }
    }

    /// The backing entry, if any.
    pub fn entry(&self) -> Option<&Entry> {
        match self {
            Self::Entry(e) => Some(e),
            Self::Dangling { .. } => None,
        }
    }

    /// Whether this is a placeholder with no record.
    pub fn is_dangling(&self) -> bool {
        matches!(self, Self::Dangling { .. })
    }
}

/// Diagnostic for a log line that could not be read as an entry.
/// Recovered by skipping; never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorruptLine {
    /// 1-based line number in the log.
    pub line_number: usize,
    /// Why the line was rejected.
    pub reason: String,
}
