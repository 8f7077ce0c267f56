//! Fluent API for building KnowledgeGraph instances without a log file.

use crate::types::{now_timestamp, Entry, EntryBuilder};

use super::KnowledgeGraph;

/// Fluent builder for constructing a KnowledgeGraph from in-memory records.
///
/// Records are kept in insertion order, exactly as they would appear in the
/// log, so repeated ids collapse the same way a store build does.
pub struct GraphBuilder {
    records: Vec<Entry>,
    entry_type: String,
    timestamp: String,
}

impl GraphBuilder {
    /// Create a new builder whose shorthand entries have type `note`.
    pub fn new() -> Self {
        Self::with_type("note")
    }

    /// Create a new builder with a specific type for shorthand entries.
    pub fn with_type(entry_type: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            entry_type: entry_type.into(),
            timestamp: now_timestamp(),
        }
    }

    /// Add an entry with the given links.
    pub fn add<I, S>(&mut self, id: &str, links: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = EntryBuilder::new(id, self.entry_type.as_str())
            .timestamp(self.timestamp.as_str())
            .title(id)
            .links(links)
            .build();
        self.records.push(entry);
        self
    }

    /// Add a fully specified record.
    pub fn add_entry(&mut self, entry: Entry) -> &mut Self {
        self.records.push(entry);
        self
    }

    /// Append a deprecation record for the latest version of `id`, if any.
    pub fn deprecate(&mut self, id: &str, reason: Option<&str>) -> &mut Self {
        if let Some(latest) = self.records.iter().rev().find(|e| e.id == id) {
            let record = latest.deprecated_copy(reason);
            self.records.push(record);
        }
        self
    }

    /// Records added so far, in order.
    pub fn records(&self) -> &[Entry] {
        &self.records
    }

    /// Build the final KnowledgeGraph.
    pub fn build(self) -> KnowledgeGraph {
        KnowledgeGraph::from_entries(self.records)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
