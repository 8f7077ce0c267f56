//! The entry store: durable append-only log plus read-side filtering.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::types::error::PmemResult;
use crate::types::{Entry, EntrySummary, Versioned};

use super::filter::SearchFilter;
use super::reader::{LogReader, ScanReport};
use super::writer::LogWriter;

/// Entries returned by a search, with the number of lines skipped while
/// reading so callers can notice silent data loss.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResult {
    pub entries: Vec<Entry>,
    pub corrupt_lines: usize,
}

/// Latest-record-wins view of the log.
///
/// One entry per distinct id, ordered by the id's first appearance in the
/// file, carrying the content of its last record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub entries: Vec<Entry>,
    pub corrupt_lines: usize,
}

impl Snapshot {
    /// Collapse a full scan to the latest record per id.
    pub fn from_scan(report: ScanReport) -> Self {
        let corrupt_lines = report.corrupt_count();
        Self {
            entries: latest_by_id(report.entries),
            corrupt_lines,
        }
    }

    /// Look up the latest record for an id.
    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }
}

/// Durable, ordered, append-only persistence of entries.
///
/// The store owns the append handle for its lifetime; reads open the file
/// afresh so they observe appends made by other handles.
pub struct EntryStore {
    writer: LogWriter,
}

impl EntryStore {
    /// Open the store at `path`, creating the file and its parent
    /// directories if needed.
    pub fn open(path: impl AsRef<Path>) -> PmemResult<Self> {
        let writer = LogWriter::open(path.as_ref())?;
        log::debug!("opened entry store at {}", writer.path().display());
        Ok(Self { writer })
    }

    /// Release the append handle.
    pub fn close(self) {
        log::debug!("closed entry store at {}", self.writer.path().display());
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        self.writer.path()
    }

    /// Append one entry as a single atomic record at the end of the log.
    pub fn append(&self, entry: &Entry) -> PmemResult<()> {
        self.writer.append(entry)
    }

    /// Validate a raw JSON object and append it.
    pub fn append_json(&self, value: Value) -> PmemResult<Entry> {
        let entry = Entry::from_value(value)?;
        self.writer.append(&entry)?;
        Ok(entry)
    }

    /// Every valid record in file order, plus corrupt-line diagnostics.
    pub fn scan(&self) -> PmemResult<ScanReport> {
        LogReader::read_from_file(self.path())
    }

    /// Latest-record-wins view of the whole log.
    pub fn snapshot(&self) -> PmemResult<Snapshot> {
        Ok(Snapshot::from_scan(self.scan()?))
    }

    /// The most recent record for `id`, or `None` if there is none.
    pub fn get(&self, id: &str) -> PmemResult<Option<Entry>> {
        let report = self.scan()?;
        Ok(report.entries.into_iter().rev().find(|e| e.id == id))
    }

    /// Every record for `id` in file order; the last one is `Current`.
    pub fn get_history(&self, id: &str) -> PmemResult<Vec<Versioned>> {
        let report = self.scan()?;
        let mut records: Vec<Entry> = report.entries.into_iter().filter(|e| e.id == id).collect();
        let current = records.pop();
        let mut history: Vec<Versioned> = records.into_iter().map(Versioned::Historical).collect();
        history.extend(current.map(Versioned::Current));
        Ok(history)
    }

    /// Latest entries matching `filter`, oldest first.
    pub fn search(&self, filter: &SearchFilter) -> PmemResult<SearchResult> {
        let snapshot = self.snapshot()?;
        let entries = snapshot
            .entries
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect();
        Ok(SearchResult {
            entries,
            corrupt_lines: snapshot.corrupt_lines,
        })
    }

    /// Number of distinct ids.
    pub fn count(&self, include_deprecated: bool) -> PmemResult<usize> {
        let snapshot = self.snapshot()?;
        Ok(snapshot
            .entries
            .iter()
            .filter(|e| include_deprecated || !e.is_deprecated())
            .count())
    }

    /// Summary-first view of the latest record for `id`.
    pub fn summary(&self, id: &str, max_words: usize) -> PmemResult<Option<EntrySummary>> {
        Ok(self.get(id)?.map(|e| e.to_summary(max_words)))
    }

    /// Current log length in bytes. The log only grows, so any change means
    /// new records were appended.
    pub fn fingerprint(&self) -> PmemResult<u64> {
        LogReader::log_len(self.path())
    }
}

/// Collapse records to one per id: first-appearance order, last content.
pub fn latest_by_id(records: Vec<Entry>) -> Vec<Entry> {
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut latest: Vec<Entry> = Vec::new();

    for record in records {
        match position.get(&record.id) {
            Some(&idx) => latest[idx] = record,
            None => {
                position.insert(record.id.clone(), latest.len());
                latest.push(record);
            }
        }
    }

    latest
}
