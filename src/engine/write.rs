//! Write pipeline: appends, deprecations and bulk imports.

use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::store::EntryStore;
use crate::types::{now_timestamp, Entry, PmemError, PmemResult};

/// Input format for [`WriteEngine::import_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    /// A single JSON object or an array of objects.
    Json,
    /// One JSON object per line.
    Jsonl,
}

impl ImportFormat {
    /// Detect from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "ndjson" => Some(Self::Jsonl),
            _ => None,
        }
    }

    /// Parse a format name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "ndjson" => Some(Self::Jsonl),
            _ => None,
        }
    }
}

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    /// Valid entries when validating only, otherwise entries actually appended.
    pub imported: usize,
    /// One message per rejected input entry.
    pub errors: Vec<String>,
    /// Append failure that halted the import after `imported` entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped: Option<String>,
}

impl ImportReport {
    /// Whether every input entry was valid and appended.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.stopped.is_none()
    }
}

/// The write engine orchestrates every mutation of the log.
pub struct WriteEngine<'s> {
    store: &'s EntryStore,
}

impl<'s> WriteEngine<'s> {
    /// Create a new write engine.
    pub fn new(store: &'s EntryStore) -> Self {
        Self { store }
    }

    /// Append one entry.
    pub fn append(&self, entry: &Entry) -> PmemResult<()> {
        self.store.append(entry)
    }

    /// Validate and append a raw JSON object.
    pub fn append_json(&self, value: Value) -> PmemResult<Entry> {
        self.store.append_json(value)
    }

    /// Record a deprecation: the latest record is copied, flagged, and
    /// appended as a new line. Earlier lines are never touched.
    pub fn deprecate(&self, id: &str, reason: Option<&str>) -> PmemResult<Entry> {
        let latest = self
            .store
            .get(id)?
            .ok_or_else(|| PmemError::EntryNotFound(id.to_string()))?;
        let record = latest.deprecated_copy(reason);
        self.store.append(&record)?;
        log::debug!("deprecated {id:?}");
        Ok(record)
    }

    /// Import entries from a file. Invalid entries are reported and skipped;
    /// with `validate_only` nothing is appended.
    pub fn import_file(
        &self,
        path: &Path,
        format: Option<ImportFormat>,
        validate_only: bool,
    ) -> PmemResult<ImportReport> {
        let format = format.or_else(|| ImportFormat::from_path(path)).ok_or_else(|| {
            PmemError::MalformedEntry(format!(
                "cannot detect import format for {}",
                path.display()
            ))
        })?;

        let content = std::fs::read_to_string(path)?;
        let items = match format {
            ImportFormat::Json => match serde_json::from_str::<Value>(&content)? {
                Value::Array(items) => items,
                other => vec![other],
            },
            ImportFormat::Jsonl => parse_jsonl(&content)?,
        };

        self.import_values(items, validate_only)
    }

    /// Validate a batch of JSON values and append the valid ones.
    ///
    /// An append failure halts the batch; the report then records how many
    /// entries reached the log and why it stopped.
    pub fn import_values(&self, items: Vec<Value>, validate_only: bool) -> PmemResult<ImportReport> {
        let mut report = ImportReport::default();
        let mut valid: Vec<Entry> = Vec::with_capacity(items.len());

        for (i, mut item) in items.into_iter().enumerate() {
            if let Value::Object(object) = &mut item {
                if !object.contains_key("timestamp") && !object.contains_key("timestamp_created") {
                    object.insert("timestamp".to_string(), Value::String(now_timestamp()));
                }
            }
            let label = item
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            match Entry::from_value(item) {
                Ok(entry) => valid.push(entry),
                Err(e) => report.errors.push(format!("Entry {i} ({label}): {e}")),
            }
        }

        if validate_only {
            report.imported = valid.len();
        } else {
            for entry in &valid {
                if let Err(e) = self.store.append(entry) {
                    log::warn!(
                        "import stopped after {} of {} entries: {e}",
                        report.imported,
                        valid.len()
                    );
                    report.stopped = Some(format!("Entry {}: {e}", entry.id));
                    break;
                }
                report.imported += 1;
            }
        }

        log::debug!(
            "import: {} valid, {} rejected{}",
            report.imported,
            report.errors.len(),
            if validate_only { " (validate only)" } else { "" }
        );
        Ok(report)
    }
}

fn parse_jsonl(content: &str) -> PmemResult<Vec<Value>> {
    let mut items = Vec::new();
    for (n, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value = serde_json::from_str(line).map_err(|e| {
            PmemError::MalformedEntry(format!("invalid JSON on line {}: {e}", n + 1))
        })?;
        items.push(value);
    }
    Ok(items)
}
