//! The knowledge entry: one record of the append-only log.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{now_timestamp, CHARS_PER_WORD, REQUIRED_FIELDS};
use crate::types::error::{PmemError, PmemResult};

/// A single knowledge entry: a decision, milestone, learning, or similar.
///
/// The serialized form is exactly one line of the log. Fields the core does
/// not know about are kept in [`Entry::extra`] and written back unchanged.
///
/// Legacy key names (`timestamp_created`, `deprecation_reason`,
/// `timestamp_deprecated`) are read only when the current key is absent;
/// otherwise they stay in `extra` like any other unknown field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEntry")]
pub struct Entry {
    /// Globally unique identifier, also the graph node key.
    pub id: String,
    /// Creation time as an ISO-8601 string.
    pub timestamp: String,
    /// Free-form classification.
    #[serde(rename = "type")]
    pub entry_type: String,
    /// Free-form classification used by exact-match filtering.
    pub category: String,
    /// Human-readable title.
    pub title: String,
    /// Human-readable summary.
    pub summary: String,
    /// Ids this entry references, in declaration order. Targets may not exist.
    pub links: Vec<String>,
    /// Keywords for filtering.
    pub tags: Vec<String>,
    /// Opaque structured payload, any JSON value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Opaque structured payload, any JSON value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Whether this record marks the entry as deprecated.
    pub deprecated: bool,
    /// Why the entry was deprecated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated_reason: Option<String>,
    /// When the deprecation record was appended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated_at: Option<String>,
    /// Unrecognised top-level fields, passed through verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Wire shape of a log line before legacy keys are folded in.
#[derive(Deserialize)]
struct RawEntry {
    id: String,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(rename = "type")]
    entry_type: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    links: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    details: Option<Value>,
    #[serde(default)]
    metadata: Option<Value>,
    #[serde(default)]
    deprecated: bool,
    #[serde(default)]
    deprecated_reason: Option<String>,
    #[serde(default)]
    deprecated_at: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<RawEntry> for Entry {
    type Error = String;

    fn try_from(mut raw: RawEntry) -> Result<Self, Self::Error> {
        let timestamp = match raw.timestamp {
            Some(ts) => ts,
            None => take_legacy(&mut raw.extra, "timestamp_created")?
                .ok_or_else(|| "missing field `timestamp`".to_string())?,
        };
        let deprecated_reason = match raw.deprecated_reason {
            Some(reason) => Some(reason),
            None => take_legacy(&mut raw.extra, "deprecation_reason")?,
        };
        let deprecated_at = match raw.deprecated_at {
            Some(at) => Some(at),
            None => take_legacy(&mut raw.extra, "timestamp_deprecated")?,
        };

        Ok(Entry {
            id: raw.id,
            timestamp,
            entry_type: raw.entry_type,
            category: raw.category,
            title: raw.title,
            summary: raw.summary,
            links: raw.links,
            tags: raw.tags,
            details: raw.details,
            metadata: raw.metadata,
            deprecated: raw.deprecated,
            deprecated_reason,
            deprecated_at,
            extra: raw.extra,
        })
    }
}

/// Move a legacy string field out of `extra`. Null counts as absent.
fn take_legacy(extra: &mut Map<String, Value>, key: &str) -> Result<Option<String>, String> {
    match extra.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(format!("field `{key}` must be a string, got {}", kind(&other))),
    }
}

impl Entry {
    /// Check that the required fields are present and non-blank.
    pub fn validate(&self) -> PmemResult<()> {
        let fields = [
            ("id", &self.id),
            ("timestamp", &self.timestamp),
            ("type", &self.entry_type),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(PmemError::MalformedEntry(format!(
                    "missing required field `{name}`"
                )));
            }
        }
        Ok(())
    }

    /// Build an entry from an arbitrary JSON value, reporting which required
    /// field is absent or mistyped.
    pub fn from_value(value: Value) -> PmemResult<Self> {
        let object = value.as_object().ok_or_else(|| {
            PmemError::MalformedEntry(format!("expected a JSON object, got {}", kind(&value)))
        })?;

        for field in REQUIRED_FIELDS {
            let found = match field {
                "timestamp" => object.get("timestamp").or_else(|| object.get("timestamp_created")),
                other => object.get(other),
            };
            match found {
                None => {
                    return Err(PmemError::MalformedEntry(format!(
                        "missing required field `{field}`"
                    )))
                }
                Some(v) if !v.is_string() => {
                    return Err(PmemError::MalformedEntry(format!(
                        "field `{field}` must be a string, got {}",
                        kind(v)
                    )))
                }
                Some(_) => {}
            }
        }

        let entry: Entry = serde_json::from_value(value)
            .map_err(|e| PmemError::MalformedEntry(e.to_string()))?;
        entry.validate()?;
        Ok(entry)
    }

    /// Serialize to a single log line, without the trailing newline.
    pub fn to_json_line(&self) -> PmemResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Whether this record marks the entry as deprecated.
    pub fn is_deprecated(&self) -> bool {
        self.deprecated
    }

    /// Parse the creation timestamp. Accepts RFC 3339 and naive ISO-8601
    /// (interpreted as UTC).
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    /// Whether this entry carries every one of `required` among its tags.
    pub fn has_all_tags(&self, required: &[String]) -> bool {
        required.iter().all(|t| self.tags.contains(t))
    }

    /// Case-insensitive substring match over title and summary.
    /// `needle` must already be lowercase.
    pub fn matches_keyword(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.summary.to_lowercase().contains(needle)
    }

    /// Concepts from the pass-through `related_concepts` array.
    pub fn related_concepts(&self) -> impl Iterator<Item = &str> {
        self.extra
            .get("related_concepts")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
    }

    /// A copy of this record marked deprecated, ready to be appended.
    pub fn deprecated_copy(&self, reason: Option<&str>) -> Entry {
        let mut copy = self.clone();
        copy.deprecated = true;
        copy.deprecated_at = Some(now_timestamp());
        if let Some(reason) = reason {
            copy.deprecated_reason = Some(reason.to_string());
        }
        copy
    }

    /// Lightweight view with the summary cut to roughly `max_words` words.
    pub fn to_summary(&self, max_words: usize) -> EntrySummary {
        EntrySummary {
            id: self.id.clone(),
            entry_type: self.entry_type.clone(),
            title: self.title.clone(),
            summary: self
                .summary
                .chars()
                .take(max_words.saturating_mul(CHARS_PER_WORD))
                .collect(),
            tags: self.tags.clone(),
        }
    }
}

/// Summary-first view of an entry, without links or payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntrySummary {
    pub id: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub title: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Builder for constructing Entry instances ergonomically.
pub struct EntryBuilder {
    id: String,
    entry_type: String,
    timestamp: Option<String>,
    category: String,
    title: String,
    summary: String,
    links: Vec<String>,
    tags: Vec<String>,
    details: Option<Value>,
    metadata: Option<Value>,
}

impl EntryBuilder {
    /// Create a new builder with the required fields.
    pub fn new(id: impl Into<String>, entry_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entry_type: entry_type.into(),
            timestamp: None,
            category: String::new(),
            title: String::new(),
            summary: String::new(),
            links: Vec::new(),
            tags: Vec::new(),
            details: None,
            metadata: None,
        }
    }

    /// Set the creation timestamp (defaults to now).
    pub fn timestamp(mut self, ts: impl Into<String>) -> Self {
        self.timestamp = Some(ts.into());
        self
    }

    /// Set the category.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the summary.
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Add one link target.
    pub fn link(mut self, target: impl Into<String>) -> Self {
        self.links.push(target.into());
        self
    }

    /// Add several link targets.
    pub fn links<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.links.extend(targets.into_iter().map(Into::into));
        self
    }

    /// Add one tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add several tags.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Set the details payload.
    pub fn details(mut self, details: impl Into<Value>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Set the metadata payload.
    pub fn metadata(mut self, metadata: impl Into<Value>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    /// Build the Entry.
    pub fn build(self) -> Entry {
        Entry {
            id: self.id,
            timestamp: self.timestamp.unwrap_or_else(now_timestamp),
            entry_type: self.entry_type,
            category: self.category,
            title: self.title,
            summary: self.summary,
            links: self.links,
            tags: self.tags,
            details: self.details,
            metadata: self.metadata,
            deprecated: false,
            deprecated_reason: None,
            deprecated_at: None,
            extra: Map::new(),
        }
    }
}

/// Parse an ISO-8601 timestamp with or without an offset.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
