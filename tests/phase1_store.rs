//! Phase 1 tests: Entry model + append-only log store.

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;
use std::thread;

use serde_json::json;
use tempfile::TempDir;

use process_memory::store::{EntryStore, LogReader, SearchFilter};
use process_memory::types::{Entry, EntryBuilder, PmemError, Versioned};

fn temp_store() -> (TempDir, EntryStore) {
    let dir = TempDir::new().unwrap();
    let store = EntryStore::open(dir.path().join("process_memory.jsonl")).unwrap();
    (dir, store)
}

fn entry(id: &str) -> Entry {
    EntryBuilder::new(id, "decision")
        .timestamp("2024-05-01T10:00:00Z")
        .title(format!("Entry {id}"))
        .build()
}

fn raw_append(store: &EntryStore, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(store.path()).unwrap();
    file.write_all(bytes).unwrap();
}

// ==================== Open / Close ====================

#[test]
fn test_open_creates_parent_dirs() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".bootstrap").join("nested").join("log.jsonl");
    let store = EntryStore::open(&path).unwrap();
    assert!(path.exists());
    assert_eq!(store.path(), path.as_path());
    assert_eq!(store.count(true).unwrap(), 0);
    store.close();
}

#[test]
fn test_directory_path_is_store_unavailable() {
    let dir = TempDir::new().unwrap();
    let result = EntryStore::open(dir.path());
    assert!(matches!(result, Err(PmemError::StoreUnavailable { .. })));
}

#[test]
fn test_missing_log_reads_as_empty() {
    let dir = TempDir::new().unwrap();
    let report = LogReader::read_from_file(&dir.path().join("absent.jsonl")).unwrap();
    assert!(report.entries.is_empty());
    assert_eq!(report.corrupt_count(), 0);
}

#[test]
fn test_unreadable_log_is_store_unavailable() {
    let dir = TempDir::new().unwrap();
    let result = LogReader::read_from_file(dir.path());
    assert!(matches!(result, Err(PmemError::StoreUnavailable { .. })));
}

// ==================== Append ====================

#[test]
fn test_append_only_byte_for_byte() {
    let (_dir, store) = temp_store();

    let mut previous: Vec<u8> = Vec::new();
    for i in 0..10 {
        store.append(&entry(&format!("PM-{i}"))).unwrap();
        let current = std::fs::read(store.path()).unwrap();
        assert!(current.starts_with(&previous), "record {i} altered earlier bytes");
        assert_eq!(current.iter().filter(|&&b| b == b'\n').count(), i + 1);
        previous = current;
    }

    let report = store.scan().unwrap();
    let ids: Vec<&str> = report.entries.iter().map(|e| e.id.as_str()).collect();
    let expected: Vec<String> = (0..10).map(|i| format!("PM-{i}")).collect();
    assert_eq!(ids, expected);
    assert_eq!(report.entries[3], entry("PM-3"));
}

#[test]
fn test_malformed_append_leaves_log_unchanged() {
    let (_dir, store) = temp_store();
    store.append(&entry("a")).unwrap();
    let before = std::fs::read(store.path()).unwrap();

    let missing_type = EntryBuilder::new("b", "").build();
    let err = store.append(&missing_type).unwrap_err();
    assert!(matches!(err, PmemError::MalformedEntry(_)));

    let missing_id = EntryBuilder::new("  ", "note").build();
    assert!(matches!(store.append(&missing_id), Err(PmemError::MalformedEntry(_))));

    let err = store
        .append_json(json!({"id": "c", "type": "note"}))
        .unwrap_err();
    assert!(err.to_string().contains("`timestamp`"));

    assert_eq!(std::fs::read(store.path()).unwrap(), before);
}

#[test]
fn test_append_json_passes_payloads_through() {
    let (_dir, store) = temp_store();
    let appended = store
        .append_json(json!({
            "id": "PM-9",
            "timestamp": "2024-05-01T10:00:00Z",
            "type": "learning",
            "details": {"steps": [1, 2, 3]},
            "metadata": {"source": "retro"},
            "rationale": "kept verbatim"
        }))
        .unwrap();

    let got = store.get("PM-9").unwrap().unwrap();
    assert_eq!(got, appended);
    assert_eq!(got.details.unwrap()["steps"], json!([1, 2, 3]));
    assert_eq!(got.extra["rationale"], "kept verbatim");
}

#[test]
fn test_append_after_torn_line_starts_fresh_line() {
    let (_dir, store) = temp_store();
    store.append(&entry("a")).unwrap();
    raw_append(&store, br#"{"id":"torn","timest"#);

    store.append(&entry("b")).unwrap();

    let report = store.scan().unwrap();
    let ids: Vec<&str> = report.entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(report.corrupt_count(), 1);
    assert_eq!(report.corrupt[0].line_number, 2);
}

#[test]
fn test_concurrent_appends_never_interleave() {
    let (_dir, store) = temp_store();
    let store = Arc::new(store);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..25 {
                    let e = EntryBuilder::new(format!("T{t}-{i}"), "note")
                        .summary("x".repeat(512))
                        .build();
                    store.append(&e).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let report = store.scan().unwrap();
    assert_eq!(report.entries.len(), 200);
    assert_eq!(report.corrupt_count(), 0);
}

// ==================== Get / History ====================

#[test]
fn test_get_not_found_is_none() {
    let (_dir, store) = temp_store();
    store.append(&entry("a")).unwrap();
    assert!(store.get("nope").unwrap().is_none());
    assert!(store.get_history("nope").unwrap().is_empty());
}

#[test]
fn test_get_returns_latest_record() {
    let (_dir, store) = temp_store();
    store.append(&entry("a")).unwrap();
    let updated = EntryBuilder::new("a", "decision")
        .timestamp("2024-06-01T10:00:00Z")
        .title("Updated")
        .build();
    store.append(&updated).unwrap();

    assert_eq!(store.get("a").unwrap().unwrap().title, "Updated");
}

#[test]
fn test_history_tags_current_and_historical() {
    let (_dir, store) = temp_store();
    let original = entry("a");
    store.append(&original).unwrap();
    store.append(&entry("b")).unwrap();
    let deprecated = original.deprecated_copy(Some("superseded"));
    store.append(&deprecated).unwrap();

    let history = store.get_history("a").unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0], Versioned::Historical(original));
    assert!(history[1].is_current());
    assert!(history[1].entry().is_deprecated());
    assert_eq!(
        history[1].entry().deprecated_reason.as_deref(),
        Some("superseded")
    );
}

#[test]
fn test_summary_view() {
    let (_dir, store) = temp_store();
    let e = EntryBuilder::new("a", "milestone")
        .summary("abcdefghijklmnopqrstuvwxyz")
        .build();
    store.append(&e).unwrap();

    let summary = store.summary("a", 2).unwrap().unwrap();
    assert_eq!(summary.summary, "abcdefghijkl");
    assert!(store.summary("missing", 2).unwrap().is_none());
}

// ==================== Search ====================

fn seeded_store() -> (TempDir, EntryStore) {
    let (dir, store) = temp_store();
    let rows = [
        ("PM-1", "architecture", "Adopt JSONL log", "Append-only records", &["storage", "format"][..]),
        ("PM-2", "architecture", "Graph rebuild", "Derive the graph from the LOG", &["graph"][..]),
        ("PM-3", "process", "Weekly review", "Check open decisions", &["storage"][..]),
        ("PM-4", "process", "Release cadence", "Ship every sprint", &["storage", "release"][..]),
    ];
    for (id, category, title, summary, tags) in rows {
        let e = EntryBuilder::new(id, "decision")
            .category(category)
            .title(title)
            .summary(summary)
            .tags(tags.iter().copied())
            .build();
        store.append(&e).unwrap();
    }
    (dir, store)
}

fn ids(entries: &[Entry]) -> Vec<&str> {
    entries.iter().map(|e| e.id.as_str()).collect()
}

#[test]
fn test_search_no_filters_returns_all_in_file_order() {
    let (_dir, store) = seeded_store();
    let result = store.search(&SearchFilter::new()).unwrap();
    assert_eq!(ids(&result.entries), vec!["PM-1", "PM-2", "PM-3", "PM-4"]);
    assert_eq!(result.corrupt_lines, 0);
}

#[test]
fn test_search_keyword_is_case_insensitive_over_title_and_summary() {
    let (_dir, store) = seeded_store();
    let result = store.search(&SearchFilter::new().keyword("log")).unwrap();
    assert_eq!(ids(&result.entries), vec!["PM-1", "PM-2"]);

    // Tags are not part of the keyword haystack.
    let result = store.search(&SearchFilter::new().keyword("release")).unwrap();
    assert_eq!(ids(&result.entries), vec!["PM-4"]);
    let result = store.search(&SearchFilter::new().keyword("graph")).unwrap();
    assert_eq!(ids(&result.entries), vec!["PM-2"]);
}

#[test]
fn test_search_category_is_exact() {
    let (_dir, store) = seeded_store();
    let result = store.search(&SearchFilter::new().category("process")).unwrap();
    assert_eq!(ids(&result.entries), vec!["PM-3", "PM-4"]);
    let result = store.search(&SearchFilter::new().category("Process")).unwrap();
    assert!(result.entries.is_empty());
}

#[test]
fn test_search_tags_superset_and_dimensions_and() {
    let (_dir, store) = seeded_store();
    let result = store.search(&SearchFilter::new().tags(["storage"])).unwrap();
    assert_eq!(ids(&result.entries), vec!["PM-1", "PM-3", "PM-4"]);

    let result = store
        .search(&SearchFilter::new().tags(["storage", "release"]))
        .unwrap();
    assert_eq!(ids(&result.entries), vec!["PM-4"]);

    let result = store
        .search(
            &SearchFilter::new()
                .tags(["storage"])
                .category("architecture")
                .keyword("append"),
        )
        .unwrap();
    assert_eq!(ids(&result.entries), vec!["PM-1"]);
}

#[test]
fn test_search_latest_wins_and_hides_deprecated() {
    let (_dir, store) = seeded_store();
    let pm1 = store.get("PM-1").unwrap().unwrap();
    store.append(&pm1.deprecated_copy(None)).unwrap();
    let pm3 = EntryBuilder::new("PM-3", "decision")
        .category("process")
        .title("Fortnightly review")
        .build();
    store.append(&pm3).unwrap();

    let result = store.search(&SearchFilter::new()).unwrap();
    assert_eq!(ids(&result.entries), vec!["PM-2", "PM-3", "PM-4"]);
    assert_eq!(result.entries[1].title, "Fortnightly review");

    let result = store
        .search(&SearchFilter::new().include_deprecated(true))
        .unwrap();
    assert_eq!(ids(&result.entries), vec!["PM-1", "PM-2", "PM-3", "PM-4"]);

    assert_eq!(store.count(false).unwrap(), 3);
    assert_eq!(store.count(true).unwrap(), 4);
}

// ==================== Corrupt-Line Resilience ====================

#[test]
fn test_one_corrupt_line_among_ten() {
    let (_dir, store) = temp_store();
    for i in 0..5 {
        store.append(&entry(&format!("PM-{i}"))).unwrap();
    }
    raw_append(&store, b"{this is not json}\n");
    for i in 5..9 {
        store.append(&entry(&format!("PM-{i}"))).unwrap();
    }

    let result = store.search(&SearchFilter::new()).unwrap();
    assert_eq!(result.entries.len(), 9);
    assert_eq!(result.corrupt_lines, 1);
}

#[test]
fn test_missing_required_field_line_is_corrupt() {
    let (_dir, store) = temp_store();
    store.append(&entry("a")).unwrap();
    raw_append(&store, b"{\"id\":\"b\",\"type\":\"note\"}\n\n");
    store.append(&entry("c")).unwrap();

    let report = store.scan().unwrap();
    assert_eq!(ids(&report.entries), vec!["a", "c"]);
    assert_eq!(report.corrupt_count(), 1);
    assert!(store.get("b").unwrap().is_none());
}

#[test]
fn test_fingerprint_grows_with_appends() {
    let (_dir, store) = temp_store();
    let empty = store.fingerprint().unwrap();
    assert_eq!(empty, 0);
    store.append(&entry("a")).unwrap();
    assert!(store.fingerprint().unwrap() > empty);
}
