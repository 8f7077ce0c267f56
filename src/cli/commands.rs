//! CLI command implementations.

use std::path::Path;

use serde::Serialize;

use crate::engine::{ContextOptions, ImportFormat, QueryEngine, WriteEngine};
use crate::store::{EntryStore, SearchFilter};
use crate::types::{Entry, PmemError, PmemResult, Resolved, Versioned};

/// Append a new entry.
pub fn cmd_add(store: &EntryStore, entry: Entry, json: bool) -> PmemResult<()> {
    WriteEngine::new(store).append(&entry)?;
    report_added(store, &entry, json)
}

/// Append a raw JSON object.
pub fn cmd_add_json(store: &EntryStore, raw: &str, json: bool) -> PmemResult<()> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| PmemError::MalformedEntry(format!("invalid JSON: {e}")))?;
    let entry = WriteEngine::new(store).append_json(value)?;
    report_added(store, &entry, json)
}

fn report_added(store: &EntryStore, entry: &Entry, json: bool) -> PmemResult<()> {
    if json {
        println!(
            "{}",
            serde_json::json!({"id": entry.id, "type": entry.entry_type})
        );
    } else {
        println!(
            "Added {} ({}) to {}",
            entry.id,
            entry.entry_type,
            store.path().display()
        );
    }
    Ok(())
}

/// Show the latest record for an id.
pub fn cmd_get(store: &EntryStore, id: &str, json: bool) -> PmemResult<()> {
    let entry = store
        .get(id)?
        .ok_or_else(|| PmemError::EntryNotFound(id.to_string()))?;

    if json {
        print_json(&entry, true)?;
    } else {
        print_entry(&entry);
        if let Some(ts) = entry.parsed_timestamp() {
            println!("  Created: {}", ts.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        if !entry.links.is_empty() {
            println!("  Links: {}", entry.links.join(", "));
        }
    }
    Ok(())
}

/// Show every record for an id.
pub fn cmd_history(store: &EntryStore, id: &str, json: bool) -> PmemResult<()> {
    let history = store.get_history(id)?;
    if history.is_empty() {
        return Err(PmemError::EntryNotFound(id.to_string()));
    }

    if json {
        print_json(&history, true)?;
    } else {
        for (i, record) in history.iter().enumerate() {
            let marker = match record {
                Versioned::Current(_) => "current",
                Versioned::Historical(_) => "historical",
            };
            let e = record.entry();
            let state = if e.is_deprecated() { ", deprecated" } else { "" };
            println!("#{} [{}{}] {} {}: {}", i + 1, marker, state, e.timestamp, e.id, e.title);
            if let Some(reason) = &e.deprecated_reason {
                println!("    reason: {reason}");
            }
        }
    }
    Ok(())
}

/// Filtered search.
pub fn cmd_search(store: &EntryStore, filter: &SearchFilter, json: bool) -> PmemResult<()> {
    let result = QueryEngine::new(store).find(filter)?;

    if json {
        print_json(&result, true)?;
    } else {
        if result.entries.is_empty() {
            println!("No entries found");
        } else {
            println!("\nFound {} entries:\n", result.entries.len());
            for entry in &result.entries {
                print_entry(entry);
                println!();
            }
        }
        warn_corrupt(result.corrupt_lines);
    }
    Ok(())
}

/// Append a deprecation record.
pub fn cmd_deprecate(
    store: &EntryStore,
    id: &str,
    reason: Option<&str>,
    json: bool,
) -> PmemResult<()> {
    let record = WriteEngine::new(store).deprecate(id, reason)?;
    if json {
        println!(
            "{}",
            serde_json::json!({"id": record.id, "deprecated": true, "reason": record.deprecated_reason})
        );
    } else {
        println!("Deprecated {}", record.id);
    }
    Ok(())
}

/// Raw traversal, dangling references included.
pub fn cmd_related(
    store: &EntryStore,
    id: &str,
    depth: u32,
    include_reverse: bool,
    json: bool,
) -> PmemResult<()> {
    let related = QueryEngine::new(store).get_related(id, depth, include_reverse)?;
    print_resolved(&related, json)
}

/// Traversal resolved for display.
pub fn cmd_context(
    store: &EntryStore,
    id: &str,
    options: &ContextOptions,
    json: bool,
) -> PmemResult<()> {
    let context = QueryEngine::new(store).context_for(id, options)?;
    print_resolved(&context, json)
}

/// Neighbourhood of an entry as nodes and edges.
pub fn cmd_network(store: &EntryStore, id: &str, depth: u32, json: bool) -> PmemResult<()> {
    let network = QueryEngine::new(store).network(id, depth)?;

    if json {
        print_json(&network, true)?;
    } else {
        println!("Nodes: {}", network.nodes.len());
        for entry in &network.nodes {
            println!("  {}: {}", entry.id, entry.title);
        }
        println!("Edges: {}", network.edges.len());
        for edge in &network.edges {
            println!("  {} -> {}", edge.from, edge.to);
        }
    }
    Ok(())
}

/// Store and graph statistics.
pub fn cmd_stats(store: &EntryStore, json: bool) -> PmemResult<()> {
    let engine = QueryEngine::new(store);
    let graph = engine.graph()?;
    let stats = graph.stats();
    let live = store.count(false)?;
    let total = store.count(true)?;
    let log_size = store.fingerprint()?;

    if json {
        let info = serde_json::json!({
            "file": store.path().display().to_string(),
            "log_size": log_size,
            "entries": total,
            "live_entries": live,
            "deprecated_entries": total - live,
            "corrupt_lines": graph.corrupt_lines(),
            "graph": stats,
        });
        print_json(&info, true)?;
    } else {
        println!("File: {}", store.path().display());
        println!("Log size: {}", format_size(log_size));
        println!("Entries: {} ({} live, {} deprecated)", total, live, total - live);
        println!("Corrupt lines: {}", graph.corrupt_lines());
        println!("Graph:");
        println!("  Nodes: {}", stats.total_nodes);
        println!("  Edges: {}", stats.total_edges);
        println!("  Dangling: {}", stats.dangling_nodes);
        println!("  Max outgoing: {}", stats.max_outgoing_links);
        println!("  Max incoming: {}", stats.max_incoming_links);
    }
    Ok(())
}

/// Import entries from a JSON or JSONL file.
pub fn cmd_import(
    store: &EntryStore,
    file: &Path,
    format: Option<ImportFormat>,
    validate_only: bool,
    json: bool,
) -> PmemResult<()> {
    let report = WriteEngine::new(store).import_file(file, format, validate_only)?;

    if json {
        print_json(&report, true)?;
    } else {
        if !report.errors.is_empty() {
            println!("Validation errors ({}):", report.errors.len());
            for error in &report.errors {
                println!("  - {error}");
            }
        }
        if validate_only {
            println!("Validation: {} entries valid", report.imported);
        } else {
            println!("Imported {} entries", report.imported);
        }
    }

    if let Some(reason) = report.stopped {
        return Err(PmemError::Io(std::io::Error::other(format!(
            "import stopped after {} entries: {reason}",
            report.imported
        ))));
    }
    if report.errors.is_empty() {
        Ok(())
    } else {
        Err(PmemError::MalformedEntry(format!(
            "{} validation errors found",
            report.errors.len()
        )))
    }
}

/// Export the latest entries as a JSON array.
pub fn cmd_export(store: &EntryStore, filter: &SearchFilter, pretty: bool) -> PmemResult<()> {
    let result = store.search(filter)?;
    print_json(&result.entries, pretty)?;
    warn_corrupt(result.corrupt_lines);
    Ok(())
}

fn print_json(value: &impl Serialize, pretty: bool) -> PmemResult<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{text}");
    Ok(())
}

fn print_entry(entry: &Entry) {
    let state = if entry.is_deprecated() { " [deprecated]" } else { "" };
    println!("  {}: {}{}", entry.id, entry.title, state);
    println!("  Type: {}", entry.entry_type);
    if !entry.category.is_empty() {
        println!("  Category: {}", entry.category);
    }
    println!("  {}", entry.summary);
    if !entry.tags.is_empty() {
        println!("  Tags: {}", entry.tags.join(", "));
    }
}

fn print_resolved(items: &[Resolved], json: bool) -> PmemResult<()> {
    if json {
        return print_json(&items, true);
    }
    if items.is_empty() {
        println!("No related entries");
    }
    for item in items {
        match item {
            Resolved::Entry(e) => println!("  {} ({}): {}", e.id, e.entry_type, e.title),
            Resolved::Dangling { id } => println!("  {id} (dangling)"),
        }
    }
    Ok(())
}

fn warn_corrupt(corrupt_lines: usize) {
    if corrupt_lines > 0 {
        eprintln!("warning: skipped {corrupt_lines} corrupt log lines");
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
