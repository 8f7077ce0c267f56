//! Reads the newline-delimited log into entries.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::types::error::{PmemError, PmemResult};
use crate::types::{CorruptLine, Entry};

/// Everything a full scan of the log produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    /// Every valid record, in file order, duplicates included.
    pub entries: Vec<Entry>,
    /// Lines that were skipped.
    pub corrupt: Vec<CorruptLine>,
}

impl ScanReport {
    /// Number of skipped lines.
    pub fn corrupt_count(&self) -> usize {
        self.corrupt.len()
    }
}

/// Reader for the JSONL log.
pub struct LogReader;

impl LogReader {
    /// Scan a log file. A missing file reads as an empty log; a file that
    /// exists but cannot be read is `StoreUnavailable`.
    pub fn read_from_file(path: &Path) -> PmemResult<ScanReport> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("log {} does not exist yet, reading as empty", path.display());
                return Ok(ScanReport::default());
            }
            Err(source) => {
                return Err(PmemError::StoreUnavailable {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let report =
            Self::read_from(&mut BufReader::new(file)).map_err(|source| {
                PmemError::StoreUnavailable {
                    path: path.to_path_buf(),
                    source,
                }
            })?;

        log::debug!(
            "scanned {}: {} records, {} corrupt",
            path.display(),
            report.entries.len(),
            report.corrupt_count()
        );
        Ok(report)
    }

    /// Scan any buffered reader. Only I/O failures are errors; bad lines are
    /// skipped and recorded.
    pub fn read_from(reader: &mut impl BufRead) -> std::io::Result<ScanReport> {
        let mut report = ScanReport::default();
        let mut buf: Vec<u8> = Vec::new();
        let mut line_number = 0usize;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line_number += 1;

            match parse_line(&buf) {
                Ok(Some(entry)) => report.entries.push(entry),
                Ok(None) => {}
                Err(reason) => {
                    log::warn!("skipping corrupt log line {line_number}: {reason}");
                    report.corrupt.push(CorruptLine {
                        line_number,
                        reason,
                    });
                }
            }
        }

        Ok(report)
    }

    /// Current length of the log in bytes, 0 if it does not exist.
    pub fn log_len(path: &Path) -> PmemResult<u64> {
        match std::fs::metadata(path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(source) => Err(PmemError::StoreUnavailable {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Parse one raw line. Blank lines yield `Ok(None)`.
pub fn parse_line(raw: &[u8]) -> Result<Option<Entry>, String> {
    let text = std::str::from_utf8(raw).map_err(|e| format!("invalid UTF-8: {e}"))?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let entry: Entry = serde_json::from_str(text).map_err(|e| e.to_string())?;
    entry.validate().map_err(|e| e.to_string())?;
    Ok(Some(entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_not_corrupt() {
        let data = b"\n   \n{\"id\":\"a\",\"timestamp\":\"t\",\"type\":\"x\"}\n\n";
        let report = LogReader::read_from(&mut &data[..]).unwrap();
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.corrupt_count(), 0);
    }

    #[test]
    fn bad_lines_are_numbered() {
        let data = b"{\"id\":\"a\",\"timestamp\":\"t\",\"type\":\"x\"}\nnot json\n{\"id\":\"\",\"timestamp\":\"t\",\"type\":\"x\"}\n\xff\xfe\n";
        let report = LogReader::read_from(&mut &data[..]).unwrap();
        assert_eq!(report.entries.len(), 1);
        let lines: Vec<usize> = report.corrupt.iter().map(|c| c.line_number).collect();
        assert_eq!(lines, vec![2, 3, 4]);
        assert!(report.corrupt[1].reason.contains("`id`"));
        assert!(report.corrupt[2].reason.contains("UTF-8"));
    }

    #[test]
    fn truncated_final_line_is_skipped() {
        let data = b"{\"id\":\"a\",\"timestamp\":\"t\",\"type\":\"x\"}\n{\"id\":\"b\",\"time";
        let report = LogReader::read_from(&mut &data[..]).unwrap();
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.corrupt_count(), 1);
    }

    #[test]
    fn line_with_current_and_legacy_keys_is_kept() {
        let data = b"{\"id\":\"a\",\"timestamp\":\"2024-06-01T00:00:00Z\",\"timestamp_created\":\"2024-01-01T00:00:00\",\"type\":\"x\",\"deprecated\":true,\"deprecated_reason\":\"new\",\"deprecation_reason\":\"old\"}\n";
        let report = LogReader::read_from(&mut &data[..]).unwrap();
        assert_eq!(report.corrupt_count(), 0);
        assert_eq!(report.entries.len(), 1);

        let entry = &report.entries[0];
        assert_eq!(entry.timestamp, "2024-06-01T00:00:00Z");
        assert_eq!(entry.deprecated_reason.as_deref(), Some("new"));
        assert_eq!(entry.extra["timestamp_created"], "2024-01-01T00:00:00");
        assert_eq!(entry.extra["deprecation_reason"], "old");
    }

    #[test]
    fn non_object_payloads_are_not_corrupt() {
        let data = b"{\"id\":\"a\",\"timestamp\":\"t\",\"type\":\"x\",\"details\":[1,2],\"metadata\":null}\n";
        let report = LogReader::read_from(&mut &data[..]).unwrap();
        assert_eq!(report.corrupt_count(), 0);
        assert_eq!(report.entries[0].details, Some(serde_json::json!([1, 2])));
        assert_eq!(report.entries[0].metadata, None);
    }
}
