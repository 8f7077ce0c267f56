//! Configuration loading from file, environment, and CLI arguments.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{PmemError, PmemResult, DEFAULT_DEPTH};

/// Environment variable naming the log file.
pub const LOG_PATH_ENV: &str = "PMEM_LOG";

/// Log location used when nothing else is configured.
pub const DEFAULT_LOG_PATH: &str = ".bootstrap/process_memory.jsonl";

/// Store and query configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the JSONL log. Resolved by [`StoreConfig::resolve`].
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    /// Traversal depth when a caller does not give one.
    #[serde(default = "default_depth")]
    pub default_depth: u32,
    /// Whether context queries return dangling references.
    #[serde(default)]
    pub include_dangling: bool,
    /// Whether context queries return deprecated entries.
    #[serde(default)]
    pub include_deprecated: bool,
}

fn default_depth() -> u32 {
    DEFAULT_DEPTH
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            default_depth: default_depth(),
            include_dangling: false,
            include_deprecated: false,
        }
    }
}

impl StoreConfig {
    /// Compose configuration: optional TOML file first, then the log path
    /// resolved against the CLI argument and environment.
    pub fn resolve(explicit_log: Option<&Path>, config_file: Option<&Path>) -> PmemResult<Self> {
        let mut config = match config_file {
            Some(path) => load_config(path)?,
            None => Self::default(),
        };
        config.log_path = Some(resolve_log_path(explicit_log, config.log_path.as_deref()));
        Ok(config)
    }

    /// The log path, falling back to the default location.
    pub fn log_path(&self) -> PathBuf {
        self.log_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH))
    }
}

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> PmemResult<StoreConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        PmemError::Config(format!("failed to read config file {}: {e}", path.display()))
    })?;

    toml::from_str(&content)
        .map_err(|e| PmemError::Config(format!("failed to parse {}: {e}", path.display())))
}

/// Resolve the log path using priority order:
/// 1. Explicit path (CLI arg)
/// 2. PMEM_LOG environment variable
/// 3. Path from the config file
/// 4. .bootstrap/process_memory.jsonl in the current directory
pub fn resolve_log_path(explicit: Option<&Path>, configured: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Ok(env_path) = std::env::var(LOG_PATH_ENV) {
        if !env_path.trim().is_empty() {
            return PathBuf::from(env_path);
        }
    }

    configured
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn explicit_path_wins() {
        let p = resolve_log_path(Some(Path::new("/tmp/x.jsonl")), Some(Path::new("/tmp/y.jsonl")));
        assert_eq!(p, PathBuf::from("/tmp/x.jsonl"));
    }

    #[test]
    fn missing_keys_take_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "include_dangling = true").unwrap();
        let config = load_config(file.path()).unwrap();
        assert!(config.include_dangling);
        assert!(!config.include_deprecated);
        assert_eq!(config.default_depth, DEFAULT_DEPTH);
        assert_eq!(config.log_path, None);
    }

    #[test]
    fn config_file_and_cli_compose() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "log_path = \"from-file.jsonl\"\ndefault_depth = 3").unwrap();
        let config =
            StoreConfig::resolve(Some(Path::new("from-cli.jsonl")), Some(file.path())).unwrap();
        assert_eq!(config.log_path(), PathBuf::from("from-cli.jsonl"));
        assert_eq!(config.default_depth, 3);
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "default_depth = \"deep\"").unwrap();
        assert!(matches!(load_config(file.path()), Err(PmemError::Config(_))));
    }
}
