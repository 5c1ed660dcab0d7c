//! Environment variable utilities for evosolve
//!
//! Every lookup has a `*_from` twin taking the raw value so callers (and
//! tests) can resolve configuration without touching the process environment.

use crate::constants::{
    DEFAULT_LOG_FILTER, DEFAULT_RECORDS_DIR, LOG_VAR, RECORDS_DIR_VAR, TIMING_VAR,
};
use std::env;
use std::path::PathBuf;

/// Error type for environment variable issues
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("EVOSOLVE_RECORDS_DIR points to a file, not a directory: {0}")]
    RecordsDirIsFile(PathBuf),

    #[error("Failed to create records directory {path}: {source}")]
    RecordsDirCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolve the records directory from an optional raw value, creating it if necessary
pub fn records_dir_from(value: Option<String>) -> Result<PathBuf, EnvError> {
    let path = match value {
        Some(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => PathBuf::from(DEFAULT_RECORDS_DIR),
    };

    if path.is_file() {
        return Err(EnvError::RecordsDirIsFile(path));
    }
    if !path.exists() {
        std::fs::create_dir_all(&path)
            .map_err(|source| EnvError::RecordsDirCreationFailed { path: path.clone(), source })?;
    }
    Ok(path)
}

/// Directory where CSV monitors write their records
///
/// Reads `EVOSOLVE_RECORDS_DIR`, falling back to `./data_generated/records`.
///
/// # Example
///
/// ```no_run
/// let dir = evosolve_env::records_dir()?;
/// println!("records go to {}", dir.display());
/// # Ok::<(), evosolve_env::EnvError>(())
/// ```
pub fn records_dir() -> Result<PathBuf, EnvError> {
    records_dir_from(env::var(RECORDS_DIR_VAR).ok())
}

/// `true` unless the raw value is absent, empty or "0"
pub fn timing_enabled_from(value: Option<String>) -> bool {
    value.map(|v| !v.is_empty() && v != "0").unwrap_or(false)
}

/// Whether the DE loop should log per-phase timings (`EVOSOLVE_DE_TIMING`)
pub fn timing_enabled() -> bool {
    timing_enabled_from(env::var(TIMING_VAR).ok())
}

/// Log filter for binaries: `EVOSOLVE_LOG` or `info`
pub fn log_filter() -> String {
    env::var(LOG_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_dir_created() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("nested").join("records");
        let dir = records_dir_from(Some(target.display().to_string())).unwrap();
        assert_eq!(dir, target);
        assert!(dir.is_dir());
    }

    #[test]
    fn test_records_dir_rejects_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let result = records_dir_from(Some(tmp.path().display().to_string()));
        assert!(matches!(result, Err(EnvError::RecordsDirIsFile(_))));
    }

    #[test]
    fn test_timing_flag() {
        assert!(!timing_enabled_from(None));
        assert!(!timing_enabled_from(Some("0".into())));
        assert!(!timing_enabled_from(Some(String::new())));
        assert!(timing_enabled_from(Some("1".into())));
    }
}
