//! JSON file holding the latest report

use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::pipeline::Report;
use crate::storage::{StoreError, StoreResult};

/// Write `report` to `path` as pretty-printed JSON
///
/// The report is written to a temporary file next to `path` and renamed over
/// it, so readers never observe a partially written report.
pub fn write_report(path: &Path, report: &Report) -> StoreResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e))?;

    let mut file = NamedTempFile::new_in(&dir).map_err(|e| io_error(&dir, e))?;
    serde_json::to_writer_pretty(&mut file, report)?;
    file.write_all(b"\n").map_err(|e| io_error(path, e))?;
    file.persist(path).map_err(|e| io_error(path, e.error))?;

    Ok(())
}

/// Read the stored report as raw JSON
///
/// # Returns
/// `None` if no report has been written yet
pub fn read_report(path: &Path) -> StoreResult<Option<Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error(path, e)),
    };

    Ok(Some(serde_json::from_str(&content)?))
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}
