//! Checksummed record envelopes and atomic file writes shared by every table.

use crate::{fsync_dir, StoreError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::warn;

const MAX_KEY_LEN: usize = 64;

#[derive(Serialize)]
struct EnvelopeRef<'a, R> {
    record: &'a R,
    checksum: String,
}

#[derive(Deserialize)]
struct Envelope<R> {
    record: R,
    checksum: String,
}

/// Keys become file names, so they are restricted to `[A-Za-z0-9_-]{1,64}`.
pub fn validate_key(kind: &str, key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(StoreError::InvalidKey(format!(
            "{kind} must be 1-{MAX_KEY_LEN} characters"
        )));
    }
    if !key
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    {
        return Err(StoreError::InvalidKey(format!(
            "{kind} '{key}' must match [a-zA-Z0-9_-]"
        )));
    }
    Ok(())
}

/// Write `content` to `dest` through a temp file in `dir`, then fsync the directory.
pub(crate) fn write_atomic(dir: &Path, dest: &Path, content: &[u8]) -> Result<(), StoreError> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| StoreError::Io(e.error))?;
    fsync_dir(dir)?;
    Ok(())
}

pub(crate) fn checksum<R: Serialize>(record: &R) -> Result<String, StoreError> {
    let json = serde_json::to_string_pretty(record)?;
    Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
}

pub(crate) fn write_record<R: Serialize>(
    dir: &Path,
    name: &str,
    record: &R,
) -> Result<(), StoreError> {
    let envelope = EnvelopeRef {
        record,
        checksum: checksum(record)?,
    };
    let content = serde_json::to_string_pretty(&envelope)?;
    write_atomic(dir, &dir.join(name), content.as_bytes())
}

pub(crate) fn read_record<R: Serialize + DeserializeOwned>(
    path: &Path,
    key: &str,
) -> Result<R, StoreError> {
    let content = fs::read_to_string(path)?;
    let envelope: Envelope<R> = serde_json::from_str(&content)?;
    let actual = checksum(&envelope.record)?;
    if actual != envelope.checksum {
        return Err(StoreError::IntegrityFailure {
            key: key.to_owned(),
            expected: envelope.checksum,
            actual,
        });
    }
    Ok(envelope.record)
}

/// Read every record file in `dir`, keeping per-entry failures.
///
/// Dot files (the lock file, in-flight temp files) are skipped.
#[allow(clippy::type_complexity)]
pub(crate) fn scan_records<R: Serialize + DeserializeOwned>(
    dir: &Path,
) -> Result<Vec<Result<R, (String, StoreError)>>, StoreError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut results = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name_str = name.to_str().unwrap_or("").to_owned();
        if name_str.is_empty() || name_str.starts_with('.') {
            continue;
        }
        match read_record(&entry.path(), &name_str) {
            Ok(record) => results.push(Ok(record)),
            Err(e) => results.push(Err((name_str, e))),
        }
    }
    Ok(results)
}

/// Like [`scan_records`], but drops corrupt entries with a warning.
pub(crate) fn load_records<R: Serialize + DeserializeOwned>(
    dir: &Path,
    table: &str,
) -> Result<Vec<R>, StoreError> {
    let mut records = Vec::new();
    for result in scan_records(dir)? {
        match result {
            Ok(record) => records.push(record),
            Err((name, e)) => warn!("skipping corrupted {table} entry '{name}': {e}"),
        }
    }
    Ok(records)
}
