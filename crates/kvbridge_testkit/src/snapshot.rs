//! On-disk snapshots of the reference engine.
//!
//! A snapshot is the full set of committed records, CBOR-encoded. Writes go
//! to a sibling temporary file that is then renamed over the target, so a
//! reader sees either the old or the new snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Committed records, ordered by key.
pub(crate) type Records = BTreeMap<Vec<u8>, Vec<u8>>;

const FORMAT_VERSION: u16 = 1;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u16,
    records: Vec<Record>,
}

#[derive(Serialize, Deserialize)]
struct Record {
    key: Vec<u8>,
    value: Vec<u8>,
}

#[derive(Debug, Error)]
pub(crate) enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed snapshot: {0}")]
    Malformed(String),

    #[error("unsupported snapshot version {0}")]
    Version(u16),
}

pub(crate) fn load(path: &Path) -> Result<Records, SnapshotError> {
    let reader = BufReader::new(File::open(path)?);
    let snapshot: Snapshot =
        ciborium::from_reader(reader).map_err(|e| SnapshotError::Malformed(e.to_string()))?;
    if snapshot.version != FORMAT_VERSION {
        return Err(SnapshotError::Version(snapshot.version));
    }
    Ok(snapshot
        .records
        .into_iter()
        .map(|record| (record.key, record.value))
        .collect())
}

pub(crate) fn save(path: &Path, records: &Records) -> Result<(), SnapshotError> {
    let snapshot = Snapshot {
        version: FORMAT_VERSION,
        records: records
            .iter()
            .map(|(key, value)| Record {
                key: key.clone(),
                value: value.clone(),
            })
            .collect(),
    };

    let tmp = temp_path(path);
    let mut writer = BufWriter::new(File::create(&tmp)?);
    ciborium::into_writer(&snapshot, &mut writer)
        .map_err(|e| SnapshotError::Malformed(e.to_string()))?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    drop(writer);
    fs::rename(&tmp, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.db");

        let mut records = Records::new();
        records.insert(b"a".to_vec(), b"1".to_vec());
        records.insert(b"empty".to_vec(), Vec::new());
        save(&path, &records).unwrap();

        assert_eq!(load(&path).unwrap(), records);
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn garbage_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.db");
        fs::write(&path, b"\xff\x00not cbor").unwrap();
        assert!(matches!(load(&path), Err(SnapshotError::Malformed(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load(&dir.path().join("absent.db")),
            Err(SnapshotError::Io(_))
        ));
    }
}
