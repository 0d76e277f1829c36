//! Backup-then-replace writes.
//!
//! The original bytes go to `<path><suffix>` first and are read back and
//! compared by SHA-256. Only then is the new text written to a temporary file
//! next to the original and renamed over it. A failure before the rename
//! leaves the original untouched.

use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::document::Document;
use crate::error::FileError;

/// Paths touched by a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    pub path: PathBuf,
    pub backup: PathBuf,
}

pub fn backup_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

pub fn commit(doc: &Document, new_text: &str, suffix: &str) -> Result<Committed, FileError> {
    let original = doc.encode(&doc.text);
    let backup = backup_path(&doc.path, suffix);
    let backup_err = |source| FileError::Backup {
        path: backup.clone(),
        source,
    };

    std::fs::write(&backup, &original).map_err(backup_err)?;
    let written = std::fs::read(&backup).map_err(backup_err)?;
    if digest(&written) != digest(&original) {
        return Err(backup_err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "backup content does not match the original",
        )));
    }

    let write_err = |source| FileError::Write {
        path: doc.path.clone(),
        source,
    };
    let dir = match doc.path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(&doc.encode(new_text)).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    if let Ok(meta) = std::fs::metadata(&doc.path) {
        let _ = std::fs::set_permissions(tmp.path(), meta.permissions());
    }
    tmp.persist(&doc.path).map_err(|e| write_err(e.error))?;

    Ok(Committed {
        path: doc.path.clone(),
        backup,
    })
}
