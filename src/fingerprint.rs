//! Content fingerprints for change detection.
//!
//! A fingerprint is the lowercase hex SHA-256 of the raw bytes. It is only
//! used to notice that something changed between a sync and a later
//! validation; nothing relies on it as a security property.

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::DocumentError;

/// Fingerprint an in-memory byte slice. Never fails.
pub fn fingerprint(bytes: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes.as_ref());
    hex::encode(hasher.finalize())
}

/// Read a file and fingerprint its bytes.
pub fn fingerprint_file(path: &Path) -> Result<String, DocumentError> {
    let bytes = std::fs::read(path).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(fingerprint(bytes))
}

/// Fold several fingerprints into one, independent of input order.
///
/// The members are sorted and concatenated before hashing, so the same set
/// always produces the same aggregate.
pub fn combine<I, S>(members: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut members: Vec<String> = members
        .into_iter()
        .map(|m| m.as_ref().to_string())
        .collect();
    members.sort();
    fingerprint(members.concat())
}

/// Fingerprint a target artifact, which may be a file or a directory.
///
/// Directories fold `"<name>:<fingerprint>"` over their direct child files,
/// so adding, removing, renaming, or editing a child changes the result.
pub fn fingerprint_target(path: &Path) -> Result<String, DocumentError> {
    if !path.is_dir() {
        return fingerprint_file(path);
    }

    let io_err = |source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut members = Vec::new();
    for entry in std::fs::read_dir(path).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let child = entry.path();
        if !child.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        members.push(format!("{}:{}", name, fingerprint_file(&child)?));
    }
    Ok(combine(members))
}
