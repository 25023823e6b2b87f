//! Per-document error taxonomy.
//!
//! These errors never abort a batch: the scanner, extractor, and reconciler
//! record them against the offending document and move on. Operation-level
//! failures (registry writes, config loading) use `anyhow` instead.

use std::path::PathBuf;
use thiserror::Error;

/// A failure attributable to a single document or artifact.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// File could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The structured header or YAML body is malformed.
    #[error("failed to parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    /// Required fields are missing or empty.
    #[error("{} has validation errors: {}", .path.display(), .errors.join(", "))]
    Schema { path: PathBuf, errors: Vec<String> },

    /// The file extension is not a recognized document format.
    #[error("unsupported context file format '{extension}' for {}", .path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },
}
