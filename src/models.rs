//! Core data models used throughout the registry engine.
//!
//! Documents flow in from the scanner as raw text, are normalized by the
//! extractor into [`ContextDocument`]s, and end up denormalized into
//! registry entries that are persisted as YAML.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Schema version stamped into new registries and defaulted into documents.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Raw file discovered by the scanner, before any parsing.
#[derive(Debug, Clone)]
pub struct ScannedDocument {
    /// Absolute path on disk.
    pub absolute_path: PathBuf,
    /// Path relative to the project root, always `/`-separated.
    pub relative_path: String,
    /// Full file content.
    pub content: String,
}

/// On-disk layout a document was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Frontmatter header followed by a markdown body.
    Markdown,
    /// Whole file is a YAML mapping; never has a body.
    LegacyYaml,
}

/// Normalized metadata record for one context document.
///
/// Produced by [`crate::extract::extract`]. The record may still violate the
/// required-field rules; use [`crate::extract::validate_document`] or
/// [`ContextDocument::into_validated`] before letting it near a registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextDocument {
    pub format: DocumentFormat,
    pub schema_version: String,
    /// Explicit target override (local documents only).
    pub target: Option<String>,
    pub what: String,
    pub when: Vec<String>,
    pub not_when: Option<Vec<String>>,
    pub future: Option<Vec<serde_yaml::Value>>,
    pub body: String,
}

/// A document that passed required-field validation.
///
/// Only constructible inside the crate, through the extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDocument(ContextDocument);

impl ValidatedDocument {
    pub(crate) fn new(doc: ContextDocument) -> Self {
        Self(doc)
    }

    pub fn document(&self) -> &ContextDocument {
        &self.0
    }

    /// Project the fields stored in registry entries.
    pub fn preview(&self) -> Preview {
        Preview {
            what: self.0.what.clone(),
            when: self.0.when.clone(),
            not_when: self.0.not_when.clone(),
        }
    }
}

/// Denormalized metadata copied into registry entries for fast listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub what: String,
    pub when: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_when: Option<Vec<String>>,
}

/// Registry header shared by both collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryMeta {
    pub version: String,
    pub last_synced: DateTime<Utc>,
}

impl RegistryMeta {
    pub fn fresh() -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            last_synced: Utc::now(),
        }
    }
}

/// Registry record for a document bound to one source artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalEntry {
    /// Document path relative to the project root.
    pub source: String,
    pub checksum: String,
    /// Empty when the target did not exist at sync time.
    pub target_checksum: String,
    pub last_modified: DateTime<Utc>,
    pub preview: Preview,
}

/// Registry record for a free-standing document under the global directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalEntry {
    pub source: String,
    pub folder: Option<String>,
    pub checksum: String,
    pub last_modified: DateTime<Utc>,
    pub preview: Preview,
}

/// Aggregate over every global entry sharing a top-level folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderMeta {
    pub checksum: String,
    pub last_modified: DateTime<Utc>,
}

/// Local collection, keyed by target path (e.g. `/src/utils/url.ts`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalRegistry {
    pub meta: RegistryMeta,
    #[serde(default)]
    pub contexts: BTreeMap<String, LocalEntry>,
}

/// Global collection, keyed by document path under the global directory
/// (e.g. `/rules/naming.md`), plus folder aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalRegistry {
    pub meta: RegistryMeta,
    #[serde(default)]
    pub contexts: BTreeMap<String, GlobalEntry>,
    #[serde(default)]
    pub folders: BTreeMap<String, FolderMeta>,
}
