//! Reconciliation: scan → extract → fingerprint → merge into the registry.
//!
//! Local and global documents follow different merge policies:
//!
//! | Class | Existing entries | Keyed by |
//! |-------|------------------|----------|
//! | local | kept unless re-synced (upsert) | target path |
//! | global | cleared, full rebuild | document path under the global dir |
//!
//! Global folder aggregates are recomputed from scratch on every pass.
//! A bad document is skipped and reported; it never aborts the batch.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::DocumentError;
use crate::extract::{extract_validated, preview_from_markdown};
use crate::fingerprint::{combine, fingerprint, fingerprint_target};
use crate::models::{
    FolderMeta, GlobalEntry, GlobalRegistry, LocalEntry, LocalRegistry, ScannedDocument,
};
use crate::paths::{key_to_path, local_target_key, normalize_key};
use crate::scanner::{extract_folder, path_within_global, scan_global, scan_local};
use crate::store::RegistryStore;

/// A document that was scanned but not written to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    /// Project-relative document path.
    pub path: String,
    pub reason: String,
}

/// Outcome of one reconciliation direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Documents discovered by the scanner, whether or not they were written.
    pub scanned: usize,
    /// Entries written this pass.
    pub reconciled: usize,
    pub skipped: Vec<SkippedDocument>,
    /// Non-fatal observations, such as a missing target artifact.
    pub warnings: Vec<String>,
}

impl ReconcileReport {
    fn skip(&mut self, path: &str, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("Skipping {}: {}", path, reason);
        self.skipped.push(SkippedDocument {
            path: path.to_string(),
            reason,
        });
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Local
// ═══════════════════════════════════════════════════════════════════════

/// Rebuild local entries for every local document found in the project.
///
/// Entries for documents outside this scan are preserved, so several
/// differently-filtered syncs can share one registry.
pub fn reconcile_local(project_root: &Path, config: &Config) -> Result<ReconcileReport> {
    let scanned = scan_local(project_root, config)?;
    let store = RegistryStore::new(project_root, config);
    let mut registry: LocalRegistry = store.read();

    let mut report = ReconcileReport {
        scanned: scanned.len(),
        ..Default::default()
    };

    for doc in &scanned {
        match local_entry(project_root, doc) {
            Ok((key, entry, warning)) => {
                if let Some(warning) = warning {
                    report.warnings.push(warning);
                }
                registry.contexts.insert(key, entry);
                report.reconciled += 1;
            }
            Err(err) => report.skip(&doc.relative_path, err.to_string()),
        }
    }

    store.write(&mut registry)?;
    info!(
        scanned = report.scanned,
        reconciled = report.reconciled,
        skipped = report.skipped.len(),
        "local registry synced"
    );

    Ok(report)
}

fn local_entry(
    project_root: &Path,
    doc: &ScannedDocument,
) -> Result<(String, LocalEntry, Option<String>), DocumentError> {
    let validated = extract_validated(Path::new(&doc.relative_path), &doc.content)?;

    let key = local_target_key(
        project_root,
        &doc.relative_path,
        validated.document().target.as_deref(),
    );
    let checksum = fingerprint(&doc.content);
    let last_modified = modified_at(&doc.absolute_path)?;

    let target_path = key_to_path(project_root, &key);
    let (target_checksum, warning) = if target_path.exists() {
        (fingerprint_target(&target_path)?, None)
    } else {
        let warning = format!("Target file not found: {} (from {})", key, doc.relative_path);
        warn!("{}", warning);
        (String::new(), Some(warning))
    };

    let entry = LocalEntry {
        source: doc.relative_path.clone(),
        checksum,
        target_checksum,
        last_modified,
        preview: validated.preview(),
    };

    Ok((key, entry, warning))
}

// ═══════════════════════════════════════════════════════════════════════
// Global
// ═══════════════════════════════════════════════════════════════════════

/// Rebuild the global registry from scratch, including folder aggregates.
pub fn reconcile_global(project_root: &Path, config: &Config) -> Result<ReconcileReport> {
    let scanned = scan_global(project_root, config)?;
    let store = RegistryStore::new(project_root, config);
    let mut registry: GlobalRegistry = store.read();
    registry.contexts.clear();

    let prefix = config.global_prefix();
    let mut report = ReconcileReport {
        scanned: scanned.len(),
        ..Default::default()
    };

    for doc in &scanned {
        let Some(preview) = preview_from_markdown(&doc.content) else {
            report.skip(
                &doc.relative_path,
                "no valid frontmatter (missing 'when' or 'what')",
            );
            continue;
        };

        let last_modified = match modified_at(&doc.absolute_path) {
            Ok(ts) => ts,
            Err(err) => {
                report.skip(&doc.relative_path, err.to_string());
                continue;
            }
        };

        let key = normalize_key(path_within_global(&doc.relative_path, &prefix));
        let entry = GlobalEntry {
            source: doc.relative_path.clone(),
            folder: extract_folder(&doc.relative_path, &prefix),
            checksum: fingerprint(&doc.content),
            last_modified,
            preview,
        };
        registry.contexts.insert(key, entry);
        report.reconciled += 1;
    }

    registry.folders = build_folders(&registry.contexts);
    store.write(&mut registry)?;
    info!(
        scanned = report.scanned,
        reconciled = report.reconciled,
        folders = registry.folders.len(),
        "global registry synced"
    );

    Ok(report)
}

/// Fold global entries into per-folder aggregates.
///
/// The combined checksum hashes the sorted member checksums, so it does not
/// depend on discovery order. Root-level documents belong to no folder.
pub fn build_folders(entries: &BTreeMap<String, GlobalEntry>) -> BTreeMap<String, FolderMeta> {
    let mut grouped: BTreeMap<&str, (Vec<&str>, DateTime<Utc>)> = BTreeMap::new();

    for entry in entries.values() {
        let Some(folder) = entry.folder.as_deref() else {
            continue;
        };
        let slot = grouped
            .entry(folder)
            .or_insert_with(|| (Vec::new(), entry.last_modified));
        slot.0.push(entry.checksum.as_str());
        if entry.last_modified > slot.1 {
            slot.1 = entry.last_modified;
        }
    }

    grouped
        .into_iter()
        .map(|(folder, (checksums, last_modified))| {
            (
                folder.to_string(),
                FolderMeta {
                    checksum: combine(checksums),
                    last_modified,
                },
            )
        })
        .collect()
}

fn modified_at(path: &Path) -> Result<DateTime<Utc>, DocumentError> {
    let io_err = |source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    };
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(io_err)?;
    Ok(DateTime::<Utc>::from(modified))
}

// ═══════════════════════════════════════════════════════════════════════
// Sync orchestration
// ═══════════════════════════════════════════════════════════════════════

/// Which collections to reconcile. Neither flag set means both.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub local: bool,
    pub global: bool,
}

impl SyncOptions {
    pub fn directions(&self) -> (bool, bool) {
        if !self.local && !self.global {
            (true, true)
        } else {
            (self.local, self.global)
        }
    }
}

/// Combined outcome of a sync. A failed direction has no report and an
/// entry in `errors`.
#[derive(Debug, Default)]
pub struct SyncResult {
    pub local: Option<ReconcileReport>,
    pub global: Option<ReconcileReport>,
    pub errors: Vec<String>,
}

impl SyncResult {
    pub fn local_synced(&self) -> usize {
        self.local.as_ref().map_or(0, |r| r.scanned)
    }

    pub fn global_synced(&self) -> usize {
        self.global.as_ref().map_or(0, |r| r.scanned)
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Reconcile the requested collections.
///
/// Local and global run on separate blocking tasks. They touch different
/// registry files, and a failure in one never stops the other.
pub async fn run_sync(project_root: &Path, config: &Config, options: SyncOptions) -> SyncResult {
    let (sync_local, sync_global) = options.directions();

    let spawn = |f: fn(&Path, &Config) -> Result<ReconcileReport>| {
        let root: PathBuf = project_root.to_path_buf();
        let config = config.clone();
        tokio::task::spawn_blocking(move || f(&root, &config))
    };

    let local_task = sync_local.then(|| spawn(reconcile_local));
    let global_task = sync_global.then(|| spawn(reconcile_global));

    let mut result = SyncResult::default();
    if let Some(task) = local_task {
        result.local = collect("local", task.await, &mut result.errors);
    }
    if let Some(task) = global_task {
        result.global = collect("global", task.await, &mut result.errors);
    }
    result
}

fn collect(
    kind: &str,
    joined: std::result::Result<Result<ReconcileReport>, tokio::task::JoinError>,
    errors: &mut Vec<String>,
) -> Option<ReconcileReport> {
    match joined {
        Ok(Ok(report)) => Some(report),
        Ok(Err(err)) => {
            errors.push(format!("Failed to sync {} contexts: {:#}", kind, err));
            None
        }
        Err(err) => {
            errors.push(format!("{} sync task failed: {}", kind, err));
            None
        }
    }
}

/// Print a human-readable summary of a sync to stdout.
pub fn print_sync_summary(result: &SyncResult) {
    for (kind, report) in [("local", &result.local), ("global", &result.global)] {
        let Some(report) = report else { continue };
        println!("sync {}", kind);
        println!("  scanned: {}", report.scanned);
        println!("  reconciled: {}", report.reconciled);
        if !report.skipped.is_empty() {
            println!("  skipped: {}", report.skipped.len());
            for skipped in &report.skipped {
                println!("    {}: {}", skipped.path, skipped.reason);
            }
        }
        for warning in &report.warnings {
            println!("  warning: {}", warning);
        }
    }

    println!();
    println!("Local: {}", result.local_synced());
    println!("Global: {}", result.global_synced());

    if result.is_success() {
        println!("ok");
    } else {
        for err in &result.errors {
            println!("error: {}", err);
        }
        println!("{} error(s) occurred during sync.", result.errors.len());
    }
}
