//! Registry validation against live filesystem state.
//!
//! Each entry runs through an ordered list of checks and stops at the first
//! failure:
//!
//! | # | Check | Local | Global | Code | Severity |
//! |---|-------|-------|--------|------|----------|
//! | 1 | document exists | ✓ | ✓ | `E102` | error |
//! | 2 | document parses / has required fields | ✓ | ✓ | `E003` / `E001` | error |
//! | 3 | target exists | ✓ | | `W101` | warning |
//! | 4 | document checksum unchanged | ✓ | ✓ | `W201` | warning |
//! | 5 | target checksum unchanged | ✓ | | `W202` | warning |
//!
//! Validation is read-only. Anything unexpected while checking one entry is
//! reported as an `E999` issue for that entry and the run continues.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

use crate::config::Config;
use crate::error::DocumentError;
use crate::extract::{extract, validate_document};
use crate::fingerprint::{fingerprint, fingerprint_target};
use crate::models::{GlobalEntry, GlobalRegistry, LocalEntry, LocalRegistry};
use crate::paths::key_to_path;
use crate::store::RegistryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Which family of check produced an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    Schema,
    Existence,
    Checksum,
}

/// Stable issue identifiers. `E` codes are errors, `W` codes are warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IssueCode {
    #[serde(rename = "E102")]
    DocumentMissing,
    #[serde(rename = "E001")]
    SchemaInvalid,
    #[serde(rename = "E003")]
    ParseFailed,
    #[serde(rename = "W101")]
    TargetMissing,
    #[serde(rename = "W201")]
    DocumentChanged,
    #[serde(rename = "W202")]
    TargetChanged,
    #[serde(rename = "E999")]
    Unexpected,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::DocumentMissing => "E102",
            IssueCode::SchemaInvalid => "E001",
            IssueCode::ParseFailed => "E003",
            IssueCode::TargetMissing => "W101",
            IssueCode::DocumentChanged => "W201",
            IssueCode::TargetChanged => "W202",
            IssueCode::Unexpected => "E999",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            IssueCode::TargetMissing | IssueCode::DocumentChanged | IssueCode::TargetChanged => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }

    pub fn check(&self) -> CheckKind {
        match self {
            IssueCode::DocumentMissing | IssueCode::TargetMissing => CheckKind::Existence,
            IssueCode::DocumentChanged | IssueCode::TargetChanged => CheckKind::Checksum,
            IssueCode::SchemaInvalid | IssueCode::ParseFailed | IssueCode::Unexpected => {
                CheckKind::Schema
            }
        }
    }

    pub fn suggestion(&self) -> &'static str {
        match self {
            IssueCode::DocumentMissing => "Remove entry from registry or restore file",
            IssueCode::SchemaInvalid => "Fix required fields in the document header",
            IssueCode::ParseFailed => "Check YAML/Markdown frontmatter syntax",
            IssueCode::TargetMissing => "Target may have been moved or deleted",
            IssueCode::DocumentChanged => "Run `ctx sync` to update registry",
            IssueCode::TargetChanged => {
                "Review changes and update context if needed, then run `ctx sync`"
            }
            IssueCode::Unexpected => "Re-run with --verbose for details",
        }
    }
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed check for one registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// Project-relative document path.
    pub document: String,
    /// Registry key of the target (local entries only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub severity: Severity,
    pub code: IssueCode,
    pub check: CheckKind,
    pub message: String,
    pub suggestion: String,
}

impl Issue {
    fn new(code: IssueCode, document: &str, target: Option<&str>, message: String) -> Self {
        Self {
            document: document.to_string(),
            target: target.map(str::to_string),
            severity: code.severity(),
            code,
            check: code.check(),
            message,
            suggestion: code.suggestion().to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Per-entry checks
// ═══════════════════════════════════════════════════════════════════════

/// Validate one local entry. `None` means every check passed.
pub fn validate_local_entry(project_root: &Path, key: &str, entry: &LocalEntry) -> Option<Issue> {
    check_local(project_root, key, entry)
        .unwrap_or_else(|err| Some(unexpected(&entry.source, Some(key), &err)))
}

/// Validate one global entry. `None` means every check passed.
pub fn validate_global_entry(
    project_root: &Path,
    _key: &str,
    entry: &GlobalEntry,
) -> Option<Issue> {
    check_global(project_root, entry).unwrap_or_else(|err| Some(unexpected(&entry.source, None, &err)))
}

fn check_local(
    project_root: &Path,
    key: &str,
    entry: &LocalEntry,
) -> Result<Option<Issue>, DocumentError> {
    let target = Some(key);
    let doc_path = project_root.join(&entry.source);

    let bytes = match read_existing(&doc_path)? {
        Some(bytes) => bytes,
        None => {
            return Ok(Some(Issue::new(
                IssueCode::DocumentMissing,
                &entry.source,
                target,
                format!("Context file not found: {}", entry.source),
            )))
        }
    };

    if let Some(issue) = check_schema(&entry.source, target, &bytes) {
        return Ok(Some(issue));
    }

    let target_path = key_to_path(project_root, key);
    if !target_path.exists() {
        return Ok(Some(Issue::new(
            IssueCode::TargetMissing,
            &entry.source,
            target,
            format!("Target file not found: {}", key),
        )));
    }

    if fingerprint(&bytes) != entry.checksum {
        return Ok(Some(Issue::new(
            IssueCode::DocumentChanged,
            &entry.source,
            target,
            "Context file has changed since last sync".to_string(),
        )));
    }

    if fingerprint_target(&target_path)? != entry.target_checksum {
        return Ok(Some(Issue::new(
            IssueCode::TargetChanged,
            &entry.source,
            target,
            "Target file has changed since last sync".to_string(),
        )));
    }

    Ok(None)
}

fn check_global(project_root: &Path, entry: &GlobalEntry) -> Result<Option<Issue>, DocumentError> {
    let doc_path = project_root.join(&entry.source);

    let bytes = match read_existing(&doc_path)? {
        Some(bytes) => bytes,
        None => {
            return Ok(Some(Issue::new(
                IssueCode::DocumentMissing,
                &entry.source,
                None,
                format!("Document file not found: {}", entry.source),
            )))
        }
    };

    if let Some(issue) = check_schema(&entry.source, None, &bytes) {
        return Ok(Some(issue));
    }

    if fingerprint(&bytes) != entry.checksum {
        return Ok(Some(Issue::new(
            IssueCode::DocumentChanged,
            &entry.source,
            None,
            "Document has changed since last sync".to_string(),
        )));
    }

    Ok(None)
}

/// `None` when the document file is gone.
fn read_existing(path: &Path) -> Result<Option<Vec<u8>>, DocumentError> {
    if !path.is_file() {
        return Ok(None);
    }
    std::fs::read(path)
        .map(Some)
        .map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn check_schema(source: &str, target: Option<&str>, bytes: &[u8]) -> Option<Issue> {
    let parse_failed = |reason: String| {
        Some(Issue::new(
            IssueCode::ParseFailed,
            source,
            target,
            format!("Failed to parse document: {}", reason),
        ))
    };

    let Ok(content) = std::str::from_utf8(bytes) else {
        return parse_failed("file is not valid UTF-8".to_string());
    };

    let doc = match extract(Path::new(source), content) {
        Ok(doc) => doc,
        Err(err) => return parse_failed(err.to_string()),
    };

    let result = validate_document(&doc);
    if result.valid {
        None
    } else {
        Some(Issue::new(
            IssueCode::SchemaInvalid,
            source,
            target,
            format!("Schema validation failed: {}", result.errors.join(", ")),
        ))
    }
}

fn unexpected(source: &str, target: Option<&str>, err: &DocumentError) -> Issue {
    warn!("Unexpected error validating {}: {}", source, err);
    Issue::new(
        IssueCode::Unexpected,
        source,
        target,
        format!("Unexpected validation error: {}", err),
    )
}

// ═══════════════════════════════════════════════════════════════════════
// Report
// ═══════════════════════════════════════════════════════════════════════

/// Which collections to validate. Neither flag set means both.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateOptions {
    pub local: bool,
    pub global: bool,
}

/// Aggregate over every validated entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub total: usize,
    pub valid: usize,
    pub warnings: usize,
    pub errors: usize,
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    fn record(&mut self, issue: Option<Issue>) {
        self.total += 1;
        match issue {
            None => self.valid += 1,
            Some(issue) => {
                match issue.severity {
                    Severity::Error => self.errors += 1,
                    Severity::Warning => self.warnings += 1,
                }
                self.issues.push(issue);
            }
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

/// Validate every entry in the selected registries.
pub fn run_validation(
    project_root: &Path,
    config: &Config,
    options: ValidateOptions,
) -> ValidationReport {
    let (check_local_entries, check_global_entries) = if !options.local && !options.global {
        (true, true)
    } else {
        (options.local, options.global)
    };

    let store = RegistryStore::new(project_root, config);
    let mut report = ValidationReport::default();

    if check_local_entries {
        let registry: LocalRegistry = store.read();
        for (key, entry) in &registry.contexts {
            report.record(validate_local_entry(project_root, key, entry));
        }
    }

    if check_global_entries {
        let registry: GlobalRegistry = store.read();
        for (key, entry) in &registry.contexts {
            report.record(validate_global_entry(project_root, key, entry));
        }
    }

    report
}

/// Pretty-printed JSON form of a report.
pub fn report_json(report: &ValidationReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Print a report to stdout: summary, then errors, then warnings.
pub fn print_report(report: &ValidationReport) {
    println!("Validation Report");
    println!("{}", "─".repeat(60));
    println!();
    println!("Summary:");
    println!("  Total contexts: {}", report.total);
    println!("  Valid:          {}", report.valid);
    if report.warnings > 0 {
        println!("  Warnings:       {}", report.warnings);
    }
    if report.errors > 0 {
        println!("  Errors:         {}", report.errors);
    }
    println!();

    for (heading, severity) in [("Errors:", Severity::Error), ("Warnings:", Severity::Warning)] {
        let issues: Vec<&Issue> = report
            .issues
            .iter()
            .filter(|i| i.severity == severity)
            .collect();
        if issues.is_empty() {
            continue;
        }
        println!("{}", heading);
        println!();
        for (index, issue) in issues.iter().enumerate() {
            println!("{}. {}", index + 1, issue.document);
            if let Some(target) = &issue.target {
                println!("   Target: {}", target);
            }
            println!("   [{}] {}", issue.code, issue.message);
            println!("   -> {}", issue.suggestion);
            println!();
        }
    }

    if report.errors > 0 {
        println!("Validation failed. Please fix errors above.");
    } else if report.warnings > 0 {
        println!("Validation passed with warnings.");
    } else {
        println!("Validation passed.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{reconcile_global, reconcile_local};
    use std::fs;

    const DOC: &str = "---\ntarget: /src/a.ts\nwhat: A\nwhen:\n  - editing a\n---\n";

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// Project with one synced local document and its target.
    fn synced_project() -> (tempfile::TempDir, LocalEntry) {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/a.ctx.md", DOC);
        write(dir.path(), "src/a.ts", "export const a = 1;");
        reconcile_local(dir.path(), &Config::default()).unwrap();

        let registry: LocalRegistry = RegistryStore::new(dir.path(), &Config::default()).read();
        let entry = registry.contexts["/src/a.ts"].clone();
        (dir, entry)
    }

    #[test]
    fn freshly_synced_entry_is_valid() {
        let (dir, entry) = synced_project();
        assert_eq!(validate_local_entry(dir.path(), "/src/a.ts", &entry), None);
    }

    #[test]
    fn missing_document_reports_only_document_missing() {
        let (dir, entry) = synced_project();
        fs::remove_file(dir.path().join("src/a.ctx.md")).unwrap();
        // Also break the target; the check must never get that far.
        fs::remove_file(dir.path().join("src/a.ts")).unwrap();

        let report = run_validation(dir.path(), &Config::default(), ValidateOptions::default());
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].code, IssueCode::DocumentMissing);
        assert_eq!(report.issues[0].check, CheckKind::Existence);
        assert_eq!(report.errors, 1);

        let issue = validate_local_entry(dir.path(), "/src/a.ts", &entry).unwrap();
        assert_eq!(issue.severity, Severity::Error);
        assert_eq!(issue.target.as_deref(), Some("/src/a.ts"));
    }

    #[test]
    fn schema_violation_is_an_error() {
        let (dir, entry) = synced_project();
        write(dir.path(), "src/a.ctx.md", "---\nwhat: A\n---\n");

        let issue = validate_local_entry(dir.path(), "/src/a.ts", &entry).unwrap();
        assert_eq!(issue.code, IssueCode::SchemaInvalid);
        assert!(issue.message.contains("when"));
    }

    #[test]
    fn malformed_header_is_a_parse_failure() {
        let (dir, entry) = synced_project();
        write(dir.path(), "src/a.ctx.md", "---\nwhat: [unclosed\n---\n");

        let issue = validate_local_entry(dir.path(), "/src/a.ts", &entry).unwrap();
        assert_eq!(issue.code, IssueCode::ParseFailed);
        assert_eq!(issue.check, CheckKind::Schema);
    }

    #[test]
    fn missing_target_is_a_warning() {
        let (dir, entry) = synced_project();
        fs::remove_file(dir.path().join("src/a.ts")).unwrap();

        let issue = validate_local_entry(dir.path(), "/src/a.ts", &entry).unwrap();
        assert_eq!(issue.code, IssueCode::TargetMissing);
        assert_eq!(issue.severity, Severity::Warning);
    }

    #[test]
    fn document_drift_is_detected_and_cleared_by_sync() {
        let (dir, entry) = synced_project();
        let changed = DOC.replace("what: A", "what: A, revised");
        write(dir.path(), "src/a.ctx.md", &changed);

        let issue = validate_local_entry(dir.path(), "/src/a.ts", &entry).unwrap();
        assert_eq!(issue.code, IssueCode::DocumentChanged);

        reconcile_local(dir.path(), &Config::default()).unwrap();
        let registry: LocalRegistry = RegistryStore::new(dir.path(), &Config::default()).read();
        let entry = &registry.contexts["/src/a.ts"];
        assert_eq!(entry.checksum, fingerprint(&changed));
        assert_eq!(validate_local_entry(dir.path(), "/src/a.ts", entry), None);
    }

    #[test]
    fn target_drift_is_detected() {
        let (dir, entry) = synced_project();
        write(dir.path(), "src/a.ts", "export const a = 2;");

        let issue = validate_local_entry(dir.path(), "/src/a.ts", &entry).unwrap();
        assert_eq!(issue.code, IssueCode::TargetChanged);
        assert_eq!(issue.check, CheckKind::Checksum);
    }

    #[test]
    fn global_entries_skip_target_checks() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        write(dir.path(), "ctx/rules/naming.md", "---\nwhat: Naming\nwhen: [naming]\n---\n");
        reconcile_global(dir.path(), &config).unwrap();

        let report = run_validation(
            dir.path(),
            &config,
            ValidateOptions {
                local: false,
                global: true,
            },
        );
        assert_eq!(report.total, 1);
        assert_eq!(report.valid, 1);

        write(dir.path(), "ctx/rules/naming.md", "---\nwhat: Naming\nwhen: [naming, style]\n---\n");
        let report = run_validation(dir.path(), &config, ValidateOptions::default());
        assert_eq!(report.warnings, 1);
        assert_eq!(report.issues[0].code, IssueCode::DocumentChanged);
        assert_eq!(report.issues[0].target, None);
    }

    #[test]
    fn report_counts_and_json_shape() {
        let (dir, _) = synced_project();
        write(dir.path(), "src/b.ctx.md", "---\nwhat: B\nwhen: [b]\n---\n");
        reconcile_local(dir.path(), &Config::default()).unwrap();
        fs::remove_file(dir.path().join("src/b.ctx.md")).unwrap();

        let report = run_validation(dir.path(), &Config::default(), ValidateOptions::default());
        assert_eq!(report.total, 2);
        assert_eq!(report.valid, 1);
        assert_eq!(report.errors, 1);
        assert!(report.has_errors());

        let json: serde_json::Value = serde_json::from_str(&report_json(&report).unwrap()).unwrap();
        assert_eq!(json["errors"], 1);
        assert_eq!(json["issues"][0]["code"], "E102");
        assert_eq!(json["issues"][0]["severity"], "error");
        assert_eq!(json["issues"][0]["check"], "existence");
    }

    #[test]
    fn unexpected_failures_become_issues() {
        let err = DocumentError::Parse {
            path: "x".into(),
            reason: "boom".to_string(),
        };
        let issue = unexpected("src/x.ctx.md", None, &err);
        assert_eq!(issue.code, IssueCode::Unexpected);
        assert_eq!(issue.severity, Severity::Error);
        assert_eq!(issue.code.to_string(), "E999");
    }
}
