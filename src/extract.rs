//! Metadata extraction for context documents.
//!
//! Two on-disk formats normalize into the same [`ContextDocument`]:
//!
//! | Extension | Format | Body |
//! |-----------|--------|------|
//! | `.md`, `.markdown` | `---` YAML frontmatter, then markdown | trimmed remainder |
//! | `.yml`, `.yaml` | whole file is YAML (legacy) | always empty |
//!
//! Extraction only fails on structure (malformed YAML, unterminated header,
//! unknown extension). Missing fields are reported separately by
//! [`validate_document`] so callers can list every problem at once.

use serde_yaml::{Mapping, Value};
use std::path::Path;

use crate::error::DocumentError;
use crate::models::{
    ContextDocument, DocumentFormat, Preview, ValidatedDocument, SCHEMA_VERSION,
};

const FENCE: &str = "---";

/// Parse a document, dispatching on its file extension.
pub fn extract(path: &Path, content: &str) -> Result<ContextDocument, DocumentError> {
    match document_format(path)? {
        DocumentFormat::Markdown => parse_markdown(path, content),
        DocumentFormat::LegacyYaml => parse_legacy(path, content),
    }
}

/// Map a path's extension to a document format.
pub fn document_format(path: &Path) -> Result<DocumentFormat, DocumentError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "md" | "markdown" => Ok(DocumentFormat::Markdown),
        "yml" | "yaml" => Ok(DocumentFormat::LegacyYaml),
        _ => Err(DocumentError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension: if ext.is_empty() {
                "(none)".to_string()
            } else {
                format!(".{}", ext)
            },
        }),
    }
}

fn parse_markdown(path: &Path, content: &str) -> Result<ContextDocument, DocumentError> {
    let parse_err = |reason: String| DocumentError::Parse {
        path: path.to_path_buf(),
        reason,
    };

    let (header, body) = match split_frontmatter(content).map_err(parse_err)? {
        Some((yaml, body)) => (parse_mapping(yaml).map_err(parse_err)?, body),
        None => (Mapping::new(), content),
    };

    Ok(ContextDocument {
        format: DocumentFormat::Markdown,
        schema_version: schema_version(&header, None),
        target: string_field(&header, &["target"]),
        what: string_field(&header, &["what"]).unwrap_or_default(),
        when: list_field(&header, &["when"]).unwrap_or_default(),
        not_when: list_field(&header, &["not_when", "notWhen"]),
        future: sequence_field(&header, "future"),
        body: body.trim().to_string(),
    })
}

fn parse_legacy(path: &Path, content: &str) -> Result<ContextDocument, DocumentError> {
    let root = parse_mapping(content).map_err(|reason| DocumentError::Parse {
        path: path.to_path_buf(),
        reason,
    })?;
    let meta = root.get("meta").and_then(Value::as_mapping);

    let target = meta
        .and_then(|m| string_field(m, &["target"]))
        .or_else(|| string_field(&root, &["target"]));

    Ok(ContextDocument {
        format: DocumentFormat::LegacyYaml,
        schema_version: schema_version(&root, meta),
        target,
        what: string_field(&root, &["what"]).unwrap_or_default(),
        when: list_field(&root, &["when"]).unwrap_or_default(),
        not_when: list_field(&root, &["not_when", "notWhen"]),
        future: sequence_field(&root, "future"),
        body: String::new(),
    })
}

/// Split `---`-fenced frontmatter from the body.
///
/// Returns `Ok(None)` when the content has no header at all, and an error
/// when a header is opened but never closed.
fn split_frontmatter(content: &str) -> Result<Option<(&str, &str)>, String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.split_inclusive('\n');

    let Some(first) = lines.next() else {
        return Ok(None);
    };
    if first.trim_end() != FENCE {
        return Ok(None);
    }

    let start = first.len();
    let mut offset = start;
    for line in lines {
        if line.trim_end() == FENCE {
            return Ok(Some((&content[start..offset], &content[offset + line.len()..])));
        }
        offset += line.len();
    }

    Err("unterminated frontmatter block (missing closing `---`)".to_string())
}

/// Parse YAML that must be a mapping. An empty document is an empty mapping.
fn parse_mapping(yaml: &str) -> Result<Mapping, String> {
    match serde_yaml::from_str::<Value>(yaml).map_err(|e| e.to_string())? {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        _ => Err("structured block must be a key/value mapping".to_string()),
    }
}

fn schema_version(map: &Mapping, meta: Option<&Mapping>) -> String {
    const NAMES: &[&str] = &["version", "schema_version", "schemaVersion"];
    meta.and_then(|m| string_field(m, NAMES))
        .or_else(|| string_field(map, NAMES))
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| SCHEMA_VERSION.to_string())
}

fn string_field(map: &Mapping, names: &[&str]) -> Option<String> {
    names.iter().find_map(|n| map.get(*n)).and_then(scalar_string)
}

fn list_field(map: &Mapping, names: &[&str]) -> Option<Vec<String>> {
    match names.iter().find_map(|n| map.get(*n))? {
        Value::Sequence(items) => Some(items.iter().filter_map(scalar_string).collect()),
        _ => None,
    }
}

fn sequence_field(map: &Mapping, name: &str) -> Option<Vec<Value>> {
    map.get(name).and_then(Value::as_sequence).cloned()
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Validation
// ═══════════════════════════════════════════════════════════════════════

/// Outcome of checking a document's required fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Check every required-field rule and report all violations.
pub fn validate_document(doc: &ContextDocument) -> DocumentValidation {
    let mut errors = Vec::new();

    if doc.schema_version.trim().is_empty() {
        errors.push("Missing required field: version".to_string());
    }
    if doc.what.trim().is_empty() {
        errors.push("Missing required field: what".to_string());
    }
    if doc.when.is_empty() {
        errors.push("Missing or empty required field: when".to_string());
    }
    if doc.format == DocumentFormat::LegacyYaml
        && doc.target.as_deref().map_or(true, |t| t.trim().is_empty())
    {
        errors.push("Missing required field: meta.target".to_string());
    }
    if let Some(target) = doc.target.as_deref() {
        if target.split(['/', '\\']).any(|segment| segment == "..") {
            errors.push(format!("Invalid target '{}': must stay inside the project", target));
        }
    }

    DocumentValidation {
        valid: errors.is_empty(),
        errors,
    }
}

impl ContextDocument {
    /// Promote to a [`ValidatedDocument`], or return every violation.
    pub fn into_validated(self) -> Result<ValidatedDocument, Vec<String>> {
        let validation = validate_document(&self);
        if validation.valid {
            Ok(ValidatedDocument::new(self))
        } else {
            Err(validation.errors)
        }
    }
}

/// Extract and validate in one step, attributing errors to `path`.
pub fn extract_validated(path: &Path, content: &str) -> Result<ValidatedDocument, DocumentError> {
    extract(path, content)?
        .into_validated()
        .map_err(|errors| DocumentError::Schema {
            path: path.to_path_buf(),
            errors,
        })
}

/// Cheap preview straight from markdown frontmatter.
///
/// Used for global documents: rejects anything without a non-empty `what`
/// string and a non-empty `when` list before any full parse. Parse failures
/// are reported as absence, not as errors.
pub fn preview_from_markdown(content: &str) -> Option<Preview> {
    let (yaml, _) = split_frontmatter(content).ok()??;
    let header = parse_mapping(yaml).ok()?;

    let what = header.get("what").and_then(Value::as_str)?;
    if what.trim().is_empty() {
        return None;
    }
    let when = list_field(&header, &["when"]).filter(|w| !w.is_empty())?;

    Some(Preview {
        what: what.to_string(),
        when,
        not_when: list_field(&header, &["not_when", "notWhen"]),
    })
}
