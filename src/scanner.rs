//! Document discovery.
//!
//! Walks a root directory and returns every file whose root-relative path
//! matches the include globs and none of the ignore globs. Each file is
//! visited once and tested against the union of all patterns, so files
//! matched by several overlapping patterns are reported a single time.
//!
//! Discovery is best effort: a missing root yields nothing, and unreadable
//! files are logged and skipped.

use anyhow::Result;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::{build_globset, Config, GLOBAL_REGISTRY_FILE, LOCAL_REGISTRY_FILE};
use crate::error::DocumentError;
use crate::models::ScannedDocument;

/// Hidden directories are never part of the global document set.
const HIDDEN_DIRS: &str = "**/.*/**";

/// Scan `root` and return matching documents with paths relative to `root`.
pub fn scan_documents(
    root: &Path,
    patterns: &[String],
    ignore: &[String],
) -> Result<Vec<ScannedDocument>> {
    if !root.is_dir() {
        debug!(root = %root.display(), "scan root does not exist, nothing to scan");
        return Ok(Vec::new());
    }

    let include_set = build_globset(patterns)?;
    let exclude_set = build_globset(ignore)?;

    let mut items = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable path during scan: {}", err);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = to_slash(relative);

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !include_set.is_match(&rel_str) {
            continue;
        }

        match read_document(path) {
            Ok(content) => items.push(ScannedDocument {
                absolute_path: path.to_path_buf(),
                relative_path: rel_str,
                content,
            }),
            Err(err) => warn!("Skipping {}: {}", rel_str, err),
        }
    }

    // Sort for deterministic ordering
    items.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    Ok(items)
}

/// Scan the project for local documents.
///
/// The global directory is always excluded so a global document is never
/// also treated as a local one. Its name is matched literally.
pub fn scan_local(project_root: &Path, config: &Config) -> Result<Vec<ScannedDocument>> {
    let mut ignore = config.local.ignore.clone();
    ignore.push(format!("{}/**", globset::escape(&config.global_prefix())));

    scan_documents(project_root, &config.local.patterns.to_vec(), &ignore)
}

/// Scan the global directory. Ignore globs are rooted at that directory;
/// returned relative paths are rooted at the project (`ctx/rules/a.md`).
pub fn scan_global(project_root: &Path, config: &Config) -> Result<Vec<ScannedDocument>> {
    let global_root = config.global_dir(project_root);

    let mut ignore = config.global.ignore.clone();
    ignore.extend([
        HIDDEN_DIRS.to_string(),
        LOCAL_REGISTRY_FILE.to_string(),
        GLOBAL_REGISTRY_FILE.to_string(),
    ]);

    let prefix = config.global_prefix();
    let mut items = scan_documents(&global_root, &config.global.patterns.to_vec(), &ignore)?;
    for item in &mut items {
        item.relative_path = format!("{}/{}", prefix, item.relative_path);
    }
    Ok(items)
}

/// Top-level folder of a global document, or `None` for root-level files.
///
/// `ctx/rules/naming.md` is in `rules`; `ctx/overview.md` has no folder.
pub fn extract_folder(relative_path: &str, global_prefix: &str) -> Option<String> {
    let normalized = relative_path.replace('\\', "/");
    let within = normalized
        .strip_prefix(global_prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(&normalized);

    let mut parts = within.split('/').filter(|p| !p.is_empty());
    let first = parts.next()?;
    parts.next().map(|_| first.to_string())
}

/// Path of a global document relative to the global directory.
pub fn path_within_global<'a>(relative_path: &'a str, global_prefix: &str) -> &'a str {
    relative_path
        .strip_prefix(global_prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(relative_path)
}

fn read_document(path: &Path) -> Result<String, DocumentError> {
    let bytes = std::fs::read(path).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|_| DocumentError::Parse {
        path: path.to_path_buf(),
        reason: "file is not valid UTF-8".to_string(),
    })
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn rel_paths(items: &[ScannedDocument]) -> Vec<&str> {
        items.iter().map(|i| i.relative_path.as_str()).collect()
    }

    #[test]
    fn finds_local_documents() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/utils/helper.ctx.md", "# Helper");
        write(dir.path(), "src/services/api.ctx.md", "# API");
        write(dir.path(), "src/components/ctx.md", "# Components");
        write(dir.path(), "src/models/user.ts", "// not a doc");

        let items = scan_local(dir.path(), &Config::default()).unwrap();
        assert_eq!(
            rel_paths(&items),
            vec![
                "src/components/ctx.md",
                "src/services/api.ctx.md",
                "src/utils/helper.ctx.md"
            ]
        );
    }

    #[test]
    fn loads_content_and_paths() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/test.ctx.md", "# Test\n\nBody.");

        let items = scan_local(dir.path(), &Config::default()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content, "# Test\n\nBody.");
        assert_eq!(items[0].absolute_path, dir.path().join("src/test.ctx.md"));
    }

    #[test]
    fn local_scan_excludes_ignored_and_global_dirs() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/app.ctx.md", "# App");
        write(dir.path(), "node_modules/lib/test.ctx.md", "# ignored");
        write(dir.path(), "ctx/rules/ctx.md", "# global, not local");

        let items = scan_local(dir.path(), &Config::default()).unwrap();
        assert_eq!(rel_paths(&items), vec!["src/app.ctx.md"]);
    }

    #[test]
    fn local_scan_respects_custom_ignore() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/app.ctx.md", "# App");
        write(dir.path(), "test/utils.ctx.md", "# ignored");

        let mut config = Config::default();
        config.local.ignore.push("test/**".to_string());
        let items = scan_local(dir.path(), &config).unwrap();
        assert_eq!(rel_paths(&items), vec!["src/app.ctx.md"]);
    }

    #[test]
    fn global_directory_with_glob_metacharacters_is_excluded() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/a.ctx.md", "# A");
        write(dir.path(), "docs[1]/api/ctx.md", "# global");
        write(dir.path(), "{docs/api/ctx.md", "# global");

        let mut config = Config::default();
        config.global.directory = "docs[1]".to_string();
        let items = scan_local(dir.path(), &config).unwrap();
        assert_eq!(rel_paths(&items), vec!["src/a.ctx.md", "{docs/api/ctx.md"]);

        config.global.directory = "{docs".to_string();
        let items = scan_local(dir.path(), &config).unwrap();
        assert_eq!(rel_paths(&items), vec!["docs[1]/api/ctx.md", "src/a.ctx.md"]);
    }

    #[test]
    fn overlapping_patterns_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/a.ctx.md", "# A");

        let patterns = vec!["**/*.ctx.md".to_string(), "src/**".to_string()];
        let items = scan_documents(dir.path(), &patterns, &[]).unwrap();
        assert_eq!(rel_paths(&items), vec!["src/a.ctx.md"]);
    }

    #[test]
    fn finds_global_documents_with_project_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "ctx/overview.md", "# Overview");
        write(dir.path(), "ctx/architecture/design.md", "# Design");
        write(dir.path(), "ctx/a/b/c/deep.md", "# Deep");

        let items = scan_global(dir.path(), &Config::default()).unwrap();
        assert_eq!(
            rel_paths(&items),
            vec!["ctx/a/b/c/deep.md", "ctx/architecture/design.md", "ctx/overview.md"]
        );
    }

    #[test]
    fn global_ignore_is_rooted_at_global_dir() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "ctx/architecture.md", "# Architecture");
        write(dir.path(), "ctx/templates/local.md", "# Template");
        write(dir.path(), "ctx/README.md", "# Readme");
        write(dir.path(), "ctx/rules/README.md", "# Nested readme is kept");
        write(dir.path(), "ctx/.vscode/settings.md", "# hidden");
        write(dir.path(), "ctx/local-context-registry.yml", "meta: {}");

        let items = scan_global(dir.path(), &Config::default()).unwrap();
        assert_eq!(
            rel_paths(&items),
            vec!["ctx/architecture.md", "ctx/rules/README.md"]
        );
    }

    #[test]
    fn custom_global_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "docs/guide.md", "# Guide");
        write(dir.path(), "docs/api/reference.md", "# Reference");

        let mut config = Config::default();
        config.global.directory = "docs".to_string();
        let items = scan_global(dir.path(), &config).unwrap();
        assert_eq!(rel_paths(&items), vec!["docs/api/reference.md", "docs/guide.md"]);
    }

    #[test]
    fn missing_global_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let items = scan_global(dir.path(), &Config::default()).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn unreadable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/good.ctx.md", "# ok");
        let bad = dir.path().join("src/bad.ctx.md");
        fs::write(&bad, [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        let items = scan_local(dir.path(), &Config::default()).unwrap();
        assert_eq!(rel_paths(&items), vec!["src/good.ctx.md"]);
    }

    #[test]
    fn folder_extraction() {
        assert_eq!(extract_folder("ctx/rules/api-design.md", "ctx"), Some("rules".into()));
        assert_eq!(extract_folder("ctx/overview.md", "ctx"), None);
        assert_eq!(
            extract_folder("ctx/architecture/backend/db.md", "ctx"),
            Some("architecture".into())
        );
        assert_eq!(extract_folder("ctx\\rules\\naming.md", "ctx"), Some("rules".into()));
        assert_eq!(extract_folder("docs/guides/intro.md", "docs"), Some("guides".into()));
    }

    #[test]
    fn path_within_global_strips_prefix() {
        assert_eq!(path_within_global("ctx/rules/a.md", "ctx"), "rules/a.md");
        assert_eq!(path_within_global("other/a.md", "ctx"), "other/a.md");
    }
}
