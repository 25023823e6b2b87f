//! Registry keys and target-path inference.
//!
//! Registry keys are project-rooted, `/`-separated, and always start with a
//! leading slash: `/src/utils/url.ts`, `/rules/naming.md`.

use std::path::{Path, PathBuf};

use crate::config::DIRECTORY_MARKER;

/// Suffix that marks a file as documentation for a sibling artifact.
const DOC_MARKER_SUFFIX: &str = ".ctx";

/// Normalize a user-supplied path into a registry key.
///
/// `src\utils\` becomes `/src/utils`, `/a.ts` is unchanged.
pub fn normalize_key(path: &str) -> String {
    let normalized = path.trim().replace('\\', "/");
    let cleaned = normalized.trim_end_matches('/');
    if cleaned.starts_with('/') {
        cleaned.to_string()
    } else {
        format!("/{}", cleaned)
    }
}

/// Absolute on-disk location of a registry key.
pub fn key_to_path(project_root: &Path, key: &str) -> PathBuf {
    project_root.join(key.trim_start_matches('/'))
}

/// Infer the target key of a local document from its own location.
///
/// `src/a/b.ctx.md` documents `/src/a/b` (extension not yet resolved), while
/// the directory marker `src/a/ctx.md` documents `/src/a` itself.
pub fn infer_target_base(relative_doc_path: &str) -> String {
    let normalized = relative_doc_path.replace('\\', "/");
    let (dir, file_name) = match normalized.rsplit_once('/') {
        Some((dir, name)) => (dir, name),
        None => ("", normalized.as_str()),
    };

    let stem = match file_name.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => file_name,
    };

    if stem == DIRECTORY_MARKER {
        return normalize_key(dir);
    }

    let base = stem.strip_suffix(DOC_MARKER_SUFFIX).unwrap_or(stem);
    if dir.is_empty() {
        normalize_key(base)
    } else {
        normalize_key(&format!("{}/{}", dir, base))
    }
}

/// True for file names that are themselves context documents.
pub fn is_context_document(file_name: &str) -> bool {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    stem == DIRECTORY_MARKER || stem.ends_with(DOC_MARKER_SUFFIX)
}

/// Resolve an inferred base to a concrete artifact on disk.
///
/// An exact match wins. Otherwise sibling files whose stem equals the base
/// name are considered, documentation files excluded, and the
/// lexicographically first is chosen. With no candidate the base is kept.
pub fn resolve_target(project_root: &Path, base: &str, doc_file_name: &str) -> String {
    if base == "/" || key_to_path(project_root, base).exists() {
        return base.to_string();
    }

    let (parent_key, name) = match base.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => return base.to_string(),
    };

    let Ok(entries) = std::fs::read_dir(key_to_path(project_root, parent_key)) else {
        return base.to_string();
    };

    let mut candidates: Vec<String> = entries
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|file| file != doc_file_name && !is_context_document(file))
        .filter(|file| {
            Path::new(file)
                .file_stem()
                .map(|s| s.to_string_lossy() == name)
                .unwrap_or(false)
        })
        .collect();
    candidates.sort();

    match candidates.first() {
        Some(file) => format!("{}/{}", parent_key, file),
        None => base.to_string(),
    }
}

/// Registry key for a local document: explicit `target` first, otherwise
/// inferred from the document's path and resolved against the filesystem.
pub fn local_target_key(
    project_root: &Path,
    relative_doc_path: &str,
    explicit_target: Option<&str>,
) -> String {
    if let Some(target) = explicit_target.filter(|t| !t.trim().is_empty()) {
        return normalize_key(target);
    }

    let doc_file_name = relative_doc_path
        .replace('\\', "/")
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();
    let base = infer_target_base(relative_doc_path);
    resolve_target(project_root, &base, &doc_file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_key_variants() {
        assert_eq!(normalize_key("src/a.ts"), "/src/a.ts");
        assert_eq!(normalize_key("/src/a.ts"), "/src/a.ts");
        assert_eq!(normalize_key("src\\utils\\"), "/src/utils");
        assert_eq!(normalize_key(""), "/");
    }

    #[test]
    fn infers_base_from_document_name() {
        assert_eq!(infer_target_base("src/a/b.ctx.md"), "/src/a/b");
        assert_eq!(infer_target_base("src/a/b.ctx.yml"), "/src/a/b");
        assert_eq!(infer_target_base("src/a/b.md"), "/src/a/b");
        assert_eq!(infer_target_base("top.ctx.md"), "/top");
    }

    #[test]
    fn directory_marker_targets_containing_directory() {
        assert_eq!(infer_target_base("src/components/ctx.md"), "/src/components");
        assert_eq!(infer_target_base("src\\api\\ctx.yml"), "/src/api");
        assert_eq!(infer_target_base("ctx.md"), "/");
    }

    #[test]
    fn resolves_unique_sibling_artifact() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("src/a");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("b.ts"), "export {}").unwrap();
        std::fs::write(dir.join("b.ctx.md"), "---\n---\n").unwrap();

        assert_eq!(
            local_target_key(root.path(), "src/a/b.ctx.md", None),
            "/src/a/b.ts"
        );
    }

    #[test]
    fn ambiguous_siblings_resolve_lexicographically() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("src");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("foo.ts"), "").unwrap();
        std::fs::write(dir.join("foo.js"), "").unwrap();

        assert_eq!(
            local_target_key(root.path(), "src/foo.ctx.md", None),
            "/src/foo.js"
        );
    }

    #[test]
    fn missing_artifact_keeps_base() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(
            local_target_key(root.path(), "src/ghost.ctx.md", None),
            "/src/ghost"
        );
    }

    #[test]
    fn documentation_files_are_not_candidates() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("src");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("b.md"), "doc").unwrap();

        // `b.md` is the document itself, not its target.
        assert_eq!(local_target_key(root.path(), "src/b.md", None), "/src/b");
    }

    #[test]
    fn explicit_target_wins() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(
            local_target_key(root.path(), "docs/x.ctx.md", Some("src/real.ts")),
            "/src/real.ts"
        );
    }

    #[test]
    fn directory_target_exists_as_is() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("src/api")).unwrap();
        assert_eq!(
            local_target_key(root.path(), "src/api/ctx.md", None),
            "/src/api"
        );
    }
}
