//! Project initialization (`ctx init`).
//!
//! Creates whatever is missing and leaves existing files alone, so running
//! it on an initialized project is harmless.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::{default_config_toml, load_config, CONFIG_FILE};
use crate::models::{GlobalRegistry, LocalRegistry};
use crate::store::{RegistryFile, RegistryStore};

const README_FILE: &str = "README.md";

/// Paths created by [`init_project`]; pre-existing ones are not listed.
#[derive(Debug, Default)]
pub struct InitReport {
    pub created: Vec<PathBuf>,
}

/// True when the project has a `ctx.toml`.
pub fn is_initialized(project_root: &Path) -> bool {
    project_root.join(CONFIG_FILE).is_file()
}

pub fn init_project(project_root: &Path) -> Result<InitReport> {
    let mut report = InitReport::default();

    let config_path = project_root.join(CONFIG_FILE);
    if !config_path.exists() {
        std::fs::write(&config_path, default_config_toml())
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        report.created.push(config_path);
    }

    // An existing ctx.toml may point the global directory elsewhere.
    let config = load_config(project_root)?;
    let global_dir = config.global_dir(project_root);
    if !global_dir.is_dir() {
        std::fs::create_dir_all(&global_dir).with_context(|| {
            format!("Failed to create directory: {}", global_dir.display())
        })?;
        report.created.push(global_dir.clone());
    }

    let readme = global_dir.join(README_FILE);
    if !readme.exists() {
        std::fs::write(&readme, readme_content(&config.global_prefix()))
            .with_context(|| format!("Failed to write {}", readme.display()))?;
        report.created.push(readme);
    }

    let store = RegistryStore::new(project_root, &config);
    create_registry(&store, LocalRegistry::empty(), &mut report)?;
    create_registry(&store, GlobalRegistry::empty(), &mut report)?;

    Ok(report)
}

fn create_registry<R: RegistryFile>(
    store: &RegistryStore,
    mut registry: R,
    report: &mut InitReport,
) -> Result<()> {
    if store.exists::<R>() {
        return Ok(());
    }
    store.write(&mut registry)?;
    report.created.push(store.path_for::<R>());
    Ok(())
}

fn readme_content(global_dir: &str) -> String {
    format!(
        r#"# Context Directory

Project-wide context documents live here (`{dir}/**/*.md`).

Each document starts with a YAML header:

```markdown
---
what: One-line summary of the document
when:
  - Situations where it applies
not_when:
  - Situations where it does not
---
```

`local-context-registry.yml` and `global-context-registry.yml` are
generated by `ctx sync`. Do not edit them by hand.
"#,
        dir = global_dir
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn creates_config_directory_and_empty_registries() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_initialized(dir.path()));

        let report = init_project(dir.path()).unwrap();
        assert!(is_initialized(dir.path()));
        assert!(dir.path().join("ctx/README.md").is_file());
        assert_eq!(report.created.len(), 5);

        let store = RegistryStore::new(dir.path(), &Config::default());
        assert!(store.exists::<LocalRegistry>());
        assert!(store.exists::<GlobalRegistry>());
        let global: GlobalRegistry = store.read();
        assert!(global.contexts.is_empty());
        assert!(global.folders.is_empty());
    }

    #[test]
    fn rerun_keeps_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        init_project(dir.path()).unwrap();
        std::fs::write(dir.path().join("ctx/README.md"), "custom").unwrap();

        let report = init_project(dir.path()).unwrap();
        assert!(report.created.is_empty());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("ctx/README.md")).unwrap(),
            "custom"
        );
    }

    #[test]
    fn honors_existing_global_directory_setting() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[global]\ndirectory = \"docs\"\n").unwrap();

        init_project(dir.path()).unwrap();
        assert!(dir.path().join("docs/local-context-registry.yml").is_file());
        assert!(!dir.path().join("ctx").exists());
    }
}
