//! Persistent registry files.
//!
//! Both collections live as YAML next to the global documents:
//!
//! ```text
//! ctx/
//!   local-context-registry.yml    # target path → LocalEntry
//!   global-context-registry.yml   # document path → GlobalEntry, folders
//! ```
//!
//! Reading never fails: a missing, unreadable, or corrupt file yields a
//! fresh empty registry. Writing always re-stamps `meta.last_synced`.
//!
//! There is no locking. Running two syncs against the same project at once
//! is the caller's problem.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::config::{Config, GLOBAL_REGISTRY_FILE, LOCAL_REGISTRY_FILE};
use crate::models::{GlobalRegistry, LocalRegistry, RegistryMeta};

/// A registry collection that can be persisted by [`RegistryStore`].
pub trait RegistryFile: Serialize + DeserializeOwned {
    /// File name inside the registry directory.
    const FILE_NAME: &'static str;

    /// Human label used in logs (`"local"`, `"global"`).
    const KIND: &'static str;

    /// A freshly initialized, empty collection.
    fn empty() -> Self;

    fn meta_mut(&mut self) -> &mut RegistryMeta;

    /// Number of entries in the collection.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RegistryFile for LocalRegistry {
    const FILE_NAME: &'static str = LOCAL_REGISTRY_FILE;
    const KIND: &'static str = "local";

    fn empty() -> Self {
        LocalRegistry {
            meta: RegistryMeta::fresh(),
            contexts: Default::default(),
        }
    }

    fn meta_mut(&mut self) -> &mut RegistryMeta {
        &mut self.meta
    }

    fn len(&self) -> usize {
        self.contexts.len()
    }
}

impl RegistryFile for GlobalRegistry {
    const FILE_NAME: &'static str = GLOBAL_REGISTRY_FILE;
    const KIND: &'static str = "global";

    fn empty() -> Self {
        GlobalRegistry {
            meta: RegistryMeta::fresh(),
            contexts: Default::default(),
            folders: Default::default(),
        }
    }

    fn meta_mut(&mut self) -> &mut RegistryMeta {
        &mut self.meta
    }

    fn len(&self) -> usize {
        self.contexts.len()
    }
}

/// Reads and writes registry files under one project's global directory.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    dir: PathBuf,
}

impl RegistryStore {
    pub fn new(project_root: &Path, config: &Config) -> Self {
        Self {
            dir: config.global_dir(project_root),
        }
    }

    /// Store rooted at an explicit directory.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for<R: RegistryFile>(&self) -> PathBuf {
        self.dir.join(R::FILE_NAME)
    }

    pub fn exists<R: RegistryFile>(&self) -> bool {
        self.path_for::<R>().is_file()
    }

    /// Load a registry, or an empty one if it is absent or unusable.
    pub fn read<R: RegistryFile>(&self) -> R {
        let path = self.path_for::<R>();
        if !path.exists() {
            return R::empty();
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                warn!(
                    "Failed to read {} registry {}: {}. Starting from an empty registry.",
                    R::KIND,
                    path.display(),
                    err
                );
                return R::empty();
            }
        };

        match serde_yaml::from_str::<R>(&content) {
            Ok(registry) => registry,
            Err(err) => {
                warn!(
                    "Failed to parse {} registry {}: {}. Starting from an empty registry.",
                    R::KIND,
                    path.display(),
                    err
                );
                R::empty()
            }
        }
    }

    /// Stamp `last_synced` and persist. The directory is created if needed,
    /// and the file is replaced atomically via a sibling temp file.
    pub fn write<R: RegistryFile>(&self, registry: &mut R) -> Result<()> {
        registry.meta_mut().last_synced = chrono::Utc::now();

        std::fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create registry directory: {}", self.dir.display())
        })?;

        let path = self.path_for::<R>();
        let yaml = serialize(registry)
            .with_context(|| format!("Failed to serialize {} registry", R::KIND))?;

        let tmp = path.with_extension("yml.tmp");
        std::fs::write(&tmp, yaml)
            .with_context(|| format!("Failed to write registry: {}", tmp.display()))?;
        if let Err(err) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(err)
                .with_context(|| format!("Failed to write registry: {}", path.display()));
        }

        Ok(())
    }
}

/// Serialize a registry to its on-disk YAML form.
pub fn serialize<R: RegistryFile>(registry: &R) -> Result<String> {
    Ok(serde_yaml::to_string(registry)?)
}
