//! Project configuration (`ctx.toml`).
//!
//! ```toml
//! [local]
//! patterns = ["**/*.ctx.md", "**/ctx.md"]
//! ignore = ["test/**"]
//!
//! [global]
//! directory = "ctx"
//! patterns = "**/*.md"
//! ignore = ["drafts/**"]
//! ```
//!
//! User `ignore` lists are appended to the built-in defaults; `patterns`
//! replace the defaults. A missing file yields [`Config::default`].

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::path::{Component, Path};

/// File name of the project configuration, relative to the project root.
pub const CONFIG_FILE: &str = "ctx.toml";

/// Directory-context marker: `ctx.md` documents the directory it lives in.
pub const DIRECTORY_MARKER: &str = "ctx";

pub const LOCAL_REGISTRY_FILE: &str = "local-context-registry.yml";
pub const GLOBAL_REGISTRY_FILE: &str = "global-context-registry.yml";

const DEFAULT_LOCAL_PATTERNS: &[&str] = &["**/*.ctx.md", "**/ctx.md", "**/*.ctx.yml", "**/ctx.yml"];
const DEFAULT_LOCAL_IGNORE: &[&str] = &[
    "node_modules/**",
    "dist/**",
    "build/**",
    ".git/**",
    "target/**",
];
const DEFAULT_GLOBAL_DIRECTORY: &str = "ctx";
const DEFAULT_GLOBAL_PATTERN: &str = "**/*.md";
const DEFAULT_GLOBAL_IGNORE: &[&str] = &["templates/**", "README.md", "*-context-registry.yml"];

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub local: LocalConfig,
    pub global: GlobalConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalConfig {
    pub patterns: PatternSet,
    pub ignore: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalConfig {
    /// Global document root, relative to the project root.
    pub directory: String,
    pub patterns: PatternSet,
    /// Rooted at [`GlobalConfig::directory`], not at the project root.
    pub ignore: Vec<String>,
}

/// One glob or a list of globs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PatternSet {
    One(String),
    Many(Vec<String>),
}

impl PatternSet {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            PatternSet::One(p) => vec![p.clone()],
            PatternSet::Many(ps) => ps.clone(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            PatternSet::One(p) => p.trim().is_empty(),
            PatternSet::Many(ps) => ps.iter().all(|p| p.trim().is_empty()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local: LocalConfig {
                patterns: PatternSet::Many(to_strings(DEFAULT_LOCAL_PATTERNS)),
                ignore: to_strings(DEFAULT_LOCAL_IGNORE),
            },
            global: GlobalConfig {
                directory: DEFAULT_GLOBAL_DIRECTORY.to_string(),
                patterns: PatternSet::One(DEFAULT_GLOBAL_PATTERN.to_string()),
                ignore: to_strings(DEFAULT_GLOBAL_IGNORE),
            },
        }
    }
}

impl Config {
    /// Global document directory as an absolute path under `project_root`.
    pub fn global_dir(&self, project_root: &Path) -> std::path::PathBuf {
        project_root.join(&self.global.directory)
    }

    /// Global directory name with separators normalized and no trailing `/`.
    pub fn global_prefix(&self) -> String {
        self.global
            .directory
            .replace('\\', "/")
            .trim_start_matches("./")
            .trim_end_matches('/')
            .to_string()
    }
}

// Raw file shape; every field optional so partial configs merge with defaults.

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    local: RawLocal,
    #[serde(default)]
    global: RawGlobal,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawLocal {
    patterns: Option<PatternSet>,
    #[serde(default)]
    ignore: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawGlobal {
    directory: Option<String>,
    patterns: Option<PatternSet>,
    #[serde(default)]
    ignore: Vec<String>,
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Load `ctx.toml` from the project root, falling back to defaults when the
/// file does not exist.
pub fn load_config(project_root: &Path) -> Result<Config> {
    let path = project_root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config file: {}", path.display()))
}

/// Parse config text, merge it over the defaults, and validate the result.
pub fn parse_config(content: &str) -> Result<Config> {
    let raw: RawConfig = toml::from_str(content).context("Failed to parse config file")?;
    let defaults = Config::default();

    let mut local_ignore = defaults.local.ignore;
    local_ignore.extend(raw.local.ignore);

    let mut global_ignore = defaults.global.ignore;
    global_ignore.extend(raw.global.ignore);

    let config = Config {
        local: LocalConfig {
            patterns: raw.local.patterns.unwrap_or(defaults.local.patterns),
            ignore: local_ignore,
        },
        global: GlobalConfig {
            directory: raw.global.directory.unwrap_or(defaults.global.directory),
            patterns: raw.global.patterns.unwrap_or(defaults.global.patterns),
            ignore: global_ignore,
        },
    };

    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &Config) -> Result<()> {
    let dir = config.global.directory.trim();
    if dir.is_empty() {
        bail!("global.directory must not be empty");
    }
    let dir_path = Path::new(dir);
    if dir_path.is_absolute()
        || dir_path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        bail!(
            "global.directory must be a relative path inside the project: '{}'",
            dir
        );
    }
    if !dir_path
        .components()
        .any(|c| matches!(c, Component::Normal(_)))
    {
        bail!(
            "global.directory must name a subdirectory, not the project root: '{}'",
            dir
        );
    }

    if config.local.patterns.is_empty() {
        bail!("local.patterns must contain at least one glob");
    }
    if config.global.patterns.is_empty() {
        bail!("global.patterns must contain at least one glob");
    }

    build_globset(&config.local.patterns.to_vec()).context("Invalid local.patterns")?;
    build_globset(&config.local.ignore).context("Invalid local.ignore")?;
    build_globset(&config.global.patterns.to_vec()).context("Invalid global.patterns")?;
    build_globset(&config.global.ignore).context("Invalid global.ignore")?;

    Ok(())
}

/// Compile globs with shell-like semantics: `*` never crosses a `/`, while
/// `**/` matches zero or more directories.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns.iter().filter(|p| !p.trim().is_empty()) {
        builder.add(compile_glob(pattern)?);
    }
    Ok(builder.build()?)
}

fn compile_glob(pattern: &str) -> Result<Glob> {
    let normalized = pattern.trim().trim_start_matches("./");
    GlobBuilder::new(normalized)
        .literal_separator(true)
        .build()
        .with_context(|| format!("Invalid glob pattern: '{}'", pattern))
}

/// Commented default config written by `ctx init`.
pub fn default_config_toml() -> String {
    format!(
        r#"# Context registry configuration.
#
# `patterns` accepts a single glob or a list. `ignore` entries are added to
# the built-in defaults.

[local]
# Documents bound to one source file or directory.
patterns = [{local_patterns}]
ignore = []

[global]
# Free-standing documents. Ignore globs are relative to this directory.
directory = "{directory}"
patterns = "{global_pattern}"
ignore = []
"#,
        local_patterns = DEFAULT_LOCAL_PATTERNS
            .iter()
            .map(|p| format!("\"{}\"", p))
            .collect::<Vec<_>>()
            .join(", "),
        directory = DEFAULT_GLOBAL_DIRECTORY,
        global_pattern = DEFAULT_GLOBAL_PATTERN,
    )
}
