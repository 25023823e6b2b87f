//! # Context Registry CLI (`ctx`)
//!
//! Thin command surface over the [`context_registry`] engine.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ctx init` | Create `ctx.toml`, the global directory, and empty registries |
//! | `ctx sync` | Reconcile local and global documents into the registries |
//! | `ctx validate` | Check registry entries against the current tree |
//! | `ctx list` | Print registry entries from stored previews |
//!
//! ## Examples
//!
//! ```bash
//! # Sync only the global registry of another checkout
//! ctx --root ../service sync --global
//!
//! # Machine-readable validation, non-zero exit on errors
//! ctx validate --json
//! ```

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use context_registry::config::{self, Config};
use context_registry::init::{init_project, is_initialized};
use context_registry::list::{run_list, ListOptions};
use context_registry::logging::init_logging;
use context_registry::reconcile::{print_sync_summary, run_sync, SyncOptions};
use context_registry::validate::{print_report, report_json, run_validation, ValidateOptions};

/// Context Registry CLI: index and validate in-tree context documents.
#[derive(Parser)]
#[command(
    name = "ctx",
    about = "Index and validate context documents that live next to your code",
    version,
    long_about = "Scans a project for local context documents (bound to one source file or \
    directory) and global context documents (under the global directory), records their \
    metadata and checksums in YAML registries, and reports drift between the registries \
    and the tree."
)]
struct Cli {
    /// Project root. Every path in `ctx.toml` and the registries is
    /// relative to it.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Debug-level diagnostics on stderr. `RUST_LOG` overrides this.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize context management in the project.
    ///
    /// Creates `ctx.toml`, the global directory, and empty registries.
    /// Existing files are left untouched, so re-running is safe.
    Init,

    /// Rebuild the registries from the documents on disk.
    ///
    /// Local entries are upserted; the global registry is rebuilt from
    /// scratch together with its folder aggregates. With neither flag, both
    /// are synced.
    Sync {
        /// Sync local documents only.
        #[arg(long)]
        local: bool,

        /// Sync global documents only.
        #[arg(long)]
        global: bool,
    },

    /// Check registry entries against the current tree.
    ///
    /// Exits with status 1 when any error-level issue is found. Warnings
    /// (missing targets, changed checksums) do not affect the exit status.
    Validate {
        /// Validate local entries only.
        #[arg(long)]
        local: bool,

        /// Validate global entries only.
        #[arg(long)]
        global: bool,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List registry entries.
    List {
        /// List local entries only.
        #[arg(long)]
        local: bool,

        /// List global entries and folders only.
        #[arg(long)]
        global: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let root = cli.root.as_path();

    if let Commands::Init = cli.command {
        let report = init_project(root)?;
        if report.created.is_empty() {
            println!("Already initialized, nothing to do.");
        }
        for path in &report.created {
            println!("Created {}", path.display());
        }
        return Ok(());
    }

    let cfg = load_initialized(root)?;

    match cli.command {
        Commands::Init => {
            // Handled above (before config loading)
        }
        Commands::Sync { local, global } => {
            let result = run_sync(root, &cfg, SyncOptions { local, global }).await;
            print_sync_summary(&result);
            if !result.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Validate {
            local,
            global,
            json,
        } => {
            let report = run_validation(root, &cfg, ValidateOptions { local, global });
            if json {
                println!("{}", report_json(&report)?);
            } else {
                print_report(&report);
            }
            if report.has_errors() {
                std::process::exit(1);
            }
        }
        Commands::List { local, global } => {
            run_list(root, &cfg, ListOptions { local, global });
        }
    }

    Ok(())
}

fn load_initialized(root: &Path) -> Result<Config> {
    if !is_initialized(root) {
        bail!(
            "Project not initialized at {}. Run `ctx init` first.",
            root.display()
        );
    }
    config::load_config(root)
}
