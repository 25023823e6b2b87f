//! # Context Registry
//!
//! A derived, on-disk index over the context documents scattered through a
//! source tree, plus a validator that checks the index against live files.
//!
//! Two classes of document are tracked:
//!
//! - **local** documents (`src/utils/url.ctx.md`, `src/api/ctx.md`) are
//!   bound to one source artifact and keyed by that artifact's path;
//! - **global** documents (`ctx/rules/naming.md`) stand alone under the
//!   global directory and are grouped by top-level folder.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────┐   ┌─────────┐   ┌─────────────┐   ┌──────────────┐
//! │ Scanner │──▶│ Extract │──▶│ Fingerprint │──▶│  Reconciler  │
//! │ globset │   │ YAML    │   │ SHA-256     │   │ merge + fold │
//! └─────────┘   └─────────┘   └─────────────┘   └──────┬───────┘
//!                                                      ▼
//!                     ┌───────────┐            ┌──────────────┐
//!                     │ Validator │◀───────────│ RegistryStore│
//!                     │ E/W codes │            │ YAML files   │
//!                     └───────────┘            └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ctx init              # ctx.toml, ctx/, empty registries
//! ctx sync              # reconcile local and global documents
//! ctx validate --json   # check the registry against the tree
//! ctx list --global     # show stored previews
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | `ctx.toml` parsing, defaults, validation |
//! | [`error`] | Per-document error taxonomy |
//! | [`extract`] | Frontmatter / legacy YAML metadata extraction |
//! | [`fingerprint`] | Content hashing for change detection |
//! | [`init`] | Project scaffolding |
//! | [`list`] | Listing from stored previews |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`models`] | Documents, previews, registry entries |
//! | [`paths`] | Registry keys and target inference |
//! | [`reconcile`] | Local/global reconciliation and `sync` |
//! | [`scanner`] | Glob-driven document discovery |
//! | [`store`] | Registry file persistence |
//! | [`validate`] | Per-entry checks and the validation report |

pub mod config;
pub mod error;
pub mod extract;
pub mod fingerprint;
pub mod init;
pub mod list;
pub mod logging;
pub mod models;
pub mod paths;
pub mod reconcile;
pub mod scanner;
pub mod store;
pub mod validate;
