//! Registry listing from stored previews.
//!
//! Nothing is re-parsed here: every line comes from the denormalized
//! `preview` copied into the entry at sync time.

use std::path::Path;

use crate::config::Config;
use crate::models::{GlobalRegistry, LocalRegistry, Preview};
use crate::store::RegistryStore;

/// Which collections to list. Neither flag set means both.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    pub local: bool,
    pub global: bool,
}

pub fn run_list(project_root: &Path, config: &Config, options: ListOptions) {
    let both = !options.local && !options.global;
    let store = RegistryStore::new(project_root, config);

    if options.local || both {
        let registry: LocalRegistry = store.read();
        print_local(&registry);
    }
    if both {
        println!();
    }
    if options.global || both {
        let registry: GlobalRegistry = store.read();
        print_global(&registry);
    }
}

fn print_local(registry: &LocalRegistry) {
    println!(
        "Local contexts ({}), last synced {}",
        registry.contexts.len(),
        registry.meta.last_synced.to_rfc3339()
    );
    if registry.contexts.is_empty() {
        println!("  (none)");
        return;
    }
    for (target, entry) in &registry.contexts {
        println!("  {}", target);
        println!("    source: {}", entry.source);
        print_preview(&entry.preview);
    }
}

fn print_global(registry: &GlobalRegistry) {
    println!(
        "Global contexts ({}), last synced {}",
        registry.contexts.len(),
        registry.meta.last_synced.to_rfc3339()
    );
    if registry.contexts.is_empty() {
        println!("  (none)");
    }
    for (key, entry) in &registry.contexts {
        println!("  {}", key);
        print_preview(&entry.preview);
    }

    if !registry.folders.is_empty() {
        println!();
        println!("  {:<24} {:<14} MODIFIED", "FOLDER", "CHECKSUM");
        for (name, folder) in &registry.folders {
            let short: String = folder.checksum.chars().take(12).collect();
            println!(
                "  {:<24} {:<14} {}",
                name,
                short,
                folder.last_modified.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }
}

fn print_preview(preview: &Preview) {
    println!("    what: {}", preview.what);
    println!("    when: {}", preview.when.join("; "));
    if let Some(not_when) = preview.not_when.as_ref().filter(|n| !n.is_empty()) {
        println!("    not when: {}", not_when.join("; "));
    }
}
