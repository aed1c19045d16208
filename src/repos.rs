//! Context lookup and the `aidx repos` listing.

use anyhow::{Context, Result};

use artifact_index_core::context::{load_store_file, ExistingStore};
use artifact_index_core::creator::{builtin_creators, creators_by_id};
use artifact_index_core::IndexingContext;

use crate::config::Config;
use crate::stats::format_ts_relative;

/// Open (or create) the context `id` under the configured index directory.
///
/// Repository contexts use their configured creators and searchable flag;
/// remote-only contexts get all built-in creators.
pub fn open_context(config: &Config, id: &str) -> Result<IndexingContext> {
    let known = config.context_ids();
    if !known.iter().any(|k| k == id) {
        anyhow::bail!(
            "Unknown repository or context: '{}'. Configured: {}",
            id,
            known.join(", ")
        );
    }
    let repo = config.repositories.get(id);
    let creators = match repo {
        Some(r) => creators_by_id(&r.creators)?,
        None => builtin_creators(),
    };
    let dir = config.context_dir(id);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create index directory {}", dir.display()))?;

    let mut ctx = IndexingContext::create(
        id,
        &config.repository_id(id),
        Some(&dir),
        creators,
        ExistingStore::Validate,
    )
    .with_context(|| format!("Failed to open context '{}'", id))?;
    if let Some(r) = repo {
        ctx = ctx.with_repository(&r.path);
        ctx.set_searchable(r.searchable);
    }
    Ok(ctx)
}

pub fn list_repos(config: &Config) -> Result<()> {
    println!(
        "{:<20} {:<10} {:<8} {:>10}   {}",
        "CONTEXT", "KIND", "ROOT", "ARTIFACTS", "UPDATED"
    );
    for id in config.context_ids() {
        let (kind, root) = match config.repositories.get(&id) {
            Some(r) => ("repo", if r.path.exists() { "OK" } else { "MISSING" }),
            None => ("remote", "-"),
        };
        // Read the store directly; listing must not create anything.
        let (artifacts, updated) = match load_store_file(&config.context_dir(&id))? {
            Some((docs, ts)) => (
                docs.iter().filter(|d| d.is_artifact()).count().to_string(),
                ts.map(|t| format_ts_relative(t / 1000))
                    .unwrap_or_else(|| "never".to_string()),
            ),
            None => ("-".to_string(), "never".to_string()),
        };
        println!(
            "{:<20} {:<10} {:<8} {:>10}   {}",
            id, kind, root, artifacts, updated
        );
    }
    Ok(())
}
