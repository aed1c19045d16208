//! Scan orchestration.
//!
//! Coordinates the scan flow: repository walk → record building → context
//! update. An incremental scan diffs the walk against the context (new,
//! changed by mtime or size, vanished) and applies only the difference. A
//! full scan builds a fresh store in a sibling directory and swaps it in.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::info;

use artifact_index_core::context::ExistingStore;
use artifact_index_core::creator::creators_by_id;
use artifact_index_core::indexer::Indexer;
use artifact_index_core::{ArtifactInfo, IndexingContext};

use crate::config::{Config, RepositoryConfig};
use crate::progress::ScanProgressReporter;
use crate::repos::open_context;
use crate::scanner::scan_repository;

#[derive(Debug, Default, Clone, Serialize)]
pub struct ScanSummary {
    pub found: usize,
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub skipped_files: usize,
}

pub fn run_scan(
    config: &Config,
    repo_name: &str,
    full: bool,
    dry_run: bool,
    progress: &dyn ScanProgressReporter,
) -> Result<ScanSummary> {
    let Some(repo) = config.repositories.get(repo_name) else {
        bail!(
            "Unknown repository: '{}'. Configured: {}",
            repo_name,
            config
                .repositories
                .keys()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
    };

    let report = scan_repository(repo_name, repo, progress)?;
    let mut summary = ScanSummary {
        found: report.artifacts.len(),
        skipped_files: report.skipped,
        ..Default::default()
    };

    if dry_run {
        println!("scan {} (dry-run)", repo_name);
        println!("  files seen: {}", report.files_seen);
        println!("  artifacts found: {}", summary.found);
        println!("  files skipped: {}", summary.skipped_files);
        return Ok(summary);
    }

    let ctx = open_context(config, repo_name)?;
    if full {
        rebuild(config, repo_name, repo, &ctx, &report.artifacts)?;
        summary.added = report.artifacts.len();
    } else {
        apply_difference(&ctx, report.artifacts, &mut summary)?;
    }

    info!(
        repository = repo_name,
        full,
        found = summary.found,
        added = summary.added,
        updated = summary.updated,
        removed = summary.removed,
        "Scan complete"
    );
    println!("scan {}{}", repo_name, if full { " (full)" } else { "" });
    println!("  artifacts found: {}", summary.found);
    println!("  added: {}", summary.added);
    println!("  updated: {}", summary.updated);
    println!("  removed: {}", summary.removed);
    println!("  ok");
    Ok(summary)
}

/// Build a complete store next to the context's directory, then swap it in.
fn rebuild(
    config: &Config,
    repo_name: &str,
    repo: &RepositoryConfig,
    ctx: &IndexingContext,
    artifacts: &[ArtifactInfo],
) -> Result<()> {
    let staging_dir = config.index.dir.join(format!(
        ".{}.rebuild-{}",
        repo_name,
        uuid::Uuid::new_v4().simple()
    ));
    let staging = IndexingContext::create(
        repo_name,
        ctx.repository_id(),
        Some(&staging_dir),
        creators_by_id(&repo.creators)?,
        ExistingStore::Reclaim,
    )
    .with_context(|| format!("Failed to create staging store {}", staging_dir.display()))?;

    let result = Indexer
        .add_artifacts(&staging, artifacts)
        .map_err(anyhow::Error::from)
        .and_then(|_| {
            ctx.replace(&staging_dir)
                .with_context(|| format!("Failed to swap in rebuilt store for '{}'", repo_name))
        });
    staging.close(true)?;
    result
}

fn apply_difference(
    ctx: &IndexingContext,
    scanned: Vec<ArtifactInfo>,
    summary: &mut ScanSummary,
) -> Result<()> {
    let existing: HashMap<String, (i64, i64)> = Indexer
        .artifacts(ctx)
        .into_iter()
        .map(|a| (a.uinfo(), (a.last_modified, a.size)))
        .collect();
    let seen: HashSet<String> = scanned.iter().map(ArtifactInfo::uinfo).collect();

    let mut added = Vec::new();
    let mut changed = Vec::new();
    for info in scanned {
        match existing.get(&info.uinfo()) {
            None => added.push(info),
            Some(&(modified, size)) if modified != info.last_modified || size != info.size => {
                changed.push(info)
            }
            Some(_) => {}
        }
    }
    let vanished: Vec<&String> = existing.keys().filter(|u| !seen.contains(*u)).collect();

    if !added.is_empty() {
        summary.added = Indexer.add_artifacts(ctx, &added)?;
    }
    if !changed.is_empty() {
        summary.updated = Indexer.update_artifacts(ctx, &changed)?;
    }
    if !vanished.is_empty() {
        summary.removed = Indexer.delete_artifacts(ctx, &vanished)?;
    }
    Ok(())
}
