//! `aidx update`: pull a remote index into its local context.
//!
//! Remotes are either `http(s)://` base URLs or local directories
//! (optionally `file://`). Incremental chunks are kept in a per-remote cache
//! directory so a repeated update does not download them again.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use artifact_index_core::resource::{DirectoryResourceHandler, ResourceHandler};
use artifact_index_core::update::{update_index, UpdateResult};

use crate::config::Config;
use crate::http::HttpResourceHandler;
use crate::repos::open_context;

fn remote_handler(url: &str, timeout_secs: u64) -> Result<Box<dyn ResourceHandler>> {
    if url.starts_with("http://") || url.starts_with("https://") {
        let handler = HttpResourceHandler::new(url, Duration::from_secs(timeout_secs))?;
        Ok(Box::new(handler))
    } else {
        let path = url.strip_prefix("file://").unwrap_or(url);
        Ok(Box::new(DirectoryResourceHandler::new(path)))
    }
}

pub fn run_update(config: &Config, remote_name: &str, full: bool) -> Result<UpdateResult> {
    let Some(remote) = config.remotes.get(remote_name) else {
        anyhow::bail!(
            "Unknown remote: '{}'. Configured: {}",
            remote_name,
            config.remotes.keys().cloned().collect::<Vec<_>>().join(", ")
        );
    };
    let ctx = open_context(config, &remote.context)?;
    let source = remote_handler(&remote.url, remote.timeout_secs)?;

    let cache_dir = config.remote_cache_dir(remote_name, remote);
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("Failed to create cache directory {}", cache_dir.display()))?;
    let cache = DirectoryResourceHandler::new(&cache_dir);

    let result = update_index(&ctx, source.as_ref(), Some(&cache), &remote.index_id, full)
        .with_context(|| format!("Failed to update from remote '{}'", remote_name))?;

    info!(
        remote = remote_name,
        context = %remote.context,
        full = result.full,
        chunks = result.chunks.len(),
        "Update complete"
    );
    println!("update {} -> {}", remote_name, remote.context);
    if result.chunks.is_empty() {
        println!("  up to date (counter {})", result.remote_counter);
    } else {
        println!(
            "  {} sync: {}",
            if result.full { "full" } else { "incremental" },
            result.chunks.join(", ")
        );
        println!("  records applied: {}", result.applied);
        println!("  remote counter: {}", result.remote_counter);
    }
    println!("  ok");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_urls_map_to_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("idx.properties"), "x=1\n").unwrap();
        let url = format!("file://{}", dir.path().display());
        let handler = remote_handler(&url, 5).unwrap();
        assert!(handler.open("idx.properties").unwrap().is_some());
        assert!(handler.open("idx.gz").unwrap().is_none());
    }
}
