//! `aidx publish`: pack a context into the configured publish directory.

use anyhow::{Context, Result};
use tracing::info;

use artifact_index_core::packer::{pack_index, PackRequest, PackResult};
use artifact_index_core::resource::DirectoryResourceHandler;

use crate::config::Config;
use crate::repos::open_context;

pub fn run_publish(config: &Config, repo_name: &str, full: bool) -> Result<PackResult> {
    let Some(publish) = &config.publish else {
        anyhow::bail!("No [publish] section in config; nothing to publish to.");
    };
    let ctx = open_context(config, repo_name)?;
    std::fs::create_dir_all(&publish.dir).with_context(|| {
        format!("Failed to create publish directory {}", publish.dir.display())
    })?;

    let target = DirectoryResourceHandler::new(&publish.dir);
    let mut request = PackRequest::new(&publish.index_id).with_max_chunks(config.index.max_chunks);
    if full {
        request = request.full();
    }
    let result = pack_index(&ctx, &target, &request)
        .with_context(|| format!("Failed to publish '{}'", repo_name))?;

    info!(
        context = repo_name,
        chain = %result.chain_id,
        counter = result.counter,
        "Published"
    );
    println!("publish {} -> {}", repo_name, publish.dir.display());
    println!("  index id: {}", publish.index_id);
    println!(
        "  chain: {}{}",
        result.chain_id,
        if result.new_chain { " (new)" } else { "" }
    );
    println!("  counter: {}", result.counter);
    match result.incremental_records {
        Some(n) => println!("  incremental records: {}", n),
        None => println!("  incremental records: -"),
    }
    println!("  full records: {}", result.full_records);
    println!("  ok");
    Ok(result)
}
