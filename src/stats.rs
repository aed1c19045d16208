//! Index statistics and health overview.
//!
//! Provides a quick summary of what's indexed per context: artifact counts,
//! deletion markers, group counts and store size. Used by `aidx stats` to
//! give confidence that scans and updates are working as expected.

use anyhow::Result;

use artifact_index_core::context::STORE_FILE;

use crate::config::Config;
use crate::repos::open_context;

struct ContextStats {
    id: String,
    artifacts: usize,
    deleted: usize,
    root_groups: usize,
    all_groups: usize,
    store_bytes: u64,
    timestamp: Option<i64>,
}

pub fn run_stats(config: &Config) -> Result<()> {
    let mut rows = Vec::new();
    for id in config.context_ids() {
        let ctx = open_context(config, &id)?;
        let store_bytes = std::fs::metadata(config.context_dir(&id).join(STORE_FILE))
            .map(|m| m.len())
            .unwrap_or(0);
        rows.push(ContextStats {
            id: id.clone(),
            artifacts: ctx.artifact_count(),
            deleted: ctx.deletion_marker_count(),
            root_groups: ctx.root_groups().len(),
            all_groups: ctx.all_groups().len(),
            store_bytes,
            timestamp: ctx.timestamp(),
        });
    }

    let total_artifacts: usize = rows.iter().map(|r| r.artifacts).sum();
    let total_bytes: u64 = rows.iter().map(|r| r.store_bytes).sum();

    println!("Artifact Index Stats");
    println!("====================");
    println!();
    println!("  Index dir:   {}", config.index.dir.display());
    println!("  Size:        {}", format_bytes(total_bytes));
    println!("  Contexts:    {}", rows.len());
    println!("  Artifacts:   {}", total_artifacts);

    if !rows.is_empty() {
        println!();
        println!("  By context:");
        println!(
            "  {:<20} {:>9} {:>8} {:>6} {:>7} {:>9}   {}",
            "CONTEXT", "ARTIFACTS", "DELETED", "ROOTS", "GROUPS", "SIZE", "UPDATED"
        );
        println!("  {}", "-".repeat(84));
        for r in &rows {
            let updated = match r.timestamp {
                Some(ts) => format_ts_relative(ts / 1000),
                None => "never".to_string(),
            };
            println!(
                "  {:<20} {:>9} {:>8} {:>6} {:>7} {:>9}   {}",
                r.id,
                r.artifacts,
                r.deleted,
                r.root_groups,
                r.all_groups,
                format_bytes(r.store_bytes),
                updated
            );
        }
    }
    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp (seconds) as a relative time string (e.g. "3 hours ago").
pub fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
