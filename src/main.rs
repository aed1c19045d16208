//! # Artifact Index CLI (`aidx`)
//!
//! The `aidx` binary indexes Maven-layout repositories, publishes the index
//! as an incremental chunk chain, pulls remote chains and searches
//! everything it holds.
//!
//! ## Usage
//!
//! ```bash
//! aidx --config ./config/aidx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `aidx repos` | List configured contexts and their state |
//! | `aidx scan <repo>` | Index a repository (incremental unless `--full`) |
//! | `aidx publish <repo>` | Write the context to the publish directory |
//! | `aidx update <remote>` | Pull a remote index into its context |
//! | `aidx search "<text>"` | Search one or more contexts |
//! | `aidx stats` | Per-context counts and store sizes |
//! | `aidx rebuild-groups <repo>` | Recompute group lists from the artifacts |
//!
//! ## Examples
//!
//! ```bash
//! aidx scan local --progress human
//! aidx publish local
//! aidx update central
//! aidx search "junit" --group-by ga
//! aidx search org.slf4j --field groupId --exact --json
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use artifact_index::progress::ProgressMode;
use artifact_index::search::{GroupBy, SearchOptions};
use artifact_index::{config, ingest, publish, remote, repos, search, stats};

/// Artifact Index CLI: a searchable, incrementally published index of
/// Maven repository contents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/aidx.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "aidx",
    about = "Artifact Index: index, publish, pull and search Maven repository indexes",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/aidx.toml")]
    config: PathBuf,

    /// More log output on stderr (-v info, -vv debug). `RUST_LOG` wins.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured repositories and remote contexts.
    Repos,

    /// Index a repository into its context.
    ///
    /// Incremental by default: new and changed artifacts are added, vanished
    /// ones become deletion markers. `--full` rebuilds the store from scratch.
    Scan {
        repo: String,

        /// Rebuild the whole store instead of applying differences.
        #[arg(long)]
        full: bool,

        /// Walk the repository and print counts without touching the store.
        #[arg(long)]
        dry_run: bool,

        /// Progress output on stderr. Defaults to human on a TTY, off otherwise.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Publish a context as a chunk chain into the `[publish]` directory.
    Publish {
        repo: String,

        /// Start a new chain instead of continuing the existing one.
        #[arg(long)]
        full: bool,
    },

    /// Pull a configured remote index into its context.
    Update {
        remote: String,

        /// Ignore the local counter and apply the remote's full chunk.
        #[arg(long)]
        full: bool,
    },

    /// Search indexed artifacts.
    Search {
        text: String,

        /// Field to match (`groupId`, `classnames`, `sha1`, ...). Defaults to
        /// the descriptive fields.
        #[arg(long)]
        field: Option<String>,

        /// Match whole values instead of token prefixes.
        #[arg(long)]
        exact: bool,

        /// Restrict to these contexts (repeatable).
        #[arg(long = "repo")]
        repos: Vec<String>,

        #[arg(long, value_enum)]
        group_by: Option<GroupBy>,

        #[arg(long)]
        limit: Option<usize>,

        /// Print the response as JSON on stdout.
        #[arg(long)]
        json: bool,
    },

    /// Show per-context statistics.
    Stats,

    /// Recompute the root and all group lists of a context.
    RebuildGroups { repo: String },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Repos => {
            repos::list_repos(&cfg)?;
        }
        Commands::Scan {
            repo,
            full,
            dry_run,
            progress,
        } => {
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            let reporter = mode.reporter();
            ingest::run_scan(&cfg, &repo, full, dry_run, reporter.as_ref())?;
        }
        Commands::Publish { repo, full } => {
            publish::run_publish(&cfg, &repo, full)?;
        }
        Commands::Update { remote, full } => {
            remote::run_update(&cfg, &remote, full)?;
        }
        Commands::Search {
            text,
            field,
            exact,
            repos,
            group_by,
            limit,
            json,
        } => {
            let opts = SearchOptions {
                field,
                exact,
                repos,
                group_by,
                limit,
                json,
            };
            search::run_search(&cfg, &text, &opts)?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg)?;
        }
        Commands::RebuildGroups { repo } => {
            let ctx = repos::open_context(&cfg, &repo)?;
            ctx.rebuild_groups()?;
            println!(
                "rebuild-groups {}: {} root groups, {} groups",
                repo,
                ctx.root_groups().len(),
                ctx.all_groups().len()
            );
        }
    }

    Ok(())
}
