use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use artifact_index_core::creator::creators_by_id;
use artifact_index_core::search::DEFAULT_HIT_CEILING;
use artifact_index_core::writer::DEFAULT_MAX_CHUNKS;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub index: IndexConfig,
    #[serde(default)]
    pub repositories: BTreeMap<String, RepositoryConfig>,
    #[serde(default)]
    pub remotes: BTreeMap<String, RemoteConfig>,
    #[serde(default)]
    pub publish: Option<PublishConfig>,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Root directory; each context keeps its store in `<dir>/<context>`.
    pub dir: PathBuf,
    #[serde(default = "default_hit_ceiling")]
    pub hit_ceiling: usize,
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
}

fn default_hit_ceiling() -> usize {
    DEFAULT_HIT_CEILING
}
fn default_max_chunks() -> usize {
    DEFAULT_MAX_CHUNKS
}

#[derive(Debug, Deserialize, Clone)]
pub struct RepositoryConfig {
    pub path: PathBuf,
    /// Defaults to the table key.
    #[serde(default)]
    pub repository_id: Option<String>,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default = "default_true")]
    pub searchable: bool,
    #[serde(default = "default_creators")]
    pub creators: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*".to_string()]
}
fn default_true() -> bool {
    true
}
fn default_creators() -> Vec<String> {
    ["min", "jarContent", "maven-plugin", "osgi-metadatas"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    /// `http(s)://` base URL or a local directory.
    pub url: String,
    #[serde(default = "default_index_id")]
    pub index_id: String,
    /// Context the remote index is applied to.
    pub context: String,
    /// Local chunk cache; defaults to `<index.dir>/<context>/remote-cache/<remote>`.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_index_id() -> String {
    "artifact-index".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct PublishConfig {
    pub dir: PathBuf,
    #[serde(default = "default_index_id")]
    pub index_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

fn default_limit() -> usize {
    20
}

impl Config {
    /// Directory holding the store of context `id`.
    pub fn context_dir(&self, id: &str) -> PathBuf {
        self.index.dir.join(id)
    }

    /// Every context id: configured repositories plus remote-only targets.
    pub fn context_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.repositories.keys().cloned().collect();
        for remote in self.remotes.values() {
            if !ids.contains(&remote.context) {
                ids.push(remote.context.clone());
            }
        }
        ids
    }

    /// Repository id recorded in the descriptor of context `id`.
    pub fn repository_id(&self, id: &str) -> String {
        self.repositories
            .get(id)
            .and_then(|r| r.repository_id.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn remote_cache_dir(&self, name: &str, remote: &RemoteConfig) -> PathBuf {
        remote.cache_dir.clone().unwrap_or_else(|| {
            self.context_dir(&remote.context)
                .join("remote-cache")
                .join(name)
        })
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.index.hit_ceiling < 1 {
        bail!("index.hit_ceiling must be >= 1");
    }
    if config.index.max_chunks < 1 {
        bail!("index.max_chunks must be >= 1");
    }
    if config.search.default_limit < 1 {
        bail!("search.default_limit must be >= 1");
    }

    for (id, repo) in &config.repositories {
        if !valid_id(id) {
            bail!("Invalid repository name '{}': use letters, digits, '.', '-' or '_'", id);
        }
        if repo.include_globs.is_empty() {
            bail!("repositories.{}.include_globs must not be empty", id);
        }
        if let Err(e) = creators_by_id(&repo.creators) {
            bail!("repositories.{}.creators: {}", id, e);
        }
    }

    for (name, remote) in &config.remotes {
        if remote.url.trim().is_empty() {
            bail!("remotes.{}.url must be set", name);
        }
        if !valid_id(&remote.context) {
            bail!(
                "remotes.{}.context '{}' is not a valid context name",
                name,
                remote.context
            );
        }
        if remote.index_id.trim().is_empty() {
            bail!("remotes.{}.index_id must not be empty", name);
        }
    }

    if let Some(publish) = &config.publish {
        if publish.index_id.trim().is_empty() {
            bail!("publish.index_id must not be empty");
        }
    }
    Ok(())
}

fn valid_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}
