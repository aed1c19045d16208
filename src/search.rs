//! `aidx search`: query one or more contexts from the command line.
//!
//! Without `--field` the text is matched against the descriptive fields
//! (group id, artifact id, name, description, class names) and any of them
//! may match. Results are a flat list ordered by GAV, or groups when
//! `--group-by` is given.

use anyhow::{bail, Result};
use std::sync::Arc;

use artifact_index_core::fields::Field;
use artifact_index_core::query::{DefaultQueryBuilder, Query, QueryBuilder, SearchMode};
use artifact_index_core::search::{
    FlatSearchRequest, GroupByG, GroupByGa, GroupedSearchRequest, Grouping, SearchEngine,
    SearchParams,
};
use artifact_index_core::{ArtifactInfo, IndexingContext};

use crate::config::Config;
use crate::repos::open_context;

const DEFAULT_FIELDS: [Field; 5] = [
    Field::GroupId,
    Field::ArtifactId,
    Field::Name,
    Field::Description,
    Field::Classnames,
];

#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum GroupBy {
    /// groupId:artifactId
    Ga,
    /// groupId
    G,
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub field: Option<String>,
    pub exact: bool,
    pub repos: Vec<String>,
    pub group_by: Option<GroupBy>,
    pub limit: Option<usize>,
    pub json: bool,
}

/// Resolve a field name given on the command line: a document key such as
/// `groupId` or `Bundle-SymbolicName`, or one of a few short aliases.
fn resolve_field(name: &str) -> Result<Field> {
    let field = match name {
        "g" | "group" => Some(Field::GroupId),
        "a" | "artifact" => Some(Field::ArtifactId),
        "v" => Some(Field::Version),
        "name" => Some(Field::Name),
        "description" => Some(Field::Description),
        "sha1" => Some(Field::Sha1),
        "class" => Some(Field::Classnames),
        "prefix" => Some(Field::PluginPrefix),
        "goals" => Some(Field::PluginGoals),
        other => Field::from_key(other),
    };
    match field {
        Some(f) if f.is_indexed() => Ok(f),
        Some(f) => bail!("Field '{}' is not searchable", f),
        None => bail!("Unknown field: '{}'", name),
    }
}

fn build_query(text: &str, field: Option<&str>, exact: bool) -> Result<Query> {
    let mode = if exact {
        SearchMode::Exact
    } else {
        SearchMode::Scored
    };
    let builder = DefaultQueryBuilder;
    match field {
        Some(name) => Ok(builder.construct(resolve_field(name)?, text, mode)?),
        None => {
            let terms = DEFAULT_FIELDS
                .iter()
                .map(|f| builder.construct(*f, text, mode))
                .collect::<artifact_index_core::Result<Vec<_>>>()?;
            Ok(Query::Or(terms))
        }
    }
}

pub fn run_search(config: &Config, text: &str, opts: &SearchOptions) -> Result<()> {
    if text.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }
    let query = build_query(text, opts.field.as_deref(), opts.exact)?;

    let ids = if opts.repos.is_empty() {
        config.context_ids()
    } else {
        opts.repos.clone()
    };
    let contexts = ids
        .iter()
        .map(|id| open_context(config, id))
        .collect::<Result<Vec<IndexingContext>>>()?;
    let refs: Vec<&IndexingContext> = contexts.iter().collect();

    let limit = opts.limit.unwrap_or(config.search.default_limit);
    let params = SearchParams::new(query, refs)
        .with_count(limit)
        .with_highlight(!opts.json);
    let engine = SearchEngine::new(config.index.hit_ceiling);

    match opts.group_by {
        None => {
            let response = engine.search_flat(&FlatSearchRequest::new(params))?;
            if opts.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
                return Ok(());
            }
            if response.results.is_empty() {
                println!("No results.");
                return Ok(());
            }
            for (i, info) in response.results.iter().enumerate() {
                print_hit(i + 1, info);
            }
            println!(
                "{} of {} hits",
                response.returned_hits, response.total_hits
            );
        }
        Some(group_by) => {
            let grouping: Arc<dyn Grouping> = match group_by {
                GroupBy::Ga => Arc::new(GroupByGa),
                GroupBy::G => Arc::new(GroupByG),
            };
            let response = engine.search_grouped(&GroupedSearchRequest::new(params, grouping))?;
            if opts.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
                return Ok(());
            }
            if response.groups.is_empty() {
                println!("No results.");
                return Ok(());
            }
            for group in &response.groups {
                println!("{}  ({} artifacts)", group.key, group.artifacts.len());
                for info in &group.artifacts {
                    println!("    {}  [{}]", info.uinfo(), context_label(info));
                }
            }
            println!(
                "{} groups, {} hits",
                response.returned_hits, response.total_hits
            );
        }
    }
    Ok(())
}

fn context_label(info: &ArtifactInfo) -> &str {
    info.context_id.as_deref().unwrap_or("-")
}

fn print_hit(rank: usize, info: &ArtifactInfo) {
    println!(
        "{}. {}  [{}]  score={:.2}",
        rank,
        info.uinfo(),
        context_label(info),
        info.score.unwrap_or(0.0)
    );
    if let Some(name) = &info.name {
        println!("    name: {}", name);
    }
    for highlight in &info.match_highlights {
        if let Some(fragment) = highlight.fragments.first() {
            println!("    {}: {}", highlight.field, fragment);
        }
    }
}
