//! Queries against store documents.
//!
//! Matching is deliberately simple: exact mode is case-insensitive equality
//! (any line of a multi-line value counts), scored mode is token-prefix
//! matching. Relevance beyond that is out of scope.

use crate::document::Document;
use crate::error::{IndexError, Result};
use crate::fields::Field;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// The whole value must match.
    Exact,
    /// Every query term must prefix some token of the value.
    #[default]
    Scored,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    MatchAll,
    Term {
        field: Field,
        value: String,
        mode: SearchMode,
    },
    And(Vec<Query>),
    Or(Vec<Query>),
}

impl Query {
    pub fn exact(field: Field, value: &str) -> Self {
        Query::Term {
            field,
            value: value.to_string(),
            mode: SearchMode::Exact,
        }
    }

    pub fn scored(field: Field, value: &str) -> Self {
        Query::Term {
            field,
            value: value.to_string(),
            mode: SearchMode::Scored,
        }
    }

    /// Score of `doc` against this query; `None` when it does not match.
    pub fn score(&self, doc: &Document) -> Option<f32> {
        match self {
            Query::MatchAll => Some(1.0),
            Query::Term { field, value, mode } => {
                let actual = doc.get(*field)?;
                match mode {
                    SearchMode::Exact => exact_match(actual, value).then_some(1.0),
                    SearchMode::Scored => scored_match(actual, value),
                }
            }
            Query::And(parts) => {
                let mut total = 0.0;
                for q in parts {
                    total += q.score(doc)?;
                }
                Some(if parts.is_empty() { 1.0 } else { total / parts.len() as f32 })
            }
            Query::Or(parts) => parts
                .iter()
                .filter_map(|q| q.score(doc))
                .fold(None, |best: Option<f32>, s| Some(best.map_or(s, |b| b.max(s)))),
        }
    }

    /// Fields and values this query matches on, for highlighting.
    pub fn terms(&self) -> Vec<(Field, &str)> {
        match self {
            Query::MatchAll => Vec::new(),
            Query::Term { field, value, .. } => vec![(*field, value.as_str())],
            Query::And(parts) | Query::Or(parts) => parts.iter().flat_map(Query::terms).collect(),
        }
    }
}

fn exact_match(actual: &str, wanted: &str) -> bool {
    actual.eq_ignore_ascii_case(wanted) || actual.lines().any(|l| l.eq_ignore_ascii_case(wanted))
}

/// Split on anything that is not a letter or digit, lowercased.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn scored_match(actual: &str, wanted: &str) -> Option<f32> {
    if actual.eq_ignore_ascii_case(wanted) {
        return Some(1.0);
    }
    let query_terms = tokenize(wanted);
    if query_terms.is_empty() {
        return None;
    }
    let tokens = tokenize(actual);
    let mut score = 0.0;
    for term in &query_terms {
        let best = tokens
            .iter()
            .filter(|t| t.starts_with(term.as_str()))
            .map(|t| if t == term { 1.0 } else { 0.5 })
            .fold(0.0f32, f32::max);
        if best == 0.0 {
            return None;
        }
        score += best;
    }
    Some(0.9 * score / query_terms.len() as f32)
}

/// Turns a field plus human text into an executable [`Query`].
pub trait QueryBuilder: Send + Sync {
    fn construct(&self, field: Field, text: &str, mode: SearchMode) -> Result<Query>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultQueryBuilder;

impl QueryBuilder for DefaultQueryBuilder {
    fn construct(&self, field: Field, text: &str, mode: SearchMode) -> Result<Query> {
        let text = text.trim();
        if text.is_empty() {
            return Err(IndexError::Validation(format!(
                "empty query for field {}",
                field
            )));
        }
        if !field.is_indexed() {
            return Err(IndexError::Validation(format!(
                "field {} is not searchable",
                field
            )));
        }
        Ok(Query::Term {
            field,
            value: text.to_string(),
            mode,
        })
    }
}
