//! Search across one or more indexing contexts.
//!
//! Three request styles share one [`SearchParams`] value:
//!
//! | Request | Response | Result identity |
//! |---------|----------|-----------------|
//! | [`FlatSearchRequest`] | [`FlatSearchResponse`] | ordered set under the request comparator |
//! | [`GroupedSearchRequest`] | [`GroupedSearchResponse`] | groups keyed by a [`Grouping`], ordered by a key comparator |
//! | [`IteratorSearchRequest`] | [`IteratorSearchResponse`] | lazy, one hit at a time |
//!
//! Hit counts are summed over the participating contexts. The flat default
//! comparator ignores the owning context, so the same GAV found in two
//! contexts collapses to one result; pass
//! [`context_version_comparator`](crate::artifact::context_version_comparator)
//! to keep them apart. Grouped search keeps per-context copies apart by
//! default.
//!
//! Without an explicit count a search first runs with [`SearchEngine`]'s
//! hit ceiling; when a context reports more matches than that, its query
//! is run once more with the true total as the limit.

pub mod grouping;
pub mod highlight;
pub mod iterator;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::artifact::{
    context_version_comparator, version_comparator, ArtifactComparator, ArtifactInfo,
};
use crate::context::{IndexingContext, SearcherGuard};
use crate::document::Document;
use crate::error::{BoxError, IndexError, Result};
use crate::query::Query;
use crate::store::TopHits;

pub use grouping::{unique_ga_filter, GroupByG, GroupByGa, Grouping};
pub use iterator::{IteratorSearchRequest, IteratorSearchResponse};

/// Default first-pass limit for searches without an explicit count.
pub const DEFAULT_HIT_CEILING: usize = 1000;

/// Accept/reject predicate applied to each candidate.
pub type ArtifactFilter =
    Arc<dyn Fn(&IndexingContext, &ArtifactInfo) -> std::result::Result<bool, BoxError> + Send + Sync>;

/// Mutator applied to each accepted candidate.
pub type PostProcessor = Arc<
    dyn Fn(&IndexingContext, &mut ArtifactInfo) -> std::result::Result<(), BoxError> + Send + Sync,
>;

/// Orders group keys.
pub type KeyComparator = Arc<dyn Fn(&str, &str) -> Ordering + Send + Sync>;

/// Fields shared by every request style.
#[derive(Clone)]
pub struct SearchParams<'c> {
    pub query: Query,
    pub contexts: Vec<&'c IndexingContext>,
    /// Results to skip.
    pub start: usize,
    /// Maximum results; `None` means all of them.
    pub count: Option<usize>,
    pub filter: Option<ArtifactFilter>,
    pub post_processor: Option<PostProcessor>,
    pub highlight: bool,
}

impl<'c> SearchParams<'c> {
    pub fn new(query: Query, contexts: Vec<&'c IndexingContext>) -> Self {
        Self {
            query,
            contexts,
            start: 0,
            count: None,
            filter: None,
            post_processor: None,
            highlight: false,
        }
    }

    pub fn with_start(mut self, start: usize) -> Self {
        self.start = start;
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_filter(mut self, filter: ArtifactFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_post_processor(mut self, post_processor: PostProcessor) -> Self {
        self.post_processor = Some(post_processor);
        self
    }

    pub fn with_highlight(mut self, highlight: bool) -> Self {
        self.highlight = highlight;
        self
    }

    /// Acquire a searcher on every searchable context.
    fn acquire(&self) -> Vec<SearcherGuard<'c>> {
        self.contexts
            .iter()
            .filter(|c| c.is_searchable())
            .map(|c| c.acquire_searcher())
            .collect()
    }

    /// Rebuild, filter, post-process and highlight one hit. `Ok(None)` when
    /// the hit is unreconstructable or rejected.
    fn materialize(
        &self,
        ctx: &IndexingContext,
        doc: &Document,
        score: f32,
    ) -> Result<Option<ArtifactInfo>> {
        let Some(mut info) = ctx.artifact_info(doc) else {
            warn!(
                context = ctx.id(),
                uinfo = doc.get(crate::fields::Field::Uinfo).unwrap_or_default(),
                "Skipping record that could not be reconstructed"
            );
            return Ok(None);
        };
        info.score = Some(score);
        if let Some(filter) = &self.filter {
            if !filter(ctx, &info).map_err(IndexError::Filter)? {
                return Ok(None);
            }
        }
        if let Some(post) = &self.post_processor {
            post(ctx, &mut info).map_err(IndexError::Filter)?;
        }
        if self.highlight {
            info.match_highlights = highlight::highlight(&self.query, &info);
        }
        Ok(Some(info))
    }
}

pub struct FlatSearchRequest<'c> {
    pub params: SearchParams<'c>,
    /// Ordering and identity of results.
    pub comparator: ArtifactComparator,
}

impl<'c> FlatSearchRequest<'c> {
    pub fn new(params: SearchParams<'c>) -> Self {
        Self {
            params,
            comparator: version_comparator(),
        }
    }

    pub fn with_comparator(mut self, comparator: ArtifactComparator) -> Self {
        self.comparator = comparator;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FlatSearchResponse {
    /// Matches across all contexts, before filtering and deduplication.
    pub total_hits: usize,
    pub returned_hits: usize,
    pub results: Vec<ArtifactInfo>,
}

pub struct GroupedSearchRequest<'c> {
    pub params: SearchParams<'c>,
    pub grouping: Arc<dyn Grouping>,
    pub group_key_comparator: KeyComparator,
    /// Ordering and identity of artifacts inside a group.
    pub artifact_comparator: ArtifactComparator,
}

impl<'c> GroupedSearchRequest<'c> {
    pub fn new(params: SearchParams<'c>, grouping: Arc<dyn Grouping>) -> Self {
        Self {
            params,
            grouping,
            group_key_comparator: Arc::new(|a: &str, b: &str| a.cmp(b)),
            artifact_comparator: context_version_comparator(),
        }
    }

    pub fn with_group_key_comparator(mut self, comparator: KeyComparator) -> Self {
        self.group_key_comparator = comparator;
        self
    }

    pub fn with_artifact_comparator(mut self, comparator: ArtifactComparator) -> Self {
        self.artifact_comparator = comparator;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactGroup {
    pub key: String,
    pub artifacts: Vec<ArtifactInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupedSearchResponse {
    pub total_hits: usize,
    /// Number of groups.
    pub returned_hits: usize,
    pub groups: Vec<ArtifactGroup>,
}

/// Runs search requests. Holds no state besides its limits.
#[derive(Debug, Clone, Copy)]
pub struct SearchEngine {
    hit_ceiling: usize,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self {
            hit_ceiling: DEFAULT_HIT_CEILING,
        }
    }
}

impl SearchEngine {
    pub fn new(hit_ceiling: usize) -> Self {
        Self {
            hit_ceiling: hit_ceiling.max(1),
        }
    }

    pub fn hit_ceiling(&self) -> usize {
        self.hit_ceiling
    }

    /// Run `query` on one snapshot, re-running at the true total when an
    /// unbounded search overflowed the ceiling.
    fn top_hits(&self, guard: &SearcherGuard<'_>, query: &Query, params: &SearchParams<'_>) -> TopHits {
        match params.count {
            Some(count) => guard.search(query, params.start.saturating_add(count)),
            None => {
                let top = guard.search(query, self.hit_ceiling);
                if top.total_hits > self.hit_ceiling {
                    debug!(
                        context = guard.context().id(),
                        total = top.total_hits,
                        ceiling = self.hit_ceiling,
                        "Re-running search above hit ceiling"
                    );
                    guard.search(query, top.total_hits)
                } else {
                    top
                }
            }
        }
    }

    pub fn search_flat(&self, request: &FlatSearchRequest<'_>) -> Result<FlatSearchResponse> {
        let params = &request.params;
        let guards = params.acquire();
        let mut total_hits = 0;
        let mut results: Vec<ArtifactInfo> = Vec::new();

        for guard in &guards {
            let top = self.top_hits(guard, &params.query, params);
            total_hits += top.total_hits;
            for hit in top.hits {
                let Some(doc) = guard.doc(hit.doc) else {
                    continue;
                };
                let Some(info) = params.materialize(guard.context(), doc, hit.score)? else {
                    continue;
                };
                if let Err(pos) = results.binary_search_by(|probe| (request.comparator)(probe, &info)) {
                    results.insert(pos, info);
                }
            }
        }
        drop(guards);

        let results: Vec<ArtifactInfo> = results
            .into_iter()
            .skip(params.start)
            .take(params.count.unwrap_or(usize::MAX))
            .collect();
        Ok(FlatSearchResponse {
            total_hits,
            returned_hits: results.len(),
            results,
        })
    }

    pub fn search_grouped(&self, request: &GroupedSearchRequest<'_>) -> Result<GroupedSearchResponse> {
        let params = &request.params;
        let guards = params.acquire();
        let mut total_hits = 0;
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<ArtifactGroup> = Vec::new();

        for guard in &guards {
            let top = self.top_hits(guard, &params.query, params);
            total_hits += top.total_hits;
            for hit in top.hits {
                let Some(doc) = guard.doc(hit.doc) else {
                    continue;
                };
                let Some(info) = params.materialize(guard.context(), doc, hit.score)? else {
                    continue;
                };
                let Some(key) = request.grouping.group_key(&info) else {
                    continue;
                };
                let slot = *index.entry(key.clone()).or_insert_with(|| {
                    groups.push(ArtifactGroup {
                        key,
                        artifacts: Vec::new(),
                    });
                    groups.len() - 1
                });
                let members = &mut groups[slot].artifacts;
                if let Err(pos) =
                    members.binary_search_by(|probe| (request.artifact_comparator)(probe, &info))
                {
                    members.insert(pos, info);
                }
            }
        }
        drop(guards);

        groups.sort_by(|a, b| (request.group_key_comparator)(&a.key, &b.key));
        let groups: Vec<ArtifactGroup> = groups
            .into_iter()
            .skip(params.start)
            .take(params.count.unwrap_or(usize::MAX))
            .collect();
        Ok(GroupedSearchResponse {
            total_hits,
            returned_hits: groups.len(),
            groups,
        })
    }

    /// Start a lazy search. The response holds the searchers until it is
    /// closed, exhausted or dropped.
    pub fn search_iterator<'c>(
        &self,
        request: IteratorSearchRequest<'c>,
    ) -> Result<IteratorSearchResponse<'c>> {
        let params = request.params;
        let guards = params.acquire();
        let mut total_hits = 0;
        let mut hits = Vec::new();
        for (slot, guard) in guards.iter().enumerate() {
            let unbounded = SearchParams {
                count: None,
                ..params.clone()
            };
            let top = self.top_hits(guard, &params.query, &unbounded);
            total_hits += top.total_hits;
            hits.extend(top.hits.into_iter().map(|h| (slot, h)));
        }
        // Stable: equal scores keep context order, then store order.
        hits.sort_by(|a, b| {
            b.1.score
                .partial_cmp(&a.1.score)
                .unwrap_or(Ordering::Equal)
        });
        Ok(IteratorSearchResponse::new(params, guards, hits, total_hits))
    }
}
