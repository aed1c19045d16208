//! Multi-context search behaviour and searcher accounting.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use artifact_index_core::artifact::context_version_comparator;
use artifact_index_core::error::BoxError;
use artifact_index_core::fields::Field;
use artifact_index_core::query::Query;
use artifact_index_core::search::{
    unique_ga_filter, FlatSearchRequest, GroupByGa, GroupedSearchRequest, IteratorSearchRequest,
    SearchEngine, SearchParams,
};
use artifact_index_core::{ArtifactInfo, IndexError, IndexingContext};

fn context_with(id: &str, versions: usize) -> IndexingContext {
    let ctx = IndexingContext::in_memory(id, id).unwrap();
    for v in 0..versions {
        ctx.add_artifact(&ArtifactInfo::new("org.acme", "lib", &format!("1.{}", v), "jar"))
            .unwrap();
    }
    ctx.commit().unwrap();
    ctx
}

fn balanced(ctx: &IndexingContext) -> bool {
    ctx.acquired_count() == ctx.released_count() && ctx.open_searchers() == 0
}

fn lib_query() -> Query {
    Query::exact(Field::ArtifactId, "lib")
}

#[test]
fn test_filter_error_releases_searchers() {
    let a = context_with("a", 5);
    let b = context_with("b", 5);
    let params = SearchParams::new(lib_query(), vec![&a, &b])
        .with_filter(Arc::new(|_: &IndexingContext, _: &ArtifactInfo| -> Result<bool, BoxError> {
            Err("boom".into())
        }));
    let err = SearchEngine::default()
        .search_flat(&FlatSearchRequest::new(params))
        .unwrap_err();
    assert!(matches!(err, IndexError::Filter(_)));
    assert_eq!(err.code(), "FILTER_FAULT");
    assert!(balanced(&a));
    assert!(balanced(&b));
    assert_eq!(a.acquired_count(), 1);
}

#[test]
fn test_filter_panic_releases_searchers() {
    let a = context_with("a", 3);
    let params = SearchParams::new(lib_query(), vec![&a])
        .with_filter(Arc::new(|_: &IndexingContext, _: &ArtifactInfo| -> Result<bool, BoxError> {
            panic!("filter bug")
        }));
    let request = FlatSearchRequest::new(params);
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        SearchEngine::default().search_flat(&request)
    }));
    assert!(outcome.is_err());
    assert!(balanced(&a));
}

#[test]
fn test_unbounded_flat_search_returns_everything_above_ceiling() {
    let ctx = context_with("big", 1010);
    let params = SearchParams::new(lib_query(), vec![&ctx]);
    let resp = SearchEngine::default()
        .search_flat(&FlatSearchRequest::new(params))
        .unwrap();
    assert_eq!(resp.total_hits, 1010);
    assert_eq!(resp.returned_hits, 1010);
    assert_eq!(resp.results.len(), 1010);
    assert!(balanced(&ctx));
}

#[test]
fn test_grouped_search_above_ceiling_forms_one_group() {
    let ctx = context_with("big", 1010);
    let params = SearchParams::new(lib_query(), vec![&ctx]);
    let resp = SearchEngine::default()
        .search_grouped(&GroupedSearchRequest::new(params, Arc::new(GroupByGa)))
        .unwrap();
    assert_eq!(resp.total_hits, 1010);
    assert_eq!(resp.returned_hits, 1);
    assert_eq!(resp.groups[0].artifacts.len(), 1010);
}

#[test]
fn test_same_artifacts_in_three_contexts() {
    let a = context_with("a", 10);
    let b = context_with("b", 10);
    let c = context_with("c", 10);
    let engine = SearchEngine::default();

    let flat = engine
        .search_flat(&FlatSearchRequest::new(SearchParams::new(
            lib_query(),
            vec![&a, &b, &c],
        )))
        .unwrap();
    assert_eq!(flat.total_hits, 30);
    assert_eq!(flat.returned_hits, 10);

    let per_context = engine
        .search_flat(
            &FlatSearchRequest::new(SearchParams::new(lib_query(), vec![&a, &b, &c]))
                .with_comparator(context_version_comparator()),
        )
        .unwrap();
    assert_eq!(per_context.returned_hits, 30);

    let grouped = engine
        .search_grouped(&GroupedSearchRequest::new(
            SearchParams::new(lib_query(), vec![&a, &b, &c]),
            Arc::new(GroupByGa),
        ))
        .unwrap();
    assert_eq!(grouped.groups[0].artifacts.len(), 30);

    for ctx in [&a, &b, &c] {
        assert!(balanced(ctx));
    }
}

#[test]
fn test_iterator_with_unique_ga_filter() {
    let a = context_with("a", 4);
    let b = context_with("b", 4);
    let params =
        SearchParams::new(lib_query(), vec![&a, &b]).with_filter(unique_ga_filter());
    let mut resp = SearchEngine::default()
        .search_iterator(IteratorSearchRequest::new(params))
        .unwrap();
    let hits: Vec<ArtifactInfo> = resp.by_ref().map(Result::unwrap).collect();
    assert_eq!(hits.len(), 1);
    assert_eq!(resp.total_hits(), 8);
    assert_eq!(resp.touched(), 8);
    assert!(resp.is_closed());
    resp.close();
    assert!(balanced(&a));
    assert!(balanced(&b));
}

#[test]
fn test_highlight_and_post_processor() {
    let ctx = context_with("a", 1);
    let params = SearchParams::new(Query::scored(Field::GroupId, "acme"), vec![&ctx])
        .with_highlight(true)
        .with_post_processor(Arc::new(|_: &IndexingContext, info: &mut ArtifactInfo| -> Result<(), BoxError> {
            info.description = Some("decorated".into());
            Ok(())
        }));
    let resp = SearchEngine::default()
        .search_flat(&FlatSearchRequest::new(params))
        .unwrap();
    let hit = &resp.results[0];
    assert_eq!(hit.description.as_deref(), Some("decorated"));
    assert_eq!(hit.match_highlights[0].fragments, vec!["org.<B>acme</B>"]);
    assert_eq!(hit.context_id.as_deref(), Some("a"));
    assert!(hit.score.is_some());
}
