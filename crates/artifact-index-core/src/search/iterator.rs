//! Lazy search results.
//!
//! An [`IteratorSearchResponse`] holds one searcher per participating
//! context and turns hits into [`ArtifactInfo`] values only as they are
//! pulled. The searchers are released when the response is closed, runs
//! out of hits, reaches its count, fails, or is dropped, whichever comes
//! first. Closing twice is harmless.

use crate::artifact::ArtifactInfo;
use crate::context::SearcherGuard;
use crate::error::Result;
use crate::store::ScoredDoc;

use super::SearchParams;

pub struct IteratorSearchRequest<'c> {
    pub params: SearchParams<'c>,
}

impl<'c> IteratorSearchRequest<'c> {
    pub fn new(params: SearchParams<'c>) -> Self {
        Self { params }
    }
}

pub struct IteratorSearchResponse<'c> {
    params: SearchParams<'c>,
    guards: Vec<SearcherGuard<'c>>,
    /// `(guard slot, hit)`, best first.
    hits: Vec<(usize, ScoredDoc)>,
    pos: usize,
    to_skip: usize,
    total_hits: usize,
    touched: usize,
    returned: usize,
    closed: bool,
}

impl<'c> IteratorSearchResponse<'c> {
    pub(super) fn new(
        params: SearchParams<'c>,
        guards: Vec<SearcherGuard<'c>>,
        hits: Vec<(usize, ScoredDoc)>,
        total_hits: usize,
    ) -> Self {
        let to_skip = params.start;
        Self {
            params,
            guards,
            hits,
            pos: 0,
            to_skip,
            total_hits,
            touched: 0,
            returned: 0,
            closed: false,
        }
    }

    pub fn total_hits(&self) -> usize {
        self.total_hits
    }

    /// Hits examined so far, rejected ones included.
    pub fn touched(&self) -> usize {
        self.touched
    }

    pub fn returned(&self) -> usize {
        self.returned
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release the searchers. Later calls do nothing.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.guards.clear();
            self.hits.clear();
        }
    }

    fn advance(&mut self) -> Result<Option<ArtifactInfo>> {
        if self.params.count.is_some_and(|c| self.returned >= c) {
            return Ok(None);
        }
        while self.pos < self.hits.len() {
            let (slot, hit) = self.hits[self.pos];
            self.pos += 1;
            self.touched += 1;
            let guard = &self.guards[slot];
            let Some(doc) = guard.doc(hit.doc) else {
                continue;
            };
            let Some(info) = self.params.materialize(guard.context(), doc, hit.score)? else {
                continue;
            };
            if self.to_skip > 0 {
                self.to_skip -= 1;
                continue;
            }
            self.returned += 1;
            return Ok(Some(info));
        }
        Ok(None)
    }
}

impl Iterator for IteratorSearchResponse<'_> {
    type Item = Result<ArtifactInfo>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        match self.advance() {
            Ok(Some(info)) => {
                let limit_reached = self.params.count.is_some_and(|c| self.returned >= c);
                if limit_reached || self.pos >= self.hits.len() {
                    self.close();
                }
                Some(Ok(info))
            }
            Ok(None) => {
                self.close();
                None
            }
            Err(e) => {
                self.close();
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{SearchEngine, SearchParams};
    use super::*;
    use crate::context::IndexingContext;
    use crate::fields::Field;
    use crate::query::Query;

    fn ctx_with(n: usize) -> IndexingContext {
        let ctx = IndexingContext::in_memory("c", "r").unwrap();
        for i in 0..n {
            ctx.add_artifact(&ArtifactInfo::new("g", "a", &i.to_string(), "jar")).unwrap();
        }
        ctx.commit().unwrap();
        ctx
    }

    #[test]
    fn test_exhaustion_releases_searchers() {
        let ctx = ctx_with(3);
        let req = IteratorSearchRequest::new(SearchParams::new(
            Query::exact(Field::GroupId, "g"),
            vec![&ctx],
        ));
        let mut resp = SearchEngine::default().search_iterator(req).unwrap();
        assert_eq!(resp.total_hits(), 3);
        assert_eq!(ctx.open_searchers(), 1);
        let all: Vec<_> = resp.by_ref().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(all.len(), 3);
        assert!(resp.is_closed());
        assert_eq!(ctx.open_searchers(), 0);
        resp.close();
        assert_eq!(ctx.acquired_count(), ctx.released_count());
    }

    #[test]
    fn test_count_limits_and_closes() {
        let ctx = ctx_with(5);
        let req = IteratorSearchRequest::new(
            SearchParams::new(Query::exact(Field::GroupId, "g"), vec![&ctx])
                .with_start(1)
                .with_count(2),
        );
        let mut resp = SearchEngine::default().search_iterator(req).unwrap();
        assert!(resp.next().is_some());
        assert!(resp.next().is_some());
        assert_eq!(ctx.open_searchers(), 0);
        assert!(resp.next().is_none());
        assert_eq!(resp.returned(), 2);
        assert_eq!(resp.touched(), 3);
    }

    #[test]
    fn test_drop_releases() {
        let ctx = ctx_with(2);
        {
            let req = IteratorSearchRequest::new(SearchParams::new(Query::MatchAll, vec![&ctx]));
            let mut resp = SearchEngine::default().search_iterator(req).unwrap();
            let _first = resp.next();
            assert_eq!(ctx.open_searchers(), 1);
        }
        assert_eq!(ctx.open_searchers(), 0);
    }
}
