//! Group keys for grouped search, and the GA-uniqueness filter used when
//! iterating aggregated results.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::artifact::ArtifactInfo;
use crate::context::IndexingContext;
use crate::error::BoxError;

use super::ArtifactFilter;

/// Maps an artifact to the key of the group it belongs to. `None` drops
/// the artifact from grouped results.
pub trait Grouping: Send + Sync {
    fn group_key(&self, info: &ArtifactInfo) -> Option<String>;
}

/// One group per `groupId:artifactId`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GroupByGa;

impl Grouping for GroupByGa {
    fn group_key(&self, info: &ArtifactInfo) -> Option<String> {
        Some(format!("{}:{}", info.group_id, info.artifact_id))
    }
}

/// One group per `groupId`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GroupByG;

impl Grouping for GroupByG {
    fn group_key(&self, info: &ArtifactInfo) -> Option<String> {
        Some(info.group_id.clone())
    }
}

/// Filter accepting only the first artifact seen for each
/// `groupId:artifactId`. Stateful: build a fresh one per search.
pub fn unique_ga_filter() -> ArtifactFilter {
    let seen: Mutex<HashSet<String>> = Mutex::new(HashSet::new());
    Arc::new(move |_ctx: &IndexingContext, info: &ArtifactInfo| {
        Ok::<_, BoxError>(seen
            .lock()
            .insert(format!("{}:{}", info.group_id, info.artifact_id)))
    })
}
