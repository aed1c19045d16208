//! Bring a context up to date with a published index.
//!
//! A full sync is staged in a scratch context (full chunk, then any chunks
//! published after it) and swapped into the target in one step. An
//! incremental sync applies each chunk in counter order and commits after
//! each one. Either way the local cache manifest only advances after the
//! context holds every chunk, so a failed sync is retried from the same
//! point.

use serde::Serialize;
use tracing::info;

use crate::context::IndexingContext;
use crate::document::Document;
use crate::error::Result;
use crate::properties::full_chunk_name;
use crate::reader::IndexReader;
use crate::resource::{ResourceHandler, WritableResourceHandler};

#[derive(Debug, Clone, Serialize)]
pub struct UpdateResult {
    pub full: bool,
    pub chunks: Vec<String>,
    /// Records applied to the context. For a full sync, the artifacts it
    /// now holds.
    pub applied: usize,
    pub remote_counter: u64,
    pub timestamp: Option<i64>,
}

pub fn update_index(
    ctx: &IndexingContext,
    remote: &dyn ResourceHandler,
    local_cache: Option<&dyn WritableResourceHandler>,
    index_id: &str,
    force_full: bool,
) -> Result<UpdateResult> {
    let mut reader = IndexReader::open(remote, local_cache, index_id, force_full)?;
    let full = !reader.is_incremental();
    let chunks = reader.chunk_names().to_vec();
    let remote_counter = reader.remote_counter();
    let timestamp = reader.remote_timestamp();

    let applied = if full {
        let staging = IndexingContext::in_memory(ctx.id(), ctx.repository_id())?;
        // A chain without a full chunk is replayed onto an empty store.
        let mut first = chunks.first().is_some_and(|n| *n == full_chunk_name(index_id));
        while let Some(chunk) = reader.next_chunk()? {
            let docs = chunk.collect::<Result<Vec<Document>>>()?;
            if first {
                staging.replace_documents(docs, timestamp)?;
                first = false;
            } else {
                staging.merge_documents(docs)?;
            }
        }
        let snapshot = staging.documents();
        ctx.replace_documents(snapshot.docs().to_vec(), timestamp)?;
        ctx.artifact_count()
    } else {
        let mut applied = 0;
        while let Some(chunk) = reader.next_chunk()? {
            let docs = chunk.collect::<Result<Vec<Document>>>()?;
            applied += ctx.merge_documents(docs)?;
        }
        if !chunks.is_empty() {
            ctx.set_timestamp(timestamp);
            ctx.commit()?;
        }
        applied
    };

    reader.finish()?;
    info!(
        context = ctx.id(),
        index_id,
        full,
        chunks = chunks.len(),
        applied,
        "Context updated from remote index"
    );
    Ok(UpdateResult {
        full,
        chunks,
        applied,
        remote_counter,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactInfo;
    use crate::packer::{pack_index, PackRequest};
    use crate::resource::MemoryResourceHandler;

    #[test]
    fn test_full_then_incremental() {
        let source = IndexingContext::in_memory("src", "central").unwrap();
        source.add_artifact(&ArtifactInfo::new("g", "a", "1", "jar")).unwrap();
        source.commit().unwrap();
        let remote = MemoryResourceHandler::new();
        pack_index(&source, &remote, &PackRequest::new("idx")).unwrap();

        let mirror = IndexingContext::in_memory("mirror", "central").unwrap();
        let cache = MemoryResourceHandler::new();
        let first = update_index(&mirror, &remote, Some(&cache), "idx", false).unwrap();
        assert!(first.full);
        assert_eq!(mirror.artifact_count(), 1);

        source.add_artifact(&ArtifactInfo::new("g", "a", "2", "jar")).unwrap();
        source.remove_artifact("g|a|1|NA|jar").unwrap();
        source.commit().unwrap();
        pack_index(&source, &remote, &PackRequest::new("idx")).unwrap();

        let second = update_index(&mirror, &remote, Some(&cache), "idx", false).unwrap();
        assert!(!second.full);
        assert_eq!(second.chunks, vec!["idx.1.gz".to_string()]);
        assert_eq!(mirror.artifact_count(), 1);
        assert_eq!(mirror.deletion_marker_count(), 1);
        assert_eq!(mirror.timestamp(), second.timestamp);
    }
}
