//! Publish a context as chunk files plus a manifest.
//!
//! Every pack rewrites the full chunk. When the target already carries a
//! chain that this session continues, the artifacts and deletion markers
//! modified since the last published timestamp go out first as one
//! incremental chunk. Nothing changed means no incremental chunk.

use serde::Serialize;
use tracing::{debug, info};

use crate::context::IndexingContext;
use crate::document::Document;
use crate::error::Result;
use crate::resource::WritableResourceHandler;
use crate::writer::{IndexWriter, WriteMode, DEFAULT_MAX_CHUNKS};

#[derive(Debug, Clone)]
pub struct PackRequest {
    pub index_id: String,
    /// Continue the target's chain instead of starting a new one.
    pub incremental: bool,
    pub max_chunks: usize,
}

impl PackRequest {
    pub fn new(index_id: &str) -> Self {
        Self {
            index_id: index_id.to_string(),
            incremental: true,
            max_chunks: DEFAULT_MAX_CHUNKS,
        }
    }

    pub fn full(mut self) -> Self {
        self.incremental = false;
        self
    }

    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = max_chunks;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PackResult {
    pub chain_id: String,
    pub counter: u64,
    pub new_chain: bool,
    pub timestamp: i64,
    /// Records in the incremental chunk, when one was written.
    pub incremental_records: Option<usize>,
    pub full_records: usize,
}

/// Rank for full-chunk order: descriptor, groups, then the rest.
fn rank(doc: &Document) -> u8 {
    if doc.is_descriptor() {
        0
    } else if doc.is_groups() {
        1
    } else {
        2
    }
}

pub fn pack_index(
    ctx: &IndexingContext,
    target: &dyn WritableResourceHandler,
    request: &PackRequest,
) -> Result<PackResult> {
    let mode = if request.incremental {
        WriteMode::Incremental
    } else {
        WriteMode::Full
    };
    let mut writer = IndexWriter::open(target, &request.index_id, ctx.repository_id(), mode)?
        .with_max_chunks(request.max_chunks);
    let searcher = ctx.acquire_searcher();

    let mut incremental_records = None;
    if let (false, Some(since)) = (writer.is_new_chain(), writer.previous_timestamp()) {
        let changed: Vec<&Document> = searcher
            .docs()
            .iter()
            .filter(|d| d.is_artifact() || d.is_deletion_marker())
            .filter(|d| d.record_modified().is_some_and(|m| m > since))
            .collect();
        if changed.is_empty() {
            debug!(context = ctx.id(), since, "No changes since last publish");
        } else {
            writer.write_chunk(changed.iter().copied())?;
            incremental_records = Some(changed.len());
        }
    }

    let mut full: Vec<&Document> = searcher
        .docs()
        .iter()
        .filter(|d| !d.is_deletion_marker())
        .collect();
    full.sort_by_key(|d| rank(d));
    writer.write_full(full.iter().copied())?;
    let full_records = full.len();
    drop(full);
    drop(searcher);

    let chain_id = writer.chain_id().to_string();
    let counter = writer.counter();
    let new_chain = writer.is_new_chain();
    let timestamp = writer.timestamp();
    writer.close()?;
    ctx.note_published(timestamp);

    info!(
        context = ctx.id(),
        index_id = %request.index_id,
        counter,
        new_chain,
        full = full_records,
        "Index published"
    );
    Ok(PackResult {
        chain_id,
        counter,
        new_chain,
        timestamp,
        incremental_records,
        full_records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactInfo;
    use crate::properties::{full_chunk_name, incremental_chunk_name, manifest_name};
    use crate::resource::MemoryResourceHandler;

    #[test]
    fn test_first_pack_writes_full_only() {
        let ctx = IndexingContext::in_memory("c", "repo").unwrap();
        ctx.add_artifact(&ArtifactInfo::new("g", "a", "1", "jar")).unwrap();
        ctx.commit().unwrap();
        let target = MemoryResourceHandler::new();
        let res = pack_index(&ctx, &target, &PackRequest::new("idx")).unwrap();
        assert!(res.new_chain);
        assert_eq!(res.counter, 0);
        assert_eq!(res.incremental_records, None);
        assert!(target.contains(&full_chunk_name("idx")));
        assert!(target.contains(&manifest_name("idx")));
    }

    #[test]
    fn test_second_pack_ships_only_changes() {
        let ctx = IndexingContext::in_memory("c", "repo").unwrap();
        ctx.add_artifact(&ArtifactInfo::new("g", "a", "1", "jar")).unwrap();
        ctx.commit().unwrap();
        let target = MemoryResourceHandler::new();
        pack_index(&ctx, &target, &PackRequest::new("idx")).unwrap();

        ctx.add_artifact(&ArtifactInfo::new("g", "a", "2", "jar")).unwrap();
        ctx.remove_artifact("g|a|1|NA|jar").unwrap();
        ctx.commit().unwrap();
        let res = pack_index(&ctx, &target, &PackRequest::new("idx")).unwrap();
        assert!(!res.new_chain);
        assert_eq!(res.counter, 1);
        assert_eq!(res.incremental_records, Some(2));
        assert_eq!(res.full_records, 4);
        assert!(target.contains(&incremental_chunk_name("idx", 1)));

        let again = pack_index(&ctx, &target, &PackRequest::new("idx")).unwrap();
        assert_eq!(again.incremental_records, None);
        assert_eq!(again.counter, 1);
        assert!(again.timestamp > res.timestamp);
    }
}
