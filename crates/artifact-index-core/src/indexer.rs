//! Batched artifact mutations against a context.
//!
//! Each call applies the whole batch, commits once and stamps the context's
//! timestamp. Lookups by checksum or key read the committed snapshot.

use chrono::Utc;
use tracing::info;

use crate::artifact::ArtifactInfo;
use crate::context::IndexingContext;
use crate::error::Result;
use crate::fields::Field;

#[derive(Debug, Default, Clone, Copy)]
pub struct Indexer;

impl Indexer {
    /// Add or replace artifacts, then commit.
    pub fn add_artifacts(&self, ctx: &IndexingContext, infos: &[ArtifactInfo]) -> Result<usize> {
        for info in infos {
            ctx.add_artifact(info)?;
        }
        self.finish(ctx, "added", infos.len())
    }

    pub fn update_artifacts(&self, ctx: &IndexingContext, infos: &[ArtifactInfo]) -> Result<usize> {
        for info in infos {
            ctx.update_artifact(info)?;
        }
        self.finish(ctx, "updated", infos.len())
    }

    /// Remove artifacts by unique key. Returns how many were present.
    pub fn delete_artifacts<S: AsRef<str>>(&self, ctx: &IndexingContext, uinfos: &[S]) -> Result<usize> {
        let mut present = 0;
        for uinfo in uinfos {
            if ctx.remove_artifact(uinfo.as_ref())? {
                present += 1;
            }
        }
        self.finish(ctx, "deleted", present)
    }

    fn finish(&self, ctx: &IndexingContext, action: &str, count: usize) -> Result<usize> {
        ctx.set_timestamp(Some(Utc::now().timestamp_millis()));
        ctx.commit()?;
        info!(context = ctx.id(), action, count, "Index batch committed");
        Ok(count)
    }

    /// Find the first artifact whose `field` equals `value` exactly, e.g. a
    /// SHA-1 checksum.
    pub fn identify(&self, ctx: &IndexingContext, field: Field, value: &str) -> Option<ArtifactInfo> {
        let searcher = ctx.acquire_searcher();
        let found = searcher
            .find(field, value)
            .filter(|d| d.is_artifact())
            .find_map(|d| ctx.artifact_info(d));
        found
    }

    /// Every live artifact in the context, in store order.
    pub fn artifacts(&self, ctx: &IndexingContext) -> Vec<ArtifactInfo> {
        let searcher = ctx.acquire_searcher();
        searcher
            .docs()
            .iter()
            .filter(|d| d.is_artifact())
            .filter_map(|d| ctx.artifact_info(d))
            .collect()
    }
}
