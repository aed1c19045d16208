//! The indexing context: one store bound to one repository.
//!
//! A context owns the store handle, the creator pipeline, the root/all group
//! sets and the last-update timestamp. Searches take a [`SearcherGuard`]
//! through [`IndexingContext::acquire_searcher`]; the guard pins one
//! committed snapshot and releases it on drop, so every acquisition is
//! matched by exactly one release on every exit path.
//!
//! When the context has an index directory, [`IndexingContext::commit`]
//! also persists the committed documents to `store.gz` in that directory
//! (chunk format, written to a temporary file and renamed).
//!
//! Group sets only ever grow as artifacts are added. Removing an artifact
//! leaves its groups in place; [`IndexingContext::rebuild_groups`]
//! recomputes them from the live artifacts on request.

use std::collections::BTreeSet;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::artifact::ArtifactInfo;
use crate::codec::{encode_chunk, ChunkReader};
use crate::creator::{CreatorPipeline, IndexCreator};
use crate::document::Document;
use crate::error::{IndexError, Result};
use crate::fields::{root_group, split_components, Field};
use crate::groups::GroupsCollector;
use crate::record::{EntryKey, Record, RecordCompactor, RecordExpander, RecordType};
use crate::resource::{read_bytes, write_bytes, DirectoryResourceHandler};
use crate::store::{InMemoryStore, IndexStore, StoreSnapshot};

/// File holding a persisted context inside its index directory.
pub const STORE_FILE: &str = "store.gz";

/// How to treat a store that already exists in the index directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistingStore {
    /// Check that the stored repository id matches; fail otherwise.
    #[default]
    Validate,
    /// Take the store over without checks, rewriting its descriptor.
    Reclaim,
}

#[derive(Debug, Default, Clone)]
struct GroupSets {
    root: BTreeSet<String>,
    all: BTreeSet<String>,
}

pub struct IndexingContext {
    id: String,
    repository_id: String,
    repository: Option<PathBuf>,
    repository_url: Option<String>,
    index_dir: Option<PathBuf>,
    pipeline: CreatorPipeline,
    store: Box<dyn IndexStore>,
    groups: RwLock<GroupSets>,
    timestamp: RwLock<Option<i64>>,
    searchable: AtomicBool,
    /// Lower bound for the next record-modified stamp.
    clock_floor: AtomicI64,
    acquired: AtomicUsize,
    released: AtomicUsize,
    /// Serializes structural operations (commit, replace, merge, purge).
    structural: Mutex<()>,
}

impl std::fmt::Debug for IndexingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexingContext")
            .field("id", &self.id)
            .field("repository_id", &self.repository_id)
            .field("index_dir", &self.index_dir)
            .field("creators", &self.pipeline)
            .finish()
    }
}

impl IndexingContext {
    /// Create a context. With an `index_dir` holding a previous store, that
    /// store is loaded according to `existing`.
    pub fn create(
        id: &str,
        repository_id: &str,
        index_dir: Option<&Path>,
        creators: Vec<Arc<dyn IndexCreator>>,
        existing: ExistingStore,
    ) -> Result<Self> {
        let pipeline = CreatorPipeline::resolve(creators)?;
        let ctx = Self {
            id: id.to_string(),
            repository_id: repository_id.to_string(),
            repository: None,
            repository_url: None,
            index_dir: index_dir.map(Path::to_path_buf),
            pipeline,
            store: Box::new(InMemoryStore::new()),
            groups: RwLock::new(GroupSets::default()),
            timestamp: RwLock::new(None),
            searchable: AtomicBool::new(true),
            clock_floor: AtomicI64::new(0),
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            structural: Mutex::new(()),
        };

        let loaded = match index_dir {
            Some(dir) => load_store_file(dir)?,
            None => None,
        };
        match loaded {
            Some((docs, timestamp)) => {
                if existing == ExistingStore::Validate {
                    ctx.validate_descriptor(&docs)?;
                }
                ctx.install(docs)?;
                *ctx.timestamp.write() = timestamp;
                info!(context = id, artifacts = ctx.artifact_count(), "Loaded existing store");
            }
            None => {
                ctx.install(Vec::new())?;
                ctx.persist()?;
            }
        }
        Ok(ctx)
    }

    /// A context with no index directory and all built-in creators.
    pub fn in_memory(id: &str, repository_id: &str) -> Result<Self> {
        Self::create(
            id,
            repository_id,
            None,
            crate::creator::builtin_creators(),
            ExistingStore::Validate,
        )
    }

    pub fn with_repository(mut self, path: impl Into<PathBuf>) -> Self {
        self.repository = Some(path.into());
        self
    }

    pub fn with_repository_url(mut self, url: &str) -> Self {
        self.repository_url = Some(url.to_string());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn repository_id(&self) -> &str {
        &self.repository_id
    }

    pub fn repository(&self) -> Option<&Path> {
        self.repository.as_deref()
    }

    pub fn repository_url(&self) -> Option<&str> {
        self.repository_url.as_deref()
    }

    pub fn index_dir(&self) -> Option<&Path> {
        self.index_dir.as_deref()
    }

    pub fn pipeline(&self) -> &CreatorPipeline {
        &self.pipeline
    }

    pub fn is_searchable(&self) -> bool {
        self.searchable.load(Ordering::Acquire)
    }

    pub fn set_searchable(&self, searchable: bool) {
        self.searchable.store(searchable, Ordering::Release);
    }

    /// Last update time, epoch millis.
    pub fn timestamp(&self) -> Option<i64> {
        *self.timestamp.read()
    }

    pub fn set_timestamp(&self, timestamp: Option<i64>) {
        *self.timestamp.write() = timestamp;
    }

    pub fn root_groups(&self) -> BTreeSet<String> {
        self.groups.read().root.clone()
    }

    pub fn all_groups(&self) -> BTreeSet<String> {
        self.groups.read().all.clone()
    }

    /// Pin the current committed snapshot for one search.
    pub fn acquire_searcher(&self) -> SearcherGuard<'_> {
        self.acquired.fetch_add(1, Ordering::AcqRel);
        SearcherGuard {
            ctx: self,
            snapshot: self.store.snapshot(),
        }
    }

    pub fn acquired_count(&self) -> usize {
        self.acquired.load(Ordering::Acquire)
    }

    pub fn released_count(&self) -> usize {
        self.released.load(Ordering::Acquire)
    }

    /// Searchers currently held.
    pub fn open_searchers(&self) -> usize {
        self.acquired_count()
            .saturating_sub(self.released_count())
    }

    /// A record-modified stamp later than anything this context published.
    pub fn next_modified(&self) -> i64 {
        Utc::now()
            .timestamp_millis()
            .max(self.clock_floor.load(Ordering::Acquire))
    }

    /// Make every later [`next_modified`](Self::next_modified) exceed
    /// `published`.
    pub fn note_published(&self, published: i64) {
        self.clock_floor.fetch_max(published + 1, Ordering::AcqRel);
    }

    // --- artifact operations -------------------------------------------

    /// Add or replace an artifact (keyed by its UINFO). Buffered until commit.
    pub fn add_artifact(&self, info: &ArtifactInfo) -> Result<()> {
        let uinfo = info.uinfo();
        let mut doc = self.pipeline.to_document(info);
        doc.set(Field::RecordModified, self.next_modified().to_string());
        self.store.delete_documents(Field::Deleted, &uinfo)?;
        self.store.update_document(Field::Uinfo, &uinfo, doc)?;
        self.note_group(&info.group_id);
        Ok(())
    }

    pub fn update_artifact(&self, info: &ArtifactInfo) -> Result<()> {
        self.add_artifact(info)
    }

    /// Remove an artifact and leave a deletion marker. Returns whether the
    /// artifact was present.
    pub fn remove_artifact(&self, uinfo: &str) -> Result<bool> {
        let removed = self.store.delete_documents(Field::Uinfo, uinfo)?;
        let mut marker = Document::new();
        marker.set(Field::Deleted, uinfo);
        marker.set(Field::RecordModified, self.next_modified().to_string());
        self.store.update_document(Field::Deleted, uinfo, marker)?;
        Ok(removed > 0)
    }

    fn note_group(&self, group_id: &str) {
        if group_id.is_empty() {
            return;
        }
        let root = root_group(group_id);
        {
            let groups = self.groups.read();
            if groups.all.contains(group_id) && groups.root.contains(root) {
                return;
            }
        }
        let mut groups = self.groups.write();
        groups.root.insert(root.to_string());
        groups.all.insert(group_id.to_string());
    }

    /// Turn a document as read from a chunk into a store document: index
    /// fields are rebuilt through the creator pipeline, other fields kept.
    pub fn index_document(&self, doc: Document) -> Document {
        if !doc.is_artifact() {
            return doc;
        }
        let Some(info) = self.pipeline.to_artifact_info(&doc) else {
            return doc;
        };
        let mut full = self.pipeline.to_document(&info);
        for field in doc.fields() {
            if full.get_raw(&field.name).is_none() {
                full.push(field.clone());
            }
        }
        full
    }

    /// Rebuild an artifact from a store document.
    pub fn artifact_info(&self, doc: &Document) -> Option<ArtifactInfo> {
        let mut info = self.pipeline.to_artifact_info(doc)?;
        info.repository_id = Some(self.repository_id.clone());
        info.context_id = Some(self.id.clone());
        Some(info)
    }

    // --- lifecycle ------------------------------------------------------

    /// Make buffered changes visible to later searchers and persist them.
    pub fn commit(&self) -> Result<()> {
        let _lock = self.structural.lock();
        self.commit_locked()
    }

    fn commit_locked(&self) -> Result<()> {
        self.write_group_documents()?;
        self.store.commit()?;
        self.persist()
    }

    /// Empty the context. Descriptor and (empty) groups are rewritten.
    pub fn purge(&self) -> Result<()> {
        let _lock = self.structural.lock();
        self.store.purge()?;
        *self.groups.write() = GroupSets::default();
        *self.timestamp.write() = None;
        self.store.add_document(self.descriptor_document())?;
        self.commit_locked()?;
        info!(context = %self.id, "Context purged");
        Ok(())
    }

    /// Swap in the store persisted under `location`.
    pub fn replace(&self, location: &Path) -> Result<()> {
        let (docs, timestamp) = load_store_file(location)?
            .ok_or_else(|| IndexError::NotFound(location.join(STORE_FILE).display().to_string()))?;
        self.replace_documents(docs, timestamp)
    }

    /// Swap in a complete document set, e.g. a full chunk.
    pub fn replace_documents(&self, docs: Vec<Document>, timestamp: Option<i64>) -> Result<()> {
        let _lock = self.structural.lock();
        self.commit_locked()?;
        let count = docs.len();
        self.install(docs)?;
        *self.timestamp.write() = timestamp;
        self.persist()?;
        info!(context = %self.id, documents = count, "Context content replaced");
        Ok(())
    }

    /// Fold the store persisted under `location` into this one.
    pub fn merge(&self, location: &Path) -> Result<()> {
        let (docs, timestamp) = load_store_file(location)?
            .ok_or_else(|| IndexError::NotFound(location.join(STORE_FILE).display().to_string()))?;
        self.merge_documents(docs)?;
        if let Some(ts) = timestamp {
            let current = self.timestamp();
            self.set_timestamp(Some(current.map_or(ts, |c| c.max(ts))));
        }
        Ok(())
    }

    /// Apply a document stream on top of the current content: artifacts are
    /// added or replaced, deletion markers remove their artifact, group
    /// records are unioned in, descriptors are ignored. Commits once.
    pub fn merge_documents<I>(&self, docs: I) -> Result<usize>
    where
        I: IntoIterator<Item = Document>,
    {
        let _lock = self.structural.lock();
        let mut applied = 0;
        for doc in docs {
            if self.apply_document(doc)? {
                applied += 1;
            }
        }
        self.commit_locked()?;
        debug!(context = %self.id, applied, "Merged documents");
        Ok(applied)
    }

    fn apply_document(&self, doc: Document) -> Result<bool> {
        if doc.is_descriptor() {
            return Ok(false);
        }
        if doc.is_groups() {
            match RecordExpander.expand(&doc) {
                Ok(record) => self.absorb_groups(&record),
                Err(e) => warn!(context = %self.id, error = %e, "Skipping malformed groups record"),
            }
            return Ok(false);
        }
        if let Some(uinfo) = doc.get(Field::Deleted).map(str::to_string) {
            self.store.delete_documents(Field::Uinfo, &uinfo)?;
            self.store.update_document(Field::Deleted, &uinfo, doc)?;
            return Ok(true);
        }
        if let Some(uinfo) = doc.get(Field::Uinfo).map(str::to_string) {
            let doc = self.index_document(doc);
            if let Some(group) = doc.get(Field::GroupId) {
                self.note_group(group);
            }
            self.store.delete_documents(Field::Deleted, &uinfo)?;
            self.store.update_document(Field::Uinfo, &uinfo, doc)?;
            return Ok(true);
        }
        warn!(context = %self.id, "Skipping unrecognized document");
        Ok(false)
    }

    fn absorb_groups(&self, record: &Record) {
        let Some(list) = record.get_list(EntryKey::Groups) else {
            return;
        };
        let mut groups = self.groups.write();
        let target = match record.record_type {
            RecordType::RootGroups => &mut groups.root,
            RecordType::AllGroups => &mut groups.all,
            _ => return,
        };
        target.extend(list.iter().cloned());
    }

    /// Recompute group sets from the live artifacts and commit.
    pub fn rebuild_groups(&self) -> Result<()> {
        let _lock = self.structural.lock();
        self.store.commit()?;
        let snapshot = self.store.snapshot();
        let records = snapshot
            .docs()
            .iter()
            .filter(|d| d.is_artifact())
            .map(|d| RecordExpander.expand(d));
        let mut collector = GroupsCollector::new(records);
        for record in collector.by_ref() {
            if let Err(e) = record {
                warn!(context = %self.id, error = %e, "Skipping malformed artifact record");
            }
        }
        let fresh = GroupSets {
            root: collector.root_groups().clone(),
            all: collector.all_groups().clone(),
        };
        info!(
            context = %self.id,
            root = fresh.root.len(),
            all = fresh.all.len(),
            "Groups rebuilt"
        );
        *self.groups.write() = fresh;
        self.commit_locked()
    }

    /// Close the context, optionally deleting its index directory.
    pub fn close(self, delete_files: bool) -> Result<()> {
        if delete_files {
            if let Some(dir) = &self.index_dir {
                match std::fs::remove_dir_all(dir) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(IndexError::Io(e)),
                }
                info!(context = %self.id, dir = %dir.display(), "Index files deleted");
            }
            return Ok(());
        }
        self.commit()
    }

    // --- inspection -----------------------------------------------------

    /// Committed documents, descriptor and group records included.
    pub fn documents(&self) -> Arc<StoreSnapshot> {
        self.store.snapshot()
    }

    pub fn artifact_count(&self) -> usize {
        self.store
            .snapshot()
            .docs()
            .iter()
            .filter(|d| d.is_artifact())
            .count()
    }

    pub fn deletion_marker_count(&self) -> usize {
        self.store
            .snapshot()
            .docs()
            .iter()
            .filter(|d| d.is_deletion_marker())
            .count()
    }

    // --- internals ------------------------------------------------------

    fn descriptor_document(&self) -> Document {
        RecordCompactor.compact(&Record::descriptor(&self.repository_id))
    }

    fn validate_descriptor(&self, docs: &[Document]) -> Result<()> {
        let Some(descriptor) = docs.iter().find(|d| d.is_descriptor()) else {
            return Err(IndexError::Validation(format!(
                "existing store for context '{}' has no descriptor",
                self.id
            )));
        };
        let stored = descriptor
            .get(Field::IdxInfo)
            .map(split_components)
            .and_then(|parts| parts.get(1).cloned())
            .unwrap_or_default();
        if stored != self.repository_id {
            return Err(IndexError::Validation(format!(
                "context '{}' expects repository '{}' but the existing store belongs to '{}'",
                self.id, self.repository_id, stored
            )));
        }
        Ok(())
    }

    /// Replace the store content with `docs`: our descriptor first,
    /// artifacts re-indexed, group sets taken from group records or
    /// recomputed from artifacts when there are none.
    fn install(&self, docs: Vec<Document>) -> Result<()> {
        let mut groups = GroupSets::default();
        let mut saw_root = false;
        let mut saw_all = false;
        let mut content = vec![self.descriptor_document()];
        let mut derived = GroupSets::default();

        for doc in docs {
            if doc.is_descriptor() {
                continue;
            }
            if doc.is_groups() {
                match RecordExpander.expand(&doc) {
                    Ok(record) => {
                        let list = record.get_list(EntryKey::Groups).unwrap_or_default();
                        match record.record_type {
                            RecordType::RootGroups => {
                                saw_root = true;
                                groups.root.extend(list.iter().cloned());
                            }
                            RecordType::AllGroups => {
                                saw_all = true;
                                groups.all.extend(list.iter().cloned());
                            }
                            _ => {}
                        }
                    }
                    Err(e) => warn!(context = %self.id, error = %e, "Skipping malformed groups record"),
                }
                continue;
            }
            let doc = self.index_document(doc);
            if let Some(group) = doc.get(Field::GroupId) {
                derived.root.insert(root_group(group).to_string());
                derived.all.insert(group.to_string());
            }
            content.push(doc);
        }

        if !saw_root {
            groups.root = derived.root;
        }
        if !saw_all {
            groups.all = derived.all;
        }
        *self.groups.write() = groups;
        self.store.replace_all(content)?;
        self.write_group_documents()?;
        self.store.commit()
    }

    fn write_group_documents(&self) -> Result<()> {
        let groups = self.groups.read().clone();
        let root = RecordCompactor.compact(&Record::groups(RecordType::RootGroups, groups.root));
        let all = RecordCompactor.compact(&Record::groups(RecordType::AllGroups, groups.all));
        let root_key = Field::RootGroups.key();
        let all_key = Field::AllGroups.key();
        self.store.update_document(Field::RootGroups, root_key, root)?;
        self.store.update_document(Field::AllGroups, all_key, all)?;
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let Some(dir) = &self.index_dir else {
            return Ok(());
        };
        let snapshot = self.store.snapshot();
        let bytes = encode_chunk(STORE_FILE, self.timestamp(), snapshot.docs())?;
        write_bytes(&DirectoryResourceHandler::new(dir), STORE_FILE, &bytes)?;
        debug!(context = %self.id, dir = %dir.display(), "Store persisted");
        Ok(())
    }
}

/// Read `store.gz` from `dir`. `None` when there is none.
pub fn load_store_file(dir: &Path) -> Result<Option<(Vec<Document>, Option<i64>)>> {
    let handler = DirectoryResourceHandler::new(dir);
    let Some(bytes) = read_bytes(&handler, STORE_FILE)? else {
        return Ok(None);
    };
    let name = dir.join(STORE_FILE).display().to_string();
    let reader = ChunkReader::open(&name, bytes.as_slice())?;
    let timestamp = reader.timestamp();
    let docs = reader.collect::<Result<Vec<_>>>()?;
    Ok(Some((docs, timestamp)))
}

/// Scoped read access to one committed snapshot of a context.
pub struct SearcherGuard<'c> {
    ctx: &'c IndexingContext,
    snapshot: Arc<StoreSnapshot>,
}

impl<'c> SearcherGuard<'c> {
    pub fn context(&self) -> &'c IndexingContext {
        self.ctx
    }

    pub fn snapshot(&self) -> &Arc<StoreSnapshot> {
        &self.snapshot
    }
}

impl Deref for SearcherGuard<'_> {
    type Target = StoreSnapshot;

    fn deref(&self) -> &StoreSnapshot {
        &self.snapshot
    }
}

impl Drop for SearcherGuard<'_> {
    fn drop(&mut self) {
        self.ctx.released.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creator::builtin_creators;
    use tempfile::TempDir;

    fn ctx() -> IndexingContext {
        IndexingContext::in_memory("ctx", "repo").unwrap()
    }

    #[test]
    fn test_commit_controls_visibility() {
        let ctx = ctx();
        ctx.add_artifact(&ArtifactInfo::new("org.a", "x", "1", "jar")).unwrap();
        assert_eq!(ctx.artifact_count(), 0);
        ctx.commit().unwrap();
        assert_eq!(ctx.artifact_count(), 1);
    }

    #[test]
    fn test_searcher_pins_snapshot_and_releases() {
        let ctx = ctx();
        ctx.add_artifact(&ArtifactInfo::new("org.a", "x", "1", "jar")).unwrap();
        ctx.commit().unwrap();
        {
            let guard = ctx.acquire_searcher();
            ctx.remove_artifact("org.a|x|1|NA|jar").unwrap();
            ctx.commit().unwrap();
            assert_eq!(guard.docs().iter().filter(|d| d.is_artifact()).count(), 1);
            assert_eq!(ctx.open_searchers(), 1);
        }
        assert_eq!(ctx.acquired_count(), ctx.released_count());
        assert_eq!(ctx.artifact_count(), 0);
        assert_eq!(ctx.deletion_marker_count(), 1);
    }

    #[test]
    fn test_groups_grow_but_never_shrink() {
        let ctx = ctx();
        ctx.add_artifact(&ArtifactInfo::new("org.apache.maven", "core", "1", "jar")).unwrap();
        ctx.add_artifact(&ArtifactInfo::new("qdox", "qdox", "1.5", "jar")).unwrap();
        ctx.commit().unwrap();
        assert!(ctx.root_groups().contains("org"));
        assert!(ctx.all_groups().contains("org.apache.maven"));

        ctx.remove_artifact("qdox|qdox|1.5|NA|jar").unwrap();
        ctx.commit().unwrap();
        assert!(ctx.all_groups().contains("qdox"));

        ctx.rebuild_groups().unwrap();
        assert!(!ctx.all_groups().contains("qdox"));
        assert!(ctx.all_groups().contains("org.apache.maven"));
    }

    #[test]
    fn test_readd_clears_deletion_marker() {
        let ctx = ctx();
        let info = ArtifactInfo::new("g", "a", "1", "jar");
        ctx.add_artifact(&info).unwrap();
        ctx.remove_artifact(&info.uinfo()).unwrap();
        ctx.add_artifact(&info).unwrap();
        ctx.commit().unwrap();
        assert_eq!(ctx.artifact_count(), 1);
        assert_eq!(ctx.deletion_marker_count(), 0);
    }

    #[test]
    fn test_purge_empties() {
        let ctx = ctx();
        ctx.add_artifact(&ArtifactInfo::new("g", "a", "1", "jar")).unwrap();
        ctx.commit().unwrap();
        ctx.purge().unwrap();
        assert_eq!(ctx.artifact_count(), 0);
        assert!(ctx.all_groups().is_empty());
    }

    #[test]
    fn test_persisted_store_reopens() {
        let dir = TempDir::new().unwrap();
        {
            let ctx = IndexingContext::create(
                "ctx",
                "repo",
                Some(dir.path()),
                builtin_creators(),
                ExistingStore::Validate,
            )
            .unwrap();
            ctx.add_artifact(&ArtifactInfo::new("g", "a", "1", "jar")).unwrap();
            ctx.set_timestamp(Some(1_000));
            ctx.close(false).unwrap();
        }
        let ctx = IndexingContext::create(
            "ctx",
            "repo",
            Some(dir.path()),
            builtin_creators(),
            ExistingStore::Validate,
        )
        .unwrap();
        assert_eq!(ctx.artifact_count(), 1);
        assert_eq!(ctx.timestamp(), Some(1_000));
        assert!(ctx.all_groups().contains("g"));
        // Index-only fields are rebuilt on load.
        let snap = ctx.documents();
        let doc = snap.docs().iter().find(|d| d.is_artifact()).unwrap();
        assert_eq!(doc.get(Field::GroupId), Some("g"));
    }

    #[test]
    fn test_validate_rejects_foreign_store_reclaim_accepts() {
        let dir = TempDir::new().unwrap();
        IndexingContext::create("ctx", "repo", Some(dir.path()), builtin_creators(), ExistingStore::Validate)
            .unwrap()
            .close(false)
            .unwrap();

        let err = IndexingContext::create(
            "ctx",
            "other",
            Some(dir.path()),
            builtin_creators(),
            ExistingStore::Validate,
        )
        .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let ctx = IndexingContext::create(
            "ctx",
            "other",
            Some(dir.path()),
            builtin_creators(),
            ExistingStore::Reclaim,
        )
        .unwrap();
        assert_eq!(ctx.repository_id(), "other");
    }

    #[test]
    fn test_replace_from_location() {
        let tmp = TempDir::new().unwrap();
        let staged = IndexingContext::create(
            "staged",
            "repo",
            Some(tmp.path()),
            builtin_creators(),
            ExistingStore::Reclaim,
        )
        .unwrap();
        staged.add_artifact(&ArtifactInfo::new("g", "new", "1", "jar")).unwrap();
        staged.commit().unwrap();

        let live = ctx();
        live.add_artifact(&ArtifactInfo::new("g", "old", "1", "jar")).unwrap();
        live.commit().unwrap();
        live.replace(tmp.path()).unwrap();

        let snap = live.documents();
        let ids: Vec<&str> = snap
            .docs()
            .iter()
            .filter_map(|d| d.get(Field::Uinfo))
            .collect();
        assert_eq!(ids, vec!["g|new|1|NA|jar"]);
    }

    #[test]
    fn test_close_with_delete_removes_dir() {
        let dir = TempDir::new().unwrap();
        let index_dir = dir.path().join("idx");
        let ctx = IndexingContext::create(
            "ctx",
            "repo",
            Some(&index_dir),
            builtin_creators(),
            ExistingStore::Validate,
        )
        .unwrap();
        assert!(index_dir.join(STORE_FILE).exists());
        ctx.close(true).unwrap();
        assert!(!index_dir.exists());
    }
}
