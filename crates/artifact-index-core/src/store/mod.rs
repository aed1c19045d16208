//! Storage abstraction for indexed documents.
//!
//! The [`IndexStore`] trait is the seam to a full-text engine. Mutations
//! are buffered until [`IndexStore::commit`]; searches run against an
//! immutable [`StoreSnapshot`], so a searcher that took a snapshot keeps a
//! consistent view however the store changes afterwards.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`add_document`](IndexStore::add_document) | Buffer a new document |
//! | [`update_document`](IndexStore::update_document) | Replace documents whose key field equals a value |
//! | [`delete_documents`](IndexStore::delete_documents) | Remove documents whose key field equals a value |
//! | [`commit`](IndexStore::commit) | Publish buffered changes to new snapshots |
//! | [`rollback`](IndexStore::rollback) | Drop buffered changes |
//! | [`purge`](IndexStore::purge) | Empty the store |
//! | [`replace_all`](IndexStore::replace_all) | Swap in a complete document set |
//! | [`snapshot`](IndexStore::snapshot) | Current committed view |
//!
//! Implementations serialize mutations internally and must be
//! `Send + Sync`.

pub mod memory;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::document::Document;
use crate::error::Result;
use crate::fields::Field;
use crate::query::Query;

pub use memory::InMemoryStore;

pub trait IndexStore: Send + Sync {
    fn add_document(&self, doc: Document) -> Result<()>;

    /// Delete every document whose `key` field equals `value`, then add
    /// `doc`.
    fn update_document(&self, key: Field, value: &str, doc: Document) -> Result<()>;

    /// Returns the number of documents removed from the pending view.
    fn delete_documents(&self, key: Field, value: &str) -> Result<usize>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self);

    /// Empty the store, pending changes included. Takes effect immediately.
    fn purge(&self) -> Result<()>;

    /// Replace the whole content, pending changes included. Takes effect
    /// immediately.
    fn replace_all(&self, docs: Vec<Document>) -> Result<()>;

    fn snapshot(&self) -> Arc<StoreSnapshot>;

    fn has_pending_changes(&self) -> bool;
}

/// One search hit: a document position in its snapshot plus a score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
    pub doc: usize,
    pub score: f32,
}

#[derive(Debug, Clone, Default)]
pub struct TopHits {
    /// Every match, however many were returned.
    pub total_hits: usize,
    /// Best hits first, at most the requested limit.
    pub hits: Vec<ScoredDoc>,
}

/// An immutable, committed view of a store.
#[derive(Debug, Default)]
pub struct StoreSnapshot {
    docs: Vec<Document>,
    generation: u64,
    searches: AtomicUsize,
}

impl StoreSnapshot {
    pub fn new(docs: Vec<Document>, generation: u64) -> Self {
        Self {
            docs,
            generation,
            searches: AtomicUsize::new(0),
        }
    }

    pub fn docs(&self) -> &[Document] {
        &self.docs
    }

    pub fn doc(&self, idx: usize) -> Option<&Document> {
        self.docs.get(idx)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Commit generation this view was taken at.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// How many times [`search`](Self::search) ran on this view.
    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::Relaxed)
    }

    /// Best `limit` matches by descending score; ties keep store order.
    pub fn search(&self, query: &Query, limit: usize) -> TopHits {
        self.searches.fetch_add(1, Ordering::Relaxed);
        let mut hits: Vec<ScoredDoc> = self
            .docs
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_artifact())
            .filter_map(|(i, d)| query.score(d).map(|score| ScoredDoc { doc: i, score }))
            .collect();
        let total_hits = hits.len();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        TopHits { total_hits, hits }
    }

    /// Documents whose `field` equals `value` exactly.
    pub fn find(&self, field: Field, value: &str) -> impl Iterator<Item = &Document> + '_ {
        let value = value.to_string();
        self.docs
            .iter()
            .filter(move |d| d.get(field) == Some(value.as_str()))
    }
}
