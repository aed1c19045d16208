//! In-memory [`IndexStore`] implementation.
//!
//! The committed view is an `Arc<StoreSnapshot>` swapped on commit. The
//! first mutation after a commit copies the committed documents into a
//! pending working set; later mutations edit that set in place.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::document::Document;
use crate::error::Result;
use crate::fields::Field;

use super::{IndexStore, StoreSnapshot};

pub struct InMemoryStore {
    committed: RwLock<Arc<StoreSnapshot>>,
    pending: Mutex<Option<Vec<Document>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            committed: RwLock::new(Arc::new(StoreSnapshot::new(Vec::new(), 0))),
            pending: Mutex::new(None),
        }
    }

    pub fn with_documents(docs: Vec<Document>) -> Self {
        Self {
            committed: RwLock::new(Arc::new(StoreSnapshot::new(docs, 1))),
            pending: Mutex::new(None),
        }
    }

    fn with_pending<T>(&self, f: impl FnOnce(&mut Vec<Document>) -> T) -> T {
        let mut pending = self.pending.lock();
        let docs = pending.get_or_insert_with(|| self.committed.read().docs().to_vec());
        f(docs)
    }

    fn publish(&self, docs: Vec<Document>) {
        let mut committed = self.committed.write();
        let generation = committed.generation() + 1;
        *committed = Arc::new(StoreSnapshot::new(docs, generation));
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexStore for InMemoryStore {
    fn add_document(&self, doc: Document) -> Result<()> {
        self.with_pending(|docs| docs.push(doc));
        Ok(())
    }

    fn update_document(&self, key: Field, value: &str, doc: Document) -> Result<()> {
        self.with_pending(|docs| {
            docs.retain(|d| d.get(key) != Some(value));
            docs.push(doc);
        });
        Ok(())
    }

    fn delete_documents(&self, key: Field, value: &str) -> Result<usize> {
        Ok(self.with_pending(|docs| {
            let before = docs.len();
            docs.retain(|d| d.get(key) != Some(value));
            before - docs.len()
        }))
    }

    fn commit(&self) -> Result<()> {
        let mut pending = self.pending.lock();
        if let Some(docs) = pending.take() {
            let count = docs.len();
            self.publish(docs);
            debug!(documents = count, "Store committed");
        }
        Ok(())
    }

    fn rollback(&self) {
        self.pending.lock().take();
    }

    fn purge(&self) -> Result<()> {
        let mut pending = self.pending.lock();
        pending.take();
        self.publish(Vec::new());
        Ok(())
    }

    fn replace_all(&self, docs: Vec<Document>) -> Result<()> {
        let mut pending = self.pending.lock();
        pending.take();
        self.publish(docs);
        Ok(())
    }

    fn snapshot(&self) -> Arc<StoreSnapshot> {
        self.committed.read().clone()
    }

    fn has_pending_changes(&self) -> bool {
        self.pending.lock().is_some()
    }
}
