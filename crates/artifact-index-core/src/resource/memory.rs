//! In-memory resources, for tests and for staging chunks before upload.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{self, Cursor, Write};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::{IndexError, Result};

use super::{check_name, ResourceHandler, ResourceSink, ResourceStream, WritableResourceHandler};

/// Shared, cloneable in-memory handler.
///
/// Clones share storage. Every `open` of an existing resource is counted so
/// tests can assert how many fetches a sync performed, and individual names
/// can be made to fail with a transport error.
#[derive(Clone, Default)]
pub struct MemoryResourceHandler {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    blobs: RwLock<BTreeMap<String, Arc<Vec<u8>>>>,
    opens: Mutex<HashMap<String, usize>>,
    failing: Mutex<BTreeSet<String>>,
    failing_writes: Mutex<BTreeSet<String>>,
}

impl MemoryResourceHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        self.inner.blobs.read().keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.blobs.read().contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.inner.blobs.read().get(name).map(|b| b.as_ref().clone())
    }

    pub fn put(&self, name: &str, bytes: Vec<u8>) {
        self.inner.blobs.write().insert(name.to_string(), Arc::new(bytes));
    }

    /// Successful opens of `name` so far.
    pub fn open_count(&self, name: &str) -> usize {
        self.inner.opens.lock().get(name).copied().unwrap_or(0)
    }

    /// Successful opens across all names.
    pub fn total_opens(&self) -> usize {
        self.inner.opens.lock().values().sum()
    }

    pub fn reset_counts(&self) {
        self.inner.opens.lock().clear();
    }

    /// Make every subsequent open of `name` fail with a transport error.
    pub fn fail_reads_of(&self, name: &str) {
        self.inner.failing.lock().insert(name.to_string());
    }

    /// Make every subsequent `create` of `name` fail.
    pub fn fail_writes_of(&self, name: &str) {
        self.inner.failing_writes.lock().insert(name.to_string());
    }

    pub fn clear_failures(&self) {
        self.inner.failing.lock().clear();
        self.inner.failing_writes.lock().clear();
    }
}

impl ResourceHandler for MemoryResourceHandler {
    fn open(&self, name: &str) -> Result<Option<ResourceStream>> {
        check_name(name)?;
        if self.inner.failing.lock().contains(name) {
            return Err(IndexError::transport(
                name,
                io::Error::new(io::ErrorKind::ConnectionReset, "injected failure"),
            ));
        }
        let blob = self.inner.blobs.read().get(name).cloned();
        match blob {
            Some(bytes) => {
                *self.inner.opens.lock().entry(name.to_string()).or_default() += 1;
                Ok(Some(Box::new(Cursor::new(SharedBytes(bytes)))))
            }
            None => Ok(None),
        }
    }
}

impl WritableResourceHandler for MemoryResourceHandler {
    fn create(&self, name: &str) -> Result<Box<dyn ResourceSink>> {
        check_name(name)?;
        if self.inner.failing_writes.lock().contains(name) {
            return Err(IndexError::write(
                name,
                io::Error::new(io::ErrorKind::PermissionDenied, "injected failure"),
            ));
        }
        Ok(Box::new(MemorySink {
            name: name.to_string(),
            buf: Vec::new(),
            inner: self.inner.clone(),
        }))
    }

    fn delete(&self, name: &str) -> Result<()> {
        check_name(name)?;
        self.inner.blobs.write().remove(name);
        Ok(())
    }
}

struct SharedBytes(Arc<Vec<u8>>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

struct MemorySink {
    name: String,
    buf: Vec<u8>,
    inner: Arc<Inner>,
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ResourceSink for MemorySink {
    fn commit(self: Box<Self>) -> Result<()> {
        let MemorySink { name, buf, inner } = *self;
        inner.blobs.write().insert(name, Arc::new(buf));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{read_bytes, write_bytes};

    #[test]
    fn test_clones_share_storage_and_counts() {
        let a = MemoryResourceHandler::new();
        let b = a.clone();
        write_bytes(&a, "x.gz", b"abc").unwrap();
        assert_eq!(read_bytes(&b, "x.gz").unwrap().unwrap(), b"abc");
        assert_eq!(a.open_count("x.gz"), 1);
        assert_eq!(a.open_count("missing.gz"), 0);
    }

    #[test]
    fn test_injected_failure_is_transport() {
        let h = MemoryResourceHandler::new();
        h.put("x.gz", vec![1]);
        h.fail_reads_of("x.gz");
        let err = h.open("x.gz").err().unwrap();
        assert!(err.is_retryable());
    }
}
