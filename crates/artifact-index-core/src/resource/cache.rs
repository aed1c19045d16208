//! Read-through cache: a writable local handler in front of a remote one.

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::Result;

use super::{read_bytes, write_bytes, ResourceHandler, ResourceStream, WritableResourceHandler};

/// Serves resources from `local` when present, otherwise fetches them from
/// `remote` and keeps a local copy. Names the remote reported missing are
/// remembered for the lifetime of this handler and never asked for again.
pub struct CachingResourceHandler {
    local: Arc<dyn WritableResourceHandler>,
    remote: Arc<dyn ResourceHandler>,
    not_found: Mutex<HashSet<String>>,
}

impl CachingResourceHandler {
    pub fn new(local: Arc<dyn WritableResourceHandler>, remote: Arc<dyn ResourceHandler>) -> Self {
        Self {
            local,
            remote,
            not_found: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_known_missing(&self, name: &str) -> bool {
        self.not_found.lock().contains(name)
    }
}

impl ResourceHandler for CachingResourceHandler {
    fn open(&self, name: &str) -> Result<Option<ResourceStream>> {
        if let Some(stream) = self.local.open(name)? {
            return Ok(Some(stream));
        }
        if self.is_known_missing(name) {
            return Ok(None);
        }
        match read_bytes(self.remote.as_ref(), name)? {
            Some(bytes) => {
                write_bytes(self.local.as_ref(), name, &bytes)?;
                debug!(resource = name, bytes = bytes.len(), "Cached remote resource");
                Ok(Some(Box::new(Cursor::new(bytes))))
            }
            None => {
                self.not_found.lock().insert(name.to_string());
                Ok(None)
            }
        }
    }
}
