//! Named byte-blob storage for chunks and manifests.
//!
//! The protocol never touches a filesystem or a socket directly; it reads
//! and writes named resources through these traits.
//!
//! | Handler | Read | Write | Notes |
//! |---------|------|-------|-------|
//! | [`DirectoryResourceHandler`] | yes | yes | temp file + rename on commit |
//! | [`MemoryResourceHandler`] | yes | yes | tests; counts opens, injects failures |
//! | [`CachingResourceHandler`] | yes | no | local copy first, remembers misses |
//!
//! A missing resource is `Ok(None)`, never an error.

pub mod cache;
pub mod dir;
pub mod memory;

use std::io::{Read, Write};

use crate::error::{IndexError, Result};

pub use cache::CachingResourceHandler;
pub use dir::DirectoryResourceHandler;
pub use memory::MemoryResourceHandler;

/// Boxed stream returned by [`ResourceHandler::open`].
pub type ResourceStream = Box<dyn Read + Send>;

/// Read access to named resources.
pub trait ResourceHandler: Send + Sync {
    /// Open a resource for reading. `Ok(None)` when it does not exist.
    fn open(&self, name: &str) -> Result<Option<ResourceStream>>;
}

/// A write stream that only becomes visible under its name on commit.
pub trait ResourceSink: Write + Send {
    fn commit(self: Box<Self>) -> Result<()>;
}

/// Read/write access to named resources.
pub trait WritableResourceHandler: ResourceHandler {
    /// Open a write stream. Dropping it without `commit` discards the data.
    fn create(&self, name: &str) -> Result<Box<dyn ResourceSink>>;

    /// Remove a resource. Removing a missing resource is not an error.
    fn delete(&self, name: &str) -> Result<()>;
}

/// A located resource: a name bound to the handler that serves it.
pub struct Resource<'a> {
    handler: &'a dyn ResourceHandler,
    name: String,
}

impl<'a> Resource<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn read(&self) -> Result<Option<ResourceStream>> {
        self.handler.open(&self.name)
    }

    pub fn exists(&self) -> Result<bool> {
        Ok(self.read()?.is_some())
    }
}

/// Bind a name to a handler without touching storage.
pub fn locate<'a>(handler: &'a dyn ResourceHandler, name: &str) -> Resource<'a> {
    Resource {
        handler,
        name: name.to_string(),
    }
}

/// Read a whole resource into memory.
pub fn read_bytes(handler: &(impl ResourceHandler + ?Sized), name: &str) -> Result<Option<Vec<u8>>> {
    let Some(mut stream) = handler.open(name)? else {
        return Ok(None);
    };
    let mut buf = Vec::new();
    stream
        .read_to_end(&mut buf)
        .map_err(|e| IndexError::transport(name, e))?;
    Ok(Some(buf))
}

/// Write and commit a whole resource.
pub fn write_bytes(
    handler: &(impl WritableResourceHandler + ?Sized),
    name: &str,
    bytes: &[u8],
) -> Result<()> {
    let mut sink = handler.create(name)?;
    sink.write_all(bytes)
        .map_err(|e| IndexError::write(name, e))?;
    sink.commit()
}

/// Reject names that would escape a handler's namespace.
pub(crate) fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(IndexError::Validation(format!(
            "invalid resource name '{}'",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_missing_is_not_an_error() {
        let handler = MemoryResourceHandler::new();
        let res = locate(&handler, "nothing.gz");
        assert_eq!(res.name(), "nothing.gz");
        assert!(!res.exists().unwrap());
    }

    #[test]
    fn test_names_with_separators_rejected() {
        assert!(check_name("../x").is_err());
        assert!(check_name("a/b").is_err());
        assert!(check_name("central.3.gz").is_ok());
    }
}
