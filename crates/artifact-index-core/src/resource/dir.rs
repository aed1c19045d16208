//! Resources as files in one directory.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{IndexError, Result};

use super::{check_name, ResourceHandler, ResourceSink, ResourceStream, WritableResourceHandler};

#[derive(Debug, Clone)]
pub struct DirectoryResourceHandler {
    root: PathBuf,
}

impl DirectoryResourceHandler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceHandler for DirectoryResourceHandler {
    fn open(&self, name: &str) -> Result<Option<ResourceStream>> {
        check_name(name)?;
        match File::open(self.root.join(name)) {
            Ok(file) => Ok(Some(Box::new(io::BufReader::new(file)))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(IndexError::transport(name, e)),
        }
    }
}

impl WritableResourceHandler for DirectoryResourceHandler {
    fn create(&self, name: &str) -> Result<Box<dyn ResourceSink>> {
        check_name(name)?;
        fs::create_dir_all(&self.root).map_err(|e| IndexError::write(name, e))?;
        let tmp = self
            .root
            .join(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()));
        let file = File::create(&tmp).map_err(|e| IndexError::write(name, e))?;
        Ok(Box::new(FileSink {
            name: name.to_string(),
            tmp,
            target: self.root.join(name),
            out: Some(BufWriter::new(file)),
        }))
    }

    fn delete(&self, name: &str) -> Result<()> {
        check_name(name)?;
        match fs::remove_file(self.root.join(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(IndexError::write(name, e)),
        }
    }
}

struct FileSink {
    name: String,
    tmp: PathBuf,
    target: PathBuf,
    out: Option<BufWriter<File>>,
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.out.as_mut() {
            Some(out) => out.write(buf),
            None => Err(io::Error::other("sink already committed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.out.as_mut() {
            Some(out) => out.flush(),
            None => Ok(()),
        }
    }
}

impl ResourceSink for FileSink {
    fn commit(mut self: Box<Self>) -> Result<()> {
        let Some(out) = self.out.take() else {
            return Ok(());
        };
        let file = out
            .into_inner()
            .map_err(|e| IndexError::write(&self.name, e.into_error()))?;
        file.sync_all()
            .map_err(|e| IndexError::write(&self.name, e))?;
        drop(file);
        fs::rename(&self.tmp, &self.target).map_err(|e| IndexError::write(&self.name, e))?;
        debug!(resource = %self.name, "Resource committed");
        Ok(())
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        if self.out.take().is_some() {
            let _ = fs::remove_file(&self.tmp);
        }
    }
}
