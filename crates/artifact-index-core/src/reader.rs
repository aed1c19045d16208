//! Consuming side of the chunk protocol: reconciliation.
//!
//! [`IndexReader::open`] compares the remote manifest with the local cache
//! manifest and decides which chunks the caller must apply:
//!
//! 1. No remote manifest: [`IndexError::NotFound`].
//! 2. No usable local manifest, a different chain id, or a forced full
//!    sync: the full chunk (plus any chunks published after it). A chain
//!    that never published a full chunk is replayed from counter 1. The
//!    local cache is invalidated first.
//! 3. Same chain: chunks for counters `(local, remote]`, ascending. If any
//!    of them has already left the remote's retention window, fall back to
//!    a full sync.
//!
//! Chunks are handed out one at a time by [`IndexReader::next_chunk`]; the
//! returned reader borrows the `IndexReader`, so the next chunk cannot be
//! opened while the previous one is still alive. Each chunk is mirrored into
//! the local cache before it is parsed. The local manifest only advances in
//! [`IndexReader::finish`], after every required chunk was handed out.

use std::io::{Cursor, Read};

use tracing::{debug, info, warn};

use crate::codec::ChunkReader;
use crate::error::{IndexError, Result};
use crate::properties::{full_chunk_name, incremental_chunk_name, manifest_name, IndexProperties};
use crate::resource::{read_bytes, write_bytes, ResourceHandler, WritableResourceHandler};

/// Chunk reader handed out by [`IndexReader::next_chunk`].
pub type FetchedChunk<'r> = ChunkReader<Box<dyn Read + Send + 'r>>;

pub struct IndexReader<'h> {
    remote: &'h dyn ResourceHandler,
    local: Option<&'h dyn WritableResourceHandler>,
    index_id: String,
    remote_props: IndexProperties,
    local_counter: Option<u64>,
    incremental: bool,
    chunk_names: Vec<String>,
    next: usize,
}

impl<'h> IndexReader<'h> {
    pub fn open(
        remote: &'h dyn ResourceHandler,
        local: Option<&'h dyn WritableResourceHandler>,
        index_id: &str,
        force_full: bool,
    ) -> Result<Self> {
        let name = manifest_name(index_id);
        let remote_props = match read_bytes(remote, &name)? {
            Some(bytes) => IndexProperties::parse(&name, &String::from_utf8_lossy(&bytes))?,
            None => return Err(IndexError::NotFound(name)),
        };
        let remote_chain = remote_props
            .chain_id()
            .ok_or_else(|| IndexError::format(&name, "manifest has no chain id"))?
            .to_string();

        let local_props = match local {
            Some(local) => read_local_manifest(local, &name),
            None => None,
        };

        let remote_counter = remote_props.counter();
        let table = remote_props.chunk_table();

        let incremental_plan = match &local_props {
            Some(lp) if !force_full && lp.chain_id() == Some(remote_chain.as_str()) => {
                let local_counter = lp.counter();
                if local_counter > remote_counter {
                    warn!(
                        index_id,
                        local_counter, remote_counter, "Local cache is ahead of remote; full sync"
                    );
                    None
                } else {
                    let required: Option<Vec<String>> = (local_counter + 1..=remote_counter)
                        .map(|c| table.get(&c).map(|seq| incremental_chunk_name(index_id, *seq)))
                        .collect();
                    if required.is_none() {
                        info!(
                            index_id,
                            local_counter, "Local cache is behind the retention window; full sync"
                        );
                    }
                    required
                }
            }
            _ => None,
        };

        let (incremental, chunk_names) = match incremental_plan {
            Some(names) => (true, names),
            None => {
                if let (Some(local), Some(lp)) = (local, &local_props) {
                    invalidate_local(local, index_id, lp);
                }
                // Without a full chunk the chain is rebuilt from counter 1.
                let (mut names, first) = match remote_props.full_counter() {
                    Some(full_counter) => (vec![full_chunk_name(index_id)], full_counter + 1),
                    None => (Vec::new(), 1),
                };
                for counter in first..=remote_counter {
                    let seq = table.get(&counter).ok_or_else(|| {
                        IndexError::format(
                            &name,
                            format!("no chunk entry for counter {} in the full plan", counter),
                        )
                    })?;
                    names.push(incremental_chunk_name(index_id, *seq));
                }
                (false, names)
            }
        };

        debug!(
            index_id,
            incremental,
            chunks = ?chunk_names,
            remote_counter,
            "Reconciled index manifests"
        );

        Ok(Self {
            remote,
            local,
            index_id: index_id.to_string(),
            local_counter: local_props.as_ref().map(|p| p.counter()),
            remote_props,
            incremental,
            chunk_names,
            next: 0,
        })
    }

    /// False when the caller must discard its current content and rebuild
    /// from the chunks handed out.
    pub fn is_incremental(&self) -> bool {
        self.incremental
    }

    /// Exact, ordered names of the chunks the caller must apply.
    pub fn chunk_names(&self) -> &[String] {
        &self.chunk_names
    }

    pub fn remote_properties(&self) -> &IndexProperties {
        &self.remote_props
    }

    pub fn local_counter(&self) -> Option<u64> {
        self.local_counter
    }

    pub fn remote_counter(&self) -> u64 {
        self.remote_props.counter()
    }

    /// Published timestamp of the remote index, epoch millis.
    pub fn remote_timestamp(&self) -> Option<i64> {
        self.remote_props.timestamp()
    }

    /// Open the next required chunk, or `None` once all were handed out.
    pub fn next_chunk(&mut self) -> Result<Option<FetchedChunk<'_>>> {
        let Some(name) = self.chunk_names.get(self.next).cloned() else {
            return Ok(None);
        };
        let stream: Box<dyn Read + Send + '_> = self.fetch(&name)?;
        self.next += 1;
        let reader = ChunkReader::open(&name, stream)?;
        Ok(Some(reader))
    }

    fn fetch(&self, name: &str) -> Result<Box<dyn Read + Send + 'static>> {
        // Incremental chunks never change within a chain; the full chunk is
        // rewritten on every publish.
        if self.incremental {
            if let Some(local) = self.local {
                if let Some(bytes) = read_bytes(local, name)? {
                    debug!(chunk = name, "Chunk served from local cache");
                    return Ok(Box::new(Cursor::new(bytes)));
                }
            }
        }

        let bytes = read_bytes(self.remote, name)?
            .ok_or_else(|| IndexError::NotFound(name.to_string()))?;
        if let Some(local) = self.local {
            write_bytes(local, name, &bytes)?;
        }
        debug!(chunk = name, bytes = bytes.len(), "Fetched chunk");
        Ok(Box::new(Cursor::new(bytes)))
    }

    /// Advance the local manifest to the remote state. Fails if any
    /// required chunk was not handed out.
    pub fn finish(self) -> Result<()> {
        if self.next < self.chunk_names.len() {
            return Err(IndexError::Validation(format!(
                "{} of {} chunks applied; local manifest not advanced",
                self.next,
                self.chunk_names.len()
            )));
        }
        if let Some(local) = self.local {
            let name = manifest_name(&self.index_id);
            write_bytes(local, &name, self.remote_props.serialize().as_bytes())?;
            info!(
                index_id = %self.index_id,
                counter = self.remote_props.counter(),
                "Local manifest advanced"
            );
        }
        Ok(())
    }
}

/// A local manifest that cannot be read is treated as absent.
fn read_local_manifest(local: &dyn WritableResourceHandler, name: &str) -> Option<IndexProperties> {
    let bytes = match read_bytes(local, name) {
        Ok(bytes) => bytes?,
        Err(e) => {
            warn!(manifest = name, error = %e, "Local manifest unreadable; ignoring");
            return None;
        }
    };
    match IndexProperties::parse(name, &String::from_utf8_lossy(&bytes)) {
        Ok(props) => Some(props),
        Err(e) => {
            warn!(manifest = name, error = %e, "Local manifest malformed; ignoring");
            None
        }
    }
}

/// Forget a stale local cache: manifest first, so an interrupted cleanup
/// still leaves nothing that looks current.
fn invalidate_local(local: &dyn WritableResourceHandler, index_id: &str, props: &IndexProperties) {
    let mut names = vec![manifest_name(index_id), full_chunk_name(index_id)];
    names.extend(
        props
            .chunk_table()
            .values()
            .map(|seq| incremental_chunk_name(index_id, *seq)),
    );
    for name in names {
        if let Err(e) = local.delete(&name) {
            warn!(resource = %name, error = %e, "Could not invalidate cached resource");
        }
    }
    info!(index_id, "Local chunk cache invalidated");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::fields::Field;
    use crate::resource::MemoryResourceHandler;
    use crate::writer::{IndexWriter, WriteMode};

    fn doc(v: &str) -> Document {
        let mut d = Document::new();
        d.set(Field::Uinfo, format!("g|a|{}|NA|jar", v));
        d
    }

    fn publish_full(h: &MemoryResourceHandler) {
        let mut w = IndexWriter::open(h, "idx", "repo", WriteMode::Full).unwrap();
        w.write_full(&[doc("1")]).unwrap();
        w.close().unwrap();
    }

    fn publish_chunk(h: &MemoryResourceHandler, v: &str) {
        let mut w = IndexWriter::open(h, "idx", "repo", WriteMode::Incremental).unwrap();
        w.write_chunk(&[doc(v)]).unwrap();
        w.write_full(&[doc("1"), doc(v)]).unwrap();
        w.close().unwrap();
    }

    fn drain(reader: &mut IndexReader<'_>) -> usize {
        let mut records = 0;
        while let Some(chunk) = reader.next_chunk().unwrap() {
            records += chunk.count();
        }
        records
    }

    #[test]
    fn test_missing_remote_manifest_is_not_found() {
        let remote = MemoryResourceHandler::new();
        let err = IndexReader::open(&remote, None, "idx", false).err().unwrap();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_no_local_cache_means_full() {
        let remote = MemoryResourceHandler::new();
        publish_full(&remote);
        publish_chunk(&remote, "2");
        let reader = IndexReader::open(&remote, None, "idx", false).unwrap();
        assert!(!reader.is_incremental());
        assert_eq!(reader.chunk_names(), &["idx.gz".to_string()]);
    }

    #[test]
    fn test_second_sync_fetches_only_new_chunks() {
        let remote = MemoryResourceHandler::new();
        let local = MemoryResourceHandler::new();
        publish_full(&remote);

        let mut reader = IndexReader::open(&remote, Some(&local), "idx", false).unwrap();
        drain(&mut reader);
        reader.finish().unwrap();

        publish_chunk(&remote, "2");
        publish_chunk(&remote, "3");
        let mut reader = IndexReader::open(&remote, Some(&local), "idx", false).unwrap();
        assert!(reader.is_incremental());
        assert_eq!(reader.chunk_names(), &["idx.1.gz".to_string(), "idx.2.gz".to_string()]);
        // Descriptor plus one artifact per chunk.
        assert_eq!(drain(&mut reader), 4);
        reader.finish().unwrap();
    }

    #[test]
    fn test_chain_without_full_chunk_replays_from_first() {
        let remote = MemoryResourceHandler::new();
        for v in ["1", "2", "3"] {
            let mut w = IndexWriter::open(&remote, "idx", "repo", WriteMode::Incremental).unwrap();
            w.write_chunk(&[doc(v)]).unwrap();
            w.close().unwrap();
        }
        let mut reader = IndexReader::open(&remote, None, "idx", false).unwrap();
        assert!(!reader.is_incremental());
        assert_eq!(
            reader.chunk_names(),
            &["idx.1.gz".to_string(), "idx.2.gz".to_string(), "idx.3.gz".to_string()]
        );
        assert_eq!(drain(&mut reader), 6);
    }

    #[test]
    fn test_new_chain_without_full_ignores_stale_full() {
        let remote = MemoryResourceHandler::new();
        let local = MemoryResourceHandler::new();
        publish_full(&remote);
        publish_chunk(&remote, "2");
        let mut reader = IndexReader::open(&remote, Some(&local), "idx", false).unwrap();
        drain(&mut reader);
        reader.finish().unwrap();

        let mut w = IndexWriter::open(&remote, "idx", "repo", WriteMode::Full).unwrap();
        w.write_chunk(&[doc("7"), doc("8")]).unwrap();
        w.close().unwrap();
        assert!(remote.contains("idx.1.gz"));
        assert!(!remote.contains("idx.gz"));

        let mut reader = IndexReader::open(&remote, Some(&local), "idx", false).unwrap();
        assert!(!reader.is_incremental());
        assert_eq!(reader.chunk_names(), &["idx.1.gz".to_string()]);
        let mut uinfos = Vec::new();
        while let Some(chunk) = reader.next_chunk().unwrap() {
            for d in chunk {
                if let Some(u) = d.unwrap().get(Field::Uinfo) {
                    uinfos.push(u.to_string());
                }
            }
        }
        assert_eq!(uinfos, vec!["g|a|7|NA|jar", "g|a|8|NA|jar"]);
        reader.finish().unwrap();
    }

    #[test]
    fn test_unfinished_sync_does_not_advance() {
        let remote = MemoryResourceHandler::new();
        let local = MemoryResourceHandler::new();
        publish_full(&remote);
        let reader = IndexReader::open(&remote, Some(&local), "idx", false).unwrap();
        assert!(reader.finish().is_err());
        assert!(!local.contains("idx.properties"));
    }
}
