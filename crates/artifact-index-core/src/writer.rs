//! Publishing side of the chunk protocol.
//!
//! An [`IndexWriter`] session writes zero or more incremental chunks and at
//! most one full chunk, then [`IndexWriter::close`] updates the manifest in
//! a single write. That write is the commit point: until it lands, readers
//! see the previous state, whatever chunk resources already exist.
//!
//! Concurrent writers against the same handler and index id are not
//! supported. Callers serialize publishing themselves.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::codec::{ChunkWriter, CHUNK_VERSION};
use crate::document::Document;
use crate::error::{IndexError, Result};
use crate::properties::{
    full_chunk_name, incremental_chunk_name, manifest_name, IndexProperties, KEY_INDEX_ID,
    KEY_VERSION,
};
use crate::record::{Record, RecordCompactor};
use crate::resource::{read_bytes, write_bytes, WritableResourceHandler};

/// Incremental chunks kept in the manifest when not configured otherwise.
pub const DEFAULT_MAX_CHUNKS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Continue the existing chain when the target already has one.
    Incremental,
    /// Start a new chain; readers of the old one fall back to a full sync.
    Full,
}

pub struct IndexWriter<'h> {
    handler: &'h dyn WritableResourceHandler,
    index_id: String,
    repository_id: String,
    props: IndexProperties,
    previous_timestamp: Option<i64>,
    counter: u64,
    new_chain: bool,
    timestamp: i64,
    max_chunks: usize,
    dirty: bool,
    /// Chunks of a replaced chain, removed once the new manifest is in place.
    orphaned: Vec<String>,
    /// Resources written by this session; never retired by it.
    written: Vec<String>,
}

impl<'h> IndexWriter<'h> {
    /// Start a session against `handler`, reading the current manifest.
    pub fn open(
        handler: &'h dyn WritableResourceHandler,
        index_id: &str,
        repository_id: &str,
        mode: WriteMode,
    ) -> Result<Self> {
        let name = manifest_name(index_id);
        let existing = match read_bytes(handler, &name)? {
            Some(bytes) => Some(IndexProperties::parse(
                &name,
                &String::from_utf8_lossy(&bytes),
            )?),
            None => None,
        };

        let previous_timestamp = existing.as_ref().and_then(|p| p.timestamp());
        let continue_chain = mode == WriteMode::Incremental
            && existing.as_ref().is_some_and(|p| p.chain_id().is_some());

        let (props, counter, orphaned) = match existing {
            Some(props) if continue_chain => {
                let counter = props.counter();
                (props, counter, Vec::new())
            }
            existing => {
                let mut props = existing.unwrap_or_default();
                let mut orphaned: Vec<String> = props
                    .chunk_table()
                    .values()
                    .map(|seq| incremental_chunk_name(index_id, *seq))
                    .collect();
                orphaned.push(full_chunk_name(index_id));
                props.clear_chunks();
                props.remove(crate::properties::KEY_FULL_COUNTER);
                props.set_chain_id(&uuid::Uuid::new_v4().to_string());
                (props, 0, orphaned)
            }
        };

        let now = Utc::now().timestamp_millis();
        let timestamp = match previous_timestamp {
            Some(prev) if prev >= now => prev + 1,
            _ => now,
        };

        debug!(
            index_id,
            chain = props.chain_id().unwrap_or_default(),
            counter,
            new_chain = !continue_chain,
            "Opened index writer"
        );

        Ok(Self {
            handler,
            index_id: index_id.to_string(),
            repository_id: repository_id.to_string(),
            props,
            previous_timestamp,
            counter,
            new_chain: !continue_chain,
            timestamp,
            max_chunks: DEFAULT_MAX_CHUNKS,
            dirty: false,
            orphaned,
            written: Vec::new(),
        })
    }

    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = max_chunks.max(1);
        self
    }

    pub fn index_id(&self) -> &str {
        &self.index_id
    }

    pub fn chain_id(&self) -> &str {
        self.props.chain_id().unwrap_or_default()
    }

    /// Counter after the chunks written so far in this session.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn is_new_chain(&self) -> bool {
        self.new_chain
    }

    /// Published timestamp of the manifest this session started from.
    pub fn previous_timestamp(&self) -> Option<i64> {
        self.previous_timestamp
    }

    /// Timestamp stamped on this session's chunks and manifest.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Write the next incremental chunk. Returns its counter.
    pub fn write_chunk<'d, I>(&mut self, docs: I) -> Result<u64>
    where
        I: IntoIterator<Item = &'d Document>,
    {
        let counter = self.counter + 1;
        let name = incremental_chunk_name(&self.index_id, counter);
        let records = self.write_resource(&name, docs)?;
        self.counter = counter;
        self.props.set_chunk(counter, counter);
        self.dirty = true;
        info!(chunk = %name, counter, records, "Wrote incremental chunk");
        self.written.push(name);
        Ok(counter)
    }

    /// Write (or rewrite) the full chunk, reflecting the current counter.
    pub fn write_full<'d, I>(&mut self, docs: I) -> Result<()>
    where
        I: IntoIterator<Item = &'d Document>,
    {
        let name = full_chunk_name(&self.index_id);
        let records = self.write_resource(&name, docs)?;
        self.props.set_full_counter(self.counter);
        self.dirty = true;
        info!(chunk = %name, counter = self.counter, records, "Wrote full chunk");
        self.written.push(name);
        Ok(())
    }

    fn write_resource<'d, I>(&self, name: &str, docs: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'d Document>,
    {
        let sink = self.handler.create(name)?;
        let mut writer = ChunkWriter::new(name, sink, Some(self.timestamp))?;
        let mut docs = docs.into_iter().peekable();
        if !docs.peek().is_some_and(|d| d.is_descriptor()) {
            let descriptor = RecordCompactor.compact(&Record::descriptor(&self.repository_id));
            writer.write_document(&descriptor)?;
        }
        for doc in docs {
            writer.write_document(doc)?;
        }
        let written = writer.written();
        writer.finish()?.commit()?;
        Ok(written)
    }

    /// Commit the session: one manifest write, then cleanup of chunks that
    /// fell out of the retention window. A session that wrote nothing
    /// leaves the manifest untouched.
    ///
    /// Retention only drops chunks at or below the full chunk's counter, so
    /// a fresh reader can always rebuild the chain from what is listed.
    pub fn close(mut self) -> Result<IndexProperties> {
        if !self.dirty {
            debug!(index_id = %self.index_id, "Nothing written; manifest unchanged");
            return Ok(self.props);
        }

        let written = std::mem::take(&mut self.written);
        let mut pruned: Vec<String> = std::mem::take(&mut self.orphaned)
            .into_iter()
            .filter(|name| !written.contains(name))
            .collect();
        let table = self.props.chunk_table();
        if table.len() > self.max_chunks {
            let excess = table.len() - self.max_chunks;
            let floor = self.props.full_counter().unwrap_or(0);
            for (counter, seq) in table.into_iter().take(excess) {
                if counter > floor {
                    debug!(counter, "Keeping chunk newer than the full chunk");
                    break;
                }
                self.props.remove_chunk(counter);
                pruned.push(incremental_chunk_name(&self.index_id, seq));
            }
        }

        self.props.set(KEY_INDEX_ID, self.index_id.as_str());
        self.props.set_counter(self.counter);
        self.props.set(KEY_VERSION, CHUNK_VERSION.to_string());
        self.props.set_timestamp(self.timestamp);

        let name = manifest_name(&self.index_id);
        write_bytes(self.handler, &name, self.props.serialize().as_bytes()).map_err(|e| {
            match e {
                IndexError::Write { .. } => e,
                other => IndexError::write(&name, std::io::Error::other(other.to_string())),
            }
        })?;
        info!(
            index_id = %self.index_id,
            chain = self.chain_id(),
            counter = self.counter,
            "Manifest updated"
        );

        for chunk in pruned {
            if let Err(e) = self.handler.delete(&chunk) {
                warn!(chunk = %chunk, error = %e, "Could not delete retired chunk");
            }
        }
        Ok(self.props)
    }
}
