//! The index manifest (`{index_id}.properties`).
//!
//! A flat `key=value` text resource. The keys the protocol relies on:
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `index.id` | index id the chunk names derive from |
//! | `index.chain-id` | changes on every non-incremental rebuild |
//! | `index.last-incremental` | current chunk counter |
//! | `index.incremental-<counter>` | sequence number of that counter's chunk |
//! | `index.full-counter` | counter the full chunk reflects |
//! | `index.timestamp` | published timestamp |
//! | `index.version` | chunk format version |
//!
//! Unknown keys are preserved across a read-modify-write.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

use crate::error::{IndexError, Result};

pub const KEY_INDEX_ID: &str = "index.id";
pub const KEY_CHAIN_ID: &str = "index.chain-id";
pub const KEY_LAST_INCREMENTAL: &str = "index.last-incremental";
pub const KEY_INCREMENTAL_PREFIX: &str = "index.incremental-";
pub const KEY_FULL_COUNTER: &str = "index.full-counter";
pub const KEY_TIMESTAMP: &str = "index.timestamp";
pub const KEY_VERSION: &str = "index.version";

/// `{index_id}.properties`
pub fn manifest_name(index_id: &str) -> String {
    format!("{}.properties", index_id)
}

/// `{index_id}.gz`
pub fn full_chunk_name(index_id: &str) -> String {
    format!("{}.gz", index_id)
}

/// `{index_id}.{sequence}.gz`
pub fn incremental_chunk_name(index_id: &str, sequence: u64) -> String {
    format!("{}.{}.gz", index_id, sequence)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexProperties {
    entries: BTreeMap<String, String>,
}

impl IndexProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse manifest text. Blank lines and `#`/`!` comments are skipped.
    pub fn parse(name: &str, text: &str) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let Some((key, value)) = line.split_once(['=', ':']) else {
                return Err(IndexError::format(
                    name,
                    format!("line {}: expected key=value", lineno + 1),
                ));
            };
            entries.insert(key.trim().to_string(), value.trim().to_string());
        }
        let props = Self { entries };
        props.validate(name)?;
        Ok(props)
    }

    fn validate(&self, name: &str) -> Result<()> {
        for key in [KEY_LAST_INCREMENTAL, KEY_FULL_COUNTER] {
            if let Some(v) = self.entries.get(key) {
                v.parse::<u64>().map_err(|_| {
                    IndexError::format(name, format!("{} is not a counter: '{}'", key, v))
                })?;
            }
        }
        for (key, value) in &self.entries {
            if let Some(counter) = key.strip_prefix(KEY_INCREMENTAL_PREFIX) {
                if counter.parse::<u64>().is_err() || value.parse::<u64>().is_err() {
                    return Err(IndexError::format(
                        name,
                        format!("malformed chunk entry {}={}", key, value),
                    ));
                }
            }
        }
        if let Some(ts) = self.entries.get(KEY_TIMESTAMP) {
            DateTime::parse_from_rfc3339(ts).map_err(|_| {
                IndexError::format(name, format!("malformed timestamp '{}'", ts))
            })?;
        }
        Ok(())
    }

    pub fn serialize(&self) -> String {
        let mut out = String::from("#Artifact index properties\n");
        for (k, v) in &self.entries {
            out.push_str(k);
            out.push('=');
            out.push_str(v);
            out.push('\n');
        }
        out
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub fn index_id(&self) -> Option<&str> {
        self.get(KEY_INDEX_ID)
    }

    pub fn chain_id(&self) -> Option<&str> {
        self.get(KEY_CHAIN_ID)
    }

    pub fn set_chain_id(&mut self, chain_id: &str) {
        self.set(KEY_CHAIN_ID, chain_id);
    }

    /// Current chunk counter; 0 for a chain that has only a full chunk.
    pub fn counter(&self) -> u64 {
        self.get(KEY_LAST_INCREMENTAL)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    pub fn set_counter(&mut self, counter: u64) {
        self.set(KEY_LAST_INCREMENTAL, counter.to_string());
    }

    pub fn full_counter(&self) -> Option<u64> {
        self.get(KEY_FULL_COUNTER).and_then(|v| v.parse().ok())
    }

    pub fn set_full_counter(&mut self, counter: u64) {
        self.set(KEY_FULL_COUNTER, counter.to_string());
    }

    /// Counter → chunk sequence number, ascending by counter.
    pub fn chunk_table(&self) -> BTreeMap<u64, u64> {
        self.entries
            .iter()
            .filter_map(|(k, v)| {
                let counter = k.strip_prefix(KEY_INCREMENTAL_PREFIX)?.parse().ok()?;
                Some((counter, v.parse().ok()?))
            })
            .collect()
    }

    pub fn set_chunk(&mut self, counter: u64, sequence: u64) {
        self.set(&format!("{}{}", KEY_INCREMENTAL_PREFIX, counter), sequence.to_string());
    }

    pub fn remove_chunk(&mut self, counter: u64) {
        self.remove(&format!("{}{}", KEY_INCREMENTAL_PREFIX, counter));
    }

    pub fn clear_chunks(&mut self) {
        self.entries.retain(|k, _| !k.starts_with(KEY_INCREMENTAL_PREFIX));
    }

    /// Published timestamp in epoch millis.
    pub fn timestamp(&self) -> Option<i64> {
        self.get(KEY_TIMESTAMP)
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|dt| dt.timestamp_millis())
    }

    pub fn set_timestamp(&mut self, millis: i64) {
        if let Some(dt) = Utc.timestamp_millis_opt(millis).single() {
            self.set(KEY_TIMESTAMP, dt.to_rfc3339_opts(SecondsFormat::Millis, true));
        }
    }

    pub fn version(&self) -> Option<&str> {
        self.get(KEY_VERSION)
    }
}
