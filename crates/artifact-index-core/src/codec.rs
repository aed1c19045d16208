//! Chunk wire format.
//!
//! A chunk is a gzip stream containing:
//!
//! ```text
//! u8   version            (always 1)
//! i64  timestamp millis   (-1 when absent)
//! repeated until end of stream:
//!   i32  field count
//!   repeated field count times:
//!     u8   flags          (indexed | tokenized | stored)
//!     u16  name length,  name bytes (UTF-8)
//!     i32  value length, value bytes (UTF-8)
//! ```
//!
//! All integers are big-endian. End of stream at a record boundary ends the
//! chunk; end of stream anywhere else is a truncation.

use std::io::{self, BufReader, Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use crate::document::{DocField, Document};
use crate::error::{IndexError, Result};
use crate::record::{Record, RecordExpander};

/// The only chunk version this codec reads and writes.
pub const CHUNK_VERSION: u8 = 1;

/// Upper bound on fields per record; anything larger is corrupt input.
const MAX_FIELDS: i32 = 4096;

/// Serializes documents into one chunk.
pub struct ChunkWriter<W: Write> {
    name: String,
    out: GzEncoder<W>,
    written: usize,
}

impl<W: Write> ChunkWriter<W> {
    /// Start a chunk and write its header.
    pub fn new(name: &str, out: W, timestamp: Option<i64>) -> Result<Self> {
        let mut out = GzEncoder::new(out, Compression::default());
        let mut header = [0u8; 9];
        header[0] = CHUNK_VERSION;
        header[1..].copy_from_slice(&timestamp.unwrap_or(-1).to_be_bytes());
        out.write_all(&header)
            .map_err(|e| IndexError::write(name, e))?;
        Ok(Self {
            name: name.to_string(),
            out,
            written: 0,
        })
    }

    /// Append one document. Index-only fields are not written.
    pub fn write_document(&mut self, doc: &Document) -> Result<()> {
        let stored: Vec<&DocField> = doc.fields().iter().filter(|f| f.is_stored()).collect();
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&(stored.len() as i32).to_be_bytes());
        for field in stored {
            let name_len = u16::try_from(field.name.len()).map_err(|_| {
                IndexError::format(&self.name, format!("field name too long: {}", field.name))
            })?;
            let value_len = i32::try_from(field.value.len()).map_err(|_| {
                IndexError::format(&self.name, format!("field value too long: {}", field.name))
            })?;
            buf.push(field.flags);
            buf.extend_from_slice(&name_len.to_be_bytes());
            buf.extend_from_slice(field.name.as_bytes());
            buf.extend_from_slice(&value_len.to_be_bytes());
            buf.extend_from_slice(field.value.as_bytes());
        }
        self.out
            .write_all(&buf)
            .map_err(|e| IndexError::write(&self.name, e))?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Finish the compressed stream and hand back the sink.
    pub fn finish(self) -> Result<W> {
        debug!(chunk = %self.name, records = self.written, "Chunk written");
        let name = self.name;
        self.out.finish().map_err(|e| IndexError::write(name, e))
    }
}

/// Lazy, single-pass reader over one chunk.
///
/// Iteration yields documents in the order they were written. The first
/// error ends the iteration.
pub struct ChunkReader<R: Read> {
    name: String,
    input: GzDecoder<BufReader<R>>,
    version: u8,
    timestamp: Option<i64>,
    done: bool,
}

impl<R: Read> ChunkReader<R> {
    /// Open a chunk and validate its header.
    pub fn open(name: &str, input: R) -> Result<Self> {
        let mut input = GzDecoder::new(BufReader::new(input));
        let mut header = [0u8; 9];
        input
            .read_exact(&mut header)
            .map_err(|e| read_error(name, e, "chunk header"))?;
        if header[0] != CHUNK_VERSION {
            return Err(IndexError::format(
                name,
                format!("unsupported chunk version {}", header[0]),
            ));
        }
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&header[1..]);
        let ts = i64::from_be_bytes(ts);
        Ok(Self {
            name: name.to_string(),
            input,
            version: header[0],
            timestamp: (ts >= 0).then_some(ts),
            done: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Chunk creation time in epoch millis.
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    /// Expand each document into a typed record as it streams past.
    pub fn records(self) -> impl Iterator<Item = Result<Record>> {
        self.map(|doc| doc.and_then(|d| RecordExpander.expand(&d)))
    }

    fn read_document(&mut self) -> Result<Option<Document>> {
        let mut count = [0u8; 4];
        if !self.read_or_eof(&mut count)? {
            return Ok(None);
        }
        let count = i32::from_be_bytes(count);
        if !(0..=MAX_FIELDS).contains(&count) {
            return Err(IndexError::format(
                &self.name,
                format!("invalid field count {}", count),
            ));
        }

        let mut doc = Document::new();
        for _ in 0..count {
            let mut flags = [0u8; 1];
            self.read_exact(&mut flags)?;
            let mut len = [0u8; 2];
            self.read_exact(&mut len)?;
            let name = self.read_string(u16::from_be_bytes(len) as usize)?;
            let mut len = [0u8; 4];
            self.read_exact(&mut len)?;
            let value_len = i32::from_be_bytes(len);
            if value_len < 0 {
                return Err(IndexError::format(
                    &self.name,
                    format!("negative value length for field {}", name),
                ));
            }
            let value = self.read_string(value_len as usize)?;
            doc.push(DocField {
                name,
                value,
                flags: flags[0],
            });
        }
        Ok(Some(doc))
    }

    /// Fill `buf`, or return false on a clean end of stream before its first
    /// byte.
    fn read_or_eof(&mut self, buf: &mut [u8]) -> Result<bool> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.input.read(&mut buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(false),
                Ok(0) => {
                    return Err(IndexError::format(&self.name, "truncated record header"));
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(read_error(&self.name, e, "record header")),
            }
        }
        Ok(true)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.input
            .read_exact(buf)
            .map_err(|e| read_error(&self.name, e, "record"))
    }

    fn read_string(&mut self, len: usize) -> Result<String> {
        let mut bytes = vec![0u8; len];
        self.read_exact(&mut bytes)?;
        String::from_utf8(bytes)
            .map_err(|_| IndexError::format(&self.name, "field is not valid UTF-8"))
    }
}

impl<R: Read> Iterator for ChunkReader<R> {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_document() {
            Ok(Some(doc)) => Some(Ok(doc)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Truncated or undecodable input is a format problem; anything else is the
/// transport's.
fn read_error(name: &str, e: io::Error, what: &str) -> IndexError {
    match e.kind() {
        io::ErrorKind::UnexpectedEof => IndexError::format(name, format!("truncated {}", what)),
        io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput => {
            IndexError::format(name, format!("corrupt {}: {}", what, e))
        }
        _ => IndexError::transport(name, e),
    }
}

/// Write a whole chunk into memory.
pub fn encode_chunk<'a, I>(name: &str, timestamp: Option<i64>, docs: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = &'a Document>,
{
    let mut writer = ChunkWriter::new(name, Vec::new(), timestamp)?;
    for doc in docs {
        writer.write_document(doc)?;
    }
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Field;

    fn doc(uinfo: &str) -> Document {
        let mut d = Document::new();
        d.set(Field::Uinfo, uinfo);
        d.set(Field::Name, "name with | pipe");
        d
    }

    #[test]
    fn test_header_and_records_round_trip() {
        let docs = vec![doc("g|a|1|NA|jar"), doc("g|a|2|NA|jar")];
        let bytes = encode_chunk("t.gz", Some(1_700_000_000_000), &docs).unwrap();
        let reader = ChunkReader::open("t.gz", bytes.as_slice()).unwrap();
        assert_eq!(reader.version(), CHUNK_VERSION);
        assert_eq!(reader.timestamp(), Some(1_700_000_000_000));
        let back: Vec<Document> = reader.collect::<Result<_>>().unwrap();
        assert_eq!(back, docs);
    }

    #[test]
    fn test_empty_chunk_has_no_records() {
        let bytes = encode_chunk("e.gz", None, std::iter::empty()).unwrap();
        let mut reader = ChunkReader::open("e.gz", bytes.as_slice()).unwrap();
        assert_eq!(reader.timestamp(), None);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_index_only_fields_not_written() {
        let mut d = doc("g|a|1|NA|jar");
        d.set(Field::GroupId, "g");
        let bytes = encode_chunk("t.gz", None, [&d]).unwrap();
        let back: Vec<Document> = ChunkReader::open("t.gz", bytes.as_slice())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert!(!back[0].has(Field::GroupId));
    }

    #[test]
    fn test_bad_version_is_format_error() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&[7u8, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        let bytes = enc.finish().unwrap();
        let err = ChunkReader::open("v.gz", bytes.as_slice()).err().unwrap();
        assert_eq!(err.code(), "FORMAT_ERROR");
    }

    #[test]
    fn test_truncated_record_stops_with_format_error() {
        // Raw payload cut in the middle of the second record.
        let mut raw = vec![CHUNK_VERSION];
        raw.extend_from_slice(&(-1i64).to_be_bytes());
        raw.extend_from_slice(&1i32.to_be_bytes());
        raw.push(4);
        raw.extend_from_slice(&1u16.to_be_bytes());
        raw.extend_from_slice(b"u");
        raw.extend_from_slice(&1i32.to_be_bytes());
        raw.extend_from_slice(b"x");
        raw.extend_from_slice(&2i32.to_be_bytes());
        raw.push(4);
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&raw).unwrap();
        let bytes = enc.finish().unwrap();

        let mut reader = ChunkReader::open("t.gz", bytes.as_slice()).unwrap();
        assert!(reader.next().unwrap().is_ok());
        let err = reader.next().unwrap().unwrap_err();
        assert_eq!(err.code(), "FORMAT_ERROR");
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_records_expand_lazily() {
        let docs = vec![doc("g|a|1|NA|jar")];
        let bytes = encode_chunk("t.gz", None, &docs).unwrap();
        let records: Vec<Record> = ChunkReader::open("t.gz", bytes.as_slice())
            .unwrap()
            .records()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 1);
    }
}
