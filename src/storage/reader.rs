//! Database Reader
//!
//! Opens a finalized database and resolves point lookups by bucket
//! selection plus a linear probe of the bucket's table.

use std::fs::File;
use std::io;
use std::path::Path;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::hash::hash;

use super::iterator::Iter;
use super::record::{read_bytes, read_tuple};
use super::{Index, ReadAt, HEADER_SIZE, TUPLE_SIZE};

/// Read-only handle on a finalized database
///
/// Lookups take `&self` and only issue positional reads, so a reader can be
/// shared between threads whenever its source can.
#[derive(Debug)]
pub struct Reader<R> {
    /// Underlying storage; `None` once closed
    source: Option<R>,
    /// Header loaded at open
    index: Index,
}

impl Reader<File> {
    /// Open the database file at `path`
    pub fn open(path: &Path) -> Result<Self> {
        Self::new(File::open(path)?)
    }
}

impl<R: ReadAt> Reader<R> {
    /// Load the header from `source`
    ///
    /// Fails with `Format` if the source is shorter than the 2048-byte header.
    pub fn new(source: R) -> Result<Self> {
        let mut header = vec![0u8; HEADER_SIZE as usize];
        source.read_exact_at(&mut header, 0).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => {
                Error::Format(format!("source shorter than the {}-byte header", HEADER_SIZE))
            }
            _ => Error::Io(e),
        })?;

        let index = Index::decode(&header)?;
        tracing::debug!("Opened database with {} records", index.record_count());

        Ok(Self::with_index(source, index))
    }

    /// Wrap a source whose header is already known
    pub(crate) fn with_index(source: R, index: Index) -> Self {
        Self {
            source: Some(source),
            index,
        }
    }

    /// Look up the value stored for `key`
    ///
    /// Returns `Ok(None)` when the key is absent.
    pub fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        let source = self.source()?;
        let h = hash(key);

        let bucket = self.index.bucket_for(h);
        if bucket.is_empty() {
            return Ok(None);
        }

        let start = (h >> 8) % bucket.length;
        tracing::trace!(
            "Probing bucket {} ({} slots) from slot {}",
            h & 0xFF,
            bucket.length,
            start
        );

        // Tables have no empty slots: stop after one full cycle.
        let mut slot = start;
        loop {
            let slot_offset = u64::from(bucket.offset) + TUPLE_SIZE * u64::from(slot);
            let (slot_hash, record_offset) = read_tuple(source, slot_offset)?;

            if slot_hash == h {
                if let Some(value) = Self::value_at(source, u64::from(record_offset), key)? {
                    return Ok(Some(value));
                }
            }

            slot = (slot + 1) % bucket.length;
            if slot == start {
                return Ok(None);
            }
        }
    }

    /// Value of the record at `offset` if its key equals `key`
    fn value_at(source: &R, offset: u64, key: &[u8]) -> Result<Option<Bytes>> {
        let (key_len, value_len) = read_tuple(source, offset)?;

        // Length mismatch rules the record out without reading the key
        if key_len as usize != key.len() {
            return Ok(None);
        }

        let len = u64::from(key_len) + u64::from(value_len);
        let mut stored = read_bytes(source, offset + TUPLE_SIZE, len)?;
        let value = stored.split_off(key_len as usize);
        if &stored[..] != key {
            return Ok(None);
        }

        Ok(Some(value.freeze()))
    }

    /// Iterate over every record in put order
    pub fn iter(&self) -> Result<Iter<'_, R>> {
        Ok(Iter::new(self.source()?, self.index.data_end()))
    }

    /// Visit every record in put order, stopping at the first error
    ///
    /// Errors from decoding and from `visit` are returned as-is.
    pub fn each<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]) -> Result<()>,
    {
        for record in self.iter()? {
            let (key, value) = record?;
            visit(&key, &value)?;
        }
        Ok(())
    }

    /// The header loaded at open
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Number of records in the database
    pub fn len(&self) -> u64 {
        self.index.record_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn source(&self) -> Result<&R> {
        self.source.as_ref().ok_or(Error::Closed)
    }
}

impl<R> Reader<R> {
    /// Release the underlying storage; closing twice is a no-op
    pub fn close(&mut self) {
        if self.source.take().is_some() {
            tracing::debug!("Closed database reader");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    /// Take back the underlying storage, if still open
    pub fn into_inner(self) -> Option<R> {
        self.source
    }
}
