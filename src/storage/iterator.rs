//! Database Iterator
//!
//! Sequential scan of the data region.

use bytes::Bytes;

use crate::error::{Error, Result};

use super::record::{read_bytes, read_tuple};
use super::{ReadAt, HEADER_SIZE, TUPLE_SIZE};

/// Iterator over all records in put order
pub struct Iter<'a, R> {
    source: &'a R,
    /// Stop reading when we reach this offset (start of the tables)
    end_offset: u64,
    /// Offset of the next record
    current_offset: u64,
    /// Set after an error; the scan cannot resume past a bad record
    failed: bool,
}

impl<'a, R: ReadAt> Iter<'a, R> {
    pub(super) fn new(source: &'a R, end_offset: u64) -> Self {
        Self {
            source,
            end_offset,
            current_offset: HEADER_SIZE,
            failed: false,
        }
    }
}

impl<'a, R: ReadAt> Iterator for Iter<'a, R> {
    type Item = Result<(Bytes, Bytes)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.current_offset >= self.end_offset {
            return None;
        }

        match self.read_next() {
            Ok(record) => Some(Ok(record)),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

impl<'a, R: ReadAt> Iter<'a, R> {
    /// Decode the record at `current_offset`; it must end inside the data region
    fn read_next(&mut self) -> Result<(Bytes, Bytes)> {
        let offset = self.current_offset;
        let (key_len, value_len) = read_tuple(self.source, offset)?;

        let len = u64::from(key_len) + u64::from(value_len);
        let end = offset + TUPLE_SIZE + len;
        if end > self.end_offset {
            return Err(Error::Format(format!(
                "record at offset {} ends at {}, past the data region end {}",
                offset, end, self.end_offset
            )));
        }

        let mut key = read_bytes(self.source, offset + TUPLE_SIZE, len)?;
        let value = key.split_off(key_len as usize);
        self.current_offset = end;
        Ok((key.freeze(), value.freeze()))
    }
}

impl<'a, R: ReadAt> std::iter::FusedIterator for Iter<'a, R> {}
