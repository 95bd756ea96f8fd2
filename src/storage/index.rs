//! Index
//!
//! The fixed 256-bucket header at offset 0.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Error, Result};

use super::{BUCKET_COUNT, HEADER_SIZE};

/// Location of one bucket's table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bucket {
    /// Absolute offset of the table (meaningful only when `length > 0`)
    pub offset: u32,
    /// Number of entries in the table
    pub length: u32,
}

impl Bucket {
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// The 256 bucket descriptors, in bucket order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    buckets: [Bucket; BUCKET_COUNT],
}

impl Default for Index {
    fn default() -> Self {
        Self {
            buckets: [Bucket::default(); BUCKET_COUNT],
        }
    }
}

impl Index {
    /// Bucket responsible for a key hash
    pub fn bucket_for(&self, hash: u32) -> Bucket {
        self.buckets[(hash & 0xFF) as usize]
    }

    pub fn bucket(&self, i: u8) -> Bucket {
        self.buckets[i as usize]
    }

    pub(crate) fn set(&mut self, i: usize, bucket: Bucket) {
        self.buckets[i] = bucket;
    }

    pub fn buckets(&self) -> &[Bucket; BUCKET_COUNT] {
        &self.buckets
    }

    /// Total number of records across all buckets
    pub fn record_count(&self) -> u64 {
        self.buckets.iter().map(|b| u64::from(b.length)).sum()
    }

    /// End of the data region: the lowest table offset among non-empty
    /// buckets, or the header end when the database holds no records.
    pub fn data_end(&self) -> u64 {
        self.buckets
            .iter()
            .filter(|b| !b.is_empty())
            .map(|b| u64::from(b.offset))
            .min()
            .unwrap_or(HEADER_SIZE)
    }

    /// Parse the header; needs at least 2048 bytes
    pub fn decode(mut buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE as usize {
            return Err(Error::Format(format!(
                "header requires {} bytes, got {}",
                HEADER_SIZE,
                buf.len()
            )));
        }

        let mut index = Index::default();
        for bucket in index.buckets.iter_mut() {
            bucket.offset = buf.get_u32_le();
            bucket.length = buf.get_u32_le();
        }
        Ok(index)
    }

    /// Serialize to exactly 2048 bytes
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE as usize);
        for bucket in &self.buckets {
            buf.put_u32_le(bucket.offset);
            buf.put_u32_le(bucket.length);
        }
        buf
    }
}
