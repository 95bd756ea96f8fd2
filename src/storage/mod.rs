//! Storage Module
//!
//! Immutable on-disk hash table: written once by [`Writer`], then served by
//! [`Reader`] with O(1) point lookups and no in-memory index beyond the
//! fixed header.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (2048 bytes)                                     │
//! │   256 x [TableOffset: u32][TableLength: u32]            │
//! ├─────────────────────────────────────────────────────────┤
//! │ Data Region (variable)                                  │
//! │   [KeyLen: u32][ValLen: u32][Key][Value]                │
//! │   ... repeated for each put, in put order ...           │
//! ├─────────────────────────────────────────────────────────┤
//! │ Tables (variable)                                       │
//! │   bucket 0: [Hash: u32][RecordOffset: u32] x length     │
//! │   bucket 1: ...                                         │
//! │   ... through bucket 255 ...                            │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. A key lives in bucket `hash & 0xFF`; its
//! probe starts at slot `(hash >> 8) % length` of that bucket's table.
//! Tables hold exactly as many slots as entries, so there are no empty slots
//! to end a probe: a lookup gives up after one full cycle.

mod index;
mod iterator;
mod reader;
mod record;
mod source;
mod writer;

pub use index::{Bucket, Index};
pub use iterator::Iter;
pub use reader::Reader;
pub use record::{read_record, write_record};
pub use source::{ReadAt, Sink, Unreadable, WriteOnly};
pub use writer::Writer;

// =============================================================================
// Shared Constants (used by writer, reader, iterator)
// =============================================================================

/// Number of buckets, selected by the low byte of a key's hash
pub const BUCKET_COUNT: usize = 256;

/// Size of every on-disk u32 pair: bucket descriptor, length prefix, slot
pub const TUPLE_SIZE: u64 = 8;

/// Header size: 256 buckets x 8 bytes = 2048 bytes
pub const HEADER_SIZE: u64 = BUCKET_COUNT as u64 * TUPLE_SIZE;

/// Largest offset representable on disk
pub const MAX_OFFSET: u32 = u32::MAX;

/// Split a u32 pair into its two halves
pub(crate) fn decode_tuple(buf: &[u8; TUPLE_SIZE as usize]) -> (u32, u32) {
    let first = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let second = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    (first, second)
}

/// Pack two u32 values as one on-disk pair
pub(crate) fn encode_tuple(first: u32, second: u32) -> [u8; TUPLE_SIZE as usize] {
    let mut buf = [0u8; TUPLE_SIZE as usize];
    buf[..4].copy_from_slice(&first.to_le_bytes());
    buf[4..].copy_from_slice(&second.to_le_bytes());
    buf
}
