//! Record Codec
//!
//! A record is `[key_len: u32][value_len: u32][key][value]` with no padding.

use std::io::{self, Write};

use bytes::{Bytes, BytesMut};

use crate::error::{Error, Result};

use super::{decode_tuple, encode_tuple, ReadAt, MAX_OFFSET, TUPLE_SIZE};

/// Read the record stored at `offset`, returning `(key, value)`
pub fn read_record<R: ReadAt + ?Sized>(source: &R, offset: u64) -> Result<(Bytes, Bytes)> {
    let (key_len, value_len) = read_tuple(source, offset)?;
    let len = u64::from(key_len) + u64::from(value_len);
    let mut key = read_bytes(source, offset + TUPLE_SIZE, len)?;
    let value = key.split_off(key_len as usize);
    Ok((key.freeze(), value.freeze()))
}

/// Append one record to `sink`, returning the number of bytes written
pub fn write_record<W: Write + ?Sized>(sink: &mut W, key: &[u8], value: &[u8]) -> Result<u64> {
    let key_len = length_prefix(key)?;
    let value_len = length_prefix(value)?;

    sink.write_all(&encode_tuple(key_len, value_len))?;
    sink.write_all(key)?;
    sink.write_all(value)?;

    Ok(record_size(key, value))
}

/// On-disk size of a record
pub(crate) fn record_size(key: &[u8], value: &[u8]) -> u64 {
    TUPLE_SIZE + key.len() as u64 + value.len() as u64
}

fn length_prefix(bytes: &[u8]) -> Result<u32> {
    u32::try_from(bytes.len()).map_err(|_| Error::CapacityExceeded {
        attempted: bytes.len() as u64,
        limit: u64::from(u32::MAX),
    })
}

/// Read one u32 pair at `offset`
pub(crate) fn read_tuple<R: ReadAt + ?Sized>(source: &R, offset: u64) -> Result<(u32, u32)> {
    let mut buf = [0u8; TUPLE_SIZE as usize];
    fill(source, &mut buf, offset)?;
    Ok(decode_tuple(&buf))
}

/// Largest single read; longer ranges grow the buffer chunk by chunk
const READ_CHUNK: u64 = 64 * 1024;

/// Read `len` bytes at `offset`
///
/// Ranges reaching past the 4 GiB ceiling cannot exist in a valid file and
/// are rejected up front. Otherwise the buffer only grows as data actually
/// arrives, so a corrupt length costs at most one chunk past the real end.
pub(crate) fn read_bytes<R: ReadAt + ?Sized>(source: &R, offset: u64, len: u64) -> Result<BytesMut> {
    if offset + len > u64::from(MAX_OFFSET) {
        return Err(Error::Format(format!(
            "{} bytes at offset {} extend past the maximum file size",
            len, offset
        )));
    }

    let mut buf = BytesMut::with_capacity(len.min(READ_CHUNK) as usize);
    let mut done = 0u64;
    while done < len {
        let n = (len - done).min(READ_CHUNK) as usize;
        let start = buf.len();
        buf.resize(start + n, 0);
        fill(source, &mut buf[start..], offset + done).map_err(|e| match e {
            Error::Truncated { .. } => Error::Truncated { offset, needed: len },
            e => e,
        })?;
        done += n as u64;
    }
    Ok(buf)
}

/// Positional read with short reads reported as truncation
fn fill<R: ReadAt + ?Sized>(source: &R, buf: &mut [u8], offset: u64) -> Result<()> {
    source.read_exact_at(buf, offset).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::Truncated {
            offset,
            needed: buf.len() as u64,
        },
        _ => Error::Io(e),
    })
}
