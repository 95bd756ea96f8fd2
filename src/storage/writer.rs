//! Database Writer
//!
//! Streams records into the data region, then writes the bucket tables and
//! the completed header once every key is known.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::hash::hash;

use super::record::{record_size, write_record};
use super::{encode_tuple, Bucket, Index, Reader, Sink, BUCKET_COUNT, HEADER_SIZE, TUPLE_SIZE};

/// A table slot waiting to be written at finalize
#[derive(Debug, Clone, Copy)]
struct PendingEntry {
    hash: u32,
    offset: u32,
}

#[derive(Debug)]
enum State {
    /// Accepting puts
    Open,
    /// Tables and header written
    Finalized(Index),
    /// A write failed or the size limit was hit; nothing more is written
    Poisoned,
}

/// Builds a database record by record
///
/// The output is not a valid database until [`finalize`](Self::finalize),
/// [`close`](Self::close) or [`freeze`](Self::freeze) runs. Dropping an
/// open writer finalizes it implicitly; finalize only ever runs once.
pub struct Writer<W: Write + Seek> {
    /// Buffered sink; taken out by close/freeze
    sink: Option<BufWriter<W>>,
    /// Per-bucket slots, in put order
    pending: Vec<Vec<PendingEntry>>,
    /// Offset the next byte will land at
    position: u64,
    /// Highest offset the file may reach
    limit: u64,
    /// Number of records put
    record_count: u64,
    state: State,
}

impl Writer<File> {
    /// Create (or truncate) a database file at `path`
    ///
    /// The file is opened read-write so it can be frozen into a reader.
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Self::new(file)
    }
}

impl<W: Write + Seek> Writer<W> {
    /// Start a database on `sink` with the default config
    pub fn new(sink: W) -> Result<Self> {
        Self::with_config(sink, Config::default())
    }

    /// Start a database on `sink`
    ///
    /// Reserves the header by writing 2048 zero bytes at offset 0.
    pub fn with_config(mut sink: W, config: Config) -> Result<Self> {
        let limit = u64::from(config.size_limit);
        if HEADER_SIZE > limit {
            return Err(Error::CapacityExceeded {
                attempted: HEADER_SIZE,
                limit,
            });
        }

        sink.seek(SeekFrom::Start(0))?;
        sink.write_all(&[0u8; HEADER_SIZE as usize])?;

        tracing::debug!("Created database writer (size limit {} bytes)", limit);

        Ok(Self {
            sink: Some(BufWriter::with_capacity(config.buffer_capacity, sink)),
            pending: vec![Vec::new(); BUCKET_COUNT],
            position: HEADER_SIZE,
            limit,
            record_count: 0,
            state: State::Open,
        })
    }

    /// Append a key-value pair
    ///
    /// Fails with `CapacityExceeded` before writing anything if the record
    /// would carry the file past its size limit; the writer is unusable
    /// afterwards.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        match self.state {
            State::Open => {}
            State::Finalized(_) => return Err(Error::Finalized),
            State::Poisoned => return Err(Error::Poisoned),
        }

        let result = self.append(key, value);
        if result.is_err() {
            self.state = State::Poisoned;
        }
        result
    }

    fn append(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let end = self.position + record_size(key, value);
        if end > self.limit {
            return Err(Error::CapacityExceeded {
                attempted: end,
                limit: self.limit,
            });
        }

        let sink = self.sink.as_mut().ok_or(Error::Poisoned)?;
        write_record(sink, key, value)?;

        let h = hash(key);
        self.pending[(h & 0xFF) as usize].push(PendingEntry {
            hash: h,
            // end <= limit <= u32::MAX
            offset: self.position as u32,
        });
        self.position = end;
        self.record_count += 1;

        Ok(())
    }

    /// Write the bucket tables and the header, returning the final index
    ///
    /// Idempotent: later calls return the same index without writing.
    pub fn finalize(&mut self) -> Result<Index> {
        match &self.state {
            State::Open => {}
            State::Finalized(index) => return Ok(index.clone()),
            State::Poisoned => return Err(Error::Poisoned),
        }

        match self.write_tables() {
            Ok(index) => {
                tracing::debug!(
                    "Finalized database: {} records, {} bytes",
                    self.record_count,
                    self.position
                );
                self.state = State::Finalized(index.clone());
                Ok(index)
            }
            Err(e) => {
                self.state = State::Poisoned;
                Err(e)
            }
        }
    }

    fn write_tables(&mut self) -> Result<Index> {
        let sink = self.sink.as_mut().ok_or(Error::Poisoned)?;
        let pending = std::mem::take(&mut self.pending);
        let mut index = Index::default();

        for (i, entries) in pending.iter().enumerate() {
            let end = self.position + TUPLE_SIZE * entries.len() as u64;
            if end > self.limit {
                return Err(Error::CapacityExceeded {
                    attempted: end,
                    limit: self.limit,
                });
            }

            index.set(
                i,
                Bucket {
                    offset: self.position as u32,
                    length: entries.len() as u32,
                },
            );

            for entry in entries {
                sink.write_all(&encode_tuple(entry.hash, entry.offset))?;
            }
            self.position = end;
        }

        sink.flush()?;

        let inner = sink.get_mut();
        inner.seek(SeekFrom::Start(0))?;
        inner.write_all(&index.encode())?;
        inner.flush()?;

        Ok(index)
    }

    /// Number of records put so far
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// Bytes written so far, header included
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.state, State::Finalized(_))
    }

    fn take_sink(&mut self) -> Result<W> {
        let sink = self.sink.take().ok_or(Error::Poisoned)?;
        sink.into_inner().map_err(|e| Error::Io(e.into_error()))
    }
}

impl<W: Sink> Writer<W> {
    /// Finalize, sync, then release the sink
    pub fn close(mut self) -> Result<Index> {
        let index = self.finalize()?;
        self.take_sink()?.sync()?;
        Ok(index)
    }

    /// Finalize, sync, then reopen the same storage for reads
    ///
    /// Fails with `UnsupportedStorage` if the sink cannot be read back.
    pub fn freeze(mut self) -> Result<Reader<W::Source>> {
        let index = self.finalize()?;
        let mut sink = self.take_sink()?;
        sink.sync()?;
        let source = sink.into_source()?;
        Ok(Reader::with_index(source, index))
    }
}

impl<W: Write + Seek> Drop for Writer<W> {
    fn drop(&mut self) {
        if matches!(self.state, State::Open) {
            if let Err(e) = self.finalize() {
                tracing::warn!("Implicit finalize on drop failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn written(writer: &Writer<Cursor<Vec<u8>>>) -> usize {
        writer.sink.as_ref().unwrap().get_ref().get_ref().len()
    }

    #[test]
    fn test_new_reserves_header() {
        let writer = Writer::new(Cursor::new(Vec::new())).unwrap();
        assert_eq!(writer.position(), HEADER_SIZE);
        assert_eq!(written(&writer), HEADER_SIZE as usize);
    }

    #[test]
    fn test_put_tracks_position() {
        let mut writer = Writer::new(Cursor::new(Vec::new())).unwrap();
        writer.put(b"abc", b"defgh").unwrap();
        writer.put(b"", b"").unwrap();

        assert_eq!(writer.position(), HEADER_SIZE + 16 + 8);
        assert_eq!(writer.record_count(), 2);

        let slots: usize = writer.pending.iter().map(Vec::len).sum();
        assert_eq!(slots, 2);
        let bucket = &writer.pending[(hash(b"abc") & 0xFF) as usize];
        assert_eq!(bucket[0].offset, HEADER_SIZE as u32);
    }

    #[test]
    fn test_put_past_ceiling_writes_nothing() {
        let mut writer = Writer::new(Cursor::new(Vec::new())).unwrap();
        writer.position = u64::from(u32::MAX) - 10;

        let err = writer.put(b"k", b"0123456789").unwrap_err();
        match err {
            Error::CapacityExceeded { attempted, limit } => {
                assert_eq!(attempted, u64::from(u32::MAX) + 9);
                assert_eq!(limit, u64::from(u32::MAX));
            }
            other => panic!("expected CapacityExceeded, got {:?}", other),
        }

        writer.sink.as_mut().unwrap().flush().unwrap();
        assert_eq!(written(&writer), HEADER_SIZE as usize);
        assert!(matches!(writer.put(b"a", b"b"), Err(Error::Poisoned)));
        assert!(matches!(writer.finalize(), Err(Error::Poisoned)));
    }

    #[test]
    fn test_put_reaching_ceiling_exactly() {
        let mut writer = Writer::new(Cursor::new(Vec::new())).unwrap();
        writer.position = u64::from(u32::MAX) - 10;

        writer.put(b"k", b"v").unwrap();
        assert_eq!(writer.position(), u64::from(u32::MAX));
        assert_eq!(
            writer.pending[(hash(b"k") & 0xFF) as usize][0].offset,
            u32::MAX - 10
        );
        assert!(matches!(
            writer.put(b"", b""),
            Err(Error::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn test_tables_past_ceiling() {
        let mut writer = Writer::new(Cursor::new(Vec::new())).unwrap();
        writer.put(b"key", b"value").unwrap();
        writer.position = u64::from(u32::MAX) - 4;

        assert!(matches!(
            writer.finalize(),
            Err(Error::CapacityExceeded { .. })
        ));
        assert!(!writer.is_finalized());
        assert!(matches!(writer.finalize(), Err(Error::Poisoned)));
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut writer = Writer::new(Cursor::new(Vec::new())).unwrap();
        writer.put(b"foo", b"bar").unwrap();

        let first = writer.finalize().unwrap();
        let size = written(&writer);
        let second = writer.finalize().unwrap();

        assert_eq!(first, second);
        assert_eq!(written(&writer), size);
        assert_eq!(size as u64, HEADER_SIZE + 14 + 8);
    }

    #[test]
    fn test_put_after_finalize_rejected() {
        let mut writer = Writer::new(Cursor::new(Vec::new())).unwrap();
        writer.finalize().unwrap();
        assert!(matches!(writer.put(b"late", b"x"), Err(Error::Finalized)));
    }

    /// In-memory sink that counts sync calls
    struct CountingSink {
        inner: Cursor<Vec<u8>>,
        syncs: std::rc::Rc<std::cell::Cell<usize>>,
    }

    impl Write for CountingSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.inner.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.inner.flush()
        }
    }

    impl Seek for CountingSink {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    impl Sink for CountingSink {
        type Source = Vec<u8>;

        fn into_source(self) -> Result<Vec<u8>> {
            Ok(self.inner.into_inner())
        }

        fn sync(&mut self) -> Result<()> {
            self.syncs.set(self.syncs.get() + 1);
            Ok(())
        }
    }

    fn counting_sink() -> (CountingSink, std::rc::Rc<std::cell::Cell<usize>>) {
        let syncs = std::rc::Rc::new(std::cell::Cell::new(0));
        let sink = CountingSink {
            inner: Cursor::new(Vec::new()),
            syncs: syncs.clone(),
        };
        (sink, syncs)
    }

    #[test]
    fn test_close_syncs_sink() {
        let (sink, syncs) = counting_sink();
        let mut writer = Writer::new(sink).unwrap();
        writer.put(b"foo", b"bar").unwrap();
        writer.finalize().unwrap();
        assert_eq!(syncs.get(), 0);

        writer.close().unwrap();
        assert_eq!(syncs.get(), 1);
    }

    #[test]
    fn test_freeze_syncs_sink() {
        let (sink, syncs) = counting_sink();
        let mut writer = Writer::new(sink).unwrap();
        writer.put(b"foo", b"bar").unwrap();

        let reader = writer.freeze().unwrap();
        assert_eq!(syncs.get(), 1);
        assert_eq!(reader.get(b"foo").unwrap().unwrap(), &b"bar"[..]);
    }

    #[test]
    fn test_limit_below_header() {
        let config = Config::builder().size_limit(100).build();
        let result = Writer::with_config(Cursor::new(Vec::new()), config);
        assert!(matches!(result, Err(Error::CapacityExceeded { .. })));
    }
}
