//! Storage collaborators
//!
//! The reader only needs "read N bytes at offset O"; the writer needs a
//! write+seek stream that can optionally be turned into such a source once
//! the database is finalized.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::{Error, Result};

// =============================================================================
// Random-Access Sources
// =============================================================================

/// A byte source supporting positional reads
///
/// Implementations fill `buf` completely from `offset` or fail; reading past
/// the end must fail with [`io::ErrorKind::UnexpectedEof`].
pub trait ReadAt {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()>;
}

impl ReadAt for [u8] {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        let start = usize::try_from(offset).map_err(|_| eof())?;
        let end = start.checked_add(buf.len()).ok_or_else(eof)?;
        let src = self.get(start..end).ok_or_else(eof)?;
        buf.copy_from_slice(src);
        Ok(())
    }
}

impl ReadAt for Vec<u8> {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        self.as_slice().read_exact_at(buf, offset)
    }
}

impl ReadAt for Bytes {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        self.as_ref().read_exact_at(buf, offset)
    }
}

#[cfg(unix)]
impl ReadAt for File {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        std::os::unix::fs::FileExt::read_exact_at(self, buf, offset)
    }
}

#[cfg(windows)]
impl ReadAt for File {
    fn read_exact_at(&self, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
        use std::os::windows::fs::FileExt;

        while !buf.is_empty() {
            match self.seek_read(buf, offset) {
                Ok(0) => return Err(eof()),
                Ok(n) => {
                    buf = &mut buf[n..];
                    offset += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Sources without positional reads: seek then read under a lock
impl<T: Read + Seek> ReadAt for Mutex<T> {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        let mut inner = self.lock();
        inner.seek(SeekFrom::Start(offset))?;
        inner.read_exact(buf)
    }
}

impl<T: ReadAt + ?Sized> ReadAt for &T {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        (**self).read_exact_at(buf, offset)
    }
}

impl<T: ReadAt + ?Sized> ReadAt for Arc<T> {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        (**self).read_exact_at(buf, offset)
    }
}

fn eof() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of source")
}

// =============================================================================
// Sinks
// =============================================================================

/// A write+seek destination for a database under construction
///
/// `into_source` reopens the finished bytes for random-access reads, or
/// fails with [`Error::UnsupportedStorage`] when the sink cannot be read back.
/// `sync` makes finished bytes durable; in-memory sinks keep the no-op.
pub trait Sink: Write + Seek + Sized {
    type Source: ReadAt;

    fn into_source(self) -> Result<Self::Source>;

    fn sync(&mut self) -> Result<()> {
        Ok(())
    }
}

/// EBADF: the descriptor was opened without read access
#[cfg(unix)]
const EBADF: i32 = 9;

impl Sink for File {
    type Source = File;

    /// Fails with `UnsupportedStorage` for files opened write-only,
    /// e.g. by `File::create`. The finalized header is always at offset 0.
    fn into_source(self) -> Result<File> {
        let mut first = [0u8; 1];
        match ReadAt::read_exact_at(&self, &mut first, 0) {
            Ok(()) => Ok(self),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Err(Error::UnsupportedStorage),
            #[cfg(unix)]
            Err(e) if e.raw_os_error() == Some(EBADF) => Err(Error::UnsupportedStorage),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn sync(&mut self) -> Result<()> {
        self.sync_all()?;
        Ok(())
    }
}

impl Sink for Cursor<Vec<u8>> {
    type Source = Bytes;

    fn into_source(self) -> Result<Bytes> {
        Ok(Bytes::from(self.into_inner()))
    }
}

/// Wraps a stream that can be written and seeked but never read back
#[derive(Debug)]
pub struct WriteOnly<W>(pub W);

impl<W> WriteOnly<W> {
    pub fn into_inner(self) -> W {
        self.0
    }
}

impl<W: Write> Write for WriteOnly<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<W: Seek> Seek for WriteOnly<W> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.0.seek(pos)
    }
}

impl<W: Write + Seek> Sink for WriteOnly<W> {
    type Source = Unreadable;

    fn into_source(self) -> Result<Unreadable> {
        Err(Error::UnsupportedStorage)
    }
}

/// Source type of sinks that cannot be read back; never constructed
#[derive(Debug)]
pub enum Unreadable {}

impl ReadAt for Unreadable {
    fn read_exact_at(&self, _buf: &mut [u8], _offset: u64) -> io::Result<()> {
        match *self {}
    }
}
