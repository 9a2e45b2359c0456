//! In-place editing of a file on disk.
//!
//! [`LocalFile`] inserts, replaces and removes byte ranges without loading the
//! file into memory: the tail is streamed forward or backward through at most
//! two buffers of the configured block size.

use crate::config::EditConfig;
use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Closed,
    Read,
    Write,
}

#[derive(Debug)]
pub struct LocalFile {
    path: PathBuf,
    mode: AccessMode,
    reader: Option<File>,
    writer: Option<File>,
    position: u64,
    len: u64,
    block_size: usize,
}

impl LocalFile {
    /// Open an existing file. No stream is opened until the first access.
    pub fn open<P: AsRef<Path>>(path: P, config: &EditConfig) -> Result<Self> {
        config.validate()?;
        let path = path.as_ref().to_path_buf();
        let len = std::fs::metadata(&path)?.len();
        Ok(Self {
            path,
            mode: AccessMode::Closed,
            reader: None,
            writer: None,
            position: 0,
            len,
            block_size: config.buffer_size,
        })
    }

    /// Create (or empty) a file and open it for writing.
    pub fn create<P: AsRef<Path>>(path: P, config: &EditConfig) -> Result<Self> {
        File::create(path.as_ref())?;
        let mut f = Self::open(path, config)?;
        f.set_mode(AccessMode::Write)?;
        Ok(f)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Switch access mode, flushing and closing the stream the new mode does
    /// not use.
    pub fn set_mode(&mut self, mode: AccessMode) -> Result<()> {
        if mode == self.mode {
            return Ok(());
        }
        if let Some(mut w) = self.writer.take() {
            w.flush()?;
        }
        self.reader = None;
        match mode {
            AccessMode::Closed => {}
            AccessMode::Read => self.reader = Some(File::open(&self.path)?),
            AccessMode::Write => {
                self.writer = Some(OpenOptions::new().read(true).write(true).open(&self.path)?)
            }
        }
        tracing::trace!("{}: {:?} -> {:?}", self.path.display(), self.mode, mode);
        self.mode = mode;
        Ok(())
    }

    pub fn close(&mut self) -> Result<()> {
        self.set_mode(AccessMode::Closed)
    }

    /// The open stream, positioned at `self.position`.
    fn stream(&mut self) -> Result<&mut File> {
        let f = match self.mode {
            AccessMode::Closed => return Err(Error::not_supported("file is closed")),
            AccessMode::Read => self.reader.as_mut(),
            AccessMode::Write => self.writer.as_mut(),
        };
        let f = f.ok_or_else(|| Error::not_supported("no stream open for the current mode"))?;
        f.seek(SeekFrom::Start(self.position))?;
        Ok(f)
    }

    /// Move to `offset` bytes from the start.
    pub fn seek_to(&mut self, offset: i64) -> Result<u64> {
        if self.mode == AccessMode::Closed {
            return Err(Error::not_supported("cannot seek a closed file"));
        }
        let target = u64::try_from(offset)
            .map_err(|_| Error::invalid_argument(format!("seek to negative offset {offset}")))?;
        self.position = target;
        Ok(target)
    }

    /// Up to `n` bytes from the current position; fewer at end of file.
    pub fn read_block(&mut self, n: usize) -> Result<Vec<u8>> {
        if self.mode == AccessMode::Closed {
            self.set_mode(AccessMode::Read)?;
        }
        let mut buf = Vec::with_capacity(n.min(1 << 20));
        self.stream()?.take(n as u64).read_to_end(&mut buf)?;
        self.position += buf.len() as u64;
        Ok(buf)
    }

    /// Write at the current position, switching to write mode first.
    pub fn write_block(&mut self, bytes: &[u8]) -> Result<()> {
        self.set_mode(AccessMode::Write)?;
        self.stream()?.write_all(bytes)?;
        self.position += bytes.len() as u64;
        self.len = self.len.max(self.position);
        Ok(())
    }

    pub fn truncate(&mut self, len: u64) -> Result<()> {
        if self.mode != AccessMode::Write {
            return Err(Error::not_supported("truncate needs write mode"));
        }
        if let Some(w) = self.writer.as_mut() {
            w.set_len(len)?;
        }
        self.len = len;
        self.position = self.position.min(len);
        Ok(())
    }

    fn read_at(&mut self, offset: u64, n: usize) -> Result<Vec<u8>> {
        self.position = offset;
        self.read_block(n)
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        self.position = offset;
        self.write_block(bytes)
    }

    /// Replace `replace` bytes at `start` with `size` new bytes. `data` of
    /// `None` reserves the space without writing anything into it.
    pub fn insert_or_replace(&mut self, data: Option<&[u8]>, size: u64, start: u64, replace: u64) -> Result<()> {
        if let Some(d) = data {
            if d.len() as u64 != size {
                return Err(Error::invalid_argument(format!(
                    "size {size} does not match {} bytes of data",
                    d.len()
                )));
            }
        }
        let end = start
            .checked_add(replace)
            .filter(|e| *e <= self.len)
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "range {start}+{replace} is outside a {} byte file",
                    self.len
                ))
            })?;

        if size == replace {
            tracing::debug!("overwrite {size} bytes at {start}");
            if let Some(d) = data {
                self.write_at(start, d)?;
            }
        } else if size < replace {
            tracing::debug!("shrink {replace} -> {size} bytes at {start}");
            if let Some(d) = data {
                self.write_at(start, d)?;
            }
            self.remove(start + size, replace - size)?;
        } else {
            self.grow(data, size, start, end)?;
        }
        Ok(())
    }

    pub fn insert(&mut self, data: &[u8], start: u64) -> Result<()> {
        self.insert_or_replace(Some(data), data.len() as u64, start, 0)
    }

    /// Shift everything from `end` forward so the span at `start` can hold
    /// `size` bytes.
    fn grow(&mut self, data: Option<&[u8]>, size: u64, start: u64, end: u64) -> Result<()> {
        let old_len = self.len;
        let shift = size - (end - start);
        let block = self.block_size as u64;
        let buf_len = shift.div_ceil(block) * block;
        let buf_len = usize::try_from(buf_len)
            .map_err(|_| Error::not_supported(format!("cannot buffer a {shift} byte shift")))?;
        tracing::debug!("grow by {shift} bytes at {start} with {buf_len} byte buffers");

        let mut read_pos = end;
        let mut current = self.read_at(read_pos, buf_len)?;
        read_pos += current.len() as u64;

        if let Some(d) = data {
            self.write_at(start, d)?;
        }

        let mut write_pos = end + shift;
        while !current.is_empty() {
            let next = if current.len() == buf_len {
                self.read_at(read_pos, buf_len)?
            } else {
                Vec::new()
            };
            read_pos += next.len() as u64;
            self.write_at(write_pos, &current)?;
            write_pos += current.len() as u64;
            current = next;
        }

        if self.len < old_len + shift {
            // nothing followed the span and no data was supplied
            self.set_mode(AccessMode::Write)?;
            self.truncate(old_len + shift)?;
        }
        Ok(())
    }

    /// Delete `length` bytes at `start`, moving the tail back.
    pub fn remove(&mut self, start: u64, length: u64) -> Result<()> {
        if length == 0 {
            return Ok(());
        }
        let old_len = self.len;
        let tail_start = start
            .checked_add(length)
            .filter(|e| *e <= old_len)
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "cannot remove {length} bytes at {start} from a {old_len} byte file"
                ))
            })?;
        tracing::debug!("remove {length} bytes at {start}");

        let mut read_pos = tail_start;
        let mut write_pos = start;
        loop {
            let chunk = self.read_at(read_pos, self.block_size)?;
            if chunk.is_empty() {
                break;
            }
            read_pos += chunk.len() as u64;
            self.write_at(write_pos, &chunk)?;
            write_pos += chunk.len() as u64;
        }
        self.set_mode(AccessMode::Write)?;
        self.truncate(old_len - length)
    }
}

impl Drop for LocalFile {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("closing {}: {e}", self.path.display());
        }
    }
}

fn to_io(e: Error) -> io::Error {
    match e {
        Error::Io(io) => io,
        Error::InvalidArgument(m) => io::Error::new(io::ErrorKind::InvalidInput, m),
        Error::NotSupported(m) => io::Error::new(io::ErrorKind::Unsupported, m),
        other => io::Error::other(other),
    }
}

impl Read for LocalFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.mode == AccessMode::Closed {
            self.set_mode(AccessMode::Read).map_err(to_io)?;
        }
        let n = self.stream().map_err(to_io)?.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl Write for LocalFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_block(buf).map_err(to_io)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

/// Like `Read`, seeking a closed file opens it for reading first, so a
/// `LocalFile` can be handed straight to the box parser.
impl Seek for LocalFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        if self.mode == AccessMode::Closed {
            self.set_mode(AccessMode::Read).map_err(to_io)?;
        }
        let target = match pos {
            SeekFrom::Start(p) => i64::try_from(p).unwrap_or(i64::MAX),
            SeekFrom::End(d) => (self.len as i64).saturating_add(d),
            SeekFrom::Current(d) => (self.position as i64).saturating_add(d),
        };
        self.seek_to(target).map_err(to_io)
    }
}
