//! Position-tracking little-endian streams.
//!
//! [`OStream`] is the write side used by the encoder; it supports the
//! seek-and-rewrite needed to patch the header once the string table offset
//! is known. [`IStream`] is the read side used by the decoder; it supports
//! relative seeks so a block header can be peeked and un-consumed.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::util::{Error, Result};

/// Output stream for writing script binaries.
pub struct OStream<W: Write + Seek> {
    writer: W,
    pos: u64,
}

impl OStream<BufWriter<File>> {
    /// Create (or truncate) a file for writing.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Self::new(BufWriter::with_capacity(64 * 1024, file))
    }
}

impl<W: Write + Seek> OStream<W> {
    /// Wrap a writer, starting at its current position.
    pub fn new(mut writer: W) -> Result<Self> {
        let pos = writer.stream_position()?;
        Ok(Self { writer, pos })
    }

    /// Get the current write position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Write bytes and advance position.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    /// Write a u64 value (little-endian).
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(value)?;
        self.pos += 8;
        Ok(())
    }

    /// Write a u32 value (little-endian).
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.writer.write_u32::<LittleEndian>(value)?;
        self.pos += 4;
        Ok(())
    }

    /// Write a u8 value.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.writer.write_u8(value)?;
        self.pos += 1;
        Ok(())
    }

    /// Write a bool as a single byte.
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(u8::from(value))
    }

    /// Seek to an absolute position and return it.
    pub fn seek(&mut self, pos: u64) -> Result<u64> {
        self.writer.flush()?;
        let new_pos = self.writer.seek(SeekFrom::Start(pos))?;
        self.pos = new_pos;
        Ok(new_pos)
    }

    /// Seek to end and return the position.
    pub fn seek_end(&mut self) -> Result<u64> {
        self.writer.flush()?;
        let new_pos = self.writer.seek(SeekFrom::End(0))?;
        self.pos = new_pos;
        Ok(new_pos)
    }

    /// Flush buffered data to the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Input stream for reading script binaries.
pub struct IStream<R: Read + Seek> {
    reader: R,
    pos: u64,
}

impl<R: Read + Seek> IStream<R> {
    /// Wrap a reader, starting at its current position.
    pub fn new(mut reader: R) -> Result<Self> {
        let pos = reader.stream_position()?;
        Ok(Self { reader, pos })
    }

    /// Get the current read position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Read a u8 value.
    pub fn read_u8(&mut self) -> Result<u8> {
        let v = self.reader.read_u8().map_err(|e| self.io_error(e))?;
        self.pos += 1;
        Ok(v)
    }

    /// Read a bool stored as a single byte.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Read a u32 value (little-endian).
    pub fn read_u32(&mut self) -> Result<u32> {
        let v = self
            .reader
            .read_u32::<LittleEndian>()
            .map_err(|e| self.io_error(e))?;
        self.pos += 4;
        Ok(v)
    }

    /// Read a u64 value (little-endian).
    pub fn read_u64(&mut self) -> Result<u64> {
        let v = self
            .reader
            .read_u64::<LittleEndian>()
            .map_err(|e| self.io_error(e))?;
        self.pos += 8;
        Ok(v)
    }

    /// Read exactly `len` bytes.
    ///
    /// The buffer grows with the data actually read, so a corrupt length
    /// cannot force a huge allocation up front.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let result = (&mut self.reader).take(len as u64).read_to_end(&mut buf);
        let read = result.map_err(|e| self.io_error(e))?;
        self.pos += read as u64;
        if read < len {
            return Err(Error::UnexpectedEof(self.pos));
        }
        Ok(buf)
    }

    /// Seek to an absolute position and return it.
    pub fn seek(&mut self, pos: u64) -> Result<u64> {
        let new_pos = self.reader.seek(SeekFrom::Start(pos))?;
        self.pos = new_pos;
        Ok(new_pos)
    }

    /// Move the read position by `delta` bytes.
    pub fn skip(&mut self, delta: i64) -> Result<u64> {
        let new_pos = self.reader.seek(SeekFrom::Current(delta))?;
        self.pos = new_pos;
        Ok(new_pos)
    }

    fn io_error(&self, e: std::io::Error) -> Error {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEof(self.pos)
        } else {
            Error::Io(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_write_then_patch() -> Result<()> {
        let mut out = OStream::new(Cursor::new(Vec::new()))?;
        out.write_u32(0)?;
        out.write_u8(7)?;
        assert_eq!(out.pos(), 5);
        out.seek(0)?;
        out.write_u32(0xAABBCCDD)?;
        out.seek_end()?;
        assert_eq!(out.pos(), 5);
        let bytes = out.into_inner().into_inner();
        assert_eq!(bytes, vec![0xDD, 0xCC, 0xBB, 0xAA, 7]);
        Ok(())
    }

    #[test]
    fn test_read_and_skip_back() -> Result<()> {
        let mut input = IStream::new(Cursor::new(vec![1u8, 2, 0, 0, 0]))?;
        assert_eq!(input.read_u8()?, 1);
        input.skip(-1)?;
        assert_eq!(input.read_u8()?, 1);
        assert_eq!(input.read_u32()?, 2);
        assert_eq!(input.pos(), 5);
        Ok(())
    }

    #[test]
    fn test_short_read_reports_position() {
        let mut input = IStream::new(Cursor::new(vec![1u8, 2, 3])).unwrap();
        input.read_u8().unwrap();
        let err = input.read_bytes(10).unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof(3)));
    }
}
