//! Byte level readers.
//!
//! [WordReader] extracts big-endian 32 and 64-bit fields from a packet buffer and
//! [Bytes] provides peek-and-push access to a byte stream so a packet's size word can
//! be inspected before the packet is read.
use std::io::{self, ErrorKind};

use crate::{Error, Result};

/// Number of bytes in a VITA 49 word.
pub const WORD_LEN: usize = 4;

/// Cursor over a packet buffer that reads fixed width big-endian fields.
///
/// Reads never panic; when fewer bytes remain than requested the read fails with
/// [Error::NotEnoughData] and the cursor does not move.
#[derive(Debug, Clone)]
pub struct WordReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WordReader<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        WordReader { buf, pos: 0 }
    }

    /// Number of bytes consumed so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Read exactly `len` raw bytes.
    ///
    /// # Errors
    /// [Error::NotEnoughData] if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::NotEnoughData {
                actual: self.remaining(),
                minimum: len,
            });
        }
        let dat = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(dat)
    }

    /// Advance past `len` bytes without looking at them.
    ///
    /// # Errors
    /// [Error::NotEnoughData] if fewer than `len` bytes remain.
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Read a 32-bit big-endian word.
    ///
    /// # Errors
    /// [Error::NotEnoughData] if fewer than 4 bytes remain.
    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a 64-bit big-endian double word.
    ///
    /// # Errors
    /// [Error::NotEnoughData] if fewer than 8 bytes remain.
    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.read_bytes(8)?;
        Ok(u64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Look at the 32-bit word `words` words past the cursor without consuming it.
    ///
    /// # Errors
    /// [Error::NotEnoughData] if the word is past the end of the buffer.
    pub fn peek_u32(&self, words: usize) -> Result<u32> {
        let mut peek = self.clone();
        peek.skip(words * WORD_LEN)?;
        peek.read_u32()
    }
}

/// Peek-and-push reader. Bytes pushed back are produced again, in the same order,
/// before any more bytes are read from the underlying reader.
pub struct Bytes<R>
where
    R: io::Read,
{
    reader: R,
    num_read: usize,
    cache: Vec<u8>,
}

impl<R> Bytes<R>
where
    R: io::Read,
{
    pub fn new(reader: R) -> Self {
        Bytes {
            reader,
            num_read: 0,
            cache: Vec::new(),
        }
    }

    /// Fill `buf` completely, first from pushed back bytes, then from the reader.
    ///
    /// Returns `Ok(false)` if the stream ended before `buf` could be filled. Any bytes
    /// that were read in that case are kept so the offset stays consistent.
    ///
    /// # Errors
    /// Any non-EOF ``std::io::Error`` from the reader.
    pub fn fill(&mut self, buf: &mut [u8]) -> io::Result<bool> {
        let cached = self.cache.len().min(buf.len());
        buf[..cached].copy_from_slice(&self.cache[..cached]);
        self.cache.drain(..cached);
        if cached == buf.len() {
            return Ok(true);
        }

        let mut filled = cached;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => {
                    filled += n;
                    self.num_read += n;
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
        if filled < buf.len() {
            // Keep what we got so a caller can still see the partial data.
            self.push(&buf[..filled]);
            return Ok(false);
        }
        Ok(true)
    }

    /// Push bytes back so they are produced by the next [Bytes::fill].
    pub fn push(&mut self, dat: &[u8]) {
        let mut cache = dat.to_vec();
        cache.extend_from_slice(&self.cache);
        self.cache = cache;
    }

    /// Logical stream offset, i.e., bytes read minus bytes pushed back.
    pub fn offset(&self) -> usize {
        self.num_read - self.cache.len()
    }

    /// Number of pushed back bytes not yet produced again. After a [Bytes::fill]
    /// returns `Ok(false)` this is what was left of the stream.
    pub fn pending(&self) -> usize {
        self.cache.len()
    }
}
