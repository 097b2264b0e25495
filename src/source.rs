use std::io::{Read, Seek, SeekFrom};

use crate::error::Result;

/// Random-access byte view over a seekable input.
///
/// Tracks the current offset locally so `tell` never has to ask the
/// underlying reader.
pub struct ByteSource<R> {
    inner: R,
    pos: u64,
}

impl<R: Read + Seek> ByteSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, pos: 0 }
    }

    /// Current byte offset.
    pub fn tell(&self) -> u64 {
        self.pos
    }

    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.pos = offset;
        Ok(())
    }

    /// Read and consume one byte. `None` at end of input.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.pos += 1;
                    return Ok(Some(buf[0]));
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Step back one byte so the next read returns it again.
    pub fn unread(&mut self) -> Result<()> {
        debug_assert!(self.pos > 0);
        self.seek_to(self.pos - 1)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}
