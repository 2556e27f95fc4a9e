//! Binary layouts for the on-disk cache artifacts.
//!
//! All integers are little-endian `u32`. Decoders never read past the end of the input: a length
//! prefix that claims more bytes than remain fails with [`AnimstreamError::CorruptCache`].

pub mod delays;
pub mod preview;
pub mod sidecar;

use crate::foundation::error::{AnimstreamError, AnimstreamResult};

pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
    what: &'static str,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(buf: &'a [u8], what: &'static str) -> Self {
        Self { buf, pos: 0, what }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn read_u32(&mut self) -> AnimstreamResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn read_u16(&mut self) -> AnimstreamResult<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn take(&mut self, len: usize) -> AnimstreamResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(AnimstreamError::corrupt_cache(format!(
                "{}: need {len} bytes at offset {}, only {} remain",
                self.what,
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub(crate) fn finish(self) -> AnimstreamResult<()> {
        if self.remaining() != 0 {
            return Err(AnimstreamError::corrupt_cache(format!(
                "{}: {} trailing bytes after payload",
                self.what,
                self.remaining()
            )));
        }
        Ok(())
    }
}

pub(crate) fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Checked length prefix; a count that does not fit a `u32` cannot be encoded.
pub(crate) fn len_u32(len: usize, what: &str) -> AnimstreamResult<u32> {
    u32::try_from(len).map_err(|_| {
        AnimstreamError::validation(format!("{what}: length {len} exceeds the u32 length prefix"))
    })
}
