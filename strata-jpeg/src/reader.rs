//! Compressed input cursor
//!
//! The decoder pulls bytes through [`ByteSource`] so it can run over an
//! in-memory upload buffer today and over a streamed source later without
//! changing the entropy decoder.

/// Sequential byte input for the decoder
pub trait ByteSource {
    /// Next byte, or `None` at end of input
    fn read_byte(&mut self) -> Option<u8>;

    /// Fill `buf` completely; `false` if the input ran out first
    fn read_into(&mut self, buf: &mut [u8]) -> bool {
        for slot in buf.iter_mut() {
            match self.read_byte() {
                Some(b) => *slot = b,
                None => return false,
            }
        }
        true
    }

    /// Discard `count` bytes; `false` if the input ran out first
    fn skip(&mut self, count: usize) -> bool {
        for _ in 0..count {
            if self.read_byte().is_none() {
                return false;
            }
        }
        true
    }
}

/// Cursor over a byte slice
#[derive(Debug, Clone)]
pub struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    /// Start reading at the beginning of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl ByteSource for SliceReader<'_> {
    fn read_byte(&mut self) -> Option<u8> {
        let b = self.data.get(self.pos).copied()?;
        self.pos += 1;
        Some(b)
    }

    fn read_into(&mut self, buf: &mut [u8]) -> bool {
        let end = self.pos + buf.len();
        match self.data.get(self.pos..end) {
            Some(src) => {
                buf.copy_from_slice(src);
                self.pos = end;
                true
            }
            None => {
                self.pos = self.data.len();
                false
            }
        }
    }

    fn skip(&mut self, count: usize) -> bool {
        if count > self.remaining() {
            self.pos = self.data.len();
            return false;
        }
        self.pos += count;
        true
    }
}
