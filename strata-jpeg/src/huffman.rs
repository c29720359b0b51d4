//! Canonical Huffman tables (JPEG Annex C)

use crate::error::JpegError;

/// One DHT table in decode form
#[derive(Clone)]
pub(crate) struct HuffTable {
    pub(crate) defined: bool,
    values: [u8; 256],
    /// Largest code of each length, -1 when no code has that length
    maxcode: [i32; 17],
    mincode: [u16; 17],
    valptr: [u8; 17],
}

impl HuffTable {
    pub(crate) const fn empty() -> Self {
        Self {
            defined: false,
            values: [0; 256],
            maxcode: [-1; 17],
            mincode: [0; 17],
            valptr: [0; 17],
        }
    }

    /// Build from the 16 code-length counts and the symbol list
    pub(crate) fn build(&mut self, counts: &[u8; 16], symbols: &[u8]) -> Result<(), JpegError> {
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if total == 0 || total > 256 || total != symbols.len() {
            return Err(JpegError::Malformed);
        }

        let mut code: u32 = 0;
        let mut k: usize = 0;
        for len in 1..=16usize {
            let n = counts[len - 1] as u32;
            if n == 0 {
                self.maxcode[len] = -1;
            } else {
                self.valptr[len] = k as u8;
                self.mincode[len] = code as u16;
                code += n;
                k += n as usize;
                if code > (1 << len) {
                    return Err(JpegError::Malformed);
                }
                self.maxcode[len] = code as i32 - 1;
            }
            code <<= 1;
        }

        self.values[..total].copy_from_slice(symbols);
        self.defined = true;
        Ok(())
    }

    /// Decode one symbol, pulling bits one at a time from `next_bit`
    pub(crate) fn decode<F>(&self, mut next_bit: F) -> Result<u8, JpegError>
    where
        F: FnMut() -> Result<u32, JpegError>,
    {
        let mut code: i32 = 0;
        for len in 1..=16usize {
            code = (code << 1) | next_bit()? as i32;
            if code <= self.maxcode[len] {
                let idx = self.valptr[len] as i32 + code - self.mincode[len] as i32;
                return self
                    .values
                    .get(idx as usize)
                    .copied()
                    .ok_or(JpegError::Malformed);
            }
        }
        Err(JpegError::Malformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Standard luminance DC table from ITU T.81 Annex K
    const DC_COUNTS: [u8; 16] = [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];
    const DC_SYMBOLS: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

    fn decode_bits(table: &HuffTable, bits: &[u32]) -> Result<u8, JpegError> {
        let mut it = bits.iter();
        table.decode(|| it.next().copied().ok_or(JpegError::Truncated))
    }

    #[test]
    fn test_standard_dc_codes() {
        let mut t = HuffTable::empty();
        t.build(&DC_COUNTS, &DC_SYMBOLS).unwrap();
        assert_eq!(decode_bits(&t, &[0, 0]), Ok(0));
        assert_eq!(decode_bits(&t, &[0, 1, 0]), Ok(1));
        assert_eq!(decode_bits(&t, &[1, 1, 0]), Ok(5));
        assert_eq!(decode_bits(&t, &[1, 1, 1, 0]), Ok(6));
        assert_eq!(decode_bits(&t, &[1, 1, 1, 1, 1, 1, 1, 1, 0]), Ok(11));
    }

    #[test]
    fn test_invalid_code_is_malformed() {
        let mut t = HuffTable::empty();
        t.build(&DC_COUNTS, &DC_SYMBOLS).unwrap();
        assert_eq!(decode_bits(&t, &[1; 16]), Err(JpegError::Malformed));
    }

    #[test]
    fn test_oversubscribed_lengths_rejected() {
        let mut counts = [0u8; 16];
        counts[0] = 3; // three 1-bit codes cannot exist
        let mut t = HuffTable::empty();
        assert_eq!(t.build(&counts, &[0, 1, 2]), Err(JpegError::Malformed));
        assert!(!t.defined);
    }
}
