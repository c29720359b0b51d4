//! Minimal baseline JPEG encoder for tests
//!
//! [`JpegBuilder::build`] produces DC-only images: every 8x8 block is a flat
//! value, so with the default all-ones quantization decoded samples are exact
//! and tests can assert pixel values byte for byte. Each MCU gets one
//! `(Y, Cb, Cr)` triple from the caller.
//!
//! [`JpegBuilder::build_pixels`] takes a value per pixel and runs a real
//! forward DCT with the standard AC Huffman table, so decoded output is only
//! close to the source and tests compare within a tolerance.

use alloc::vec::Vec;

/// Standard luminance DC code lengths (ITU T.81 Annex K)
const DC_COUNTS: [u8; 16] = [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];
const DC_SYMBOLS: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

/// Standard luminance AC table (ITU T.81 Annex K)
const AC_COUNTS: [u8; 16] = [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 0x7D];
#[rustfmt::skip]
const AC_SYMBOLS: [u8; 162] = [
    0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07,
    0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xA1, 0x08, 0x23, 0x42, 0xB1, 0xC1, 0x15, 0x52, 0xD1, 0xF0,
    0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0A, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x25, 0x26, 0x27, 0x28,
    0x29, 0x2A, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49,
    0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69,
    0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89,
    0x8A, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7,
    0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5,
    0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE1, 0xE2,
    0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8,
    0xF9, 0xFA,
];
const EOB: u8 = 0x00;
const ZRL: u8 = 0xF0;

/// Zigzag position to row-major index
#[rustfmt::skip]
const ZIGZAG: [usize; 64] = [
     0,  1,  8, 16,  9,  2,  3, 10, 17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34, 27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// cos(k * pi / 16) for k in 0..=8
const COS16: [f64; 9] = [
    1.0,
    0.980_785_280_403_230_4,
    0.923_879_532_511_286_7,
    0.831_469_612_302_545_2,
    0.707_106_781_186_547_6,
    0.555_570_233_019_602_2,
    0.382_683_432_365_089_8,
    0.195_090_322_016_128_25,
    0.0,
];

/// Builder for synthetic test images
#[derive(Debug, Clone)]
pub struct JpegBuilder {
    width: u16,
    height: u16,
    components: u8,
    h: u8,
    v: u8,
    restart_interval: u16,
    sof_marker: u8,
    quant: [u8; 64],
}

impl JpegBuilder {
    /// Single-component image
    pub fn grayscale(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            components: 1,
            h: 1,
            v: 1,
            restart_interval: 0,
            sof_marker: 0xC0,
            quant: [1; 64],
        }
    }

    /// Three-component image with luma sampling `h`x`v` and 1x1 chroma
    pub fn ycbcr(width: u16, height: u16, h: u8, v: u8) -> Self {
        Self {
            components: 3,
            h,
            v,
            ..Self::grayscale(width, height)
        }
    }

    /// Emit DRI and RSTn markers every `mcus` MCUs
    pub fn restart_interval(mut self, mcus: u16) -> Self {
        self.restart_interval = mcus;
        self
    }

    /// Label the frame SOF2 (the scan stays sequential; only useful for rejection tests)
    pub fn progressive(mut self) -> Self {
        self.sof_marker = 0xC2;
        self
    }

    /// MCU edge in pixels
    pub fn mcu_size(&self) -> (u16, u16) {
        if self.components == 1 {
            (8, 8)
        } else {
            (8 * self.h as u16, 8 * self.v as u16)
        }
    }

    /// Replace the quantization table (zigzag order, entries non-zero)
    pub fn quant_table(mut self, table: [u8; 64]) -> Self {
        self.quant = table;
        self
    }

    /// Encode; `mcu(col, row)` returns the flat `(Y, Cb, Cr)` of that MCU
    pub fn build<F>(&self, mcu: F) -> Vec<u8>
    where
        F: Fn(usize, usize) -> (u8, u8, u8),
    {
        let mut eob_only = [0u8; 16];
        eob_only[0] = 1;
        let q0 = self.quant[0] as f64;
        self.encode(&eob_only, &[EOB], |col, row, c, _| {
            let (y, cb, cr) = mcu(col, row);
            let mut coefs = [0i32; 64];
            coefs[0] = round((([y, cb, cr][c] as f64) - 128.0) * 8.0 / q0);
            coefs
        })
    }

    /// Encode a full-detail image; `pixel(x, y)` returns `(Y, Cb, Cr)` at
    /// luma resolution. Blocks go through a forward DCT and the standard AC
    /// table, chroma is averaged over each `h`x`v` cell, and edge pixels are
    /// replicated into MCU padding.
    pub fn build_pixels<F>(&self, pixel: F) -> Vec<u8>
    where
        F: Fn(usize, usize) -> (u8, u8, u8),
    {
        let last_x = (self.width as usize).saturating_sub(1);
        let last_y = (self.height as usize).saturating_sub(1);
        let sample = |x: usize, y: usize, c: usize| {
            let (luma, cb, cr) = pixel(x.min(last_x), y.min(last_y));
            [luma, cb, cr][c]
        };
        let (mw, mh) = self.mcu_size();
        let (sh, sv) = if self.components == 1 {
            (1, 1)
        } else {
            (self.h as usize, self.v as usize)
        };

        self.encode(&AC_COUNTS, &AC_SYMBOLS, |col, row, c, b| {
            let left = col * mw as usize;
            let top = row * mh as usize;
            let mut block = [0u8; 64];
            for (i, s) in block.iter_mut().enumerate() {
                let (bx, by) = (i % 8, i / 8);
                *s = if c == 0 {
                    sample(left + (b % sh) * 8 + bx, top + (b / sh) * 8 + by, 0)
                } else {
                    let mut sum = 0u32;
                    for dy in 0..sv {
                        for dx in 0..sh {
                            sum += sample(left + bx * sh + dx, top + by * sv + dy, c) as u32;
                        }
                    }
                    let n = (sh * sv) as u32;
                    ((sum + n / 2) / n) as u8
                };
            }
            quantized_dct(&block, &self.quant)
        })
    }

    /// Shared framing; `block(col, row, component, index)` yields quantized
    /// coefficients in zigzag order
    fn encode<F>(&self, ac_counts: &[u8; 16], ac_symbols: &[u8], block: F) -> Vec<u8>
    where
        F: Fn(usize, usize, usize, usize) -> [i32; 64],
    {
        let mut out = Vec::new();
        out.extend_from_slice(&[0xFF, 0xD8]);

        // APP0 JFIF
        out.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
        out.extend_from_slice(b"JFIF\0");
        out.extend_from_slice(&[1, 1, 0, 0, 1, 0, 1, 0, 0]);

        // DQT: table 0
        out.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x43, 0x00]);
        out.extend_from_slice(&self.quant);

        // SOFn
        let n = self.components;
        let len = 8 + 3 * n as u16;
        out.extend_from_slice(&[0xFF, self.sof_marker]);
        out.extend_from_slice(&len.to_be_bytes());
        out.push(8);
        out.extend_from_slice(&self.height.to_be_bytes());
        out.extend_from_slice(&self.width.to_be_bytes());
        out.push(n);
        for c in 0..n {
            let hv = if c == 0 { (self.h << 4) | self.v } else { 0x11 };
            out.extend_from_slice(&[c + 1, hv, 0]);
        }

        // DHT: DC table 0 (standard), AC table 0
        out.extend_from_slice(&[0xFF, 0xC4, 0x00, 0x1F, 0x00]);
        out.extend_from_slice(&DC_COUNTS);
        out.extend_from_slice(&DC_SYMBOLS);
        let len = 19 + ac_symbols.len() as u16;
        out.extend_from_slice(&[0xFF, 0xC4]);
        out.extend_from_slice(&len.to_be_bytes());
        out.push(0x10);
        out.extend_from_slice(ac_counts);
        out.extend_from_slice(ac_symbols);

        if self.restart_interval > 0 {
            out.extend_from_slice(&[0xFF, 0xDD, 0x00, 0x04]);
            out.extend_from_slice(&self.restart_interval.to_be_bytes());
        }

        // SOS
        let len = 6 + 2 * n as u16;
        out.extend_from_slice(&[0xFF, 0xDA]);
        out.extend_from_slice(&len.to_be_bytes());
        out.push(n);
        for c in 0..n {
            out.extend_from_slice(&[c + 1, 0x00]);
        }
        out.extend_from_slice(&[0, 63, 0]);

        let dc_codes = symbol_codes(&DC_COUNTS, &DC_SYMBOLS);
        let ac_codes = symbol_codes(ac_counts, ac_symbols);
        let (mw, mh) = self.mcu_size();
        let cols = self.width.div_ceil(mw) as usize;
        let rows = self.height.div_ceil(mh) as usize;
        let luma_blocks = if n == 1 { 1 } else { (self.h * self.v) as usize };

        let mut bits = BitWriter::new(&mut out);
        let mut pred = [0i32; 3];
        let mut rst = 0u8;
        for index in 0..cols * rows {
            if self.restart_interval > 0 && index > 0 && index % self.restart_interval as usize == 0 {
                bits.flush();
                bits.out.extend_from_slice(&[0xFF, 0xD0 + rst]);
                rst = (rst + 1) & 7;
                pred = [0; 3];
            }
            let (col, row) = (index % cols, index / cols);
            for c in 0..n as usize {
                let blocks = if c == 0 { luma_blocks } else { 1 };
                for b in 0..blocks {
                    let coefs = block(col, row, c, b);

                    let diff = coefs[0] - pred[c];
                    pred[c] = coefs[0];
                    let size = magnitude_bits(diff);
                    bits.symbol(&dc_codes, size as u8);
                    bits.magnitude(diff, size);

                    let mut run = 0u8;
                    for &value in &coefs[1..] {
                        if value == 0 {
                            run += 1;
                            continue;
                        }
                        while run > 15 {
                            bits.symbol(&ac_codes, ZRL);
                            run -= 16;
                        }
                        let size = magnitude_bits(value);
                        bits.symbol(&ac_codes, (run << 4) | size as u8);
                        bits.magnitude(value, size);
                        run = 0;
                    }
                    if run > 0 {
                        bits.symbol(&ac_codes, EOB);
                    }
                }
            }
        }
        bits.flush();

        out.extend_from_slice(&[0xFF, 0xD9]);
        out
    }
}

/// Forward DCT of one block, quantized and laid out in zigzag order
fn quantized_dct(samples: &[u8; 64], quant: &[u8; 64]) -> [i32; 64] {
    let mut out = [0i32; 64];
    for (k, &natural) in ZIGZAG.iter().enumerate() {
        let (u, v) = (natural % 8, natural / 8);
        let mut sum = 0.0;
        for y in 0..8 {
            for x in 0..8 {
                let s = samples[y * 8 + x] as f64 - 128.0;
                sum += s * cos16((2 * x + 1) * u) * cos16((2 * y + 1) * v);
            }
        }
        let cu = if u == 0 { COS16[4] } else { 1.0 };
        let cv = if v == 0 { COS16[4] } else { 1.0 };
        out[k] = round(sum * cu * cv / 4.0 / quant[k] as f64);
    }
    out
}

/// cos(k * pi / 16)
fn cos16(k: usize) -> f64 {
    let k = k % 32;
    let k = if k > 16 { 32 - k } else { k };
    if k > 8 { -COS16[16 - k] } else { COS16[k] }
}

fn round(x: f64) -> i32 {
    if x >= 0.0 {
        (x + 0.5) as i32
    } else {
        (x - 0.5) as i32
    }
}

fn magnitude_bits(v: i32) -> u32 {
    32 - v.unsigned_abs().leading_zeros()
}

/// (code, length) indexed by symbol value
fn symbol_codes(counts: &[u8; 16], symbols: &[u8]) -> [(u32, u32); 256] {
    let mut table = [(0, 0); 256];
    for (&symbol, code) in symbols.iter().zip(canonical_codes(counts)) {
        table[symbol as usize] = code;
    }
    table
}

/// (code, length) for each symbol index of a table given its length counts
fn canonical_codes(counts: &[u8; 16]) -> Vec<(u32, u32)> {
    let mut codes = Vec::new();
    let mut code = 0u32;
    for (i, &n) in counts.iter().enumerate() {
        for _ in 0..n {
            codes.push((code, i as u32 + 1));
            code += 1;
        }
        code <<= 1;
    }
    codes
}

struct BitWriter<'a> {
    out: &'a mut Vec<u8>,
    acc: u32,
    count: u32,
}

impl<'a> BitWriter<'a> {
    fn new(out: &'a mut Vec<u8>) -> Self {
        Self { out, acc: 0, count: 0 }
    }

    fn put(&mut self, value: u32, len: u32) {
        for i in (0..len).rev() {
            self.acc = (self.acc << 1) | ((value >> i) & 1);
            self.count += 1;
            if self.count == 8 {
                self.emit();
            }
        }
    }

    fn symbol(&mut self, codes: &[(u32, u32); 256], symbol: u8) {
        let (code, len) = codes[symbol as usize];
        assert!(len > 0, "symbol {symbol:#04x} missing from table");
        self.put(code, len);
    }

    /// Low `size` bits of `value`, ones' complement for negatives
    fn magnitude(&mut self, value: i32, size: u32) {
        if size > 0 {
            let raw = if value < 0 { value - 1 } else { value };
            self.put(raw as u32 & ((1 << size) - 1), size);
        }
    }

    fn emit(&mut self) {
        let byte = self.acc as u8;
        self.out.push(byte);
        if byte == 0xFF {
            self.out.push(0x00);
        }
        self.acc = 0;
        self.count = 0;
    }

    /// Pad the partial byte with one bits
    fn flush(&mut self) {
        while self.count != 0 {
            self.acc = (self.acc << 1) | 1;
            self.count += 1;
            if self.count == 8 {
                self.emit();
            }
        }
    }
}
