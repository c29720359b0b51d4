//! MCU-at-a-time baseline decoder
//!
//! [`Decoder::new`] parses the headers up to the first scan. Each call to
//! [`Decoder::next_mcu`] then entropy-decodes one MCU, runs the IDCT,
//! converts it to RGB888 inside the [`Workspace`] and returns the clipped
//! rectangle it covers. The pixels for that rectangle are available through
//! [`Decoder::pixels`] until the next call.

use crate::color::ycc_to_rgb;
use crate::error::{JpegError, Unsupported};
use crate::huffman::HuffTable;
use crate::idct::idct_8x8;
use crate::markers::{
    self, expect_soi, next_marker, read_frame_header, segment_len, FrameInfo, FrameKind,
    MAX_COMPONENTS,
};
use crate::reader::ByteSource;

/// Largest MCU edge in pixels (2x2 luma sampling)
pub const MAX_MCU_SIZE: usize = 16;

/// Four luma blocks plus Cb and Cr
const MAX_BLOCKS: usize = 6;

/// Huffman tables per class (baseline limit)
const MAX_HUFF_TABLES: usize = 2;

/// Zigzag index to natural (row-major) index
const ZIGZAG: [usize; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27,
    20, 13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58,
    59, 52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// Fixed-size decoder work area (about 4 KiB)
///
/// Holds quantization and Huffman tables, the coefficient scratch block,
/// the sample blocks of one MCU and its RGB888 output.
pub struct Workspace {
    quant: [[u16; 64]; 4],
    quant_defined: [bool; 4],
    dc_tables: [HuffTable; MAX_HUFF_TABLES],
    ac_tables: [HuffTable; MAX_HUFF_TABLES],
    coef: [i32; 64],
    blocks: [[u8; 64]; MAX_BLOCKS],
    rgb: [u8; MAX_MCU_SIZE * MAX_MCU_SIZE * 3],
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    pub const fn new() -> Self {
        Self {
            quant: [[0; 64]; 4],
            quant_defined: [false; 4],
            dc_tables: [HuffTable::empty(), HuffTable::empty()],
            ac_tables: [HuffTable::empty(), HuffTable::empty()],
            coef: [0; 64],
            blocks: [[0; 64]; MAX_BLOCKS],
            rgb: [0; MAX_MCU_SIZE * MAX_MCU_SIZE * 3],
        }
    }

    fn reset(&mut self) {
        self.quant_defined = [false; 4];
        for t in self.dc_tables.iter_mut().chain(self.ac_tables.iter_mut()) {
            t.defined = false;
        }
    }
}

/// Pixel rectangle covered by one decoded MCU, clipped to the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct McuRect {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
}

#[derive(Debug, Clone, Copy, Default)]
struct ScanComponent {
    dc_table: usize,
    ac_table: usize,
    quant_table: usize,
    h: usize,
    v: usize,
    blocks: usize,
}

/// Entropy-coded segment bit reader
struct BitReader<S> {
    src: S,
    buf: u32,
    count: u32,
}

impl<S: ByteSource> BitReader<S> {
    fn fill_byte(&mut self) -> Result<u32, JpegError> {
        let b = self.src.read_byte().ok_or(JpegError::Truncated)?;
        if b != 0xFF {
            return Ok(b as u32);
        }
        let mut m = self.src.read_byte().ok_or(JpegError::Truncated)?;
        while m == 0xFF {
            m = self.src.read_byte().ok_or(JpegError::Truncated)?;
        }
        match m {
            0x00 => Ok(0xFF),
            markers::EOI => Err(JpegError::Truncated),
            _ => Err(JpegError::Malformed),
        }
    }

    /// Read `n` (1..=16) bits, MSB first
    fn bits(&mut self, n: u32) -> Result<u32, JpegError> {
        while self.count < n {
            self.buf = (self.buf << 8) | self.fill_byte()?;
            self.count += 8;
        }
        self.count -= n;
        Ok((self.buf >> self.count) & ((1 << n) - 1))
    }

    fn bit(&mut self) -> Result<u32, JpegError> {
        self.bits(1)
    }

    fn discard(&mut self) {
        self.buf = 0;
        self.count = 0;
    }
}

/// Sign-extend a `size`-bit magnitude category value
#[inline]
fn extend(value: u32, size: u32) -> i32 {
    if size == 0 {
        return 0;
    }
    let v = value as i32;
    if v < (1 << (size - 1)) {
        v - (1 << size) + 1
    } else {
        v
    }
}

/// Streaming decoder over one JPEG image
pub struct Decoder<'w, S: ByteSource> {
    bits: BitReader<S>,
    ws: &'w mut Workspace,
    frame: FrameInfo,
    scan: [ScanComponent; MAX_COMPONENTS],
    mcu_width: u16,
    mcu_height: u16,
    mcu_cols: u16,
    mcu_rows: u16,
    next_col: u16,
    next_row: u16,
    restart_interval: u16,
    restarts_left: u16,
    next_rst: u8,
    dc_pred: [i32; MAX_COMPONENTS],
    pixel_len: usize,
}

impl<'w, S: ByteSource> Decoder<'w, S> {
    /// Parse headers up to and including the first SOS
    pub fn new(mut src: S, ws: &'w mut Workspace) -> Result<Self, JpegError> {
        ws.reset();
        expect_soi(&mut src)?;

        let mut frame: Option<FrameInfo> = None;
        let mut restart_interval = 0u16;

        loop {
            let marker = next_marker(&mut src)?;
            match marker {
                markers::DQT => {
                    let len = segment_len(&mut src)?;
                    read_dqt(&mut src, ws, len)?;
                }
                markers::DHT => {
                    let len = segment_len(&mut src)?;
                    read_dht(&mut src, ws, len)?;
                }
                markers::DRI => {
                    let len = segment_len(&mut src)?;
                    let mut v = [0u8; 2];
                    if len != 2 {
                        return Err(JpegError::Malformed);
                    }
                    if !src.read_into(&mut v) {
                        return Err(JpegError::Truncated);
                    }
                    restart_interval = u16::from_be_bytes(v);
                }
                markers::SOS => {
                    let frame = frame.ok_or(JpegError::Malformed)?;
                    let len = segment_len(&mut src)?;
                    let scan = read_sos(&mut src, ws, &frame, len)?;
                    return Ok(Self::start_scan(src, ws, frame, scan, restart_interval));
                }
                markers::SOI | markers::EOI | markers::DNL => return Err(JpegError::Malformed),
                markers::RST0..=markers::RST7 | 0x01 => {}
                other => {
                    let len = segment_len(&mut src)?;
                    if let Some(kind) = FrameKind::from_marker(other) {
                        if frame.is_some() {
                            return Err(JpegError::Malformed);
                        }
                        let info = read_frame_header(&mut src, kind, len)?;
                        info.check_supported()?;
                        frame = Some(info);
                    } else if !src.skip(len) {
                        return Err(JpegError::Truncated);
                    }
                }
            }
        }
    }

    fn start_scan(
        src: S,
        ws: &'w mut Workspace,
        frame: FrameInfo,
        scan: [ScanComponent; MAX_COMPONENTS],
        restart_interval: u16,
    ) -> Self {
        let (mcu_width, mcu_height) = frame.mcu_size();
        let (mcu_cols, mcu_rows) = frame.mcu_grid();
        Self {
            bits: BitReader {
                src,
                buf: 0,
                count: 0,
            },
            ws,
            frame,
            scan,
            mcu_width,
            mcu_height,
            mcu_cols,
            mcu_rows,
            next_col: 0,
            next_row: 0,
            restart_interval,
            restarts_left: restart_interval,
            next_rst: 0,
            dc_pred: [0; MAX_COMPONENTS],
            pixel_len: 0,
        }
    }

    /// Frame header of the image being decoded
    pub fn frame(&self) -> &FrameInfo {
        &self.frame
    }

    pub fn width(&self) -> u16 {
        self.frame.width
    }

    pub fn height(&self) -> u16 {
        self.frame.height
    }

    /// RGB888 pixels of the last rectangle returned by [`Self::next_mcu`],
    /// row-major with a stride of the rectangle width.
    pub fn pixels(&self) -> &[u8] {
        &self.ws.rgb[..self.pixel_len]
    }

    /// Decode the next MCU; `Ok(None)` once the whole frame has been produced
    pub fn next_mcu(&mut self) -> Result<Option<McuRect>, JpegError> {
        if self.next_row >= self.mcu_rows {
            return Ok(None);
        }

        if self.restart_interval > 0 {
            if self.restarts_left == 0 {
                self.process_restart()?;
            }
            self.restarts_left -= 1;
        }

        let mut block = 0;
        for c in 0..self.frame.component_count as usize {
            for _ in 0..self.scan[c].blocks {
                self.decode_block(c)?;
                idct_8x8(&self.ws.coef, &mut self.ws.blocks[block]);
                block += 1;
            }
        }

        let left = self.next_col * self.mcu_width;
        let top = self.next_row * self.mcu_height;
        let rect = McuRect {
            left,
            top,
            width: self.mcu_width.min(self.frame.width - left),
            height: self.mcu_height.min(self.frame.height - top),
        };
        self.convert(rect);

        self.next_col += 1;
        if self.next_col == self.mcu_cols {
            self.next_col = 0;
            self.next_row += 1;
        }
        Ok(Some(rect))
    }

    fn process_restart(&mut self) -> Result<(), JpegError> {
        self.bits.discard();
        let marker = next_marker(&mut self.bits.src)?;
        if marker != markers::RST0 + self.next_rst {
            return Err(JpegError::Malformed);
        }
        self.next_rst = (self.next_rst + 1) & 7;
        self.dc_pred = [0; MAX_COMPONENTS];
        self.restarts_left = self.restart_interval;
        Ok(())
    }

    fn decode_block(&mut self, component: usize) -> Result<(), JpegError> {
        let sc = self.scan[component];
        self.ws.coef = [0; 64];

        let size = self.ws.dc_tables[sc.dc_table].decode(|| self.bits.bit())? as u32;
        if size > 11 {
            return Err(JpegError::Malformed);
        }
        let diff = if size == 0 {
            0
        } else {
            extend(self.bits.bits(size)?, size)
        };
        let pred = self.dc_pred[component].wrapping_add(diff);
        self.dc_pred[component] = pred;

        let quant = &self.ws.quant[sc.quant_table];
        self.ws.coef[0] = pred.wrapping_mul(quant[0] as i32);

        let mut k = 1usize;
        while k < 64 {
            let rs = self.ws.ac_tables[sc.ac_table].decode(|| self.bits.bit())?;
            let run = (rs >> 4) as usize;
            let size = (rs & 0x0F) as u32;
            if size == 0 {
                if run == 15 {
                    k += 16;
                    continue;
                }
                break;
            }
            k += run;
            if k > 63 {
                return Err(JpegError::Malformed);
            }
            let value = extend(self.bits.bits(size)?, size);
            self.ws.coef[ZIGZAG[k]] = value.wrapping_mul(quant[k] as i32);
            k += 1;
        }
        Ok(())
    }

    /// Upsample chroma and convert the MCU's clipped area to RGB888
    fn convert(&mut self, rect: McuRect) {
        let w = rect.width as usize;
        let h = rect.height as usize;
        let luma = self.scan[0];
        let gray = self.frame.component_count == 1;
        let chroma_block = luma.blocks;

        for y in 0..h {
            for x in 0..w {
                let yb = (y / 8) * luma.h + x / 8;
                let yv = self.ws.blocks[yb][(y % 8) * 8 + x % 8];
                let (r, g, b) = if gray {
                    (yv, yv, yv)
                } else {
                    let ci = (y / luma.v) * 8 + x / luma.h;
                    let cb = self.ws.blocks[chroma_block][ci];
                    let cr = self.ws.blocks[chroma_block + 1][ci];
                    ycc_to_rgb(yv, cb, cr)
                };
                let o = (y * w + x) * 3;
                self.ws.rgb[o] = r;
                self.ws.rgb[o + 1] = g;
                self.ws.rgb[o + 2] = b;
            }
        }
        self.pixel_len = w * h * 3;
    }
}

fn read_dqt<S: ByteSource>(src: &mut S, ws: &mut Workspace, len: usize) -> Result<(), JpegError> {
    let mut remaining = len;
    while remaining > 0 {
        let pq_tq = src.read_byte().ok_or(JpegError::Truncated)?;
        if pq_tq >> 4 != 0 {
            return Err(Unsupported::Precision.into());
        }
        let id = (pq_tq & 0x0F) as usize;
        if id >= 4 || remaining < 65 {
            return Err(JpegError::Malformed);
        }
        let mut table = [0u8; 64];
        if !src.read_into(&mut table) {
            return Err(JpegError::Truncated);
        }
        for (dst, &q) in ws.quant[id].iter_mut().zip(table.iter()) {
            *dst = q as u16;
        }
        ws.quant_defined[id] = true;
        remaining -= 65;
    }
    Ok(())
}

fn read_dht<S: ByteSource>(src: &mut S, ws: &mut Workspace, len: usize) -> Result<(), JpegError> {
    let mut remaining = len;
    while remaining > 0 {
        if remaining < 17 {
            return Err(JpegError::Malformed);
        }
        let tc_th = src.read_byte().ok_or(JpegError::Truncated)?;
        let mut counts = [0u8; 16];
        if !src.read_into(&mut counts) {
            return Err(JpegError::Truncated);
        }
        remaining -= 17;

        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if total > remaining || total > 256 {
            return Err(JpegError::Malformed);
        }
        let mut symbols = [0u8; 256];
        if !src.read_into(&mut symbols[..total]) {
            return Err(JpegError::Truncated);
        }
        remaining -= total;

        let tables = match tc_th >> 4 {
            0 => &mut ws.dc_tables,
            1 => &mut ws.ac_tables,
            _ => return Err(JpegError::Malformed),
        };
        let table = tables
            .get_mut((tc_th & 0x0F) as usize)
            .ok_or(JpegError::Malformed)?;
        table.build(&counts, &symbols[..total])?;
    }
    Ok(())
}

fn read_sos<S: ByteSource>(
    src: &mut S,
    ws: &Workspace,
    frame: &FrameInfo,
    len: usize,
) -> Result<[ScanComponent; MAX_COMPONENTS], JpegError> {
    let count = src.read_byte().ok_or(JpegError::Truncated)?;
    if count < frame.component_count {
        return Err(Unsupported::MultiScan.into());
    }
    if count != frame.component_count || len != 4 + 2 * count as usize {
        return Err(JpegError::Malformed);
    }

    let mut scan = [ScanComponent::default(); MAX_COMPONENTS];
    for (i, slot) in scan.iter_mut().enumerate().take(count as usize) {
        let mut sel = [0u8; 2];
        if !src.read_into(&mut sel) {
            return Err(JpegError::Truncated);
        }
        let comp = frame.components[i];
        if sel[0] != comp.id {
            return Err(JpegError::Malformed);
        }
        let dc_table = (sel[1] >> 4) as usize;
        let ac_table = (sel[1] & 0x0F) as usize;
        let quant_table = comp.quant_table as usize;

        let dc_ok = ws.dc_tables.get(dc_table).is_some_and(|t| t.defined);
        let ac_ok = ws.ac_tables.get(ac_table).is_some_and(|t| t.defined);
        let q_ok = ws.quant_defined.get(quant_table).copied().unwrap_or(false);
        if !(dc_ok && ac_ok && q_ok) {
            return Err(JpegError::MissingTable);
        }

        let (h, v) = if count == 1 {
            (1, 1)
        } else {
            (comp.h as usize, comp.v as usize)
        };
        *slot = ScanComponent {
            dc_table,
            ac_table,
            quant_table,
            h,
            v,
            blocks: h * v,
        };
    }

    let mut spectral = [0u8; 3];
    if !src.read_into(&mut spectral) {
        return Err(JpegError::Truncated);
    }
    if spectral != [0, 63, 0] {
        return Err(Unsupported::Progressive.into());
    }
    Ok(scan)
}
