//! Message types for the upload link
//!
//! - Bridge → MCU: upload requests, chunks, dismiss, heartbeat
//! - MCU → Bridge: request status, heartbeat response
//!
//! An upload is one `BeginImage` or `BeginStrip` followed by `Chunk`s at
//! increasing offsets; the chunk with `last` set closes the request and
//! the MCU answers with a single `Status`.

use crate::frame::{Frame, FrameError, MAX_PAYLOAD_SIZE};
use heapless::Vec;

// Message type IDs: Bridge → MCU
pub const MSG_BEGIN_IMAGE: u8 = 0x01;
pub const MSG_BEGIN_STRIP: u8 = 0x02;
pub const MSG_CHUNK: u8 = 0x03;
pub const MSG_DISMISS: u8 = 0x04;
pub const MSG_PING: u8 = 0x05;

// Message type IDs: MCU → Bridge
pub const MSG_STATUS: u8 = 0x20;
pub const MSG_PONG: u8 = 0x21;

const CHUNK_HEADER: usize = 5;

/// Largest data slice one `Chunk` frame carries
pub const MAX_CHUNK_DATA: usize = MAX_PAYLOAD_SIZE - CHUNK_HEADER;

const FLAG_TIMEOUT: u8 = 0x01;
const FLAG_LAST: u8 = 0x01;

/// Messages from the network bridge to the MCU
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeMessage<'a> {
    /// Start a whole-image upload of `total_len` bytes
    BeginImage { total_len: u32, timeout_s: Option<u32> },
    /// Start an upload of one horizontal strip
    BeginStrip {
        total_len: u32,
        strip_index: u16,
        strip_count: u16,
        width: u16,
        height: u16,
        timeout_s: Option<u32>,
    },
    /// Body bytes at `offset` of the current upload
    Chunk { offset: u32, last: bool, data: &'a [u8] },
    /// Take the current image off the screen
    Dismiss,
    /// Heartbeat request
    Ping,
}

impl<'a> BridgeMessage<'a> {
    /// Parse a message from a frame
    pub fn from_frame(frame: &'a Frame) -> Result<Self, FrameError> {
        let mut r = Cursor::new(&frame.payload);
        let msg = match frame.msg_type {
            MSG_BEGIN_IMAGE => {
                let total_len = r.u32()?;
                let timeout_s = r.timeout()?;
                BridgeMessage::BeginImage { total_len, timeout_s }
            }
            MSG_BEGIN_STRIP => {
                let total_len = r.u32()?;
                let strip_index = r.u16()?;
                let strip_count = r.u16()?;
                let width = r.u16()?;
                let height = r.u16()?;
                let timeout_s = r.timeout()?;
                BridgeMessage::BeginStrip {
                    total_len,
                    strip_index,
                    strip_count,
                    width,
                    height,
                    timeout_s,
                }
            }
            MSG_CHUNK => {
                let offset = r.u32()?;
                let last = r.u8()? & FLAG_LAST != 0;
                let data = r.rest();
                return Ok(BridgeMessage::Chunk { offset, last, data });
            }
            MSG_DISMISS => BridgeMessage::Dismiss,
            MSG_PING => BridgeMessage::Ping,
            other => return Err(FrameError::UnknownType(other)),
        };
        r.finish()?;
        Ok(msg)
    }

    /// Encode this message into a frame
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        let mut payload = Vec::<u8, MAX_PAYLOAD_SIZE>::new();
        let msg_type = match self {
            BridgeMessage::BeginImage { total_len, timeout_s } => {
                put(&mut payload, &total_len.to_le_bytes())?;
                put_timeout(&mut payload, *timeout_s)?;
                MSG_BEGIN_IMAGE
            }
            BridgeMessage::BeginStrip {
                total_len,
                strip_index,
                strip_count,
                width,
                height,
                timeout_s,
            } => {
                put(&mut payload, &total_len.to_le_bytes())?;
                put(&mut payload, &strip_index.to_le_bytes())?;
                put(&mut payload, &strip_count.to_le_bytes())?;
                put(&mut payload, &width.to_le_bytes())?;
                put(&mut payload, &height.to_le_bytes())?;
                put_timeout(&mut payload, *timeout_s)?;
                MSG_BEGIN_STRIP
            }
            BridgeMessage::Chunk { offset, last, data } => {
                put(&mut payload, &offset.to_le_bytes())?;
                put(&mut payload, &[if *last { FLAG_LAST } else { 0 }])?;
                put(&mut payload, data)?;
                MSG_CHUNK
            }
            BridgeMessage::Dismiss => MSG_DISMISS,
            BridgeMessage::Ping => MSG_PING,
        };
        Frame::new(msg_type, &payload)
    }
}

/// Messages from the MCU back to the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum McuMessage {
    /// Outcome of one request; `code` is the numeric upload status
    Status { code: u8, op_id: u32 },
    /// Heartbeat response
    Pong,
}

impl McuMessage {
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        match self {
            McuMessage::Status { code, op_id } => {
                let mut payload = [0u8; 5];
                payload[0] = *code;
                payload[1..].copy_from_slice(&op_id.to_le_bytes());
                Frame::new(MSG_STATUS, &payload)
            }
            McuMessage::Pong => Ok(Frame::empty(MSG_PONG)),
        }
    }

    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        let mut r = Cursor::new(&frame.payload);
        let msg = match frame.msg_type {
            MSG_STATUS => {
                let code = r.u8()?;
                let op_id = r.u32()?;
                McuMessage::Status { code, op_id }
            }
            MSG_PONG => McuMessage::Pong,
            other => return Err(FrameError::UnknownType(other)),
        };
        r.finish()?;
        Ok(msg)
    }
}

fn put(payload: &mut Vec<u8, MAX_PAYLOAD_SIZE>, bytes: &[u8]) -> Result<(), FrameError> {
    payload
        .extend_from_slice(bytes)
        .map_err(|_| FrameError::PayloadTooLarge)
}

fn put_timeout(payload: &mut Vec<u8, MAX_PAYLOAD_SIZE>, timeout_s: Option<u32>) -> Result<(), FrameError> {
    match timeout_s {
        Some(t) => {
            put(payload, &[FLAG_TIMEOUT])?;
            put(payload, &t.to_le_bytes())
        }
        None => put(payload, &[0, 0, 0, 0, 0]),
    }
}

/// Little-endian reader over a payload
struct Cursor<'a> {
    data: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], FrameError> {
        if self.data.len() < N {
            return Err(FrameError::InvalidFrame);
        }
        let (head, tail) = self.data.split_at(N);
        self.data = tail;
        let mut out = [0u8; N];
        out.copy_from_slice(head);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, FrameError> {
        Ok(self.take::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16, FrameError> {
        self.take().map(u16::from_le_bytes)
    }

    fn u32(&mut self) -> Result<u32, FrameError> {
        self.take().map(u32::from_le_bytes)
    }

    fn timeout(&mut self) -> Result<Option<u32>, FrameError> {
        let flags = self.u8()?;
        let value = self.u32()?;
        Ok((flags & FLAG_TIMEOUT != 0).then_some(value))
    }

    fn rest(&mut self) -> &'a [u8] {
        core::mem::take(&mut self.data)
    }

    /// Trailing bytes mean the frame layout is wrong
    fn finish(&self) -> Result<(), FrameError> {
        if self.data.is_empty() {
            Ok(())
        } else {
            Err(FrameError::InvalidFrame)
        }
    }
}
