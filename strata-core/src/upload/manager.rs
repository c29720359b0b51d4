//! Network-side upload manager
//!
//! Runs in the network context and never blocks on rendering. Owns the
//! buffer being filled; only the completed buffer crosses into
//! [`SharedUpload`].

use strata_jpeg::{is_jpeg_magic, preflight_fragment, preflight_image};

use super::buffer::UploadBuffer;
use super::error::{ParamError, UploadError};
use super::state::{OperationId, PendingImageOp, PendingOp, PendingStripOp, SharedUpload};
use crate::config::UploadConfig;
use crate::traits::display::Size;
use crate::traits::system::{Clock, MemoryStats};

/// Identifies one admitted upload; chunks for any other ticket are refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UploadTicket(u32);

/// Parameters of one strip of a sliced image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StripRequest {
    pub strip_index: u16,
    pub strip_count: u16,
    /// Full image width
    pub width: u16,
    /// Full image height
    pub height: u16,
    /// Seconds to keep the image; `None` uses the configured default
    pub timeout_s: Option<u32>,
}

impl StripRequest {
    fn validate(&self, surface: Size) -> Result<(), ParamError> {
        if self.strip_index >= self.strip_count {
            return Err(ParamError::StripIndex {
                index: self.strip_index,
                count: self.strip_count,
            });
        }
        if self.width == 0
            || self.height == 0
            || self.width > surface.width
            || self.height > surface.height
        {
            return Err(ParamError::Dimensions {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// What a request is uploading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UploadRequest {
    Image { timeout_s: Option<u32> },
    Strip(StripRequest),
}

/// What was queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AcceptedKind {
    Image,
    Strip {
        index: u16,
        count: u16,
        /// Last strip of the image
        complete: bool,
    },
}

/// Successful upload completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Accepted {
    pub op_id: OperationId,
    pub timeout_ms: u32,
    pub kind: AcceptedKind,
}

pub type UploadResult = Result<Accepted, UploadError>;

/// Per-request state for the chunked upload contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub request: UploadRequest,
    ticket: Option<UploadTicket>,
    received: usize,
    rejected: Option<UploadError>,
}

impl RequestContext {
    pub fn new(request: UploadRequest) -> Self {
        Self {
            request,
            ticket: None,
            received: 0,
            rejected: None,
        }
    }

    pub fn ticket(&self) -> Option<UploadTicket> {
        self.ticket
    }

    /// Bytes accepted for this request so far
    pub fn received(&self) -> usize {
        self.received
    }

    /// First rejection; later chunks of the request are drained and ignored
    pub fn rejected(&self) -> Option<UploadError> {
        self.rejected
    }
}

/// Result of feeding one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChunkOutcome {
    /// Send the next chunk
    Continue,
    /// Request finished; report this to the client
    Done(UploadResult),
}

#[derive(Debug, Clone, Copy)]
enum ReceivingKind {
    Image,
    Strip(StripRequest),
}

struct Receiving {
    ticket: UploadTicket,
    kind: ReceivingKind,
    buffer: UploadBuffer,
    declared: usize,
    timeout_ms: u32,
    last_activity_ms: u32,
}

/// Admits uploads, buffers their chunks and publishes validated operations
pub struct UploadManager<'a, M: MemoryStats, C: Clock> {
    shared: &'a SharedUpload,
    config: UploadConfig,
    surface: Size,
    memory: M,
    clock: C,
    receiving: Option<Receiving>,
    next_ticket: u32,
}

impl<'a, M: MemoryStats, C: Clock> UploadManager<'a, M, C> {
    /// `surface` is the visible panel size used for dimension checks
    pub fn new(shared: &'a SharedUpload, config: UploadConfig, surface: Size, memory: M, clock: C) -> Self {
        Self {
            shared,
            config,
            surface,
            memory,
            clock,
            receiving: None,
            next_ticket: 0,
        }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// An upload is currently being received
    pub fn is_receiving(&self) -> bool {
        self.receiving.is_some()
    }

    /// Admit a whole-image upload of `declared` bytes
    pub fn begin_image(&mut self, declared: usize, timeout_s: Option<u32>) -> Result<UploadTicket, UploadError> {
        let timeout_ms = self.config.resolve_timeout(timeout_s);
        self.admit(ReceivingKind::Image, declared, timeout_ms)
    }

    /// Admit one strip of `declared` bytes
    pub fn begin_strip(&mut self, request: StripRequest, declared: usize) -> Result<UploadTicket, UploadError> {
        request
            .validate(self.surface)
            .map_err(UploadError::InvalidParameters)?;
        let timeout_ms = self.config.resolve_timeout(request.timeout_s);
        self.admit(ReceivingKind::Strip(request), declared, timeout_ms)
    }

    fn admit(&mut self, kind: ReceivingKind, declared: usize, timeout_ms: u32) -> Result<UploadTicket, UploadError> {
        let strip = matches!(kind, ReceivingKind::Strip(_));
        self.shared.begin(strip)?;

        let buffer = match self.reserve(declared) {
            Ok(buffer) => buffer,
            Err(e) => {
                self.shared.abort();
                return Err(e);
            }
        };

        let ticket = UploadTicket(self.next_ticket);
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.receiving = Some(Receiving {
            ticket,
            kind,
            buffer,
            declared,
            timeout_ms,
            last_activity_ms: self.clock.now_ms(),
        });
        Ok(ticket)
    }

    fn reserve(&self, declared: usize) -> Result<UploadBuffer, UploadError> {
        if declared == 0 {
            return Err(UploadError::InvalidParameters(ParamError::EmptyUpload));
        }
        if declared > self.config.max_image_bytes {
            return Err(UploadError::TooLarge {
                declared,
                max: self.config.max_image_bytes,
            });
        }

        let free = self.memory.free_bytes();
        let largest = self.memory.largest_free_block();
        let required = declared.saturating_add(self.config.effective_headroom(free, largest));
        if free < required || largest < declared {
            return Err(UploadError::OutOfMemory {
                required,
                available: free,
            });
        }

        UploadBuffer::try_with_capacity(declared).ok_or(UploadError::OutOfMemory {
            required,
            available: free,
        })
    }

    fn active(&mut self, ticket: UploadTicket) -> Result<&mut Receiving, UploadError> {
        match self.receiving.as_mut() {
            Some(r) if r.ticket == ticket => Ok(r),
            _ => Err(UploadError::NotInProgress),
        }
    }

    /// Drop the receiving buffer and return to `Idle`
    fn abort(&mut self) {
        self.receiving = None;
        self.shared.abort();
    }

    /// Copy `bytes` at the running offset of the active upload
    pub fn append_chunk(&mut self, ticket: UploadTicket, bytes: &[u8]) -> Result<(), UploadError> {
        let now = self.clock.now_ms();
        let receiving = self.active(ticket)?;
        if !receiving.buffer.append(bytes) {
            let err = UploadError::TooLarge {
                declared: receiving.buffer.len().saturating_add(bytes.len()),
                max: receiving.declared,
            };
            self.abort();
            return Err(err);
        }
        receiving.last_activity_ms = now;
        Ok(())
    }

    /// Validate the received bytes and publish the pending operation
    pub fn complete(&mut self, ticket: UploadTicket) -> UploadResult {
        self.active(ticket)?;
        let Some(receiving) = self.receiving.take() else {
            return Err(UploadError::NotInProgress);
        };
        match self.publish(receiving) {
            Ok(accepted) => Ok(accepted),
            Err(e) => {
                self.shared.abort();
                Err(e)
            }
        }
    }

    fn publish(&self, receiving: Receiving) -> UploadResult {
        let Receiving {
            kind,
            buffer,
            declared,
            timeout_ms,
            ..
        } = receiving;

        if buffer.len() != declared {
            return Err(UploadError::Incomplete {
                expected: declared,
                received: buffer.len(),
            });
        }
        if !is_jpeg_magic(buffer.as_slice()) {
            return Err(UploadError::InvalidFormat);
        }

        let start_ms = self.clock.now_ms();
        match kind {
            ReceivingKind::Image => {
                preflight_image(buffer.as_slice(), self.surface.width, self.surface.height)
                    .map_err(UploadError::Preflight)?;
                let op_id = self.shared.publish(PendingOp::Image(PendingImageOp {
                    buffer,
                    timeout_ms,
                    start_ms,
                }));
                Ok(Accepted {
                    op_id,
                    timeout_ms,
                    kind: AcceptedKind::Image,
                })
            }
            ReceivingKind::Strip(req) => {
                preflight_fragment(buffer.as_slice(), req.width, req.height, self.surface.height)
                    .map_err(UploadError::Preflight)?;
                // Admission refused strips while one was pending and only this
                // manager publishes while an upload is in progress
                debug_assert!(!self.shared.has_pending_strip());
                let op_id = self.shared.publish(PendingOp::Strip(PendingStripOp {
                    buffer,
                    strip_index: req.strip_index,
                    strip_count: req.strip_count,
                    image_width: req.width,
                    image_height: req.height,
                    timeout_ms,
                    start_ms,
                }));
                Ok(Accepted {
                    op_id,
                    timeout_ms,
                    kind: AcceptedKind::Strip {
                        index: req.strip_index,
                        count: req.strip_count,
                        complete: req.strip_index + 1 == req.strip_count,
                    },
                })
            }
        }
    }

    /// Take the current image off the screen; callable at any time.
    ///
    /// Any upload being received is dropped.
    pub fn dismiss(&mut self) -> OperationId {
        self.receiving = None;
        self.shared.publish(PendingOp::Dismiss)
    }

    /// Drop the upload owned by a request the client walked away from.
    ///
    /// Returns true when an upload was dropped. A request whose upload was
    /// already replaced or swept leaves the current one alone.
    pub fn abandon(&mut self, ctx: &RequestContext) -> bool {
        let Some(ticket) = ctx.ticket else {
            return false;
        };
        if self.active(ticket).is_err() {
            return false;
        }
        self.abort();
        true
    }

    /// Drop an upload that has not seen a chunk for `stale_upload_ms`
    pub fn sweep_stale(&mut self) -> bool {
        let now = self.clock.now_ms();
        let stale = match &self.receiving {
            Some(r) => now.wrapping_sub(r.last_activity_ms) >= self.config.stale_upload_ms,
            None => false,
        };
        if stale {
            self.abort();
        }
        stale
    }

    /// Feed one chunk of a request body.
    ///
    /// `offset` is the byte position of `bytes` within the body and
    /// `declared_total` the body length announced by the client. The upload
    /// is admitted on the first chunk and completed on the final one. After a
    /// rejection the remaining chunks are drained and the rejection is
    /// reported on the final chunk.
    pub fn on_chunk(
        &mut self,
        ctx: &mut RequestContext,
        offset: usize,
        bytes: &[u8],
        is_final: bool,
        declared_total: usize,
    ) -> ChunkOutcome {
        if let Some(err) = ctx.rejected {
            return Self::finish_rejected(err, is_final);
        }

        let ticket = match ctx.ticket {
            Some(ticket) => ticket,
            None if offset == 0 => {
                let begun = match ctx.request {
                    UploadRequest::Image { timeout_s } => self.begin_image(declared_total, timeout_s),
                    UploadRequest::Strip(req) => self.begin_strip(req, declared_total),
                };
                match begun {
                    Ok(ticket) => {
                        ctx.ticket = Some(ticket);
                        ticket
                    }
                    Err(e) => return Self::reject(ctx, e, is_final),
                }
            }
            None => return Self::reject(ctx, UploadError::NotInProgress, is_final),
        };

        if offset != ctx.received {
            let err = UploadError::Incomplete {
                expected: declared_total,
                received: ctx.received,
            };
            if self.active(ticket).is_ok() {
                self.abort();
            }
            return Self::reject(ctx, err, is_final);
        }

        if !bytes.is_empty() {
            if let Err(e) = self.append_chunk(ticket, bytes) {
                return Self::reject(ctx, e, is_final);
            }
            ctx.received += bytes.len();
        }

        if is_final {
            ChunkOutcome::Done(self.complete(ticket))
        } else {
            ChunkOutcome::Continue
        }
    }

    fn reject(ctx: &mut RequestContext, err: UploadError, is_final: bool) -> ChunkOutcome {
        ctx.rejected = Some(err);
        Self::finish_rejected(err, is_final)
    }

    fn finish_rejected(err: UploadError, is_final: bool) -> ChunkOutcome {
        if is_final {
            ChunkOutcome::Done(Err(err))
        } else {
            ChunkOutcome::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::state::UploadState;
    use core::cell::Cell;
    use proptest::prelude::*;
    use std::vec::Vec;
    use strata_jpeg::testutil::JpegBuilder;
    use strata_jpeg::PreflightError;

    struct FixedMemory {
        free: usize,
        largest: usize,
    }

    impl MemoryStats for FixedMemory {
        fn free_bytes(&self) -> usize {
            self.free
        }

        fn largest_free_block(&self) -> usize {
            self.largest
        }
    }

    #[derive(Default)]
    struct ManualClock(Cell<u32>);

    impl Clock for ManualClock {
        fn now_ms(&self) -> u32 {
            self.0.get()
        }
    }

    const SURFACE: Size = Size::new(240, 320);

    fn plenty() -> FixedMemory {
        FixedMemory {
            free: 1 << 20,
            largest: 1 << 20,
        }
    }

    fn manager<'a>(shared: &'a SharedUpload, clock: &'a ManualClock) -> UploadManager<'a, FixedMemory, &'a ManualClock> {
        UploadManager::new(shared, UploadConfig::default(), SURFACE, plenty(), clock)
    }

    fn gray(width: u16, height: u16) -> Vec<u8> {
        JpegBuilder::grayscale(width, height).build(|_, _| (128, 128, 128))
    }

    fn strip(index: u16, count: u16) -> StripRequest {
        StripRequest {
            strip_index: index,
            strip_count: count,
            width: 240,
            height: 320,
            timeout_s: None,
        }
    }

    #[test]
    fn test_whole_image_accepted() {
        let shared = SharedUpload::new();
        let clock = ManualClock::default();
        let mut mgr = manager(&shared, &clock);
        let jpeg = gray(16, 16);

        let ticket = mgr.begin_image(jpeg.len(), Some(5)).unwrap();
        assert_eq!(shared.state(), UploadState::InProgress);
        let (a, b) = jpeg.split_at(10);
        mgr.append_chunk(ticket, a).unwrap();
        mgr.append_chunk(ticket, b).unwrap();
        let accepted = mgr.complete(ticket).unwrap();

        assert_eq!(accepted.kind, AcceptedKind::Image);
        assert_eq!(accepted.timeout_ms, 5_000);
        assert_eq!(accepted.op_id, OperationId::new(1));
        assert_eq!(shared.state(), UploadState::ReadyToDisplay);
        assert!(!mgr.is_receiving());
    }

    #[test]
    fn test_second_upload_busy() {
        let shared = SharedUpload::new();
        let clock = ManualClock::default();
        let mut mgr = manager(&shared, &clock);
        mgr.begin_image(100, None).unwrap();
        assert_eq!(mgr.begin_image(100, None), Err(UploadError::Busy));
        assert_eq!(shared.state(), UploadState::InProgress);
    }

    #[test]
    fn test_too_large() {
        let shared = SharedUpload::new();
        let clock = ManualClock::default();
        let mut mgr = manager(&shared, &clock);
        let err = mgr.begin_image(200 * 1024, None).unwrap_err();
        assert_eq!(
            err,
            UploadError::TooLarge {
                declared: 200 * 1024,
                max: 128 * 1024
            }
        );
        assert_eq!(shared.state(), UploadState::Idle);
    }

    #[test]
    fn test_out_of_memory_before_allocation() {
        let shared = SharedUpload::new();
        let clock = ManualClock::default();
        let memory = FixedMemory {
            free: 60 * 1024,
            largest: 60 * 1024,
        };
        let mut mgr = UploadManager::new(&shared, UploadConfig::default(), SURFACE, memory, &clock);

        // 20 KiB + 48 KiB headroom does not fit in 60 KiB
        let err = mgr.begin_image(20 * 1024, None).unwrap_err();
        assert_eq!(
            err,
            UploadError::OutOfMemory {
                required: 68 * 1024,
                available: 60 * 1024
            }
        );
        assert_eq!(shared.state(), UploadState::Idle);
        assert!(!mgr.is_receiving());
    }

    #[test]
    fn test_fragmented_heap_rejected() {
        let shared = SharedUpload::new();
        let clock = ManualClock::default();
        let memory = FixedMemory {
            free: 1 << 20,
            largest: 8 * 1024,
        };
        let mut mgr = UploadManager::new(&shared, UploadConfig::default(), SURFACE, memory, &clock);
        assert!(matches!(
            mgr.begin_image(10 * 1024, None),
            Err(UploadError::OutOfMemory { .. })
        ));
    }

    #[test]
    fn test_empty_declaration() {
        let shared = SharedUpload::new();
        let clock = ManualClock::default();
        let mut mgr = manager(&shared, &clock);
        assert_eq!(
            mgr.begin_image(0, None),
            Err(UploadError::InvalidParameters(ParamError::EmptyUpload))
        );
        assert_eq!(shared.state(), UploadState::Idle);
    }

    #[test]
    fn test_incomplete_upload_returns_idle() {
        let shared = SharedUpload::new();
        let clock = ManualClock::default();
        let mut mgr = manager(&shared, &clock);
        let ticket = mgr.begin_image(1000, None).unwrap();
        mgr.append_chunk(ticket, &[0xFF; 900]).unwrap();
        assert_eq!(
            mgr.complete(ticket),
            Err(UploadError::Incomplete {
                expected: 1000,
                received: 900
            })
        );
        assert_eq!(shared.state(), UploadState::Idle);
        assert!(!mgr.is_receiving());
    }

    #[test]
    fn test_overrun_aborts() {
        let shared = SharedUpload::new();
        let clock = ManualClock::default();
        let mut mgr = manager(&shared, &clock);
        let ticket = mgr.begin_image(4, None).unwrap();
        mgr.append_chunk(ticket, &[1, 2, 3]).unwrap();
        assert_eq!(
            mgr.append_chunk(ticket, &[4, 5]),
            Err(UploadError::TooLarge { declared: 5, max: 4 })
        );
        assert_eq!(shared.state(), UploadState::Idle);
        assert_eq!(mgr.append_chunk(ticket, &[4]), Err(UploadError::NotInProgress));
    }

    #[test]
    fn test_bad_magic() {
        let shared = SharedUpload::new();
        let clock = ManualClock::default();
        let mut mgr = manager(&shared, &clock);
        let ticket = mgr.begin_image(4, None).unwrap();
        mgr.append_chunk(ticket, b"GIF8").unwrap();
        assert_eq!(mgr.complete(ticket), Err(UploadError::InvalidFormat));
        assert_eq!(shared.state(), UploadState::Idle);
    }

    #[test]
    fn test_preflight_rejects_oversized_image() {
        let shared = SharedUpload::new();
        let clock = ManualClock::default();
        let mut mgr = manager(&shared, &clock);
        let jpeg = gray(256, 8);
        let ticket = mgr.begin_image(jpeg.len(), None).unwrap();
        mgr.append_chunk(ticket, &jpeg).unwrap();
        assert_eq!(
            mgr.complete(ticket),
            Err(UploadError::Preflight(PreflightError::TooWide { width: 256, max: 240 }))
        );
        assert_eq!(shared.state(), UploadState::Idle);
    }

    #[test]
    fn test_strip_index_rejected_before_allocation() {
        let shared = SharedUpload::new();
        let clock = ManualClock::default();
        let memory = FixedMemory { free: 0, largest: 0 };
        let mut mgr = UploadManager::new(&shared, UploadConfig::default(), SURFACE, memory, &clock);
        assert_eq!(
            mgr.begin_strip(strip(5, 3), 100),
            Err(UploadError::InvalidParameters(ParamError::StripIndex { index: 5, count: 3 }))
        );
        assert_eq!(shared.state(), UploadState::Idle);
    }

    #[test]
    fn test_strip_dimensions_checked() {
        let shared = SharedUpload::new();
        let clock = ManualClock::default();
        let mut mgr = manager(&shared, &clock);
        let mut req = strip(0, 2);
        req.width = 241;
        assert!(matches!(
            mgr.begin_strip(req, 100),
            Err(UploadError::InvalidParameters(ParamError::Dimensions { .. }))
        ));
        req.width = 240;
        req.height = 0;
        assert!(matches!(
            mgr.begin_strip(req, 100),
            Err(UploadError::InvalidParameters(ParamError::Dimensions { .. }))
        ));
    }

    #[test]
    fn test_back_to_back_strips_busy() {
        let shared = SharedUpload::new();
        let clock = ManualClock::default();
        let mut mgr = manager(&shared, &clock);
        let jpeg = gray(240, 16);

        let ticket = mgr.begin_strip(strip(0, 2), jpeg.len()).unwrap();
        mgr.append_chunk(ticket, &jpeg).unwrap();
        let accepted = mgr.complete(ticket).unwrap();
        assert_eq!(
            accepted.kind,
            AcceptedKind::Strip {
                index: 0,
                count: 2,
                complete: false
            }
        );

        // Strip 0 has not been rendered yet
        assert_eq!(mgr.begin_strip(strip(1, 2), jpeg.len()), Err(UploadError::Busy));
        assert!(shared.has_pending_strip());
    }

    #[test]
    fn test_next_strip_admitted_once_taken() {
        let shared = SharedUpload::new();
        let clock = ManualClock::default();
        let mut mgr = manager(&shared, &clock);
        let jpeg = gray(240, 16);

        let ticket = mgr.begin_strip(strip(0, 2), jpeg.len()).unwrap();
        mgr.append_chunk(ticket, &jpeg).unwrap();
        mgr.complete(ticket).unwrap();

        let (id, op) = shared.take_ready(OperationId::ZERO).unwrap();
        assert!(matches!(op, PendingOp::Strip(PendingStripOp { strip_index: 0, .. })));
        assert!(!shared.has_pending_strip());
        assert!(shared.finish(id));

        let ticket = mgr.begin_strip(strip(1, 2), jpeg.len()).unwrap();
        mgr.append_chunk(ticket, &jpeg).unwrap();
        let accepted = mgr.complete(ticket).unwrap();
        assert_eq!(
            accepted.kind,
            AcceptedKind::Strip {
                index: 1,
                count: 2,
                complete: true
            }
        );
        assert_eq!(accepted.op_id, id.next());
        assert!(shared.has_pending_strip());
    }

    #[test]
    fn test_strip_width_must_match() {
        let shared = SharedUpload::new();
        let clock = ManualClock::default();
        let mut mgr = manager(&shared, &clock);
        let jpeg = gray(200, 16);
        let ticket = mgr.begin_strip(strip(0, 1), jpeg.len()).unwrap();
        mgr.append_chunk(ticket, &jpeg).unwrap();
        assert_eq!(
            mgr.complete(ticket),
            Err(UploadError::Preflight(PreflightError::WidthMismatch {
                width: 200,
                expected: 240
            }))
        );
    }

    #[test]
    fn test_dismiss_drops_receiving_upload() {
        let shared = SharedUpload::new();
        let clock = ManualClock::default();
        let mut mgr = manager(&shared, &clock);
        let ticket = mgr.begin_image(100, None).unwrap();
        let id = mgr.dismiss();
        assert_eq!(id, OperationId::new(1));
        assert_eq!(shared.state(), UploadState::ReadyToDisplay);
        assert_eq!(mgr.append_chunk(ticket, &[0]), Err(UploadError::NotInProgress));
    }

    #[test]
    fn test_stale_sweep() {
        let shared = SharedUpload::new();
        let clock = ManualClock::default();
        let mut mgr = manager(&shared, &clock);
        let ticket = mgr.begin_image(100, None).unwrap();
        clock.0.set(29_999);
        assert!(!mgr.sweep_stale());
        mgr.append_chunk(ticket, &[0xFF]).unwrap();
        clock.0.set(29_999 + 30_000);
        assert!(mgr.sweep_stale());
        assert_eq!(shared.state(), UploadState::Idle);
        assert!(!mgr.sweep_stale());
    }

    #[test]
    fn test_abandon_frees_slot() {
        let shared = SharedUpload::new();
        let clock = ManualClock::default();
        let mut mgr = manager(&shared, &clock);
        let jpeg = gray(24, 8);
        let mut ctx = RequestContext::new(UploadRequest::Image { timeout_s: None });
        let outcome = mgr.on_chunk(&mut ctx, 0, &jpeg[..4], false, jpeg.len());
        assert_eq!(outcome, ChunkOutcome::Continue);
        assert!(mgr.is_receiving());

        // A fresh request that never began owns nothing
        assert!(!mgr.abandon(&RequestContext::new(UploadRequest::Image { timeout_s: None })));
        assert!(mgr.is_receiving());

        assert!(mgr.abandon(&ctx));
        assert!(!mgr.is_receiving());
        assert_eq!(shared.state(), UploadState::Idle);
        assert!(!mgr.abandon(&ctx));
        assert!(mgr.begin_image(100, None).is_ok());
    }

    #[test]
    fn test_chunked_request_accepted() {
        let shared = SharedUpload::new();
        let clock = ManualClock::default();
        let mut mgr = manager(&shared, &clock);
        let jpeg = gray(24, 8);
        let mut ctx = RequestContext::new(UploadRequest::Image { timeout_s: None });

        let mut offset = 0;
        let mut outcome = ChunkOutcome::Continue;
        for chunk in jpeg.chunks(7) {
            let is_final = offset + chunk.len() == jpeg.len();
            outcome = mgr.on_chunk(&mut ctx, offset, chunk, is_final, jpeg.len());
            offset += chunk.len();
        }
        assert!(matches!(outcome, ChunkOutcome::Done(Ok(_))));
        assert_eq!(ctx.received(), jpeg.len());
    }

    #[test]
    fn test_chunked_rejection_is_sticky() {
        let shared = SharedUpload::new();
        let clock = ManualClock::default();
        let mut mgr = manager(&shared, &clock);
        let mut ctx = RequestContext::new(UploadRequest::Strip(strip(5, 3)));

        assert_eq!(mgr.on_chunk(&mut ctx, 0, &[0xFF; 10], false, 20), ChunkOutcome::Continue);
        assert_eq!(
            mgr.on_chunk(&mut ctx, 10, &[0xFF; 10], true, 20),
            ChunkOutcome::Done(Err(UploadError::InvalidParameters(ParamError::StripIndex {
                index: 5,
                count: 3
            })))
        );
        assert_eq!(shared.state(), UploadState::Idle);
    }

    #[test]
    fn test_chunked_offset_gap_aborts() {
        let shared = SharedUpload::new();
        let clock = ManualClock::default();
        let mut mgr = manager(&shared, &clock);
        let mut ctx = RequestContext::new(UploadRequest::Image { timeout_s: None });

        mgr.on_chunk(&mut ctx, 0, &[0xFF; 10], false, 30);
        assert_eq!(
            mgr.on_chunk(&mut ctx, 20, &[0xFF; 10], true, 30),
            ChunkOutcome::Done(Err(UploadError::Incomplete {
                expected: 30,
                received: 10
            }))
        );
        assert_eq!(shared.state(), UploadState::Idle);
    }

    #[test]
    fn test_chunked_short_body() {
        let shared = SharedUpload::new();
        let clock = ManualClock::default();
        let mut mgr = manager(&shared, &clock);
        let mut ctx = RequestContext::new(UploadRequest::Image { timeout_s: None });
        mgr.on_chunk(&mut ctx, 0, &[0xFF; 500], false, 1000);
        assert_eq!(
            mgr.on_chunk(&mut ctx, 500, &[0xFF; 400], true, 1000),
            ChunkOutcome::Done(Err(UploadError::Incomplete {
                expected: 1000,
                received: 900
            }))
        );
        assert_eq!(shared.state(), UploadState::Idle);
    }

    #[derive(Debug, Clone)]
    enum Action {
        BeginImage(usize),
        Append(usize),
        Complete,
        Dismiss,
        Consume,
    }

    fn action() -> impl Strategy<Value = Action> {
        prop_oneof![
            (0usize..300).prop_map(Action::BeginImage),
            (0usize..200).prop_map(Action::Append),
            Just(Action::Complete),
            Just(Action::Dismiss),
            Just(Action::Consume),
        ]
    }

    proptest! {
        #[test]
        fn prop_at_most_one_upload_in_flight(actions in proptest::collection::vec(action(), 1..40)) {
            let shared = SharedUpload::new();
            let clock = ManualClock::default();
            let mut mgr = manager(&shared, &clock);
            let mut ticket = None;
            let mut consumed = OperationId::ZERO;

            for action in actions {
                match action {
                    Action::BeginImage(len) => {
                        let was_idle = shared.state() == UploadState::Idle;
                        match mgr.begin_image(len, None) {
                            Ok(t) => {
                                prop_assert!(was_idle);
                                ticket = Some(t);
                            }
                            Err(UploadError::Busy) => prop_assert!(!was_idle),
                            Err(_) => prop_assert_eq!(shared.state(), UploadState::Idle),
                        }
                    }
                    Action::Append(len) => {
                        if let Some(t) = ticket {
                            let _ = mgr.append_chunk(t, &std::vec![0xFF; len]);
                        }
                    }
                    Action::Complete => {
                        if let Some(t) = ticket.take() {
                            let _ = mgr.complete(t);
                            prop_assert_ne!(shared.state(), UploadState::InProgress);
                        }
                    }
                    Action::Dismiss => {
                        mgr.dismiss();
                        prop_assert_eq!(shared.state(), UploadState::ReadyToDisplay);
                    }
                    Action::Consume => {
                        if let Some((id, _)) = shared.take_ready(consumed) {
                            consumed = id;
                            prop_assert!(shared.finish(id));
                        }
                    }
                }
                prop_assert_eq!(mgr.is_receiving(), shared.state() == UploadState::InProgress);
            }
        }
    }
}
