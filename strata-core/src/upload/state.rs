//! Shared upload state
//!
//! The only state both contexts touch. Every access is a short
//! read-modify-write inside one critical section; chunk copying and
//! decoding never happen under the lock.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use super::buffer::UploadBuffer;
use super::error::UploadError;

/// Upload lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UploadState {
    /// Ready to accept a new upload
    Idle,
    /// Bytes are being received
    InProgress,
    /// A pending operation waits for the dispatcher
    ReadyToDisplay,
}

/// Monotonic operation counter (wrapping)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OperationId(u32);

impl OperationId {
    pub const ZERO: Self = Self(0);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Render a complete image
#[derive(Debug, PartialEq, Eq)]
pub struct PendingImageOp {
    pub buffer: UploadBuffer,
    pub timeout_ms: u32,
    pub start_ms: u32,
}

/// Render one strip of a larger image
#[derive(Debug, PartialEq, Eq)]
pub struct PendingStripOp {
    pub buffer: UploadBuffer,
    pub strip_index: u16,
    pub strip_count: u16,
    /// Full image size; used to start the session on strip 0
    pub image_width: u16,
    pub image_height: u16,
    pub timeout_ms: u32,
    pub start_ms: u32,
}

/// Work handed from the network context to the rendering context
#[derive(Debug, PartialEq, Eq)]
pub enum PendingOp {
    Image(PendingImageOp),
    Strip(PendingStripOp),
    /// Take the current image off the screen
    Dismiss,
}

struct UploadSlot {
    state: UploadState,
    op_id: OperationId,
    pending: Option<PendingOp>,
}

/// Upload state shared between the network and rendering contexts
pub struct SharedUpload {
    slot: Mutex<CriticalSectionRawMutex, RefCell<UploadSlot>>,
}

impl Default for SharedUpload {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedUpload {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(RefCell::new(UploadSlot {
                state: UploadState::Idle,
                op_id: OperationId::ZERO,
                pending: None,
            })),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut UploadSlot) -> R) -> R {
        self.slot.lock(|cell| f(&mut cell.borrow_mut()))
    }

    pub fn state(&self) -> UploadState {
        self.with(|s| s.state)
    }

    pub fn op_id(&self) -> OperationId {
        self.with(|s| s.op_id)
    }

    /// A strip operation is published but not yet taken by the dispatcher
    pub fn has_pending_strip(&self) -> bool {
        self.with(|s| matches!(s.pending, Some(PendingOp::Strip(_))))
    }

    /// `Idle -> InProgress`, or `Busy`
    pub(crate) fn begin(&self, strip: bool) -> Result<(), UploadError> {
        self.with(|s| {
            let strip_blocked = strip && matches!(s.pending, Some(PendingOp::Strip(_)));
            if s.state != UploadState::Idle || strip_blocked {
                return Err(UploadError::Busy);
            }
            s.state = UploadState::InProgress;
            Ok(())
        })
    }

    /// `InProgress -> Idle` after a rejection or stale sweep
    pub(crate) fn abort(&self) {
        self.with(|s| {
            if s.state == UploadState::InProgress {
                s.state = UploadState::Idle;
            }
        })
    }

    /// Replace any pending operation with `op`, advance the id and mark ready.
    ///
    /// The replaced operation (and its buffer) is dropped outside the lock.
    pub(crate) fn publish(&self, op: PendingOp) -> OperationId {
        let (id, replaced) = self.with(|s| {
            let replaced = s.pending.replace(op);
            s.op_id = s.op_id.next();
            s.state = UploadState::ReadyToDisplay;
            (s.op_id, replaced)
        });
        drop(replaced);
        id
    }

    /// Take the pending operation if it is newer than `last_consumed`.
    ///
    /// A ready state with nothing pending is invalid and resets to `Idle`.
    pub(crate) fn take_ready(&self, last_consumed: OperationId) -> Option<(OperationId, PendingOp)> {
        self.with(|s| {
            if s.state != UploadState::ReadyToDisplay || s.op_id == last_consumed {
                return None;
            }
            match s.pending.take() {
                Some(op) => Some((s.op_id, op)),
                None => {
                    s.state = UploadState::Idle;
                    None
                }
            }
        })
    }

    /// `ReadyToDisplay -> Idle` unless a newer operation arrived meanwhile
    pub(crate) fn finish(&self, consumed: OperationId) -> bool {
        self.with(|s| {
            if s.state == UploadState::ReadyToDisplay && s.op_id == consumed && s.pending.is_none() {
                s.state = UploadState::Idle;
                true
            } else {
                false
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_only_from_idle() {
        let shared = SharedUpload::new();
        assert!(shared.begin(false).is_ok());
        assert_eq!(shared.state(), UploadState::InProgress);
        assert_eq!(shared.begin(false), Err(UploadError::Busy));
        shared.abort();
        assert_eq!(shared.state(), UploadState::Idle);
    }

    #[test]
    fn test_publish_replaces_and_advances() {
        let shared = SharedUpload::new();
        let a = shared.publish(PendingOp::Dismiss);
        let b = shared.publish(PendingOp::Dismiss);
        assert_eq!(a, OperationId::new(1));
        assert_eq!(b, OperationId::new(2));
        assert_eq!(shared.state(), UploadState::ReadyToDisplay);

        let (id, op) = shared.take_ready(OperationId::ZERO).unwrap();
        assert_eq!(id, b);
        assert_eq!(op, PendingOp::Dismiss);
        assert!(shared.finish(id));
        assert_eq!(shared.state(), UploadState::Idle);
    }

    #[test]
    fn test_same_id_not_taken_twice() {
        let shared = SharedUpload::new();
        let id = shared.publish(PendingOp::Dismiss);
        assert!(shared.take_ready(id).is_none());
    }

    #[test]
    fn test_finish_keeps_newer_operation() {
        let shared = SharedUpload::new();
        let first = shared.publish(PendingOp::Dismiss);
        let (taken, _) = shared.take_ready(OperationId::ZERO).unwrap();
        assert_eq!(taken, first);

        // A dismiss arrives while the first op is being rendered
        let second = shared.publish(PendingOp::Dismiss);
        assert!(!shared.finish(first));
        assert_eq!(shared.state(), UploadState::ReadyToDisplay);
        assert_eq!(shared.take_ready(first).map(|(id, _)| id), Some(second));
    }

    #[test]
    fn test_ready_without_op_resets() {
        let shared = SharedUpload::new();
        let id = shared.publish(PendingOp::Dismiss);
        shared.take_ready(OperationId::ZERO);
        // Pretend the dispatcher forgot what it consumed
        assert!(shared.take_ready(OperationId::ZERO).is_none());
        assert_eq!(shared.state(), UploadState::Idle);
        assert!(!shared.finish(id));
    }
}
