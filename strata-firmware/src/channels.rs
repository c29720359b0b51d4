//! Inter-task communication
//!
//! Statics shared between the network-facing upload task and the render
//! task. Uses embassy-sync primitives plus the upload slot from
//! `strata-core`.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use portable_atomic::AtomicBool;

use strata_core::upload::SharedUpload;
use strata_protocol::McuMessage;

/// Channel capacity for replies to the bridge
const REPLY_CHANNEL_SIZE: usize = 4;

/// Upload state and the single pending render operation
pub static SHARED_UPLOAD: SharedUpload = SharedUpload::new();

/// Replies queued for the bridge (status codes, pongs)
pub static UPLOAD_REPLIES: Channel<CriticalSectionRawMutex, McuMessage, REPLY_CHANNEL_SIZE> =
    Channel::new();

/// Wake the render task early after an operation was published
pub static RENDER_WAKE: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Set while a firmware-wide exclusive operation owns the system;
/// the render task defers pending operations until it clears
pub static EXCLUSIVE_OPERATION: AtomicBool = AtomicBool::new(false);
