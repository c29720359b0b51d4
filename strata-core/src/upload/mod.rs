//! Upload session state machine
//!
//! The network context feeds chunks into an [`UploadManager`]. On a
//! validated completion the manager publishes one [`PendingOp`] into the
//! [`SharedUpload`] slot, where the rendering context picks it up.
//!
//! ```text
//!            begin (admitted)             complete (valid)
//!   Idle ─────────────────────▶ InProgress ──────────────────▶ ReadyToDisplay
//!    ▲                              │                               │
//!    └──────── any rejection ───────┘                               │
//!    └──────────────────── dispatcher consumed ─────────────────────┘
//! ```

pub mod buffer;
pub mod error;
pub mod manager;
pub mod state;

pub use buffer::UploadBuffer;
pub use error::{ParamError, StatusCode, UploadError};
pub use manager::{
    Accepted, AcceptedKind, ChunkOutcome, RequestContext, StripRequest, UploadManager,
    UploadRequest, UploadResult, UploadTicket,
};
pub use state::{
    OperationId, PendingImageOp, PendingOp, PendingStripOp, SharedUpload, UploadState,
};
