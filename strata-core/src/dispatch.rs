//! Deferred dispatcher
//!
//! Called once per iteration of the rendering context. Takes the latest
//! pending operation out of [`SharedUpload`] and renders it through an
//! [`ImageScreen`]. Never runs in the network context.

use crate::color::ColorOrder;
use crate::traits::screen::{ImageScreen, StripError};
use crate::upload::{OperationId, PendingOp, SharedUpload, UploadState};

/// What one dispatcher pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchOutcome {
    /// Nothing new to render
    Idle,
    /// An exclusive operation is running; try again next pass
    Deferred,
    /// Image taken off the screen
    Dismissed,
    /// Strip (or whole image) drawn
    Rendered {
        strip_index: u16,
        strip_count: u16,
        rows: u16,
        /// Last strip of the image
        complete: bool,
    },
    /// Screen refused to start a session; image hidden
    SessionFailed(StripError),
    /// Strip decode failed; image hidden
    DecodeFailed(StripError),
}

/// Render-context consumer of pending operations
#[derive(Debug)]
pub struct Dispatcher {
    last_consumed: OperationId,
    color_order: ColorOrder,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(ColorOrder::default())
    }
}

impl Dispatcher {
    pub const fn new(color_order: ColorOrder) -> Self {
        Self {
            last_consumed: OperationId::ZERO,
            color_order,
        }
    }

    /// Id of the last operation taken out of the shared slot
    pub fn last_consumed(&self) -> OperationId {
        self.last_consumed
    }

    /// Consume and render the pending operation, if any.
    ///
    /// `exclusive` is set while a firmware-wide exclusive operation runs;
    /// the operation then stays queued.
    pub async fn process_pending<S: ImageScreen>(
        &mut self,
        shared: &SharedUpload,
        screen: &mut S,
        exclusive: bool,
    ) -> DispatchOutcome {
        if shared.state() != UploadState::ReadyToDisplay {
            return DispatchOutcome::Idle;
        }
        if exclusive {
            return DispatchOutcome::Deferred;
        }
        let Some((id, op)) = shared.take_ready(self.last_consumed) else {
            return DispatchOutcome::Idle;
        };
        self.last_consumed = id;

        let outcome = match op {
            PendingOp::Dismiss => {
                screen.hide_current_image();
                DispatchOutcome::Dismissed
            }
            PendingOp::Image(op) => {
                let surface = screen.surface_size();
                match screen.begin_strip_session(surface.width, surface.height, op.timeout_ms, op.start_ms) {
                    Ok(()) => self.render(screen, op.buffer.as_slice(), 0, 1).await,
                    Err(e) => Self::session_failed(screen, e),
                }
            }
            PendingOp::Strip(op) => {
                let begun = if op.strip_index == 0 {
                    screen.begin_strip_session(op.image_width, op.image_height, op.timeout_ms, op.start_ms)
                } else {
                    Ok(())
                };
                match begun {
                    Ok(()) => {
                        self.render(screen, op.buffer.as_slice(), op.strip_index, op.strip_count)
                            .await
                    }
                    Err(e) => Self::session_failed(screen, e),
                }
            }
        };

        shared.finish(id);
        outcome
    }

    async fn render<S: ImageScreen>(
        &self,
        screen: &mut S,
        data: &[u8],
        strip_index: u16,
        strip_count: u16,
    ) -> DispatchOutcome {
        match screen.decode_strip(data, strip_index, self.color_order).await {
            Ok(rows) => DispatchOutcome::Rendered {
                strip_index,
                strip_count,
                rows,
                complete: strip_index + 1 == strip_count,
            },
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("strip {}/{} decode failed: {}", strip_index, strip_count, e);
                screen.hide_current_image();
                DispatchOutcome::DecodeFailed(e)
            }
        }
    }

    fn session_failed<S: ImageScreen>(screen: &mut S, err: StripError) -> DispatchOutcome {
        #[cfg(feature = "defmt")]
        defmt::warn!("image session failed: {}", err);
        screen.hide_current_image();
        DispatchOutcome::SessionFailed(err)
    }
}
