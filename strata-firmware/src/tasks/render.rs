//! Render task
//!
//! Owns the display. Wakes when the upload side publishes an operation or
//! on a short tick, runs one dispatcher pass, expires timed-out images and
//! pushes buffered frames to the panel.

use core::sync::atomic::Ordering;

use defmt::*;
use embassy_futures::select::select;
use embassy_time::{Duration, Instant, Ticker};

use strata_core::config::BoardConfig;
use strata_core::dispatch::{DispatchOutcome, Dispatcher};
use strata_core::traits::{DisplayDriver, RenderMode};
use strata_display::DirectImageScreen;

use crate::channels::{EXCLUSIVE_OPERATION, RENDER_WAKE, SHARED_UPLOAD};
use crate::display::AnyDisplay;

/// Idle tick for timeouts and deferred operations
const RENDER_TICK: Duration = Duration::from_millis(20);

#[embassy_executor::task]
pub async fn render_task(mut display: AnyDisplay, config: BoardConfig) {
    info!("Render task started");

    if let Err(e) = display.init() {
        warn!("Display init failed: {:?}", e);
    }
    display.set_backlight_brightness(config.backlight.brightness);
    display.set_backlight(true);
    info!(
        "Display {}x{} ({:?})",
        display.width(),
        display.height(),
        display.render_mode()
    );

    let mut screen = DirectImageScreen::new(display);
    let mut dispatcher = Dispatcher::new(config.upload.color_order);
    let mut ticker = Ticker::every(RENDER_TICK);

    loop {
        let exclusive = EXCLUSIVE_OPERATION.load(Ordering::Acquire);
        match dispatcher.process_pending(&SHARED_UPLOAD, &mut screen, exclusive).await {
            DispatchOutcome::Idle => {}
            DispatchOutcome::Deferred => trace!("Operation deferred"),
            DispatchOutcome::Dismissed => info!("Image dismissed"),
            DispatchOutcome::Rendered {
                strip_index,
                strip_count,
                rows,
                complete,
            } => {
                debug!("Strip {}/{}: {} rows", strip_index + 1, strip_count, rows);
                if complete {
                    info!("Image complete");
                }
            }
            DispatchOutcome::SessionFailed(e) => warn!("Image session failed: {:?}", e),
            DispatchOutcome::DecodeFailed(e) => warn!("Decode failed: {:?}", e),
        }

        let now = Instant::now().as_millis() as u32;
        screen.poll_timeout(now);

        let driver = screen.driver_mut();
        if driver.render_mode() == RenderMode::Buffered && driver.needs_present() {
            if let Err(e) = driver.present() {
                warn!("Present failed: {:?}", e);
            }
        }

        select(RENDER_WAKE.wait(), ticker.next()).await;
    }
}
