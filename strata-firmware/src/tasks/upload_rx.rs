//! Upload link receive task
//!
//! The network-facing context. Parses frames from the bridge, feeds upload
//! chunks to the [`UploadManager`] and queues one status reply per request.
//! Never decodes or touches the display: finished uploads are handed to
//! the render task through the shared upload slot.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::uart::BufferedUartRx;
use embassy_time::{Duration, Timer};
use embedded_io_async::Read;

use strata_core::upload::{
    ChunkOutcome, RequestContext, StatusCode, StripRequest, UploadManager, UploadRequest, UploadResult,
};
use strata_protocol::{BridgeMessage, FrameParser, McuMessage};

use super::upload_tx::queue_reply;
use crate::channels::RENDER_WAKE;
use crate::system::{HeapStats, UptimeClock};

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 64;

/// How often an idle link checks for abandoned uploads
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

pub type LinkUploadManager = UploadManager<'static, HeapStats, UptimeClock>;

/// Request currently streaming over the link
struct LinkRequest {
    ctx: RequestContext,
    declared: usize,
}

#[embassy_executor::task]
pub async fn upload_rx_task(mut rx: BufferedUartRx, mut manager: LinkUploadManager) {
    info!("Upload RX task started");

    let mut parser = FrameParser::new();
    let mut buf = [0u8; RX_BUF_SIZE];
    let mut request: Option<LinkRequest> = None;

    loop {
        match select(rx.read(&mut buf), Timer::after(SWEEP_INTERVAL)).await {
            Either::First(Ok(n)) => {
                trace!("RX: {} bytes", n);
                for &byte in &buf[..n] {
                    match parser.feed(byte) {
                        Ok(Some(frame)) => match BridgeMessage::from_frame(&frame) {
                            Ok(msg) => handle_message(msg, &mut manager, &mut request),
                            Err(e) => warn!("Failed to parse bridge message: {:?}", e),
                        },
                        Ok(None) => {}
                        Err(e) => warn!("Frame parse error: {:?}", e),
                    }
                }
            }
            Either::First(Err(e)) => warn!("UART read error: {:?}", e),
            Either::Second(()) => {}
        }

        if manager.sweep_stale() {
            warn!("Dropped stale upload after {} ms without data", manager.config().stale_upload_ms);
        }
    }
}

fn handle_message(msg: BridgeMessage<'_>, manager: &mut LinkUploadManager, request: &mut Option<LinkRequest>) {
    match msg {
        BridgeMessage::BeginImage { total_len, timeout_s } => {
            debug!("Begin image: {} bytes", total_len);
            start_request(manager, request, UploadRequest::Image { timeout_s }, total_len);
        }
        BridgeMessage::BeginStrip {
            total_len,
            strip_index,
            strip_count,
            width,
            height,
            timeout_s,
        } => {
            debug!("Begin strip {}/{}: {} bytes", strip_index, strip_count, total_len);
            let strip = StripRequest {
                strip_index,
                strip_count,
                width,
                height,
                timeout_s,
            };
            start_request(manager, request, UploadRequest::Strip(strip), total_len);
        }
        BridgeMessage::Chunk { offset, last, data } => {
            let Some(active) = request.as_mut() else {
                warn!("Chunk at {} without a request", offset);
                if last {
                    reply_status(StatusCode::NotInProgress, 0);
                }
                return;
            };
            let outcome = manager.on_chunk(&mut active.ctx, offset as usize, data, last, active.declared);
            if let ChunkOutcome::Done(result) = outcome {
                *request = None;
                finish_request(result);
            }
        }
        BridgeMessage::Dismiss => {
            // Dismiss drops any upload in flight
            *request = None;
            let op_id = manager.dismiss();
            info!("Dismiss queued as op {}", op_id.value());
            RENDER_WAKE.signal(());
            reply_status(StatusCode::Accepted, op_id.value());
        }
        BridgeMessage::Ping => {
            trace!("PING received");
            queue_reply(McuMessage::Pong);
        }
    }
}

fn start_request(
    manager: &mut LinkUploadManager,
    request: &mut Option<LinkRequest>,
    upload: UploadRequest,
    total_len: u32,
) {
    if let Some(previous) = request.take() {
        if manager.abandon(&previous.ctx) {
            warn!("New request before the previous one finished; dropped it");
        }
    }
    *request = Some(LinkRequest {
        ctx: RequestContext::new(upload),
        declared: total_len as usize,
    });
}

fn finish_request(result: UploadResult) {
    match result {
        Ok(accepted) => {
            info!("Upload accepted as op {}: {:?}", accepted.op_id.value(), accepted.kind);
            RENDER_WAKE.signal(());
            reply_status(StatusCode::Accepted, accepted.op_id.value());
        }
        Err(e) => {
            warn!("Upload rejected: {}", Display2Format(&e));
            reply_status(e.status(), 0);
        }
    }
}

fn reply_status(code: StatusCode, op_id: u32) {
    queue_reply(McuMessage::Status {
        code: code.as_u8(),
        op_id,
    });
}
