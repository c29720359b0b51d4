//! Upload link transmit task
//!
//! Sends status replies and heartbeat responses to the network bridge.

use defmt::*;
use embassy_rp::uart::BufferedUartTx;
use embedded_io_async::Write;

use strata_protocol::{McuMessage, MAX_FRAME_SIZE};

use crate::channels::UPLOAD_REPLIES;

#[embassy_executor::task]
pub async fn upload_tx_task(mut tx: BufferedUartTx) {
    info!("Upload TX task started");

    let mut buf = [0u8; MAX_FRAME_SIZE];
    loop {
        let msg = UPLOAD_REPLIES.receive().await;
        let len = match msg.to_frame().and_then(|frame| frame.encode(&mut buf)) {
            Ok(len) => len,
            Err(e) => {
                warn!("Failed to encode reply {:?}: {:?}", msg, e);
                continue;
            }
        };
        match tx.write_all(&buf[..len]).await {
            Ok(()) => trace!("TX {:?}", msg),
            Err(e) => warn!("UART write error: {:?}", e),
        }
    }
}

/// Queue a reply, dropping it if the link is backed up
pub fn queue_reply(msg: McuMessage) {
    if UPLOAD_REPLIES.try_send(msg).is_err() {
        warn!("Reply channel full, dropping {:?}", msg);
    }
}
