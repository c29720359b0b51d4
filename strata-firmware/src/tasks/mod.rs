//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod render;
pub mod upload_rx;
pub mod upload_tx;

pub use render::render_task;
pub use upload_rx::upload_rx_task;
pub use upload_tx::upload_tx_task;
