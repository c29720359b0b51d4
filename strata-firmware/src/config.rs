//! Board configuration loading
//!
//! The board file is compiled into the firmware (and validated by
//! build.rs); a parse failure here means the embedded copy and the parser
//! disagree, so the built-in defaults are used instead.

use defmt::*;

use strata_core::config::{parse_board_config, BoardConfig};

/// Embedded board configuration
/// Edit board.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../board.toml");

pub fn load_board_config() -> BoardConfig {
    match parse_board_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Parsed embedded board configuration");
            log_config_summary(&config);
            config
        }
        Err(e) => {
            warn!("board.toml {}: using defaults", Display2Format(&e));
            BoardConfig::default()
        }
    }
}

fn log_config_summary(config: &BoardConfig) {
    let visible = config.display.visible_size();
    info!(
        "Display: {:?} {}x{} rotation {:?}",
        config.display.driver, visible.width, visible.height, config.display.rotation
    );
    debug!(
        "Upload: max {} bytes, headroom {} ({:?}), timeout {} ms",
        config.upload.max_image_bytes,
        config.upload.decode_headroom_bytes,
        config.upload.headroom_policy,
        config.upload.default_timeout_ms
    );
}
