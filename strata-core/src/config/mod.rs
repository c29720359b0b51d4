//! Configuration types
//!
//! Board-level settings are embedded in the firmware as TOML and parsed at
//! boot into these structures; anything missing keeps its default.

pub mod hardware;
pub mod toml;
pub mod types;

pub use hardware::*;
pub use toml::{parse_board_config, ParseError};
pub use types::*;

/// Complete board configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoardConfig {
    pub display: DisplayHwConfig,
    pub backlight: BacklightConfig,
    pub upload: UploadConfig,
}
