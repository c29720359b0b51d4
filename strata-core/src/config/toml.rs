//! Minimal TOML parser for the board configuration
//!
//! Handles only the subset the board file uses, not the full TOML
//! language.
//!
//! Supported features:
//! - `[section]` headers
//! - `key = value` pairs (string, integer, boolean)
//! - `_` digit separators in integers
//! - Comments (`# ...`), including trailing ones
//!
//! Keys not listed below are ignored so newer board files still load.
//!
//! ```toml
//! [display]
//! driver = "st7789"      # st7789 | ili9341 | axs15231b
//! width = 240
//! height = 320
//! rotation = 90          # degrees
//! x_offset = 0
//! y_offset = 0
//! invert = true
//! bgr = false
//! spi_hz = 62_500_000
//!
//! [backlight]
//! pwm = true
//! active_low = false
//! duty_min = 10
//! duty_max = 255
//! brightness = 80
//!
//! [upload]
//! max_image_bytes = 131072
//! decode_headroom_bytes = 49152
//! headroom_policy = "fragmentation_aware"   # or "fixed"
//! default_timeout_s = 10
//! max_timeout_s = 3600
//! stale_upload_s = 30
//! color_order = "rgb565"                     # or "bgr565"
//! ```

use core::fmt;
use core::str::FromStr;

use super::{BoardConfig, DriverKind, HeadroomPolicy};
use crate::color::ColorOrder;
use crate::traits::display::Rotation;

/// Parse error with the 1-based line it occurred on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Malformed or unknown section header
    InvalidSection { line: usize },
    /// Line is neither a header nor `key = value`
    InvalidLine { line: usize },
    /// Value has the wrong type or cannot be parsed
    InvalidValue { line: usize },
    /// Value parsed but is not allowed for this key
    OutOfRange { line: usize },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidSection { line } => write!(f, "line {}: invalid section", line),
            ParseError::InvalidLine { line } => write!(f, "line {}: expected key = value", line),
            ParseError::InvalidValue { line } => write!(f, "line {}: invalid value", line),
            ParseError::OutOfRange { line } => write!(f, "line {}: value out of range", line),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Display,
    Backlight,
    Upload,
}

/// Parse a board file; anything not present keeps its default
pub fn parse_board_config(input: &str) -> Result<BoardConfig, ParseError> {
    let mut config = BoardConfig::default();
    let mut section = Section::Root;

    for (index, raw) in input.lines().enumerate() {
        let line_no = index + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix('[') {
            let name = header
                .strip_suffix(']')
                .ok_or(ParseError::InvalidSection { line: line_no })?;
            section = match name.trim() {
                "display" => Section::Display,
                "backlight" => Section::Backlight,
                "upload" => Section::Upload,
                _ => return Err(ParseError::InvalidSection { line: line_no }),
            };
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::InvalidLine { line: line_no })?;
        let value = Value { raw: value, line: line_no };
        match section {
            Section::Root => {}
            Section::Display => apply_display(&mut config, key, value)?,
            Section::Backlight => apply_backlight(&mut config, key, value)?,
            Section::Upload => apply_upload(&mut config, key, value)?,
        }
    }

    Ok(config)
}

fn apply_display(config: &mut BoardConfig, key: &str, value: Value<'_>) -> Result<(), ParseError> {
    let display = &mut config.display;
    match key {
        "driver" => {
            display.driver = DriverKind::from_name(value.string()?).ok_or(value.out_of_range())?;
        }
        "width" => display.width = value.nonzero()?,
        "height" => display.height = value.nonzero()?,
        "rotation" => {
            display.rotation = match value.int::<u16>()? {
                0 => Rotation::Deg0,
                90 => Rotation::Deg90,
                180 => Rotation::Deg180,
                270 => Rotation::Deg270,
                _ => return Err(value.out_of_range()),
            };
        }
        "x_offset" => display.x_offset = value.int()?,
        "y_offset" => display.y_offset = value.int()?,
        "invert" => display.invert = value.bool()?,
        "bgr" => display.bgr = value.bool()?,
        "spi_hz" => display.spi_hz = value.nonzero()?,
        _ => {}
    }
    Ok(())
}

fn apply_backlight(config: &mut BoardConfig, key: &str, value: Value<'_>) -> Result<(), ParseError> {
    let backlight = &mut config.backlight;
    match key {
        "pwm" => backlight.pwm = value.bool()?,
        "active_low" => backlight.active_low = value.bool()?,
        "duty_min" => backlight.duty_min = value.int()?,
        "duty_max" => backlight.duty_max = value.int()?,
        "brightness" => {
            let percent: u8 = value.int()?;
            if percent > 100 {
                return Err(value.out_of_range());
            }
            backlight.brightness = percent;
        }
        _ => {}
    }
    Ok(())
}

fn apply_upload(config: &mut BoardConfig, key: &str, value: Value<'_>) -> Result<(), ParseError> {
    let upload = &mut config.upload;
    match key {
        "max_image_bytes" => upload.max_image_bytes = value.nonzero()?,
        "decode_headroom_bytes" => upload.decode_headroom_bytes = value.int()?,
        "headroom_policy" => {
            upload.headroom_policy = match value.string()? {
                "fixed" => HeadroomPolicy::Fixed,
                "fragmentation_aware" => HeadroomPolicy::FragmentationAware,
                _ => return Err(value.out_of_range()),
            };
        }
        "default_timeout_s" => upload.default_timeout_ms = value.seconds()?,
        "max_timeout_s" => upload.max_timeout_ms = value.seconds()?,
        "stale_upload_s" => upload.stale_upload_ms = value.seconds()?,
        "color_order" => {
            upload.color_order = match value.string()? {
                "rgb565" => ColorOrder::Rgb565,
                "bgr565" => ColorOrder::Bgr565,
                _ => return Err(value.out_of_range()),
            };
        }
        _ => {}
    }
    Ok(())
}

/// Drop a trailing `# comment` that is not inside a string
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Raw value text plus its line for error reporting
#[derive(Clone, Copy)]
struct Value<'a> {
    raw: &'a str,
    line: usize,
}

impl<'a> Value<'a> {
    fn invalid(&self) -> ParseError {
        ParseError::InvalidValue { line: self.line }
    }

    fn out_of_range(&self) -> ParseError {
        ParseError::OutOfRange { line: self.line }
    }

    fn string(&self) -> Result<&'a str, ParseError> {
        self.raw
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .ok_or(self.invalid())
    }

    fn bool(&self) -> Result<bool, ParseError> {
        match self.raw {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(self.invalid()),
        }
    }

    fn int<T: FromStr>(&self) -> Result<T, ParseError> {
        let mut digits = [0u8; 24];
        let mut len = 0;
        for b in self.raw.bytes().filter(|&b| b != b'_') {
            if len == digits.len() {
                return Err(self.invalid());
            }
            digits[len] = b;
            len += 1;
        }
        let text = core::str::from_utf8(&digits[..len]).map_err(|_| self.invalid())?;
        // Rejects negatives for unsigned targets and values that do not fit
        text.parse().map_err(|_| self.invalid())
    }

    fn nonzero<T: FromStr + Default + PartialEq>(&self) -> Result<T, ParseError> {
        let v: T = self.int()?;
        if v == T::default() {
            return Err(self.out_of_range());
        }
        Ok(v)
    }

    fn seconds(&self) -> Result<u32, ParseError> {
        let s: u32 = self.int()?;
        s.checked_mul(1000).ok_or(self.out_of_range())
    }
}
