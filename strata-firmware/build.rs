//! Build script for strata-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates board.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate board.toml at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=board.toml");

    let config_path = Path::new("board.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: board.toml not found!                                    ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds board.toml for its display and upload       ║\n\
            ║  settings. Create one in the strata-firmware directory.          ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read board.toml                                ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in board.toml                        ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_required_sections(&config, &mut errors);
    validate_display(&config, &mut errors);
    validate_backlight(&config, &mut errors);
    validate_upload(&config, &mut errors);
    report("Invalid board configuration", &errors);

    println!("cargo:warning=board.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn report(title: &str, errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        errors
            .iter()
            .map(|e| format!("║  • {:<62} ║", e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

fn validate_required_sections(config: &toml::Value, errors: &mut Vec<String>) {
    for section in ["display", "upload"] {
        match config.get(section) {
            Some(toml::Value::Table(_)) => {}
            Some(_) => errors.push(format!("[{}] must be a table", section)),
            None => errors.push(format!("Missing [{}] section", section)),
        }
    }
    if let Some(table) = config.as_table() {
        for key in table.keys() {
            if !["display", "backlight", "upload"].contains(&key.as_str()) {
                errors.push(format!("Unknown section [{}]", key));
            }
        }
    }
}

fn int_in_range(table: &toml::Value, section: &str, key: &str, min: i64, max: i64, errors: &mut Vec<String>) {
    match table.get(key) {
        None => {}
        Some(toml::Value::Integer(v)) if (min..=max).contains(v) => {}
        Some(toml::Value::Integer(_)) => {
            errors.push(format!("[{}] {} must be {}-{}", section, key, min, max));
        }
        Some(_) => errors.push(format!("[{}] {} must be an integer", section, key)),
    }
}

fn string_in(table: &toml::Value, section: &str, key: &str, allowed: &[&str], errors: &mut Vec<String>) {
    match table.get(key) {
        None => {}
        Some(toml::Value::String(s)) if allowed.contains(&s.as_str()) => {}
        Some(_) => errors.push(format!("[{}] {} must be one of {}", section, key, allowed.join(", "))),
    }
}

fn is_bool(table: &toml::Value, section: &str, key: &str, errors: &mut Vec<String>) {
    if let Some(v) = table.get(key) {
        if !v.is_bool() {
            errors.push(format!("[{}] {} must be true or false", section, key));
        }
    }
}

fn validate_display(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(display) = config.get("display") else {
        return;
    };

    string_in(display, "display", "driver", &["st7789", "ili9341", "axs15231b"], errors);
    int_in_range(display, "display", "width", 1, 1024, errors);
    int_in_range(display, "display", "height", 1, 1024, errors);
    int_in_range(display, "display", "x_offset", 0, 1024, errors);
    int_in_range(display, "display", "y_offset", 0, 1024, errors);
    int_in_range(display, "display", "spi_hz", 1, 125_000_000, errors);
    is_bool(display, "display", "invert", errors);
    is_bool(display, "display", "bgr", errors);

    if let Some(rotation) = display.get("rotation") {
        match rotation.as_integer() {
            Some(0 | 90 | 180 | 270) => {}
            _ => errors.push("[display] rotation must be 0, 90, 180 or 270".to_string()),
        }
    }
}

fn validate_backlight(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(backlight) = config.get("backlight") else {
        return;
    };

    is_bool(backlight, "backlight", "pwm", errors);
    is_bool(backlight, "backlight", "active_low", errors);
    int_in_range(backlight, "backlight", "duty_min", 0, 255, errors);
    int_in_range(backlight, "backlight", "duty_max", 0, 255, errors);
    int_in_range(backlight, "backlight", "brightness", 0, 100, errors);

    let min = backlight.get("duty_min").and_then(|v| v.as_integer());
    let max = backlight.get("duty_max").and_then(|v| v.as_integer());
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            errors.push("[backlight] duty_min must not exceed duty_max".to_string());
        }
    }
}

fn validate_upload(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(upload) = config.get("upload") else {
        return;
    };

    // Keep an image plus decode headroom inside the 160 KiB firmware heap
    int_in_range(upload, "upload", "max_image_bytes", 1, 160 * 1024, errors);
    int_in_range(upload, "upload", "decode_headroom_bytes", 0, 160 * 1024, errors);
    int_in_range(upload, "upload", "default_timeout_s", 0, 86_400, errors);
    int_in_range(upload, "upload", "max_timeout_s", 0, 86_400, errors);
    int_in_range(upload, "upload", "stale_upload_s", 1, 3_600, errors);
    string_in(upload, "upload", "headroom_policy", &["fixed", "fragmentation_aware"], errors);
    string_in(upload, "upload", "color_order", &["rgb565", "bgr565"], errors);
}
