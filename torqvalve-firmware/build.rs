//! Build script for torqvalve-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates valve.toml at compile time, with the same parser the
//!   firmware runs at boot as the final word

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use torqvalve_core::ValveConfig;

/// Rates the servo can be set to: 2_000_000 / (code + 1)
const SUPPORTED_BAUD: [i64; 9] = [
    1_000_000, 500_000, 400_000, 250_000, 200_000, 115_200, 57_600, 19_200, 9_600,
];

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

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate valve.toml at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=valve.toml");

    let config_path = Path::new("valve.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: valve.toml not found!                                    ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds valve.toml as its configuration.            ║\n\
            ║  Please create one in the torqvalve-firmware directory.          ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read valve.toml                                ║\n\
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
                ║  ERROR: Invalid TOML syntax in valve.toml                        ║\n\
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
    validate_keys(&config, &mut errors);
    validate_servo(&config, &mut errors);
    validate_motion(&config, &mut errors);

    // Anything the firmware would reject at boot must fail the build
    if errors.is_empty() {
        if let Err(e) = torqvalve_core::config::parse_config(&config_content) {
            errors.push(format!("firmware parser: {}", e));
        }
    }

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid valve configuration                              ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=valve.toml validated successfully");
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

/// Known sections and their keys
const KNOWN_KEYS: [(&str, &[&str]); 3] = [
    ("servo", &["baud_rate", "id", "settle_ms", "max_torque"]),
    (
        "motion",
        &[
            "opening_speed",
            "closing_speed",
            "torque_threshold",
            "validation_count",
            "timeout_ms",
            "sample_period_ms",
            "emergency_hold_ms",
        ],
    ),
    ("buttons", &["hold_ms"]),
];

/// Reject unknown sections and keys; the firmware parser would too
fn validate_keys(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(root) = config.as_table() else {
        return;
    };

    for (section, value) in root {
        let Some((_, keys)) = KNOWN_KEYS.iter().find(|(name, _)| *name == section.as_str()) else {
            errors.push(format!("unknown section [{}]", section));
            continue;
        };
        let Some(table) = value.as_table() else {
            errors.push(format!("[{}] must be a table", section));
            continue;
        };
        for key in table.keys() {
            if !keys.contains(&key.as_str()) {
                errors.push(format!("[{}] unknown key '{}'", section, key));
            }
        }
    }
}

fn get<'a>(config: &'a toml::Value, section: &str, key: &str) -> Option<&'a toml::Value> {
    config.get(section).and_then(|s| s.get(key))
}

/// Integer value of a key, or its built-in default when absent
fn integer_or(config: &toml::Value, section: &str, key: &str, default: u32) -> Option<i64> {
    match get(config, section, key) {
        Some(value) => value.as_integer(),
        None => Some(i64::from(default)),
    }
}

/// Numeric value as f64, accepting integers where a float is expected
fn number(value: &toml::Value) -> Option<f64> {
    match value {
        toml::Value::Integer(i) => Some(*i as f64),
        toml::Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn validate_servo(config: &toml::Value, errors: &mut Vec<String>) {
    if let Some(baud) = get(config, "servo", "baud_rate") {
        match baud.as_integer() {
            Some(b) if SUPPORTED_BAUD.contains(&b) => {}
            _ => errors.push("[servo] baud_rate is not a servo baud rate".to_string()),
        }
    }

    if let Some(id) = get(config, "servo", "id") {
        match id.as_integer() {
            Some(0..=253) => {}
            _ => errors.push("[servo] id must be 0-253".to_string()),
        }
    }

    if let Some(torque) = get(config, "servo", "max_torque") {
        match number(torque) {
            Some(t) if t > 0.0 && t <= 1.0 => {}
            _ => errors.push("[servo] max_torque must be in (0, 1]".to_string()),
        }
    }
}

fn validate_motion(config: &toml::Value, errors: &mut Vec<String>) {
    for key in ["opening_speed", "closing_speed"] {
        if let Some(speed) = get(config, "motion", key) {
            match number(speed) {
                Some(s) if (-1.0..=1.0).contains(&s) && s != 0.0 => {}
                _ => errors.push(format!("[motion] {} must be non-zero, -1.0 to 1.0", key)),
            }
        }
    }

    if let Some(threshold) = get(config, "motion", "torque_threshold") {
        match number(threshold) {
            Some(t) if t > 0.0 && t <= 1.0 => {}
            _ => errors.push("[motion] torque_threshold must be in (0, 1]".to_string()),
        }
    }

    if let Some(count) = get(config, "motion", "validation_count") {
        match count.as_integer() {
            Some(1..=255) => {}
            _ => errors.push("[motion] validation_count must be 1-255".to_string()),
        }
    }

    let defaults = ValveConfig::default();
    let settle = integer_or(config, "servo", "settle_ms", defaults.servo.settle_ms);
    let period = integer_or(config, "motion", "sample_period_ms", defaults.motion.sample_period_ms);
    let timeout = integer_or(config, "motion", "timeout_ms", defaults.motion.timeout_ms);

    if let (Some(settle), Some(period)) = (settle, period) {
        if period == 0 || period < settle {
            errors.push("[motion] sample_period_ms must cover settle_ms".to_string());
        }
    }
    if let (Some(timeout), Some(period)) = (timeout, period) {
        if timeout <= period {
            errors.push("[motion] timeout_ms must exceed sample_period_ms".to_string());
        }
    }
}
