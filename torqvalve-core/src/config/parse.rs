//! Simple TOML parser for the actuator configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! the valve config. It does NOT support the full TOML spec.
//!
//! Supported features:
//! - Key = value pairs (integer, float)
//! - `[servo]`, `[motion]` and `[buttons]` section headers
//! - Underscore digit separators in integers (`115_200`)
//! - Comments (# ...)

use core::fmt;
use core::str::FromStr;

use heapless::String;

use super::types::{ConfigError, ValveConfig};

/// Longest numeric literal accepted
const MAX_NUMBER_LEN: usize = 24;

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header (line number)
    InvalidSection(usize),
    /// Key not known in its section (line number)
    UnknownKey(usize),
    /// Value does not parse as the key's type (line number)
    InvalidValue(usize),
    /// Line is neither a header nor `key = value` (line number)
    MalformedLine(usize),
    /// Syntax fine, values rejected by validation
    Invalid(ConfigError),
}

impl From<ConfigError> for ParseError {
    fn from(e: ConfigError) -> Self {
        ParseError::Invalid(e)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidSection(line) => write!(f, "line {}: invalid section", line),
            ParseError::UnknownKey(line) => write!(f, "line {}: unknown key", line),
            ParseError::InvalidValue(line) => write!(f, "line {}: invalid value", line),
            ParseError::MalformedLine(line) => write!(f, "line {}: expected key = value", line),
            ParseError::Invalid(e) => write!(f, "{}", e),
        }
    }
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Servo,
    Motion,
    Buttons,
}

/// Parse TOML configuration into a validated [`ValveConfig`]
///
/// Keys that are not mentioned keep their default value.
pub fn parse_config(input: &str) -> Result<ValveConfig, ParseError> {
    let mut config = ValveConfig::default();
    let mut section = Section::Root;

    for (index, line) in input.lines().enumerate() {
        let line_no = index + 1;
        let line = strip_comment(line).trim();

        // Skip empty lines and comments
        if line.is_empty() {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = parse_section_header(&line[1..line.len() - 1])
                .ok_or(ParseError::InvalidSection(line_no))?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::MalformedLine(line_no))?;
        apply_value(&mut config, section, key, value, line_no)?;
    }

    config.validate()?;
    Ok(config)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn parse_section_header(header: &str) -> Option<Section> {
    match header.trim() {
        "servo" => Some(Section::Servo),
        "motion" => Some(Section::Motion),
        "buttons" => Some(Section::Buttons),
        _ => None,
    }
}

/// Parse "key = value" line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

fn apply_value(
    config: &mut ValveConfig,
    section: Section,
    key: &str,
    value: &str,
    line: usize,
) -> Result<(), ParseError> {
    let servo = &mut config.servo;
    let motion = &mut config.motion;

    match (section, key) {
        (Section::Servo, "baud_rate") => servo.baud_rate = parse_number(value, line)?,
        (Section::Servo, "id") => servo.id = parse_number(value, line)?,
        (Section::Servo, "settle_ms") => servo.settle_ms = parse_number(value, line)?,
        (Section::Servo, "max_torque") => servo.max_torque = parse_number(value, line)?,

        (Section::Motion, "opening_speed") => motion.opening_speed = parse_number(value, line)?,
        (Section::Motion, "closing_speed") => motion.closing_speed = parse_number(value, line)?,
        (Section::Motion, "torque_threshold") => {
            motion.torque_threshold = parse_number(value, line)?
        }
        (Section::Motion, "validation_count") => {
            motion.validation_count = parse_number(value, line)?
        }
        (Section::Motion, "timeout_ms") => motion.timeout_ms = parse_number(value, line)?,
        (Section::Motion, "sample_period_ms") => {
            motion.sample_period_ms = parse_number(value, line)?
        }
        (Section::Motion, "emergency_hold_ms") => {
            motion.emergency_hold_ms = parse_number(value, line)?
        }

        (Section::Buttons, "hold_ms") => config.buttons.hold_ms = parse_number(value, line)?,

        _ => return Err(ParseError::UnknownKey(line)),
    }
    Ok(())
}

/// Parse an integer or float, ignoring `_` separators
fn parse_number<T: FromStr>(value: &str, line: usize) -> Result<T, ParseError> {
    let mut digits: String<MAX_NUMBER_LEN> = String::new();
    for c in value.chars().filter(|&c| c != '_') {
        digits.push(c).map_err(|_| ParseError::InvalidValue(line))?;
    }
    digits.parse().map_err(|_| ParseError::InvalidValue(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_gives_defaults() {
        assert_eq!(parse_config(""), Ok(ValveConfig::default()));
        assert_eq!(
            parse_config("# nothing here\n\n"),
            Ok(ValveConfig::default())
        );
    }

    #[test]
    fn test_full_config() {
        let input = r#"
# Valve actuator
[servo]
baud_rate = 57_600
id = 3
settle_ms = 50      # faster servo
max_torque = 0.8

[motion]
opening_speed = 0.5
closing_speed = -0.5
torque_threshold = 0.6
validation_count = 3
timeout_ms = 9000
sample_period_ms = 250
emergency_hold_ms = 0

[buttons]
hold_ms = 500
"#;
        let config = parse_config(input).unwrap();
        assert_eq!(config.servo.baud_rate, 57_600);
        assert_eq!(config.servo.id, 3);
        assert_eq!(config.servo.settle_ms, 50);
        assert_eq!(config.servo.max_torque, 0.8);
        assert_eq!(config.motion.opening_speed, 0.5);
        assert_eq!(config.motion.closing_speed, -0.5);
        assert_eq!(config.motion.torque_threshold, 0.6);
        assert_eq!(config.motion.validation_count, 3);
        assert_eq!(config.motion.timeout_ms, 9_000);
        assert_eq!(config.motion.sample_period_ms, 250);
        assert_eq!(config.motion.emergency_hold_ms, 0);
        assert_eq!(config.buttons.hold_ms, 500);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = parse_config("[motion]\ntimeout_ms = 10_000\n").unwrap();
        assert_eq!(config.motion.timeout_ms, 10_000);
        assert_eq!(config.motion.sample_period_ms, 500);
        assert_eq!(config.servo, ValveConfig::default().servo);
    }

    #[test]
    fn test_syntax_errors_carry_line() {
        assert_eq!(
            parse_config("[servo]\n[heater]\n"),
            Err(ParseError::InvalidSection(2))
        );
        assert_eq!(
            parse_config("[servo]\nspeed = 1\n"),
            Err(ParseError::UnknownKey(2))
        );
        assert_eq!(
            parse_config("id = 1\n"),
            Err(ParseError::UnknownKey(1))
        );
        assert_eq!(
            parse_config("[servo]\n\nid = many\n"),
            Err(ParseError::InvalidValue(3))
        );
        assert_eq!(
            parse_config("[servo]\nid = 300\n"),
            Err(ParseError::InvalidValue(2))
        );
        assert_eq!(
            parse_config("[buttons]\nhold_ms\n"),
            Err(ParseError::MalformedLine(2))
        );
    }

    #[test]
    fn test_validation_runs_after_parse() {
        assert_eq!(
            parse_config("[motion]\nvalidation_count = 0\n"),
            Err(ParseError::Invalid(ConfigError::ZeroValidationCount))
        );
    }

    #[test]
    fn test_rejects_zero_torque_zero_speed_and_long_settle() {
        assert_eq!(
            parse_config("[servo]\nmax_torque = 0.0\n"),
            Err(ParseError::Invalid(ConfigError::TorqueOutOfRange))
        );
        assert_eq!(
            parse_config("[motion]\nopening_speed = 0.0\n"),
            Err(ParseError::Invalid(ConfigError::SpeedOutOfRange))
        );
        assert_eq!(
            parse_config("[servo]\nsettle_ms = 600\n"),
            Err(ParseError::Invalid(ConfigError::SamplePeriodTooShort))
        );
    }

    #[test]
    fn test_firmware_config_file_parses() {
        let shipped = include_str!("../../../torqvalve-firmware/valve.toml");
        assert_eq!(parse_config(shipped), Ok(ValveConfig::default()));
    }
}
