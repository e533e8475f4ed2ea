//! Configuration type definitions
//!
//! Defaults reproduce the behaviour the actuator shipped with; a config
//! file only needs to mention what differs.

use core::fmt;

use torqvalve_protocol::control::MAX_ID;
use torqvalve_protocol::baud_code;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Servo link configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ServoConfig {
    /// Baud rate of the half-duplex line
    pub baud_rate: u32,
    /// Servo id on the bus
    pub id: u8,
    /// Wait between the end of a request and reading the reply (ms)
    pub settle_ms: u32,
    /// Maximum torque written at boot, fraction of full scale
    pub max_torque: f32,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            id: 1,
            settle_ms: 100,
            max_torque: 1.0,
        }
    }
}

/// Motion and stall detection configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MotionConfig {
    /// Wheel speed while opening, `[-1, 1]`
    pub opening_speed: f32,
    /// Wheel speed while closing, `[-1, 1]`
    pub closing_speed: f32,
    /// Absolute load fraction that counts as pushing against the seat
    pub torque_threshold: f32,
    /// Consecutive over-threshold samples that end a motion
    pub validation_count: u8,
    /// Hard limit on one motion (ms)
    pub timeout_ms: u32,
    /// Load sample period (ms)
    pub sample_period_ms: u32,
    /// Time the fault is shown after a timeout (ms)
    pub emergency_hold_ms: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            opening_speed: -0.9,
            closing_speed: 0.9,
            torque_threshold: 0.7,
            validation_count: 4,
            timeout_ms: 7_000,
            sample_period_ms: 500,
            emergency_hold_ms: 1_500,
        }
    }
}

/// Button configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ButtonConfig {
    /// How long either button must stay pressed before it counts (ms)
    pub hold_ms: u32,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self { hold_ms: 2_000 }
    }
}

/// Complete actuator configuration
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ValveConfig {
    pub servo: ServoConfig,
    pub motion: MotionConfig,
    pub buttons: ButtonConfig,
}

/// Configuration rejected by [`ValveConfig::validate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Baud rate has no servo baud code
    UnsupportedBaud(u32),
    /// Id is broadcast or out of range
    InvalidServoId(u8),
    /// Max torque outside (0, 1]
    TorqueOutOfRange,
    /// A speed is zero or outside [-1, 1]
    SpeedOutOfRange,
    /// Threshold outside (0, 1]
    ThresholdOutOfRange,
    /// Validation count of zero
    ZeroValidationCount,
    /// Sample period shorter than one request/reply exchange
    SamplePeriodTooShort,
    /// Timeout does not leave room for a single sample
    TimeoutTooShort,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnsupportedBaud(baud) => write!(f, "unsupported baud rate {}", baud),
            ConfigError::InvalidServoId(id) => write!(f, "invalid servo id {}", id),
            ConfigError::TorqueOutOfRange => write!(f, "max_torque must be in (0, 1]"),
            ConfigError::SpeedOutOfRange => write!(f, "speeds must be non-zero and in [-1, 1]"),
            ConfigError::ThresholdOutOfRange => write!(f, "torque_threshold must be in (0, 1]"),
            ConfigError::ZeroValidationCount => write!(f, "validation_count must be at least 1"),
            ConfigError::SamplePeriodTooShort => {
                write!(f, "sample_period_ms must cover settle_ms")
            }
            ConfigError::TimeoutTooShort => write!(f, "timeout_ms must exceed sample_period_ms"),
        }
    }
}

fn in_unit_interval(value: f32) -> bool {
    value > 0.0 && value <= 1.0
}

fn valid_speed(value: f32) -> bool {
    (-1.0..=1.0).contains(&value) && value != 0.0
}

impl ValveConfig {
    /// Check ranges and the relations between fields
    pub fn validate(&self) -> Result<(), ConfigError> {
        if baud_code(self.servo.baud_rate).is_none() {
            return Err(ConfigError::UnsupportedBaud(self.servo.baud_rate));
        }
        if self.servo.id > MAX_ID {
            return Err(ConfigError::InvalidServoId(self.servo.id));
        }
        if !in_unit_interval(self.servo.max_torque) {
            return Err(ConfigError::TorqueOutOfRange);
        }

        let motion = &self.motion;
        if !valid_speed(motion.opening_speed) || !valid_speed(motion.closing_speed) {
            return Err(ConfigError::SpeedOutOfRange);
        }
        if !in_unit_interval(motion.torque_threshold) {
            return Err(ConfigError::ThresholdOutOfRange);
        }
        if motion.validation_count == 0 {
            return Err(ConfigError::ZeroValidationCount);
        }
        if motion.sample_period_ms == 0 || motion.sample_period_ms < self.servo.settle_ms {
            return Err(ConfigError::SamplePeriodTooShort);
        }
        if motion.timeout_ms <= motion.sample_period_ms {
            return Err(ConfigError::TimeoutTooShort);
        }
        Ok(())
    }
}
