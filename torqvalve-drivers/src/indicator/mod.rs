//! Indicator drivers

pub mod led_pair;

pub use led_pair::{LedPair, FAULT_BLINK_MS, MOVING_BLINK_MS};
