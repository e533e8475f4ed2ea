//! Hardware abstraction traits
//!
//! These traits define the interface between the application logic
//! and hardware-specific implementations.

pub mod indicator;
pub mod servo;

pub use indicator::{Indicator, IndicatorPattern};
pub use servo::ValveServo;
