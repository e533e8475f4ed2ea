//! Board-agnostic core logic for the valve actuator firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Hardware abstraction traits (servo, indicator)
//! - State machine for valve motion
//! - Stall detection on the servo's reported load
//! - Button hold filtering into open/close intents
//! - The valve controller tying them together
//! - Configuration types and the text config parser
//!
//! Time is passed in explicitly as milliseconds since boot, so every piece
//! here runs unchanged on the host under test.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod config;
pub mod input;
pub mod safety;
pub mod state;
pub mod traits;
pub mod valve;

pub use config::ValveConfig;
pub use state::{Event, State};
pub use valve::{Transition, ValveController};
