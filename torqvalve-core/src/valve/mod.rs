//! Valve actuator control
//!
//! Ties the state machine, the stall detector and the motion timers to a
//! concrete servo.

pub mod controller;

pub use controller::{Transition, ValveController};
