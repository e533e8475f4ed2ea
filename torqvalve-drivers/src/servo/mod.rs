//! Servo drivers
//!
//! - AX-12 register operations over the half-duplex link
//! - Broadcast maintenance helpers (factory reset, baud reprogramming)

pub mod ax12;
pub mod maintenance;

pub use ax12::{Ax12, Error, ServoMode, WriteMode};
pub use maintenance::{factory_reset_sweep, reprogram_baud, LinkFactory, BASE_BAUD};
