//! Half-duplex serial transport
//!
//! One wire carries both directions. Received bytes are captured by the
//! UART interrupt into a [`CaptureQueue`]; transmitted bytes are confirmed
//! through their loopback echo.

pub mod capture;
pub mod half_duplex;

pub use capture::CaptureQueue;
pub use half_duplex::{HalfDuplexSerial, LineFault, Transport};
