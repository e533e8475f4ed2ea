//! torqvalve Hardware Abstraction Layer
//!
//! This crate defines the hardware traits the drivers are written against,
//! so the servo link and the indicator logic can be exercised on the host
//! and implemented by the RP2040 firmware.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  torqvalve-firmware (RP2040 bindings)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  torqvalve-drivers (transport, AX-12)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  torqvalve-hal (this crate - traits)    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`] - Digital outputs (indicator LEDs)
//! - [`uart::SingleWireUart`], [`uart::RxFifo`] - Half-duplex serial line

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use gpio::OutputPin;
pub use uart::{RxFifo, SingleWireUart, UartConfig};
