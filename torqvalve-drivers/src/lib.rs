//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in torqvalve-core on top of the HAL traits in torqvalve-hal:
//!
//! - Half-duplex serial transport (interrupt capture queue + echo check)
//! - AX-12 servo codec and derived register operations
//! - Maintenance utilities (factory reset sweep, baud reprogramming)
//! - Two-LED indicator renderer

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod indicator;
pub mod serial;
pub mod servo;
