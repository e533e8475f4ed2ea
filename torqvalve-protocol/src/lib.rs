//! AX-12 Servo Wire Protocol
//!
//! This crate defines the half-duplex request/response protocol spoken by
//! AX-12 class smart servos. It is pure data: framing, checksum, control
//! table addresses and unit conversions. Moving bytes over the wire is the
//! job of `torqvalve-drivers`.
//!
//! # Protocol Overview
//!
//! Instruction packet (controller → servo):
//! ```text
//! ┌───────────┬────┬────────┬─────────────┬──────────────┬──────────┐
//! │ 0xFF 0xFF │ ID │ LENGTH │ INSTRUCTION │ PARAMS       │ CHECKSUM │
//! │ 2B        │ 1B │ 1B     │ 1B          │ 0–16B        │ 1B       │
//! └───────────┴────┴────────┴─────────────┴──────────────┴──────────┘
//! ```
//!
//! Status packet (servo → controller):
//! ```text
//! ┌───────────┬────┬────────┬───────┬──────────────┬──────────┐
//! │ 0xFF 0xFF │ ID │ LENGTH │ ERROR │ PARAMS       │ CHECKSUM │
//! └───────────┴────┴────────┴───────┴──────────────┴──────────┘
//! ```
//!
//! LENGTH counts the instruction/error byte, the params and the checksum.
//! CHECKSUM is `!(ID + LENGTH + INSTRUCTION/ERROR + ΣPARAMS)` truncated to
//! a byte. Packets sent to [`BROADCAST_ID`] are never answered.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod control;
pub mod packet;
pub mod units;

pub use control::{baud_code, baud_from_code, reg, Instruction, BROADCAST_ID, STANDARD_BAUD_RATES};
pub use packet::{
    checksum, InstructionPacket, PacketError, StatusFlags, StatusPacket, StatusParser,
    HEADER_BYTE, MAX_PACKET_SIZE, MAX_PARAMS, STATUS_OVERHEAD,
};
