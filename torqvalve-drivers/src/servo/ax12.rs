//! AX-12 servo driver
//!
//! Register-level operations on top of a [`Transport`]. Every request is a
//! single instruction packet; requests to a physical id are answered with a
//! status packet after the servo's return delay, requests to the broadcast
//! id never are.
//!
//! # Exchange
//!
//! 1. Drop whatever is left in the capture queue
//! 2. Transmit the frame, checking every echo
//! 3. Broadcast: done
//! 4. Wait the settle interval, then collect `6 + n` reply bytes
//! 5. Decode; a non-zero error byte becomes [`Error::Status`]
//!
//! The settle wait is a blocking [`DelayNs`] call, so it must only run from
//! task context.

use core::fmt;

use embedded_hal::delay::DelayNs;
use torqvalve_core::traits::ValveServo;
use torqvalve_protocol::units::{
    decode_load, degrees_to_units, encode_speed, encode_torque, units_to_degrees,
};
use torqvalve_protocol::{
    reg, Instruction, InstructionPacket, PacketError, StatusFlags, StatusPacket, BROADCAST_ID,
    MAX_PACKET_SIZE, MAX_PARAMS, STATUS_OVERHEAD,
};

use crate::serial::{LineFault, Transport};

/// Default wait between request and reply
pub const DEFAULT_SETTLE_US: u32 = 100_000;

/// When a control-table write takes effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteMode {
    /// Applied on receipt
    Immediate,
    /// Held until [`Ax12::trigger_registered_write`]
    Registered,
}

/// Operating mode, selected through the angle limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServoMode {
    /// Endless rotation; both limits zero
    Continuous,
    /// Position control between two angles
    Joint { cw_deg: u16, ccw_deg: u16 },
}

/// AX-12 communication errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Fewer reply bytes than a status packet needs
    NoReply { received: usize },
    /// The servo answered with error bits set
    Status(StatusFlags),
    /// Reply was malformed
    Packet(PacketError),
    /// Echo did not match the transmitted byte
    LineFault(LineFault),
    /// Reads cannot be addressed to the broadcast id
    BroadcastRead,
}

impl From<PacketError> for Error {
    fn from(e: PacketError) -> Self {
        Error::Packet(e)
    }
}

impl From<LineFault> for Error {
    fn from(e: LineFault) -> Self {
        Error::LineFault(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoReply { received } => write!(f, "no reply ({} bytes received)", received),
            Error::Status(flags) => write!(f, "servo error: {}", flags),
            Error::Packet(e) => write!(f, "bad reply: {}", e),
            Error::LineFault(fault) => write!(f, "line fault: {}", fault),
            Error::BroadcastRead => write!(f, "read addressed to broadcast id"),
        }
    }
}

/// AX-12 servo on a half-duplex link
pub struct Ax12<T, D> {
    link: T,
    delay: D,
    id: u8,
    settle_us: u32,
}

impl<T: Transport, D: DelayNs> Ax12<T, D> {
    /// Driver for the servo with `id`; use [`BROADCAST_ID`] to address all
    pub fn new(link: T, delay: D, id: u8) -> Self {
        Self {
            link,
            delay,
            id,
            settle_us: DEFAULT_SETTLE_US,
        }
    }

    /// Replace the settle interval
    pub fn with_settle_ms(mut self, settle_ms: u32) -> Self {
        self.settle_us = settle_ms.saturating_mul(1_000);
        self
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn link_mut(&mut self) -> &mut T {
        &mut self.link
    }

    /// Hand the link and delay back
    pub fn release(self) -> (T, D) {
        (self.link, self.delay)
    }

    /// Send one packet and collect its status reply
    ///
    /// Returns `None` for broadcast packets.
    fn exchange(
        &mut self,
        packet: &InstructionPacket,
        reply_params: usize,
    ) -> Result<Option<StatusPacket>, Error> {
        let frame = packet.encode_to_vec()?;
        self.link.discard_input();
        self.link.transmit(&frame)?;

        if packet.id == BROADCAST_ID {
            return Ok(None);
        }

        self.delay.delay_us(self.settle_us);

        let expected = STATUS_OVERHEAD + reply_params;
        let mut reply = [0u8; MAX_PACKET_SIZE];
        let mut received = 0;
        while received < expected {
            match self.link.receive_byte() {
                Some(byte) => {
                    reply[received] = byte;
                    received += 1;
                }
                None => break,
            }
        }
        if received < expected {
            #[cfg(feature = "defmt")]
            defmt::debug!("servo {}: {} of {} reply bytes", packet.id, received, expected);
            return Err(Error::NoReply { received });
        }

        let status = StatusPacket::parse(&reply[..received]).map_err(|e| {
            #[cfg(feature = "defmt")]
            defmt::warn!("servo {}: undecodable reply: {}", packet.id, e);
            Error::from(e)
        })?;
        if !status.error.is_ok() {
            return Err(Error::Status(status.error));
        }
        Ok(Some(status))
    }

    /// Write `data` into the control table of servo `id`
    pub fn write_register(
        &mut self,
        id: u8,
        address: u8,
        data: &[u8],
        mode: WriteMode,
    ) -> Result<(), Error> {
        let packet = InstructionPacket::write(id, address, data, mode == WriteMode::Registered)?;
        self.exchange(&packet, 0)?;
        Ok(())
    }

    /// Read `buf.len()` bytes of servo `id`'s control table
    ///
    /// Returns the number of bytes copied into `buf`.
    pub fn read_register(&mut self, id: u8, address: u8, buf: &mut [u8]) -> Result<usize, Error> {
        if id == BROADCAST_ID {
            return Err(Error::BroadcastRead);
        }
        if buf.len() > MAX_PARAMS {
            return Err(Error::Packet(PacketError::PayloadTooLarge));
        }

        let packet = InstructionPacket::read(id, address, buf.len() as u8);
        let status = self.exchange(&packet, buf.len())?;
        let params = status.as_ref().map(|s| s.params.as_slice()).unwrap_or(&[]);
        let n = params.len().min(buf.len());
        buf[..n].copy_from_slice(&params[..n]);
        Ok(n)
    }

    /// Commit every pending registered write on the bus
    pub fn trigger_registered_write(&mut self) -> Result<(), Error> {
        self.exchange(&InstructionPacket::bare(BROADCAST_ID, Instruction::Action), 0)?;
        Ok(())
    }

    /// Restore factory defaults (id 1, 1 Mbps)
    pub fn factory_reset(&mut self) -> Result<(), Error> {
        self.exchange(&InstructionPacket::bare(self.id, Instruction::Reset), 0)?;
        Ok(())
    }

    fn write_byte(&mut self, address: u8, value: u8) -> Result<(), Error> {
        self.write_register(self.id, address, &[value], WriteMode::Immediate)
    }

    fn write_word(&mut self, address: u8, value: u16) -> Result<(), Error> {
        self.write_register(self.id, address, &value.to_le_bytes(), WriteMode::Immediate)
    }

    fn read_word(&mut self, address: u8) -> Result<u16, Error> {
        let mut buf = [0u8; 2];
        let n = self.read_register(self.id, address, &mut buf)?;
        if n < 2 {
            return Err(Error::NoReply {
                received: STATUS_OVERHEAD + n,
            });
        }
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u8(&mut self, address: u8) -> Result<u8, Error> {
        let mut buf = [0u8; 1];
        let n = self.read_register(self.id, address, &mut buf)?;
        if n < 1 {
            return Err(Error::NoReply {
                received: STATUS_OVERHEAD,
            });
        }
        Ok(buf[0])
    }

    pub fn set_torque_enable(&mut self, enable: bool) -> Result<(), Error> {
        self.write_byte(reg::TORQUE_ENABLE, enable as u8)
    }

    /// Wheel-mode speed, signed fraction of full speed
    pub fn set_continuous_speed(&mut self, speed: f32) -> Result<(), Error> {
        self.write_word(reg::MOVING_SPEED, encode_speed(speed))
    }

    pub fn set_cw_limit(&mut self, degrees: u16) -> Result<(), Error> {
        self.write_word(reg::CW_ANGLE_LIMIT, degrees_to_units(degrees))
    }

    pub fn set_ccw_limit(&mut self, degrees: u16) -> Result<(), Error> {
        self.write_word(reg::CCW_ANGLE_LIMIT, degrees_to_units(degrees))
    }

    /// Select wheel or joint mode
    ///
    /// Both limits go out in one write so the servo never sees a mixed pair.
    pub fn set_mode(&mut self, mode: ServoMode) -> Result<(), Error> {
        let (cw, ccw) = match mode {
            ServoMode::Continuous => (0, 0),
            ServoMode::Joint { cw_deg, ccw_deg } => {
                (degrees_to_units(cw_deg), degrees_to_units(ccw_deg))
            }
        };
        let [cw_lo, cw_hi] = cw.to_le_bytes();
        let [ccw_lo, ccw_hi] = ccw.to_le_bytes();
        self.write_register(
            self.id,
            reg::CW_ANGLE_LIMIT,
            &[cw_lo, cw_hi, ccw_lo, ccw_hi],
            WriteMode::Immediate,
        )
    }

    /// Give the servo a new id and keep addressing it
    pub fn set_id(&mut self, new_id: u8) -> Result<(), Error> {
        self.write_byte(reg::ID, new_id)?;
        if self.id != BROADCAST_ID {
            self.id = new_id;
        }
        Ok(())
    }

    /// Baud rate code, `baud = 2_000_000 / (code + 1)`
    pub fn set_baud_code(&mut self, code: u8) -> Result<(), Error> {
        self.write_byte(reg::BAUD_RATE, code)
    }

    /// Torque ceiling as a fraction of the servo's maximum
    ///
    /// Stored in EEPROM and loaded into the torque limit at every power-up.
    pub fn set_max_torque(&mut self, fraction: f32) -> Result<(), Error> {
        self.write_word(reg::MAX_TORQUE, encode_torque(fraction))
    }

    /// Torque ceiling until the next power cycle
    pub fn set_torque_limit(&mut self, fraction: f32) -> Result<(), Error> {
        self.write_word(reg::TORQUE_LIMIT, encode_torque(fraction))
    }

    /// Present load, signed fraction of full torque
    pub fn read_load(&mut self) -> Result<f32, Error> {
        Ok(decode_load(self.read_word(reg::PRESENT_LOAD)?))
    }

    /// Internal temperature in °C
    pub fn read_temperature(&mut self) -> Result<u8, Error> {
        self.read_u8(reg::PRESENT_TEMPERATURE)
    }

    /// Supply voltage in 0.1 V
    pub fn read_voltage(&mut self) -> Result<u8, Error> {
        self.read_u8(reg::PRESENT_VOLTAGE)
    }

    pub fn read_position_deg(&mut self) -> Result<u16, Error> {
        Ok(units_to_degrees(self.read_word(reg::PRESENT_POSITION)?))
    }

    pub fn is_moving(&mut self) -> Result<bool, Error> {
        Ok(self.read_u8(reg::MOVING)? != 0)
    }
}

impl<T: Transport, D: DelayNs> ValveServo for Ax12<T, D> {
    type Error = Error;

    fn run_continuous(&mut self, speed: f32) -> Result<(), Error> {
        self.set_continuous_speed(speed)
    }

    fn disable_torque(&mut self) -> Result<(), Error> {
        self.set_torque_enable(false)
    }

    fn read_load(&mut self) -> Result<f32, Error> {
        Ax12::read_load(self)
    }
}
