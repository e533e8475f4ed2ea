//! Instructions, ids and the servo control table

/// Id that addresses every servo on the bus; never answered
pub const BROADCAST_ID: u8 = 0xFE;

/// Highest id a single servo can hold
pub const MAX_ID: u8 = 0xFD;

/// Standard baud rates, fastest first
///
/// A servo with an unknown baud setting answers on exactly one of these,
/// so a broadcast sent on each of them reaches it.
pub const STANDARD_BAUD_RATES: [u32; 9] = [
    1_000_000, 500_000, 400_000, 250_000, 200_000, 115_200, 57_600, 19_200, 9_600,
];

/// Instruction byte of an instruction packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Instruction {
    /// Read a run of control-table bytes
    Read,
    /// Write control-table bytes, applied immediately
    Write,
    /// Write control-table bytes, applied on the next [`Instruction::Action`]
    RegWrite,
    /// Commit every pending registered write
    Action,
    /// Restore the control table to factory defaults (id 1, 1 Mbps)
    Reset,
}

impl Instruction {
    /// Wire opcode
    ///
    /// The servos this firmware targets decode registered write and action
    /// from the same opcode; the parameter count tells them apart.
    pub const fn opcode(self) -> u8 {
        match self {
            Instruction::Read => 0x02,
            Instruction::Write => 0x03,
            Instruction::RegWrite | Instruction::Action => 0x04,
            Instruction::Reset => 0x06,
        }
    }
}

/// Control table addresses
pub mod reg {
    /// Servo id (EEPROM)
    pub const ID: u8 = 0x03;
    /// Baud rate code (EEPROM)
    pub const BAUD_RATE: u8 = 0x04;
    /// Status return delay, 2 µs units (EEPROM)
    pub const RETURN_DELAY: u8 = 0x05;
    /// Clockwise angle limit, 2 bytes (EEPROM)
    pub const CW_ANGLE_LIMIT: u8 = 0x06;
    /// Counter-clockwise angle limit, 2 bytes (EEPROM)
    pub const CCW_ANGLE_LIMIT: u8 = 0x08;
    /// Maximum torque, 2 bytes (EEPROM)
    pub const MAX_TORQUE: u8 = 0x0E;
    /// Torque enable
    pub const TORQUE_ENABLE: u8 = 0x18;
    /// Status LED
    pub const LED: u8 = 0x19;
    /// Goal position, 2 bytes
    pub const GOAL_POSITION: u8 = 0x1E;
    /// Moving speed, 2 bytes (bit 10 = direction in wheel mode)
    pub const MOVING_SPEED: u8 = 0x20;
    /// Torque limit, 2 bytes
    pub const TORQUE_LIMIT: u8 = 0x22;
    /// Present position, 2 bytes
    pub const PRESENT_POSITION: u8 = 0x24;
    /// Present speed, 2 bytes
    pub const PRESENT_SPEED: u8 = 0x26;
    /// Present load, 2 bytes (bit 10 = direction)
    pub const PRESENT_LOAD: u8 = 0x28;
    /// Present voltage, 0.1 V units
    pub const PRESENT_VOLTAGE: u8 = 0x2A;
    /// Present temperature, °C
    pub const PRESENT_TEMPERATURE: u8 = 0x2B;
    /// 1 while the servo is moving
    pub const MOVING: u8 = 0x2E;
}

/// Baud rate selected by a baud code: `2_000_000 / (code + 1)`
pub const fn baud_from_code(code: u8) -> u32 {
    2_000_000 / (code as u32 + 1)
}

/// Baud code closest to (at or above) the requested baud rate
///
/// Returns `None` for rates the servo cannot generate.
pub fn baud_code(baud: u32) -> Option<u8> {
    if baud == 0 || baud > 2_000_000 {
        return None;
    }
    let code = 2_000_000 / baud - 1;
    u8::try_from(code).ok()
}
