//! Packet encoding and decoding
//!
//! Instruction packets are built and encoded by the controller; status
//! packets are decoded byte by byte as they arrive, so a reply can be
//! assembled straight from a receive queue.

use core::fmt;

use heapless::Vec;

use crate::control::Instruction;

/// Sync byte; every packet starts with two of them
pub const HEADER_BYTE: u8 = 0xFF;

/// Maximum parameter bytes in one packet
pub const MAX_PARAMS: usize = 16;

/// Bytes of a status packet besides its params (header, id, length, error, checksum)
pub const STATUS_OVERHEAD: usize = 6;

/// Maximum complete packet size (HEADER ×2 + ID + LENGTH + INSTR + PARAMS + CHECKSUM)
pub const MAX_PACKET_SIZE: usize = STATUS_OVERHEAD + MAX_PARAMS;

/// Errors that can occur during packet encoding or parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// Parameters exceed [`MAX_PARAMS`]
    PayloadTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
    /// LENGTH byte outside the valid range
    InvalidLength(u8),
    /// Checksum mismatch
    InvalidChecksum { expected: u8, actual: u8 },
    /// Packet is incomplete (need more bytes)
    Incomplete,
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketError::PayloadTooLarge => write!(f, "parameters exceed {} bytes", MAX_PARAMS),
            PacketError::BufferTooSmall => write!(f, "buffer too small"),
            PacketError::InvalidLength(len) => write!(f, "invalid length byte {}", len),
            PacketError::InvalidChecksum { expected, actual } => {
                write!(f, "checksum {:#04x}, expected {:#04x}", actual, expected)
            }
            PacketError::Incomplete => write!(f, "incomplete packet"),
        }
    }
}

/// Checksum over the bytes between the header and the checksum itself
///
/// `0xFF - (sum & 0xFF)`, i.e. the bitwise complement of the truncated sum.
pub fn checksum(bytes: &[u8]) -> u8 {
    !bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// An instruction packet addressed to one servo or to the broadcast id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionPacket {
    pub id: u8,
    pub instruction: Instruction,
    pub params: Vec<u8, MAX_PARAMS>,
}

impl InstructionPacket {
    /// Create a packet with the given parameters
    pub fn new(id: u8, instruction: Instruction, params: &[u8]) -> Result<Self, PacketError> {
        let mut vec = Vec::new();
        vec.extend_from_slice(params)
            .map_err(|_| PacketError::PayloadTooLarge)?;
        Ok(Self {
            id,
            instruction,
            params: vec,
        })
    }

    /// Write `data` starting at control-table `address`
    pub fn write(id: u8, address: u8, data: &[u8], registered: bool) -> Result<Self, PacketError> {
        if data.len() + 1 > MAX_PARAMS {
            return Err(PacketError::PayloadTooLarge);
        }
        let instruction = if registered {
            Instruction::RegWrite
        } else {
            Instruction::Write
        };
        let mut packet = Self::new(id, instruction, &[address])?;
        packet
            .params
            .extend_from_slice(data)
            .map_err(|_| PacketError::PayloadTooLarge)?;
        Ok(packet)
    }

    /// Read `count` bytes starting at control-table `address`
    pub fn read(id: u8, address: u8, count: u8) -> Self {
        let mut params = Vec::new();
        // Capacity is well above two
        let _ = params.extend_from_slice(&[address, count]);
        Self {
            id,
            instruction: Instruction::Read,
            params,
        }
    }

    /// Packet with no parameters (action, reset)
    pub fn bare(id: u8, instruction: Instruction) -> Self {
        Self {
            id,
            instruction,
            params: Vec::new(),
        }
    }

    /// Value of the LENGTH byte: instruction + params + checksum
    pub fn length_byte(&self) -> u8 {
        (self.params.len() + 2) as u8
    }

    /// Encode this packet into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, PacketError> {
        let n = self.params.len();
        let packet_len = STATUS_OVERHEAD + n;
        if buffer.len() < packet_len {
            return Err(PacketError::BufferTooSmall);
        }

        buffer[0] = HEADER_BYTE;
        buffer[1] = HEADER_BYTE;
        buffer[2] = self.id;
        buffer[3] = self.length_byte();
        buffer[4] = self.instruction.opcode();
        buffer[5..5 + n].copy_from_slice(&self.params);
        buffer[5 + n] = checksum(&buffer[2..5 + n]);

        Ok(packet_len)
    }

    /// Encode this packet into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_PACKET_SIZE>, PacketError> {
        let mut buffer = [0u8; MAX_PACKET_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| PacketError::BufferTooSmall)?;
        Ok(vec)
    }
}

/// Error bits reported in a status packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusFlags(pub u8);

impl StatusFlags {
    pub const INPUT_VOLTAGE: u8 = 0x01;
    pub const ANGLE_LIMIT: u8 = 0x02;
    pub const OVERHEATING: u8 = 0x04;
    pub const RANGE: u8 = 0x08;
    pub const CHECKSUM: u8 = 0x10;
    pub const OVERLOAD: u8 = 0x20;
    pub const INSTRUCTION: u8 = 0x40;

    /// No error bit set
    pub fn is_ok(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl fmt::Display for StatusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(u8, &str); 7] = [
            (StatusFlags::INPUT_VOLTAGE, "input voltage"),
            (StatusFlags::ANGLE_LIMIT, "angle limit"),
            (StatusFlags::OVERHEATING, "overheating"),
            (StatusFlags::RANGE, "range"),
            (StatusFlags::CHECKSUM, "checksum"),
            (StatusFlags::OVERLOAD, "overload"),
            (StatusFlags::INSTRUCTION, "instruction"),
        ];
        if self.is_ok() {
            return write!(f, "ok");
        }
        let mut first = true;
        for (bit, name) in NAMES {
            if self.contains(bit) {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// A decoded status packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPacket {
    pub id: u8,
    pub error: StatusFlags,
    pub params: Vec<u8, MAX_PARAMS>,
}

impl StatusPacket {
    /// Decode one status packet from a complete byte slice
    pub fn parse(bytes: &[u8]) -> Result<Self, PacketError> {
        let mut parser = StatusParser::new();
        parser.feed_bytes(bytes)?.ok_or(PacketError::Incomplete)
    }

    /// Encode as the servo would send it
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_PACKET_SIZE>, PacketError> {
        let mut vec: Vec<u8, MAX_PACKET_SIZE> = Vec::new();
        let n = self.params.len();
        vec.extend_from_slice(&[HEADER_BYTE, HEADER_BYTE, self.id, (n + 2) as u8, self.error.0])
            .map_err(|_| PacketError::BufferTooSmall)?;
        vec.extend_from_slice(&self.params)
            .map_err(|_| PacketError::BufferTooSmall)?;
        let sum = checksum(&vec[2..]);
        vec.push(sum).map_err(|_| PacketError::BufferTooSmall)?;
        Ok(vec)
    }
}

/// State machine for parsing incoming status packets
#[derive(Debug, Clone)]
pub struct StatusParser {
    state: ParseState,
    params: Vec<u8, MAX_PARAMS>,
    id: u8,
    length: u8,
    error: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Waiting for the first header byte
    WaitingForHeader,
    /// Got one header byte, waiting for the second
    WaitingForSecondHeader,
    /// Header complete, waiting for ID (extra 0xFF bytes are skipped)
    WaitingForId,
    /// Got ID, waiting for LENGTH
    WaitingForLength,
    /// Got LENGTH, waiting for ERROR
    WaitingForError,
    /// Reading parameter bytes
    ReadingParams,
    /// Waiting for CHECKSUM
    WaitingForChecksum,
}

impl Default for StatusParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusParser {
    /// Create a new status parser
    pub fn new() -> Self {
        Self {
            state: ParseState::WaitingForHeader,
            params: Vec::new(),
            id: 0,
            length: 0,
            error: 0,
        }
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.state = ParseState::WaitingForHeader;
        self.params.clear();
        self.id = 0;
        self.length = 0;
        self.error = 0;
    }

    fn expected_params(&self) -> usize {
        self.length as usize - 2
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(packet))` when a complete valid packet is parsed,
    /// `Ok(None)` when more bytes are needed, or `Err` on parse error.
    pub fn feed(&mut self, byte: u8) -> Result<Option<StatusPacket>, PacketError> {
        match self.state {
            ParseState::WaitingForHeader => {
                if byte == HEADER_BYTE {
                    self.state = ParseState::WaitingForSecondHeader;
                }
                Ok(None)
            }
            ParseState::WaitingForSecondHeader => {
                self.state = if byte == HEADER_BYTE {
                    ParseState::WaitingForId
                } else {
                    ParseState::WaitingForHeader
                };
                Ok(None)
            }
            ParseState::WaitingForId => {
                if byte != HEADER_BYTE {
                    self.id = byte;
                    self.state = ParseState::WaitingForLength;
                }
                Ok(None)
            }
            ParseState::WaitingForLength => {
                if byte < 2 || byte as usize - 2 > MAX_PARAMS {
                    self.reset();
                    return Err(PacketError::InvalidLength(byte));
                }
                self.length = byte;
                self.state = ParseState::WaitingForError;
                Ok(None)
            }
            ParseState::WaitingForError => {
                self.error = byte;
                self.params.clear();
                self.state = if self.expected_params() == 0 {
                    ParseState::WaitingForChecksum
                } else {
                    ParseState::ReadingParams
                };
                Ok(None)
            }
            ParseState::ReadingParams => {
                // Bounded by the LENGTH check above
                let _ = self.params.push(byte);
                if self.params.len() == self.expected_params() {
                    self.state = ParseState::WaitingForChecksum;
                }
                Ok(None)
            }
            ParseState::WaitingForChecksum => {
                let sum = [self.id, self.length, self.error]
                    .iter()
                    .chain(self.params.iter())
                    .fold(0u8, |acc, &b| acc.wrapping_add(b));
                let expected = !sum;

                if byte != expected {
                    self.reset();
                    return Err(PacketError::InvalidChecksum {
                        expected,
                        actual: byte,
                    });
                }

                let packet = StatusPacket {
                    id: self.id,
                    error: StatusFlags(self.error),
                    params: self.params.clone(),
                };

                self.reset();
                Ok(Some(packet))
            }
        }
    }

    /// Feed multiple bytes to the parser
    ///
    /// Returns the first complete packet found, if any.
    /// Remaining bytes after a complete packet are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<StatusPacket>, PacketError> {
        for &byte in bytes {
            if let Some(packet) = self.feed(byte)? {
                return Ok(Some(packet));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_write_torque_enable() {
        let packet = InstructionPacket::write(1, 0x18, &[1], false).unwrap();
        let mut buffer = [0u8; MAX_PACKET_SIZE];
        let len = packet.encode(&mut buffer).unwrap();

        assert_eq!(len, 8);
        // 0x01 + 0x04 + 0x03 + 0x18 + 0x01 = 0x21 → !0x21 = 0xDE
        assert_eq!(&buffer[..len], &[0xFF, 0xFF, 0x01, 0x04, 0x03, 0x18, 0x01, 0xDE]);
    }

    #[test]
    fn test_encode_read_load() {
        let packet = InstructionPacket::read(1, 0x28, 2);
        let encoded = packet.encode_to_vec().unwrap();
        // 0x01 + 0x04 + 0x02 + 0x28 + 0x02 = 0x31 → 0xCE
        assert_eq!(&encoded[..], &[0xFF, 0xFF, 0x01, 0x04, 0x02, 0x28, 0x02, 0xCE]);
    }

    #[test]
    fn test_encode_broadcast_reset() {
        let packet = InstructionPacket::bare(0xFE, Instruction::Reset);
        let encoded = packet.encode_to_vec().unwrap();
        // 0xFE + 0x02 + 0x06 = 0x106 → 0x06 → 0xF9
        assert_eq!(&encoded[..], &[0xFF, 0xFF, 0xFE, 0x02, 0x06, 0xF9]);
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let packet = InstructionPacket::write(1, 0x20, &[0x00, 0x04], false).unwrap();
        let mut buffer = [0u8; 6];
        assert_eq!(packet.encode(&mut buffer), Err(PacketError::BufferTooSmall));
    }

    #[test]
    fn test_payload_too_large() {
        let data = [0u8; MAX_PARAMS];
        assert_eq!(
            InstructionPacket::write(1, 0x20, &data, false),
            Err(PacketError::PayloadTooLarge)
        );
    }

    #[test]
    fn test_parse_load_reply() {
        // Load 0x0480: clockwise, 128/1023
        let bytes = [0xFF, 0xFF, 0x01, 0x04, 0x00, 0x80, 0x04, 0x76];
        let packet = StatusPacket::parse(&bytes).unwrap();
        assert_eq!(packet.id, 1);
        assert!(packet.error.is_ok());
        assert_eq!(&packet.params[..], &[0x80, 0x04]);
    }

    #[test]
    fn test_parse_reports_error_bits() {
        let reply = StatusPacket {
            id: 1,
            error: StatusFlags(StatusFlags::OVERLOAD | StatusFlags::OVERHEATING),
            params: Vec::new(),
        };
        let bytes = reply.encode_to_vec().unwrap();
        let packet = StatusPacket::parse(&bytes).unwrap();
        assert!(packet.error.contains(StatusFlags::OVERLOAD));
        assert!(!packet.error.contains(StatusFlags::RANGE));
    }

    #[test]
    fn test_parser_invalid_checksum() {
        let mut bytes = [0xFF, 0xFF, 0x01, 0x02, 0x00, 0xFC];
        bytes[5] ^= 0x01;
        let mut parser = StatusParser::new();
        assert_eq!(
            parser.feed_bytes(&bytes),
            Err(PacketError::InvalidChecksum {
                expected: 0xFC,
                actual: 0xFD
            })
        );
    }

    #[test]
    fn test_parser_invalid_length() {
        let mut parser = StatusParser::new();
        assert_eq!(
            parser.feed_bytes(&[0xFF, 0xFF, 0x01, 0x01]),
            Err(PacketError::InvalidLength(1))
        );
        // Parser is usable again after the error
        let packet = parser
            .feed_bytes(&[0xFF, 0xFF, 0x01, 0x02, 0x00, 0xFC])
            .unwrap();
        assert!(packet.is_some());
    }

    #[test]
    fn test_parser_resync_after_garbage() {
        // Garbage, a lone sync byte, then three sync bytes before the id
        let bytes = [0x12, 0xFF, 0x34, 0xFF, 0xFF, 0xFF, 0x01, 0x02, 0x00, 0xFC];
        let packet = StatusPacket::parse(&bytes).unwrap();
        assert_eq!(packet.id, 1);
    }

    #[test]
    fn test_parse_truncated_reply() {
        let bytes = [0xFF, 0xFF, 0x01, 0x04, 0x00, 0x80];
        assert_eq!(StatusPacket::parse(&bytes), Err(PacketError::Incomplete));
    }

    #[test]
    fn test_status_flags_display() {
        extern crate std;
        use std::string::ToString;

        assert_eq!(StatusFlags(0).to_string(), "ok");
        assert_eq!(
            StatusFlags(StatusFlags::INPUT_VOLTAGE | StatusFlags::OVERLOAD).to_string(),
            "input voltage, overload"
        );
    }
}
