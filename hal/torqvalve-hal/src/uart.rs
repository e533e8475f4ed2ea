//! Single-wire UART abstractions
//!
//! The servo bus is one wire shared by TX and RX. The UART transmitter is
//! only connected to the wire while a byte is being shifted out; the rest
//! of the time the wire is released so the servo can answer. Because RX
//! stays connected, every transmitted byte is also received (loopback echo).

/// Number of polls spent waiting for the loopback echo of a byte
///
/// At 9600 baud a byte takes ~1 ms on the wire; the write itself already
/// blocks until the shifter is idle, so the echo is normally in the FIFO
/// on the first poll.
pub const ECHO_SPIN_LIMIT: u32 = 10_000;

/// Non-blocking view of a receive FIFO
///
/// This is the only capability the receive interrupt handler needs, so it
/// can be implemented by a register-level reader that does not own the
/// UART.
pub trait RxFifo {
    /// Pop one received byte, or `None` when the FIFO is empty
    fn read_byte(&mut self) -> Option<u8>;

    /// Check whether a byte is waiting
    fn readable(&self) -> bool;
}

/// Half-duplex UART bound to a single shared wire
pub trait SingleWireUart: RxFifo {
    /// Error type for transmit operations
    type Error;

    /// Connect the transmitter to the wire
    fn drive_line(&mut self);

    /// Disconnect the transmitter, leaving the wire to the peer
    fn release_line(&mut self);

    /// Write one byte and block until it has left the shift register
    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Clear any receive interrupt flag raised by the loopback echo
    fn clear_rx_interrupt(&mut self);

    /// Wait a bounded time for the echo of the byte just written
    fn read_echo(&mut self) -> Option<u8> {
        for _ in 0..ECHO_SPIN_LIMIT {
            if let Some(byte) = self.read_byte() {
                return Some(byte);
            }
        }
        None
    }
}

/// UART configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl UartConfig {
    /// 8N1 at the given baud rate, the only framing the servo speaks
    pub const fn servo(baudrate: u32) -> Self {
        Self {
            baudrate,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl Default for UartConfig {
    fn default() -> Self {
        Self::servo(115_200)
    }
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Seven,
    Eight,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SilentLine;

    impl RxFifo for SilentLine {
        fn read_byte(&mut self) -> Option<u8> {
            None
        }
        fn readable(&self) -> bool {
            false
        }
    }

    impl SingleWireUart for SilentLine {
        type Error = ();
        fn drive_line(&mut self) {}
        fn release_line(&mut self) {}
        fn write_byte(&mut self, _byte: u8) -> Result<(), ()> {
            Ok(())
        }
        fn clear_rx_interrupt(&mut self) {}
    }

    #[test]
    fn test_read_echo_gives_up_on_silent_line() {
        let mut line = SilentLine;
        assert_eq!(line.read_echo(), None);
    }

    #[test]
    fn test_default_config_is_8n1() {
        let config = UartConfig::default();
        assert_eq!(config.baudrate, 115_200);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.stop_bits, StopBits::One);
    }
}
