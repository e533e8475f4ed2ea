//! Half-duplex link over a single-wire UART

use core::fmt;

use torqvalve_hal::SingleWireUart;

use super::capture::CaptureQueue;

/// A transmitted byte did not come back on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineFault {
    /// Byte put on the wire
    pub sent: u8,
    /// What came back, if anything
    pub echoed: Option<u8>,
}

impl fmt::Display for LineFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.echoed {
            Some(echo) => write!(f, "sent {:#04x}, echo {:#04x}", self.sent, echo),
            None => write!(f, "sent {:#04x}, no echo", self.sent),
        }
    }
}

/// Byte transport between the protocol codec and the wire
pub trait Transport {
    /// Put one byte on the wire and return its loopback echo
    fn send(&mut self, byte: u8) -> Option<u8>;

    /// Check whether a received byte is waiting
    fn receive_available(&self) -> bool;

    /// Take the next received byte without blocking
    fn receive_byte(&mut self) -> Option<u8>;

    /// Drop everything received so far
    fn discard_input(&mut self);

    /// Send a whole frame, checking every echo
    fn transmit(&mut self, frame: &[u8]) -> Result<(), LineFault> {
        for &byte in frame {
            match self.send(byte) {
                Some(echo) if echo == byte => {}
                echoed => return Err(LineFault { sent: byte, echoed }),
            }
        }
        Ok(())
    }
}

/// Half-duplex serial link
///
/// Owns the UART for transmit; reception happens in the receive interrupt,
/// which feeds the shared [`CaptureQueue`].
pub struct HalfDuplexSerial<'q, U, const N: usize> {
    uart: U,
    queue: &'q CaptureQueue<N>,
}

impl<'q, U: SingleWireUart, const N: usize> HalfDuplexSerial<'q, U, N> {
    /// Bind a UART to its capture queue
    pub fn new(uart: U, queue: &'q CaptureQueue<N>) -> Self {
        Self { uart, queue }
    }

    /// Run the receive interrupt body from task context
    ///
    /// Used where the UART interrupt is not wired up, e.g. when polling.
    pub fn service_interrupt(&mut self) {
        self.queue.on_receive_interrupt(&mut self.uart);
    }

    pub fn uart_mut(&mut self) -> &mut U {
        &mut self.uart
    }

    /// Give the UART back
    pub fn release(self) -> U {
        self.uart
    }
}

impl<'q, U: SingleWireUart, const N: usize> Transport for HalfDuplexSerial<'q, U, N> {
    /// Transmit one byte and swallow its echo
    ///
    /// Precondition: no byte of this transmission has been captured yet.
    /// Everything below runs with interrupts masked, so the receive
    /// interrupt cannot capture the echo.
    ///
    /// Postcondition: the line is released, the echo has been consumed and
    /// the receive interrupt flag is clear, so the capture queue only ever
    /// sees bytes sent by the peer.
    fn send(&mut self, byte: u8) -> Option<u8> {
        let uart = &mut self.uart;
        critical_section::with(|_| {
            uart.drive_line();
            let written = uart.write_byte(byte).is_ok();
            uart.release_line();
            let echo = if written { uart.read_echo() } else { None };
            uart.clear_rx_interrupt();
            echo
        })
    }

    fn receive_available(&self) -> bool {
        self.queue.is_available()
    }

    fn receive_byte(&mut self) -> Option<u8> {
        self.queue.take()
    }

    fn discard_input(&mut self) {
        self.queue.clear();
    }
}
