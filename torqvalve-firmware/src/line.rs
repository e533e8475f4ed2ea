//! RP2040 single-wire servo line
//!
//! UART0 with TX on GPIO0 and RX on GPIO1, both tied to the servo data
//! wire. The transmitter is attached to GPIO0 only while a byte is being
//! sent; otherwise GPIO0 is switched to the NULL function and the pad
//! pull-up holds the idle level.
//!
//! Received bytes are moved into [`CAPTURE`] by the UART0 interrupt. The
//! embassy `Uart` created in `main` owns pin setup and framing; this module
//! only touches the registers it needs on top of that.

use core::convert::Infallible;

use embassy_rp::clocks::clk_peri_freq;
use embassy_rp::interrupt::typelevel::{Binding, Handler, UART0_IRQ};
use embassy_rp::interrupt::{self, InterruptExt};
use embassy_rp::pac;
use embassy_rp::uart::Config as UartConfig;

use torqvalve_drivers::serial::capture::DEFAULT_CAPACITY;
use torqvalve_drivers::serial::{CaptureQueue, HalfDuplexSerial};
use torqvalve_drivers::servo::LinkFactory;
use torqvalve_hal::uart::{DataBits, Parity, StopBits};
use torqvalve_hal::{RxFifo, SingleWireUart};

/// GPIO carrying the UART0 transmitter
const TX_GPIO: usize = 0;
/// GPIO carrying the UART0 receiver
const RX_GPIO: usize = 1;

/// IO_BANK0 function select: UART
const FUNCSEL_UART: u8 = 2;
/// IO_BANK0 function select: NULL (pin disconnected)
const FUNCSEL_NULL: u8 = 0x1f;

/// Bytes received from the servo
pub static CAPTURE: CaptureQueue = CaptureQueue::new();

/// Servo link as seen by the protocol code
pub type ServoLink = HalfDuplexSerial<'static, Rp2040Line, DEFAULT_CAPACITY>;

/// UART0 receive interrupt
pub struct CaptureIrq;

impl Handler<UART0_IRQ> for CaptureIrq {
    unsafe fn on_interrupt() {
        CAPTURE.on_receive_interrupt(&mut RegisterFifo);
        clear_rx_flags();
    }
}

/// Embassy UART configuration for a servo baud rate
pub fn uart_config(line: torqvalve_hal::UartConfig) -> UartConfig {
    let mut config = UartConfig::default();
    config.baudrate = line.baudrate;
    config.data_bits = match line.data_bits {
        DataBits::Seven => embassy_rp::uart::DataBits::DataBits7,
        DataBits::Eight => embassy_rp::uart::DataBits::DataBits8,
    };
    config.parity = match line.parity {
        Parity::None => embassy_rp::uart::Parity::ParityNone,
        Parity::Even => embassy_rp::uart::Parity::ParityEven,
        Parity::Odd => embassy_rp::uart::Parity::ParityOdd,
    };
    config.stop_bits = match line.stop_bits {
        StopBits::One => embassy_rp::uart::StopBits::STOP1,
        StopBits::Two => embassy_rp::uart::StopBits::STOP2,
    };
    config
}

/// Register-level reader for the UART0 receive FIFO
///
/// Owns nothing, so the interrupt handler can create one at will.
pub struct RegisterFifo;

impl RxFifo for RegisterFifo {
    fn read_byte(&mut self) -> Option<u8> {
        let uart = pac::UART0;
        if uart.uartfr().read().rxfe() {
            None
        } else {
            Some(uart.uartdr().read().data())
        }
    }

    fn readable(&self) -> bool {
        !pac::UART0.uartfr().read().rxfe()
    }
}

fn clear_rx_flags() {
    pac::UART0.uarticr().write(|w| {
        w.set_rxic(true);
        w.set_rtic(true);
    });
}

/// Program the baud rate divisors
///
/// Same arithmetic as the RP2040 datasheet: a 16.6 fixed-point divisor of
/// `clk_peri / (16 * baud)`, latched by the following LCR_H write.
fn set_baud(baud: u32) {
    let div = 8 * clk_peri_freq() / baud.max(1);
    let (int, frac) = match div >> 7 {
        0 => (1, 0),
        int if int >= 0xFFFF => (0xFFFF, 0),
        int => (int, ((div & 0x7F) + 1) / 2),
    };

    let uart = pac::UART0;
    while uart.uartfr().read().busy() {}
    uart.uartibrd().write(|w| w.set_baud_divint(int as u16));
    uart.uartfbrd().write(|w| w.set_baud_divfrac(frac as u8));
    uart.uartlcr_h().modify(|_| {});
}

/// The servo data wire
pub struct Rp2040Line {
    _private: (),
}

impl Rp2040Line {
    /// Take over the line from the already configured UART0
    ///
    /// Releases the wire, enables the pull-ups and unmasks the receive
    /// interrupts.
    fn attach() -> Self {
        for gpio in [TX_GPIO, RX_GPIO] {
            pac::PADS_BANK0.gpio(gpio).modify(|w| {
                w.set_pue(true);
                w.set_pde(false);
            });
        }

        let mut line = Self { _private: () };
        line.release_line();

        // Drop anything received while the pins were being set up
        while RegisterFifo.read_byte().is_some() {}
        clear_rx_flags();
        pac::UART0.uartimsc().modify(|w| {
            w.set_rxim(true);
            w.set_rtim(true);
        });

        interrupt::UART0_IRQ.unpend();
        // SAFETY: the handler only touches CAPTURE, which is interrupt-safe
        unsafe { interrupt::UART0_IRQ.enable() };

        line
    }
}

impl RxFifo for Rp2040Line {
    fn read_byte(&mut self) -> Option<u8> {
        RegisterFifo.read_byte()
    }

    fn readable(&self) -> bool {
        RegisterFifo.readable()
    }
}

impl SingleWireUart for Rp2040Line {
    type Error = Infallible;

    fn drive_line(&mut self) {
        pac::IO_BANK0
            .gpio(TX_GPIO)
            .ctrl()
            .modify(|w| w.set_funcsel(FUNCSEL_UART));
    }

    fn release_line(&mut self) {
        pac::IO_BANK0
            .gpio(TX_GPIO)
            .ctrl()
            .modify(|w| w.set_funcsel(FUNCSEL_NULL));
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), Infallible> {
        let uart = pac::UART0;
        while uart.uartfr().read().txff() {}
        uart.uartdr().write(|w| w.set_data(byte));
        while uart.uartfr().read().busy() {}
        Ok(())
    }

    fn clear_rx_interrupt(&mut self) {
        clear_rx_flags();
        interrupt::UART0_IRQ.unpend();
    }
}

/// Opens the servo link at any baud rate
///
/// Each call reprograms UART0; links from earlier calls must no longer be
/// used.
pub struct Rp2040LinkFactory {
    _private: (),
}

impl Rp2040LinkFactory {
    /// Requires [`CaptureIrq`] to be bound to UART0_IRQ
    pub fn new(_irqs: impl Binding<UART0_IRQ, CaptureIrq>) -> Self {
        Self { _private: () }
    }
}

impl LinkFactory for Rp2040LinkFactory {
    type Link = ServoLink;

    fn open(&mut self, baud: u32) -> ServoLink {
        set_baud(baud);
        CAPTURE.clear();
        HalfDuplexSerial::new(Rp2040Line::attach(), &CAPTURE)
    }
}
