//! One-shot maintenance utilities
//!
//! Both operations address the broadcast id, so they work without knowing
//! the servo's id. The factory reset also works without knowing its baud
//! rate: the reset goes out once at every standard rate.

use embedded_hal::delay::DelayNs;
use torqvalve_protocol::{BROADCAST_ID, STANDARD_BAUD_RATES};

use super::ax12::{Ax12, Error, ServoMode};
use crate::serial::Transport;

/// Baud rate of a servo fresh from factory reset
pub const BASE_BAUD: u32 = 1_000_000;

/// Pause before each transmission, lets the line settle after a rate change
pub const SWEEP_PAUSE_MS: u32 = 10;

/// Opens the servo link at a given baud rate
///
/// Changing the rate means discarding the old link and opening a new one.
pub trait LinkFactory {
    type Link: Transport;

    fn open(&mut self, baud: u32) -> Self::Link;
}

/// Broadcast a factory reset at every standard baud rate
///
/// Returns how many of the resets went out with a clean echo.
pub fn factory_reset_sweep<F: LinkFactory, D: DelayNs>(factory: &mut F, delay: &mut D) -> u8 {
    let mut sent = 0;
    for baud in STANDARD_BAUD_RATES {
        delay.delay_ms(SWEEP_PAUSE_MS);
        let link = factory.open(baud);
        match Ax12::new(link, &mut *delay, BROADCAST_ID).factory_reset() {
            Ok(()) => sent += 1,
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("factory reset at {} baud: {}", baud, _e);
            }
        }
    }
    sent
}

/// Put a factory-fresh servo into wheel mode at a new baud rate
///
/// Also stores `max_torque` in EEPROM. Talks to the servo at
/// [`BASE_BAUD`]; afterwards it only answers at the rate selected by
/// `baud_code`.
pub fn reprogram_baud<F: LinkFactory, D: DelayNs>(
    factory: &mut F,
    delay: &mut D,
    baud_code: u8,
    max_torque: f32,
) -> Result<(), Error> {
    delay.delay_ms(SWEEP_PAUSE_MS);
    let mut servo = Ax12::new(factory.open(BASE_BAUD), &mut *delay, BROADCAST_ID);
    servo.set_mode(ServoMode::Continuous)?;
    servo.set_max_torque(max_torque)?;
    servo.set_baud_code(baud_code)
}
