//! Boot-time servo maintenance
//!
//! Selected by the buttons held at power-up:
//!
//! - Both buttons: factory reset at every standard baud rate, then
//!   fault-blink forever
//! - Close only: switch a factory-fresh servo to wheel mode at the
//!   configured baud rate and store the max torque, then alternate the
//!   moving and fault blinks forever
//! - Open only: stay at the factory baud rate and alternate the blinks,
//!   for checking a freshly reset servo with an external tool
//!
//! Either way the board must be power-cycled afterwards.

use defmt::*;
use embassy_time::{Delay, Duration};

use torqvalve_core::config::ServoConfig;
use torqvalve_core::traits::{Indicator, IndicatorPattern};
use torqvalve_drivers::indicator::LedPair;
use torqvalve_drivers::servo::{factory_reset_sweep, reprogram_baud, LinkFactory, BASE_BAUD};
use torqvalve_protocol::{baud_code, STANDARD_BAUD_RATES};

use crate::line::Rp2040LinkFactory;
use crate::tasks::{Led, Servo};
use crate::tasks::indicator::{alternate_forever, blink_forever};

/// How long each blink style shows while alternating
const ALTERNATE_PERIOD: Duration = Duration::from_secs(3);

const ALTERNATING: [IndicatorPattern; 2] =
    [IndicatorPattern::MovingBlink, IndicatorPattern::FaultBlink];

/// What the firmware does after boot
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum BootMode {
    Normal,
    FactoryReset,
    ReprogramBaud,
    BaseBaud,
}

impl BootMode {
    /// Pick the mode from the button levels sampled at power-up
    pub fn from_buttons(open_held: bool, close_held: bool) -> Self {
        match (open_held, close_held) {
            (true, true) => BootMode::FactoryReset,
            (false, true) => BootMode::ReprogramBaud,
            (true, false) => BootMode::BaseBaud,
            _ => BootMode::Normal,
        }
    }
}

/// Run a maintenance mode; never returns
pub async fn run_maintenance(
    mode: BootMode,
    factory: &mut Rp2040LinkFactory,
    leds: &mut LedPair<Led, Led>,
    config: &ServoConfig,
) -> ! {
    let mut delay = Delay;

    match mode {
        BootMode::FactoryReset => {
            warn!("Maintenance: factory reset sweep");
            let sent = factory_reset_sweep(factory, &mut delay);
            info!(
                "Factory reset sent at {} of {} baud rates",
                sent,
                STANDARD_BAUD_RATES.len()
            );
            finish(leds, IndicatorPattern::FaultBlink).await
        }
        BootMode::ReprogramBaud => {
            let Some(code) = baud_code(config.baud_rate) else {
                error!("No baud code for {} baud", config.baud_rate);
                finish(leds, IndicatorPattern::FaultBlink).await
            };
            warn!(
                "Maintenance: wheel mode, baud code {} ({} baud)",
                code, config.baud_rate
            );
            match reprogram_baud(factory, &mut delay, code, config.max_torque) {
                Ok(()) => {
                    info!("Servo reprogrammed, power-cycle the board");
                    alternate_forever(leds, ALTERNATING, ALTERNATE_PERIOD).await
                }
                Err(e) => {
                    error!("Reprogramming failed: {}", e);
                    finish(leds, IndicatorPattern::FaultBlink).await
                }
            }
        }
        BootMode::BaseBaud => {
            // Hold the line at the factory rate for an external tool
            let _link = factory.open(BASE_BAUD);
            warn!("Maintenance: line held at {} baud", BASE_BAUD);
            alternate_forever(leds, ALTERNATING, ALTERNATE_PERIOD).await
        }
        BootMode::Normal => finish(leds, IndicatorPattern::Off).await,
    }
}

async fn finish(leds: &mut LedPair<Led, Led>, pattern: IndicatorPattern) -> ! {
    info!("Maintenance done, power-cycle the board");
    leds.show(pattern);
    blink_forever(leds).await
}

/// Log the servo's condition and put it in a safe state
///
/// Failures are logged only; the controller copes with a silent servo.
pub fn boot_telemetry(servo: &mut Servo, config: &ServoConfig) {
    match servo.read_temperature() {
        Ok(celsius) => info!("Servo temperature: {} C", celsius),
        Err(e) => warn!("Servo temperature read failed: {}", e),
    }
    match servo.read_voltage() {
        Ok(decivolts) => info!(
            "Servo supply: {}.{} V",
            decivolts / 10,
            decivolts % 10
        ),
        Err(e) => warn!("Servo voltage read failed: {}", e),
    }
    if let Err(e) = servo.set_torque_enable(false) {
        warn!("Disabling servo torque failed: {}", e);
    }
    // RAM only; the EEPROM copy is written by the reprogram mode
    if let Err(e) = servo.set_torque_limit(config.max_torque) {
        warn!("Setting servo torque limit failed: {}", e);
    }
}
