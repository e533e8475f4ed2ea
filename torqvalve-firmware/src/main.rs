//! torqvalve - Torque-Stopped Valve Actuator Firmware
//!
//! Main firmware binary for RP2040 boards driving one AX-12 style servo on
//! a half-duplex serial wire. Each motion stops when the servo reports
//! sustained load against a seat; a hard deadline backs that up.
//!
//! # Pin assignment
//!
//! | Function      | GPIO |
//! |---------------|------|
//! | Servo data TX | 0    |
//! | Servo data RX | 1    |
//! | Open button   | 14   |
//! | Close button  | 15   |
//! | Green LED     | 16   |
//! | Red LED       | 17   |
//!
//! GPIO0 and GPIO1 are both wired to the servo data line.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::uart::Uart;
use embassy_time::{Delay, Timer};
use {defmt_rtt as _, panic_probe as _};

use torqvalve_core::input::{Button, IntentFilter};
use torqvalve_core::ValveController;
use torqvalve_drivers::indicator::LedPair;
use torqvalve_drivers::servo::{Ax12, LinkFactory};
use torqvalve_hal::UartConfig;

use crate::line::Rp2040LinkFactory;
use crate::maintenance::BootMode;
use crate::tasks::Led;

mod channels;
mod config;
mod line;
mod maintenance;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => line::CaptureIrq;
});

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("torqvalve firmware starting...");

    // Initialize RP2040 peripherals
    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = config::load_config();
    info!(
        "Servo {} at {} baud, timeout {} ms",
        config.servo.id, config.servo.baud_rate, config.motion.timeout_ms
    );

    // Buttons pull low when pressed
    let open_button = Input::new(p.PIN_14, Pull::Up);
    let close_button = Input::new(p.PIN_15, Pull::Up);

    let mut leds = LedPair::new(
        Led(Output::new(p.PIN_16, Level::Low)),
        Led(Output::new(p.PIN_17, Level::Low)),
    );

    // Pin muxing and framing; the line module takes over from here.
    // Kept alive for the whole run: main never returns.
    let _servo_uart = Uart::new_blocking(
        p.UART0,
        p.PIN_0,
        p.PIN_1,
        line::uart_config(UartConfig::servo(config.servo.baud_rate)),
    );

    let mut links = Rp2040LinkFactory::new(Irqs);

    let mode = BootMode::from_buttons(open_button.is_low(), close_button.is_low());
    if mode != BootMode::Normal {
        maintenance::run_maintenance(mode, &mut links, &mut leds, &config.servo).await;
    }

    let link = links.open(config.servo.baud_rate);
    let mut servo = Ax12::new(link, Delay, config.servo.id).with_settle_ms(config.servo.settle_ms);
    info!("Servo line initialized");

    maintenance::boot_telemetry(&mut servo, &config.servo);

    let controller = ValveController::new(servo, config.motion);
    let filter = IntentFilter::new(config.buttons.hold_ms);

    // Spawn tasks
    spawner.spawn(tasks::indicator_task(leds)).unwrap();
    spawner
        .spawn(tasks::button_task(open_button, Button::Open))
        .unwrap();
    spawner
        .spawn(tasks::button_task(close_button, Button::Close))
        .unwrap();
    spawner
        .spawn(tasks::controller_task(controller, filter))
        .unwrap();

    info!("All tasks spawned, firmware running");

    // Main task has nothing else to do - all work happens in spawned tasks
    loop {
        Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}
