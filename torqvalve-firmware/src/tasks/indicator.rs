//! Indicator task
//!
//! Renders the latest pattern from the controller on the LED pair and
//! keeps the blink patterns running.

use embassy_futures::select::{select, Either};
use embassy_rp::gpio::Output;
use embassy_time::{Duration, Instant, Timer};

use torqvalve_core::traits::{Indicator, IndicatorPattern};
use torqvalve_drivers::indicator::LedPair;
use torqvalve_hal::OutputPin;

use crate::channels::INDICATOR;

/// Board LED, driven high to light
pub struct Led(pub Output<'static>);

impl OutputPin for Led {
    fn set_high(&mut self) {
        self.0.set_high();
    }

    fn set_low(&mut self) {
        self.0.set_low();
    }

    fn is_set_high(&self) -> bool {
        self.0.is_set_high()
    }
}

/// Indicator task
///
/// Sleeps until either a new pattern arrives or the next blink toggle.
#[embassy_executor::task]
pub async fn indicator_task(mut leds: LedPair<Led, Led>) {
    defmt::info!("Indicator task started");

    loop {
        leds.tick(Instant::now().as_millis());

        if let Either::First(pattern) = select(INDICATOR.wait(), Timer::at(next_toggle(&leds))).await {
            defmt::debug!("Indicator: {}", pattern);
            leds.show(pattern);
        }
    }
}

fn next_toggle(leds: &LedPair<Led, Led>) -> Instant {
    leds.next_wakeup().map_or(Instant::MAX, Instant::from_millis)
}

/// Render the current pattern until `until`
async fn run_until(leds: &mut LedPair<Led, Led>, until: Instant) {
    loop {
        leds.tick(Instant::now().as_millis());
        if !leds.pattern().is_animated() {
            Timer::at(until).await;
            return;
        }
        let wake = next_toggle(leds).min(until);
        Timer::at(wake).await;
        if wake >= until {
            return;
        }
    }
}

/// Run the current pattern forever
pub async fn blink_forever(leds: &mut LedPair<Led, Led>) -> ! {
    loop {
        run_until(leds, Instant::MAX).await;
    }
}

/// Switch between two patterns every `period`, forever
///
/// Used by the boot maintenance modes, which never hand over to the
/// controller.
pub async fn alternate_forever(
    leds: &mut LedPair<Led, Led>,
    patterns: [IndicatorPattern; 2],
    period: Duration,
) -> ! {
    let mut switch_at = Instant::now();
    let mut index = 0;
    loop {
        leds.show(patterns[index]);
        switch_at += period;
        run_until(leds, switch_at).await;
        index = (index + 1) % patterns.len();
    }
}
