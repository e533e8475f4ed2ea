//! Green/red LED pair
//!
//! - `Off`: both dark
//! - `OpenSolid`: green
//! - `ClosedSolid`: red
//! - `MovingBlink`: green and red alternate every 750 ms
//! - `FaultBlink`: red toggles every 250 ms, green dark

use torqvalve_core::traits::{Indicator, IndicatorPattern};
use torqvalve_hal::OutputPin;

/// Half period of the moving blink
pub const MOVING_BLINK_MS: u64 = 750;

/// Half period of the fault blink
pub const FAULT_BLINK_MS: u64 = 250;

/// Two-LED indicator
///
/// `show` renders the first phase at once; [`LedPair::tick`] advances
/// animated patterns and must be called at least as often as
/// [`LedPair::next_wakeup`] asks.
pub struct LedPair<G, R> {
    green: G,
    red: R,
    pattern: IndicatorPattern,
    /// Second half of the blink cycle
    phase: bool,
    next_toggle_ms: Option<u64>,
}

impl<G: OutputPin, R: OutputPin> LedPair<G, R> {
    /// Create the pair with both LEDs dark
    pub fn new(green: G, red: R) -> Self {
        let mut leds = Self {
            green,
            red,
            pattern: IndicatorPattern::Off,
            phase: false,
            next_toggle_ms: None,
        };
        leds.render();
        leds
    }

    pub fn pattern(&self) -> IndicatorPattern {
        self.pattern
    }

    fn half_period_ms(&self) -> Option<u64> {
        match self.pattern {
            IndicatorPattern::MovingBlink => Some(MOVING_BLINK_MS),
            IndicatorPattern::FaultBlink => Some(FAULT_BLINK_MS),
            _ => None,
        }
    }

    /// Advance the animation to `now_ms`
    pub fn tick(&mut self, now_ms: u64) {
        let Some(half_period) = self.half_period_ms() else {
            return;
        };
        match self.next_toggle_ms {
            // First tick after `show` starts the clock
            None => self.next_toggle_ms = Some(now_ms + half_period),
            Some(due) if now_ms >= due => {
                self.phase = !self.phase;
                self.render();
                self.next_toggle_ms = Some(now_ms + half_period);
            }
            Some(_) => {}
        }
    }

    /// When the next toggle is due, if the pattern is animated
    pub fn next_wakeup(&self) -> Option<u64> {
        self.next_toggle_ms
    }

    fn render(&mut self) {
        let (green, red) = match self.pattern {
            IndicatorPattern::Off => (false, false),
            IndicatorPattern::OpenSolid => (true, false),
            IndicatorPattern::ClosedSolid => (false, true),
            IndicatorPattern::MovingBlink => (!self.phase, self.phase),
            IndicatorPattern::FaultBlink => (false, !self.phase),
        };
        self.green.set_state(green);
        self.red.set_state(red);
    }
}

impl<G: OutputPin, R: OutputPin> Indicator for LedPair<G, R> {
    fn show(&mut self, pattern: IndicatorPattern) {
        if pattern == self.pattern {
            return;
        }
        self.pattern = pattern;
        self.phase = false;
        self.next_toggle_ms = None;
        self.render();
    }
}
