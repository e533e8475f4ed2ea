//! GPIO pin abstractions
//!
//! Only outputs are abstracted here: the buttons are edge sources owned by
//! the firmware, while the indicator LEDs are driven from driver code that
//! is tested on the host.

/// Digital output pin
///
/// Implementations should handle the actual hardware register manipulation
/// for the specific chip.
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Set the pin to a specific state
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    /// Check if the pin is currently set high
    fn is_set_high(&self) -> bool;

    /// Toggle the pin state
    fn toggle(&mut self) {
        let high = self.is_set_high();
        self.set_state(!high);
    }
}
