//! Button hold filtering
//!
//! Edges arrive from interrupt context with no debouncing. A button only
//! produces an intent after it has stayed pressed for the hold duration,
//! and only once per press.

use crate::state::Event;

/// The two front-panel buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    Open,
    Close,
}

/// A level change seen on a button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonEdge {
    Pressed(Button),
    Released(Button),
}

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Intent {
    Open,
    Close,
}

impl From<Intent> for Event {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::Open => Event::OpenIntent,
            Intent::Close => Event::CloseIntent,
        }
    }
}

/// Hold timer of a single button
#[derive(Debug, Clone, Copy, Default)]
struct HoldTimer {
    pressed_at_ms: Option<u64>,
    fired: bool,
}

impl HoldTimer {
    fn press(&mut self, now_ms: u64) {
        // Bounce while already pressed keeps the original start
        if self.pressed_at_ms.is_none() {
            self.pressed_at_ms = Some(now_ms);
            self.fired = false;
        }
    }

    fn release(&mut self) {
        self.pressed_at_ms = None;
        self.fired = false;
    }

    fn due_at(&self, hold_ms: u32) -> Option<u64> {
        match self.pressed_at_ms {
            Some(start) if !self.fired => Some(start.saturating_add(hold_ms as u64)),
            _ => None,
        }
    }

    fn try_fire(&mut self, now_ms: u64, hold_ms: u32) -> bool {
        match self.due_at(hold_ms) {
            Some(due) if now_ms >= due => {
                self.fired = true;
                true
            }
            _ => false,
        }
    }
}

/// Turns raw button edges into open/close intents
#[derive(Debug, Clone)]
pub struct IntentFilter {
    hold_ms: u32,
    open: HoldTimer,
    close: HoldTimer,
}

impl IntentFilter {
    /// Create a filter with the same hold duration for both buttons
    pub fn new(hold_ms: u32) -> Self {
        Self {
            hold_ms,
            open: HoldTimer::default(),
            close: HoldTimer::default(),
        }
    }

    fn timer(&mut self, button: Button) -> &mut HoldTimer {
        match button {
            Button::Open => &mut self.open,
            Button::Close => &mut self.close,
        }
    }

    /// Record an edge; releasing before the hold elapses cancels the press
    pub fn on_edge(&mut self, edge: ButtonEdge, now_ms: u64) {
        match edge {
            ButtonEdge::Pressed(button) => self.timer(button).press(now_ms),
            ButtonEdge::Released(button) => self.timer(button).release(),
        }
    }

    /// Return the next intent whose hold has elapsed
    ///
    /// Close is checked first. Call repeatedly until `None` to drain both.
    pub fn poll(&mut self, now_ms: u64) -> Option<Intent> {
        let hold_ms = self.hold_ms;
        if self.close.try_fire(now_ms, hold_ms) {
            return Some(Intent::Close);
        }
        if self.open.try_fire(now_ms, hold_ms) {
            return Some(Intent::Open);
        }
        None
    }

    /// Earliest instant a pending hold completes
    pub fn next_wakeup(&self) -> Option<u64> {
        match (self.open.due_at(self.hold_ms), self.close.due_at(self.hold_ms)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_after_hold() {
        let mut filter = IntentFilter::new(2_000);
        filter.on_edge(ButtonEdge::Pressed(Button::Open), 100);
        assert_eq!(filter.next_wakeup(), Some(2_100));
        assert_eq!(filter.poll(2_099), None);
        assert_eq!(filter.poll(2_100), Some(Intent::Open));
    }

    #[test]
    fn test_fires_once_per_press() {
        let mut filter = IntentFilter::new(2_000);
        filter.on_edge(ButtonEdge::Pressed(Button::Close), 0);
        assert_eq!(filter.poll(2_000), Some(Intent::Close));
        assert_eq!(filter.poll(5_000), None);
        assert_eq!(filter.next_wakeup(), None);

        filter.on_edge(ButtonEdge::Released(Button::Close), 5_500);
        filter.on_edge(ButtonEdge::Pressed(Button::Close), 6_000);
        assert_eq!(filter.poll(8_000), Some(Intent::Close));
    }

    #[test]
    fn test_short_press_is_ignored() {
        let mut filter = IntentFilter::new(2_000);
        filter.on_edge(ButtonEdge::Pressed(Button::Open), 0);
        filter.on_edge(ButtonEdge::Released(Button::Open), 1_999);
        assert_eq!(filter.poll(3_000), None);
        assert_eq!(filter.next_wakeup(), None);
    }

    #[test]
    fn test_bounce_keeps_original_start() {
        let mut filter = IntentFilter::new(2_000);
        filter.on_edge(ButtonEdge::Pressed(Button::Open), 0);
        filter.on_edge(ButtonEdge::Pressed(Button::Open), 1_500);
        assert_eq!(filter.poll(2_000), Some(Intent::Open));
    }

    #[test]
    fn test_close_has_priority() {
        let mut filter = IntentFilter::new(1_000);
        filter.on_edge(ButtonEdge::Pressed(Button::Open), 0);
        filter.on_edge(ButtonEdge::Pressed(Button::Close), 0);
        assert_eq!(filter.poll(1_000), Some(Intent::Close));
        assert_eq!(filter.poll(1_000), Some(Intent::Open));
        assert_eq!(filter.poll(1_000), None);
    }

    #[test]
    fn test_next_wakeup_is_earliest() {
        let mut filter = IntentFilter::new(1_000);
        filter.on_edge(ButtonEdge::Pressed(Button::Close), 300);
        filter.on_edge(ButtonEdge::Pressed(Button::Open), 200);
        assert_eq!(filter.next_wakeup(), Some(1_200));
    }

    #[test]
    fn test_intent_to_event() {
        assert_eq!(Event::from(Intent::Open), Event::OpenIntent);
        assert_eq!(Event::from(Intent::Close), Event::CloseIntent);
    }
}
