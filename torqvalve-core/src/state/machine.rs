//! State machine definition
//!
//! Servo motion and the indicator are a function of the current state
//! and an event.

use super::events::Event;

/// Valve actuator states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Servo stopped, torque released
    #[default]
    Idle,
    /// Turning towards open until the valve seats
    Opening,
    /// Turning towards closed until the valve seats
    Closing,
    /// Motion deadline expired; torque released, fault shown
    Emergency,
}

impl State {
    /// Check if the servo is being driven
    pub fn is_moving(&self) -> bool {
        matches!(self, State::Opening | State::Closing)
    }

    /// Process an event and return the next state
    ///
    /// This is the core state transition logic. Close always wins: it
    /// preempts an opening motion and is accepted even during emergency.
    pub fn transition(self, event: Event) -> Self {
        use Event::*;
        use State::*;

        match (self, event) {
            // Idle transitions
            (Idle, OpenIntent) => Opening,

            // Close overrides whatever is going on
            (_, CloseIntent) => Closing,

            // Motion transitions
            (Opening | Closing, StallConfirmed) => Idle,
            (Opening | Closing, DeadlineExpired) => Emergency,

            // Emergency transitions
            (Emergency, EmergencyCleared) => Idle,

            // Default: stay in current state
            _ => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_from_idle() {
        assert_eq!(State::Idle.transition(Event::OpenIntent), State::Opening);
    }

    #[test]
    fn test_close_from_any_state() {
        let states = [State::Idle, State::Opening, State::Closing, State::Emergency];

        for state in states {
            assert_eq!(state.transition(Event::CloseIntent), State::Closing);
        }
    }

    #[test]
    fn test_open_ignored_unless_idle() {
        let states = [State::Opening, State::Closing, State::Emergency];

        for state in states {
            assert_eq!(state.transition(Event::OpenIntent), state);
        }
    }

    #[test]
    fn test_stall_ends_motion() {
        assert_eq!(State::Opening.transition(Event::StallConfirmed), State::Idle);
        assert_eq!(State::Closing.transition(Event::StallConfirmed), State::Idle);
        // Stray stall outside a motion changes nothing
        assert_eq!(State::Idle.transition(Event::StallConfirmed), State::Idle);
        assert_eq!(
            State::Emergency.transition(Event::StallConfirmed),
            State::Emergency
        );
    }

    #[test]
    fn test_deadline_flow() {
        let emergency = State::Opening.transition(Event::DeadlineExpired);
        assert_eq!(emergency, State::Emergency);

        let idle = emergency.transition(Event::EmergencyCleared);
        assert_eq!(idle, State::Idle);

        assert_eq!(State::Idle.transition(Event::DeadlineExpired), State::Idle);
    }

    #[test]
    fn test_is_moving() {
        assert!(State::Opening.is_moving());
        assert!(State::Closing.is_moving());
        assert!(!State::Idle.is_moving());
        assert!(!State::Emergency.is_moving());
    }
}
