//! Valve controller
//!
//! Owns the servo and drives it from intents and the passage of time.
//! The controller never sleeps: the caller feeds it intents as they
//! happen, calls [`ValveController::poll`] when
//! [`ValveController::next_wakeup`] comes due, and forwards
//! [`ValveController::pattern`] to the indicator after each transition.

use crate::config::MotionConfig;
use crate::input::Intent;
use crate::safety::{MotionTimers, StallDetector, StallStatus};
use crate::state::{Event, State};
use crate::traits::{IndicatorPattern, ValveServo};

/// A state change performed by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transition {
    pub from: State,
    pub to: State,
    pub event: Event,
}

/// Torque-stopped valve controller
pub struct ValveController<S: ValveServo> {
    servo: S,
    config: MotionConfig,
    state: State,
    stall: StallDetector,
    /// Armed only while `Opening` or `Closing`
    timers: Option<MotionTimers>,
    /// End of the emergency hold, armed only in `Emergency`
    emergency_until_ms: Option<u64>,
    /// Set by a deadline expiry, cleared when the next motion starts
    emergency_latched: bool,
    pattern: IndicatorPattern,
}

impl<S: ValveServo> ValveController<S> {
    /// Create an idle controller
    pub fn new(servo: S, config: MotionConfig) -> Self {
        Self {
            servo,
            stall: StallDetector::new(config.torque_threshold, config.validation_count),
            config,
            state: State::Idle,
            timers: None,
            emergency_until_ms: None,
            emergency_latched: false,
            pattern: IndicatorPattern::Off,
        }
    }

    /// Current state
    pub fn state(&self) -> State {
        self.state
    }

    /// Pattern the indicator should show
    pub fn pattern(&self) -> IndicatorPattern {
        self.pattern
    }

    /// Whether the last motion ended on its deadline
    pub fn emergency_latched(&self) -> bool {
        self.emergency_latched
    }

    /// Whether the sample timer and deadline are armed
    pub fn timers_armed(&self) -> bool {
        self.timers.is_some()
    }

    /// Consecutive over-threshold load samples in the current motion
    pub fn overload_count(&self) -> u8 {
        self.stall.consecutive()
    }

    pub fn servo(&self) -> &S {
        &self.servo
    }

    /// Earliest instant [`poll`](Self::poll) has work to do
    pub fn next_wakeup(&self) -> Option<u64> {
        if self.state.is_moving() {
            self.timers.map(|t| t.next_wakeup())
        } else {
            // Armed only in Emergency
            self.emergency_until_ms
        }
    }

    /// Apply a user intent
    ///
    /// Returns the transition taken, or `None` when the intent does not
    /// apply in the current state.
    pub fn handle_intent(&mut self, intent: Intent, now_ms: u64) -> Option<Transition> {
        let event = Event::from(intent);

        // Closing again would restart the deadline; keep the running motion
        if self.state == State::Closing && event == Event::CloseIntent {
            return None;
        }

        let next = self.state.transition(event);
        if next == self.state {
            return None;
        }

        self.start_motion(next, now_ms);
        Some(self.enter(next, event))
    }

    /// Service the timers
    ///
    /// Performs at most one transition per call. While moving, the deadline
    /// is checked before the load so an expired motion never samples again.
    pub fn poll(&mut self, now_ms: u64) -> Option<Transition> {
        match self.state {
            State::Opening | State::Closing => {
                let mut timers = self.timers?;

                if timers.expired(now_ms) {
                    self.begin_emergency(now_ms);
                    return Some(self.enter(State::Emergency, Event::DeadlineExpired));
                }

                if !timers.sample_due(now_ms) {
                    return None;
                }
                timers.reschedule_sample(now_ms);
                self.timers = Some(timers);

                let load = match self.servo.read_load() {
                    Ok(load) => Some(load),
                    Err(e) => {
                        log_servo_error("load read", &e);
                        None
                    }
                };

                match self.stall.sample(load) {
                    StallStatus::Confirmed => {
                        self.finish_motion();
                        Some(self.enter(State::Idle, Event::StallConfirmed))
                    }
                    _ => None,
                }
            }
            State::Emergency => {
                let until = self.emergency_until_ms?;
                if now_ms < until {
                    return None;
                }
                self.emergency_until_ms = None;
                self.pattern = IndicatorPattern::Off;
                Some(self.enter(State::Idle, Event::EmergencyCleared))
            }
            State::Idle => None,
        }
    }

    fn enter(&mut self, to: State, event: Event) -> Transition {
        let transition = Transition {
            from: self.state,
            to,
            event,
        };
        self.state = to;

        #[cfg(feature = "defmt")]
        defmt::debug!("valve {} -> {} on {}", transition.from, to, event);

        transition
    }

    /// Drive the servo towards `target` and arm both timers
    ///
    /// A failed speed command still arms the deadline, which then ends the
    /// motion through the emergency path.
    fn start_motion(&mut self, target: State, now_ms: u64) {
        let speed = match target {
            State::Opening => self.config.opening_speed,
            _ => self.config.closing_speed,
        };
        if let Err(e) = self.servo.run_continuous(speed) {
            log_servo_error("speed command", &e);
        }

        self.timers = Some(MotionTimers::arm(
            now_ms,
            self.config.sample_period_ms,
            self.config.timeout_ms,
        ));
        self.stall.reset();
        self.emergency_until_ms = None;
        self.emergency_latched = false;
        self.pattern = IndicatorPattern::MovingBlink;
    }

    /// The valve seated: release torque and show which side
    fn finish_motion(&mut self) {
        self.release_torque();
        self.timers = None;
        self.pattern = match self.state {
            State::Opening => IndicatorPattern::OpenSolid,
            _ => IndicatorPattern::ClosedSolid,
        };
    }

    fn begin_emergency(&mut self, now_ms: u64) {
        self.release_torque();
        self.timers = None;
        self.emergency_latched = true;
        self.emergency_until_ms = Some(now_ms.saturating_add(self.config.emergency_hold_ms as u64));
        self.pattern = IndicatorPattern::FaultBlink;

        #[cfg(feature = "defmt")]
        defmt::warn!("valve motion timed out, stall never detected");
    }

    fn release_torque(&mut self) {
        if let Err(e) = self.servo.disable_torque() {
            log_servo_error("torque disable", &e);
        }
    }
}

#[allow(unused_variables)]
fn log_servo_error<E: core::fmt::Debug>(what: &str, error: &E) {
    #[cfg(feature = "defmt")]
    defmt::warn!("servo {} failed: {}", what, defmt::Debug2Format(error));
}

#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Call {
        Run(f32),
        Disable,
        ReadLoad,
    }

    #[derive(Debug, PartialEq)]
    struct BusError;

    /// Servo double returning scripted loads and recording every call
    #[derive(Default)]
    struct FakeServo {
        calls: Vec<Call>,
        loads: Vec<Result<f32, ()>>,
        fail_run: bool,
        fail_disable: bool,
    }

    impl FakeServo {
        fn with_loads(loads: &[Result<f32, ()>]) -> Self {
            Self {
                loads: loads.iter().rev().copied().collect(),
                ..Self::default()
            }
        }

        fn disables(&self) -> usize {
            self.calls.iter().filter(|c| **c == Call::Disable).count()
        }

        fn reads(&self) -> usize {
            self.calls.iter().filter(|c| **c == Call::ReadLoad).count()
        }
    }

    impl ValveServo for FakeServo {
        type Error = BusError;

        fn run_continuous(&mut self, speed: f32) -> Result<(), BusError> {
            self.calls.push(Call::Run(speed));
            if self.fail_run {
                Err(BusError)
            } else {
                Ok(())
            }
        }

        fn disable_torque(&mut self) -> Result<(), BusError> {
            self.calls.push(Call::Disable);
            if self.fail_disable {
                Err(BusError)
            } else {
                Ok(())
            }
        }

        fn read_load(&mut self) -> Result<f32, BusError> {
            self.calls.push(Call::ReadLoad);
            // An exhausted script reads as free running
            self.loads.pop().unwrap_or(Ok(0.0)).map_err(|_| BusError)
        }
    }

    fn config() -> MotionConfig {
        MotionConfig::default()
    }

    fn controller(loads: &[Result<f32, ()>]) -> ValveController<FakeServo> {
        ValveController::new(FakeServo::with_loads(loads), config())
    }

    /// Poll at every sample instant up to and including `until`
    fn run_until(ctrl: &mut ValveController<FakeServo>, until: u64) -> Vec<Transition> {
        let mut transitions = Vec::new();
        while let Some(at) = ctrl.next_wakeup() {
            if at > until {
                break;
            }
            if let Some(t) = ctrl.poll(at) {
                transitions.push(t);
            }
        }
        transitions
    }

    #[test]
    fn test_open_starts_motion() {
        let mut ctrl = controller(&[]);
        let t = ctrl.handle_intent(Intent::Open, 1_000).unwrap();
        assert_eq!(t.from, State::Idle);
        assert_eq!(t.to, State::Opening);
        assert_eq!(ctrl.servo().calls, [Call::Run(-0.9)]);
        assert!(ctrl.timers_armed());
        assert_eq!(ctrl.pattern(), IndicatorPattern::MovingBlink);
        assert_eq!(ctrl.next_wakeup(), Some(1_500));
    }

    #[test]
    fn test_close_starts_motion() {
        let mut ctrl = controller(&[]);
        ctrl.handle_intent(Intent::Close, 0);
        assert_eq!(ctrl.state(), State::Closing);
        assert_eq!(ctrl.servo().calls, [Call::Run(0.9)]);
    }

    #[test]
    fn test_stall_needs_validation_count() {
        let loads = [Ok(0.8), Ok(0.9), Ok(-0.8)];
        let mut ctrl = controller(&loads);
        ctrl.handle_intent(Intent::Open, 0);

        let transitions = run_until(&mut ctrl, 1_500);
        assert!(transitions.is_empty());
        assert_eq!(ctrl.state(), State::Opening);
        assert_eq!(ctrl.overload_count(), 3);
        assert!(ctrl.timers_armed());
    }

    #[test]
    fn test_stall_stops_opening() {
        let loads = [Ok(0.1), Ok(0.8), Ok(0.8), Ok(0.9), Ok(0.75)];
        let mut ctrl = controller(&loads);
        ctrl.handle_intent(Intent::Open, 0);

        let transitions = run_until(&mut ctrl, 5_000);
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].event, Event::StallConfirmed);
        assert_eq!(ctrl.state(), State::Idle);
        assert!(!ctrl.timers_armed());
        assert_eq!(ctrl.servo().disables(), 1);
        assert_eq!(ctrl.servo().reads(), 5);
        assert_eq!(ctrl.pattern(), IndicatorPattern::OpenSolid);
        assert!(!ctrl.emergency_latched());
        assert_eq!(ctrl.next_wakeup(), None);
    }

    #[test]
    fn test_stall_stops_closing() {
        let loads = [Ok(-0.9); 4];
        let mut ctrl = controller(&loads);
        ctrl.handle_intent(Intent::Close, 0);
        run_until(&mut ctrl, 5_000);
        assert_eq!(ctrl.state(), State::Idle);
        assert_eq!(ctrl.pattern(), IndicatorPattern::ClosedSolid);
    }

    #[test]
    fn test_failed_reads_do_not_break_run() {
        let loads = [Ok(0.9), Err(()), Ok(0.9), Err(()), Ok(0.9), Ok(0.9)];
        let mut ctrl = controller(&loads);
        ctrl.handle_intent(Intent::Open, 0);

        run_until(&mut ctrl, 2_500);
        assert_eq!(ctrl.state(), State::Opening);
        assert_eq!(ctrl.overload_count(), 3);

        run_until(&mut ctrl, 3_000);
        assert_eq!(ctrl.state(), State::Idle);
    }

    #[test]
    fn test_deadline_enters_emergency() {
        let mut ctrl = controller(&[]);
        ctrl.handle_intent(Intent::Open, 0);

        let transitions = run_until(&mut ctrl, 6_999);
        assert!(transitions.is_empty());
        assert_eq!(ctrl.state(), State::Opening);

        let t = ctrl.poll(7_000).unwrap();
        assert_eq!(t.event, Event::DeadlineExpired);
        assert_eq!(ctrl.state(), State::Emergency);
        assert!(ctrl.emergency_latched());
        assert!(!ctrl.timers_armed());
        assert_eq!(ctrl.servo().disables(), 1);
        assert_eq!(ctrl.pattern(), IndicatorPattern::FaultBlink);

        // Hold period
        assert_eq!(ctrl.next_wakeup(), Some(8_500));
        assert_eq!(ctrl.poll(8_499), None);
        let t = ctrl.poll(8_500).unwrap();
        assert_eq!(t.event, Event::EmergencyCleared);
        assert_eq!(ctrl.state(), State::Idle);
        assert_eq!(ctrl.pattern(), IndicatorPattern::Off);
        assert!(ctrl.emergency_latched());
    }

    #[test]
    fn test_deadline_checked_before_sample() {
        let mut ctrl = controller(&[]);
        ctrl.handle_intent(Intent::Open, 0);
        // A single late poll after the deadline must not read the load
        let t = ctrl.poll(10_000).unwrap();
        assert_eq!(t.to, State::Emergency);
        assert_eq!(ctrl.servo().reads(), 0);
    }

    #[test]
    fn test_zero_emergency_hold() {
        let mut config = config();
        config.emergency_hold_ms = 0;
        let mut ctrl = ValveController::new(FakeServo::default(), config);
        ctrl.handle_intent(Intent::Close, 0);
        assert_eq!(ctrl.poll(7_000).map(|t| t.to), Some(State::Emergency));
        assert_eq!(ctrl.poll(7_000).map(|t| t.to), Some(State::Idle));
    }

    #[test]
    fn test_close_overrides_opening() {
        let mut ctrl = controller(&[Ok(0.9), Ok(0.9)]);
        ctrl.handle_intent(Intent::Open, 0);
        run_until(&mut ctrl, 1_000);
        assert_eq!(ctrl.overload_count(), 2);

        let t = ctrl.handle_intent(Intent::Close, 1_200).unwrap();
        assert_eq!(t.from, State::Opening);
        assert_eq!(t.to, State::Closing);
        assert_eq!(ctrl.overload_count(), 0);
        // Deadline restarts with the new motion
        assert_eq!(ctrl.next_wakeup(), Some(1_700));
        assert_eq!(ctrl.servo().calls.last(), Some(&Call::Run(0.9)));
    }

    #[test]
    fn test_open_while_closing_is_ignored() {
        let mut ctrl = controller(&[]);
        ctrl.handle_intent(Intent::Close, 0);
        assert_eq!(ctrl.handle_intent(Intent::Open, 100), None);
        assert_eq!(ctrl.state(), State::Closing);
        assert_eq!(ctrl.servo().calls.len(), 1);
    }

    #[test]
    fn test_close_while_closing_keeps_deadline() {
        let mut ctrl = controller(&[]);
        ctrl.handle_intent(Intent::Close, 0);
        assert_eq!(ctrl.handle_intent(Intent::Close, 3_000), None);
        run_until(&mut ctrl, 6_999);
        assert_eq!(ctrl.poll(7_000).map(|t| t.to), Some(State::Emergency));
    }

    #[test]
    fn test_open_while_opening_is_noop() {
        let mut ctrl = controller(&[]);
        ctrl.handle_intent(Intent::Open, 0);
        assert_eq!(ctrl.handle_intent(Intent::Open, 10), None);
        assert_eq!(ctrl.servo().calls.len(), 1);
    }

    #[test]
    fn test_emergency_accepts_close_only() {
        let mut ctrl = controller(&[]);
        ctrl.handle_intent(Intent::Open, 0);
        ctrl.poll(7_000);
        assert_eq!(ctrl.handle_intent(Intent::Open, 7_100), None);

        let t = ctrl.handle_intent(Intent::Close, 7_200).unwrap();
        assert_eq!(t.from, State::Emergency);
        assert!(!ctrl.emergency_latched());
        assert!(ctrl.timers_armed());
    }

    #[test]
    fn test_failed_start_still_bounded() {
        let mut ctrl = ValveController::new(
            FakeServo {
                fail_run: true,
                ..FakeServo::default()
            },
            config(),
        );
        assert!(ctrl.handle_intent(Intent::Open, 0).is_some());
        assert!(ctrl.timers_armed());
        assert_eq!(ctrl.poll(7_000).map(|t| t.to), Some(State::Emergency));
    }

    #[test]
    fn test_failed_disable_still_goes_idle() {
        let mut servo = FakeServo::with_loads(&[Ok(0.9); 4]);
        servo.fail_disable = true;
        let mut ctrl = ValveController::new(servo, config());
        ctrl.handle_intent(Intent::Close, 0);
        run_until(&mut ctrl, 2_000);
        assert_eq!(ctrl.state(), State::Idle);
        assert!(!ctrl.timers_armed());
    }

    #[test]
    fn test_idle_poll_does_nothing() {
        let mut ctrl = controller(&[]);
        assert_eq!(ctrl.poll(1_000_000), None);
        assert!(ctrl.servo().calls.is_empty());
    }
}
