//! Motion timers
//!
//! The load sample timer and the motion deadline only make sense together,
//! so they live in one value that is armed and cancelled as a unit.

/// Armed timers of the motion in progress (milliseconds since boot)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionTimers {
    /// Next load sample
    pub next_sample_ms: u64,
    /// Hard stop for the motion
    pub deadline_ms: u64,
    sample_period_ms: u64,
}

impl MotionTimers {
    /// Arm both timers for a motion starting at `now_ms`
    pub fn arm(now_ms: u64, sample_period_ms: u32, timeout_ms: u32) -> Self {
        Self {
            next_sample_ms: now_ms.saturating_add(sample_period_ms as u64),
            deadline_ms: now_ms.saturating_add(timeout_ms as u64),
            sample_period_ms: sample_period_ms as u64,
        }
    }

    /// Deadline reached
    pub fn expired(&self, now_ms: u64) -> bool {
        now_ms >= self.deadline_ms
    }

    /// Sample due
    pub fn sample_due(&self, now_ms: u64) -> bool {
        now_ms >= self.next_sample_ms
    }

    /// Schedule the next sample one period after `now_ms`
    ///
    /// Late samples do not pile up: a poll that comes in long after the
    /// sample was due takes one sample, not several.
    pub fn reschedule_sample(&mut self, now_ms: u64) {
        self.next_sample_ms = now_ms.saturating_add(self.sample_period_ms);
    }

    /// Earliest instant one of the timers needs attention
    pub fn next_wakeup(&self) -> u64 {
        self.next_sample_ms.min(self.deadline_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm() {
        let timers = MotionTimers::arm(1_000, 500, 7_000);
        assert_eq!(timers.next_sample_ms, 1_500);
        assert_eq!(timers.deadline_ms, 8_000);
        assert_eq!(timers.next_wakeup(), 1_500);
    }

    #[test]
    fn test_sample_and_deadline() {
        let mut timers = MotionTimers::arm(0, 500, 1_200);
        assert!(!timers.sample_due(499));
        assert!(timers.sample_due(500));

        timers.reschedule_sample(1_100);
        assert_eq!(timers.next_sample_ms, 1_600);
        // Deadline comes first now
        assert_eq!(timers.next_wakeup(), 1_200);
        assert!(!timers.expired(1_199));
        assert!(timers.expired(1_200));
    }
}
