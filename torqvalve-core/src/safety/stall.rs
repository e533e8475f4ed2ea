//! Stall detector
//!
//! The servo has no end-stop: a motion ends when the valve seats and the
//! load the servo reports stays high. A single high sample is not enough;
//! `required` consecutive samples over the threshold confirm the stall.

/// Result of one load sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StallStatus {
    /// Load under threshold
    Clear,
    /// Over threshold, not yet confirmed (consecutive count so far)
    Building(u8),
    /// Over threshold for the required number of samples
    Confirmed,
}

/// Debounced load threshold
#[derive(Debug, Clone)]
pub struct StallDetector {
    /// Absolute load fraction that counts as "over"
    threshold: f32,
    /// Consecutive over-threshold samples that confirm a stall
    required: u8,
    /// Current run of over-threshold samples
    consecutive: u8,
}

impl StallDetector {
    /// Create a detector
    ///
    /// A `required` count of zero is treated as one.
    pub fn new(threshold: f32, required: u8) -> Self {
        Self {
            threshold,
            required: required.max(1),
            consecutive: 0,
        }
    }

    /// Forget the current run, e.g. when a new motion starts
    pub fn reset(&mut self) {
        self.consecutive = 0;
    }

    /// Current run of over-threshold samples
    pub fn consecutive(&self) -> u8 {
        self.consecutive
    }

    /// Feed one load sample
    ///
    /// `None` means the read failed: no data this tick, so the run is
    /// neither extended nor broken.
    pub fn sample(&mut self, load: Option<f32>) -> StallStatus {
        let Some(load) = load else {
            return self.status();
        };

        let magnitude = if load < 0.0 { -load } else { load };
        if magnitude > self.threshold {
            self.consecutive = self.consecutive.saturating_add(1);
        } else {
            self.consecutive = 0;
        }
        self.status()
    }

    fn status(&self) -> StallStatus {
        if self.consecutive >= self.required {
            StallStatus::Confirmed
        } else if self.consecutive == 0 {
            StallStatus::Clear
        } else {
            StallStatus::Building(self.consecutive)
        }
    }
}
