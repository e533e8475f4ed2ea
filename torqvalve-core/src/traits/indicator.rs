//! Indicator trait

/// What the indicator should show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IndicatorPattern {
    /// Everything dark
    #[default]
    Off,
    /// Valve reached the open seat
    OpenSolid,
    /// Valve reached the closed seat
    ClosedSolid,
    /// Motion in progress
    MovingBlink,
    /// Motion deadline expired
    FaultBlink,
}

impl IndicatorPattern {
    /// Patterns that change over time and need periodic ticks
    pub fn is_animated(&self) -> bool {
        matches!(self, IndicatorPattern::MovingBlink | IndicatorPattern::FaultBlink)
    }
}

/// Sink for indicator patterns
///
/// `show` only records the pattern; animated patterns are rendered by the
/// implementation on its own schedule.
pub trait Indicator {
    /// Switch to a new pattern
    fn show(&mut self, pattern: IndicatorPattern);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_animated_patterns() {
        assert!(IndicatorPattern::MovingBlink.is_animated());
        assert!(IndicatorPattern::FaultBlink.is_animated());
        assert!(!IndicatorPattern::OpenSolid.is_animated());
        assert!(!IndicatorPattern::Off.is_animated());
    }
}
