//! Events that trigger state transitions

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    // User intents
    /// Open button held long enough
    OpenIntent,
    /// Close button held long enough
    CloseIntent,

    // Monitor events
    /// Load stayed over threshold for the validation count
    StallConfirmed,
    /// Motion deadline reached without a stall
    DeadlineExpired,
    /// Emergency hold period elapsed
    EmergencyCleared,
}
