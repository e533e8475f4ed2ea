//! Inter-task communication channels
//!
//! Defines the static channels used for communication between Embassy tasks.
//! Uses embassy-sync primitives for safe async communication.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use torqvalve_core::input::ButtonEdge;
use torqvalve_core::traits::IndicatorPattern;

/// Channel capacity for button edges
const EDGE_CHANNEL_SIZE: usize = 8;

/// A button edge with the time it was seen
#[derive(Debug, Clone, Copy, defmt::Format)]
pub struct EdgeEvent {
    pub edge: ButtonEdge,
    /// Milliseconds since boot
    pub at_ms: u64,
}

/// Button edges, from the button tasks to the controller
pub static EDGE_CHANNEL: Channel<CriticalSectionRawMutex, EdgeEvent, EDGE_CHANNEL_SIZE> =
    Channel::new();

/// Latest indicator pattern (updated by controller)
pub static INDICATOR: Signal<CriticalSectionRawMutex, IndicatorPattern> = Signal::new();
