//! Safety monitoring
//!
//! Decides when a motion has stopped against the valve seat and keeps the
//! motion timers that bound every motion.

pub mod stall;
pub mod timers;

pub use stall::{StallDetector, StallStatus};
pub use timers::MotionTimers;
