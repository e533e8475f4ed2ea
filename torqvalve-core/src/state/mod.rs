//! Valve motion state machine
//!
//! The state machine is explicit, finite, and deterministic. It only
//! decides the next state; the controller performs the side effects.

pub mod events;
pub mod machine;

pub use events::Event;
pub use machine::State;
