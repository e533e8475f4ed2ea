//! Front-panel input
//!
//! Button edges in, open/close intents out.

pub mod buttons;

pub use buttons::{Button, ButtonEdge, Intent, IntentFilter};
