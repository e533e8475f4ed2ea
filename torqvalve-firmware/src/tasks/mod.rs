//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod buttons;
pub mod controller;
pub mod indicator;

pub use buttons::button_task;
pub use controller::{controller_task, Servo};
pub use indicator::{indicator_task, Led};
