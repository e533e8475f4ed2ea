//! Servo trait
//!
//! The controller only needs three things from the servo: spin at a signed
//! speed, let go, and report the load it is pushing against.

/// Servo running in continuous-rotation (wheel) mode
pub trait ValveServo {
    /// Error type for bus operations
    type Error: core::fmt::Debug;

    /// Spin at a signed fraction of full speed in `[-1, 1]`
    ///
    /// Negative turns counter-clockwise. Values outside the range are
    /// clamped by the implementation.
    fn run_continuous(&mut self, speed: f32) -> Result<(), Self::Error>;

    /// Release torque so the output shaft is free
    fn disable_torque(&mut self) -> Result<(), Self::Error>;

    /// Present load as a signed fraction of full torque in `[-1, 1]`
    fn read_load(&mut self) -> Result<f32, Self::Error>;
}
