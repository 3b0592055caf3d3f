//! Volatile (RAM-only) slots of the shared store.
//!
//! Reset to these defaults on every process start; never written to disk.

/// Latest readings and flags published by workers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VolatileState {
    /// Supply voltage in volts.
    pub voltage: f64,
    /// CPU temperature in degrees Celsius.
    pub cpu_temp: f64,
    /// Set by the detector, read by the audio worker.
    pub person_detected: bool,
}
