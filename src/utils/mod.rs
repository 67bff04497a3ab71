//! Utility functions module
//!
//! Clocks, display formatting and signal handling used throughout the crate.

pub mod clock;
pub mod format;
pub mod signals;

// Re-export main items
pub use clock::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use format::{format_ended, format_hms, format_hms_f64, format_hms_u64, PLACEHOLDER};
pub use signals::shutdown_signal;
