//! Background tasks module
//!
//! This module contains the tick loop that drives an active timer.

pub mod tick_loop;

// Re-export main items
pub use tick_loop::TickLoop;
