//! External service module
//!
//! Side effects outside the process: durable storage of the active timer.

pub mod persistence;

// Re-export main items
pub use persistence::{FileStore, MemoryStore, TimerStore, STORE_KEY};
