//! Session Timer - reload-safe timer for an active study session
//!
//! This library tracks elapsed and remaining time for one session at a time,
//! persists just enough to pick the timer back up after a restart, ends the
//! timer when the session's scheduled end passes, and broadcasts every state
//! change to any number of subscribers.

pub mod commands;
pub mod config;
pub mod error;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{EngineError, StoreError};
pub use services::{FileStore, MemoryStore, TimerStore};
pub use state::{
    EndTime, EngineSettings, PersistedTimerRecord, Remaining, SessionDescriptor, SessionId,
    Subscription, TimerEngine, TimerPhase, TimerState,
};
pub use utils::{format_hms, format_hms_f64, Clock, ManualClock, MonotonicClock, SystemClock};
