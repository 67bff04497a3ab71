//! State management module
//!
//! This module contains the timer engine and the state types it owns and publishes.

pub mod engine;
pub mod record;
pub mod session;
pub mod subscription;
pub mod timer_state;

// Re-export main types
pub use engine::{EngineSettings, TimerEngine};
pub use record::PersistedTimerRecord;
pub use session::{EndTime, SessionDescriptor, SessionId, OPEN_END_MARKER};
pub use subscription::Subscription;
pub use timer_state::{Remaining, TimerPhase, TimerState};
