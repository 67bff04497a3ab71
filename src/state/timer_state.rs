//! Timer state structure broadcast to subscribers

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::session::{EndTime, SessionDescriptor, SessionId};
use crate::utils::format::{format_ended, format_hms, format_hms_u64};

/// Time left in a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Seconds(u64),
    /// Open-ended session, no countdown
    Ongoing,
}

impl Remaining {
    pub fn seconds(&self) -> Option<u64> {
        match self {
            Remaining::Seconds(secs) => Some(*secs),
            Remaining::Ongoing => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Remaining::Seconds(secs) => format_hms_u64(*secs),
            Remaining::Ongoing => "ongoing".to_string(),
        }
    }
}

impl Serialize for Remaining {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Remaining::Seconds(secs) => serializer.serialize_u64(*secs),
            Remaining::Ongoing => serializer.serialize_str("ongoing"),
        }
    }
}

/// Coarse lifecycle position of the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Active,
    Ended,
}

/// Snapshot of the timer as seen by subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub is_active: bool,
    pub session_id: Option<SessionId>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<EndTime>,
    pub elapsed_seconds: u64,
    pub remaining: Option<Remaining>,
    pub elapsed_time_string: String,
}

impl TimerState {
    /// Create an idle timer state
    pub fn new() -> Self {
        Self {
            is_active: false,
            session_id: None,
            start_time: None,
            end_time: None,
            elapsed_seconds: 0,
            remaining: None,
            elapsed_time_string: format_hms(0),
        }
    }

    /// Create an active timer state for a session
    pub fn active(session: &SessionDescriptor, elapsed_seconds: u64, remaining: Remaining) -> Self {
        Self {
            is_active: true,
            session_id: Some(session.id.clone()),
            start_time: Some(session.start_time),
            end_time: Some(session.end_time),
            elapsed_seconds,
            remaining: Some(remaining),
            elapsed_time_string: format_hms_u64(elapsed_seconds),
        }
    }

    /// Create the terminal state of a session that reached its end
    pub fn ended(session: &SessionDescriptor, elapsed_seconds: u64) -> Self {
        Self {
            is_active: false,
            session_id: Some(session.id.clone()),
            start_time: Some(session.start_time),
            end_time: Some(session.end_time),
            elapsed_seconds,
            remaining: Some(Remaining::Seconds(0)),
            elapsed_time_string: format_ended(elapsed_seconds),
        }
    }

    pub fn phase(&self) -> TimerPhase {
        match (self.is_active, &self.session_id) {
            (true, _) => TimerPhase::Active,
            (false, Some(_)) => TimerPhase::Ended,
            (false, None) => TimerPhase::Idle,
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Remaining time as display text, empty while idle
    pub fn remaining_time_string(&self) -> String {
        self.remaining.map(|r| r.display()).unwrap_or_default()
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new()
    }
}
