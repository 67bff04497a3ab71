//! Session identity and time window

use std::fmt;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::Remaining;
use crate::error::EngineError;

/// Marker used for a session without a scheduled end
pub const OPEN_END_MARKER: &str = "infinity";

/// Opaque session identifier, numeric or textual
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionId {
    Number(i64),
    Text(String),
}

impl SessionId {
    /// Read an id typed by a user: integers become numeric ids, anything else stays text
    pub fn from_input(input: &str) -> Self {
        input
            .trim()
            .parse::<i64>()
            .map(SessionId::Number)
            .unwrap_or_else(|_| SessionId::Text(input.to_string()))
    }

    /// An empty or whitespace-only textual id counts as missing
    pub fn is_blank(&self) -> bool {
        match self {
            SessionId::Number(_) => false,
            SessionId::Text(text) => text.trim().is_empty(),
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionId::Number(n) => write!(f, "{}", n),
            SessionId::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for SessionId {
    fn from(value: i64) -> Self {
        SessionId::Number(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        SessionId::Text(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        SessionId::Text(value)
    }
}

/// Scheduled end of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndTime {
    /// No end boundary
    #[default]
    Open,
    At(DateTime<Utc>),
}

impl EndTime {
    /// Parse an end time; `None` and the open-end marker both mean open-ended
    pub fn parse(value: Option<&str>) -> Result<Self, EngineError> {
        match value.map(str::trim) {
            None => Ok(EndTime::Open),
            Some(OPEN_END_MARKER) => Ok(EndTime::Open),
            Some(text) => parse_timestamp("end", text).map(EndTime::At),
        }
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            EndTime::Open => None,
            EndTime::At(at) => Some(*at),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, EndTime::Open)
    }

    /// Whether a concrete end has been reached at `now`
    pub fn has_passed(&self, now: DateTime<Utc>) -> bool {
        self.instant().is_some_and(|end| now >= end)
    }
}

impl fmt::Display for EndTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndTime::Open => f.write_str(OPEN_END_MARKER),
            EndTime::At(at) => f.write_str(&to_iso(at)),
        }
    }
}

impl Serialize for EndTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EndTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        EndTime::parse(raw.as_deref()).map_err(de::Error::custom)
    }
}

/// Parse an RFC 3339 / ISO-8601 timestamp into UTC
pub fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>, EngineError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|at| at.with_timezone(&Utc))
        .map_err(|_| EngineError::InvalidTimestamp {
            field,
            value: value.to_string(),
        })
}

/// Render a timestamp the way browsers' `toISOString` does
pub fn to_iso(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Whole seconds in a span, floored and clamped at zero
fn whole_seconds(delta: TimeDelta) -> u64 {
    delta.num_seconds().max(0) as u64
}

/// Evaluation of a session's window at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    Running { elapsed: u64, remaining: Remaining },
    Finished { elapsed: u64 },
}

/// The slice of a study session the timer tracks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescriptor {
    pub id: SessionId,
    pub start_time: DateTime<Utc>,
    pub end_time: EndTime,
}

impl SessionDescriptor {
    pub fn new(id: impl Into<SessionId>, start_time: DateTime<Utc>, end_time: EndTime) -> Self {
        Self {
            id: id.into(),
            start_time,
            end_time,
        }
    }

    /// Build a descriptor from raw text fields, validating each one
    pub fn parse(id: &str, start: &str, end: Option<&str>) -> Result<Self, EngineError> {
        let session = Self {
            id: SessionId::from_input(id),
            start_time: parse_timestamp("start", start)?,
            end_time: EndTime::parse(end)?,
        };
        session.validate()?;
        Ok(session)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.id.is_blank() {
            return Err(EngineError::MissingSessionId);
        }
        if let EndTime::At(end) = self.end_time {
            if end < self.start_time {
                return Err(EngineError::EndBeforeStart);
            }
        }
        Ok(())
    }

    /// Seconds since the start, zero if `now` precedes it
    pub fn elapsed_seconds_at(&self, now: DateTime<Utc>) -> u64 {
        whole_seconds(now - self.start_time)
    }

    /// Seconds until the end, or `Ongoing` for an open-ended session
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Remaining {
        match self.end_time {
            EndTime::Open => Remaining::Ongoing,
            EndTime::At(end) => Remaining::Seconds(whole_seconds(end - now)),
        }
    }

    /// Full length of a bounded session in whole seconds
    pub fn duration_seconds(&self) -> Option<u64> {
        self.end_time
            .instant()
            .map(|end| whole_seconds(end - self.start_time))
    }

    pub fn read_at(&self, now: DateTime<Utc>) -> Reading {
        match (self.remaining_at(now), self.duration_seconds()) {
            (Remaining::Seconds(0), Some(total)) => Reading::Finished { elapsed: total },
            (remaining, _) => Reading::Running {
                elapsed: self.elapsed_seconds_at(now),
                remaining,
            },
        }
    }
}
