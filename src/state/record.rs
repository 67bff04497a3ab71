//! Durable description of the active timer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::session::{parse_timestamp, to_iso, EndTime, SessionDescriptor, SessionId};
use crate::error::EngineError;

/// Record kept in the store while a timer is active.
///
/// Wire shape: `{ "sessionId", "startTimeISO", "endTimeISO" }`, where
/// `endTimeISO` is an ISO-8601 string, `"infinity"` or `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedTimerRecord {
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,
    #[serde(
        rename = "startTimeISO",
        serialize_with = "serialize_iso",
        deserialize_with = "deserialize_iso"
    )]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "endTimeISO", default)]
    pub end_time: EndTime,
}

impl PersistedTimerRecord {
    /// Turn a stored record back into a session, rejecting schema violations
    pub fn to_session(&self) -> Result<SessionDescriptor, EngineError> {
        let session = SessionDescriptor::new(self.session_id.clone(), self.start_time, self.end_time);
        session.validate()?;
        Ok(session)
    }
}

impl From<&SessionDescriptor> for PersistedTimerRecord {
    fn from(session: &SessionDescriptor) -> Self {
        Self {
            session_id: session.id.clone(),
            start_time: session.start_time,
            end_time: session.end_time,
        }
    }
}

fn serialize_iso<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&to_iso(at))
}

fn deserialize_iso<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp("start", &raw).map_err(serde::de::Error::custom)
}
