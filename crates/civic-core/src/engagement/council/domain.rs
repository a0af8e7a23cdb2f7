use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeetingId(pub String);

impl fmt::Display for MeetingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    pub title: String,
    /// Governing body holding the meeting, e.g. "City Council".
    pub body: String,
    pub location: String,
    pub scheduled_at: DateTime<Utc>,
    pub agenda: Vec<String>,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMeeting {
    pub title: String,
    pub body: String,
    pub location: String,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub agenda: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeetingQuery {
    #[serde(default)]
    pub upcoming: bool,
}
