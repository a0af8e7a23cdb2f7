use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for registered citizens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CitizenId(pub String);

impl std::fmt::Display for CitizenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Public identity of a citizen. The session token is never part of this view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citizen {
    pub id: CitizenId,
    pub name: String,
    pub neighborhood: String,
    pub registered_at: DateTime<Utc>,
}

/// Registration payload accepted from citizen-facing clients.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCitizen {
    pub name: String,
    pub neighborhood: String,
}

/// Returned once, at registration, so the client can store its bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    #[serde(flatten)]
    pub citizen: Citizen,
    pub session_token: String,
}

/// Canonical neighborhood key used for alert targeting: `"  North  Loop "` -> `"north-loop"`.
pub fn normalize_neighborhood(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
