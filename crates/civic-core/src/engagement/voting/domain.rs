use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engagement::citizens::CitizenId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BallotId(pub String);

impl fmt::Display for BallotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Case-insensitive key for ballot options; shared by duplicate checks and vote matching.
pub(crate) fn fold_choice(value: &str) -> String {
    value.trim().to_lowercase()
}

/// A ballot initiative citizens vote on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ballot {
    pub id: BallotId,
    pub title: String,
    pub description: String,
    pub options: Vec<String>,
    pub opens_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closes_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BallotStatus {
    Scheduled,
    Open,
    Closed,
}

impl BallotStatus {
    pub const fn label(self) -> &'static str {
        match self {
            BallotStatus::Scheduled => "scheduled",
            BallotStatus::Open => "open",
            BallotStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for BallotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Ballot {
    /// Voting window is `[opens_at, closes_at)`.
    pub fn status_at(&self, now: DateTime<Utc>) -> BallotStatus {
        if now < self.opens_at {
            BallotStatus::Scheduled
        } else if self.closes_at.is_some_and(|closes_at| now >= closes_at) {
            BallotStatus::Closed
        } else {
            BallotStatus::Open
        }
    }

    /// Match a submitted choice against the ballot options, ignoring case.
    pub fn resolve_choice(&self, raw: &str) -> Option<&str> {
        let wanted = fold_choice(raw);
        self.options
            .iter()
            .find(|option| fold_choice(option) == wanted)
            .map(String::as_str)
    }

    pub fn view_at(self, now: DateTime<Utc>) -> BallotView {
        let status = self.status_at(now);
        BallotView {
            ballot: self,
            status,
        }
    }
}

/// Ballot plus its status at the time of the request.
#[derive(Debug, Clone, Serialize)]
pub struct BallotView {
    #[serde(flatten)]
    pub ballot: Ballot,
    pub status: BallotStatus,
}

/// Staff payload defining a new initiative. `opens_at` defaults to now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBallot {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub opens_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closes_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    pub choice: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteReceipt {
    pub ballot_id: BallotId,
    pub citizen_id: CitizenId,
    pub choice: String,
    pub cast_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionTally {
    pub option: String,
    pub votes: i64,
}

/// Result derived from stored votes on demand; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub ballot_id: BallotId,
    pub total_votes: i64,
    pub options: Vec<OptionTally>,
    pub leader: Option<String>,
}

impl Tally {
    /// Build a tally in ballot option order; options without votes count as zero.
    pub fn from_counts(ballot: &Ballot, counts: &[(String, i64)]) -> Self {
        let options: Vec<OptionTally> = ballot
            .options
            .iter()
            .map(|option| OptionTally {
                option: option.clone(),
                votes: counts
                    .iter()
                    .filter(|(choice, _)| choice == option)
                    .map(|(_, votes)| *votes)
                    .sum(),
            })
            .collect();

        let total_votes = options.iter().map(|entry| entry.votes).sum();
        let top = options.iter().map(|entry| entry.votes).max().unwrap_or(0);
        let mut leaders = options.iter().filter(|entry| entry.votes == top);
        let leader = match (top, leaders.next(), leaders.next()) {
            (0, _, _) => None,
            (_, Some(entry), None) => Some(entry.option.clone()),
            _ => None,
        };

        Self {
            ballot_id: ballot.id.clone(),
            total_votes,
            options,
            leader,
        }
    }
}
