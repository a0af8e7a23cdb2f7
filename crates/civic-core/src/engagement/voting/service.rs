use std::collections::HashSet;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::info;

use super::domain::{fold_choice, Ballot, BallotId, BallotStatus, NewBallot, Tally, VoteReceipt};
use crate::engagement::citizens::CitizenId;
use crate::store::{
    at_store_precision, decode_timestamp, encode_timestamp, is_unique_violation, new_id, Database,
    StoreError,
};

#[derive(Debug, thiserror::Error)]
pub enum VotingError {
    #[error("{0}")]
    Invalid(String),
    #[error("ballot {0} not found")]
    NotFound(BallotId),
    #[error("ballot {ballot_id} is {status}, not open for voting")]
    NotOpen {
        ballot_id: BallotId,
        status: BallotStatus,
    },
    #[error("'{choice}' is not an option on this ballot (options: {options})")]
    UnknownChoice { choice: String, options: String },
    #[error("citizen has already voted on ballot {0}")]
    AlreadyVoted(BallotId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl VotingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            VotingError::Invalid(_) | VotingError::UnknownChoice { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            VotingError::NotFound(_) => StatusCode::NOT_FOUND,
            VotingError::NotOpen { .. } | VotingError::AlreadyVoted(_) => StatusCode::CONFLICT,
            VotingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for VotingError {
    fn from(value: sqlx::Error) -> Self {
        Self::Store(StoreError::Database(value))
    }
}

#[derive(Debug, FromRow)]
struct BallotRow {
    id: String,
    title: String,
    description: String,
    options: String,
    opens_at: String,
    closes_at: Option<String>,
    created_at: String,
}

impl BallotRow {
    fn into_ballot(self) -> Result<Ballot, StoreError> {
        let options: Vec<String> = serde_json::from_str(&self.options)
            .map_err(|err| StoreError::Corrupt(format!("invalid ballot options: {err}")))?;

        Ok(Ballot {
            id: BallotId(self.id),
            title: self.title,
            description: self.description,
            options,
            opens_at: decode_timestamp(&self.opens_at)?,
            closes_at: self
                .closes_at
                .as_deref()
                .map(decode_timestamp)
                .transpose()?,
            created_at: decode_timestamp(&self.created_at)?,
        })
    }
}

const BALLOT_COLUMNS: &str = "id, title, description, options, opens_at, closes_at, created_at";

/// Ballot definitions, one-vote-per-citizen casting and derived tallies.
#[derive(Debug, Clone)]
pub struct VotingService {
    database: Database,
}

impl VotingService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub async fn create_ballot(
        &self,
        request: NewBallot,
        now: DateTime<Utc>,
    ) -> Result<Ballot, VotingError> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(VotingError::Invalid("title must not be empty".to_string()));
        }

        let options: Vec<String> = request
            .options
            .iter()
            .map(|option| option.trim().to_string())
            .collect();
        if options.len() < 2 {
            return Err(VotingError::Invalid(
                "a ballot needs at least two options".to_string(),
            ));
        }
        if options.iter().any(String::is_empty) {
            return Err(VotingError::Invalid(
                "ballot options must not be empty".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = options
            .iter()
            .find(|option| !seen.insert(fold_choice(option)))
        {
            return Err(VotingError::Invalid(format!(
                "duplicate ballot option '{duplicate}'"
            )));
        }

        let now = at_store_precision(now);
        let opens_at = request.opens_at.map_or(now, at_store_precision);
        let closes_at = request.closes_at.map(at_store_precision);
        if let Some(closes_at) = closes_at {
            if closes_at <= opens_at {
                return Err(VotingError::Invalid(
                    "closes_at must be after opens_at".to_string(),
                ));
            }
        }

        let ballot = Ballot {
            id: BallotId(new_id("ballot")),
            title: title.to_string(),
            description: request.description.trim().to_string(),
            options,
            opens_at,
            closes_at,
            created_at: now,
        };
        let encoded_options = serde_json::to_string(&ballot.options)
            .map_err(|err| StoreError::Corrupt(err.to_string()))?;

        sqlx::query(
            "INSERT INTO ballots (id, title, description, options, opens_at, closes_at, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&ballot.id.0)
        .bind(&ballot.title)
        .bind(&ballot.description)
        .bind(encoded_options)
        .bind(encode_timestamp(ballot.opens_at))
        .bind(ballot.closes_at.map(encode_timestamp))
        .bind(encode_timestamp(ballot.created_at))
        .execute(self.database.pool())
        .await?;

        info!(ballot = %ballot.id, options = ballot.options.len(), "ballot created");
        Ok(ballot)
    }

    pub async fn get(&self, id: &BallotId) -> Result<Ballot, VotingError> {
        let sql = format!("SELECT {BALLOT_COLUMNS} FROM ballots WHERE id = ?");
        let row = sqlx::query_as::<_, BallotRow>(&sql)
            .bind(&id.0)
            .fetch_optional(self.database.pool())
            .await?;

        match row {
            Some(row) => Ok(row.into_ballot()?),
            None => Err(VotingError::NotFound(id.clone())),
        }
    }

    /// Newest ballots first.
    pub async fn list(&self) -> Result<Vec<Ballot>, VotingError> {
        let sql = format!("SELECT {BALLOT_COLUMNS} FROM ballots ORDER BY opens_at DESC, id");
        let rows = sqlx::query_as::<_, BallotRow>(&sql)
            .fetch_all(self.database.pool())
            .await?;
        Ok(rows
            .into_iter()
            .map(BallotRow::into_ballot)
            .collect::<Result<_, _>>()?)
    }

    pub async fn cast_vote(
        &self,
        ballot_id: &BallotId,
        citizen: &CitizenId,
        choice: &str,
        now: DateTime<Utc>,
    ) -> Result<VoteReceipt, VotingError> {
        let ballot = self.get(ballot_id).await?;

        let status = ballot.status_at(now);
        if status != BallotStatus::Open {
            return Err(VotingError::NotOpen {
                ballot_id: ballot.id,
                status,
            });
        }

        let Some(choice) = ballot.resolve_choice(choice) else {
            return Err(VotingError::UnknownChoice {
                choice: choice.trim().to_string(),
                options: ballot.options.join(", "),
            });
        };

        let receipt = VoteReceipt {
            ballot_id: ballot.id.clone(),
            citizen_id: citizen.clone(),
            choice: choice.to_string(),
            cast_at: at_store_precision(now),
        };

        let inserted = sqlx::query(
            "INSERT INTO votes (ballot_id, citizen_id, choice, cast_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&receipt.ballot_id.0)
        .bind(&receipt.citizen_id.0)
        .bind(&receipt.choice)
        .bind(encode_timestamp(receipt.cast_at))
        .execute(self.database.pool())
        .await;

        match inserted {
            Ok(_) => {
                info!(ballot = %receipt.ballot_id, "vote recorded");
                Ok(receipt)
            }
            Err(err) if is_unique_violation(&err) => {
                Err(VotingError::AlreadyVoted(receipt.ballot_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn tally(&self, ballot_id: &BallotId) -> Result<Tally, VotingError> {
        let ballot = self.get(ballot_id).await?;
        let counts: Vec<(String, i64)> = sqlx::query_as(
            "SELECT choice, COUNT(*) FROM votes WHERE ballot_id = ? GROUP BY choice",
        )
        .bind(&ballot.id.0)
        .fetch_all(self.database.pool())
        .await?;

        Ok(Tally::from_counts(&ballot, &counts))
    }
}
