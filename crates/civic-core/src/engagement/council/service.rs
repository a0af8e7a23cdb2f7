use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::info;

use super::domain::{Meeting, MeetingId, NewMeeting};
use crate::store::{
    at_store_precision, decode_timestamp, encode_timestamp, new_id, now, Database, StoreError,
};

#[derive(Debug, thiserror::Error)]
pub enum CouncilError {
    #[error("{0}")]
    Invalid(&'static str),
    #[error("meeting {0} not found")]
    NotFound(MeetingId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CouncilError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CouncilError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CouncilError::NotFound(_) => StatusCode::NOT_FOUND,
            CouncilError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for CouncilError {
    fn from(value: sqlx::Error) -> Self {
        Self::Store(StoreError::Database(value))
    }
}

#[derive(Debug, FromRow)]
struct MeetingRow {
    id: String,
    title: String,
    body: String,
    location: String,
    scheduled_at: String,
    agenda: String,
    published_at: String,
}

impl MeetingRow {
    fn into_meeting(self) -> Result<Meeting, StoreError> {
        let agenda = serde_json::from_str(&self.agenda)
            .map_err(|err| StoreError::Corrupt(format!("invalid agenda: {err}")))?;
        Ok(Meeting {
            id: MeetingId(self.id),
            title: self.title,
            body: self.body,
            location: self.location,
            scheduled_at: decode_timestamp(&self.scheduled_at)?,
            agenda,
            published_at: decode_timestamp(&self.published_at)?,
        })
    }
}

fn required<'a>(value: &'a str, message: &'static str) -> Result<&'a str, CouncilError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(CouncilError::Invalid(message))
    } else {
        Ok(trimmed)
    }
}

/// Council meeting schedule.
#[derive(Debug, Clone)]
pub struct CouncilService {
    database: Database,
}

impl CouncilService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub async fn publish(&self, request: NewMeeting) -> Result<Meeting, CouncilError> {
        let meeting = Meeting {
            id: MeetingId(new_id("meeting")),
            title: required(&request.title, "title must not be empty")?.to_string(),
            body: required(&request.body, "body must not be empty")?.to_string(),
            location: required(&request.location, "location must not be empty")?.to_string(),
            scheduled_at: at_store_precision(request.scheduled_at),
            agenda: request
                .agenda
                .iter()
                .map(|item| item.trim())
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
            published_at: now(),
        };
        let agenda = serde_json::to_string(&meeting.agenda)
            .map_err(|err| StoreError::Corrupt(err.to_string()))?;

        sqlx::query(
            "INSERT INTO council_meetings \
             (id, title, body, location, scheduled_at, agenda, published_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&meeting.id.0)
        .bind(&meeting.title)
        .bind(&meeting.body)
        .bind(&meeting.location)
        .bind(encode_timestamp(meeting.scheduled_at))
        .bind(agenda)
        .bind(encode_timestamp(meeting.published_at))
        .execute(self.database.pool())
        .await?;

        info!(meeting = %meeting.id, body = %meeting.body, "council meeting published");
        Ok(meeting)
    }

    /// Meetings in schedule order; with `from`, only those at or after it.
    pub async fn meetings(
        &self,
        from: Option<DateTime<Utc>>,
    ) -> Result<Vec<Meeting>, CouncilError> {
        let rows = sqlx::query_as::<_, MeetingRow>(
            "SELECT id, title, body, location, scheduled_at, agenda, published_at \
             FROM council_meetings WHERE ?1 IS NULL OR scheduled_at >= ?1 \
             ORDER BY scheduled_at, rowid",
        )
        .bind(from.map(encode_timestamp))
        .fetch_all(self.database.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(MeetingRow::into_meeting)
            .collect::<Result<_, _>>()?)
    }

    pub async fn get(&self, id: &MeetingId) -> Result<Meeting, CouncilError> {
        let row = sqlx::query_as::<_, MeetingRow>(
            "SELECT id, title, body, location, scheduled_at, agenda, published_at \
             FROM council_meetings WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(self.database.pool())
        .await?;

        match row {
            Some(row) => Ok(row.into_meeting()?),
            None => Err(CouncilError::NotFound(id.clone())),
        }
    }
}
