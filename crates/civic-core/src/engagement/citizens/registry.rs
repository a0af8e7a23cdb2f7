use axum::http::StatusCode;
use sqlx::FromRow;
use tracing::info;

use super::domain::{normalize_neighborhood, Citizen, CitizenId, NewCitizen, Registration};
use crate::store::{decode_timestamp, encode_timestamp, new_id, now, Database, StoreError};

/// Errors raised while registering or resolving citizens.
#[derive(Debug, thiserror::Error)]
pub enum CitizenError {
    #[error("{0}")]
    Invalid(&'static str),
    #[error("citizen {0} not found")]
    NotFound(CitizenId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CitizenError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CitizenError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CitizenError::NotFound(_) => StatusCode::NOT_FOUND,
            CitizenError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for CitizenError {
    fn from(value: sqlx::Error) -> Self {
        Self::Store(StoreError::Database(value))
    }
}

#[derive(Debug, FromRow)]
struct CitizenRow {
    id: String,
    name: String,
    neighborhood: String,
    registered_at: String,
}

impl CitizenRow {
    fn into_citizen(self) -> Result<Citizen, StoreError> {
        Ok(Citizen {
            id: CitizenId(self.id),
            name: self.name,
            neighborhood: self.neighborhood,
            registered_at: decode_timestamp(&self.registered_at)?,
        })
    }
}

/// Citizen identity store; also resolves bearer tokens for the gateway.
#[derive(Debug, Clone)]
pub struct CitizenRegistry {
    database: Database,
}

impl CitizenRegistry {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub async fn register(&self, request: NewCitizen) -> Result<Registration, CitizenError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(CitizenError::Invalid("name must not be empty"));
        }
        let neighborhood = normalize_neighborhood(&request.neighborhood);
        if neighborhood.is_empty() {
            return Err(CitizenError::Invalid("neighborhood must not be empty"));
        }

        let citizen = Citizen {
            id: CitizenId(new_id("citizen")),
            name: name.to_string(),
            neighborhood,
            registered_at: now(),
        };
        let session_token = uuid::Uuid::new_v4().simple().to_string();

        sqlx::query(
            "INSERT INTO citizens (id, name, neighborhood, session_token, registered_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&citizen.id.0)
        .bind(&citizen.name)
        .bind(&citizen.neighborhood)
        .bind(&session_token)
        .bind(encode_timestamp(citizen.registered_at))
        .execute(self.database.pool())
        .await?;

        info!(citizen = %citizen.id, neighborhood = %citizen.neighborhood, "citizen registered");
        Ok(Registration {
            citizen,
            session_token,
        })
    }

    pub async fn get(&self, id: &CitizenId) -> Result<Citizen, CitizenError> {
        let row = sqlx::query_as::<_, CitizenRow>(
            "SELECT id, name, neighborhood, registered_at FROM citizens WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(self.database.pool())
        .await?;

        match row {
            Some(row) => Ok(row.into_citizen()?),
            None => Err(CitizenError::NotFound(id.clone())),
        }
    }

    /// Resolve a bearer token to its citizen, if any.
    pub async fn authenticate(&self, token: &str) -> Result<Option<Citizen>, CitizenError> {
        let row = sqlx::query_as::<_, CitizenRow>(
            "SELECT id, name, neighborhood, registered_at FROM citizens WHERE session_token = ?",
        )
        .bind(token)
        .fetch_optional(self.database.pool())
        .await?;

        Ok(row.map(CitizenRow::into_citizen).transpose()?)
    }
}
