use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use super::session::AccessError;
use crate::engagement::alerts::AlertServiceError;
use crate::engagement::budget::BudgetError;
use crate::engagement::citizens::CitizenError;
use crate::engagement::council::CouncilError;
use crate::engagement::issues::IssueServiceError;
use crate::engagement::voting::VotingError;

/// Error returned by every gateway handler; renders as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Citizens(#[from] CitizenError),
    #[error(transparent)]
    Issues(#[from] IssueServiceError),
    #[error(transparent)]
    Voting(#[from] VotingError),
    #[error(transparent)]
    Alerts(#[from] AlertServiceError),
    #[error(transparent)]
    Budget(#[from] BudgetError),
    #[error(transparent)]
    Council(#[from] CouncilError),
    /// Body or query string the extractors could not decode.
    #[error("{message}")]
    Malformed { status: StatusCode, message: String },
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Malformed {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Malformed {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: rejection.body_text(),
        }
    }
}

/// JSON body extractor whose rejections render through [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejections render through [`ApiError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Access(err) => err.status_code(),
            ApiError::Citizens(err) => err.status_code(),
            ApiError::Issues(err) => err.status_code(),
            ApiError::Voting(err) => err.status_code(),
            ApiError::Alerts(err) => err.status_code(),
            ApiError::Budget(err) => err.status_code(),
            ApiError::Council(err) => err.status_code(),
            ApiError::Malformed { status, .. } => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
