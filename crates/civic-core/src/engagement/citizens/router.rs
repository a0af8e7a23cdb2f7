use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};

use super::domain::{Citizen, NewCitizen, Registration};
use super::registry::CitizenRegistry;
use crate::gateway::{ApiError, ApiJson, Session};

/// Registration is public; `/me` echoes the caller's identity.
pub fn citizen_router(registry: Arc<CitizenRegistry>) -> Router {
    Router::new()
        .route("/api/v1/citizens", post(register_handler))
        .route("/api/v1/citizens/me", get(me_handler))
        .with_state(registry)
}

pub(crate) async fn register_handler(
    State(registry): State<Arc<CitizenRegistry>>,
    ApiJson(request): ApiJson<NewCitizen>,
) -> Result<(StatusCode, Json<Registration>), ApiError> {
    let registration = registry.register(request).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

pub(crate) async fn me_handler(
    Extension(session): Extension<Session>,
) -> Result<Json<Citizen>, ApiError> {
    let citizen = session.require_citizen()?;
    Ok(Json(citizen.clone()))
}
