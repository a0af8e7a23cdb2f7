use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};

use super::domain::{Meeting, MeetingId, MeetingQuery, NewMeeting};
use super::service::CouncilService;
use crate::gateway::{ApiError, ApiJson, ApiQuery, Session};
use crate::store::now;

pub fn council_router(service: Arc<CouncilService>) -> Router {
    Router::new()
        .route(
            "/api/v1/council/meetings",
            post(publish_handler).get(meetings_handler),
        )
        .route("/api/v1/council/meetings/:meeting_id", get(get_handler))
        .with_state(service)
}

pub(crate) async fn publish_handler(
    State(service): State<Arc<CouncilService>>,
    Extension(session): Extension<Session>,
    ApiJson(request): ApiJson<NewMeeting>,
) -> Result<(StatusCode, Json<Meeting>), ApiError> {
    session.require_staff()?;
    let meeting = service.publish(request).await?;
    Ok((StatusCode::CREATED, Json(meeting)))
}

pub(crate) async fn meetings_handler(
    State(service): State<Arc<CouncilService>>,
    ApiQuery(query): ApiQuery<MeetingQuery>,
) -> Result<Json<Vec<Meeting>>, ApiError> {
    let from = query.upcoming.then(now);
    Ok(Json(service.meetings(from).await?))
}

pub(crate) async fn get_handler(
    State(service): State<Arc<CouncilService>>,
    Path(meeting_id): Path<String>,
) -> Result<Json<Meeting>, ApiError> {
    Ok(Json(service.get(&MeetingId(meeting_id)).await?))
}
