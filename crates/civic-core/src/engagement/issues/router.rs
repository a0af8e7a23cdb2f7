use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};

use super::domain::{
    Issue, IssueEvent, IssueExport, IssueId, IssueQuery, IssueStats, IssueTransition, NewIssue,
    SupportReceipt,
};
use super::service::IssueService;
use crate::gateway::{ApiError, ApiJson, ApiQuery, Session};

/// Router builder exposing intake, triage and reporting endpoints.
pub fn issue_router(service: Arc<IssueService>) -> Router {
    Router::new()
        .route("/api/v1/issues", post(report_handler).get(list_handler))
        .route("/api/v1/issues/stats", get(stats_handler))
        .route("/api/v1/issues/export", get(export_handler))
        .route("/api/v1/issues/:issue_id", get(get_handler))
        .route("/api/v1/issues/:issue_id/history", get(history_handler))
        .route("/api/v1/issues/:issue_id/upvote", post(upvote_handler))
        .route("/api/v1/issues/:issue_id/status", post(transition_handler))
        .with_state(service)
}

pub(crate) async fn report_handler(
    State(service): State<Arc<IssueService>>,
    Extension(session): Extension<Session>,
    ApiJson(request): ApiJson<NewIssue>,
) -> Result<(StatusCode, Json<Issue>), ApiError> {
    let citizen = session.require_citizen()?;
    let issue = service.report(request, Some(&citizen.id)).await?;
    Ok((StatusCode::CREATED, Json(issue)))
}

pub(crate) async fn list_handler(
    State(service): State<Arc<IssueService>>,
    ApiQuery(query): ApiQuery<IssueQuery>,
) -> Result<Json<Vec<Issue>>, ApiError> {
    Ok(Json(service.list(&query).await?))
}

pub(crate) async fn stats_handler(
    State(service): State<Arc<IssueService>>,
) -> Result<Json<IssueStats>, ApiError> {
    Ok(Json(service.stats().await?))
}

pub(crate) async fn export_handler(
    State(service): State<Arc<IssueService>>,
) -> Result<Json<IssueExport>, ApiError> {
    Ok(Json(service.export().await?))
}

pub(crate) async fn get_handler(
    State(service): State<Arc<IssueService>>,
    Path(issue_id): Path<String>,
) -> Result<Json<Issue>, ApiError> {
    Ok(Json(service.get(&IssueId(issue_id)).await?))
}

pub(crate) async fn history_handler(
    State(service): State<Arc<IssueService>>,
    Path(issue_id): Path<String>,
) -> Result<Json<Vec<IssueEvent>>, ApiError> {
    Ok(Json(service.history(&IssueId(issue_id)).await?))
}

pub(crate) async fn upvote_handler(
    State(service): State<Arc<IssueService>>,
    Extension(session): Extension<Session>,
    Path(issue_id): Path<String>,
) -> Result<Json<SupportReceipt>, ApiError> {
    let citizen = session.require_citizen()?;
    Ok(Json(service.upvote(&IssueId(issue_id), &citizen.id).await?))
}

pub(crate) async fn transition_handler(
    State(service): State<Arc<IssueService>>,
    Extension(session): Extension<Session>,
    Path(issue_id): Path<String>,
    ApiJson(transition): ApiJson<IssueTransition>,
) -> Result<Json<Issue>, ApiError> {
    session.require_staff()?;
    let issue = service
        .transition(&IssueId(issue_id), transition, &session.actor())
        .await?;
    Ok(Json(issue))
}
