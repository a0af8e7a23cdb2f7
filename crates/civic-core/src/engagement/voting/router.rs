use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};

use super::domain::{BallotId, BallotView, NewBallot, Tally, VoteReceipt, VoteRequest};
use super::service::VotingService;
use crate::gateway::{ApiError, ApiJson, Session};
use crate::store::now;

pub fn voting_router(service: Arc<VotingService>) -> Router {
    Router::new()
        .route("/api/v1/ballots", post(create_handler).get(list_handler))
        .route("/api/v1/ballots/:ballot_id", get(get_handler))
        .route("/api/v1/ballots/:ballot_id/votes", post(vote_handler))
        .route("/api/v1/ballots/:ballot_id/tally", get(tally_handler))
        .with_state(service)
}

pub(crate) async fn create_handler(
    State(service): State<Arc<VotingService>>,
    Extension(session): Extension<Session>,
    ApiJson(request): ApiJson<NewBallot>,
) -> Result<(StatusCode, Json<BallotView>), ApiError> {
    session.require_staff()?;
    let created_at = now();
    let ballot = service.create_ballot(request, created_at).await?;
    Ok((StatusCode::CREATED, Json(ballot.view_at(created_at))))
}

pub(crate) async fn list_handler(
    State(service): State<Arc<VotingService>>,
) -> Result<Json<Vec<BallotView>>, ApiError> {
    let at = now();
    let ballots = service.list().await?;
    Ok(Json(
        ballots.into_iter().map(|ballot| ballot.view_at(at)).collect(),
    ))
}

pub(crate) async fn get_handler(
    State(service): State<Arc<VotingService>>,
    Path(ballot_id): Path<String>,
) -> Result<Json<BallotView>, ApiError> {
    let ballot = service.get(&BallotId(ballot_id)).await?;
    Ok(Json(ballot.view_at(now())))
}

pub(crate) async fn vote_handler(
    State(service): State<Arc<VotingService>>,
    Extension(session): Extension<Session>,
    Path(ballot_id): Path<String>,
    ApiJson(request): ApiJson<VoteRequest>,
) -> Result<(StatusCode, Json<VoteReceipt>), ApiError> {
    let citizen = session.require_citizen()?;
    let receipt = service
        .cast_vote(&BallotId(ballot_id), &citizen.id, &request.choice, now())
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub(crate) async fn tally_handler(
    State(service): State<Arc<VotingService>>,
    Path(ballot_id): Path<String>,
) -> Result<Json<Tally>, ApiError> {
    Ok(Json(service.tally(&BallotId(ballot_id)).await?))
}
