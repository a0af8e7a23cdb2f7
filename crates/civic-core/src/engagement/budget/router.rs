use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};

use super::domain::{BudgetQuery, BudgetSummary, LineItem, NewLineItem, SummaryQuery};
use super::service::BudgetService;
use crate::gateway::{ApiError, ApiJson, ApiQuery, Session};

pub fn budget_router(service: Arc<BudgetService>) -> Router {
    Router::new()
        .route(
            "/api/v1/budget/items",
            post(publish_handler).get(items_handler),
        )
        .route("/api/v1/budget/summary", get(summary_handler))
        .with_state(service)
}

pub(crate) async fn publish_handler(
    State(service): State<Arc<BudgetService>>,
    Extension(session): Extension<Session>,
    ApiJson(request): ApiJson<NewLineItem>,
) -> Result<(StatusCode, Json<LineItem>), ApiError> {
    session.require_staff()?;
    let item = service.publish(request).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub(crate) async fn items_handler(
    State(service): State<Arc<BudgetService>>,
    ApiQuery(query): ApiQuery<BudgetQuery>,
) -> Result<Json<Vec<LineItem>>, ApiError> {
    Ok(Json(service.items(&query).await?))
}

pub(crate) async fn summary_handler(
    State(service): State<Arc<BudgetService>>,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> Result<Json<BudgetSummary>, ApiError> {
    Ok(Json(service.summary(query.fiscal_year).await?))
}
