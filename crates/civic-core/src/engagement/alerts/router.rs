use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, post};
use axum::{Extension, Json, Router};

use super::dispatcher::AlertDispatcher;
use super::domain::{
    Alert, AlertQuery, DispatchReport, NewAlert, NewSubscription, Subscription, SubscriptionId,
};
use super::service::AlertService;
use crate::gateway::{ApiError, ApiJson, ApiQuery, Session};

/// Subscription management for citizens plus staff alert dispatch.
pub fn alert_router<D>(service: Arc<AlertService<D>>) -> Router
where
    D: AlertDispatcher + 'static,
{
    Router::new()
        .route(
            "/api/v1/subscriptions",
            post(subscribe_handler::<D>).get(subscriptions_handler::<D>),
        )
        .route(
            "/api/v1/subscriptions/:subscription_id",
            delete(unsubscribe_handler::<D>),
        )
        .route(
            "/api/v1/alerts",
            post(dispatch_handler::<D>).get(alerts_handler::<D>),
        )
        .with_state(service)
}

pub(crate) async fn subscribe_handler<D>(
    State(service): State<Arc<AlertService<D>>>,
    Extension(session): Extension<Session>,
    ApiJson(request): ApiJson<NewSubscription>,
) -> Result<(StatusCode, Json<Subscription>), ApiError>
where
    D: AlertDispatcher + 'static,
{
    let citizen = session.require_citizen()?;
    let subscription = service.subscribe(citizen, request).await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

pub(crate) async fn subscriptions_handler<D>(
    State(service): State<Arc<AlertService<D>>>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<Subscription>>, ApiError>
where
    D: AlertDispatcher + 'static,
{
    let citizen = session.require_citizen()?;
    Ok(Json(service.subscriptions(&citizen.id).await?))
}

pub(crate) async fn unsubscribe_handler<D>(
    State(service): State<Arc<AlertService<D>>>,
    Extension(session): Extension<Session>,
    Path(subscription_id): Path<String>,
) -> Result<StatusCode, ApiError>
where
    D: AlertDispatcher + 'static,
{
    let citizen = session.require_citizen()?;
    service
        .unsubscribe(&citizen.id, &SubscriptionId(subscription_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn dispatch_handler<D>(
    State(service): State<Arc<AlertService<D>>>,
    Extension(session): Extension<Session>,
    ApiJson(request): ApiJson<NewAlert>,
) -> Result<(StatusCode, Json<DispatchReport>), ApiError>
where
    D: AlertDispatcher + 'static,
{
    session.require_staff()?;
    let report = service.dispatch(request).await?;
    Ok((StatusCode::ACCEPTED, Json(report)))
}

pub(crate) async fn alerts_handler<D>(
    State(service): State<Arc<AlertService<D>>>,
    ApiQuery(query): ApiQuery<AlertQuery>,
) -> Result<Json<Vec<Alert>>, ApiError>
where
    D: AlertDispatcher + 'static,
{
    Ok(Json(service.alerts(query.neighborhood.as_deref()).await?))
}
