use axum::http::StatusCode;
use sqlx::FromRow;
use tracing::{info, warn};

use super::dispatcher::AlertDispatcher;
use super::domain::{
    Alert, AlertDelivery, AlertId, DeliveryChannel, DeliveryStatus, DispatchReport, NewAlert,
    NewSubscription, Notification, Subscription, SubscriptionId,
};
use crate::engagement::citizens::{normalize_neighborhood, Citizen, CitizenId};
use crate::store::{
    decode_timestamp, encode_timestamp, is_unique_violation, new_id, now, Database, StoreError,
};

#[derive(Debug, thiserror::Error)]
pub enum AlertServiceError {
    #[error("{0}")]
    Invalid(&'static str),
    #[error("already subscribed to {neighborhood} via {channel}")]
    AlreadySubscribed {
        neighborhood: String,
        channel: DeliveryChannel,
    },
    #[error("subscription {0} not found")]
    NotFound(SubscriptionId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AlertServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AlertServiceError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AlertServiceError::AlreadySubscribed { .. } => StatusCode::CONFLICT,
            AlertServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            AlertServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AlertServiceError {
    fn from(value: sqlx::Error) -> Self {
        Self::Store(StoreError::Database(value))
    }
}

fn decode_channel(raw: &str) -> Result<DeliveryChannel, StoreError> {
    DeliveryChannel::from_label(raw)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown delivery channel '{raw}'")))
}

#[derive(Debug, FromRow)]
struct SubscriptionRow {
    id: String,
    citizen_id: String,
    neighborhood: String,
    channel: String,
    created_at: String,
}

impl SubscriptionRow {
    fn into_subscription(self) -> Result<Subscription, StoreError> {
        Ok(Subscription {
            id: SubscriptionId(self.id),
            citizen_id: CitizenId(self.citizen_id),
            neighborhood: self.neighborhood,
            channel: decode_channel(&self.channel)?,
            created_at: decode_timestamp(&self.created_at)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct AlertRow {
    id: String,
    message: String,
    neighborhood: String,
    channel: Option<String>,
    created_at: String,
}

impl AlertRow {
    fn into_alert(self) -> Result<Alert, StoreError> {
        Ok(Alert {
            id: AlertId(self.id),
            message: self.message,
            neighborhood: self.neighborhood,
            channel: self.channel.as_deref().map(decode_channel).transpose()?,
            created_at: decode_timestamp(&self.created_at)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct DeliveryRow {
    alert_id: String,
    subscription_id: String,
    citizen_id: String,
    channel: String,
    status: String,
    detail: Option<String>,
    attempted_at: String,
}

impl DeliveryRow {
    fn into_delivery(self) -> Result<AlertDelivery, StoreError> {
        let status = DeliveryStatus::from_label(&self.status).ok_or_else(|| {
            StoreError::Corrupt(format!("unknown delivery status '{}'", self.status))
        })?;
        Ok(AlertDelivery {
            alert_id: AlertId(self.alert_id),
            subscription_id: SubscriptionId(self.subscription_id),
            citizen_id: CitizenId(self.citizen_id),
            channel: decode_channel(&self.channel)?,
            status,
            detail: self.detail,
            attempted_at: decode_timestamp(&self.attempted_at)?,
        })
    }
}

/// Neighborhood subscriptions and alert fan-out through an [`AlertDispatcher`].
#[derive(Debug)]
pub struct AlertService<D> {
    database: Database,
    dispatcher: D,
}

impl<D> AlertService<D>
where
    D: AlertDispatcher,
{
    pub fn new(database: Database, dispatcher: D) -> Self {
        Self {
            database,
            dispatcher,
        }
    }

    pub async fn subscribe(
        &self,
        citizen: &Citizen,
        request: NewSubscription,
    ) -> Result<Subscription, AlertServiceError> {
        let neighborhood = match request.neighborhood.as_deref() {
            Some(raw) => normalize_neighborhood(raw),
            None => citizen.neighborhood.clone(),
        };
        if neighborhood.is_empty() {
            return Err(AlertServiceError::Invalid("neighborhood must not be empty"));
        }

        let subscription = Subscription {
            id: SubscriptionId(new_id("sub")),
            citizen_id: citizen.id.clone(),
            neighborhood,
            channel: request.channel,
            created_at: now(),
        };

        let inserted = sqlx::query(
            "INSERT INTO subscriptions (id, citizen_id, neighborhood, channel, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&subscription.id.0)
        .bind(&subscription.citizen_id.0)
        .bind(&subscription.neighborhood)
        .bind(subscription.channel.label())
        .bind(encode_timestamp(subscription.created_at))
        .execute(self.database.pool())
        .await;

        match inserted {
            Ok(_) => {
                info!(
                    citizen = %subscription.citizen_id,
                    neighborhood = %subscription.neighborhood,
                    channel = %subscription.channel,
                    "subscription created"
                );
                Ok(subscription)
            }
            Err(err) if is_unique_violation(&err) => Err(AlertServiceError::AlreadySubscribed {
                neighborhood: subscription.neighborhood,
                channel: subscription.channel,
            }),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn subscriptions(
        &self,
        citizen: &CitizenId,
    ) -> Result<Vec<Subscription>, AlertServiceError> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            "SELECT id, citizen_id, neighborhood, channel, created_at FROM subscriptions \
             WHERE citizen_id = ? ORDER BY created_at, rowid",
        )
        .bind(&citizen.0)
        .fetch_all(self.database.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(SubscriptionRow::into_subscription)
            .collect::<Result<_, _>>()?)
    }

    /// Only the owning citizen may remove a subscription.
    pub async fn unsubscribe(
        &self,
        citizen: &CitizenId,
        id: &SubscriptionId,
    ) -> Result<(), AlertServiceError> {
        let removed = sqlx::query("DELETE FROM subscriptions WHERE id = ? AND citizen_id = ?")
            .bind(&id.0)
            .bind(&citizen.0)
            .execute(self.database.pool())
            .await?
            .rows_affected();

        if removed == 0 {
            return Err(AlertServiceError::NotFound(id.clone()));
        }
        info!(citizen = %citizen, subscription = %id, "subscription removed");
        Ok(())
    }

    /// Store the alert and attempt one delivery per matching subscription.
    ///
    /// A failed delivery is recorded and counted; it never stops the rest.
    pub async fn dispatch(&self, request: NewAlert) -> Result<DispatchReport, AlertServiceError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(AlertServiceError::Invalid("message must not be empty"));
        }
        let neighborhood = normalize_neighborhood(&request.neighborhood);
        if neighborhood.is_empty() {
            return Err(AlertServiceError::Invalid("neighborhood must not be empty"));
        }

        let channel = request.channel.map(DeliveryChannel::label);
        let recipients = sqlx::query_as::<_, SubscriptionRow>(
            "SELECT id, citizen_id, neighborhood, channel, created_at FROM subscriptions \
             WHERE neighborhood = ?1 AND (?2 IS NULL OR channel = ?2) \
             ORDER BY created_at, rowid",
        )
        .bind(&neighborhood)
        .bind(channel)
        .fetch_all(self.database.pool())
        .await?
        .into_iter()
        .map(SubscriptionRow::into_subscription)
        .collect::<Result<Vec<_>, _>>()?;

        let alert = Alert {
            id: AlertId(new_id("alert")),
            message: message.to_string(),
            neighborhood,
            channel: request.channel,
            created_at: now(),
        };

        sqlx::query(
            "INSERT INTO alerts (id, message, neighborhood, channel, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&alert.id.0)
        .bind(&alert.message)
        .bind(&alert.neighborhood)
        .bind(channel)
        .bind(encode_timestamp(alert.created_at))
        .execute(self.database.pool())
        .await?;

        let mut report = DispatchReport {
            alert_id: alert.id.clone(),
            attempted: 0,
            delivered: 0,
            failed: 0,
        };

        // Bookkeeping failures are logged; they never stop the fan-out.
        for subscription in recipients {
            let notification = Notification {
                alert_id: alert.id.clone(),
                subscription_id: subscription.id,
                citizen_id: subscription.citizen_id,
                channel: subscription.channel,
                neighborhood: alert.neighborhood.clone(),
                message: alert.message.clone(),
            };

            report.attempted += 1;
            let (status, detail) = match self.dispatcher.deliver(&notification) {
                Ok(()) => {
                    report.delivered += 1;
                    (DeliveryStatus::Delivered, None)
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        alert = %alert.id,
                        citizen = %notification.citizen_id,
                        error = %err,
                        "alert delivery failed"
                    );
                    (DeliveryStatus::Failed, Some(err.to_string()))
                }
            };

            if let Err(err) = self.record_delivery(&notification, status, detail).await {
                warn!(
                    alert = %alert.id,
                    citizen = %notification.citizen_id,
                    error = %err,
                    "delivery outcome not recorded"
                );
            }
        }

        info!(
            alert = %report.alert_id,
            neighborhood = %alert.neighborhood,
            attempted = report.attempted,
            failed = report.failed,
            "alert dispatched"
        );
        Ok(report)
    }

    async fn record_delivery(
        &self,
        notification: &Notification,
        status: DeliveryStatus,
        detail: Option<String>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO alert_deliveries \
             (alert_id, subscription_id, citizen_id, channel, status, detail, attempted_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&notification.alert_id.0)
        .bind(&notification.subscription_id.0)
        .bind(&notification.citizen_id.0)
        .bind(notification.channel.label())
        .bind(status.label())
        .bind(detail)
        .bind(encode_timestamp(now()))
        .execute(self.database.pool())
        .await?;
        Ok(())
    }

    /// Newest alerts first, optionally for a single neighborhood.
    pub async fn alerts(&self, neighborhood: Option<&str>) -> Result<Vec<Alert>, AlertServiceError> {
        let neighborhood = neighborhood.map(normalize_neighborhood);
        let rows = sqlx::query_as::<_, AlertRow>(
            "SELECT id, message, neighborhood, channel, created_at FROM alerts \
             WHERE ?1 IS NULL OR neighborhood = ?1 \
             ORDER BY created_at DESC, rowid DESC",
        )
        .bind(neighborhood)
        .fetch_all(self.database.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(AlertRow::into_alert)
            .collect::<Result<_, _>>()?)
    }

    pub async fn deliveries(&self, alert: &AlertId) -> Result<Vec<AlertDelivery>, AlertServiceError> {
        let rows = sqlx::query_as::<_, DeliveryRow>(
            "SELECT alert_id, subscription_id, citizen_id, channel, status, detail, attempted_at \
             FROM alert_deliveries WHERE alert_id = ? ORDER BY rowid",
        )
        .bind(&alert.0)
        .fetch_all(self.database.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(DeliveryRow::into_delivery)
            .collect::<Result<_, _>>()?)
    }
}
