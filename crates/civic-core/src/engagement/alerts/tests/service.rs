use axum::http::StatusCode;

use super::common::*;
use crate::engagement::alerts::{
    AlertService, AlertServiceError, DeliveryChannel, DeliveryStatus, NewAlert, NewSubscription,
    SubscriptionId,
};
use crate::store::Database;

fn subscribe_to(neighborhood: Option<&str>, channel: DeliveryChannel) -> NewSubscription {
    NewSubscription {
        neighborhood: neighborhood.map(str::to_string),
        channel,
    }
}

fn storm_warning(neighborhood: &str) -> NewAlert {
    NewAlert {
        message: "Snow emergency declared; move vehicles off plow routes".to_string(),
        neighborhood: neighborhood.to_string(),
        channel: None,
    }
}

#[tokio::test]
async fn subscription_defaults_to_home_neighborhood() {
    let service = service_with(RecordingDispatcher::default()).await;
    let ada = resident("ada", "como");

    let home = service
        .subscribe(&ada, subscribe_to(None, DeliveryChannel::Push))
        .await
        .expect("subscribed");
    assert_eq!(home.neighborhood, "como");

    let elsewhere = service
        .subscribe(&ada, subscribe_to(Some(" West Seventh "), DeliveryChannel::Sms))
        .await
        .expect("subscribed");
    assert_eq!(elsewhere.neighborhood, "west-seventh");

    let listed = service.subscriptions(&ada.id).await.expect("listed");
    assert_eq!(listed, vec![home, elsewhere]);
}

#[tokio::test]
async fn duplicate_subscription_conflicts() {
    let service = service_with(RecordingDispatcher::default()).await;
    let ada = resident("ada", "como");

    service
        .subscribe(&ada, subscribe_to(None, DeliveryChannel::Email))
        .await
        .expect("first subscription");
    let err = service
        .subscribe(&ada, subscribe_to(Some("Como"), DeliveryChannel::Email))
        .await
        .expect_err("same triple");
    assert!(matches!(err, AlertServiceError::AlreadySubscribed { .. }));
    assert_eq!(err.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn only_owner_can_unsubscribe() {
    let service = service_with(RecordingDispatcher::default()).await;
    let ada = resident("ada", "como");
    let bo = resident("bo", "como");

    let subscription = service
        .subscribe(&ada, subscribe_to(None, DeliveryChannel::Push))
        .await
        .expect("subscribed");

    let err = service
        .unsubscribe(&bo.id, &subscription.id)
        .await
        .expect_err("not the owner");
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

    service
        .unsubscribe(&ada.id, &subscription.id)
        .await
        .expect("owner removes");
    assert!(service.subscriptions(&ada.id).await.expect("listed").is_empty());

    assert!(matches!(
        service
            .unsubscribe(&ada.id, &SubscriptionId("sub-gone".to_string()))
            .await,
        Err(AlertServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn dispatch_reaches_only_matching_neighborhood() {
    let dispatcher = RecordingDispatcher::default();
    let service = service_with(dispatcher.clone()).await;
    let ada = resident("ada", "como");
    let bo = resident("bo", "como");
    let cy = resident("cy", "frogtown");

    for citizen in [&ada, &bo, &cy] {
        service
            .subscribe(citizen, subscribe_to(None, DeliveryChannel::Push))
            .await
            .expect("subscribed");
    }

    let report = service
        .dispatch(storm_warning("Como"))
        .await
        .expect("dispatched");
    assert_eq!(report.attempted, 2);
    assert_eq!(report.delivered, 2);
    assert_eq!(report.failed, 0);

    let recipients: Vec<_> = dispatcher
        .sent()
        .into_iter()
        .map(|notification| notification.citizen_id)
        .collect();
    assert_eq!(recipients, vec![ada.id, bo.id]);
}

#[tokio::test]
async fn channel_filter_narrows_recipients() {
    let dispatcher = RecordingDispatcher::default();
    let service = service_with(dispatcher.clone()).await;
    let ada = resident("ada", "como");

    service
        .subscribe(&ada, subscribe_to(None, DeliveryChannel::Push))
        .await
        .expect("push");
    service
        .subscribe(&ada, subscribe_to(None, DeliveryChannel::Sms))
        .await
        .expect("sms");

    let mut alert = storm_warning("como");
    alert.channel = Some(DeliveryChannel::Sms);
    let report = service.dispatch(alert).await.expect("dispatched");

    assert_eq!(report.attempted, 1);
    assert_eq!(dispatcher.sent()[0].channel, DeliveryChannel::Sms);
}

#[tokio::test]
async fn failed_delivery_is_recorded_and_rest_continue() {
    let ada = resident("ada", "como");
    let bo = resident("bo", "como");
    let dispatcher = RecordingDispatcher::refusing(&ada.id);
    let service = service_with(dispatcher.clone()).await;

    service
        .subscribe(&ada, subscribe_to(None, DeliveryChannel::Email))
        .await
        .expect("subscribed");
    service
        .subscribe(&bo, subscribe_to(None, DeliveryChannel::Email))
        .await
        .expect("subscribed");

    let report = service
        .dispatch(storm_warning("como"))
        .await
        .expect("dispatch completes despite failure");
    assert_eq!(report.attempted, 2);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(dispatcher.sent().len(), 1);

    let deliveries = service
        .deliveries(&report.alert_id)
        .await
        .expect("deliveries");
    assert_eq!(deliveries.len(), 2);
    assert_eq!(deliveries[0].status, DeliveryStatus::Failed);
    assert!(deliveries[0]
        .detail
        .as_deref()
        .unwrap_or_default()
        .contains("gateway timeout"));
    assert_eq!(deliveries[1].status, DeliveryStatus::Delivered);
    assert!(deliveries[1].detail.is_none());
}

#[tokio::test]
async fn alert_without_subscribers_is_still_stored() {
    let service = service_with(RecordingDispatcher::default()).await;

    let report = service
        .dispatch(storm_warning("payne-phalen"))
        .await
        .expect("dispatched");
    assert_eq!(report.attempted, 0);

    let stored = service.alerts(Some("Payne Phalen")).await.expect("alerts");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, report.alert_id);
    assert!(service.alerts(Some("como")).await.expect("alerts").is_empty());
}

#[tokio::test]
async fn alerts_list_newest_first() {
    let service = service_with(RecordingDispatcher::default()).await;

    let first = service.dispatch(storm_warning("como")).await.expect("first");
    let second = service
        .dispatch(storm_warning("frogtown"))
        .await
        .expect("second");

    let all = service.alerts(None).await.expect("alerts");
    let ids: Vec<_> = all.into_iter().map(|alert| alert.id).collect();
    assert_eq!(ids, vec![second.alert_id, first.alert_id]);
}

#[tokio::test]
async fn blank_alerts_are_rejected() {
    let service = service_with(RecordingDispatcher::default()).await;

    let mut blank = storm_warning("como");
    blank.message = "   ".to_string();
    let err = service.dispatch(blank).await.expect_err("blank message");
    assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    assert!(matches!(
        service.dispatch(storm_warning(" ")).await,
        Err(AlertServiceError::Invalid(_))
    ));
}

#[tokio::test]
async fn unrecorded_outcomes_do_not_stop_the_fan_out() {
    let database = Database::in_memory().await.expect("in-memory database");
    let dispatcher = RecordingDispatcher::default();
    let service = AlertService::new(database.clone(), dispatcher.clone());
    let ada = resident("ada", "como");
    let bo = resident("bo", "como");

    for citizen in [&ada, &bo] {
        service
            .subscribe(citizen, subscribe_to(None, DeliveryChannel::Push))
            .await
            .expect("subscribed");
    }
    sqlx::query("DROP TABLE alert_deliveries")
        .execute(database.pool())
        .await
        .expect("drop delivery log");

    let report = service
        .dispatch(storm_warning("como"))
        .await
        .expect("dispatch completes without its delivery log");
    assert_eq!(report.attempted, 2);
    assert_eq!(report.delivered, 2);
    assert_eq!(dispatcher.sent().len(), 2);
    assert_eq!(service.alerts(Some("como")).await.expect("alerts").len(), 1);
}
