//! Neighborhood alerts: citizens subscribe per channel, staff broadcast.

pub mod dispatcher;
pub mod domain;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use dispatcher::{AlertDispatcher, DispatchError, LogDispatcher};
pub use domain::{
    Alert, AlertDelivery, AlertId, AlertQuery, DeliveryChannel, DeliveryStatus, DispatchReport,
    NewAlert, NewSubscription, Notification, Subscription, SubscriptionId,
};
pub use router::alert_router;
pub use service::{AlertService, AlertServiceError};
