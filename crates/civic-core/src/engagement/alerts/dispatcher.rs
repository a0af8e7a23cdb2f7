use tracing::info;

use super::domain::{DeliveryChannel, Notification};

/// Outbound delivery hook (push gateway, mailer, SMS provider).
pub trait AlertDispatcher: Send + Sync {
    fn deliver(&self, notification: &Notification) -> Result<(), DispatchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("{channel} transport unavailable: {reason}")]
    Transport {
        channel: DeliveryChannel,
        reason: String,
    },
    #[error("recipient rejected: {0}")]
    Rejected(String),
}

/// Writes each delivery to the log; used until a real transport is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatcher;

impl AlertDispatcher for LogDispatcher {
    fn deliver(&self, notification: &Notification) -> Result<(), DispatchError> {
        info!(
            alert = %notification.alert_id,
            citizen = %notification.citizen_id,
            channel = %notification.channel,
            neighborhood = %notification.neighborhood,
            "alert delivered"
        );
        Ok(())
    }
}
