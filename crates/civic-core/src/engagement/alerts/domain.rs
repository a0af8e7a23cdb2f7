use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engagement::citizens::CitizenId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub String);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(pub String);

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    Push,
    Email,
    Sms,
}

impl DeliveryChannel {
    pub const fn label(self) -> &'static str {
        match self {
            DeliveryChannel::Push => "push",
            DeliveryChannel::Email => "email",
            DeliveryChannel::Sms => "sms",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        match raw {
            "push" => Some(DeliveryChannel::Push),
            "email" => Some(DeliveryChannel::Email),
            "sms" => Some(DeliveryChannel::Sms),
            _ => None,
        }
    }
}

impl fmt::Display for DeliveryChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub citizen_id: CitizenId,
    pub neighborhood: String,
    pub channel: DeliveryChannel,
    pub created_at: DateTime<Utc>,
}

/// Subscribe request; the neighborhood falls back to the citizen's own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubscription {
    #[serde(default)]
    pub neighborhood: Option<String>,
    pub channel: DeliveryChannel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub message: String,
    pub neighborhood: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<DeliveryChannel>,
    pub created_at: DateTime<Utc>,
}

/// Staff broadcast; `channel` narrows delivery to one channel when set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAlert {
    pub message: String,
    pub neighborhood: String,
    #[serde(default)]
    pub channel: Option<DeliveryChannel>,
}

/// Payload handed to an [`AlertDispatcher`](super::AlertDispatcher) for one subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub alert_id: AlertId,
    pub subscription_id: SubscriptionId,
    pub citizen_id: CitizenId,
    pub channel: DeliveryChannel,
    pub neighborhood: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        match raw {
            "delivered" => Some(DeliveryStatus::Delivered),
            "failed" => Some(DeliveryStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertDelivery {
    pub alert_id: AlertId,
    pub subscription_id: SubscriptionId,
    pub citizen_id: CitizenId,
    pub channel: DeliveryChannel,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub alert_id: AlertId,
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertQuery {
    #[serde(default)]
    pub neighborhood: Option<String>,
}
