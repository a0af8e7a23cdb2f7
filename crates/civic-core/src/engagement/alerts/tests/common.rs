use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};

use crate::engagement::alerts::{AlertDispatcher, AlertService, DispatchError, Notification};
use crate::engagement::citizens::{Citizen, CitizenId};
use crate::store::Database;

/// Captures every notification; fails deliveries addressed to `refuse`.
#[derive(Default, Clone)]
pub(super) struct RecordingDispatcher {
    sent: Arc<Mutex<Vec<Notification>>>,
    refuse: Option<CitizenId>,
}

impl RecordingDispatcher {
    pub(super) fn refusing(citizen: &CitizenId) -> Self {
        Self {
            sent: Arc::default(),
            refuse: Some(citizen.clone()),
        }
    }

    pub(super) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("dispatcher mutex poisoned").clone()
    }
}

impl AlertDispatcher for RecordingDispatcher {
    fn deliver(&self, notification: &Notification) -> Result<(), DispatchError> {
        if self.refuse.as_ref() == Some(&notification.citizen_id) {
            return Err(DispatchError::Transport {
                channel: notification.channel,
                reason: "gateway timeout".to_string(),
            });
        }
        self.sent
            .lock()
            .expect("dispatcher mutex poisoned")
            .push(notification.clone());
        Ok(())
    }
}

pub(super) async fn service_with(
    dispatcher: RecordingDispatcher,
) -> AlertService<RecordingDispatcher> {
    let database = Database::in_memory().await.expect("in-memory database");
    AlertService::new(database, dispatcher)
}

pub(super) fn resident(suffix: &str, neighborhood: &str) -> Citizen {
    Citizen {
        id: CitizenId(format!("citizen-{suffix}")),
        name: format!("Resident {suffix}"),
        neighborhood: neighborhood.to_string(),
        registered_at: Utc.with_ymd_and_hms(2025, 4, 2, 12, 0, 0).unwrap(),
    }
}
