use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::db::models::Appointment;

/// Lifecycle notifications for the dispatcher. Delivery is best-effort by
/// construction: subscribers that lag or disconnect miss events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "appointment", rename_all = "snake_case")]
pub enum AppointmentEvent {
    Created(Appointment),
    Confirmed(Appointment),
    Rescheduled(Appointment),
    Cancelled(Appointment),
    Completed(Appointment),
}

#[derive(Clone)]
pub struct EventPublisher {
    tx: broadcast::Sender<AppointmentEvent>,
}

impl EventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppointmentEvent> {
        self.tx.subscribe()
    }

    /// Publishing never fails the surrounding request; a send error only
    /// means nobody is subscribed right now.
    pub fn publish(&self, event: AppointmentEvent) {
        if let Err(err) = self.tx.send(event) {
            debug!("No subscribers for appointment event: {}", err);
        }
    }
}
