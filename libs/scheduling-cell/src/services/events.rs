// libs/scheduling-cell/src/services/events.rs
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Domain events the engine emits for outside collaborators (notification
/// fan-out, billing voids). Delivery and formatting are entirely the
/// subscriber's responsibility; scheduling correctness never depends on
/// anyone listening.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchedulingEvent {
    AppointmentBooked {
        appointment_id: Uuid,
        appointment_number: String,
        doctor_id: Uuid,
        patient_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    },
    AppointmentCancelled {
        appointment_id: Uuid,
        doctor_id: Uuid,
        patient_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        cancelled_by: Uuid,
        reason: Option<String>,
    },
    AppointmentRejected {
        appointment_id: Uuid,
        doctor_id: Uuid,
        patient_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        reason: Option<String>,
    },
}

#[derive(Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<SchedulingEvent>,
}

impl EventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SchedulingEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: SchedulingEvent) {
        // A send error only means nobody is subscribed right now.
        if self.sender.send(event).is_err() {
            debug!("Scheduling event dropped: no active subscribers");
        }
    }
}
