// libs/scheduling-cell/src/services/booking.rs
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::SchedulerConfig;

use crate::models::{
    format_appointment_number, Appointment, AppointmentListQuery, AppointmentStatus,
    BookAppointmentRequest, SchedulingError, SlotKey, TransitionRequest,
};
use crate::services::events::{EventPublisher, SchedulingEvent};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::validation::BookingValidationService;
use crate::store::SchedulingStore;

/// Per-slot-key lock registry. Commit attempts for the same
/// (doctor, date, time) serialize through one async mutex; attempts for
/// different keys never contend. Waiters are bounded: a lock that cannot be
/// taken within the configured window fails fast as a conflict instead of
/// queueing.
struct SlotLockRegistry {
    locks: StdMutex<HashMap<SlotKey, Arc<AsyncMutex<()>>>>,
}

impl SlotLockRegistry {
    fn new() -> Self {
        Self {
            locks: StdMutex::new(HashMap::new()),
        }
    }

    async fn acquire(
        &self,
        key: &SlotKey,
        wait: Duration,
    ) -> Result<OwnedMutexGuard<()>, SchedulingError> {
        let lock = {
            let mut locks = self.locks.lock().expect("slot lock registry poisoned");
            // Drop entries nobody holds anymore before growing the map.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(key.clone()).or_default())
        };

        match timeout(wait, lock.lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                warn!("Timed out waiting for slot lock {}", key);
                Err(SchedulingError::SlotConflict)
            }
        }
    }
}

/// The only component that mutates shared state. Grants at most one
/// confirmed booking per slot key under concurrency and drives the
/// appointment status state machine.
pub struct BookingService {
    store: Arc<dyn SchedulingStore>,
    validation: BookingValidationService,
    lifecycle: AppointmentLifecycleService,
    locks: SlotLockRegistry,
    events: EventPublisher,
    lock_wait: Duration,
}

impl BookingService {
    pub fn new(store: Arc<dyn SchedulingStore>, config: &SchedulerConfig) -> Self {
        Self {
            validation: BookingValidationService::new(Arc::clone(&store), config),
            store,
            lifecycle: AppointmentLifecycleService::new(),
            locks: SlotLockRegistry::new(),
            events: EventPublisher::new(config.event_channel_capacity),
            lock_wait: Duration::from_millis(config.slot_lock_wait_ms),
        }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SchedulingEvent> {
        self.events.subscribe()
    }

    /// Atomically reserve a slot. Exactly one of N concurrent attempts for
    /// the same key succeeds; the rest observe `SlotConflict` with no row
    /// written, and should re-fetch availability rather than retry blindly.
    pub async fn commit(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        let key = SlotKey {
            doctor_id: request.doctor_id,
            date: request.date,
            time: request.time,
        };

        let _guard = self.locks.acquire(&key, self.lock_wait).await?;

        // Uniqueness re-check under the lock: cancelled/rejected rows have
        // freed the key and do not count.
        let existing = self
            .store
            .appointments_for_day(key.doctor_id, key.date)
            .await?;
        if existing
            .iter()
            .any(|a| a.holds_slot() && a.appointment_time == key.time)
        {
            debug!("Slot {} already taken at commit time", key);
            return Err(SchedulingError::SlotConflict);
        }

        // Slot duration and default clinic come from the window the
        // requested time falls in; a vanished window means availability
        // changed since the slot was shown.
        let window = self
            .validation
            .resolve_window(key.doctor_id, key.date, key.time)
            .await?;

        let sequence = self.store.next_daily_sequence(key.date).await?;
        let now = Utc::now();

        let appointment = Appointment {
            id: Uuid::new_v4(),
            appointment_number: format_appointment_number(key.date, sequence),
            patient_id: request.patient_id,
            doctor_id: key.doctor_id,
            clinic_id: request.clinic_id.or(window.clinic_id),
            appointment_date: key.date,
            appointment_time: key.time,
            duration: window.slot_duration,
            status: AppointmentStatus::Booked,
            reason_for_visit: request.reason_for_visit,
            symptoms: request.symptoms,
            doctor_notes: None,
            cancellation_reason: None,
            cancelled_by: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        };

        self.store.insert_appointment(&appointment).await?;

        self.events.publish(SchedulingEvent::AppointmentBooked {
            appointment_id: appointment.id,
            appointment_number: appointment.appointment_number.clone(),
            doctor_id: appointment.doctor_id,
            patient_id: appointment.patient_id,
            date: appointment.appointment_date,
            time: appointment.appointment_time,
        });

        info!(
            "Appointment {} booked for doctor {} at {} {}",
            appointment.appointment_number, key.doctor_id, key.date, key.time
        );

        Ok(appointment)
    }

    /// Drive a status transition. Every transition takes the same per-key
    /// lock as commit: the read-modify-write on the row must not race a
    /// concurrent transition, and a cancellation must not race a competing
    /// booking for the key it frees.
    pub async fn transition(
        &self,
        appointment_id: Uuid,
        request: TransitionRequest,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self.fetch_live_appointment(appointment_id).await?;

        let _guard = self
            .locks
            .acquire(&appointment.slot_key(), self.lock_wait)
            .await?;

        // Re-read under the lock; the status may have moved while waiting.
        let mut appointment = self.fetch_live_appointment(appointment_id).await?;

        self.lifecycle
            .validate_status_transition(appointment.status, request.status)?;

        let now = Utc::now();
        appointment.status = request.status;
        appointment.updated_at = now;

        if self.lifecycle.frees_slot_key(request.status) {
            appointment.cancellation_reason = request.reason.clone();
            appointment.cancelled_by = Some(request.actor_id);
            appointment.cancelled_at = Some(now);
        }

        self.store.update_appointment(&appointment).await?;

        match request.status {
            AppointmentStatus::Cancelled => {
                self.events.publish(SchedulingEvent::AppointmentCancelled {
                    appointment_id: appointment.id,
                    doctor_id: appointment.doctor_id,
                    patient_id: appointment.patient_id,
                    date: appointment.appointment_date,
                    time: appointment.appointment_time,
                    cancelled_by: request.actor_id,
                    reason: request.reason,
                });
            }
            AppointmentStatus::Rejected => {
                self.events.publish(SchedulingEvent::AppointmentRejected {
                    appointment_id: appointment.id,
                    doctor_id: appointment.doctor_id,
                    patient_id: appointment.patient_id,
                    date: appointment.appointment_date,
                    time: appointment.appointment_time,
                    reason: request.reason,
                });
            }
            _ => {}
        }

        info!(
            "Appointment {} moved to {}",
            appointment.appointment_number, appointment.status
        );

        Ok(appointment)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Appointment, SchedulingError> {
        self.fetch_live_appointment(appointment_id).await
    }

    pub async fn list_appointments(
        &self,
        query: AppointmentListQuery,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        self.store.list_appointments(&query).await
    }

    /// Soft-deleted rows are invisible to callers.
    async fn fetch_live_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Appointment, SchedulingError> {
        match self.store.fetch_appointment(appointment_id).await? {
            Some(appointment) if !appointment.is_deleted => Ok(appointment),
            _ => Err(SchedulingError::NotFound("appointment".to_string())),
        }
    }
}
