// libs/scheduling-cell/src/services/slots.rs
use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::SchedulerConfig;

use crate::models::{DayOfWeek, DoctorAvailability, SchedulingError, Slot};
use crate::services::availability::AvailabilityService;
use crate::store::SchedulingStore;

/// Derives the bookable slots for a (doctor, date) pair. Pure read: the
/// output carries no reservation and is valid only as of the moment it was
/// computed; commit-time checks own correctness.
#[derive(Clone)]
pub struct SlotGeneratorService {
    store: Arc<dyn SchedulingStore>,
    availability: AvailabilityService,
    min_lead_time_minutes: i64,
}

impl SlotGeneratorService {
    pub fn new(store: Arc<dyn SchedulingStore>, config: &SchedulerConfig) -> Self {
        Self {
            availability: AvailabilityService::new(Arc::clone(&store)),
            store,
            min_lead_time_minutes: config.min_lead_time_minutes,
        }
    }

    /// Compute the open slots for a doctor on a date, ascending by start
    /// time. Leave days yield an empty sequence regardless of windows.
    pub async fn generate_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, SchedulingError> {
        debug!("Generating slots for doctor {} on {}", doctor_id, date);

        let leaves = self.availability.leaves_for(doctor_id, date).await?;
        if !leaves.is_empty() {
            debug!("Doctor {} is on leave on {}, no slots", doctor_id, date);
            return Ok(vec![]);
        }

        let windows = self
            .availability
            .windows_for(doctor_id, DayOfWeek::of(date))
            .await?;

        let mut slots = Vec::new();
        for window in &windows {
            expand_window(window, date, &mut slots);
        }

        // Chronological merge across windows. Identical (start, end) pairs
        // from the same clinic collapse to one; distinct clinics stay
        // separate bookable slots.
        slots.sort_by(|a, b| (a.start_time, a.clinic_id).cmp(&(b.start_time, b.clinic_id)));
        slots.dedup();

        self.remove_booked_slots(doctor_id, date, &mut slots).await?;
        self.apply_lead_time(date, &mut slots);

        debug!("Found {} open slots", slots.len());
        Ok(slots)
    }

    /// Drop every slot occupied by an existing appointment. An appointment
    /// occupies exactly one generated slot; an appointment that overlaps a
    /// slot without matching its start points at mismatched durations in
    /// the availability configuration.
    async fn remove_booked_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        slots: &mut Vec<Slot>,
    ) -> Result<(), SchedulingError> {
        let appointments = self.store.appointments_for_day(doctor_id, date).await?;
        let occupied: Vec<_> = appointments.iter().filter(|a| a.holds_slot()).collect();

        slots.retain(|slot| {
            for appointment in &occupied {
                if appointment.appointment_time == slot.start_time {
                    return false;
                }

                let slot_start = date.and_time(slot.start_time);
                let slot_end = date.and_time(slot.end_time);
                if appointment.start_datetime() < slot_end
                    && appointment.end_datetime() > slot_start
                {
                    warn!(
                        "Appointment {} at {} overlaps slot {}-{} without matching its start; check slot_duration configuration",
                        appointment.appointment_number,
                        appointment.appointment_time,
                        slot.start_time,
                        slot.end_time
                    );
                    return false;
                }
            }
            true
        });

        Ok(())
    }

    /// For today (or a past date) drop slots starting before
    /// now + minimum lead time.
    fn apply_lead_time(&self, date: NaiveDate, slots: &mut Vec<Slot>) {
        let now = Utc::now();
        if date > now.date_naive() {
            return;
        }

        let cutoff = now + Duration::minutes(self.min_lead_time_minutes);
        slots.retain(|slot| date.and_time(slot.start_time).and_utc() >= cutoff);
    }
}

/// Emit consecutive `slot_duration` slots from the window start, dropping
/// any trailing partial slot.
fn expand_window(window: &DoctorAvailability, date: NaiveDate, slots: &mut Vec<Slot>) {
    if window.slot_duration <= 0 {
        warn!(
            "Availability window {} has non-positive slot_duration {}, skipping",
            window.id, window.slot_duration
        );
        return;
    }

    let slot_length = Duration::minutes(window.slot_duration as i64);
    let mut cursor = window.start_time;

    loop {
        let remaining = window.end_time.signed_duration_since(cursor);
        if remaining < slot_length {
            break;
        }

        slots.push(Slot {
            date,
            start_time: cursor,
            end_time: cursor + slot_length,
            duration: window.slot_duration,
            clinic_id: window.clinic_id,
        });

        cursor += slot_length;
    }
}
