// libs/scheduling-cell/src/services/validation.rs
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use shared_config::SchedulerConfig;

use crate::models::{DayOfWeek, DoctorAvailability, SchedulingError};
use crate::services::availability::AvailabilityService;
use crate::store::SchedulingStore;

/// Re-checks a requested (doctor, date, time) slot against current
/// availability state. Read-only; the committer owns the race against
/// concurrent bookings.
#[derive(Clone)]
pub struct BookingValidationService {
    store: Arc<dyn SchedulingStore>,
    availability: AvailabilityService,
    min_lead_time_minutes: i64,
    prevent_duplicate_patient_booking: bool,
}

impl BookingValidationService {
    pub fn new(store: Arc<dyn SchedulingStore>, config: &SchedulerConfig) -> Self {
        Self {
            availability: AvailabilityService::new(Arc::clone(&store)),
            store,
            min_lead_time_minutes: config.min_lead_time_minutes,
            prevent_duplicate_patient_booking: config.prevent_duplicate_patient_booking,
        }
    }

    /// Checks run in order and short-circuit on the first failure:
    /// live doctor, window alignment, leave, lead time, then the
    /// configurable duplicate-patient policy.
    pub async fn validate(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        patient_id: Uuid,
    ) -> Result<(), SchedulingError> {
        debug!(
            "Validating slot {} {} for doctor {} / patient {}",
            date, time, doctor_id, patient_id
        );

        self.availability.fetch_live_doctor(doctor_id).await?;

        let window = self.resolve_window(doctor_id, date, time).await?;

        let leaves = self.availability.leaves_for(doctor_id, date).await?;
        if !leaves.is_empty() {
            return Err(SchedulingError::OnLeave);
        }

        self.check_lead_time(date, time)?;

        if self.prevent_duplicate_patient_booking {
            self.check_duplicate_patient_booking(doctor_id, date, time, patient_id, &window)
                .await?;
        }

        Ok(())
    }

    /// Find the active window containing `time` with `time` on a slot
    /// boundary (window start plus a whole number of slot durations) and a
    /// full slot still fitting before the window end.
    pub async fn resolve_window(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<DoctorAvailability, SchedulingError> {
        let windows = self
            .availability
            .windows_for(doctor_id, DayOfWeek::of(date))
            .await?;

        windows
            .into_iter()
            .find(|w| aligns_with_window(w, time))
            .ok_or(SchedulingError::OutsideAvailability)
    }

    fn check_lead_time(&self, date: NaiveDate, time: NaiveTime) -> Result<(), SchedulingError> {
        let earliest = Utc::now() + Duration::minutes(self.min_lead_time_minutes);
        if date.and_time(time).and_utc() < earliest {
            return Err(SchedulingError::LeadTimeViolation);
        }
        Ok(())
    }

    async fn check_duplicate_patient_booking(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        patient_id: Uuid,
        window: &DoctorAvailability,
    ) -> Result<(), SchedulingError> {
        let existing = self
            .store
            .patient_appointments_for_day(patient_id, doctor_id, date)
            .await?;

        let requested_start = date.and_time(time);
        let requested_end = requested_start + Duration::minutes(window.slot_duration as i64);

        let overlapping = existing.iter().any(|a| {
            a.holds_slot()
                && a.start_datetime() < requested_end
                && a.end_datetime() > requested_start
        });

        if overlapping {
            debug!(
                "Patient {} already holds an overlapping appointment with doctor {} on {}",
                patient_id, doctor_id, date
            );
            return Err(SchedulingError::DuplicatePatientBooking);
        }

        Ok(())
    }
}

fn aligns_with_window(window: &DoctorAvailability, time: NaiveTime) -> bool {
    let offset = time.signed_duration_since(window.start_time);
    if offset < Duration::zero() {
        return false;
    }

    let slot_seconds = (window.slot_duration as i64) * 60;
    if slot_seconds <= 0 || offset.num_seconds() % slot_seconds != 0 {
        return false;
    }

    // A full slot must fit before the window closes.
    window.end_time.signed_duration_since(time) >= Duration::minutes(window.slot_duration as i64)
}
