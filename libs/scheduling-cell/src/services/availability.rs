// libs/scheduling-cell/src/services/availability.rs
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::models::{DayOfWeek, Doctor, DoctorAvailability, DoctorLeave, SchedulingError};
use crate::store::SchedulingStore;

/// Read-side queries over externally-owned availability data. An unknown
/// doctor yields empty results rather than an error; resolving a *live*
/// doctor is a separate, fallible lookup.
#[derive(Clone)]
pub struct AvailabilityService {
    store: Arc<dyn SchedulingStore>,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Active recurring windows for one weekday, ordered by start time.
    pub async fn windows_for(
        &self,
        doctor_id: Uuid,
        day: DayOfWeek,
    ) -> Result<Vec<DoctorAvailability>, SchedulingError> {
        debug!("Fetching {} windows for doctor {}", day, doctor_id);

        let mut windows = self.store.windows_for(doctor_id, day).await?;
        windows.retain(|w| w.is_active && w.start_time < w.end_time);
        windows.sort_by_key(|w| w.start_time);
        Ok(windows)
    }

    /// Leave periods covering the given date.
    pub async fn leaves_for(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<DoctorLeave>, SchedulingError> {
        let leaves = self.store.leaves_for(doctor_id, date).await?;
        Ok(leaves.into_iter().filter(|l| l.covers(date)).collect())
    }

    /// Resolve a doctor that exists, is verified, and is not soft-deleted.
    /// Anything else is invisible to booking callers.
    pub async fn fetch_live_doctor(&self, doctor_id: Uuid) -> Result<Doctor, SchedulingError> {
        match self.store.fetch_doctor(doctor_id).await? {
            Some(doctor) if !doctor.is_deleted && doctor.is_verified => Ok(doctor),
            _ => Err(SchedulingError::NotFound("doctor".to_string())),
        }
    }
}
