// libs/scheduling-cell/src/store.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentListQuery, DayOfWeek, Doctor, DoctorAvailability, DoctorLeave,
    SchedulingError,
};

pub mod memory;
pub mod postgrest;

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;

pub type StoreResult<T> = Result<T, SchedulingError>;

/// Persistence seam for the scheduling engine. Availability and leave data
/// are externally owned and read-only here; appointments are the only rows
/// the engine writes.
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    async fn fetch_doctor(&self, doctor_id: Uuid) -> StoreResult<Option<Doctor>>;

    /// Active recurring windows for one weekday, ordered by start time.
    async fn windows_for(
        &self,
        doctor_id: Uuid,
        day: DayOfWeek,
    ) -> StoreResult<Vec<DoctorAvailability>>;

    /// Leave periods covering the given date.
    async fn leaves_for(&self, doctor_id: Uuid, date: NaiveDate) -> StoreResult<Vec<DoctorLeave>>;

    /// All non-deleted appointments for a doctor on a date, any status.
    async fn appointments_for_day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Vec<Appointment>>;

    /// Non-deleted appointments a patient holds with one doctor on a date.
    async fn patient_appointments_for_day(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Vec<Appointment>>;

    async fn fetch_appointment(&self, appointment_id: Uuid) -> StoreResult<Option<Appointment>>;

    async fn list_appointments(
        &self,
        query: &AppointmentListQuery,
    ) -> StoreResult<Vec<Appointment>>;

    async fn insert_appointment(&self, appointment: &Appointment) -> StoreResult<()>;

    async fn update_appointment(&self, appointment: &Appointment) -> StoreResult<()>;

    /// Atomic fetch-and-increment of the per-calendar-day appointment
    /// sequence. Monotonic within a day; reuse across days is fine.
    async fn next_daily_sequence(&self, date: NaiveDate) -> StoreResult<u32>;
}
