// libs/scheduling-cell/src/store/memory.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentListQuery, DayOfWeek, Doctor, DoctorAvailability, DoctorLeave,
};
use crate::store::{SchedulingStore, StoreResult};

#[derive(Default)]
struct MemoryState {
    doctors: HashMap<Uuid, Doctor>,
    windows: Vec<DoctorAvailability>,
    leaves: Vec<DoctorLeave>,
    appointments: HashMap<Uuid, Appointment>,
    daily_sequences: HashMap<NaiveDate, u32>,
}

/// In-memory store used by tests and by local development when no
/// PostgREST endpoint is configured. All reads clone out of a single
/// RwLock-guarded state; the daily sequence increments under the write lock
/// so it stays atomic across concurrent committers.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_doctor(&self, doctor: Doctor) {
        self.state.write().await.doctors.insert(doctor.id, doctor);
    }

    pub async fn add_window(&self, window: DoctorAvailability) {
        self.state.write().await.windows.push(window);
    }

    pub async fn add_leave(&self, leave: DoctorLeave) {
        self.state.write().await.leaves.push(leave);
    }
}

#[async_trait]
impl SchedulingStore for MemoryStore {
    async fn fetch_doctor(&self, doctor_id: Uuid) -> StoreResult<Option<Doctor>> {
        Ok(self.state.read().await.doctors.get(&doctor_id).cloned())
    }

    async fn windows_for(
        &self,
        doctor_id: Uuid,
        day: DayOfWeek,
    ) -> StoreResult<Vec<DoctorAvailability>> {
        let state = self.state.read().await;
        let mut windows: Vec<DoctorAvailability> = state
            .windows
            .iter()
            .filter(|w| w.doctor_id == doctor_id && w.day_of_week == day && w.is_active)
            .cloned()
            .collect();
        windows.sort_by_key(|w| w.start_time);
        Ok(windows)
    }

    async fn leaves_for(&self, doctor_id: Uuid, date: NaiveDate) -> StoreResult<Vec<DoctorLeave>> {
        let state = self.state.read().await;
        Ok(state
            .leaves
            .iter()
            .filter(|l| l.doctor_id == doctor_id && l.covers(date))
            .cloned()
            .collect())
    }

    async fn appointments_for_day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Vec<Appointment>> {
        let state = self.state.read().await;
        let mut appointments: Vec<Appointment> = state
            .appointments
            .values()
            .filter(|a| a.doctor_id == doctor_id && a.appointment_date == date && !a.is_deleted)
            .cloned()
            .collect();
        appointments.sort_by_key(|a| a.appointment_time);
        Ok(appointments)
    }

    async fn patient_appointments_for_day(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Vec<Appointment>> {
        let state = self.state.read().await;
        Ok(state
            .appointments
            .values()
            .filter(|a| {
                a.patient_id == patient_id
                    && a.doctor_id == doctor_id
                    && a.appointment_date == date
                    && !a.is_deleted
            })
            .cloned()
            .collect())
    }

    async fn fetch_appointment(&self, appointment_id: Uuid) -> StoreResult<Option<Appointment>> {
        Ok(self
            .state
            .read()
            .await
            .appointments
            .get(&appointment_id)
            .cloned())
    }

    async fn list_appointments(
        &self,
        query: &AppointmentListQuery,
    ) -> StoreResult<Vec<Appointment>> {
        let state = self.state.read().await;
        let mut appointments: Vec<Appointment> = state
            .appointments
            .values()
            .filter(|a| !a.is_deleted)
            .filter(|a| query.doctor_id.map_or(true, |id| a.doctor_id == id))
            .filter(|a| query.patient_id.map_or(true, |id| a.patient_id == id))
            .filter(|a| query.status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        appointments.sort_by(|a, b| b.start_datetime().cmp(&a.start_datetime()));

        let offset = query.offset.unwrap_or(0).max(0) as usize;
        let limit = query.limit.unwrap_or(20).max(1) as usize;
        Ok(appointments.into_iter().skip(offset).take(limit).collect())
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> StoreResult<()> {
        self.state
            .write()
            .await
            .appointments
            .insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn update_appointment(&self, appointment: &Appointment) -> StoreResult<()> {
        self.state
            .write()
            .await
            .appointments
            .insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn next_daily_sequence(&self, date: NaiveDate) -> StoreResult<u32> {
        let mut state = self.state.write().await;
        let counter = state.daily_sequences.entry(date).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}
