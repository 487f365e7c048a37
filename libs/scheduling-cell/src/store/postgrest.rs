// libs/scheduling-cell/src/store/postgrest.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::SchedulerConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{
    Appointment, AppointmentListQuery, DayOfWeek, Doctor, DoctorAvailability, DoctorLeave,
    SchedulingError,
};
use crate::store::{SchedulingStore, StoreResult};

/// PostgREST-backed store. Row shapes mirror the clinic schema:
/// `doctors`, `doctor_availability`, `doctor_leaves`, `appointments`, plus
/// an `rpc/next_appointment_sequence` function that increments the per-day
/// counter row transactionally.
pub struct PostgrestStore {
    client: PostgrestClient,
}

impl PostgrestStore {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            client: PostgrestClient::new(config),
        }
    }

    async fn fetch_rows<T: serde::de::DeserializeOwned>(&self, path: &str) -> StoreResult<Vec<T>> {
        let rows: Vec<Value> = self
            .client
            .request(Method::GET, path, None)
            .await
            .map_err(storage_err)?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(storage_err))
            .collect()
    }
}

fn storage_err(err: impl ToString) -> SchedulingError {
    SchedulingError::Storage(err.to_string())
}

#[async_trait]
impl SchedulingStore for PostgrestStore {
    async fn fetch_doctor(&self, doctor_id: Uuid) -> StoreResult<Option<Doctor>> {
        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let mut rows: Vec<Doctor> = self.fetch_rows(&path).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    async fn windows_for(
        &self,
        doctor_id: Uuid,
        day: DayOfWeek,
    ) -> StoreResult<Vec<DoctorAvailability>> {
        let path = format!(
            "/rest/v1/doctor_availability?doctor_id=eq.{}&day_of_week=eq.{}&is_active=eq.true&order=start_time.asc",
            doctor_id, day
        );
        self.fetch_rows(&path).await
    }

    async fn leaves_for(&self, doctor_id: Uuid, date: NaiveDate) -> StoreResult<Vec<DoctorLeave>> {
        let path = format!(
            "/rest/v1/doctor_leaves?doctor_id=eq.{}&from_date=lte.{}&to_date=gte.{}",
            doctor_id, date, date
        );
        self.fetch_rows(&path).await
    }

    async fn appointments_for_day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Vec<Appointment>> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=eq.{}&is_deleted=eq.false&order=appointment_time.asc",
            doctor_id, date
        );
        self.fetch_rows(&path).await
    }

    async fn patient_appointments_for_day(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Vec<Appointment>> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&doctor_id=eq.{}&appointment_date=eq.{}&is_deleted=eq.false",
            patient_id, doctor_id, date
        );
        self.fetch_rows(&path).await
    }

    async fn fetch_appointment(&self, appointment_id: Uuid) -> StoreResult<Option<Appointment>> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut rows: Vec<Appointment> = self.fetch_rows(&path).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    async fn list_appointments(
        &self,
        query: &AppointmentListQuery,
    ) -> StoreResult<Vec<Appointment>> {
        let mut query_parts = vec!["is_deleted=eq.false".to_string()];

        if let Some(doctor_id) = query.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }

        let mut path = format!(
            "/rest/v1/appointments?{}&order=appointment_date.desc,appointment_time.desc",
            query_parts.join("&")
        );

        // Same default page size as the in-memory store.
        path.push_str(&format!("&limit={}", query.limit.unwrap_or(20).max(1)));
        if let Some(offset) = query.offset {
            path.push_str(&format!("&offset={}", offset));
        }

        self.fetch_rows(&path).await
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> StoreResult<()> {
        debug!("Persisting appointment {}", appointment.appointment_number);

        let body = serde_json::to_value(appointment).map_err(storage_err)?;
        let _: Vec<Value> = self
            .client
            .insert("/rest/v1/appointments", body)
            .await
            .map_err(storage_err)?;

        Ok(())
    }

    async fn update_appointment(&self, appointment: &Appointment) -> StoreResult<()> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment.id);
        let body = serde_json::to_value(appointment).map_err(storage_err)?;

        // PostgREST answers 204 with no body unless asked for the
        // representation back.
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let _: Vec<Value> = self
            .client
            .request_with_headers(Method::PATCH, &path, Some(body), Some(headers))
            .await
            .map_err(storage_err)?;

        Ok(())
    }

    async fn next_daily_sequence(&self, date: NaiveDate) -> StoreResult<u32> {
        let sequence: u32 = self
            .client
            .request(
                Method::POST,
                "/rest/v1/rpc/next_appointment_sequence",
                Some(json!({ "for_date": date })),
            )
            .await
            .map_err(storage_err)?;

        Ok(sequence)
    }
}
