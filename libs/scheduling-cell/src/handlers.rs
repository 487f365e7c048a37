// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    AppointmentListQuery, BookAppointmentRequest, TransitionRequest, ValidateSlotRequest,
};
use crate::SchedulingCell;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
}

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

/// List the open slots for a doctor on a date. Advisory only: a returned
/// slot can still lose the race against another booking.
#[axum::debug_handler]
pub async fn get_available_slots(
    State(cell): State<Arc<SchedulingCell>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = cell.slots.generate_slots(doctor_id, query.date).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "slots": slots,
    })))
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

/// Dry-run check of a slot selection without committing anything.
#[axum::debug_handler]
pub async fn validate_slot(
    State(cell): State<Arc<SchedulingCell>>,
    Json(request): Json<ValidateSlotRequest>,
) -> Result<Json<Value>, AppError> {
    cell.validation
        .validate(
            request.doctor_id,
            request.date,
            request.time,
            request.patient_id,
        )
        .await?;

    Ok(Json(json!({
        "valid": true,
    })))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(cell): State<Arc<SchedulingCell>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    cell.validation
        .validate(
            request.doctor_id,
            request.date,
            request.time,
            request.patient_id,
        )
        .await?;

    let appointment = cell.booking.commit(request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully",
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(cell): State<Arc<SchedulingCell>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = cell.booking.transition(appointment_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

// ==============================================================================
// APPOINTMENT QUERY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_appointment(
    State(cell): State<Arc<SchedulingCell>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = cell.booking.get_appointment(appointment_id).await?;

    Ok(Json(json!({
        "appointment": appointment,
    })))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(cell): State<Arc<SchedulingCell>>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let appointments = cell.booking.list_appointments(query).await?;

    Ok(Json(json!({
        "appointments": appointments,
    })))
}
