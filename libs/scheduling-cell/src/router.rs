// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::handlers;
use crate::SchedulingCell;

pub fn scheduling_routes(cell: Arc<SchedulingCell>) -> Router {
    Router::new()
        // Availability
        .route("/doctors/{doctor_id}/slots", get(handlers::get_available_slots))
        // Booking flow
        .route("/appointments/validate", post(handlers::validate_slot))
        .route(
            "/appointments",
            post(handlers::book_appointment).get(handlers::list_appointments),
        )
        .route(
            "/appointments/{appointment_id}/status",
            patch(handlers::update_appointment_status),
        )
        // Appointment lookups
        .route(
            "/appointments/{appointment_id}",
            get(handlers::get_appointment),
        )
        .with_state(cell)
}
