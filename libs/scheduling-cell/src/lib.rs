pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

use std::sync::Arc;

use shared_config::SchedulerConfig;

use services::booking::BookingService;
use services::slots::SlotGeneratorService;
use services::validation::BookingValidationService;
use store::SchedulingStore;

// Re-export the types callers commonly need
pub use models::{
    Appointment, AppointmentStatus, BookAppointmentRequest, DayOfWeek, Doctor,
    DoctorAvailability, DoctorLeave, SchedulingError, Slot, SlotKey, TransitionRequest,
};
pub use services::events::SchedulingEvent;

/// Shared state for the scheduling cell: one store, one lock registry, one
/// event channel. Built once at startup and handed to the router.
pub struct SchedulingCell {
    pub slots: SlotGeneratorService,
    pub validation: BookingValidationService,
    pub booking: BookingService,
}

impl SchedulingCell {
    pub fn new(store: Arc<dyn SchedulingStore>, config: &SchedulerConfig) -> Self {
        Self {
            slots: SlotGeneratorService::new(Arc::clone(&store), config),
            validation: BookingValidationService::new(Arc::clone(&store), config),
            booking: BookingService::new(store, config),
        }
    }
}
