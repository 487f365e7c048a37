pub mod availability;
pub mod booking;
pub mod events;
pub mod lifecycle;
pub mod slots;
pub mod validation;
