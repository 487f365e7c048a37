use std::env;
use tracing::warn;

/// Runtime configuration for the scheduling engine, read from the
/// environment. Missing variables fall back to defaults with a warning so a
/// bare development machine still boots against the in-memory store.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub bind_addr: String,
    pub postgrest_url: String,
    pub postgrest_api_key: String,
    /// Minimum buffer between "now" and the earliest bookable slot today.
    pub min_lead_time_minutes: i64,
    /// Bounded wait for the per-slot booking lock before failing fast.
    pub slot_lock_wait_ms: u64,
    /// Policy switch: reject a patient double-booking the same doctor.
    pub prevent_duplicate_patient_booking: bool,
    pub event_channel_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            postgrest_url: String::new(),
            postgrest_api_key: String::new(),
            min_lead_time_minutes: 15,
            slot_lock_wait_ms: 200,
            prevent_duplicate_patient_booking: true,
            event_channel_capacity: 256,
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            postgrest_url: env::var("POSTGREST_URL").unwrap_or_else(|_| {
                warn!("POSTGREST_URL not set, falling back to in-memory store");
                String::new()
            }),
            postgrest_api_key: env::var("POSTGREST_API_KEY").unwrap_or_default(),
            min_lead_time_minutes: parse_var(
                "MIN_LEAD_TIME_MINUTES",
                defaults.min_lead_time_minutes,
            ),
            slot_lock_wait_ms: parse_var("SLOT_LOCK_WAIT_MS", defaults.slot_lock_wait_ms),
            prevent_duplicate_patient_booking: parse_var(
                "PREVENT_DUPLICATE_PATIENT_BOOKING",
                defaults.prevent_duplicate_patient_booking,
            ),
            event_channel_capacity: parse_var(
                "EVENT_CHANNEL_CAPACITY",
                defaults.event_channel_capacity,
            ),
        };

        if config.postgrest_url.is_empty() {
            warn!("running without a persistent store - bookings live in process memory");
        }

        config
    }

    pub fn has_postgrest(&self) -> bool {
        !self.postgrest_url.is_empty()
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an unparseable value, using default", name);
            default
        }),
        Err(_) => default,
    }
}
