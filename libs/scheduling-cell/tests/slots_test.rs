// libs/scheduling-cell/tests/slots_test.rs
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use std::sync::Arc;
use uuid::Uuid;

use scheduling_cell::models::{
    Appointment, AppointmentStatus, DayOfWeek, Doctor, DoctorAvailability, DoctorLeave,
};
use scheduling_cell::services::slots::SlotGeneratorService;
use scheduling_cell::store::{MemoryStore, SchedulingStore};
use shared_config::SchedulerConfig;

// ==============================================================================
// TEST FIXTURES
// ==============================================================================

fn test_config() -> SchedulerConfig {
    SchedulerConfig::default()
}

fn test_doctor() -> Doctor {
    Doctor {
        id: Uuid::new_v4(),
        first_name: "Asha".to_string(),
        last_name: "Verma".to_string(),
        is_verified: true,
        is_deleted: false,
    }
}

fn window(
    doctor_id: Uuid,
    day: DayOfWeek,
    start: (u32, u32),
    end: (u32, u32),
    slot_duration: i32,
) -> DoctorAvailability {
    let now = Utc::now();
    DoctorAvailability {
        id: Uuid::new_v4(),
        doctor_id,
        clinic_id: None,
        day_of_week: day,
        start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        slot_duration,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn appointment(
    doctor_id: Uuid,
    date: NaiveDate,
    time: (u32, u32),
    duration: i32,
    status: AppointmentStatus,
) -> Appointment {
    let now = Utc::now();
    Appointment {
        id: Uuid::new_v4(),
        appointment_number: format!("APT{}0001", date.format("%Y%m%d")),
        patient_id: Uuid::new_v4(),
        doctor_id,
        clinic_id: None,
        appointment_date: date,
        appointment_time: NaiveTime::from_hms_opt(time.0, time.1, 0).unwrap(),
        duration,
        status,
        reason_for_visit: None,
        symptoms: None,
        doctor_notes: None,
        cancellation_reason: None,
        cancelled_by: None,
        cancelled_at: None,
        created_at: now,
        updated_at: now,
        is_deleted: false,
    }
}

/// A Monday comfortably in the future, so lead-time filtering never bites.
fn future_monday() -> NaiveDate {
    let mut date = Utc::now().date_naive() + Duration::days(7);
    while date.weekday() != Weekday::Mon {
        date += Duration::days(1);
    }
    date
}

async fn setup() -> (Arc<MemoryStore>, SlotGeneratorService, Doctor) {
    let store = Arc::new(MemoryStore::new());
    let generator =
        SlotGeneratorService::new(store.clone() as Arc<dyn SchedulingStore>, &test_config());
    let doctor = test_doctor();
    store.add_doctor(doctor.clone()).await;
    (store, generator, doctor)
}

// ==============================================================================
// SLOT GENERATION
// ==============================================================================

#[tokio::test]
async fn monday_window_yields_six_half_hour_slots() {
    let (store, generator, doctor) = setup().await;
    store
        .add_window(window(doctor.id, DayOfWeek::Monday, (9, 0), (12, 0), 30))
        .await;

    let slots = generator
        .generate_slots(doctor.id, future_monday())
        .await
        .unwrap();

    let starts: Vec<NaiveTime> = slots.iter().map(|s| s.start_time).collect();
    let expected: Vec<NaiveTime> = [(9, 0), (9, 30), (10, 0), (10, 30), (11, 0), (11, 30)]
        .iter()
        .map(|&(h, m)| NaiveTime::from_hms_opt(h, m, 0).unwrap())
        .collect();

    assert_eq!(starts, expected);
}

#[tokio::test]
async fn slots_are_ascending_and_non_overlapping() {
    let (store, generator, doctor) = setup().await;
    store
        .add_window(window(doctor.id, DayOfWeek::Monday, (9, 0), (12, 0), 30))
        .await;
    store
        .add_window(window(doctor.id, DayOfWeek::Monday, (14, 0), (16, 0), 20))
        .await;

    let slots = generator
        .generate_slots(doctor.id, future_monday())
        .await
        .unwrap();

    assert!(!slots.is_empty());
    for pair in slots.windows(2) {
        assert!(pair[0].start_time < pair[1].start_time);
        assert!(pair[0].end_time <= pair[1].start_time);
    }
}

#[tokio::test]
async fn leave_day_yields_no_slots() {
    let (store, generator, doctor) = setup().await;
    let monday = future_monday();
    store
        .add_window(window(doctor.id, DayOfWeek::Monday, (9, 0), (12, 0), 30))
        .await;
    store
        .add_leave(DoctorLeave {
            id: Uuid::new_v4(),
            doctor_id: doctor.id,
            from_date: monday - Duration::days(1),
            to_date: monday + Duration::days(1),
            reason: Some("conference".to_string()),
            created_at: Utc::now(),
        })
        .await;

    let slots = generator.generate_slots(doctor.id, monday).await.unwrap();
    assert!(slots.is_empty());
}

#[tokio::test]
async fn generation_is_idempotent_without_intervening_bookings() {
    let (store, generator, doctor) = setup().await;
    store
        .add_window(window(doctor.id, DayOfWeek::Monday, (9, 0), (12, 0), 30))
        .await;

    let monday = future_monday();
    let first = generator.generate_slots(doctor.id, monday).await.unwrap();
    let second = generator.generate_slots(doctor.id, monday).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn trailing_partial_slot_is_dropped() {
    let (store, generator, doctor) = setup().await;
    store
        .add_window(window(doctor.id, DayOfWeek::Monday, (9, 0), (10, 45), 30))
        .await;

    let slots = generator
        .generate_slots(doctor.id, future_monday())
        .await
        .unwrap();

    // 09:00, 09:30, 10:00 fit; 10:30-11:00 would overrun 10:45.
    assert_eq!(slots.len(), 3);
    assert_eq!(
        slots.last().unwrap().start_time,
        NaiveTime::from_hms_opt(10, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn booked_appointment_removes_its_slot() {
    let (store, generator, doctor) = setup().await;
    let monday = future_monday();
    store
        .add_window(window(doctor.id, DayOfWeek::Monday, (9, 0), (12, 0), 30))
        .await;
    store
        .insert_appointment(&appointment(
            doctor.id,
            monday,
            (9, 30),
            30,
            AppointmentStatus::Booked,
        ))
        .await
        .unwrap();

    let slots = generator.generate_slots(doctor.id, monday).await.unwrap();

    assert_eq!(slots.len(), 5);
    assert!(slots
        .iter()
        .all(|s| s.start_time != NaiveTime::from_hms_opt(9, 30, 0).unwrap()));
}

#[tokio::test]
async fn cancelled_appointment_frees_its_slot() {
    let (store, generator, doctor) = setup().await;
    let monday = future_monday();
    store
        .add_window(window(doctor.id, DayOfWeek::Monday, (9, 0), (12, 0), 30))
        .await;
    store
        .insert_appointment(&appointment(
            doctor.id,
            monday,
            (9, 30),
            30,
            AppointmentStatus::Cancelled,
        ))
        .await
        .unwrap();

    let slots = generator.generate_slots(doctor.id, monday).await.unwrap();
    assert_eq!(slots.len(), 6);
}

#[tokio::test]
async fn mismatched_duration_appointment_still_blocks_overlapped_slot() {
    let (store, generator, doctor) = setup().await;
    let monday = future_monday();
    store
        .add_window(window(doctor.id, DayOfWeek::Monday, (9, 0), (12, 0), 30))
        .await;
    // 09:15 for 60 minutes never matches a generated start but overlaps
    // the 09:00, 09:30 and 10:00 slots.
    store
        .insert_appointment(&appointment(
            doctor.id,
            monday,
            (9, 15),
            60,
            AppointmentStatus::Booked,
        ))
        .await
        .unwrap();

    let slots = generator.generate_slots(doctor.id, monday).await.unwrap();

    let starts: Vec<NaiveTime> = slots.iter().map(|s| s.start_time).collect();
    assert!(!starts.contains(&NaiveTime::from_hms_opt(9, 0, 0).unwrap()));
    assert!(!starts.contains(&NaiveTime::from_hms_opt(9, 30, 0).unwrap()));
    assert!(!starts.contains(&NaiveTime::from_hms_opt(10, 0, 0).unwrap()));
    assert!(starts.contains(&NaiveTime::from_hms_opt(10, 30, 0).unwrap()));
}

#[tokio::test]
async fn identical_windows_collapse_to_one_slot_set() {
    let (store, generator, doctor) = setup().await;
    store
        .add_window(window(doctor.id, DayOfWeek::Monday, (9, 0), (10, 0), 30))
        .await;
    store
        .add_window(window(doctor.id, DayOfWeek::Monday, (9, 0), (10, 0), 30))
        .await;

    let slots = generator
        .generate_slots(doctor.id, future_monday())
        .await
        .unwrap();

    assert_eq!(slots.len(), 2);
}

#[tokio::test]
async fn distinct_clinics_stay_separate_slots() {
    let (store, generator, doctor) = setup().await;
    let mut first = window(doctor.id, DayOfWeek::Monday, (9, 0), (10, 0), 30);
    first.clinic_id = Some(Uuid::new_v4());
    let mut second = window(doctor.id, DayOfWeek::Monday, (9, 0), (10, 0), 30);
    second.clinic_id = Some(Uuid::new_v4());
    store.add_window(first.clone()).await;
    store.add_window(second.clone()).await;

    let slots = generator
        .generate_slots(doctor.id, future_monday())
        .await
        .unwrap();

    // Two clinics, two slot times each.
    assert_eq!(slots.len(), 4);
    let at_nine: Vec<_> = slots
        .iter()
        .filter(|s| s.start_time == NaiveTime::from_hms_opt(9, 0, 0).unwrap())
        .collect();
    assert_eq!(at_nine.len(), 2);
    assert_ne!(at_nine[0].clinic_id, at_nine[1].clinic_id);
}

#[tokio::test]
async fn inactive_windows_are_ignored() {
    let (store, generator, doctor) = setup().await;
    let mut inactive = window(doctor.id, DayOfWeek::Monday, (9, 0), (12, 0), 30);
    inactive.is_active = false;
    store.add_window(inactive).await;

    let slots = generator
        .generate_slots(doctor.id, future_monday())
        .await
        .unwrap();

    assert!(slots.is_empty());
}

#[tokio::test]
async fn unknown_doctor_yields_empty_sequence() {
    let (_, generator, _) = setup().await;

    let slots = generator
        .generate_slots(Uuid::new_v4(), future_monday())
        .await
        .unwrap();

    assert!(slots.is_empty());
}

#[tokio::test]
async fn todays_slots_respect_minimum_lead_time() {
    let (store, generator, doctor) = setup().await;
    let today = Utc::now().date_naive();
    store
        .add_window(window(
            doctor.id,
            DayOfWeek::of(today),
            (0, 0),
            (23, 30),
            30,
        ))
        .await;

    let config = test_config();
    let cutoff = Utc::now() + Duration::minutes(config.min_lead_time_minutes);

    let slots = generator.generate_slots(doctor.id, today).await.unwrap();

    for slot in &slots {
        assert!(today.and_time(slot.start_time).and_utc() >= cutoff);
    }
}
