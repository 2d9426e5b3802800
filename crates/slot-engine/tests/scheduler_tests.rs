//! End-to-end tests of the public operations with a fixed clock.

use std::sync::Barrier;
use std::thread;

use chrono::{NaiveTime, TimeZone, Utc};
use slot_engine::model::{
    AppointmentStatus, AvailabilityRule, Business, BusinessPolicy, ClientInfo, Service, Staff,
};
use slot_engine::{
    AvailabilityRequest, BookingRequest, CalendarRequest, Catalog, FixedClock, MemoryStore,
    Scheduler, SchedulingError,
};
use uuid::Uuid;

// ── Helpers ─────────────────────────────────────────────────────────────────

const BUSINESS: Uuid = Uuid::from_u128(0xB0);
const ALEX: Uuid = Uuid::from_u128(0xA1);
const BLAKE: Uuid = Uuid::from_u128(0xA2);
const HAIRCUT: Uuid = Uuid::from_u128(0x51);
const YOGA: Uuid = Uuid::from_u128(0x52);

fn catalog() -> Catalog {
    let business = Business {
        id: BUSINESS,
        name: "Studio".to_string(),
        policy: BusinessPolicy {
            timezone: "America/Chicago".to_string(),
            min_lead_minutes: 60,
            max_future_days: 90,
            max_appointments_per_day_per_staff: 12,
        },
    };
    let haircut = Service {
        id: HAIRCUT,
        business_id: BUSINESS,
        name: "Haircut".to_string(),
        duration_minutes: 60,
        buffer_before_minutes: 0,
        buffer_after_minutes: 0,
        slot_step_minutes: 30,
        is_group: false,
        capacity: 1,
        staff_ids: vec![ALEX],
        active: true,
    };
    let yoga = Service {
        id: YOGA,
        name: "Yoga".to_string(),
        slot_step_minutes: 60,
        is_group: true,
        capacity: 6,
        ..haircut.clone()
    };
    let staff = |id, name: &str| Staff {
        id,
        business_id: BUSINESS,
        name: name.to_string(),
        active: true,
    };
    let rule = |staff_id| AvailabilityRule {
        staff_id,
        weekday: 1,
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        active: true,
    };
    Catalog {
        businesses: vec![business],
        staff: vec![staff(BLAKE, "Blake"), staff(ALEX, "Alex")],
        services: vec![haircut, yoga],
        rules: vec![rule(ALEX), rule(BLAKE)],
        ..Catalog::default()
    }
}

fn scheduler() -> Scheduler<MemoryStore, FixedClock> {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    Scheduler::new(MemoryStore::new(catalog()), FixedClock(now))
}

fn availability(service_id: Uuid, date: &str) -> AvailabilityRequest {
    AvailabilityRequest {
        business_id: BUSINESS,
        service_id,
        date: date.to_string(),
        staff_id: None,
        timezone: None,
    }
}

fn booking(service_id: Uuid, start: &str, email: &str) -> BookingRequest {
    BookingRequest {
        business_id: BUSINESS,
        service_id,
        staff_id: None,
        slot_start: start.to_string(),
        client: Some(ClientInfo {
            email: Some(email.to_string()),
            ..ClientInfo::default()
        }),
    }
}

fn calendar_request(from: &str, to: &str) -> CalendarRequest {
    CalendarRequest {
        business_id: BUSINESS,
        from: from.to_string(),
        to: to.to_string(),
        staff_id: None,
    }
}

fn starts(s: &Scheduler<MemoryStore, FixedClock>, service_id: Uuid) -> Vec<String> {
    s.compute_availability(&availability(service_id, "2026-03-16"))
        .unwrap()
        .slots
        .into_iter()
        .map(|slot| slot.start)
        .collect()
}

// ── compute_availability ────────────────────────────────────────────────────

#[test]
fn slots_are_rendered_in_business_offset() {
    let response = scheduler()
        .compute_availability(&availability(HAIRCUT, "2026-03-16"))
        .unwrap();

    assert_eq!(response.date, "2026-03-16");
    assert_eq!(response.slots.len(), 5);
    assert_eq!(response.slots[0].start, "2026-03-16T09:00:00-05:00");
    assert_eq!(response.slots[0].end, "2026-03-16T10:00:00-05:00");
    assert_eq!(response.slots[0].capacity, 1);
    assert_eq!(response.slots[4].start, "2026-03-16T11:00:00-05:00");
}

#[test]
fn timezone_override_changes_rendering() {
    let mut request = availability(HAIRCUT, "2026-03-16");
    request.timezone = Some("UTC".to_string());

    let response = scheduler().compute_availability(&request).unwrap();
    assert_eq!(response.slots[0].start, "2026-03-16T09:00:00+00:00");
}

#[test]
fn unknown_business_or_service_yields_no_slots() {
    let s = scheduler();

    let mut request = availability(HAIRCUT, "2026-03-16");
    request.business_id = Uuid::from_u128(0xDEAD);
    assert!(s.compute_availability(&request).unwrap().slots.is_empty());

    let request = availability(Uuid::from_u128(0xBEEF), "2026-03-16");
    assert!(s.compute_availability(&request).unwrap().slots.is_empty());
}

#[test]
fn malformed_date_is_invalid_input() {
    let err = scheduler()
        .compute_availability(&availability(HAIRCUT, "16/03/2026"))
        .unwrap_err();
    assert!(matches!(err, SchedulingError::InvalidInput(_)));
    assert_eq!(err.kind(), "invalid_input");
}

#[test]
fn unknown_timezone_is_rejected() {
    let mut request = availability(HAIRCUT, "2026-03-16");
    request.timezone = Some("Mars/Olympus".to_string());

    let err = scheduler().compute_availability(&request).unwrap_err();
    assert!(matches!(err, SchedulingError::InvalidTimezone(_)));
}

// ── create_booking ──────────────────────────────────────────────────────────

#[test]
fn booked_slot_disappears_from_availability() {
    let s = scheduler();

    let confirmation = s
        .create_booking(&booking(HAIRCUT, "2026-03-16T09:00:00-05:00", "a@x.io"))
        .unwrap();
    assert_eq!(confirmation.status, "confirmed");
    assert_eq!(confirmation.staff_id, ALEX);
    assert_eq!(confirmation.start_at, "2026-03-16T14:00:00+00:00");
    assert_eq!(confirmation.end_at, "2026-03-16T15:00:00+00:00");

    // 09:00 and the overlapping 09:30 are gone; 10:00 onwards remain.
    assert_eq!(
        starts(&s, HAIRCUT),
        vec![
            "2026-03-16T10:00:00-05:00",
            "2026-03-16T10:30:00-05:00",
            "2026-03-16T11:00:00-05:00",
        ]
    );
}

#[test]
fn cancelling_returns_the_slot() {
    let s = scheduler();
    let confirmation = s
        .create_booking(&booking(HAIRCUT, "2026-03-16T14:00:00Z", "a@x.io"))
        .unwrap();

    let cancelled = s.cancel_appointment(confirmation.appointment_id).unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert_eq!(starts(&s, HAIRCUT).len(), 5);

    // A second cancel is a no-op.
    let again = s.cancel_appointment(confirmation.appointment_id).unwrap();
    assert_eq!(again.status, AppointmentStatus::Cancelled);
}

#[test]
fn cancelling_unknown_appointment_is_not_found() {
    let err = scheduler().cancel_appointment(Uuid::from_u128(7)).unwrap_err();
    assert!(matches!(err, SchedulingError::NotFound(_)));
}

#[test]
fn malformed_start_is_invalid_input() {
    let err = scheduler()
        .create_booking(&booking(HAIRCUT, "next monday", "a@x.io"))
        .unwrap_err();
    assert!(matches!(err, SchedulingError::InvalidInput(_)));
}

#[test]
fn start_without_offset_is_invalid_input() {
    let err = scheduler()
        .create_booking(&booking(HAIRCUT, "2026-03-16T14:00:00", "a@x.io"))
        .unwrap_err();
    assert!(matches!(err, SchedulingError::InvalidInput(_)));
}

#[test]
fn booking_unknown_service_is_not_found() {
    let s = scheduler();

    let err = s
        .create_booking(&booking(Uuid::from_u128(0xBEEF), "2026-03-16T14:00:00Z", "a@x.io"))
        .unwrap_err();
    assert!(matches!(err, SchedulingError::NotFound(_)));

    let mut request = booking(HAIRCUT, "2026-03-16T14:00:00Z", "a@x.io");
    request.business_id = Uuid::from_u128(0xDEAD);
    assert!(matches!(s.create_booking(&request), Err(SchedulingError::NotFound(_))));
}

#[test]
fn group_session_reports_remaining_seats() {
    let s = scheduler();
    for i in 0..4 {
        s.create_booking(&booking(YOGA, "2026-03-16T14:00:00Z", &format!("g{}@x.io", i)))
            .unwrap();
    }

    let response = s.compute_availability(&availability(YOGA, "2026-03-16")).unwrap();
    let nine = response
        .slots
        .iter()
        .find(|slot| slot.start == "2026-03-16T09:00:00-05:00")
        .unwrap();
    assert_eq!(nine.capacity, 2);
}

#[test]
fn racing_bookings_through_scheduler_commit_once() {
    let s = scheduler();
    let barrier = Barrier::new(2);

    let outcomes: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = ["a@x.io", "b@x.io"]
            .into_iter()
            .map(|email| {
                let (s, barrier) = (&s, &barrier);
                scope.spawn(move || {
                    barrier.wait();
                    s.create_booking(&booking(HAIRCUT, "2026-03-16T14:00:00Z", email))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|o| matches!(o, Err(SchedulingError::SlotUnavailable))));
}

// ── calendar ────────────────────────────────────────────────────────────────

#[test]
fn calendar_lists_appointments_in_start_order() {
    let s = scheduler();

    let mut named = booking(HAIRCUT, "2026-03-16T10:30:00-05:00", "b@x.io");
    named.client = Some(ClientInfo {
        email: Some("b@x.io".to_string()),
        first_name: Some("Sam".to_string()),
        last_name: Some("Lee".to_string()),
        ..ClientInfo::default()
    });
    s.create_booking(&named).unwrap();
    let early = s
        .create_booking(&booking(HAIRCUT, "2026-03-16T09:00:00-05:00", "a@x.io"))
        .unwrap();
    s.cancel_appointment(early.appointment_id).unwrap();

    let entries = s
        .calendar(&calendar_request("2026-03-16T00:00:00-05:00", "2026-03-17T00:00:00-05:00"))
        .unwrap()
        .appointments;

    assert_eq!(entries.len(), 2);
    // Cancelled appointments stay on the calendar.
    assert_eq!(entries[0].id, early.appointment_id);
    assert_eq!(entries[0].status, AppointmentStatus::Cancelled);
    assert_eq!(entries[0].client_name, None);
    assert_eq!(entries[1].start_at, "2026-03-16T15:30:00+00:00");
    assert_eq!(entries[1].end_at, "2026-03-16T16:30:00+00:00");
    assert_eq!(entries[1].service_name.as_deref(), Some("Haircut"));
    assert_eq!(entries[1].client_name.as_deref(), Some("Sam Lee"));
    assert_eq!(entries[1].staff_id, ALEX);
    assert_eq!(entries[1].status, AppointmentStatus::Confirmed);
}

#[test]
fn calendar_keeps_only_appointments_inside_the_range() {
    let s = scheduler();
    s.create_booking(&booking(HAIRCUT, "2026-03-16T14:00:00Z", "a@x.io"))
        .unwrap();
    s.create_booking(&booking(HAIRCUT, "2026-03-16T16:00:00Z", "b@x.io"))
        .unwrap();

    let entries = s
        .calendar(&calendar_request("2026-03-16T14:00:00Z", "2026-03-16T15:30:00Z"))
        .unwrap()
        .appointments;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].start_at, "2026-03-16T14:00:00+00:00");

    // An appointment straddling the upper bound is left out.
    let entries = s
        .calendar(&calendar_request("2026-03-16T14:00:00Z", "2026-03-16T14:30:00Z"))
        .unwrap()
        .appointments;
    assert!(entries.is_empty());
}

#[test]
fn calendar_shows_group_sessions_once() {
    let s = scheduler();
    for i in 0..2 {
        s.create_booking(&booking(YOGA, "2026-03-16T16:00:00Z", &format!("g{}@x.io", i)))
            .unwrap();
    }

    let entries = s
        .calendar(&calendar_request("2026-03-16T00:00:00Z", "2026-03-17T00:00:00Z"))
        .unwrap()
        .appointments;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].service_name.as_deref(), Some("Yoga"));
    assert_eq!(entries[0].attendee_count, 2);
    assert_eq!(entries[0].client_id, None);
}

#[test]
fn calendar_filters_by_staff() {
    let s = scheduler();
    s.create_booking(&booking(HAIRCUT, "2026-03-16T14:00:00Z", "a@x.io"))
        .unwrap();

    let mut request = calendar_request("2026-03-16T00:00:00Z", "2026-03-17T00:00:00Z");
    request.staff_id = Some(BLAKE);
    assert!(s.calendar(&request).unwrap().appointments.is_empty());

    request.staff_id = Some(ALEX);
    assert_eq!(s.calendar(&request).unwrap().appointments.len(), 1);
}

#[test]
fn calendar_of_unknown_business_is_empty() {
    let s = scheduler();
    s.create_booking(&booking(HAIRCUT, "2026-03-16T14:00:00Z", "a@x.io"))
        .unwrap();

    let mut request = calendar_request("2026-03-16T00:00:00Z", "2026-03-17T00:00:00Z");
    request.business_id = Uuid::from_u128(0xDEAD);
    assert!(s.calendar(&request).unwrap().appointments.is_empty());
}

#[test]
fn calendar_rejects_reversed_or_naive_range() {
    let s = scheduler();

    let err = s
        .calendar(&calendar_request("2026-03-17T00:00:00Z", "2026-03-16T00:00:00Z"))
        .unwrap_err();
    assert!(matches!(err, SchedulingError::InvalidInput(_)));

    let err = s
        .calendar(&calendar_request("2026-03-16T00:00:00", "2026-03-17T00:00:00Z"))
        .unwrap_err();
    assert!(matches!(err, SchedulingError::InvalidInput(_)));
}

// ── Listings ────────────────────────────────────────────────────────────────

#[test]
fn listings_cover_active_records() {
    let s = Scheduler::with_system_clock(MemoryStore::new(catalog()));

    let services: Vec<_> = s.services(BUSINESS).unwrap().into_iter().map(|s| s.name).collect();
    assert_eq!(services, vec!["Haircut", "Yoga"]);

    let staff: Vec<_> = s.staff(BUSINESS).unwrap().into_iter().map(|s| s.name).collect();
    assert_eq!(staff, vec!["Alex", "Blake"]);

    assert!(s.services(Uuid::from_u128(0xDEAD)).unwrap().is_empty());
}
