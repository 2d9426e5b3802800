//! Bookable slot computation.
//!
//! For every eligible staff member the engine expands weekly rules for the
//! day, adds `available` exceptions, subtracts business blackouts, `blocked`
//! exceptions and buffered appointments, then walks the surviving free
//! intervals at the service's step size. Each candidate window is annotated
//! with the capacity it still has, and identical windows offered by several
//! staff members collapse into one slot carrying the best capacity.
//!
//! Existing sessions of a group service are busy time like any other
//! appointment. The exact window of such a session is offered again as long
//! as seats remain, which is how later attendees join it.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::debug;
use uuid::Uuid;

use crate::busy::build_busy;
use crate::error::Result;
use crate::interval::{merge, subtract, TimeInterval};
use crate::model::{Appointment, Business, BusinessPolicy, ExceptionKind, Service, Slot};
use crate::rules::{day_window, expand_rules};
use crate::store::ScheduleStore;

/// The range of start instants a business currently admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionWindow {
    /// `now + min_lead_minutes`; earlier starts are rejected.
    pub earliest: DateTime<Utc>,
    /// `now + max_future_days` calendar days in the business timezone; later
    /// starts are rejected.
    pub horizon: DateTime<Utc>,
}

impl AdmissionWindow {
    pub fn new(policy: &BusinessPolicy, tz: Tz, now: DateTime<Utc>) -> Self {
        let earliest = now + Duration::minutes(i64::from(policy.min_lead_minutes));
        let horizon = now
            .with_timezone(&tz)
            .checked_add_days(Days::new(u64::from(policy.max_future_days)))
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { earliest, horizon }
    }

    pub fn admits(&self, start: DateTime<Utc>) -> bool {
        start >= self.earliest && start <= self.horizon
    }
}

/// Inputs of one availability computation.
#[derive(Debug, Clone, Copy)]
pub struct SlotQuery<'a> {
    pub business: &'a Business,
    pub service: &'a Service,
    /// Calendar date, interpreted in `timezone`.
    pub date: NaiveDate,
    /// Restrict to one of the staff members assigned to the service.
    pub staff: Option<Uuid>,
    /// Overrides the business timezone when set.
    pub timezone: Option<Tz>,
    pub now: DateTime<Utc>,
}

/// Compute the bookable slots for a service on one day, sorted by start.
///
/// Windows with no remaining capacity are never returned. An empty list is a
/// normal outcome, not an error.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(business = %query.business.id, service = %query.service.id, date = %query.date)
)]
pub fn slots_for<S: ScheduleStore + ?Sized>(store: &S, query: &SlotQuery<'_>) -> Result<Vec<Slot>> {
    let SlotQuery {
        business,
        service,
        date,
        staff,
        timezone,
        now,
    } = *query;

    service.validate()?;
    let tz = match timezone {
        Some(tz) => tz,
        None => business.policy.tz()?,
    };
    let day = day_window(date, tz);
    let admission = AdmissionWindow::new(&business.policy, tz, now);

    let assigned = store.staff_for_service(service.id)?;
    let staff_ids: Vec<Uuid> = match staff {
        Some(id) => assigned.into_iter().filter(|s| *s == id).collect(),
        None => assigned,
    };
    if staff_ids.is_empty() {
        return Ok(Vec::new());
    }

    let blackouts: Vec<TimeInterval> = store
        .blackouts(business.id, &day)?
        .iter()
        .map(|b| b.window())
        .collect();

    let mut by_window: BTreeMap<TimeInterval, u32> = BTreeMap::new();

    for staff_id in staff_ids {
        let booked_today = store.count_active_within(staff_id, &day)?;
        let limit = business.policy.max_appointments_per_day_per_staff as usize;
        if booked_today >= limit {
            debug!(%staff_id, booked_today, limit, "daily appointment limit reached");
            continue;
        }

        let appointments = store.active_appointments(staff_id, &day)?;
        let open = open_intervals(store, staff_id, &day, tz, &blackouts)?;
        let mut offer = |window: TimeInterval, remaining: u32| {
            if remaining > 0 {
                by_window
                    .entry(window)
                    .and_modify(|best| *best = (*best).max(remaining))
                    .or_insert(remaining);
            }
        };

        for interval in &free_intervals(&open, service, &appointments) {
            for candidate in candidate_windows(interval, service, &admission) {
                offer(candidate, remaining_capacity(service, &appointments, &candidate));
            }
        }

        if service.is_group {
            for window in joinable_sessions(&open, service, &appointments, &admission) {
                offer(window, remaining_capacity(service, &appointments, &window));
            }
        }
    }

    Ok(by_window
        .into_iter()
        .map(|(window, remaining_capacity)| Slot {
            start: window.start,
            end: window.end,
            remaining_capacity,
        })
        .collect())
}

/// Working time of one staff member on `day`: expanded rules plus
/// `available` exceptions, minus business blackouts and `blocked` exceptions.
pub fn open_intervals<S: ScheduleStore + ?Sized>(
    store: &S,
    staff_id: Uuid,
    day: &TimeInterval,
    tz: Tz,
    blackouts: &[TimeInterval],
) -> Result<Vec<TimeInterval>> {
    let mut base = expand_rules(&store.active_rules(staff_id)?, day, tz);

    let exceptions = store.exceptions(staff_id, day)?;
    let (opened, blocked): (Vec<_>, Vec<_>) = exceptions
        .iter()
        .partition(|e| e.kind == ExceptionKind::Available);
    base.extend(opened.iter().filter_map(|e| e.window().clip(day)));
    let base = merge(&base);

    let blocked: Vec<TimeInterval> = blocked.iter().map(|e| e.window()).collect();
    let open = subtract(&base, blackouts);
    Ok(subtract(&open, &blocked))
}

/// `open` minus every active appointment, widened by the service's buffers.
pub fn free_intervals(
    open: &[TimeInterval],
    service: &Service,
    appointments: &[Appointment],
) -> Vec<TimeInterval> {
    let busy = build_busy(
        appointments.iter().filter(|a| a.is_active()).map(Appointment::window),
        service.buffer_before_minutes,
        service.buffer_after_minutes,
    );
    subtract(open, &busy)
}

/// Windows of existing sessions of a group service that can still be joined.
///
/// A session qualifies when it is admitted and would be free if it were the
/// only appointment removed, so buffers around every other appointment still
/// apply. Capacity is checked by the caller.
fn joinable_sessions(
    open: &[TimeInterval],
    service: &Service,
    appointments: &[Appointment],
    admission: &AdmissionWindow,
) -> Vec<TimeInterval> {
    appointments
        .iter()
        .filter(|a| a.is_active() && a.service_id == service.id)
        .filter(|a| admission.admits(a.start_at))
        .filter(|session| {
            let others: Vec<Appointment> = appointments
                .iter()
                .filter(|a| a.id != session.id)
                .cloned()
                .collect();
            let window = session.window();
            free_intervals(open, service, &others)
                .iter()
                .any(|free| free.contains(&window))
        })
        .map(Appointment::window)
        .collect()
}

/// Candidate windows inside `interval`, stepping from its start, that fit
/// entirely and fall within the admission window.
fn candidate_windows(
    interval: &TimeInterval,
    service: &Service,
    admission: &AdmissionWindow,
) -> Vec<TimeInterval> {
    let duration = Duration::minutes(i64::from(service.duration_minutes));
    let step = Duration::minutes(i64::from(service.slot_step_minutes));

    let mut windows = Vec::new();
    let mut cursor = interval.start;
    while cursor + duration <= interval.end {
        if cursor > admission.horizon {
            // Candidates only grow from here.
            break;
        }
        if cursor >= admission.earliest {
            windows.push(TimeInterval::new(cursor, cursor + duration));
        }
        cursor += step;
    }
    windows
}

/// Capacity left in `window` given the staff member's active appointments.
///
/// Group services count attendees (at least one per appointment); one-on-one
/// services count appointments.
pub fn remaining_capacity(
    service: &Service,
    appointments: &[Appointment],
    window: &TimeInterval,
) -> u32 {
    let overlapping = appointments
        .iter()
        .filter(|a| a.is_active() && a.window().overlaps(window));

    let used: u32 = if service.is_group {
        overlapping.map(|a| a.attendee_count.max(1)).sum()
    } else {
        overlapping.count() as u32
    };

    service.capacity.saturating_sub(used)
}
