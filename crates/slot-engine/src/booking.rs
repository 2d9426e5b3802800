//! Booking resolution: commit a desired start against the first staff member
//! who can still take it.
//!
//! Each candidate is re-validated against freshly computed slots and the daily
//! limit, then the appointment is created or joined. That read-check-write
//! sequence runs inside a per-staff critical section, so two concurrent
//! requests for the same staff member cannot both pass the capacity check.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::availability::{slots_for, AdmissionWindow, SlotQuery};
use crate::error::{Result, SchedulingError};
use crate::interval::TimeInterval;
use crate::model::{Appointment, AppointmentStatus, Business, ClientInfo, NewAppointment, Service};
use crate::rules::day_window;
use crate::store::ScheduleStore;

/// What the caller wants to book.
#[derive(Debug, Clone)]
pub struct BookingIntent {
    pub staff_preference: Option<Uuid>,
    pub desired_start: DateTime<Utc>,
    pub client: ClientInfo,
}

/// Everything fixed for one booking attempt across candidates.
struct Attempt<'a> {
    business: &'a Business,
    service: &'a Service,
    tz: Tz,
    window: TimeInterval,
    client_id: Option<Uuid>,
    now: DateTime<Utc>,
}

/// Serialises booking commits per staff member.
///
/// All bookings against a store must go through the same resolver for the
/// exclusion to hold.
#[derive(Debug, Default)]
pub struct BookingResolver {
    staff_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl BookingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, staff_id: Uuid) -> Arc<Mutex<()>> {
        Arc::clone(self.staff_locks.entry(staff_id).or_default().value())
    }

    /// Book `intent` for `service`, returning the created or joined appointment.
    ///
    /// # Errors
    /// - `LeadTimeViolation` / `HorizonViolation` when the start is outside the
    ///   business's admission window.
    /// - `ClientRequired` for group services without an email or phone.
    /// - `InvalidInput` when the preferred staff member is not assigned to the
    ///   service.
    /// - `SlotUnavailable` when no candidate staff member can take the booking.
    #[tracing::instrument(
        skip_all,
        fields(business = %business.id, service = %service.id, start = %intent.desired_start)
    )]
    pub fn book<S: ScheduleStore + ?Sized>(
        &self,
        store: &S,
        business: &Business,
        service: &Service,
        intent: &BookingIntent,
        now: DateTime<Utc>,
    ) -> Result<Appointment> {
        service.validate()?;
        let tz = business.policy.tz()?;
        let requested = intent.desired_start;

        let admission = AdmissionWindow::new(&business.policy, tz, now);
        if requested < admission.earliest {
            return Err(SchedulingError::LeadTimeViolation {
                requested,
                earliest: admission.earliest,
            });
        }
        if requested > admission.horizon {
            return Err(SchedulingError::HorizonViolation {
                requested,
                horizon: admission.horizon,
            });
        }

        let identified = intent.client.has_identity();
        if service.is_group && !identified {
            return Err(SchedulingError::ClientRequired);
        }

        let assigned = store.staff_for_service(service.id)?;
        let candidates = match intent.staff_preference {
            Some(id) if assigned.contains(&id) => vec![id],
            Some(id) => {
                return Err(SchedulingError::InvalidInput(format!(
                    "staff member {} does not provide service {}",
                    id, service.id
                )));
            }
            None => assigned,
        };

        let client_id = if identified {
            Some(store.find_or_create_client(business.id, &intent.client)?)
        } else {
            None
        };

        let attempt = Attempt {
            business,
            service,
            tz,
            window: TimeInterval::new(
                requested,
                requested + Duration::minutes(i64::from(service.duration_minutes)),
            ),
            client_id,
            now,
        };

        for staff_id in candidates {
            let lock = self.lock_for(staff_id);
            let _guard = lock.lock();
            if let Some(appointment) = self.try_commit(store, &attempt, staff_id)? {
                info!(
                    appointment = %appointment.id,
                    %staff_id,
                    attendees = appointment.attendee_count,
                    "booking committed"
                );
                return Ok(appointment);
            }
        }

        warn!("no candidate staff member could take the booking");
        Err(SchedulingError::SlotUnavailable)
    }

    /// Validate and commit for one staff member. Must run under that staff
    /// member's lock. `Ok(None)` means "try the next candidate".
    fn try_commit<S: ScheduleStore + ?Sized>(
        &self,
        store: &S,
        attempt: &Attempt<'_>,
        staff_id: Uuid,
    ) -> Result<Option<Appointment>> {
        let Attempt {
            business,
            service,
            tz,
            window,
            client_id,
            now,
        } = *attempt;
        let date = window.start.with_timezone(&tz).date_naive();

        let slots = slots_for(
            store,
            &SlotQuery {
                business,
                service,
                date,
                staff: Some(staff_id),
                timezone: Some(tz),
                now,
            },
        )?;
        let offered = slots
            .iter()
            .any(|slot| slot.start == window.start && slot.remaining_capacity > 0);
        if !offered {
            debug!(%staff_id, "window not offered");
            return Ok(None);
        }

        let day = day_window(date, tz);
        let booked_today = store.count_active_within(staff_id, &day)?;
        if booked_today >= business.policy.max_appointments_per_day_per_staff as usize {
            debug!(%staff_id, booked_today, "daily appointment limit reached");
            return Ok(None);
        }

        if !service.is_group {
            let appointment = store.create_appointment(NewAppointment {
                business_id: business.id,
                staff_id,
                service_id: service.id,
                client_id,
                window,
                status: AppointmentStatus::Confirmed,
            })?;
            return Ok(Some(appointment));
        }

        let Some(client_id) = client_id else {
            return Err(SchedulingError::ClientRequired);
        };

        let session = match store.find_active_appointment(staff_id, service.id, &window)? {
            Some(existing) => {
                if existing.attendee_count.max(1) >= service.capacity {
                    debug!(%staff_id, appointment = %existing.id, "group session full");
                    return Ok(None);
                }
                existing
            }
            None => store.create_appointment(NewAppointment {
                business_id: business.id,
                staff_id,
                service_id: service.id,
                client_id: None,
                window,
                status: AppointmentStatus::Confirmed,
            })?,
        };

        store.add_attendee(session.id, client_id).map(Some)
    }
}
