//! The two operations offered to the surrounding system, plus cancellation,
//! the business calendar and catalog listings, over a [`ScheduleStore`] and a
//! [`Clock`].

use std::collections::HashMap;

use tracing::info;
use uuid::Uuid;

use crate::api::{
    parse_date, parse_instant, AvailabilityRequest, AvailabilityResponse, BookingConfirmation,
    BookingRequest, CalendarEntry, CalendarRequest, CalendarResponse, SlotDto,
};
use crate::availability::{slots_for, SlotQuery};
use crate::booking::{BookingIntent, BookingResolver};
use crate::clock::{Clock, SystemClock};
use crate::error::{Result, SchedulingError};
use crate::interval::TimeInterval;
use crate::model::{parse_timezone, Appointment, AppointmentStatus, Business, Service, Staff};
use crate::store::ScheduleStore;

pub struct Scheduler<S, C = SystemClock> {
    store: S,
    clock: C,
    resolver: BookingResolver,
}

impl<S: ScheduleStore> Scheduler<S, SystemClock> {
    pub fn with_system_clock(store: S) -> Self {
        Self::new(store, SystemClock)
    }
}

impl<S: ScheduleStore, C: Clock> Scheduler<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            resolver: BookingResolver::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Look up a business and one of its active services.
    fn offering(&self, business_id: Uuid, service_id: Uuid) -> Result<Option<(Business, Service)>> {
        let Some(business) = self.store.business(business_id)? else {
            return Ok(None);
        };
        let service = self
            .store
            .service(service_id)?
            .filter(|s| s.business_id == business_id && s.active);
        Ok(service.map(|s| (business, s)))
    }

    /// Bookable slots for a service on one date.
    ///
    /// Unknown businesses or services yield an empty list; only malformed input
    /// is an error.
    pub fn compute_availability(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<AvailabilityResponse> {
        let date = parse_date(&request.date)?;
        let override_tz = request.timezone.as_deref().map(parse_timezone).transpose()?;

        let empty = AvailabilityResponse {
            date: request.date.clone(),
            slots: Vec::new(),
        };
        let offering = self.offering(request.business_id, request.service_id)?;
        let Some((business, service)) = offering else {
            return Ok(empty);
        };
        let tz = match override_tz {
            Some(tz) => tz,
            None => business.policy.tz()?,
        };

        let slots = slots_for(
            &self.store,
            &SlotQuery {
                business: &business,
                service: &service,
                date,
                staff: request.staff_id,
                timezone: Some(tz),
                now: self.clock.now(),
            },
        )?;

        Ok(AvailabilityResponse {
            date: request.date.clone(),
            slots: slots.iter().map(|s| SlotDto::from_slot(s, tz)).collect(),
        })
    }

    /// Commit a booking for the requested start.
    pub fn create_booking(&self, request: &BookingRequest) -> Result<BookingConfirmation> {
        let desired_start = parse_instant(&request.slot_start)?;
        if self.store.business(request.business_id)?.is_none() {
            return Err(SchedulingError::NotFound(format!(
                "business {}",
                request.business_id
            )));
        }
        let (business, service) = self
            .offering(request.business_id, request.service_id)?
            .ok_or_else(|| SchedulingError::NotFound(format!("service {}", request.service_id)))?;

        let intent = BookingIntent {
            staff_preference: request.staff_id,
            desired_start,
            client: request.client.clone().unwrap_or_default(),
        };
        let appointment = self
            .resolver
            .book(&self.store, &business, &service, &intent, self.clock.now())?;
        Ok(BookingConfirmation::from(&appointment))
    }

    /// Cancel an appointment so it stops occupying capacity. Cancelling an
    /// already cancelled appointment returns it unchanged.
    pub fn cancel_appointment(&self, appointment_id: Uuid) -> Result<Appointment> {
        let appointment = self
            .store
            .appointment(appointment_id)?
            .ok_or_else(|| SchedulingError::NotFound(format!("appointment {}", appointment_id)))?;
        if !appointment.is_active() {
            return Ok(appointment);
        }
        let cancelled = self
            .store
            .set_status(appointment_id, AppointmentStatus::Cancelled)?;
        info!(appointment = %appointment_id, staff = %cancelled.staff_id, "appointment cancelled");
        Ok(cancelled)
    }

    /// Appointments of a business, in any status, that lie entirely within
    /// `[from, to]`, sorted by start and labelled with service and client
    /// names. An unknown business has an empty calendar.
    pub fn calendar(&self, request: &CalendarRequest) -> Result<CalendarResponse> {
        let from = parse_instant(&request.from)?;
        let to = parse_instant(&request.to)?;
        if to < from {
            return Err(SchedulingError::InvalidInput(format!(
                "calendar range ends ({}) before it starts ({})",
                request.to, request.from
            )));
        }

        let window = TimeInterval::new(from, to);
        let appointments = self.store.appointments_for_business(
            request.business_id,
            &window,
            request.staff_id,
        )?;

        let mut services: HashMap<Uuid, Option<Service>> = HashMap::new();
        let mut entries = Vec::with_capacity(appointments.len());
        for appointment in &appointments {
            let service = match services.get(&appointment.service_id) {
                Some(cached) => cached.clone(),
                None => {
                    let found = self.store.service(appointment.service_id)?;
                    services.insert(appointment.service_id, found.clone());
                    found
                }
            };
            let client = match appointment.client_id {
                Some(id) => self.store.client(id)?,
                None => None,
            };
            entries.push(CalendarEntry::new(appointment, service.as_ref(), client.as_ref()));
        }

        Ok(CalendarResponse {
            appointments: entries,
        })
    }

    pub fn services(&self, business_id: Uuid) -> Result<Vec<Service>> {
        self.store.services_for_business(business_id)
    }

    pub fn staff(&self, business_id: Uuid) -> Result<Vec<Staff>> {
        self.store.staff_for_business(business_id)
    }
}
