//! # slot-engine
//!
//! Appointment availability and booking for service businesses with several
//! staff members.
//!
//! The engine answers "which windows can be booked on this day?" and then
//! commits a booking against one of them without breaking capacity, lead-time
//! or daily-limit constraints, even when two bookings race for the same slot.
//! All wall-clock reasoning happens in the business's IANA timezone via
//! `chrono-tz`, so DST transitions are handled per calendar date.
//!
//! ## Modules
//!
//! - [`interval`] — set difference and union over half-open intervals
//! - [`dst`] — resolving local times inside DST gaps and folds
//! - [`rules`] — weekly rules → concrete intervals for one day
//! - [`busy`] — appointments → buffered busy intervals
//! - [`availability`] — free intervals → capacity-annotated slots
//! - [`booking`] — race-safe booking resolution across candidate staff
//! - [`scheduler`] — the public operations over a store and a clock
//! - [`store`] — persistence seam and the in-memory implementation
//! - [`api`] — request/response shapes with string timestamps
//! - [`model`] — scheduling records
//! - [`clock`] — injectable "now"
//! - [`error`] — Error types

pub mod api;
pub mod availability;
pub mod booking;
pub mod busy;
pub mod clock;
pub mod dst;
pub mod error;
pub mod interval;
pub mod model;
pub mod rules;
pub mod scheduler;
pub mod store;

pub use api::{
    AvailabilityRequest, AvailabilityResponse, BookingConfirmation, BookingRequest,
    CalendarEntry, CalendarRequest, CalendarResponse, SlotDto,
};
pub use availability::{slots_for, SlotQuery};
pub use booking::{BookingIntent, BookingResolver};
pub use busy::build_busy;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::SchedulingError;
pub use interval::{merge, subtract, TimeInterval};
pub use rules::{day_window, expand_rules};
pub use scheduler::Scheduler;
pub use store::{Catalog, MemoryStore, ScheduleStore};
