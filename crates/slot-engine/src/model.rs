//! Scheduling records: businesses, staff, services, rules, and appointments.
//!
//! These are the values exchanged with the persistence collaborator. Only
//! [`Slot`] is derived by this crate and never stored.

use std::fmt;

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SchedulingError};
use crate::interval::TimeInterval;

fn default_true() -> bool {
    true
}

fn default_capacity() -> u32 {
    1
}

/// Global admission constraints of a business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessPolicy {
    /// IANA timezone name (e.g. "America/Chicago").
    pub timezone: String,
    #[serde(default)]
    pub min_lead_minutes: u32,
    pub max_future_days: u32,
    pub max_appointments_per_day_per_staff: u32,
}

impl BusinessPolicy {
    pub fn tz(&self) -> Result<Tz> {
        parse_timezone(&self.timezone)
    }
}

/// Parse an IANA timezone identifier.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| SchedulingError::InvalidTimezone(name.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Business {
    pub id: Uuid,
    pub name: String,
    #[serde(flatten)]
    pub policy: BusinessPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub duration_minutes: u32,
    #[serde(default)]
    pub buffer_before_minutes: u32,
    #[serde(default)]
    pub buffer_after_minutes: u32,
    pub slot_step_minutes: u32,
    #[serde(default)]
    pub is_group: bool,
    /// Maximum simultaneous attendees; 1 for one-on-one services.
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    /// Staff members who can deliver this service.
    #[serde(default)]
    pub staff_ids: Vec<Uuid>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Service {
    /// Reject definitions that would make slot generation meaningless or unbounded.
    pub fn validate(&self) -> Result<()> {
        if self.duration_minutes == 0 {
            return Err(SchedulingError::InvalidInput(format!(
                "service {} has zero duration",
                self.id
            )));
        }
        if self.slot_step_minutes == 0 {
            return Err(SchedulingError::InvalidInput(format!(
                "service {} has zero slot step",
                self.id
            )));
        }
        if self.capacity == 0 {
            return Err(SchedulingError::InvalidInput(format!(
                "service {} has zero capacity",
                self.id
            )));
        }
        Ok(())
    }
}

/// A recurring weekly window during which a staff member works.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRule {
    pub staff_id: Uuid,
    /// 0 = Sunday through 6 = Saturday.
    pub weekday: u8,
    #[serde(with = "wall_clock")]
    pub start_time: NaiveTime,
    #[serde(with = "wall_clock")]
    pub end_time: NaiveTime,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExceptionKind {
    Blocked,
    Available,
}

/// One-off override of a staff member's recurring rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityException {
    pub staff_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub kind: ExceptionKind,
    #[serde(default)]
    pub reason: Option<String>,
}

impl AvailabilityException {
    pub fn window(&self) -> TimeInterval {
        TimeInterval::new(self.start_at, self.end_at)
    }
}

/// Business-wide closure (holidays and the like).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessBlackout {
    pub business_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl BusinessBlackout {
    pub fn window(&self) -> TimeInterval {
        TimeInterval::new(self.start_at, self.end_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Active appointments occupy capacity; cancelled ones are inert.
    pub fn is_active(self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub business_id: Uuid,
    pub staff_id: Uuid,
    pub service_id: Uuid,
    /// Owning client of a one-on-one appointment. Group attendees are tracked
    /// separately and counted in `attendee_count`.
    #[serde(default)]
    pub client_id: Option<Uuid>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub attendee_count: u32,
}

impl Appointment {
    pub fn window(&self) -> TimeInterval {
        TimeInterval::new(self.start_at, self.end_at)
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Fields needed to create an appointment; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub business_id: Uuid,
    pub staff_id: Uuid,
    pub service_id: Uuid,
    pub client_id: Option<Uuid>,
    pub window: TimeInterval,
    pub status: AppointmentStatus,
}

/// Contact details supplied with a booking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl ClientInfo {
    /// A client is identifiable by a non-blank email or phone.
    pub fn has_identity(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.email) || present(&self.phone)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub business_id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// A client attached to a group appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub appointment_id: Uuid,
    pub client_id: Uuid,
}

/// A bookable window with the number of additional attendees it can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub remaining_capacity: u32,
}

/// Serde adapter for wall-clock times written as "HH:MM" or "HH:MM:SS".
pub mod wall_clock {
    use chrono::{NaiveTime, Timelike};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(s: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(s, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
            .ok()
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        let format = if time.second() == 0 { "%H:%M" } else { "%H:%M:%S" };
        serializer.serialize_str(&time.format(format).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid wall-clock time '{}', expected HH:MM", raw))
        })
    }
}
