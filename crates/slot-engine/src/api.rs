//! Request/response shapes exchanged with the surrounding system.
//!
//! Timestamps cross this boundary as RFC 3339 strings; wall-clock times and
//! timezones travel separately.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SchedulingError};
use crate::model::{Appointment, AppointmentStatus, Client, ClientInfo, Service, Slot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub business_id: Uuid,
    pub service_id: Uuid,
    /// Calendar date as `YYYY-MM-DD`.
    pub date: String,
    #[serde(default)]
    pub staff_id: Option<Uuid>,
    /// IANA timezone overriding the business's own.
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDto {
    pub start: String,
    pub end: String,
    pub capacity: u32,
}

impl SlotDto {
    /// Render a slot with offsets of `tz`.
    pub fn from_slot(slot: &Slot, tz: Tz) -> Self {
        Self {
            start: slot.start.with_timezone(&tz).to_rfc3339(),
            end: slot.end.with_timezone(&tz).to_rfc3339(),
            capacity: slot.remaining_capacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub date: String,
    pub slots: Vec<SlotDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub business_id: Uuid,
    pub service_id: Uuid,
    #[serde(default)]
    pub staff_id: Option<Uuid>,
    /// Desired start as an RFC 3339 instant.
    pub slot_start: String,
    #[serde(default)]
    pub client: Option<ClientInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub appointment_id: Uuid,
    pub status: String,
    pub start_at: String,
    pub end_at: String,
    pub staff_id: Uuid,
}

impl From<&Appointment> for BookingConfirmation {
    fn from(a: &Appointment) -> Self {
        Self {
            appointment_id: a.id,
            status: a.status.to_string(),
            start_at: a.start_at.to_rfc3339(),
            end_at: a.end_at.to_rfc3339(),
            staff_id: a.staff_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRequest {
    pub business_id: Uuid,
    /// Inclusive lower bound on appointment start, RFC 3339.
    pub from: String,
    /// Inclusive upper bound on appointment end, RFC 3339.
    pub to: String,
    #[serde(default)]
    pub staff_id: Option<Uuid>,
}

/// One appointment as shown on a business calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub id: Uuid,
    pub service_id: Uuid,
    pub service_name: Option<String>,
    pub staff_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Uuid>,
    /// "First Last" of the booking client; group sessions have none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    pub start_at: String,
    pub end_at: String,
    pub status: AppointmentStatus,
    pub attendee_count: u32,
}

impl CalendarEntry {
    pub fn new(
        appointment: &Appointment,
        service: Option<&Service>,
        client: Option<&Client>,
    ) -> Self {
        Self {
            id: appointment.id,
            service_id: appointment.service_id,
            service_name: service.map(|s| s.name.clone()),
            staff_id: appointment.staff_id,
            client_id: appointment.client_id,
            client_name: client.and_then(display_name),
            start_at: appointment.start_at.to_rfc3339(),
            end_at: appointment.end_at.to_rfc3339(),
            status: appointment.status,
            attendee_count: appointment.attendee_count,
        }
    }
}

fn display_name(client: &Client) -> Option<String> {
    let name = [client.first_name.as_deref(), client.last_name.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarResponse {
    pub appointments: Vec<CalendarEntry>,
}

/// Parse an RFC 3339 instant into `DateTime<Utc>`.
///
/// The offset is mandatory ("2026-03-16T09:00:00-05:00" or
/// "2026-03-16T14:00:00Z"); a bare local time is rejected rather than guessed.
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            SchedulingError::InvalidInput(format!(
                "invalid instant '{}' (RFC 3339 with offset required): {}",
                s, e
            ))
        })
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| SchedulingError::InvalidInput(format!("invalid date '{}': {}", s, e)))
}
