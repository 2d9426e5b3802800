//! Error types for slot-engine operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulingError {
    /// Malformed date, timestamp, or service definition. Raised before any
    /// computation, so no partial effects exist.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Requested start {requested} is earlier than the earliest bookable instant {earliest}")]
    LeadTimeViolation {
        requested: DateTime<Utc>,
        earliest: DateTime<Utc>,
    },

    #[error("Requested start {requested} is later than the booking horizon {horizon}")]
    HorizonViolation {
        requested: DateTime<Utc>,
        horizon: DateTime<Utc>,
    },

    #[error("Client contact details are required for group bookings")]
    ClientRequired,

    /// The request was well-formed but no eligible staff member could take it.
    #[error("Slot is no longer available")]
    SlotUnavailable,

    #[error("Store error: {0}")]
    Store(String),
}

impl SchedulingError {
    /// Stable machine-readable code for transports.
    pub fn kind(&self) -> &'static str {
        match self {
            SchedulingError::InvalidInput(_) => "invalid_input",
            SchedulingError::InvalidTimezone(_) => "invalid_timezone",
            SchedulingError::NotFound(_) => "not_found",
            SchedulingError::LeadTimeViolation { .. } => "lead_time_violation",
            SchedulingError::HorizonViolation { .. } => "horizon_violation",
            SchedulingError::ClientRequired => "client_required",
            SchedulingError::SlotUnavailable => "slot_unavailable",
            SchedulingError::Store(_) => "store",
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedulingError>;
