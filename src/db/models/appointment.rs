use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use std::fmt;
use time::{Duration, OffsetDateTime};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "appointment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A booked appointment. Rows are never deleted; cancellation is a status
/// transition so history stays intact.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub customer_id: Uuid,
    pub service_refs: Vec<Uuid>,
    pub start_time: OffsetDateTime,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub total_price_cents: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Appointment {
    pub fn end_time(&self) -> OffsetDateTime {
        self.start_time + Duration::minutes(i64::from(self.duration_minutes))
    }
}

/// Booking request. Duration and price arrive pre-resolved by the caller
/// from the service catalog; the engine treats both as opaque.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAppointment {
    pub provider_id: Uuid,
    pub customer_id: Uuid,
    #[validate(length(min = 1, message = "At least one service must be selected"))]
    pub service_refs: Vec<Uuid>,
    pub start_time: OffsetDateTime,
    #[validate(range(min = 1, message = "Duration must be at least 1 minute"))]
    pub duration_minutes: i32,
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub total_price_cents: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RescheduleRequest {
    pub start_time: OffsetDateTime,
    #[validate(range(min = 1, message = "Duration must be at least 1 minute"))]
    pub duration_minutes: i32,
}
