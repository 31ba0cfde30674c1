use thiserror::Error;

use crate::db::models::AppointmentStatus;
use crate::db::DatabaseError;

/// Business errors for the scheduling engine. Every variant is scoped to a
/// single request; nothing here is fatal to the process.
#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Provider is not available: {0}")]
    ProviderUnavailable(String),

    #[error("This time slot is already booked")]
    SlotConflict,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Cannot transition appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Scheduling store unavailable")]
    StoreUnavailable(#[source] DatabaseError),
}
