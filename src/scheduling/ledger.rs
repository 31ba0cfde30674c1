use sqlx::types::Uuid;
use thiserror::Error;
use time::OffsetDateTime;

use crate::db::models::{
    Appointment, AppointmentStatus, AvailabilityWindow, NewAppointment, NewAvailabilityWindow,
    Provider,
};
use crate::db::DatabaseError;
use crate::scheduling::conflict::TimeRange;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("record not found")]
    NotFound,

    #[error("a conflicting appointment occupies the requested window")]
    Conflict,

    #[error(transparent)]
    Store(#[from] DatabaseError),
}

/// Authoritative appointment set per provider; the single source of truth
/// for conflict decisions.
///
/// Implementations must make the overlap check and the write that follows a
/// single atomic unit: when two calls race for overlapping conflict windows
/// on the same provider, at most one may succeed and the loser must see
/// `LedgerError::Conflict`. An aborted call leaves no partial state.
pub trait BookingLedger: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Appointment, LedgerError>;

    /// Non-cancelled appointments whose raw interval intersects the
    /// half-open `range`, optionally excluding one appointment id.
    async fn find_overlapping(
        &self,
        provider_id: Uuid,
        range: TimeRange,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Appointment>, LedgerError>;

    /// Atomically re-check `conflict_window` and insert with status
    /// `pending`.
    async fn insert(
        &self,
        new: &NewAppointment,
        conflict_window: TimeRange,
    ) -> Result<Appointment, LedgerError>;

    /// Atomically re-check `conflict_window` (excluding the appointment's
    /// own row) and update start/duration, preserving id and status.
    async fn reschedule(
        &self,
        id: Uuid,
        new_start: OffsetDateTime,
        new_duration_minutes: i32,
        conflict_window: TimeRange,
    ) -> Result<Appointment, LedgerError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, LedgerError>;
}

/// Recurring weekly availability per provider. Read-mostly; `replace_windows`
/// is a full overwrite of the provider's schedule, never a merge.
pub trait AvailabilityStore: Send + Sync {
    async fn provider(&self, provider_id: Uuid) -> Result<Provider, LedgerError>;

    /// Windows for one weekday, ordered by start time. An unknown provider
    /// simply has none.
    async fn windows_for_day(
        &self,
        provider_id: Uuid,
        day_of_week: i16,
    ) -> Result<Vec<AvailabilityWindow>, LedgerError>;

    /// Delete-all-then-insert in one transaction; all-or-nothing. Fails with
    /// `NotFound` if the provider is unknown.
    async fn replace_windows(
        &self,
        provider_id: Uuid,
        windows: &[NewAvailabilityWindow],
    ) -> Result<Vec<AvailabilityWindow>, LedgerError>;
}
