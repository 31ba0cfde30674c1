use std::collections::HashMap;
use std::sync::Mutex;

use sqlx::types::Uuid;
use time::OffsetDateTime;

use crate::db::models::{
    Appointment, AppointmentStatus, AvailabilityWindow, NewAppointment, NewAvailabilityWindow,
    Provider,
};
use crate::scheduling::conflict::TimeRange;
use crate::scheduling::ledger::{AvailabilityStore, BookingLedger, LedgerError};

/// Ledger backed by process memory. The mutex spans the conflict check and
/// the write that follows, which gives the same at-most-one-winner guarantee
/// the Postgres adapter gets from its provider row lock.
#[derive(Default)]
pub struct InMemoryBookingLedger {
    appointments: Mutex<HashMap<Uuid, Appointment>>,
}

impl InMemoryBookingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn overlapping(
        appointments: &HashMap<Uuid, Appointment>,
        provider_id: Uuid,
        range: TimeRange,
        exclude: Option<Uuid>,
    ) -> Vec<Appointment> {
        let mut found: Vec<Appointment> = appointments
            .values()
            .filter(|a| {
                a.provider_id == provider_id
                    && a.status != AppointmentStatus::Cancelled
                    && exclude != Some(a.id)
                    && TimeRange::new(a.start_time, a.end_time()).overlaps(&range)
            })
            .cloned()
            .collect();
        found.sort_by_key(|a| a.start_time);
        found
    }
}

impl BookingLedger for InMemoryBookingLedger {
    async fn get(&self, id: Uuid) -> Result<Appointment, LedgerError> {
        self.appointments
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(LedgerError::NotFound)
    }

    async fn find_overlapping(
        &self,
        provider_id: Uuid,
        range: TimeRange,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Appointment>, LedgerError> {
        let appointments = self.appointments.lock().unwrap();
        Ok(Self::overlapping(&appointments, provider_id, range, exclude))
    }

    async fn insert(
        &self,
        new: &NewAppointment,
        conflict_window: TimeRange,
    ) -> Result<Appointment, LedgerError> {
        let mut appointments = self.appointments.lock().unwrap();
        if !Self::overlapping(&appointments, new.provider_id, conflict_window, None).is_empty() {
            return Err(LedgerError::Conflict);
        }

        let now = OffsetDateTime::now_utc();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            provider_id: new.provider_id,
            customer_id: new.customer_id,
            service_refs: new.service_refs.clone(),
            start_time: new.start_time,
            duration_minutes: new.duration_minutes,
            status: AppointmentStatus::Pending,
            total_price_cents: new.total_price_cents,
            created_at: now,
            updated_at: now,
        };
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn reschedule(
        &self,
        id: Uuid,
        new_start: OffsetDateTime,
        new_duration_minutes: i32,
        conflict_window: TimeRange,
    ) -> Result<Appointment, LedgerError> {
        let mut appointments = self.appointments.lock().unwrap();
        let provider_id = appointments
            .get(&id)
            .ok_or(LedgerError::NotFound)?
            .provider_id;
        if !Self::overlapping(&appointments, provider_id, conflict_window, Some(id)).is_empty() {
            return Err(LedgerError::Conflict);
        }

        let appointment = appointments.get_mut(&id).ok_or(LedgerError::NotFound)?;
        appointment.start_time = new_start;
        appointment.duration_minutes = new_duration_minutes;
        appointment.updated_at = OffsetDateTime::now_utc();
        Ok(appointment.clone())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, LedgerError> {
        let mut appointments = self.appointments.lock().unwrap();
        let appointment = appointments.get_mut(&id).ok_or(LedgerError::NotFound)?;
        appointment.status = status;
        appointment.updated_at = OffsetDateTime::now_utc();
        Ok(appointment.clone())
    }
}

#[derive(Default)]
struct AvailabilityState {
    providers: HashMap<Uuid, Provider>,
    windows: HashMap<Uuid, Vec<AvailabilityWindow>>,
}

/// Availability store backed by process memory.
#[derive(Default)]
pub struct InMemoryAvailabilityStore {
    inner: Mutex<AvailabilityState>,
}

impl InMemoryAvailabilityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_provider(&self, display_name: &str, accepting_bookings: bool) -> Provider {
        let now = OffsetDateTime::now_utc();
        let provider = Provider {
            id: Uuid::new_v4(),
            display_name: display_name.to_string(),
            accepting_bookings,
            created_at: now,
            updated_at: now,
        };
        self.inner
            .lock()
            .unwrap()
            .providers
            .insert(provider.id, provider.clone());
        provider
    }
}

impl AvailabilityStore for InMemoryAvailabilityStore {
    async fn provider(&self, provider_id: Uuid) -> Result<Provider, LedgerError> {
        self.inner
            .lock()
            .unwrap()
            .providers
            .get(&provider_id)
            .cloned()
            .ok_or(LedgerError::NotFound)
    }

    async fn windows_for_day(
        &self,
        provider_id: Uuid,
        day_of_week: i16,
    ) -> Result<Vec<AvailabilityWindow>, LedgerError> {
        let inner = self.inner.lock().unwrap();
        let mut windows: Vec<AvailabilityWindow> = inner
            .windows
            .get(&provider_id)
            .map(|windows| {
                windows
                    .iter()
                    .filter(|w| w.day_of_week == day_of_week)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        windows.sort_by_key(|w| w.start_time);
        Ok(windows)
    }

    async fn replace_windows(
        &self,
        provider_id: Uuid,
        windows: &[NewAvailabilityWindow],
    ) -> Result<Vec<AvailabilityWindow>, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.providers.contains_key(&provider_id) {
            return Err(LedgerError::NotFound);
        }

        let now = OffsetDateTime::now_utc();
        let stored: Vec<AvailabilityWindow> = windows
            .iter()
            .map(|w| AvailabilityWindow {
                id: Uuid::new_v4(),
                provider_id,
                day_of_week: w.day_of_week,
                start_time: w.start_time,
                end_time: w.end_time,
                created_at: now,
            })
            .collect();
        inner.windows.insert(provider_id, stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, time};

    fn booking(provider_id: Uuid, start: OffsetDateTime) -> NewAppointment {
        NewAppointment {
            provider_id,
            customer_id: Uuid::new_v4(),
            service_refs: vec![Uuid::new_v4()],
            start_time: start,
            duration_minutes: 30,
            total_price_cents: 2500,
        }
    }

    #[tokio::test]
    async fn insert_rejects_occupied_window() {
        let ledger = InMemoryBookingLedger::new();
        let provider_id = Uuid::new_v4();
        let start = datetime!(2026-08-10 10:00 UTC);
        let window = TimeRange::new(
            datetime!(2026-08-10 09:30 UTC),
            datetime!(2026-08-10 11:00 UTC),
        );

        ledger.insert(&booking(provider_id, start), window).await.unwrap();
        let err = ledger
            .insert(&booking(provider_id, start), window)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict));
    }

    #[tokio::test]
    async fn insert_ignores_other_providers() {
        let ledger = InMemoryBookingLedger::new();
        let start = datetime!(2026-08-10 10:00 UTC);
        let window = TimeRange::new(
            datetime!(2026-08-10 09:30 UTC),
            datetime!(2026-08-10 11:00 UTC),
        );

        ledger.insert(&booking(Uuid::new_v4(), start), window).await.unwrap();
        assert!(ledger
            .insert(&booking(Uuid::new_v4(), start), window)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn reschedule_excludes_own_row() {
        let ledger = InMemoryBookingLedger::new();
        let provider_id = Uuid::new_v4();
        let start = datetime!(2026-08-10 10:00 UTC);
        let window = TimeRange::new(
            datetime!(2026-08-10 09:30 UTC),
            datetime!(2026-08-10 11:00 UTC),
        );
        let appointment = ledger.insert(&booking(provider_id, start), window).await.unwrap();

        let moved = ledger
            .reschedule(appointment.id, start, 30, window)
            .await
            .unwrap();
        assert_eq!(moved.id, appointment.id);
        assert_eq!(moved.status, AppointmentStatus::Pending);
    }

    #[tokio::test]
    async fn replace_windows_overwrites_the_full_set() {
        let store = InMemoryAvailabilityStore::new();
        let provider = store.add_provider("Test Provider", true);

        let monday = NewAvailabilityWindow {
            day_of_week: 1,
            start_time: time!(09:00),
            end_time: time!(12:00),
        };
        let tuesday = NewAvailabilityWindow {
            day_of_week: 2,
            start_time: time!(13:00),
            end_time: time!(17:00),
        };
        store
            .replace_windows(provider.id, &[monday, tuesday])
            .await
            .unwrap();

        let friday_only = NewAvailabilityWindow {
            day_of_week: 5,
            start_time: time!(10:00),
            end_time: time!(14:00),
        };
        store.replace_windows(provider.id, &[friday_only]).await.unwrap();

        assert!(store.windows_for_day(provider.id, 1).await.unwrap().is_empty());
        assert_eq!(store.windows_for_day(provider.id, 5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn replace_windows_requires_known_provider() {
        let store = InMemoryAvailabilityStore::new();
        let err = store
            .replace_windows(Uuid::new_v4(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound));
    }
}
