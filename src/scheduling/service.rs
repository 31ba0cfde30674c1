use sqlx::types::Uuid;
use time::{Date, Duration, OffsetDateTime};
use tracing::{info, warn};
use validator::Validate;

use crate::db::models::{
    Appointment, AppointmentStatus, AvailabilityWindow, NewAppointment, NewAvailabilityWindow,
    RescheduleRequest,
};
use crate::scheduling::conflict::{ConflictResolver, TimeRange};
use crate::scheduling::events::{AppointmentEvent, EventPublisher};
use crate::scheduling::ledger::{AvailabilityStore, BookingLedger, LedgerError};
use crate::scheduling::lifecycle;
use crate::scheduling::slots::{self, Slot};
use crate::scheduling::SchedulingError;

/// Pause before the single retry of a read-only ledger fetch. Mutating
/// operations are never auto-retried: a blind resubmit of the booking
/// transaction could double-book, so callers must resubmit deliberately.
const READ_RETRY_DELAY: std::time::Duration = std::time::Duration::from_millis(150);

const MINUTES_PER_DAY: i32 = 24 * 60;

/// Orchestrates slot listing and the appointment lifecycle. All business
/// errors originate here or in `lifecycle`; the ledger and availability
/// store only move data and enforce atomicity.
pub struct SchedulingService<L, A> {
    ledger: L,
    availability: A,
    resolver: ConflictResolver,
    events: EventPublisher,
    slot_increment: Duration,
}

impl<L: BookingLedger, A: AvailabilityStore> SchedulingService<L, A> {
    pub fn new(ledger: L, availability: A, resolver: ConflictResolver, events: EventPublisher) -> Self {
        Self {
            ledger,
            availability,
            resolver,
            events,
            slot_increment: Duration::minutes(slots::SLOT_INCREMENT_MINUTES),
        }
    }

    pub fn with_slot_increment(mut self, minutes: i64) -> Self {
        self.slot_increment = Duration::minutes(minutes);
        self
    }

    /// Every candidate slot for the date's availability windows, each
    /// flagged from one batched ledger read. Pure recomputation: calling
    /// this twice with no intervening writes returns identical results.
    pub async fn list_available_slots(
        &self,
        provider_id: Uuid,
        date: Date,
    ) -> Result<Vec<Slot>, SchedulingError> {
        let provider = self
            .availability
            .provider(provider_id)
            .await
            .map_err(ledger_error("provider"))?;
        if !provider.accepting_bookings {
            return Ok(Vec::new());
        }

        let day = i16::from(date.weekday().number_days_from_sunday());
        let windows = self
            .availability
            .windows_for_day(provider_id, day)
            .await
            .map_err(ledger_error("provider"))?;
        if windows.is_empty() {
            return Ok(Vec::new());
        }

        // One fetch covers every candidate's guard window for the day.
        let day_start = date.midnight().assume_utc();
        let fetch_window = self.resolver.guard_window(day_start, MINUTES_PER_DAY);
        let existing = self
            .find_overlapping_with_retry(provider_id, fetch_window, None)
            .await?;

        let increment_minutes = self.slot_increment.whole_minutes() as i32;
        let mut out = Vec::new();
        for window in &windows {
            for start in slots::slot_starts_with_increment(window, date, self.slot_increment) {
                let guard = self.resolver.guard_window(start, increment_minutes);
                out.push(Slot {
                    start_time: start,
                    available: self.resolver.is_free(&guard, &existing, None),
                });
            }
        }
        out.sort_by_key(|slot| slot.start_time);
        Ok(out)
    }

    pub async fn create_appointment(
        &self,
        new: NewAppointment,
    ) -> Result<Appointment, SchedulingError> {
        new.validate()
            .map_err(|err| SchedulingError::InvalidRequest(err.to_string()))?;
        self.ensure_bookable(new.provider_id, new.start_time, new.duration_minutes)
            .await?;

        let guard = self
            .resolver
            .guard_window(new.start_time, new.duration_minutes);
        let appointment = self
            .ledger
            .insert(&new, guard)
            .await
            .map_err(ledger_error("provider"))?;

        info!(
            appointment_id = %appointment.id,
            provider_id = %appointment.provider_id,
            start_time = %appointment.start_time,
            "Appointment created"
        );
        self.events
            .publish(AppointmentEvent::Created(appointment.clone()));
        Ok(appointment)
    }

    /// Re-runs the full create validation against the new time, excluding
    /// the appointment's own row from the overlap check. Id and status are
    /// preserved.
    pub async fn reschedule_appointment(
        &self,
        id: Uuid,
        request: RescheduleRequest,
    ) -> Result<Appointment, SchedulingError> {
        request
            .validate()
            .map_err(|err| SchedulingError::InvalidRequest(err.to_string()))?;

        let current = self
            .ledger
            .get(id)
            .await
            .map_err(ledger_error("appointment"))?;
        if !lifecycle::can_reschedule(current.status) {
            return Err(SchedulingError::InvalidRequest(format!(
                "a {} appointment cannot be rescheduled",
                current.status
            )));
        }

        self.ensure_bookable(current.provider_id, request.start_time, request.duration_minutes)
            .await?;

        let guard = self
            .resolver
            .guard_window(request.start_time, request.duration_minutes);
        let updated = self
            .ledger
            .reschedule(id, request.start_time, request.duration_minutes, guard)
            .await
            .map_err(ledger_error("appointment"))?;

        info!(
            appointment_id = %updated.id,
            start_time = %updated.start_time,
            "Appointment rescheduled"
        );
        self.events
            .publish(AppointmentEvent::Rescheduled(updated.clone()));
        Ok(updated)
    }

    /// Provider-side `pending -> confirmed`; the slot was already reserved
    /// at creation, so there is no re-check.
    pub async fn confirm_appointment(&self, id: Uuid) -> Result<Appointment, SchedulingError> {
        self.transition(id, AppointmentStatus::Confirmed, AppointmentEvent::Confirmed)
            .await
    }

    /// Cancellation frees capacity implicitly: conflict checks ignore
    /// cancelled rows.
    pub async fn cancel_appointment(&self, id: Uuid) -> Result<(), SchedulingError> {
        self.transition(id, AppointmentStatus::Cancelled, AppointmentEvent::Cancelled)
            .await
            .map(|_| ())
    }

    pub async fn complete_appointment(&self, id: Uuid) -> Result<Appointment, SchedulingError> {
        self.transition(id, AppointmentStatus::Completed, AppointmentEvent::Completed)
            .await
    }

    pub async fn windows(
        &self,
        provider_id: Uuid,
        day_of_week: i16,
    ) -> Result<Vec<AvailabilityWindow>, SchedulingError> {
        self.availability
            .provider(provider_id)
            .await
            .map_err(ledger_error("provider"))?;
        self.availability
            .windows_for_day(provider_id, day_of_week)
            .await
            .map_err(ledger_error("provider"))
    }

    /// Full-set replace of a provider's weekly schedule. Overlapping windows
    /// for the same day are rejected rather than silently merged.
    pub async fn replace_availability(
        &self,
        provider_id: Uuid,
        windows: Vec<NewAvailabilityWindow>,
    ) -> Result<Vec<AvailabilityWindow>, SchedulingError> {
        for window in &windows {
            window
                .validate()
                .map_err(|err| SchedulingError::InvalidRequest(err.to_string()))?;
            if window.start_time >= window.end_time {
                return Err(SchedulingError::InvalidRequest(
                    "window start must be before its end".to_string(),
                ));
            }
        }
        reject_overlapping(&windows)?;

        self.availability
            .replace_windows(provider_id, &windows)
            .await
            .map_err(ledger_error("provider"))
    }

    async fn transition(
        &self,
        id: Uuid,
        to: AppointmentStatus,
        event: fn(Appointment) -> AppointmentEvent,
    ) -> Result<Appointment, SchedulingError> {
        let current = self
            .ledger
            .get(id)
            .await
            .map_err(ledger_error("appointment"))?;
        lifecycle::validate_transition(current.status, to)?;

        let updated = self
            .ledger
            .update_status(id, to)
            .await
            .map_err(ledger_error("appointment"))?;

        info!(
            appointment_id = %updated.id,
            status = %updated.status,
            "Appointment status updated"
        );
        self.events.publish(event(updated.clone()));
        Ok(updated)
    }

    /// The provider must be taking bookings and the requested interval must
    /// lie entirely inside one of that weekday's availability windows.
    async fn ensure_bookable(
        &self,
        provider_id: Uuid,
        start: OffsetDateTime,
        duration_minutes: i32,
    ) -> Result<(), SchedulingError> {
        let provider = self
            .availability
            .provider(provider_id)
            .await
            .map_err(ledger_error("provider"))?;
        if !provider.accepting_bookings {
            return Err(SchedulingError::ProviderUnavailable(
                "provider is not taking bookings".to_string(),
            ));
        }

        let date = start.date();
        let day = i16::from(date.weekday().number_days_from_sunday());
        let windows = self
            .availability
            .windows_for_day(provider_id, day)
            .await
            .map_err(ledger_error("provider"))?;

        let requested = TimeRange::for_appointment(start, duration_minutes);
        let fits = windows.iter().any(|window| {
            let range = slots::window_range(window, date);
            requested.start >= range.start && requested.end <= range.end
        });
        if !fits {
            return Err(SchedulingError::ProviderUnavailable(
                "requested time is outside the provider's availability".to_string(),
            ));
        }
        Ok(())
    }

    async fn find_overlapping_with_retry(
        &self,
        provider_id: Uuid,
        range: TimeRange,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        match self.ledger.find_overlapping(provider_id, range, exclude).await {
            Ok(found) => Ok(found),
            Err(LedgerError::Store(err)) => {
                warn!("Retrying ledger read after transient store error: {}", err);
                tokio::time::sleep(READ_RETRY_DELAY).await;
                self.ledger
                    .find_overlapping(provider_id, range, exclude)
                    .await
                    .map_err(ledger_error("provider"))
            }
            Err(other) => Err(ledger_error("provider")(other)),
        }
    }
}

fn ledger_error(kind: &'static str) -> impl Fn(LedgerError) -> SchedulingError {
    move |err| match err {
        LedgerError::NotFound => SchedulingError::NotFound(kind),
        LedgerError::Conflict => SchedulingError::SlotConflict,
        LedgerError::Store(err) => SchedulingError::StoreUnavailable(err),
    }
}

fn reject_overlapping(windows: &[NewAvailabilityWindow]) -> Result<(), SchedulingError> {
    for (i, a) in windows.iter().enumerate() {
        for b in &windows[i + 1..] {
            if a.day_of_week == b.day_of_week
                && a.start_time < b.end_time
                && b.start_time < a.end_time
            {
                return Err(SchedulingError::InvalidRequest(format!(
                    "availability windows overlap on day {}",
                    a.day_of_week
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Provider;
    use crate::db::DatabaseError;
    use crate::scheduling::memory::{InMemoryAvailabilityStore, InMemoryBookingLedger};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use time::macros::{date, datetime, time};

    type TestService = SchedulingService<InMemoryBookingLedger, InMemoryAvailabilityStore>;

    /// Service over in-memory adapters with one provider available Monday
    /// 09:00-12:00.
    async fn monday_morning_service() -> (TestService, Provider) {
        let availability = InMemoryAvailabilityStore::new();
        let provider = availability.add_provider("Test Provider", true);
        let service = SchedulingService::new(
            InMemoryBookingLedger::new(),
            availability,
            ConflictResolver::new(),
            EventPublisher::new(16),
        );
        service
            .replace_availability(
                provider.id,
                vec![NewAvailabilityWindow {
                    day_of_week: 1,
                    start_time: time!(09:00),
                    end_time: time!(12:00),
                }],
            )
            .await
            .unwrap();
        (service, provider)
    }

    fn booking(provider_id: Uuid, start: OffsetDateTime, duration_minutes: i32) -> NewAppointment {
        NewAppointment {
            provider_id,
            customer_id: Uuid::new_v4(),
            service_refs: vec![Uuid::new_v4()],
            start_time: start,
            duration_minutes,
            total_price_cents: 2500,
        }
    }

    // 2026-08-10 is a Monday.
    const MONDAY: Date = date!(2026 - 08 - 10);

    #[tokio::test]
    async fn empty_ledger_lists_six_open_slots() {
        let (service, provider) = monday_morning_service().await;
        let slots = service.list_available_slots(provider.id, MONDAY).await.unwrap();

        let starts: Vec<_> = slots.iter().map(|s| s.start_time).collect();
        assert_eq!(
            starts,
            vec![
                datetime!(2026-08-10 09:00 UTC),
                datetime!(2026-08-10 09:30 UTC),
                datetime!(2026-08-10 10:00 UTC),
                datetime!(2026-08-10 10:30 UTC),
                datetime!(2026-08-10 11:00 UTC),
                datetime!(2026-08-10 11:30 UTC),
            ]
        );
        assert!(slots.iter().all(|s| s.available));
    }

    #[tokio::test]
    async fn listing_is_idempotent_between_writes() {
        let (service, provider) = monday_morning_service().await;
        service
            .create_appointment(booking(provider.id, datetime!(2026-08-10 10:00 UTC), 30))
            .await
            .unwrap();

        let first = service.list_available_slots(provider.id, MONDAY).await.unwrap();
        let second = service.list_available_slots(provider.id, MONDAY).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn booking_marks_buffered_neighbors_unavailable() {
        let (service, provider) = monday_morning_service().await;
        service
            .create_appointment(booking(provider.id, datetime!(2026-08-10 10:00 UTC), 30))
            .await
            .unwrap();

        let slots = service.list_available_slots(provider.id, MONDAY).await.unwrap();
        let available: Vec<_> = slots
            .iter()
            .filter(|s| s.available)
            .map(|s| s.start_time)
            .collect();
        // 09:30 and 10:30 fall inside the 30-minute buffers around 10:00.
        assert_eq!(
            available,
            vec![
                datetime!(2026-08-10 09:00 UTC),
                datetime!(2026-08-10 11:00 UTC),
                datetime!(2026-08-10 11:30 UTC),
            ]
        );
    }

    #[tokio::test]
    async fn day_without_windows_lists_nothing() {
        let (service, provider) = monday_morning_service().await;
        let tuesday = date!(2026 - 08 - 11);
        assert!(service
            .list_available_slots(provider.id, tuesday)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn unknown_provider_is_not_found() {
        let (service, _) = monday_morning_service().await;
        let err = service
            .list_available_slots(Uuid::new_v4(), MONDAY)
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::NotFound("provider")));
    }

    #[tokio::test]
    async fn disabled_provider_lists_nothing_and_rejects_bookings() {
        let availability = InMemoryAvailabilityStore::new();
        let provider = availability.add_provider("Off Duty", false);
        let service = SchedulingService::new(
            InMemoryBookingLedger::new(),
            availability,
            ConflictResolver::new(),
            EventPublisher::new(16),
        );

        assert!(service
            .list_available_slots(provider.id, MONDAY)
            .await
            .unwrap()
            .is_empty());

        let err = service
            .create_appointment(booking(provider.id, datetime!(2026-08-10 10:00 UTC), 30))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn create_starts_pending() {
        let (service, provider) = monday_morning_service().await;
        let appointment = service
            .create_appointment(booking(provider.id, datetime!(2026-08-10 09:30 UTC), 30))
            .await
            .unwrap();
        assert_eq!(appointment.status, AppointmentStatus::Pending);
    }

    #[tokio::test]
    async fn create_outside_availability_fails() {
        let (service, provider) = monday_morning_service().await;
        // 11:45 + 30 minutes runs past the 12:00 close.
        let err = service
            .create_appointment(booking(provider.id, datetime!(2026-08-10 11:45 UTC), 30))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::ProviderUnavailable(_)));

        let err = service
            .create_appointment(booking(provider.id, datetime!(2026-08-11 10:00 UTC), 30))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn create_rejects_malformed_input() {
        let (service, provider) = monday_morning_service().await;

        let mut no_duration = booking(provider.id, datetime!(2026-08-10 10:00 UTC), 30);
        no_duration.duration_minutes = 0;
        let err = service.create_appointment(no_duration).await.unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidRequest(_)));

        let mut no_services = booking(provider.id, datetime!(2026-08-10 10:00 UTC), 30);
        no_services.service_refs.clear();
        let err = service.create_appointment(no_services).await.unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn booking_inside_buffer_of_confirmed_appointment_conflicts() {
        let (service, provider) = monday_morning_service().await;
        let appointment = service
            .create_appointment(booking(provider.id, datetime!(2026-08-10 10:00 UTC), 30))
            .await
            .unwrap();
        service.confirm_appointment(appointment.id).await.unwrap();

        // 10:45 is only 15 minutes past the existing end; the buffers touch.
        let err = service
            .create_appointment(booking(provider.id, datetime!(2026-08-10 10:45 UTC), 30))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::SlotConflict));
    }

    #[tokio::test]
    async fn booking_exactly_one_buffer_away_succeeds() {
        let (service, provider) = monday_morning_service().await;
        service
            .create_appointment(booking(provider.id, datetime!(2026-08-10 10:00 UTC), 30))
            .await
            .unwrap();

        // Guard window [10:30, 12:00) touches the existing slot's end only.
        assert!(service
            .create_appointment(booking(provider.id, datetime!(2026-08-10 11:00 UTC), 30))
            .await
            .is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_bookings_have_exactly_one_winner() {
        let (service, provider) = monday_morning_service().await;
        let service = Arc::new(service);

        let first = {
            let service = Arc::clone(&service);
            let provider_id = provider.id;
            tokio::spawn(async move {
                service
                    .create_appointment(booking(provider_id, datetime!(2026-08-10 10:00 UTC), 30))
                    .await
            })
        };
        let second = {
            let service = Arc::clone(&service);
            let provider_id = provider.id;
            tokio::spawn(async move {
                service
                    .create_appointment(booking(provider_id, datetime!(2026-08-10 10:15 UTC), 30))
                    .await
            })
        };

        let first = first.await.unwrap();
        let second = second.await.unwrap();

        let winners = [&first, &second].iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        let loser = if first.is_ok() { second } else { first };
        assert!(matches!(loser, Err(SchedulingError::SlotConflict)));
    }

    #[tokio::test]
    async fn cancellation_frees_the_slot() {
        let (service, provider) = monday_morning_service().await;
        let start = datetime!(2026-08-10 10:00 UTC);
        let appointment = service
            .create_appointment(booking(provider.id, start, 30))
            .await
            .unwrap();

        let err = service
            .create_appointment(booking(provider.id, start, 30))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::SlotConflict));

        service.cancel_appointment(appointment.id).await.unwrap();
        assert!(service
            .create_appointment(booking(provider.id, start, 30))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn reschedule_to_own_time_succeeds() {
        let (service, provider) = monday_morning_service().await;
        let appointment = service
            .create_appointment(booking(provider.id, datetime!(2026-08-10 10:00 UTC), 30))
            .await
            .unwrap();

        let moved = service
            .reschedule_appointment(
                appointment.id,
                RescheduleRequest {
                    start_time: appointment.start_time,
                    duration_minutes: appointment.duration_minutes,
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.id, appointment.id);
        assert_eq!(moved.start_time, appointment.start_time);
    }

    #[tokio::test]
    async fn reschedule_preserves_status() {
        let (service, provider) = monday_morning_service().await;
        let appointment = service
            .create_appointment(booking(provider.id, datetime!(2026-08-10 09:00 UTC), 30))
            .await
            .unwrap();
        service.confirm_appointment(appointment.id).await.unwrap();

        let moved = service
            .reschedule_appointment(
                appointment.id,
                RescheduleRequest {
                    start_time: datetime!(2026-08-10 11:00 UTC),
                    duration_minutes: 30,
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.status, AppointmentStatus::Confirmed);
        assert_eq!(moved.start_time, datetime!(2026-08-10 11:00 UTC));
    }

    #[tokio::test]
    async fn reschedule_into_occupied_window_conflicts() {
        let (service, provider) = monday_morning_service().await;
        service
            .create_appointment(booking(provider.id, datetime!(2026-08-10 09:00 UTC), 30))
            .await
            .unwrap();
        let movable = service
            .create_appointment(booking(provider.id, datetime!(2026-08-10 11:00 UTC), 30))
            .await
            .unwrap();

        let err = service
            .reschedule_appointment(
                movable.id,
                RescheduleRequest {
                    start_time: datetime!(2026-08-10 09:30 UTC),
                    duration_minutes: 30,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::SlotConflict));
    }

    #[tokio::test]
    async fn cancelled_appointment_cannot_be_rescheduled() {
        let (service, provider) = monday_morning_service().await;
        let appointment = service
            .create_appointment(booking(provider.id, datetime!(2026-08-10 10:00 UTC), 30))
            .await
            .unwrap();
        service.cancel_appointment(appointment.id).await.unwrap();

        let err = service
            .reschedule_appointment(
                appointment.id,
                RescheduleRequest {
                    start_time: datetime!(2026-08-10 11:00 UTC),
                    duration_minutes: 30,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn cancelled_appointment_cannot_be_confirmed() {
        let (service, provider) = monday_morning_service().await;
        let appointment = service
            .create_appointment(booking(provider.id, datetime!(2026-08-10 10:00 UTC), 30))
            .await
            .unwrap();
        service.cancel_appointment(appointment.id).await.unwrap();

        let err = service.confirm_appointment(appointment.id).await.unwrap_err();
        assert!(matches!(
            err,
            SchedulingError::InvalidTransition {
                from: AppointmentStatus::Cancelled,
                to: AppointmentStatus::Confirmed,
            }
        ));
    }

    #[tokio::test]
    async fn completion_requires_confirmation_first() {
        let (service, provider) = monday_morning_service().await;
        let appointment = service
            .create_appointment(booking(provider.id, datetime!(2026-08-10 10:00 UTC), 30))
            .await
            .unwrap();

        let err = service.complete_appointment(appointment.id).await.unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidTransition { .. }));

        service.confirm_appointment(appointment.id).await.unwrap();
        let done = service.complete_appointment(appointment.id).await.unwrap();
        assert_eq!(done.status, AppointmentStatus::Completed);
    }

    #[tokio::test]
    async fn unknown_appointment_is_not_found() {
        let (service, _) = monday_morning_service().await;
        let err = service.confirm_appointment(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, SchedulingError::NotFound("appointment")));
    }

    #[tokio::test]
    async fn replace_availability_rejects_overlapping_windows() {
        let (service, provider) = monday_morning_service().await;
        let err = service
            .replace_availability(
                provider.id,
                vec![
                    NewAvailabilityWindow {
                        day_of_week: 1,
                        start_time: time!(09:00),
                        end_time: time!(12:00),
                    },
                    NewAvailabilityWindow {
                        day_of_week: 1,
                        start_time: time!(11:00),
                        end_time: time!(14:00),
                    },
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn replace_availability_rejects_inverted_window() {
        let (service, provider) = monday_morning_service().await;
        let err = service
            .replace_availability(
                provider.id,
                vec![NewAvailabilityWindow {
                    day_of_week: 1,
                    start_time: time!(12:00),
                    end_time: time!(09:00),
                }],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn replace_availability_allows_same_hours_on_different_days() {
        let (service, provider) = monday_morning_service().await;
        let replaced = service
            .replace_availability(
                provider.id,
                vec![
                    NewAvailabilityWindow {
                        day_of_week: 1,
                        start_time: time!(09:00),
                        end_time: time!(12:00),
                    },
                    NewAvailabilityWindow {
                        day_of_week: 2,
                        start_time: time!(09:00),
                        end_time: time!(12:00),
                    },
                ],
            )
            .await
            .unwrap();
        assert_eq!(replaced.len(), 2);
    }

    #[tokio::test]
    async fn lifecycle_transitions_publish_events() {
        let (service, provider) = monday_morning_service().await;
        let mut events = service.events.subscribe();

        let appointment = service
            .create_appointment(booking(provider.id, datetime!(2026-08-10 10:00 UTC), 30))
            .await
            .unwrap();
        service.cancel_appointment(appointment.id).await.unwrap();

        assert!(matches!(
            events.recv().await.unwrap(),
            AppointmentEvent::Created(_)
        ));
        match events.recv().await.unwrap() {
            AppointmentEvent::Cancelled(cancelled) => assert_eq!(cancelled.id, appointment.id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    /// Ledger wrapper that fails the first read with a transient store
    /// error, to exercise the read-only retry path.
    struct FlakyLedger {
        inner: InMemoryBookingLedger,
        fail_next_read: AtomicBool,
    }

    impl FlakyLedger {
        fn new() -> Self {
            Self {
                inner: InMemoryBookingLedger::new(),
                fail_next_read: AtomicBool::new(true),
            }
        }
    }

    impl BookingLedger for FlakyLedger {
        async fn get(&self, id: Uuid) -> Result<Appointment, LedgerError> {
            self.inner.get(id).await
        }

        async fn find_overlapping(
            &self,
            provider_id: Uuid,
            range: TimeRange,
            exclude: Option<Uuid>,
        ) -> Result<Vec<Appointment>, LedgerError> {
            if self.fail_next_read.swap(false, Ordering::SeqCst) {
                return Err(LedgerError::Store(DatabaseError::Sqlx(
                    sqlx::Error::PoolTimedOut,
                )));
            }
            self.inner.find_overlapping(provider_id, range, exclude).await
        }

        async fn insert(
            &self,
            new: &NewAppointment,
            conflict_window: TimeRange,
        ) -> Result<Appointment, LedgerError> {
            self.inner.insert(new, conflict_window).await
        }

        async fn reschedule(
            &self,
            id: Uuid,
            new_start: OffsetDateTime,
            new_duration_minutes: i32,
            conflict_window: TimeRange,
        ) -> Result<Appointment, LedgerError> {
            self.inner
                .reschedule(id, new_start, new_duration_minutes, conflict_window)
                .await
        }

        async fn update_status(
            &self,
            id: Uuid,
            status: AppointmentStatus,
        ) -> Result<Appointment, LedgerError> {
            self.inner.update_status(id, status).await
        }
    }

    #[tokio::test]
    async fn slot_listing_retries_one_transient_store_failure() {
        let availability = InMemoryAvailabilityStore::new();
        let provider = availability.add_provider("Test Provider", true);
        let service = SchedulingService::new(
            FlakyLedger::new(),
            availability,
            ConflictResolver::new(),
            EventPublisher::new(16),
        );
        service
            .replace_availability(
                provider.id,
                vec![NewAvailabilityWindow {
                    day_of_week: 1,
                    start_time: time!(09:00),
                    end_time: time!(12:00),
                }],
            )
            .await
            .unwrap();

        let slots = service.list_available_slots(provider.id, MONDAY).await.unwrap();
        assert_eq!(slots.len(), 6);
    }
}
