use serde::Serialize;
use time::{Date, Duration, OffsetDateTime, Time};

use crate::db::models::AvailabilityWindow;
use crate::scheduling::conflict::TimeRange;

/// The minimum schedulable unit; slots are generated on this granularity.
pub const SLOT_INCREMENT_MINUTES: i64 = 30;

/// A candidate appointment start derived from availability. Never persisted;
/// recomputed on every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub start_time: OffsetDateTime,
    pub available: bool,
}

/// Ordered, finite sequence of candidate slot starts for one window on one
/// calendar date. The window close is an exclusive bound on slot start: a
/// slot must fit entirely before closing time.
#[derive(Debug)]
pub struct SlotStarts {
    next: OffsetDateTime,
    close: OffsetDateTime,
    increment: Duration,
}

impl Iterator for SlotStarts {
    type Item = OffsetDateTime;

    fn next(&mut self) -> Option<OffsetDateTime> {
        if self.next + self.increment > self.close {
            return None;
        }
        let start = self.next;
        self.next = start + self.increment;
        Some(start)
    }
}

pub fn slot_starts(window: &AvailabilityWindow, date: Date) -> SlotStarts {
    slot_starts_with_increment(window, date, Duration::minutes(SLOT_INCREMENT_MINUTES))
}

pub fn slot_starts_with_increment(
    window: &AvailabilityWindow,
    date: Date,
    increment: Duration,
) -> SlotStarts {
    let close = at(date, window.end_time);
    if i16::from(date.weekday().number_days_from_sunday()) != window.day_of_week {
        // Weekday mismatch: the sequence is empty.
        return SlotStarts {
            next: close,
            close,
            increment,
        };
    }
    SlotStarts {
        next: at(date, window.start_time),
        close,
        increment,
    }
}

/// The concrete interval a window covers on a given date.
pub fn window_range(window: &AvailabilityWindow, date: Date) -> TimeRange {
    TimeRange::new(at(date, window.start_time), at(date, window.end_time))
}

fn at(date: Date, time: Time) -> OffsetDateTime {
    date.with_time(time).assume_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Uuid;
    use time::macros::{date, datetime, time};

    fn window(day_of_week: i16, start: Time, end: Time) -> AvailabilityWindow {
        AvailabilityWindow {
            id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            day_of_week,
            start_time: start,
            end_time: end,
            created_at: datetime!(2026-08-01 00:00 UTC),
        }
    }

    #[test]
    fn three_hour_window_yields_six_slots() {
        // Monday 09:00-12:00; 12:00 itself is excluded because a slot may
        // not run past closing time.
        let w = window(1, time!(09:00), time!(12:00));
        let starts: Vec<_> = slot_starts(&w, date!(2026 - 08 - 10)).collect();
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
    }

    #[test]
    fn every_slot_fits_inside_the_window() {
        let w = window(1, time!(09:00), time!(12:00));
        let increment = Duration::minutes(SLOT_INCREMENT_MINUTES);
        for start in slot_starts(&w, date!(2026 - 08 - 10)) {
            assert!(start >= datetime!(2026-08-10 09:00 UTC));
            assert!(start + increment <= datetime!(2026-08-10 12:00 UTC));
        }
    }

    #[test]
    fn weekday_mismatch_is_empty() {
        // 2026-08-11 is a Tuesday; the window is for Monday.
        let w = window(1, time!(09:00), time!(12:00));
        assert_eq!(slot_starts(&w, date!(2026 - 08 - 11)).count(), 0);
    }

    #[test]
    fn partial_trailing_increment_is_dropped() {
        // 09:00-09:45 only fits one full 30-minute slot.
        let w = window(1, time!(09:00), time!(09:45));
        let starts: Vec<_> = slot_starts(&w, date!(2026 - 08 - 10)).collect();
        assert_eq!(starts, vec![datetime!(2026-08-10 09:00 UTC)]);
    }

    #[test]
    fn window_shorter_than_increment_is_empty() {
        let w = window(1, time!(09:00), time!(09:15));
        assert_eq!(slot_starts(&w, date!(2026 - 08 - 10)).count(), 0);
    }
}
