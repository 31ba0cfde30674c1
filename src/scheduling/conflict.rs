use sqlx::types::Uuid;
use time::{Duration, OffsetDateTime};

use crate::db::models::{Appointment, AppointmentStatus};

pub const DEFAULT_PRE_BUFFER_MINUTES: i64 = 30;
pub const DEFAULT_POST_BUFFER_MINUTES: i64 = 30;

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl TimeRange {
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Self {
        Self { start, end }
    }

    /// The raw interval an appointment occupies, without any buffer.
    pub fn for_appointment(start: OffsetDateTime, duration_minutes: i32) -> Self {
        Self {
            start,
            end: start + Duration::minutes(i64::from(duration_minutes)),
        }
    }

    /// Intervals are half-open, so exact boundary touches do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Buffered free/busy policy. The guard window around a candidate is
/// `[start - pre, start + duration + post)`: the pre-buffer absorbs a prior
/// appointment running long, the post-buffer gives the provider setup time
/// before the next one. Buffers are fixed and do not scale with duration.
#[derive(Debug, Clone, Copy)]
pub struct ConflictResolver {
    pre_buffer: Duration,
    post_buffer: Duration,
}

impl ConflictResolver {
    pub fn new() -> Self {
        Self::with_buffers(DEFAULT_PRE_BUFFER_MINUTES, DEFAULT_POST_BUFFER_MINUTES)
    }

    pub fn with_buffers(pre_minutes: i64, post_minutes: i64) -> Self {
        Self {
            pre_buffer: Duration::minutes(pre_minutes),
            post_buffer: Duration::minutes(post_minutes),
        }
    }

    pub fn guard_window(&self, start: OffsetDateTime, duration_minutes: i32) -> TimeRange {
        TimeRange::new(
            start - self.pre_buffer,
            start + Duration::minutes(i64::from(duration_minutes)) + self.post_buffer,
        )
    }

    /// Whether `appointment` blocks a candidate with the given guard window.
    /// Cancelled appointments never block; an appointment can be excluded so
    /// rescheduling does not conflict with its own row.
    pub fn blocks(&self, guard: &TimeRange, appointment: &Appointment, exclude: Option<Uuid>) -> bool {
        if appointment.status == AppointmentStatus::Cancelled {
            return false;
        }
        if exclude.is_some_and(|id| id == appointment.id) {
            return false;
        }
        TimeRange::for_appointment(appointment.start_time, appointment.duration_minutes).overlaps(guard)
    }

    pub fn is_free(&self, guard: &TimeRange, existing: &[Appointment], exclude: Option<Uuid>) -> bool {
        !existing.iter().any(|a| self.blocks(guard, a, exclude))
    }
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::new()
    }
}
