use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::{OffsetDateTime, Time};
use validator::Validate;

/// One recurring weekly availability window. Times are wall-clock with no
/// date component; `day_of_week` uses 0 = Sunday through 6 = Saturday.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub day_of_week: i16,
    pub start_time: Time,
    pub end_time: Time,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAvailabilityWindow {
    #[validate(range(min = 0, max = 6, message = "Day of week must be between 0 (Sunday) and 6 (Saturday)"))]
    pub day_of_week: i16,
    pub start_time: Time,
    pub end_time: Time,
}
