use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;

/// A service professional whose calendar is scheduled against. Identity is
/// managed upstream; this row only carries what the scheduling engine needs.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Provider {
    pub id: Uuid,
    pub display_name: String,
    /// Providers can switch bookings off entirely, independent of their
    /// weekly availability windows.
    pub accepting_bookings: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
