use sqlx::types::Uuid;
use sqlx::PgPool;

use crate::db::models::{AvailabilityWindow, NewAvailabilityWindow, Provider};
use crate::db::DatabaseError;
use crate::scheduling::ledger::{AvailabilityStore, LedgerError};

/// Postgres-backed availability store. Replacing a provider's schedule is a
/// delete-all-then-insert inside one transaction.
pub struct PgAvailabilityStore {
    pool: PgPool,
}

impl PgAvailabilityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl AvailabilityStore for PgAvailabilityStore {
    async fn provider(&self, provider_id: Uuid) -> Result<Provider, LedgerError> {
        sqlx::query_as::<_, Provider>("SELECT * FROM providers WHERE id = $1")
            .bind(provider_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?
            .ok_or(LedgerError::NotFound)
    }

    async fn windows_for_day(
        &self,
        provider_id: Uuid,
        day_of_week: i16,
    ) -> Result<Vec<AvailabilityWindow>, LedgerError> {
        let windows = sqlx::query_as::<_, AvailabilityWindow>(
            r#"
            SELECT * FROM availability_windows
            WHERE provider_id = $1 AND day_of_week = $2
            ORDER BY start_time
            "#,
        )
        .bind(provider_id)
        .bind(day_of_week)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(windows)
    }

    async fn replace_windows(
        &self,
        provider_id: Uuid,
        windows: &[NewAvailabilityWindow],
    ) -> Result<Vec<AvailabilityWindow>, LedgerError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        let provider = sqlx::query("SELECT id FROM providers WHERE id = $1 FOR UPDATE")
            .bind(provider_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;
        if provider.is_none() {
            return Err(LedgerError::NotFound);
        }

        sqlx::query("DELETE FROM availability_windows WHERE provider_id = $1")
            .bind(provider_id)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;

        let mut stored = Vec::with_capacity(windows.len());
        for window in windows {
            let inserted = sqlx::query_as::<_, AvailabilityWindow>(
                r#"
                INSERT INTO availability_windows (provider_id, day_of_week, start_time, end_time)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            )
            .bind(provider_id)
            .bind(window.day_of_week)
            .bind(window.start_time)
            .bind(window.end_time)
            .fetch_one(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;
            stored.push(inserted);
        }

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(stored)
    }
}
