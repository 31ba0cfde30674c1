use sqlx::types::Uuid;
use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;

use crate::db::models::{Appointment, AppointmentStatus, NewAppointment};
use crate::db::DatabaseError;
use crate::scheduling::conflict::TimeRange;
use crate::scheduling::ledger::{BookingLedger, LedgerError};

/// Postgres-backed booking ledger. Writes for one provider's calendar are
/// serialized by a row lock on the provider, so the overlap check and the
/// insert/update that follows commit as one atomic unit. A transaction that
/// errors out is rolled back on drop and leaves no partial state.
pub struct PgBookingLedger {
    pool: PgPool,
}

impl PgBookingLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_provider(
        tx: &mut Transaction<'_, Postgres>,
        provider_id: Uuid,
    ) -> Result<(), LedgerError> {
        let row = sqlx::query("SELECT id FROM providers WHERE id = $1 FOR UPDATE")
            .bind(provider_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(DatabaseError::from)?;
        if row.is_none() {
            return Err(LedgerError::NotFound);
        }
        Ok(())
    }

    async fn has_clash(
        tx: &mut Transaction<'_, Postgres>,
        provider_id: Uuid,
        window: TimeRange,
        exclude: Option<Uuid>,
    ) -> Result<bool, LedgerError> {
        let clash = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT 1 FROM appointments
            WHERE provider_id = $1
              AND status <> 'cancelled'
              AND start_time < $3
              AND start_time + make_interval(mins => duration_minutes) > $2
              AND ($4::uuid IS NULL OR id <> $4)
            LIMIT 1
            "#,
        )
        .bind(provider_id)
        .bind(window.start)
        .bind(window.end)
        .bind(exclude)
        .fetch_optional(&mut **tx)
        .await
        .map_err(DatabaseError::from)?;
        Ok(clash.is_some())
    }
}

impl BookingLedger for PgBookingLedger {
    async fn get(&self, id: Uuid) -> Result<Appointment, LedgerError> {
        sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?
            .ok_or(LedgerError::NotFound)
    }

    async fn find_overlapping(
        &self,
        provider_id: Uuid,
        range: TimeRange,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Appointment>, LedgerError> {
        let appointments = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT * FROM appointments
            WHERE provider_id = $1
              AND status <> 'cancelled'
              AND start_time < $3
              AND start_time + make_interval(mins => duration_minutes) > $2
              AND ($4::uuid IS NULL OR id <> $4)
            ORDER BY start_time
            "#,
        )
        .bind(provider_id)
        .bind(range.start)
        .bind(range.end)
        .bind(exclude)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(appointments)
    }

    async fn insert(
        &self,
        new: &NewAppointment,
        conflict_window: TimeRange,
    ) -> Result<Appointment, LedgerError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        Self::lock_provider(&mut tx, new.provider_id).await?;
        if Self::has_clash(&mut tx, new.provider_id, conflict_window, None).await? {
            return Err(LedgerError::Conflict);
        }

        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO appointments
                (provider_id, customer_id, service_refs, start_time, duration_minutes, status, total_price_cents)
            VALUES ($1, $2, $3, $4, $5, 'pending', $6)
            RETURNING *
            "#,
        )
        .bind(new.provider_id)
        .bind(new.customer_id)
        .bind(&new.service_refs)
        .bind(new.start_time)
        .bind(new.duration_minutes)
        .bind(new.total_price_cents)
        .fetch_one(&mut *tx)
        .await
        .map_err(DatabaseError::from)?;

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(appointment)
    }

    async fn reschedule(
        &self,
        id: Uuid,
        new_start: OffsetDateTime,
        new_duration_minutes: i32,
        conflict_window: TimeRange,
    ) -> Result<Appointment, LedgerError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        let current =
            sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(DatabaseError::from)?
                .ok_or(LedgerError::NotFound)?;

        Self::lock_provider(&mut tx, current.provider_id).await?;
        if Self::has_clash(&mut tx, current.provider_id, conflict_window, Some(id)).await? {
            return Err(LedgerError::Conflict);
        }

        let updated = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments
            SET start_time = $2, duration_minutes = $3, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(new_start)
        .bind(new_duration_minutes)
        .fetch_one(&mut *tx)
        .await
        .map_err(DatabaseError::from)?;

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(updated)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, LedgerError> {
        sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments
            SET status = $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?
        .ok_or(LedgerError::NotFound)
    }
}
