//! The overlap guard. `booking_locks` carries a Postgres exclusion
//! constraint (`merchant_id WITH =, staff_id WITH =, tstzrange(start_at,
//! end_at) WITH &&`), so a conflicting insert fails at the database no
//! matter how requests interleave. This module is the single place where
//! that constraint violation becomes a domain error.

use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DbBackend, DbErr, RuntimeErr, Statement};
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::time::TimeSlot;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LockRow {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub staff_id: i32,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub booking_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl LockRow {
    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.start_at, self.end_at).expect("lock row range invariant")
    }
}

/// Reserve `[start, end)` for the staff member. The insert races against
/// concurrent writers; exactly one wins, the rest get `BookingOverlap`.
pub async fn acquire<C: ConnectionTrait>(
    conn: &C,
    merchant_id: Uuid,
    staff_id: i32,
    slot: TimeSlot,
) -> AppResult<Uuid> {
    let lock_id = Uuid::new_v4();
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        r#"
        INSERT INTO booking_locks (id, merchant_id, staff_id, start_at, end_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
        [
            lock_id.into(),
            merchant_id.into(),
            staff_id.into(),
            slot.start().into(),
            slot.end().into(),
        ],
    );

    match conn.execute(stmt).await {
        Ok(_) => Ok(lock_id),
        Err(err) if is_exclusion_violation(&err) => Err(AppError::BookingOverlap {
            staff_id,
            start: slot.start(),
            end: slot.end(),
        }),
        Err(err) => Err(err.into()),
    }
}

pub async fn link_to_booking<C: ConnectionTrait>(
    conn: &C,
    lock_id: Uuid,
    booking_id: Uuid,
) -> AppResult<()> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        "UPDATE booking_locks SET booking_id = $2 WHERE id = $1",
        [lock_id.into(), booking_id.into()],
    );
    conn.execute(stmt).await?;
    Ok(())
}

/// Drop the reservation held for a booking, freeing the window for others.
/// Runs in the same transaction as the booking status change.
pub async fn delete_for_booking<C: ConnectionTrait>(
    conn: &C,
    merchant_id: Uuid,
    booking_id: Uuid,
) -> AppResult<()> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        "DELETE FROM booking_locks WHERE merchant_id = $1 AND booking_id = $2",
        [merchant_id.into(), booking_id.into()],
    );
    conn.execute(stmt).await?;
    Ok(())
}

/// Locks intersecting the window, ordered by start. Read-only helper for the
/// availability engine; the result is an advisory snapshot.
pub async fn find_overlapping(
    pool: &DbPool,
    merchant_id: Uuid,
    staff_id: i32,
    window: TimeSlot,
) -> AppResult<Vec<LockRow>> {
    let rows = sqlx::query_as::<_, LockRow>(
        r#"
        SELECT id, merchant_id, staff_id, start_at, end_at, booking_id, created_at
        FROM booking_locks
        WHERE merchant_id = $1 AND staff_id = $2 AND start_at < $4 AND end_at > $3
        ORDER BY start_at
        "#,
    )
    .bind(merchant_id)
    .bind(staff_id)
    .bind(window.start())
    .bind(window.end())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// SQLSTATE 23P01 (exclusion_violation). Everything else propagates as a
/// storage error.
fn is_exclusion_violation(err: &DbErr) -> bool {
    let sqlx_err = match err {
        DbErr::Exec(RuntimeErr::SqlxError(e)) | DbErr::Query(RuntimeErr::SqlxError(e)) => e,
        _ => return false,
    };
    match sqlx_err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23P01"),
        _ => false,
    }
}
