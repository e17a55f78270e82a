/// Points ledger model and database operations
///
/// `points_transactions` is append-only and is the source of truth for a
/// user's balance. `users.points_total` is a cache that is only ever moved in
/// the same SQL transaction that inserts the ledger row.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE points_transactions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     source TEXT NOT NULL,
///     points INTEGER NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use ecocommute_shared::models::points::PointsTransaction;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let entry = PointsTransaction::record(&pool, user_id, "Weekly commute: cycle", 100).await?;
/// assert_eq!(entry.points, 100);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// One signed change to a user's points balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PointsTransaction {
    pub id: Uuid,
    pub user_id: Uuid,

    /// Free-text reason, e.g. "Completed challenge: Bike Week"
    pub source: String,

    /// Signed amount; negative for redemptions
    pub points: i32,

    pub created_at: DateTime<Utc>,
}

impl PointsTransaction {
    /// Appends a ledger row and moves the cached balance atomically
    ///
    /// # Errors
    ///
    /// Returns `RowNotFound` if the user doesn't exist (nothing is written),
    /// or any database error.
    pub async fn record(
        pool: &PgPool,
        user_id: Uuid,
        source: &str,
        points: i32,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let entry = Self::record_in(&mut *tx, user_id, source, points).await?;
        tx.commit().await?;

        Ok(entry)
    }

    /// Ledger insert + balance update on an open connection
    ///
    /// Callers own the surrounding transaction.
    pub(crate) async fn record_in(
        conn: &mut PgConnection,
        user_id: Uuid,
        source: &str,
        points: i32,
    ) -> Result<Self, sqlx::Error> {
        let updated = sqlx::query(
            "UPDATE users SET points_total = points_total + $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(points)
        .execute(&mut *conn)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        sqlx::query_as::<_, PointsTransaction>(
            r#"
            INSERT INTO points_transactions (user_id, source, points)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, source, points, created_at
            "#,
        )
        .bind(user_id)
        .bind(source)
        .bind(points)
        .fetch_one(&mut *conn)
        .await
    }

    /// Lists a user's ledger, newest first
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PointsTransaction>(
            r#"
            SELECT id, user_id, source, points, created_at
            FROM points_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Recomputes a user's balance from the ledger
    pub async fn ledger_balance(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (balance,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(points), 0)::BIGINT FROM points_transactions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(balance)
    }
}
