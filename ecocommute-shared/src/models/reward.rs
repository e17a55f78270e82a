/// Reward and redemption models
///
/// Rewards are bought with points. A redemption is written in one SQL
/// transaction together with its negative ledger entry and the balance
/// deduction, so a crash can never leave a redemption without its charge.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE rewards (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     company_id UUID REFERENCES companies(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     cost_points INTEGER NOT NULL CHECK (cost_points >= 0),
///     quantity_limit INTEGER,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE redemptions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     reward_id UUID NOT NULL REFERENCES rewards(id) ON DELETE CASCADE,
///     redeemed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::points::PointsTransaction;

/// Something a user can spend points on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reward {
    pub id: Uuid,

    /// Owning company (None = available to every user)
    pub company_id: Option<Uuid>,

    pub title: String,
    pub description: Option<String>,
    pub cost_points: i32,

    /// Maximum number of redemptions across all users (None = unlimited)
    pub quantity_limit: Option<i32>,

    pub created_at: DateTime<Utc>,
}

impl Reward {
    /// Whether a user of `company_id` can see this reward
    pub fn is_visible_to(&self, company_id: Option<Uuid>) -> bool {
        match self.company_id {
            None => true,
            Some(owner) => company_id == Some(owner),
        }
    }
}

/// Input for creating a reward
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReward {
    pub company_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub cost_points: i32,
    pub quantity_limit: Option<i32>,
}

/// A reward bought by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Redemption {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reward_id: Uuid,
    pub redeemed_at: DateTime<Utc>,
}

/// Why a redemption was refused
#[derive(Debug, thiserror::Error)]
pub enum RedeemError {
    /// User doesn't exist
    #[error("User not found")]
    UserNotFound,

    /// Reward doesn't exist or belongs to another company
    #[error("Reward not found")]
    RewardNotFound,

    /// Balance is lower than the reward cost
    #[error("Insufficient points: requires {required}, has {available}")]
    InsufficientPoints { required: i32, available: i32 },

    /// quantity_limit reached
    #[error("Reward is no longer available")]
    SoldOut,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

const REWARD_COLUMNS: &str =
    "id, company_id, title, description, cost_points, quantity_limit, created_at";

impl Reward {
    /// Creates a reward
    pub async fn create(pool: &PgPool, data: CreateReward) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO rewards (company_id, title, description, cost_points, quantity_limit)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {REWARD_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Reward>(&query)
            .bind(data.company_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.cost_points)
            .bind(data.quantity_limit)
            .fetch_one(pool)
            .await
    }

    /// Finds a reward by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {REWARD_COLUMNS} FROM rewards WHERE id = $1");

        sqlx::query_as::<_, Reward>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists global rewards plus those of `company_id`, cheapest first
    pub async fn list_visible(
        pool: &PgPool,
        company_id: Option<Uuid>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {REWARD_COLUMNS}
            FROM rewards
            WHERE company_id IS NULL OR company_id = $1
            ORDER BY cost_points ASC, created_at ASC
            "#
        );

        sqlx::query_as::<_, Reward>(&query)
            .bind(company_id)
            .fetch_all(pool)
            .await
    }
}

impl Redemption {
    /// Redeems a reward for a user
    ///
    /// Locks the user and reward rows, checks visibility, balance and
    /// quantity limit, then writes the redemption, the negative ledger entry
    /// (`"Redeemed reward: {title}"`) and the balance deduction in one
    /// transaction.
    pub async fn redeem(pool: &PgPool, user_id: Uuid, reward_id: Uuid) -> Result<Self, RedeemError> {
        let mut tx = pool.begin().await?;

        let user: Option<(i32, Option<Uuid>)> =
            sqlx::query_as("SELECT points_total, company_id FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let (available, company_id) = user.ok_or(RedeemError::UserNotFound)?;

        let query = format!("SELECT {REWARD_COLUMNS} FROM rewards WHERE id = $1 FOR UPDATE");
        let reward = sqlx::query_as::<_, Reward>(&query)
            .bind(reward_id)
            .fetch_optional(&mut *tx)
            .await?
            .filter(|reward| reward.is_visible_to(company_id))
            .ok_or(RedeemError::RewardNotFound)?;

        if let Some(limit) = reward.quantity_limit {
            let (redeemed,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM redemptions WHERE reward_id = $1")
                    .bind(reward_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if redeemed >= i64::from(limit) {
                return Err(RedeemError::SoldOut);
            }
        }

        if available < reward.cost_points {
            return Err(RedeemError::InsufficientPoints {
                required: reward.cost_points,
                available,
            });
        }

        let redemption = sqlx::query_as::<_, Redemption>(
            r#"
            INSERT INTO redemptions (user_id, reward_id)
            VALUES ($1, $2)
            RETURNING id, user_id, reward_id, redeemed_at
            "#,
        )
        .bind(user_id)
        .bind(reward_id)
        .fetch_one(&mut *tx)
        .await?;

        let source = format!("Redeemed reward: {}", reward.title);
        PointsTransaction::record_in(&mut *tx, user_id, &source, -reward.cost_points).await?;

        tx.commit().await?;
        Ok(redemption)
    }

    /// Lists a user's redemptions, newest first
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Redemption>(
            r#"
            SELECT id, user_id, reward_id, redeemed_at
            FROM redemptions
            WHERE user_id = $1
            ORDER BY redeemed_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
