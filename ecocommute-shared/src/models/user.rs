/// User model and database operations
///
/// Users optionally belong to a company (solo users have none). The
/// `points_total` column is a cached balance: it only moves together with a
/// row in `points_transactions` (see [`crate::models::points`]).
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('user', 'admin');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     name VARCHAR(255),
///     company_id UUID REFERENCES companies(id) ON DELETE SET NULL,
///     points_total INTEGER NOT NULL DEFAULT 0,
///     streak_count INTEGER NOT NULL DEFAULT 0,
///     role user_role NOT NULL DEFAULT 'user',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use ecocommute_shared::models::user::{User, CreateUser, UserRole};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "rider@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: Some("Rider".to_string()),
///     company_id: None,
///     role: UserRole::User,
/// }).await?;
///
/// let found = User::find_by_email(&pool, "rider@example.com").await?;
/// assert!(found.is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Account role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular commuter
    #[default]
    User,

    /// May create challenges and act on behalf of other users
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

/// User account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address, unique across all users
    pub email: String,

    /// Argon2id password hash, never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Optional display name
    pub name: Option<String>,

    /// Company the user commutes for (None for solo users)
    pub company_id: Option<Uuid>,

    /// Cached points balance, derived from the ledger
    pub points_total: i32,

    /// Consecutive active weeks
    pub streak_count: i32,

    /// Account role
    pub role: UserRole,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    pub name: Option<String>,
    pub company_id: Option<Uuid>,

    #[serde(default)]
    pub role: UserRole,
}

/// Input for updating a user's profile
///
/// Only non-None fields are updated. The points balance is deliberately
/// absent: it moves through the ledger only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    /// New display name (use Some(None) to clear)
    pub name: Option<Option<String>>,

    /// New company (use Some(None) to leave the company)
    pub company_id: Option<Option<Uuid>>,

    pub streak_count: Option<i32>,
    pub role: Option<UserRole>,
}

const COLUMNS: &str = "id, email, password_hash, name, company_id, points_total, streak_count, \
     role, created_at, updated_at";

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns an error if the email already exists or the database fails
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (email, password_hash, name, company_id, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.name)
            .bind(data.company_id)
            .bind(data.role)
            .fetch_one(pool)
            .await
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Updates profile fields of an existing user
    ///
    /// Returns the updated user, or None if the user doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.company_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", company_id = ${}", bind_count));
        }
        if data.streak_count.is_some() {
            bind_count += 1;
            query.push_str(&format!(", streak_count = ${}", bind_count));
        }
        if data.role.is_some() {
            bind_count += 1;
            query.push_str(&format!(", role = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(company_id) = data.company_id {
            q = q.bind(company_id);
        }
        if let Some(streak_count) = data.streak_count {
            q = q.bind(streak_count);
        }
        if let Some(role) = data.role {
            q = q.bind(role);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes a user by ID
    ///
    /// Cascades to the user's logs, ledger, participations and redemptions.
    /// Not used by the commute flow.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Top users of a company by points balance
    pub async fn leaderboard(
        pool: &PgPool,
        company_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {COLUMNS}
            FROM users
            WHERE company_id = $1
            ORDER BY points_total DESC, created_at ASC
            LIMIT $2
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(company_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
