/// Company model and database operations
///
/// Companies scope users, challenges, rewards and the leaderboard. New users
/// are attached to the company whose `domain` matches their email domain.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE companies (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     domain VARCHAR(255) NOT NULL UNIQUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Company owning users, challenges and rewards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,

    /// Email domain, stored lowercase (e.g. "acme.com")
    pub domain: String,

    pub created_at: DateTime<Utc>,
}

/// Input for creating a company
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCompany {
    pub name: String,
    pub domain: String,
}

/// Extracts the lowercase domain part of an email address
///
/// Returns None when the address has no `@` or an empty domain.
///
/// ```
/// use ecocommute_shared::models::company::email_domain;
///
/// assert_eq!(email_domain("Ana@Acme.COM").as_deref(), Some("acme.com"));
/// assert_eq!(email_domain("no-at-sign"), None);
/// ```
pub fn email_domain(email: &str) -> Option<String> {
    let (_, domain) = email.rsplit_once('@')?;
    let domain = domain.trim();
    if domain.is_empty() {
        None
    } else {
        Some(domain.to_ascii_lowercase())
    }
}

impl Company {
    /// Creates a company
    ///
    /// # Errors
    ///
    /// Returns an error if the domain is already taken or the database fails
    pub async fn create(pool: &PgPool, data: CreateCompany) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (name, domain)
            VALUES ($1, LOWER($2))
            RETURNING id, name, domain, created_at
            "#,
        )
        .bind(data.name)
        .bind(data.domain)
        .fetch_one(pool)
        .await
    }

    /// Finds a company by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Company>(
            "SELECT id, name, domain, created_at FROM companies WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds a company by email domain
    pub async fn find_by_domain(pool: &PgPool, domain: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Company>(
            "SELECT id, name, domain, created_at FROM companies WHERE domain = LOWER($1)",
        )
        .bind(domain)
        .fetch_optional(pool)
        .await
    }
}
