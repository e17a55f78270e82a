/// Database models for EcoCommute
///
/// Each model carries its row type, its create/update inputs and the sqlx
/// queries used by the PostgreSQL storage backend.
///
/// # Models
///
/// - `user`: User accounts, roles and cached points balance
/// - `company`: Companies and email-domain matching
/// - `commute_log`: Weekly commute aggregates and the commute type enum
/// - `points`: Append-only points ledger
/// - `challenge`: Challenges and participant progress
/// - `reward`: Rewards and redemptions
///
/// # Example
///
/// ```no_run
/// use ecocommute_shared::models::user::{User, CreateUser, UserRole};
/// use ecocommute_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     email: "rider@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: None,
///     company_id: None,
///     role: UserRole::User,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod challenge;
pub mod commute_log;
pub mod company;
pub mod points;
pub mod reward;
pub mod user;
