/// Storage abstraction
///
/// Every read and write the application performs goes through the
/// [`Storage`] trait. Two implementations exist:
///
/// - [`MemoryStorage`]: tables in process memory behind one lock; used by
///   tests and for running the API without a database
/// - [`PgStorage`]: PostgreSQL via sqlx, delegating to the queries in
///   [`crate::models`]
///
/// The backend is chosen once at startup and handed to the HTTP layer as an
/// `Arc<dyn Storage>`.
///
/// # Atomicity
///
/// `award_points`, `advance_participation` and `redeem_reward` move a user's
/// cached balance together with the ledger row in a single atomic step in
/// both backends. Participation progress is incremented in place, so
/// concurrent steps for the same participation all count. Commute-log merges
/// are a plain read-then-write: two concurrent submissions for the same week
/// resolve as last write wins.
///
/// # Example
///
/// ```
/// use ecocommute_shared::models::user::{CreateUser, UserRole};
/// use ecocommute_shared::storage::{MemoryStorage, Storage};
///
/// # async fn example() -> Result<(), ecocommute_shared::storage::StorageError> {
/// let storage = MemoryStorage::new();
/// let user = storage.create_user(CreateUser {
///     email: "rider@example.com".to_string(),
///     password_hash: String::new(),
///     name: None,
///     company_id: None,
///     role: UserRole::User,
/// }).await?;
///
/// storage.award_points(user.id, "Welcome bonus", 10).await?;
/// let user = storage.get_user(user.id).await?.unwrap();
/// assert_eq!(user.points_total, 10);
/// # Ok(())
/// # }
/// ```

mod memory;
mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{
    challenge::{
        ActiveParticipation, Challenge, ChallengeParticipant, CreateChallenge, ProgressStep,
    },
    commute_log::{CommuteLog, CreateCommuteLog, MergeCommuteLog},
    company::{Company, CreateCompany},
    points::PointsTransaction,
    reward::{CreateReward, Redemption, Reward},
    user::{CreateUser, UpdateUser, User},
};

/// Storage error type
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Referenced entity doesn't exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Uniqueness or availability conflict
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A debit would exceed the user's balance
    #[error("Insufficient points: requires {required}, has {available}")]
    InsufficientPoints { required: i32, available: i32 },

    /// A credit would push the balance past `i32::MAX`
    #[error("Points balance limit reached")]
    BalanceOverflow,

    /// Backend failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage result type alias
pub type StorageResult<T> = Result<T, StorageError>;

/// CRUD accessors over the EcoCommute schema
#[async_trait]
pub trait Storage: Send + Sync {
    // Users

    /// Creates a user; `Conflict` if the email is taken
    async fn create_user(&self, data: CreateUser) -> StorageResult<User>;

    async fn get_user(&self, id: Uuid) -> StorageResult<Option<User>>;

    /// Case-insensitive email lookup
    async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>>;

    /// Updates profile fields; None if the user doesn't exist
    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StorageResult<Option<User>>;

    async fn delete_user(&self, id: Uuid) -> StorageResult<bool>;

    /// Users of a company ordered by points, highest first
    async fn leaderboard(&self, company_id: Uuid, limit: i64) -> StorageResult<Vec<User>>;

    // Companies

    /// Creates a company; `Conflict` if the domain is taken
    async fn create_company(&self, data: CreateCompany) -> StorageResult<Company>;

    async fn get_company(&self, id: Uuid) -> StorageResult<Option<Company>>;

    async fn get_company_by_domain(&self, domain: &str) -> StorageResult<Option<Company>>;

    // Commute logs

    async fn create_commute_log(&self, data: CreateCommuteLog) -> StorageResult<CommuteLog>;

    /// Most recently created log for (user, week_start)
    async fn find_commute_log_for_week(
        &self,
        user_id: Uuid,
        week_start: NaiveDate,
    ) -> StorageResult<Option<CommuteLog>>;

    /// Writes a merge result back; `NotFound` if the log vanished
    async fn update_commute_log(&self, id: Uuid, data: MergeCommuteLog)
        -> StorageResult<CommuteLog>;

    /// Logs whose week starts on or after `since`, newest week first
    async fn list_commute_logs_since(
        &self,
        user_id: Uuid,
        since: NaiveDate,
    ) -> StorageResult<Vec<CommuteLog>>;

    async fn total_co2_saved(&self, user_id: Uuid) -> StorageResult<i64>;

    // Points ledger

    /// Appends a ledger row and moves the cached balance atomically
    async fn award_points(
        &self,
        user_id: Uuid,
        source: &str,
        points: i32,
    ) -> StorageResult<PointsTransaction>;

    /// Ledger rows, newest first
    async fn list_points_transactions(&self, user_id: Uuid)
        -> StorageResult<Vec<PointsTransaction>>;

    // Challenges

    async fn create_challenge(&self, data: CreateChallenge) -> StorageResult<Challenge>;

    async fn get_challenge(&self, id: Uuid) -> StorageResult<Option<Challenge>>;

    /// Global challenges plus those of `company_id`
    async fn list_challenges(&self, company_id: Option<Uuid>) -> StorageResult<Vec<Challenge>>;

    /// Enrolls a user; `Conflict` if already enrolled
    async fn join_challenge(
        &self,
        challenge_id: Uuid,
        user_id: Uuid,
    ) -> StorageResult<ChallengeParticipant>;

    async fn list_participations(&self, user_id: Uuid)
        -> StorageResult<Vec<ChallengeParticipant>>;

    /// Non-completed participations joined with their challenges
    async fn list_active_participations(
        &self,
        user_id: Uuid,
    ) -> StorageResult<Vec<ActiveParticipation>>;

    /// Applies one step to a not-yet-completed participation
    ///
    /// Progress grows by `step.amount`, capped at `step.goal`. Reaching the
    /// goal marks the participation completed and records `step.reward` on
    /// the ledger in the same atomic write; if the reward can't be recorded
    /// nothing changes. Returns None when the participation was already
    /// completed (or is gone), so a completion is paid at most once.
    async fn advance_participation(
        &self,
        participant_id: Uuid,
        step: &ProgressStep,
    ) -> StorageResult<Option<ChallengeParticipant>>;

    async fn count_completed_challenges(&self, user_id: Uuid) -> StorageResult<i64>;

    // Rewards

    async fn create_reward(&self, data: CreateReward) -> StorageResult<Reward>;

    async fn get_reward(&self, id: Uuid) -> StorageResult<Option<Reward>>;

    /// Global rewards plus those of `company_id`
    async fn list_rewards(&self, company_id: Option<Uuid>) -> StorageResult<Vec<Reward>>;

    /// Writes redemption, negative ledger row and balance deduction atomically
    async fn redeem_reward(&self, user_id: Uuid, reward_id: Uuid) -> StorageResult<Redemption>;

    async fn list_redemptions(&self, user_id: Uuid) -> StorageResult<Vec<Redemption>>;

    // Health

    /// Verifies the backend is reachable
    async fn ping(&self) -> StorageResult<()>;

    /// Backend name for health reporting
    fn backend_name(&self) -> &'static str;
}
