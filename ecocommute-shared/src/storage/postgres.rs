/// PostgreSQL storage backend
///
/// Thin adapter from [`Storage`] to the sqlx queries in [`crate::models`].
/// Constraint violations are translated into `StorageError` variants so the
/// HTTP layer never has to inspect driver errors.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Storage, StorageError, StorageResult};
use crate::models::{
    challenge::{
        ActiveParticipation, Challenge, ChallengeParticipant, CreateChallenge, ProgressStep,
    },
    commute_log::{CommuteLog, CreateCommuteLog, MergeCommuteLog},
    company::{Company, CreateCompany},
    points::PointsTransaction,
    reward::{CreateReward, RedeemError, Redemption, Reward},
    user::{CreateUser, UpdateUser, User},
};

/// Storage backed by a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for migrations and health checks
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// SQLSTATE raised when `points_total` leaves the INTEGER range
const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// Maps constraint violations onto storage errors
///
/// `missing` names the entity reported when a foreign key doesn't resolve.
fn classify(err: sqlx::Error, conflict: &str, missing: &'static str) -> StorageError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StorageError::Conflict(conflict.to_string());
        }
        if db_err.is_foreign_key_violation() {
            return StorageError::NotFound(missing);
        }
        if db_err.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE) {
            return StorageError::BalanceOverflow;
        }
    }
    StorageError::Database(err)
}

impl From<RedeemError> for StorageError {
    fn from(err: RedeemError) -> Self {
        match err {
            RedeemError::UserNotFound => StorageError::NotFound("User"),
            RedeemError::RewardNotFound => StorageError::NotFound("Reward"),
            RedeemError::SoldOut => {
                StorageError::Conflict("Reward is no longer available".to_string())
            }
            RedeemError::InsufficientPoints {
                required,
                available,
            } => StorageError::InsufficientPoints {
                required,
                available,
            },
            RedeemError::Database(e) => StorageError::Database(e),
        }
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn create_user(&self, data: CreateUser) -> StorageResult<User> {
        User::create(&self.pool, data)
            .await
            .map_err(|e| classify(e, "Email already exists", "Company"))
    }

    async fn get_user(&self, id: Uuid) -> StorageResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StorageResult<Option<User>> {
        User::update(&self.pool, id, data)
            .await
            .map_err(|e| classify(e, "Conflicting user update", "Company"))
    }

    async fn delete_user(&self, id: Uuid) -> StorageResult<bool> {
        Ok(User::delete(&self.pool, id).await?)
    }

    async fn leaderboard(&self, company_id: Uuid, limit: i64) -> StorageResult<Vec<User>> {
        Ok(User::leaderboard(&self.pool, company_id, limit).await?)
    }

    async fn create_company(&self, data: CreateCompany) -> StorageResult<Company> {
        Company::create(&self.pool, data)
            .await
            .map_err(|e| classify(e, "Domain already exists", "Company"))
    }

    async fn get_company(&self, id: Uuid) -> StorageResult<Option<Company>> {
        Ok(Company::find_by_id(&self.pool, id).await?)
    }

    async fn get_company_by_domain(&self, domain: &str) -> StorageResult<Option<Company>> {
        Ok(Company::find_by_domain(&self.pool, domain).await?)
    }

    async fn create_commute_log(&self, data: CreateCommuteLog) -> StorageResult<CommuteLog> {
        CommuteLog::create(&self.pool, data)
            .await
            .map_err(|e| classify(e, "Duplicate commute log", "User"))
    }

    async fn find_commute_log_for_week(
        &self,
        user_id: Uuid,
        week_start: NaiveDate,
    ) -> StorageResult<Option<CommuteLog>> {
        Ok(CommuteLog::find_latest_for_week(&self.pool, user_id, week_start).await?)
    }

    async fn update_commute_log(
        &self,
        id: Uuid,
        data: MergeCommuteLog,
    ) -> StorageResult<CommuteLog> {
        CommuteLog::apply_merge(&self.pool, id, data)
            .await?
            .ok_or(StorageError::NotFound("Commute log"))
    }

    async fn list_commute_logs_since(
        &self,
        user_id: Uuid,
        since: NaiveDate,
    ) -> StorageResult<Vec<CommuteLog>> {
        Ok(CommuteLog::list_since(&self.pool, user_id, since).await?)
    }

    async fn total_co2_saved(&self, user_id: Uuid) -> StorageResult<i64> {
        Ok(CommuteLog::total_co2_saved(&self.pool, user_id).await?)
    }

    async fn award_points(
        &self,
        user_id: Uuid,
        source: &str,
        points: i32,
    ) -> StorageResult<PointsTransaction> {
        PointsTransaction::record(&self.pool, user_id, source, points)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => StorageError::NotFound("User"),
                other => classify(other, "Ledger conflict", "User"),
            })
    }

    async fn list_points_transactions(
        &self,
        user_id: Uuid,
    ) -> StorageResult<Vec<PointsTransaction>> {
        Ok(PointsTransaction::list_by_user(&self.pool, user_id).await?)
    }

    async fn create_challenge(&self, data: CreateChallenge) -> StorageResult<Challenge> {
        Challenge::create(&self.pool, data)
            .await
            .map_err(|e| classify(e, "Duplicate challenge", "Company"))
    }

    async fn get_challenge(&self, id: Uuid) -> StorageResult<Option<Challenge>> {
        Ok(Challenge::find_by_id(&self.pool, id).await?)
    }

    async fn list_challenges(&self, company_id: Option<Uuid>) -> StorageResult<Vec<Challenge>> {
        Ok(Challenge::list_visible(&self.pool, company_id).await?)
    }

    async fn join_challenge(
        &self,
        challenge_id: Uuid,
        user_id: Uuid,
    ) -> StorageResult<ChallengeParticipant> {
        ChallengeParticipant::join(&self.pool, challenge_id, user_id)
            .await
            .map_err(|e| {
                classify(
                    e,
                    "Already participating in this challenge",
                    "Challenge",
                )
            })
    }

    async fn list_participations(
        &self,
        user_id: Uuid,
    ) -> StorageResult<Vec<ChallengeParticipant>> {
        Ok(ChallengeParticipant::list_by_user(&self.pool, user_id).await?)
    }

    async fn list_active_participations(
        &self,
        user_id: Uuid,
    ) -> StorageResult<Vec<ActiveParticipation>> {
        Ok(ChallengeParticipant::list_active_with_challenges(&self.pool, user_id).await?)
    }

    async fn advance_participation(
        &self,
        participant_id: Uuid,
        step: &ProgressStep,
    ) -> StorageResult<Option<ChallengeParticipant>> {
        ChallengeParticipant::advance(&self.pool, participant_id, step)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => StorageError::NotFound("User"),
                other => classify(other, "Ledger conflict", "User"),
            })
    }

    async fn count_completed_challenges(&self, user_id: Uuid) -> StorageResult<i64> {
        Ok(ChallengeParticipant::count_completed(&self.pool, user_id).await?)
    }

    async fn create_reward(&self, data: CreateReward) -> StorageResult<Reward> {
        Reward::create(&self.pool, data)
            .await
            .map_err(|e| classify(e, "Duplicate reward", "Company"))
    }

    async fn get_reward(&self, id: Uuid) -> StorageResult<Option<Reward>> {
        Ok(Reward::find_by_id(&self.pool, id).await?)
    }

    async fn list_rewards(&self, company_id: Option<Uuid>) -> StorageResult<Vec<Reward>> {
        Ok(Reward::list_visible(&self.pool, company_id).await?)
    }

    async fn redeem_reward(&self, user_id: Uuid, reward_id: Uuid) -> StorageResult<Redemption> {
        Ok(Redemption::redeem(&self.pool, user_id, reward_id).await?)
    }

    async fn list_redemptions(&self, user_id: Uuid) -> StorageResult<Vec<Redemption>> {
        Ok(Redemption::list_by_user(&self.pool, user_id).await?)
    }

    async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
