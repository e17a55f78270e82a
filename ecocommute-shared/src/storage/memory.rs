/// In-memory storage backend
///
/// All tables live in one [`Tables`] value behind a `tokio::sync::RwLock`.
/// Every trait method takes the lock once, which makes multi-row writes such
/// as `award_points` and `redeem_reward` atomic with respect to other callers.
/// Rows that must be found "latest first" are kept in insertion order.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Storage, StorageError, StorageResult};
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

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    companies: HashMap<Uuid, Company>,
    commute_logs: Vec<CommuteLog>,
    transactions: Vec<PointsTransaction>,
    challenges: HashMap<Uuid, Challenge>,
    participants: Vec<ChallengeParticipant>,
    rewards: HashMap<Uuid, Reward>,
    redemptions: Vec<Redemption>,
}

impl Tables {
    fn record_points(
        &mut self,
        user_id: Uuid,
        source: &str,
        points: i32,
    ) -> StorageResult<PointsTransaction> {
        let user = self
            .users
            .get_mut(&user_id)
            .ok_or(StorageError::NotFound("User"))?;
        let total = user
            .points_total
            .checked_add(points)
            .ok_or(StorageError::BalanceOverflow)?;
        let now = Utc::now();
        user.points_total = total;
        user.updated_at = now;

        let entry = PointsTransaction {
            id: Uuid::new_v4(),
            user_id,
            source: source.to_string(),
            points,
            created_at: now,
        };
        self.transactions.push(entry.clone());
        Ok(entry)
    }
}

/// Storage backed by process memory
///
/// Cheap to construct; each instance is an isolated, empty database.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully-formed user row, keeping its ID
    ///
    /// Used to seed the development identity, whose ID comes from
    /// configuration. An existing row with the same ID is replaced.
    pub async fn seed_user(&self, user: User) {
        self.tables.write().await.users.insert(user.id, user);
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn create_user(&self, data: CreateUser) -> StorageResult<User> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&data.email));
        if taken {
            return Err(StorageError::Conflict("Email already exists".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            password_hash: data.password_hash,
            name: data.name,
            company_id: data.company_id,
            points_total: 0,
            streak_count: 0,
            role: data.role,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> StorageResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StorageResult<Option<User>> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = data.name {
            user.name = name;
        }
        if let Some(company_id) = data.company_id {
            user.company_id = company_id;
        }
        if let Some(streak_count) = data.streak_count {
            user.streak_count = streak_count;
        }
        if let Some(role) = data.role {
            user.role = role;
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> StorageResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }

        tables.commute_logs.retain(|l| l.user_id != id);
        tables.transactions.retain(|t| t.user_id != id);
        tables.participants.retain(|p| p.user_id != id);
        tables.redemptions.retain(|r| r.user_id != id);
        Ok(true)
    }

    async fn leaderboard(&self, company_id: Uuid, limit: i64) -> StorageResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables
            .users
            .values()
            .filter(|u| u.company_id == Some(company_id))
            .cloned()
            .collect();

        users.sort_by(|a, b| {
            b.points_total
                .cmp(&a.points_total)
                .then(a.created_at.cmp(&b.created_at))
        });
        users.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(users)
    }

    async fn create_company(&self, data: CreateCompany) -> StorageResult<Company> {
        let mut tables = self.tables.write().await;
        let domain = data.domain.to_ascii_lowercase();
        if tables.companies.values().any(|c| c.domain == domain) {
            return Err(StorageError::Conflict("Domain already exists".to_string()));
        }

        let company = Company {
            id: Uuid::new_v4(),
            name: data.name,
            domain,
            created_at: Utc::now(),
        };
        tables.companies.insert(company.id, company.clone());
        Ok(company)
    }

    async fn get_company(&self, id: Uuid) -> StorageResult<Option<Company>> {
        Ok(self.tables.read().await.companies.get(&id).cloned())
    }

    async fn get_company_by_domain(&self, domain: &str) -> StorageResult<Option<Company>> {
        Ok(self
            .tables
            .read()
            .await
            .companies
            .values()
            .find(|c| c.domain.eq_ignore_ascii_case(domain))
            .cloned())
    }

    async fn create_commute_log(&self, data: CreateCommuteLog) -> StorageResult<CommuteLog> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&data.user_id) {
            return Err(StorageError::NotFound("User"));
        }

        let now = Utc::now();
        let mut log = CommuteLog {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            week_start: data.week_start,
            commute_type: data.commute_type,
            days_logged: data.days_logged,
            distance_km: data.distance_km,
            co2_saved_kg: data.co2_saved_kg,
            monday: false,
            tuesday: false,
            wednesday: false,
            thursday: false,
            friday: false,
            saturday: false,
            sunday: false,
            created_at: now,
            updated_at: now,
        };
        log.set_days(data.days);

        tables.commute_logs.push(log.clone());
        Ok(log)
    }

    async fn find_commute_log_for_week(
        &self,
        user_id: Uuid,
        week_start: NaiveDate,
    ) -> StorageResult<Option<CommuteLog>> {
        Ok(self
            .tables
            .read()
            .await
            .commute_logs
            .iter()
            .rev()
            .find(|l| l.user_id == user_id && l.week_start == week_start)
            .cloned())
    }

    async fn update_commute_log(
        &self,
        id: Uuid,
        data: MergeCommuteLog,
    ) -> StorageResult<CommuteLog> {
        let mut tables = self.tables.write().await;
        let log = tables
            .commute_logs
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(StorageError::NotFound("Commute log"))?;

        log.commute_type = data.commute_type;
        log.days_logged = data.days_logged;
        log.distance_km = data.distance_km;
        log.co2_saved_kg = data.co2_saved_kg;
        log.set_days(data.days);
        log.updated_at = Utc::now();

        Ok(log.clone())
    }

    async fn list_commute_logs_since(
        &self,
        user_id: Uuid,
        since: NaiveDate,
    ) -> StorageResult<Vec<CommuteLog>> {
        let tables = self.tables.read().await;
        let mut logs: Vec<CommuteLog> = tables
            .commute_logs
            .iter()
            .rev()
            .filter(|l| l.user_id == user_id && l.week_start >= since)
            .cloned()
            .collect();

        // Stable sort keeps newest-created first within a week
        logs.sort_by(|a, b| b.week_start.cmp(&a.week_start));
        Ok(logs)
    }

    async fn total_co2_saved(&self, user_id: Uuid) -> StorageResult<i64> {
        Ok(self
            .tables
            .read()
            .await
            .commute_logs
            .iter()
            .filter(|l| l.user_id == user_id)
            .map(|l| i64::from(l.co2_saved_kg))
            .sum())
    }

    async fn award_points(
        &self,
        user_id: Uuid,
        source: &str,
        points: i32,
    ) -> StorageResult<PointsTransaction> {
        self.tables
            .write()
            .await
            .record_points(user_id, source, points)
    }

    async fn list_points_transactions(
        &self,
        user_id: Uuid,
    ) -> StorageResult<Vec<PointsTransaction>> {
        Ok(self
            .tables
            .read()
            .await
            .transactions
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_challenge(&self, data: CreateChallenge) -> StorageResult<Challenge> {
        let challenge = Challenge {
            id: Uuid::new_v4(),
            company_id: data.company_id,
            title: data.title,
            description: data.description,
            start_date: data.start_date,
            end_date: data.end_date,
            goal_type: data.goal_type,
            goal_value: data.goal_value,
            commute_type: data.commute_type,
            points_reward: data.points_reward,
            created_at: Utc::now(),
        };

        self.tables
            .write()
            .await
            .challenges
            .insert(challenge.id, challenge.clone());
        Ok(challenge)
    }

    async fn get_challenge(&self, id: Uuid) -> StorageResult<Option<Challenge>> {
        Ok(self.tables.read().await.challenges.get(&id).cloned())
    }

    async fn list_challenges(&self, company_id: Option<Uuid>) -> StorageResult<Vec<Challenge>> {
        let tables = self.tables.read().await;
        let mut challenges: Vec<Challenge> = tables
            .challenges
            .values()
            .filter(|c| c.is_visible_to(company_id))
            .cloned()
            .collect();

        challenges.sort_by(|a, b| {
            b.start_date
                .cmp(&a.start_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(challenges)
    }

    async fn join_challenge(
        &self,
        challenge_id: Uuid,
        user_id: Uuid,
    ) -> StorageResult<ChallengeParticipant> {
        let mut tables = self.tables.write().await;
        if !tables.challenges.contains_key(&challenge_id) {
            return Err(StorageError::NotFound("Challenge"));
        }
        if !tables.users.contains_key(&user_id) {
            return Err(StorageError::NotFound("User"));
        }
        let joined = tables
            .participants
            .iter()
            .any(|p| p.challenge_id == challenge_id && p.user_id == user_id);
        if joined {
            return Err(StorageError::Conflict(
                "Already participating in this challenge".to_string(),
            ));
        }

        let participant = ChallengeParticipant {
            id: Uuid::new_v4(),
            challenge_id,
            user_id,
            progress: 0.0,
            completed: false,
            joined_at: Utc::now(),
            completed_at: None,
        };
        tables.participants.push(participant.clone());
        Ok(participant)
    }

    async fn list_participations(
        &self,
        user_id: Uuid,
    ) -> StorageResult<Vec<ChallengeParticipant>> {
        Ok(self
            .tables
            .read()
            .await
            .participants
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_active_participations(
        &self,
        user_id: Uuid,
    ) -> StorageResult<Vec<ActiveParticipation>> {
        let tables = self.tables.read().await;
        Ok(tables
            .participants
            .iter()
            .filter(|p| p.user_id == user_id && !p.completed)
            .filter_map(|p| {
                let challenge = tables.challenges.get(&p.challenge_id)?;
                Some(ActiveParticipation {
                    participant: p.clone(),
                    challenge: challenge.clone(),
                })
            })
            .collect())
    }

    async fn advance_participation(
        &self,
        participant_id: Uuid,
        step: &ProgressStep,
    ) -> StorageResult<Option<ChallengeParticipant>> {
        let mut tables = self.tables.write().await;
        let Some(index) = tables
            .participants
            .iter()
            .position(|p| p.id == participant_id && !p.completed)
        else {
            return Ok(None);
        };

        let user_id = tables.participants[index].user_id;
        let progress = (tables.participants[index].progress + step.amount).min(step.goal);
        let completed = progress >= step.goal;

        // Credit first so a failed reward leaves the participation untouched
        if completed && step.reward != 0 {
            tables.record_points(user_id, &step.reward_source, step.reward)?;
        }

        let participant = &mut tables.participants[index];
        participant.progress = progress;
        participant.completed = completed;
        if completed {
            participant.completed_at = Some(Utc::now());
        }

        Ok(Some(participant.clone()))
    }

    async fn count_completed_challenges(&self, user_id: Uuid) -> StorageResult<i64> {
        Ok(self
            .tables
            .read()
            .await
            .participants
            .iter()
            .filter(|p| p.user_id == user_id && p.completed)
            .count() as i64)
    }

    async fn create_reward(&self, data: CreateReward) -> StorageResult<Reward> {
        let reward = Reward {
            id: Uuid::new_v4(),
            company_id: data.company_id,
            title: data.title,
            description: data.description,
            cost_points: data.cost_points,
            quantity_limit: data.quantity_limit,
            created_at: Utc::now(),
        };

        self.tables
            .write()
            .await
            .rewards
            .insert(reward.id, reward.clone());
        Ok(reward)
    }

    async fn get_reward(&self, id: Uuid) -> StorageResult<Option<Reward>> {
        Ok(self.tables.read().await.rewards.get(&id).cloned())
    }

    async fn list_rewards(&self, company_id: Option<Uuid>) -> StorageResult<Vec<Reward>> {
        let tables = self.tables.read().await;
        let mut rewards: Vec<Reward> = tables
            .rewards
            .values()
            .filter(|r| r.is_visible_to(company_id))
            .cloned()
            .collect();

        rewards.sort_by(|a, b| {
            a.cost_points
                .cmp(&b.cost_points)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(rewards)
    }

    async fn redeem_reward(&self, user_id: Uuid, reward_id: Uuid) -> StorageResult<Redemption> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get(&user_id)
            .ok_or(StorageError::NotFound("User"))?;
        let (available, company_id) = (user.points_total, user.company_id);

        let reward = tables
            .rewards
            .get(&reward_id)
            .filter(|r| r.is_visible_to(company_id))
            .cloned()
            .ok_or(StorageError::NotFound("Reward"))?;

        if let Some(limit) = reward.quantity_limit {
            let redeemed = tables
                .redemptions
                .iter()
                .filter(|r| r.reward_id == reward_id)
                .count();
            if redeemed as i64 >= i64::from(limit) {
                return Err(StorageError::Conflict(
                    "Reward is no longer available".to_string(),
                ));
            }
        }

        if available < reward.cost_points {
            return Err(StorageError::InsufficientPoints {
                required: reward.cost_points,
                available,
            });
        }

        let source = format!("Redeemed reward: {}", reward.title);
        tables.record_points(user_id, &source, -reward.cost_points)?;

        let redemption = Redemption {
            id: Uuid::new_v4(),
            user_id,
            reward_id,
            redeemed_at: Utc::now(),
        };
        tables.redemptions.push(redemption.clone());
        Ok(redemption)
    }

    async fn list_redemptions(&self, user_id: Uuid) -> StorageResult<Vec<Redemption>> {
        Ok(self
            .tables
            .read()
            .await
            .redemptions
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::challenge::GoalType;
    use crate::models::commute_log::{CommuteType, WeekDays};
    use crate::models::user::UserRole;

    async fn seed_user(storage: &MemoryStorage, email: &str, company_id: Option<Uuid>) -> User {
        storage
            .create_user(CreateUser {
                email: email.to_string(),
                password_hash: String::new(),
                name: None,
                company_id,
                role: UserRole::User,
            })
            .await
            .unwrap()
    }

    fn week(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let storage = MemoryStorage::new();
        seed_user(&storage, "a@acme.com", None).await;

        let result = storage
            .create_user(CreateUser {
                email: "A@ACME.com".to_string(),
                password_hash: String::new(),
                name: None,
                company_id: None,
                role: UserRole::User,
            })
            .await;
        assert!(matches!(result, Err(StorageError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_award_points_moves_balance_with_ledger() {
        let storage = MemoryStorage::new();
        let user = seed_user(&storage, "a@acme.com", None).await;

        storage.award_points(user.id, "one", 40).await.unwrap();
        storage.award_points(user.id, "two", -15).await.unwrap();

        let user = storage.get_user(user.id).await.unwrap().unwrap();
        let ledger = storage.list_points_transactions(user.id).await.unwrap();
        assert_eq!(user.points_total, 25);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger[0].source, "two");
        assert_eq!(ledger.iter().map(|t| t.points).sum::<i32>(), user.points_total);
    }

    #[tokio::test]
    async fn test_award_points_unknown_user_writes_nothing() {
        let storage = MemoryStorage::new();
        let ghost = Uuid::new_v4();

        let result = storage.award_points(ghost, "ghost", 10).await;
        assert!(matches!(result, Err(StorageError::NotFound("User"))));
        assert!(storage.list_points_transactions(ghost).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_award_points_overflow_writes_nothing() {
        let storage = MemoryStorage::new();
        let user = seed_user(&storage, "a@acme.com", None).await;
        storage.award_points(user.id, "seed", 10).await.unwrap();

        let result = storage.award_points(user.id, "jackpot", i32::MAX).await;
        assert!(matches!(result, Err(StorageError::BalanceOverflow)));

        let user = storage.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.points_total, 10);
        assert_eq!(storage.list_points_transactions(user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_for_week_returns_latest() {
        let storage = MemoryStorage::new();
        let user = seed_user(&storage, "a@acme.com", None).await;
        let data = CreateCommuteLog {
            user_id: user.id,
            week_start: week(2),
            commute_type: CommuteType::Walk,
            days_logged: 1,
            distance_km: 2.0,
            co2_saved_kg: 0,
            days: WeekDays {
                monday: true,
                ..Default::default()
            },
        };

        storage.create_commute_log(data.clone()).await.unwrap();
        let second = storage.create_commute_log(data).await.unwrap();

        let found = storage
            .find_commute_log_for_week(user.id, week(2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, second.id);
        assert!(storage
            .find_commute_log_for_week(user.id, week(9))
            .await
            .unwrap()
            .is_none());
    }

    async fn seed_participation(
        storage: &MemoryStorage,
        user: &User,
        points_reward: i32,
    ) -> (Challenge, ChallengeParticipant) {
        let challenge = storage
            .create_challenge(CreateChallenge {
                company_id: None,
                title: "Walk it".to_string(),
                description: None,
                start_date: week(1),
                end_date: week(30),
                goal_type: GoalType::Days,
                goal_value: 4.0,
                commute_type: None,
                points_reward,
            })
            .await
            .unwrap();
        let participant = storage.join_challenge(challenge.id, user.id).await.unwrap();
        (challenge, participant)
    }

    #[tokio::test]
    async fn test_advance_accumulates_and_completes_once() {
        let storage = MemoryStorage::new();
        let user = seed_user(&storage, "a@acme.com", None).await;
        let (challenge, participant) = seed_participation(&storage, &user, 20).await;

        let updated = storage
            .advance_participation(participant.id, &ProgressStep::toward(&challenge, 3.0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.progress, 3.0);
        assert!(!updated.completed);

        // Capped at the goal
        let completed = storage
            .advance_participation(participant.id, &ProgressStep::toward(&challenge, 3.0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(completed.progress, 4.0);
        assert!(completed.completed);
        assert!(completed.completed_at.is_some());

        let again = storage
            .advance_participation(participant.id, &ProgressStep::toward(&challenge, 1.0))
            .await
            .unwrap();
        assert!(again.is_none());
        assert!(storage
            .list_active_participations(user.id)
            .await
            .unwrap()
            .is_empty());

        let user = storage.get_user(user.id).await.unwrap().unwrap();
        let ledger = storage.list_points_transactions(user.id).await.unwrap();
        assert_eq!(user.points_total, 20);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].source, "Completed challenge: Walk it");
    }

    #[tokio::test]
    async fn test_failed_reward_leaves_participation_open() {
        let storage = MemoryStorage::new();
        let user = seed_user(&storage, "a@acme.com", None).await;
        storage.award_points(user.id, "seed", 1).await.unwrap();
        let (challenge, participant) = seed_participation(&storage, &user, i32::MAX).await;

        let result = storage
            .advance_participation(participant.id, &ProgressStep::toward(&challenge, 4.0))
            .await;
        assert!(matches!(result, Err(StorageError::BalanceOverflow)));

        let active = storage.list_active_participations(user.id).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].participant.progress, 0.0);

        let user = storage.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.points_total, 1);
    }

    #[tokio::test]
    async fn test_join_twice_is_conflict() {
        let storage = MemoryStorage::new();
        let user = seed_user(&storage, "a@acme.com", None).await;
        let challenge = storage
            .create_challenge(CreateChallenge {
                company_id: None,
                title: "Once".to_string(),
                description: None,
                start_date: week(1),
                end_date: week(30),
                goal_type: GoalType::Km,
                goal_value: 100.0,
                commute_type: Some(CommuteType::Cycle),
                points_reward: 0,
            })
            .await
            .unwrap();

        storage.join_challenge(challenge.id, user.id).await.unwrap();
        let again = storage.join_challenge(challenge.id, user.id).await;
        assert!(matches!(again, Err(StorageError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_redeem_checks_balance_and_limit() {
        let storage = MemoryStorage::new();
        let alice = seed_user(&storage, "alice@acme.com", None).await;
        let bob = seed_user(&storage, "bob@acme.com", None).await;
        let reward = storage
            .create_reward(CreateReward {
                company_id: None,
                title: "Coffee".to_string(),
                description: None,
                cost_points: 50,
                quantity_limit: Some(1),
            })
            .await
            .unwrap();

        let poor = storage.redeem_reward(alice.id, reward.id).await;
        assert!(matches!(
            poor,
            Err(StorageError::InsufficientPoints {
                required: 50,
                available: 0
            })
        ));

        storage.award_points(alice.id, "seed", 60).await.unwrap();
        storage.award_points(bob.id, "seed", 60).await.unwrap();
        storage.redeem_reward(alice.id, reward.id).await.unwrap();

        let alice = storage.get_user(alice.id).await.unwrap().unwrap();
        assert_eq!(alice.points_total, 10);
        let ledger = storage.list_points_transactions(alice.id).await.unwrap();
        assert_eq!(ledger[0].points, -50);
        assert_eq!(ledger[0].source, "Redeemed reward: Coffee");

        let sold_out = storage.redeem_reward(bob.id, reward.id).await;
        assert!(matches!(sold_out, Err(StorageError::Conflict(_))));
        let bob = storage.get_user(bob.id).await.unwrap().unwrap();
        assert_eq!(bob.points_total, 60);
    }

    #[tokio::test]
    async fn test_company_reward_hidden_from_other_companies() {
        let storage = MemoryStorage::new();
        let acme = storage
            .create_company(CreateCompany {
                name: "Acme".to_string(),
                domain: "acme.com".to_string(),
            })
            .await
            .unwrap();
        let solo = seed_user(&storage, "solo@gmail.com", None).await;
        storage.award_points(solo.id, "seed", 100).await.unwrap();

        let reward = storage
            .create_reward(CreateReward {
                company_id: Some(acme.id),
                title: "Acme mug".to_string(),
                description: None,
                cost_points: 10,
                quantity_limit: None,
            })
            .await
            .unwrap();

        assert!(storage.list_rewards(None).await.unwrap().is_empty());
        let result = storage.redeem_reward(solo.id, reward.id).await;
        assert!(matches!(result, Err(StorageError::NotFound("Reward"))));
    }

    #[tokio::test]
    async fn test_leaderboard_is_company_scoped_and_ordered() {
        let storage = MemoryStorage::new();
        let acme = storage
            .create_company(CreateCompany {
                name: "Acme".to_string(),
                domain: "acme.com".to_string(),
            })
            .await
            .unwrap();
        let low = seed_user(&storage, "low@acme.com", Some(acme.id)).await;
        let high = seed_user(&storage, "high@acme.com", Some(acme.id)).await;
        let outsider = seed_user(&storage, "out@other.com", None).await;
        storage.award_points(low.id, "seed", 5).await.unwrap();
        storage.award_points(high.id, "seed", 50).await.unwrap();
        storage.award_points(outsider.id, "seed", 500).await.unwrap();

        let board = storage.leaderboard(acme.id, 10).await.unwrap();
        let ids: Vec<Uuid> = board.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![high.id, low.id]);

        let top = storage.leaderboard(acme.id, 1).await.unwrap();
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn test_seeded_user_keeps_its_id() {
        let storage = MemoryStorage::new();
        let id = Uuid::new_v4();
        let now = Utc::now();
        storage
            .seed_user(User {
                id,
                email: "dev@localhost".to_string(),
                password_hash: String::new(),
                name: Some("Developer".to_string()),
                company_id: None,
                points_total: 0,
                streak_count: 0,
                role: UserRole::User,
                created_at: now,
                updated_at: now,
            })
            .await;

        let user = storage.get_user(id).await.unwrap().unwrap();
        assert_eq!(user.email, "dev@localhost");
        storage.award_points(id, "Seed", 5).await.unwrap();
    }
}
