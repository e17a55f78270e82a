/// Challenge and participant models
///
/// Challenges are company-scoped or global (NULL `company_id`), time-boxed,
/// and pay `points_reward` once when a participant reaches `goal_value`.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE challenge_goal_type AS ENUM ('days', 'km', 'co2');
///
/// CREATE TABLE challenges (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     company_id UUID REFERENCES companies(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     start_date DATE NOT NULL,
///     end_date DATE NOT NULL,
///     goal_type challenge_goal_type NOT NULL,
///     goal_value DOUBLE PRECISION NOT NULL,
///     commute_type commute_type,
///     points_reward INTEGER NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE challenge_participants (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     challenge_id UUID NOT NULL REFERENCES challenges(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     progress DOUBLE PRECISION NOT NULL DEFAULT 0,
///     completed BOOLEAN NOT NULL DEFAULT FALSE,
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     completed_at TIMESTAMPTZ,
///     UNIQUE (challenge_id, user_id)
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use super::{commute_log::CommuteType, points::PointsTransaction};

/// What a challenge's `goal_value` measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "challenge_goal_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    /// Commute days logged
    Days,

    /// Kilometres travelled
    Km,

    /// Kilograms of CO₂ saved
    Co2,
}

/// Time-boxed commuting challenge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Challenge {
    pub id: Uuid,

    /// Owning company (None = open to every user)
    pub company_id: Option<Uuid>,

    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub goal_type: GoalType,
    pub goal_value: f64,

    /// Restricts progress to one commute type (None = any sustainable commute)
    pub commute_type: Option<CommuteType>,

    /// Paid once on completion
    pub points_reward: i32,

    pub created_at: DateTime<Utc>,
}

impl Challenge {
    /// Whether a user of `company_id` can see this challenge
    pub fn is_visible_to(&self, company_id: Option<Uuid>) -> bool {
        match self.company_id {
            None => true,
            Some(owner) => company_id == Some(owner),
        }
    }
}

/// Input for creating a challenge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChallenge {
    pub company_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub goal_type: GoalType,
    pub goal_value: f64,
    pub commute_type: Option<CommuteType>,
    pub points_reward: i32,
}

/// A user's enrollment in one challenge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChallengeParticipant {
    pub id: Uuid,
    pub challenge_id: Uuid,
    pub user_id: Uuid,

    /// Non-decreasing, never above the challenge's goal_value
    pub progress: f64,

    /// One-way false → true
    pub completed: bool,

    pub joined_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One increment applied to a participation
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStep {
    /// Added to the current progress
    pub amount: f64,

    /// Progress cap; reaching it completes the participation
    pub goal: f64,

    /// Paid in the same write that completes the participation
    pub reward: i32,

    /// Ledger source for the reward
    pub reward_source: String,
}

impl ProgressStep {
    /// Step of `amount` towards `challenge`'s goal and reward
    pub fn toward(challenge: &Challenge, amount: f64) -> Self {
        Self {
            amount,
            goal: challenge.goal_value,
            reward: challenge.points_reward,
            reward_source: format!("Completed challenge: {}", challenge.title),
        }
    }
}

/// A not-yet-completed participation joined with its challenge
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveParticipation {
    pub participant: ChallengeParticipant,
    pub challenge: Challenge,
}

const CHALLENGE_COLUMNS: &str = "id, company_id, title, description, start_date, end_date, \
     goal_type, goal_value, commute_type, points_reward, created_at";

const PARTICIPANT_COLUMNS: &str =
    "id, challenge_id, user_id, progress, completed, joined_at, completed_at";

impl Challenge {
    /// Creates a challenge
    pub async fn create(pool: &PgPool, data: CreateChallenge) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO challenges (company_id, title, description, start_date, end_date,
                                    goal_type, goal_value, commute_type, points_reward)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {CHALLENGE_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Challenge>(&query)
            .bind(data.company_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.start_date)
            .bind(data.end_date)
            .bind(data.goal_type)
            .bind(data.goal_value)
            .bind(data.commute_type)
            .bind(data.points_reward)
            .fetch_one(pool)
            .await
    }

    /// Finds a challenge by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {CHALLENGE_COLUMNS} FROM challenges WHERE id = $1");

        sqlx::query_as::<_, Challenge>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists global challenges plus those of `company_id`
    pub async fn list_visible(
        pool: &PgPool,
        company_id: Option<Uuid>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {CHALLENGE_COLUMNS}
            FROM challenges
            WHERE company_id IS NULL OR company_id = $1
            ORDER BY start_date DESC, created_at DESC
            "#
        );

        sqlx::query_as::<_, Challenge>(&query)
            .bind(company_id)
            .fetch_all(pool)
            .await
    }
}

impl ChallengeParticipant {
    /// Enrolls a user in a challenge
    ///
    /// # Errors
    ///
    /// Fails with a unique-constraint violation if the user already joined.
    pub async fn join(
        pool: &PgPool,
        challenge_id: Uuid,
        user_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO challenge_participants (challenge_id, user_id)
            VALUES ($1, $2)
            RETURNING {PARTICIPANT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, ChallengeParticipant>(&query)
            .bind(challenge_id)
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Lists every participation of a user
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM challenge_participants WHERE user_id = $1 ORDER BY joined_at"
        );

        sqlx::query_as::<_, ChallengeParticipant>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Lists a user's non-completed participations with their challenges
    pub async fn list_active_with_challenges(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<ActiveParticipation>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {PARTICIPANT_COLUMNS}
            FROM challenge_participants
            WHERE user_id = $1 AND completed = FALSE
            ORDER BY joined_at
            "#
        );

        let participants = sqlx::query_as::<_, ChallengeParticipant>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await?;

        if participants.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = participants.iter().map(|p| p.challenge_id).collect();
        let query = format!("SELECT {CHALLENGE_COLUMNS} FROM challenges WHERE id = ANY($1)");
        let mut challenges: HashMap<Uuid, Challenge> = sqlx::query_as::<_, Challenge>(&query)
            .bind(&ids)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        Ok(participants
            .into_iter()
            .filter_map(|participant| {
                let challenge = challenges.remove(&participant.challenge_id)?;
                Some(ActiveParticipation {
                    participant,
                    challenge,
                })
            })
            .collect())
    }

    /// Applies a step to a participation that is not yet completed
    ///
    /// The increment happens in SQL under the row lock, so concurrent steps
    /// all count. A completing step records the reward on the ledger in the
    /// same transaction; if that fails the progress update is rolled back.
    /// Returns None when the row was already completed, so a completion can
    /// only be observed once.
    pub async fn advance(
        pool: &PgPool,
        id: Uuid,
        step: &ProgressStep,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE challenge_participants
            SET progress = LEAST(progress + $2, $3),
                completed = progress + $2 >= $3,
                completed_at = CASE WHEN progress + $2 >= $3 THEN NOW() ELSE NULL END
            WHERE id = $1 AND completed = FALSE
            RETURNING {PARTICIPANT_COLUMNS}
            "#
        );

        let mut tx = pool.begin().await?;
        let updated = sqlx::query_as::<_, ChallengeParticipant>(&query)
            .bind(id)
            .bind(step.amount)
            .bind(step.goal)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(participant) = &updated {
            if participant.completed && step.reward != 0 {
                PointsTransaction::record_in(
                    &mut *tx,
                    participant.user_id,
                    &step.reward_source,
                    step.reward,
                )
                .await?;
            }
        }

        tx.commit().await?;
        Ok(updated)
    }

    /// Counts a user's completed challenges
    pub async fn count_completed(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM challenge_participants WHERE user_id = $1 AND completed = TRUE",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn challenge(company_id: Option<Uuid>) -> Challenge {
        Challenge {
            id: Uuid::new_v4(),
            company_id,
            title: "Bike Week".to_string(),
            description: None,
            start_date: NaiveDate::from_ymd_opt(2025, 5, 5).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 5, 11).unwrap(),
            goal_type: GoalType::Days,
            goal_value: 5.0,
            commute_type: Some(CommuteType::Cycle),
            points_reward: 50,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_step_carries_goal_and_reward() {
        let step = ProgressStep::toward(&challenge(None), 2.0);
        assert_eq!(step.amount, 2.0);
        assert_eq!(step.goal, 5.0);
        assert_eq!(step.reward, 50);
        assert_eq!(step.reward_source, "Completed challenge: Bike Week");
    }

    #[test]
    fn test_visibility() {
        let company = Uuid::new_v4();
        assert!(challenge(None).is_visible_to(None));
        assert!(challenge(None).is_visible_to(Some(company)));
        assert!(challenge(Some(company)).is_visible_to(Some(company)));
        assert!(!challenge(Some(company)).is_visible_to(None));
        assert!(!challenge(Some(company)).is_visible_to(Some(Uuid::new_v4())));
    }

    #[test]
    fn test_goal_type_wire_names() {
        assert_eq!(serde_json::to_string(&GoalType::Co2).unwrap(), "\"co2\"");
        assert_eq!(serde_json::from_str::<GoalType>("\"km\"").unwrap(), GoalType::Km);
    }
}
