/// Challenge progress reconciliation
///
/// Runs once for each newly created weekly log and advances the user's
/// open challenge participations. Completion pays the challenge reward
/// exactly once: the step and its reward are one storage write that only
/// matches rows that are not yet completed, so a second completion attempt
/// observes `None` and pays nothing.
///
/// Failures on one participation are logged and skipped; the caller treats
/// the whole pass as best-effort.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    challenge::{ActiveParticipation, Challenge, GoalType, ProgressStep},
    commute_log::CommuteLog,
};
use crate::storage::{Storage, StorageResult};

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileSummary {
    /// Participations whose progress was written
    pub advanced: usize,

    /// Challenges completed by this pass
    pub completed: Vec<Uuid>,

    /// Reward points paid out
    pub points_awarded: i32,
}

/// How much a log moves a challenge, or None if it doesn't apply
pub fn contribution(challenge: &Challenge, log: &CommuteLog) -> Option<f64> {
    match challenge.commute_type {
        Some(required) if required != log.commute_type => None,
        Some(_) => Some(match challenge.goal_type {
            GoalType::Days => f64::from(log.days_logged),
            GoalType::Km => log.distance_km,
            GoalType::Co2 => f64::from(log.co2_saved_kg),
        }),
        None => match challenge.goal_type {
            GoalType::Days => Some(f64::from(log.days_logged)),
            GoalType::Km | GoalType::Co2 => None,
        },
    }
}

/// Advances every open participation of `user_id` for a new log
///
/// # Errors
///
/// Only fails if the participations can't be listed; per-challenge failures
/// are logged and skipped.
pub async fn reconcile_challenges(
    storage: &dyn Storage,
    user_id: Uuid,
    log: &CommuteLog,
) -> StorageResult<ReconcileSummary> {
    let participations = storage.list_active_participations(user_id).await?;
    let mut summary = ReconcileSummary::default();

    for active in participations {
        let challenge_id = active.challenge.id;
        if let Err(e) = advance(storage, user_id, log, active, &mut summary).await {
            warn!(
                user_id = %user_id,
                challenge_id = %challenge_id,
                error = %e,
                "Failed to update challenge progress"
            );
        }
    }

    Ok(summary)
}

async fn advance(
    storage: &dyn Storage,
    user_id: Uuid,
    log: &CommuteLog,
    active: ActiveParticipation,
    summary: &mut ReconcileSummary,
) -> StorageResult<()> {
    let ActiveParticipation {
        participant,
        challenge,
    } = active;

    let Some(amount) = contribution(&challenge, log) else {
        return Ok(());
    };

    let step = ProgressStep::toward(&challenge, amount);
    let Some(updated) = storage
        .advance_participation(participant.id, &step)
        .await?
    else {
        debug!(
            participant_id = %participant.id,
            "Participation completed concurrently, skipping"
        );
        return Ok(());
    };
    summary.advanced += 1;

    if updated.completed {
        summary.completed.push(challenge.id);
        summary.points_awarded = summary.points_awarded.saturating_add(step.reward);
        info!(
            user_id = %user_id,
            challenge_id = %challenge.id,
            points = step.reward,
            "Challenge completed"
        );
    }

    Ok(())
}
