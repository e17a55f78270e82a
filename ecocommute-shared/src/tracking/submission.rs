/// Commute submission
///
/// Orchestrates one weekly commute submission:
///
/// 1. Validate the incoming payload
/// 2. Look up the newest log for (user, week_start)
/// 3. Merge into it while it is inside the merge window, otherwise create a
///    new log, award its points and reconcile challenges
///
/// Merges never award points and never touch challenges. The merge itself is
/// read-then-write without a version check, so two concurrent submissions for
/// the same week resolve as last write wins.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use ecocommute_shared::models::commute_log::CommuteType;
/// use ecocommute_shared::models::user::{CreateUser, UserRole};
/// use ecocommute_shared::storage::{MemoryStorage, Storage};
/// use ecocommute_shared::tracking::{submit_commute, CommuteSubmission, DaySelection};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let storage = MemoryStorage::new();
/// let user = storage.create_user(CreateUser {
///     email: "rider@example.com".to_string(),
///     password_hash: String::new(),
///     name: None,
///     company_id: None,
///     role: UserRole::User,
/// }).await?;
///
/// let week_start = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
/// let submission = CommuteSubmission {
///     user_id: None,
///     week_start,
///     commute_type: CommuteType::Cycle,
///     days_logged: 1,
///     distance_km: 8.0,
///     days: DaySelection { monday: Some(true), ..Default::default() },
/// };
///
/// let outcome = submit_commute(&storage, user.id, &submission, week_start).await?;
/// assert!(outcome.is_created());
/// # Ok(())
/// # }
/// ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use super::merge::{is_mergeable, merge_week, DaySelection};
use super::reconcile::{reconcile_challenges, ReconcileSummary};
use super::scoring::{co2_saved_kg, points_for};
use crate::models::{
    commute_log::{CommuteLog, CommuteType, CreateCommuteLog},
    points::PointsTransaction,
};
use crate::storage::{Storage, StorageError};

/// Weekly commute payload
///
/// Day flags are flattened into the top-level object
/// (`"monday": true, ...`) and may be omitted or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CommuteSubmission {
    /// User the log belongs to; defaults to the caller
    #[serde(default)]
    pub user_id: Option<Uuid>,

    /// Date anchoring the week (`YYYY-MM-DD`)
    pub week_start: NaiveDate,

    pub commute_type: CommuteType,

    #[validate(range(min = 0, max = 7, message = "days_logged must be between 0 and 7"))]
    pub days_logged: i32,

    #[validate(range(min = 0.0, message = "distance_km must not be negative"))]
    pub distance_km: f64,

    #[serde(flatten)]
    pub days: DaySelection,
}

impl CommuteSubmission {
    /// Field validation plus the day-count consistency check
    ///
    /// Only the incoming payload is checked here; merged records get their
    /// count recomputed instead.
    pub fn validate_submission(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        if !self.distance_km.is_finite() {
            let mut error = ValidationError::new("finite");
            error.message = Some(Cow::from("distance_km must be a finite number"));
            errors.add("distance_km", error);
        }

        let selected = self.days.selected_count();
        if self.days_logged != selected {
            let mut error = ValidationError::new("day_count");
            error.message = Some(Cow::from(format!(
                "days_logged is {} but {} day(s) are selected",
                self.days_logged, selected
            )));
            errors.add("days_logged", error);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// What a submission did
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// A new weekly log was created
    Created {
        log: CommuteLog,

        /// Ledger entry for the weekly points, if any were earned
        points: Option<PointsTransaction>,

        /// Challenge effects; empty when reconciliation failed
        challenges: ReconcileSummary,
    },

    /// The submission was merged into an existing log
    Merged { log: CommuteLog },
}

impl SubmissionOutcome {
    pub fn log(&self) -> &CommuteLog {
        match self {
            SubmissionOutcome::Created { log, .. } | SubmissionOutcome::Merged { log } => log,
        }
    }

    pub fn into_log(self) -> CommuteLog {
        match self {
            SubmissionOutcome::Created { log, .. } | SubmissionOutcome::Merged { log } => log,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, SubmissionOutcome::Created { .. })
    }
}

/// Submission error type
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// Payload failed validation
    #[error("Invalid submission: {0}")]
    Validation(#[from] ValidationErrors),

    /// Target user doesn't exist
    #[error("User not found")]
    UserNotFound,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Source recorded on the ledger for weekly commute points
pub fn weekly_points_source(commute_type: CommuteType) -> String {
    format!("Weekly commute: {commute_type}")
}

/// Records a weekly commute for `user_id`
///
/// `today` decides whether an existing log is still inside the merge window.
///
/// # Errors
///
/// - `Validation` if the payload is inconsistent
/// - `UserNotFound` if `user_id` doesn't exist
/// - `Storage` for backend failures (challenge reconciliation failures are
///   logged and never surface here)
pub async fn submit_commute(
    storage: &dyn Storage,
    user_id: Uuid,
    submission: &CommuteSubmission,
    today: NaiveDate,
) -> Result<SubmissionOutcome, SubmissionError> {
    submission.validate_submission()?;

    if storage.get_user(user_id).await?.is_none() {
        return Err(SubmissionError::UserNotFound);
    }

    let existing = storage
        .find_commute_log_for_week(user_id, submission.week_start)
        .await?;

    if let Some(existing) = existing.filter(|log| is_mergeable(log.week_start, today)) {
        let merged = merge_week(
            &existing,
            submission.commute_type,
            submission.distance_km,
            &submission.days,
        );
        let log = storage.update_commute_log(existing.id, merged).await?;

        debug!(
            user_id = %user_id,
            log_id = %log.id,
            days_logged = log.days_logged,
            "Merged commute submission into existing log"
        );
        return Ok(SubmissionOutcome::Merged { log });
    }

    let log = storage
        .create_commute_log(CreateCommuteLog {
            user_id,
            week_start: submission.week_start,
            commute_type: submission.commute_type,
            days_logged: submission.days_logged,
            distance_km: submission.distance_km,
            co2_saved_kg: co2_saved_kg(
                submission.commute_type,
                submission.distance_km,
                submission.days_logged,
            ),
            days: submission.days.to_week_days(),
        })
        .await?;

    let earned = points_for(log.commute_type, log.days_logged);
    let points = if earned > 0 {
        let source = weekly_points_source(log.commute_type);
        Some(storage.award_points(user_id, &source, earned).await?)
    } else {
        None
    };

    let challenges = match reconcile_challenges(storage, user_id, &log).await {
        Ok(summary) => summary,
        Err(e) => {
            warn!(
                user_id = %user_id,
                log_id = %log.id,
                error = %e,
                "Challenge reconciliation failed"
            );
            ReconcileSummary::default()
        }
    };

    info!(
        user_id = %user_id,
        log_id = %log.id,
        commute_type = %log.commute_type,
        points = earned,
        co2_saved_kg = log.co2_saved_kg,
        "Recorded weekly commute"
    );

    Ok(SubmissionOutcome::Created {
        log,
        points,
        challenges,
    })
}
