/// Commute endpoints
///
/// # Endpoints
///
/// - `POST /api/commutes` (alias `POST /api/commutes/log`) - Submit a week
/// - `GET /api/commutes/current?userId=` - Logs from the trailing 30 days

use super::{acting_user, UserQuery};
use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use chrono::{Duration, Utc};
use ecocommute_shared::{
    auth::identity::Identity,
    models::commute_log::CommuteLog,
    tracking::{submit_commute, CommuteSubmission, SubmissionOutcome},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Window for `GET /api/commutes/current`
pub const CURRENT_WINDOW_DAYS: i64 = 30;

/// Submission result
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub log: CommuteLog,

    /// True when the submission was folded into an existing weekly log
    pub merged: bool,

    /// Weekly points credited by this submission (0 for merges)
    pub points_awarded: i32,

    /// Challenge reward points credited by this submission
    pub challenge_points_awarded: i32,

    /// Challenges completed by this submission
    pub completed_challenges: Vec<Uuid>,
}

impl From<SubmissionOutcome> for SubmitResponse {
    fn from(outcome: SubmissionOutcome) -> Self {
        match outcome {
            SubmissionOutcome::Created {
                log,
                points,
                challenges,
            } => Self {
                log,
                merged: false,
                points_awarded: points.map(|p| p.points).unwrap_or(0),
                challenge_points_awarded: challenges.points_awarded,
                completed_challenges: challenges.completed,
            },
            SubmissionOutcome::Merged { log } => Self {
                log,
                merged: true,
                points_awarded: 0,
                challenge_points_awarded: 0,
                completed_challenges: Vec::new(),
            },
        }
    }
}

/// Submit a weekly commute
///
/// # Endpoint
///
/// ```text
/// POST /api/commutes
/// Content-Type: application/json
///
/// {
///   "week_start": "2025-06-02",
///   "commute_type": "cycle",
///   "days_logged": 3,
///   "distance_km": 10.0,
///   "monday": true,
///   "tuesday": true,
///   "wednesday": true
/// }
/// ```
///
/// # Responses
///
/// - `201 Created`: new weekly log, points awarded
/// - `200 OK`: merged into this week's existing log, no points
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed (unknown commute type, bad date,
///   negative distance, day count mismatch)
/// - `403 Forbidden`: `user_id` names another user and caller isn't admin
/// - `404 Not Found`: `user_id` doesn't exist
pub async fn submit(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<CommuteSubmission>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let Json(submission) = payload?;
    let user = acting_user(&state, &identity, submission.user_id).await?;

    let today = Utc::now().date_naive();
    let outcome = submit_commute(state.storage.as_ref(), user.id, &submission, today).await?;

    let status = if outcome.is_created() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(outcome.into())))
}

/// Logs whose week started within the last 30 days, newest week first
pub async fn current(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<CommuteLog>>> {
    let Query(query) = query?;
    let user = acting_user(&state, &identity, query.user_id).await?;

    let since = Utc::now().date_naive() - Duration::days(CURRENT_WINDOW_DAYS);
    let logs = state.storage.list_commute_logs_since(user.id, since).await?;

    Ok(Json(logs))
}
