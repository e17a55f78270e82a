/// Challenge endpoints
///
/// # Endpoints
///
/// - `GET /api/challenges?userId=` - Global challenges plus the user's company's
/// - `POST /api/challenges` - Create a challenge (admin only)
/// - `POST /api/challenges/:id/join?userId=` - Enroll; 409 if already enrolled
/// - `GET /api/challenges/participations?userId=` - The user's enrollments
///
/// Progress is advanced by commute submissions, never through these routes.

use super::{acting_user, caller, UserQuery};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use ecocommute_shared::{
    auth::{authorization::require_admin, identity::Identity},
    models::{
        challenge::{Challenge, ChallengeParticipant, CreateChallenge, GoalType},
        commute_log::CommuteType,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Create challenge request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateChallengeRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub goal_type: GoalType,

    #[validate(range(exclusive_min = 0.0, message = "goal_value must be positive"))]
    pub goal_value: f64,

    /// Only submissions of this type count; None counts every type
    pub commute_type: Option<CommuteType>,

    #[validate(range(min = 0, max = 100000, message = "points_reward must be 0-100000"))]
    pub points_reward: i32,

    /// Visible to every company instead of only the admin's
    #[serde(default)]
    pub global: bool,
}

pub async fn list_challenges(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Challenge>>> {
    let Query(query) = query?;
    let user = acting_user(&state, &identity, query.user_id).await?;

    Ok(Json(state.storage.list_challenges(user.company_id).await?))
}

/// Create a challenge
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, or `end_date` before `start_date`
/// - `403 Forbidden`: Caller isn't an admin
pub async fn create_challenge(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<CreateChallengeRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Challenge>)> {
    let admin = caller(&state, &identity).await?;
    require_admin(&admin)?;

    let Json(req) = payload?;
    req.validate()?;
    if req.end_date < req.start_date {
        return Err(ApiError::invalid_field(
            "end_date",
            "end_date must not be before start_date",
        ));
    }

    let challenge = state
        .storage
        .create_challenge(CreateChallenge {
            company_id: if req.global { None } else { admin.company_id },
            title: req.title,
            description: req.description,
            start_date: req.start_date,
            end_date: req.end_date,
            goal_type: req.goal_type,
            goal_value: req.goal_value,
            commute_type: req.commute_type,
            points_reward: req.points_reward,
        })
        .await?;

    tracing::info!(challenge_id = %challenge.id, admin_id = %admin.id, "Challenge created");
    Ok((StatusCode::CREATED, Json(challenge)))
}

/// Enroll in a challenge
///
/// # Errors
///
/// - `404 Not Found`: No such challenge, or it belongs to another company
/// - `409 Conflict`: Already enrolled
pub async fn join_challenge(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult<(StatusCode, Json<ChallengeParticipant>)> {
    let Path(challenge_id) = path?;
    let Query(query) = query?;
    let user = acting_user(&state, &identity, query.user_id).await?;

    let visible = state
        .storage
        .get_challenge(challenge_id)
        .await?
        .is_some_and(|c| c.is_visible_to(user.company_id));
    if !visible {
        return Err(ApiError::NotFound("Challenge not found".to_string()));
    }

    let participant = state.storage.join_challenge(challenge_id, user.id).await?;
    tracing::info!(challenge_id = %challenge_id, user_id = %user.id, "Joined challenge");

    Ok((StatusCode::CREATED, Json(participant)))
}

pub async fn list_participations(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<ChallengeParticipant>>> {
    let Query(query) = query?;
    let user = acting_user(&state, &identity, query.user_id).await?;

    Ok(Json(state.storage.list_participations(user.id).await?))
}
