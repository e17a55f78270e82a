/// Company leaderboard
///
/// ```text
/// GET /api/leaderboard?userId=&limit=10
/// ```
///
/// Ranks the users of the acting user's company by points, ties broken by
/// who joined first. A user without a company sees only themselves.

use super::acting_user;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension, Json,
};
use ecocommute_shared::{auth::identity::Identity, models::user::User};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<Uuid>,

    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: usize,
    pub user_id: Uuid,
    pub name: Option<String>,
    pub points_total: i32,
    pub streak_count: i32,
}

fn entries(users: Vec<User>) -> Vec<LeaderboardEntry> {
    users
        .into_iter()
        .enumerate()
        .map(|(i, user)| LeaderboardEntry {
            rank: i + 1,
            user_id: user.id,
            name: user.name,
            points_total: user.points_total,
            streak_count: user.streak_count,
        })
        .collect()
}

pub async fn leaderboard(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(ApiError::invalid_field(
            "limit",
            format!("limit must be between 1 and {}", MAX_LIMIT),
        ));
    }

    let user = acting_user(&state, &identity, query.user_id).await?;
    let users = match user.company_id {
        Some(company_id) => state.storage.leaderboard(company_id, limit).await?,
        None => vec![user],
    };

    Ok(Json(entries(users)))
}
