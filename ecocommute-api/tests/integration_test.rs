/// Integration tests for the EcoCommute API
///
/// These drive the full router over in-memory storage:
/// - Identity resolution and acting-for-another-user rules
/// - Commute submission, merge and validation
/// - Stats, points history and the leaderboard

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::{test_config, token_for, TestContext};
use ecocommute_shared::models::challenge::{CreateChallenge, GoalType};
use ecocommute_shared::models::commute_log::{
    CommuteLog, CommuteType, CreateCommuteLog, WeekDays,
};
use ecocommute_shared::models::user::UserRole;
use ecocommute_shared::storage::Storage;
use serde_json::{json, Value};
use uuid::Uuid;

fn this_week() -> String {
    Utc::now().date_naive().to_string()
}

fn cycling_mon_to_wed() -> Value {
    json!({
        "week_start": this_week(),
        "commute_type": "cycle",
        "days_logged": 3,
        "distance_km": 10.0,
        "monday": true,
        "tuesday": true,
        "wednesday": true
    })
}

#[tokio::test]
async fn test_health_reports_memory_backend() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.send_as(None, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .send_as(None, Method::GET, "/api/user/stats", None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let ctx = TestContext::new().await;

    let (status, _) = ctx
        .send_as(Some("not-a-jwt"), Method::GET, "/api/user/stats", None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_dev_identity_used_without_token() {
    let mut config = test_config();
    let dev_id = Uuid::new_v4();
    config.auth.dev_user_id = Some(dev_id);
    let ctx = TestContext::with_config(config).await;

    // Dev user doesn't exist in storage yet
    let (status, _) = ctx
        .send_as(None, Method::GET, "/api/user/stats", None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A real token still wins over the dev identity
    let (status, body) = ctx.send(Method::GET, "/api/user/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], ctx.user.id.to_string());
}

#[tokio::test]
async fn test_first_submission_creates_log_and_awards_points() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .send(Method::POST, "/api/commutes", Some(cycling_mon_to_wed()))
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["merged"], false);
    assert_eq!(body["points_awarded"], 100);
    assert_eq!(body["log"]["co2_saved_kg"], 6);
    assert_eq!(body["log"]["days_logged"], 3);
    assert_eq!(body["log"]["commute_type"], "cycle");

    let (_, history) = ctx.send(Method::GET, "/api/points/history", None).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["source"], "Weekly commute: cycle");
    assert_eq!(history[0]["points"], 100);
}

#[tokio::test]
async fn test_second_submission_same_week_merges() {
    let ctx = TestContext::new().await;
    ctx.send(Method::POST, "/api/commutes", Some(cycling_mon_to_wed()))
        .await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/commutes/log",
            Some(json!({
                "week_start": this_week(),
                "commute_type": "public_transport",
                "days_logged": 2,
                "distance_km": 10.0,
                "thursday": true,
                "friday": true
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["merged"], true);
    assert_eq!(body["points_awarded"], 0);
    assert_eq!(body["log"]["commute_type"], "public_transport");
    assert_eq!(body["log"]["days_logged"], 5);
    for day in ["monday", "tuesday", "wednesday", "thursday", "friday"] {
        assert_eq!(body["log"][day], true, "{day}");
    }

    let (_, stats) = ctx.send(Method::GET, "/api/user/stats", None).await;
    assert_eq!(stats["points_total"], 100);

    let (_, current) = ctx.send(Method::GET, "/api/commutes/current", None).await;
    assert_eq!(current.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_resubmitting_same_entry_changes_nothing() {
    let ctx = TestContext::new().await;
    ctx.send(Method::POST, "/api/commutes", Some(cycling_mon_to_wed()))
        .await;

    let (status, body) = ctx
        .send(Method::POST, "/api/commutes", Some(cycling_mon_to_wed()))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["log"]["days_logged"], 3);

    let user = ctx.storage.get_user(ctx.user.id).await.unwrap().unwrap();
    assert_eq!(user.points_total, 100);
}

#[tokio::test]
async fn test_submission_validation_errors() {
    let ctx = TestContext::new().await;

    let cases = [
        json!({ "week_start": this_week(), "commute_type": "bus", "days_logged": 0, "distance_km": 1.0 }),
        json!({ "week_start": "2025-13-40", "commute_type": "walk", "days_logged": 0, "distance_km": 1.0 }),
        json!({ "week_start": this_week(), "commute_type": "walk", "days_logged": 0, "distance_km": -1.0 }),
        json!({ "week_start": this_week(), "commute_type": "walk", "days_logged": 8, "distance_km": 1.0 }),
        json!({ "week_start": this_week(), "commute_type": "walk", "days_logged": 2, "distance_km": 1.0, "monday": true }),
    ];

    for case in cases {
        let (status, body) = ctx.send(Method::POST, "/api/commutes", Some(case.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{case} -> {body}");
        assert_eq!(body["error"], "validation_error");
        assert!(body["details"].as_array().is_some_and(|d| !d.is_empty()));
    }
}

#[tokio::test]
async fn test_day_count_mismatch_names_field() {
    let ctx = TestContext::new().await;

    let (_, body) = ctx
        .send(
            Method::POST,
            "/api/commutes",
            Some(json!({
                "week_start": this_week(),
                "commute_type": "walk",
                "days_logged": 2,
                "distance_km": 1.0,
                "monday": true
            })),
        )
        .await;

    assert_eq!(body["details"][0]["field"], "days_logged");
}

async fn seed_log(ctx: &TestContext, days_ago: i64) -> CommuteLog {
    ctx.storage
        .create_commute_log(CreateCommuteLog {
            user_id: ctx.user.id,
            week_start: Utc::now().date_naive() - Duration::days(days_ago),
            commute_type: CommuteType::Walk,
            days_logged: 1,
            distance_km: 2.0,
            co2_saved_kg: 0,
            days: WeekDays::from_array([true, false, false, false, false, false, false]),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_current_lists_last_30_days_newest_first() {
    let ctx = TestContext::new().await;
    let older = seed_log(&ctx, 29).await;
    seed_log(&ctx, 31).await;
    let newer = seed_log(&ctx, 3).await;

    let (status, body) = ctx.send(Method::GET, "/api/commutes/current", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|log| log["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![newer.id.to_string(), older.id.to_string()]);
}

#[tokio::test]
async fn test_current_for_other_user_requires_admin() {
    let ctx = TestContext::new().await;
    seed_log(&ctx, 3).await;
    let colleague = ctx.add_user("colleague@acme.com", UserRole::User).await;
    let uri = format!("/api/commutes/current?userId={}", ctx.user.id);

    let (status, _) = ctx
        .send_as(Some(&token_for(&colleague)), Method::GET, &uri, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = ctx.add_user("admin@acme.com", UserRole::Admin).await;
    let (status, body) = ctx
        .send_as(Some(&token_for(&admin)), Method::GET, &uri, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_acting_for_other_user_requires_admin() {
    let ctx = TestContext::new().await;
    let colleague = ctx.add_user("colleague@acme.com", UserRole::User).await;

    let mut submission = cycling_mon_to_wed();
    submission["user_id"] = json!(colleague.id);
    let (status, body) = ctx.send(Method::POST, "/api/commutes", Some(submission)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let uri = format!("/api/user/stats?userId={}", colleague.id);
    let (status, _) = ctx.send(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Naming yourself is always allowed
    let uri = format!("/api/user/stats?userId={}", ctx.user.id);
    let (status, _) = ctx.send(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_can_act_for_other_user() {
    let ctx = TestContext::new().await;
    let admin = ctx.add_user("admin@acme.com", UserRole::Admin).await;
    let admin_token = token_for(&admin);

    let mut submission = cycling_mon_to_wed();
    submission["user_id"] = json!(ctx.user.id);
    let (status, _) = ctx
        .send_as(Some(&admin_token), Method::POST, "/api/commutes", Some(submission))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let user = ctx.storage.get_user(ctx.user.id).await.unwrap().unwrap();
    assert_eq!(user.points_total, 100);

    let uri = format!("/api/user/stats?userId={}", Uuid::new_v4());
    let (status, _) = ctx
        .send_as(Some(&admin_token), Method::GET, &uri, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submission_completes_joined_challenge() {
    let ctx = TestContext::new().await;
    let today = Utc::now().date_naive();
    let challenge = ctx
        .storage
        .create_challenge(CreateChallenge {
            company_id: Some(ctx.company.id),
            title: "Three green days".to_string(),
            description: None,
            start_date: today,
            end_date: today,
            goal_type: GoalType::Days,
            goal_value: 3.0,
            commute_type: None,
            points_reward: 40,
        })
        .await
        .unwrap();

    let uri = format!("/api/challenges/{}/join", challenge.id);
    let (status, _) = ctx.send(Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = ctx
        .send(Method::POST, "/api/commutes", Some(cycling_mon_to_wed()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["completed_challenges"], json!([challenge.id]));
    assert_eq!(body["challenge_points_awarded"], 40);

    let (_, stats) = ctx.send(Method::GET, "/api/user/stats", None).await;
    assert_eq!(stats["points_total"], 140);
    assert_eq!(stats["challenges_completed"], 1);
    assert_eq!(stats["total_co2_saved_kg"], 6);

    let (_, participations) = ctx
        .send(Method::GET, "/api/challenges/participations", None)
        .await;
    assert_eq!(participations[0]["completed"], true);
    assert_eq!(participations[0]["progress"], 3.0);
}

#[tokio::test]
async fn test_leaderboard_orders_company_by_points() {
    let ctx = TestContext::new().await;
    let leader = ctx.add_user("leader@acme.com", UserRole::User).await;
    ctx.storage.award_points(leader.id, "Seed", 500).await.unwrap();
    ctx.storage.award_points(ctx.user.id, "Seed", 50).await.unwrap();

    let (status, body) = ctx.send(Method::GET, "/api/leaderboard?limit=5", None).await;
    assert_eq!(status, StatusCode::OK);

    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["user_id"], leader.id.to_string());
    assert_eq!(entries[0]["rank"], 1);
    assert_eq!(entries[1]["user_id"], ctx.user.id.to_string());

    let (status, _) = ctx.send(Method::GET, "/api/leaderboard?limit=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_leaderboard_for_user_without_company() {
    let ctx = TestContext::new().await;
    let solo = ctx
        .storage
        .create_user(ecocommute_shared::models::user::CreateUser {
            email: "solo@gmail.com".to_string(),
            password_hash: String::new(),
            name: None,
            company_id: None,
            role: UserRole::User,
        })
        .await
        .unwrap();

    let (status, body) = ctx
        .send_as(Some(&token_for(&solo)), Method::GET, "/api/leaderboard", None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["user_id"], solo.id.to_string());
}

#[tokio::test]
async fn test_security_headers_on_api_responses() {
    let ctx = TestContext::new().await;

    let response = {
        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt;

        ctx.app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap()
    };

    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
}
