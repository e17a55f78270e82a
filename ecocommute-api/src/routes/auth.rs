/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Register new user
/// - `POST /api/auth/login` - Login and get tokens
/// - `POST /api/auth/refresh` - Refresh access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use ecocommute_shared::{
    auth::{jwt, password},
    models::{
        company::email_domain,
        user::{CreateUser, User, UserRole},
    },
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Checked against the password policy separately
    pub password: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

/// Issued on register and login
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

fn issue_tokens(state: &AppState, user: User) -> ApiResult<AuthResponse> {
    let access_claims = jwt::Claims::new(user.id, user.company_id, jwt::TokenType::Access);
    let refresh_claims = jwt::Claims::new(user.id, user.company_id, jwt::TokenType::Refresh);

    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;
    let refresh_token = jwt::create_token(&refresh_claims, state.jwt_secret())?;

    Ok(AuthResponse {
        user,
        access_token,
        refresh_token,
    })
}

/// Register a new user
///
/// The user joins the company whose `domain` matches their email domain,
/// if one exists.
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/register
/// Content-Type: application/json
///
/// {
///   "email": "rider@acme.com",
///   "password": "pedal2work",
///   "name": "Robin Rider"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Email already registered
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let Json(req) = payload?;
    req.validate()?;
    password::check_password_policy(&req.password)
        .map_err(|msg| ApiError::invalid_field("password", msg))?;

    let company_id = match email_domain(&req.email) {
        Some(domain) => state
            .storage
            .get_company_by_domain(&domain)
            .await?
            .map(|company| company.id),
        None => None,
    };

    let password_hash = password::hash_password(&req.password)?;
    let user = state
        .storage
        .create_user(CreateUser {
            email: req.email,
            password_hash,
            name: req.name,
            company_id,
            role: UserRole::User,
        })
        .await?;

    tracing::info!(user_id = %user.id, company_id = ?company_id, "User registered");

    Ok((StatusCode::CREATED, Json(issue_tokens(&state, user)?)))
}

/// Login endpoint
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Invalid credentials
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let user = state
        .storage
        .get_user_by_email(&req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    // Seeded users without a password can't log in
    if user.password_hash.is_empty()
        || !password::verify_password(&req.password, &user.password_hash)?
    {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    tracing::debug!(user_id = %user.id, "User logged in");
    Ok(Json(issue_tokens(&state, user)?))
}

/// Exchanges a refresh token for a new access token
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<RefreshResponse>> {
    let Json(req) = payload?;
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access_token }))
}
