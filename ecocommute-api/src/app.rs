/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use ecocommute_api::{app::{self, AppState}, config::Config};
/// use ecocommute_shared::storage::MemoryStorage;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load()?;
/// let identity = app::identity_chain(&config);
/// let state = AppState::new(Arc::new(MemoryStorage::new()), config, identity);
/// let app = app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use ecocommute_shared::{
    auth::identity::{IdentityChain, JwtIdentity, StaticIdentity},
    storage::Storage,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Storage backend chosen at startup
    pub storage: Arc<dyn Storage>,

    /// Application configuration
    pub config: Arc<Config>,

    /// Resolves the caller of each authenticated request
    pub identity: IdentityChain,
}

impl AppState {
    /// Creates new application state
    pub fn new(storage: Arc<dyn Storage>, config: Config, identity: IdentityChain) -> Self {
        Self {
            storage,
            config: Arc::new(config),
            identity,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Identity providers for the configured environment
///
/// Bearer tokens are always accepted. When `auth.dev_user_id` is set,
/// requests without an `Authorization` header act as that user.
pub fn identity_chain(config: &Config) -> IdentityChain {
    let chain = IdentityChain::new().with(JwtIdentity::new(config.jwt.secret.clone()));

    match config.auth.dev_user_id {
        Some(user_id) if !config.api.production => chain.with(StaticIdentity::new(user_id)),
        _ => chain,
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                              # Health check (public)
/// ├── /api/auth/                           # Authentication (public)
/// │   ├── POST /register
/// │   ├── POST /login
/// │   └── POST /refresh
/// └── /api/                                # Authenticated
///     ├── POST /commutes, /commutes/log
///     ├── GET  /commutes/current
///     ├── GET  /user/stats
///     ├── GET  /points/history
///     ├── GET  /challenges, POST /challenges
///     ├── POST /challenges/:id/join
///     ├── GET  /challenges/participations
///     ├── GET  /rewards, POST /rewards
///     ├── GET  /rewards/redemptions
///     ├── POST /rewards/:id/redeem
///     └── GET  /leaderboard
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Identity resolution (authenticated routes only)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public, no auth required)
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    // Everything else needs a caller
    let protected_routes = Router::new()
        .route("/commutes", post(routes::commutes::submit))
        .route("/commutes/log", post(routes::commutes::submit))
        .route("/commutes/current", get(routes::commutes::current))
        .route("/user/stats", get(routes::users::stats))
        .route("/points/history", get(routes::users::points_history))
        .route(
            "/challenges",
            get(routes::challenges::list_challenges).post(routes::challenges::create_challenge),
        )
        .route(
            "/challenges/participations",
            get(routes::challenges::list_participations),
        )
        .route("/challenges/:id/join", post(routes::challenges::join_challenge))
        .route(
            "/rewards",
            get(routes::rewards::list_rewards).post(routes::rewards::create_reward),
        )
        .route("/rewards/redemptions", get(routes::rewards::list_redemptions))
        .route("/rewards/:id/redeem", post(routes::rewards::redeem_reward))
        .route("/leaderboard", get(routes::leaderboard::leaderboard))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_identity,
        ));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(protected_routes);

    // Configure CORS based on environment
    let cors = if state.config.allows_any_origin() {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Identity middleware
///
/// Resolves the caller through the configured [`IdentityChain`] and inserts
/// the resulting [`Identity`](ecocommute_shared::auth::identity::Identity)
/// into request extensions.
async fn require_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = state.identity.resolve(req.headers())?;
    tracing::debug!(user_id = %identity.user_id, source = ?identity.source, "Caller identified");

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn config() -> Config {
        let mut config = Config::default();
        config.jwt.secret = "0123456789abcdef0123456789abcdef".to_string();
        config
    }

    #[test]
    fn test_identity_chain_without_dev_user() {
        assert_eq!(identity_chain(&config()).names(), vec!["jwt"]);
    }

    #[test]
    fn test_identity_chain_with_dev_user() {
        let mut config = config();
        config.auth.dev_user_id = Some(Uuid::new_v4());

        assert_eq!(identity_chain(&config).names(), vec!["jwt", "static"]);
    }

    #[test]
    fn test_dev_user_ignored_in_production() {
        let mut config = config();
        config.auth.dev_user_id = Some(Uuid::new_v4());
        config.api.production = true;

        assert_eq!(identity_chain(&config).names(), vec!["jwt"]);
    }
}
