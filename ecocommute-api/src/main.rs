//! # EcoCommute API Server
//!
//! Loads configuration, selects the storage backend, builds the identity
//! chain and serves the router until Ctrl-C.
//!
//! ## Usage
//!
//! ```bash
//! ECOCOMMUTE__JWT__SECRET=$(openssl rand -hex 32) cargo run -p ecocommute-api
//! ```

use chrono::Utc;
use ecocommute_api::{
    app::{self, AppState},
    config::{Config, LogConfig, StorageBackend},
};
use ecocommute_shared::{
    db::{migrations::run_migrations, pool::create_pool},
    models::user::{User, UserRole},
    storage::{MemoryStorage, PgStorage, Storage},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

const DEFAULT_LOG_FILTER: &str = "ecocommute_api=debug,ecocommute_shared=debug,tower_http=debug";

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if log.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Row for the configured development identity
fn dev_user(id: Uuid) -> User {
    let now = Utc::now();
    User {
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
    }
}

async fn open_storage(config: &Config) -> anyhow::Result<Arc<dyn Storage>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            let storage = MemoryStorage::new();
            if let Some(id) = config.auth.dev_user_id {
                storage.seed_user(dev_user(id)).await;
                tracing::info!(user_id = %id, "Seeded development user");
            }
            Ok(Arc::new(storage))
        }
        StorageBackend::Postgres => {
            let pool = create_pool(config.database.clone()).await?;
            run_migrations(&pool).await?;
            let storage = PgStorage::new(pool);

            if let Some(id) = config.auth.dev_user_id {
                if storage.get_user(id).await?.is_none() {
                    tracing::warn!(user_id = %id, "Development user does not exist in the database");
                }
            }
            Ok(Arc::new(storage))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received, draining connections...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    init_tracing(&config.log);

    tracing::info!(
        "EcoCommute API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let storage = open_storage(&config).await?;
    let identity = app::identity_chain(&config);
    tracing::info!(
        storage = storage.backend_name(),
        identity = ?identity.names(),
        "Backends ready"
    );

    let address = config.bind_address();
    let state = AppState::new(storage, config, identity);
    let router = app::build_router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
