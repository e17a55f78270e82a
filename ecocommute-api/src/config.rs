/// Configuration management for the API server
///
/// Configuration is layered with the `config` crate:
///
/// 1. Built-in defaults
/// 2. `DATABASE_URL`, used as the default database URL
/// 3. Environment variables prefixed `ECOCOMMUTE`, with `__` between
///    section and key (`ECOCOMMUTE__API__PORT=9000`)
///
/// A `.env` file in the working directory is loaded first when present.
///
/// # Environment Variables
///
/// - `ECOCOMMUTE__API__HOST` / `ECOCOMMUTE__API__PORT`: bind address
///   (default: 0.0.0.0:8080)
/// - `ECOCOMMUTE__API__CORS_ORIGINS`: comma-separated origins, `*` for any
/// - `ECOCOMMUTE__API__PRODUCTION`: enables HSTS and forbids the dev identity
/// - `ECOCOMMUTE__STORAGE__BACKEND`: `memory` (default) or `postgres`
/// - `DATABASE_URL` / `ECOCOMMUTE__DATABASE__URL`: PostgreSQL connection string
/// - `ECOCOMMUTE__JWT__SECRET`: HS256 signing secret (required, ≥ 32 chars)
/// - `ECOCOMMUTE__AUTH__DEV_USER_ID`: act as this user when no token is sent
/// - `ECOCOMMUTE__LOG__JSON`: emit JSON log lines
///
/// # Example
///
/// ```no_run
/// use ecocommute_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::load()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use config::{Environment, Map};
use ecocommute_shared::db::pool::DatabaseConfig;
use serde::Deserialize;
use std::env;
use uuid::Uuid;

/// Minimum JWT secret length in bytes
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub auth: AuthConfig,
    pub log: LogConfig,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `["*"]` allows any origin
    pub cors_origins: Vec<String>,

    /// Production mode
    pub production: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
            production: false,
        }
    }
}

/// Which storage backend to run against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory; data is lost on restart
    #[default]
    Memory,

    Postgres,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

/// JWT configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Identity configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Requests without a bearer token act as this user (development only)
    pub dev_user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// JSON log lines instead of the human-readable format
    pub json: bool,
}

impl Config {
    /// Loads `.env`, then the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a variable has an invalid value or the resulting
    /// configuration fails [`Config::validate`].
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_environment(Environment::with_prefix("ECOCOMMUTE"), env::var("DATABASE_URL").ok())
    }

    /// Loads configuration from an explicit variable map
    ///
    /// Keys use the same names as the process environment
    /// (`ECOCOMMUTE__JWT__SECRET`).
    pub fn from_map(vars: Map<String, String>) -> anyhow::Result<Self> {
        let database_url = vars.get("DATABASE_URL").cloned();
        Self::from_environment(
            Environment::with_prefix("ECOCOMMUTE").source(Some(vars)),
            database_url,
        )
    }

    fn from_environment(source: Environment, database_url: Option<String>) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .set_default("database.url", database_url.unwrap_or_default())?
            .add_source(
                source
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("api.cors_origins"),
            )
            .build()
            .context("Failed to read configuration")?;

        let config: Self = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt.secret.len() < MIN_JWT_SECRET_LEN {
            anyhow::bail!(
                "ECOCOMMUTE__JWT__SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LEN
            );
        }

        if self.storage.backend == StorageBackend::Postgres && self.database.url.is_empty() {
            anyhow::bail!("DATABASE_URL is required when the postgres backend is selected");
        }

        if self.api.production && self.auth.dev_user_id.is_some() {
            anyhow::bail!("ECOCOMMUTE__AUTH__DEV_USER_ID must not be set in production");
        }

        Ok(())
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// True when CORS should allow any origin
    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|o| o == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn vars(pairs: &[(&str, &str)]) -> Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_map(vars(&[("ECOCOMMUTE__JWT__SECRET", SECRET)])).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(config.allows_any_origin());
        assert!(!config.api.production);
        assert!(!config.log.json);
        assert_eq!(config.database.max_connections, 10);
        assert!(config.auth.dev_user_id.is_none());
    }

    #[test]
    fn test_environment_overrides() {
        let dev = Uuid::new_v4();
        let config = Config::from_map(vars(&[
            ("ECOCOMMUTE__JWT__SECRET", SECRET),
            ("ECOCOMMUTE__API__HOST", "127.0.0.1"),
            ("ECOCOMMUTE__API__PORT", "9000"),
            ("ECOCOMMUTE__API__CORS_ORIGINS", "https://a.example,https://b.example"),
            ("ECOCOMMUTE__STORAGE__BACKEND", "postgres"),
            ("ECOCOMMUTE__DATABASE__MAX_CONNECTIONS", "4"),
            ("ECOCOMMUTE__AUTH__DEV_USER_ID", &dev.to_string()),
            ("ECOCOMMUTE__LOG__JSON", "true"),
            ("DATABASE_URL", "postgresql://localhost/eco"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(
            config.api.cors_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert!(!config.allows_any_origin());
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(config.database.url, "postgresql://localhost/eco");
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.auth.dev_user_id, Some(dev));
        assert!(config.log.json);
    }

    #[test]
    fn test_prefixed_database_url_wins() {
        let config = Config::from_map(vars(&[
            ("ECOCOMMUTE__JWT__SECRET", SECRET),
            ("ECOCOMMUTE__DATABASE__URL", "postgresql://primary/eco"),
            ("DATABASE_URL", "postgresql://fallback/eco"),
        ]))
        .unwrap();

        assert_eq!(config.database.url, "postgresql://primary/eco");
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = Config::from_map(vars(&[("ECOCOMMUTE__JWT__SECRET", "short")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_postgres_requires_url() {
        let result = Config::from_map(vars(&[
            ("ECOCOMMUTE__JWT__SECRET", SECRET),
            ("ECOCOMMUTE__STORAGE__BACKEND", "postgres"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_dev_identity_forbidden_in_production() {
        let mut config = Config::default();
        config.jwt.secret = SECRET.to_string();
        config.api.production = true;
        config.auth.dev_user_id = Some(Uuid::new_v4());

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result = Config::from_map(vars(&[
            ("ECOCOMMUTE__JWT__SECRET", SECRET),
            ("ECOCOMMUTE__STORAGE__BACKEND", "sqlite"),
        ]));
        assert!(result.is_err());
    }
}
