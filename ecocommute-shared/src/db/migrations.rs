/// Embedded schema migrations
///
/// The SQL files under `ecocommute-shared/migrations/` are compiled into the
/// binary with `sqlx::migrate!` and applied at startup when the PostgreSQL
/// backend is selected.

use sqlx::postgres::PgPool;
use tracing::{info, warn};

/// Applies every pending migration
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");

    match sqlx::migrate!("./migrations").run(pool).await {
        Ok(()) => {
            info!("Database schema is up to date");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Migration failed");
            Err(e)
        }
    }
}

/// Number of migrations bundled into this build
pub fn bundled_migrations() -> usize {
    sqlx::migrate!("./migrations").iter().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_bundled() {
        assert!(bundled_migrations() >= 1);
    }
}
