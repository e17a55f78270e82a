/// PostgreSQL plumbing
///
/// - `pool`: connection pool creation and health check
/// - `migrations`: embedded schema migrations
///
/// Queries live next to their row types in [`crate::models`].

pub mod migrations;
pub mod pool;
