/// Middleware modules for the API server
///
/// - `security`: response security headers
///
/// Identity resolution lives in [`crate::app`] next to the routes it guards.

pub mod security;
