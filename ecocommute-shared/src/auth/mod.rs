/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the account password policy
/// - [`jwt`]: HS256 access/refresh tokens
/// - [`identity`]: resolving the calling user from a request
/// - [`authorization`]: acting-user and admin checks

pub mod authorization;
pub mod identity;
pub mod jwt;
pub mod password;
