/// Authorization checks
///
/// Two rules cover the whole API:
///
/// 1. A user may act on their own data; acting on another user's data
///    requires the admin role
/// 2. Creating challenges requires the admin role
///
/// # Example
///
/// ```
/// use ecocommute_shared::auth::authorization::ensure_can_act_for;
/// # use ecocommute_shared::models::user::{User, UserRole};
/// # use chrono::Utc;
/// # use uuid::Uuid;
/// # let caller = User {
/// #     id: Uuid::new_v4(), email: "a@b.c".into(), password_hash: String::new(),
/// #     name: None, company_id: None, points_total: 0, streak_count: 0,
/// #     role: UserRole::User, created_at: Utc::now(), updated_at: Utc::now(),
/// # };
///
/// assert!(ensure_can_act_for(&caller, caller.id).is_ok());
/// assert!(ensure_can_act_for(&caller, Uuid::new_v4()).is_err());
/// ```

use uuid::Uuid;

use crate::models::user::User;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Caller tried to act for someone else
    #[error("Not allowed to act on behalf of user {0}")]
    ActingForOther(Uuid),

    /// Operation requires the admin role
    #[error("Admin role required")]
    AdminRequired,
}

/// Allows the caller to act for `target`
pub fn ensure_can_act_for(caller: &User, target: Uuid) -> Result<(), AuthzError> {
    if caller.id == target || caller.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::ActingForOther(target))
    }
}

pub fn require_admin(caller: &User) -> Result<(), AuthzError> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::AdminRequired)
    }
}
