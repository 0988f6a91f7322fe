//! Resolved caller identity.
//!
//! Authentication happens outside the core; services only ever see an
//! identity the adapter layer has already resolved.

use sharehub_db::entities::user;

/// Role of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Regular account.
    User,
    /// May manage other users' content.
    Moderator,
    /// Full access.
    Admin,
}

/// An authenticated caller (user id + role).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// ID of the calling user.
    pub user_id: String,
    /// Role derived from the account flags.
    pub role: Role,
}

impl CallerIdentity {
    /// Create a caller identity.
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    /// Whether the caller may act on content owned by someone else.
    #[must_use]
    pub const fn is_staff(&self) -> bool {
        matches!(self.role, Role::Moderator | Role::Admin)
    }

    /// Whether the caller owns, or may moderate, content of `owner_id`.
    #[must_use]
    pub fn can_manage(&self, owner_id: &str) -> bool {
        self.user_id == owner_id || self.is_staff()
    }
}

impl From<&user::Model> for CallerIdentity {
    fn from(user: &user::Model) -> Self {
        let role = if user.is_admin {
            Role::Admin
        } else if user.is_moderator {
            Role::Moderator
        } else {
            Role::User
        };
        Self::new(user.id.clone(), role)
    }
}
