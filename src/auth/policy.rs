//! Role model and the central authorization policy.
//!
//! Every role-gated action is decided here rather than per-endpoint, so the
//! policy can be reviewed and tested without the transport layer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Basic,
    Admin,
    Manager,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Admin => "admin",
            Self::Manager => "manager",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "basic" => Some(Self::Basic),
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions the auth core gates on role. Downstream review/comment moderation
/// consults the same table through its own action variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    ChangeOwnPassword,
    ModerateReviews,
    ManageUsers,
}

#[must_use]
pub const fn can_perform(role: Role, action: AuthAction) -> bool {
    match action {
        AuthAction::ChangeOwnPassword => true,
        AuthAction::ModerateReviews => matches!(role, Role::Admin | Role::Manager),
        AuthAction::ManageUsers => matches!(role, Role::Admin),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_role_may_change_own_password() {
        for role in [Role::Basic, Role::Admin, Role::Manager] {
            assert!(can_perform(role, AuthAction::ChangeOwnPassword));
        }
    }

    #[test]
    fn moderation_requires_elevated_role() {
        assert!(!can_perform(Role::Basic, AuthAction::ModerateReviews));
        assert!(can_perform(Role::Manager, AuthAction::ModerateReviews));
        assert!(can_perform(Role::Admin, AuthAction::ModerateReviews));
    }

    #[test]
    fn only_admin_manages_users() {
        assert!(can_perform(Role::Admin, AuthAction::ManageUsers));
        assert!(!can_perform(Role::Manager, AuthAction::ManageUsers));
        assert!(!can_perform(Role::Basic, AuthAction::ManageUsers));
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Basic, Role::Admin, Role::Manager] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }
}
