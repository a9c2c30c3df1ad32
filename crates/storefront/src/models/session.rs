//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use marketstall_core::{Email, UserId, UserRole};

use crate::backend::AuthPayload;

/// Session-stored user identity.
///
/// Holds the backend bearer token so user-scoped API calls can be made on
/// the visitor's behalf. `Debug` redacts the token.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Backend user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// User's email address.
    pub email: Email,
    /// Account role; decides which dashboards are reachable.
    pub role: UserRole,
    /// Backend bearer token.
    pub token: String,
}

impl From<AuthPayload> for CurrentUser {
    fn from(payload: AuthPayload) -> Self {
        Self {
            id: payload.user.id,
            name: payload.user.name,
            email: payload.user.email,
            role: payload.user.role,
            token: payload.token,
        }
    }
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the visitor's cart.
    pub const CART: &str = "cart";

    /// Key for the checkout wizard state.
    pub const CHECKOUT: &str = "checkout";

    /// Key for pending toast notifications.
    pub const TOASTS: &str = "toasts";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let user = CurrentUser {
            id: UserId::parse("u1").unwrap(),
            name: "Ada".to_string(),
            email: Email::parse("ada@example.com").unwrap(),
            role: UserRole::Customer,
            token: "eyJhbGciOiJIUzI1NiJ9.secret".to_string(),
        };
        let debug_output = format!("{user:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("eyJhbGciOiJIUzI1NiJ9"));
    }
}
