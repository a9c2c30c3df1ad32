//! Shared layout context.
//!
//! Every full page renders the same navbar and footer: store name, cart
//! badge, signed-in user and pending toasts. `Page` gathers those once per
//! request so handlers only build their own content.

use std::borrow::Borrow;

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::request::Parts,
};
use chrono::{DateTime, Utc};
use marketstall_core::{CurrencyCode, Price};
use rust_decimal::Decimal;
use tower_sessions::Session;

use crate::models::{Cart, CurrentUser, Toast, session_keys};
use crate::state::AppState;

use super::csp::CspNonce;

/// Layout data for a full page render.
///
/// Extracting `Page` consumes the pending toasts, so only extract it in
/// handlers that render a page.
#[derive(Debug, Clone)]
pub struct Page {
    /// CSP nonce for inline scripts.
    pub nonce: String,
    /// Store name for the navbar, footer and `<title>`.
    pub store_name: String,
    /// Signed-in user, if any.
    pub user: Option<CurrentUser>,
    /// Number of units in the cart (navbar badge).
    pub cart_count: u32,
    /// Toasts queued by earlier requests.
    pub toasts: Vec<Toast>,
    /// Currency for price display.
    pub currency: CurrencyCode,
    /// Request path, used to highlight the active nav link.
    pub path: String,
}

impl Page {
    /// Format an amount in the store currency.
    #[must_use]
    pub fn money(&self, amount: impl Borrow<Decimal>) -> String {
        Price::new(*amount.borrow(), self.currency).to_string()
    }

    /// Format an optional timestamp as a short date.
    #[must_use]
    pub fn date(&self, at: impl Borrow<Option<DateTime<Utc>>>) -> String {
        at.borrow()
            .map_or_else(|| "-".to_string(), |at| at.format("%b %-d, %Y").to_string())
    }

    /// Put the toasts back in the session when redirecting instead of
    /// rendering, so they show on the next page.
    pub async fn keep_toasts(self, session: &Session) {
        for toast in self.toasts {
            toast.push(session).await;
        }
    }

    /// Whether the signed-in user may open the seller dashboard.
    #[must_use]
    pub fn is_seller(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.role.can_sell())
    }

    /// Whether the signed-in user may open the admin dashboard.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.role.is_admin())
    }

    /// Whether `prefix` is the active section.
    #[must_use]
    pub fn is_active(&self, prefix: &str) -> bool {
        if prefix == "/" {
            self.path == "/"
        } else {
            self.path.starts_with(prefix)
        }
    }
}

impl FromRequestParts<AppState> for Page {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let nonce = CspNonce::from_request_parts(parts, state).await?.0;

        let (user, cart_count, toasts) = match parts.extensions.get::<Session>() {
            Some(session) => {
                let user = session
                    .get::<CurrentUser>(session_keys::CURRENT_USER)
                    .await
                    .ok()
                    .flatten();
                let cart_count = Cart::load(session).await.item_count();
                let toasts = Toast::take_all(session).await;
                (user, cart_count, toasts)
            }
            None => {
                tracing::warn!("Session not found in request extensions");
                (None, 0, Vec::new())
            }
        };

        Ok(Self {
            nonce,
            store_name: state.config().store_name.clone(),
            user,
            cart_count,
            toasts,
            currency: state.config().checkout.currency,
            path: parts
                .extensions
                .get::<OriginalUri>()
                .map_or(&parts.uri, |original| &original.0)
                .path()
                .to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marketstall_core::{Email, UserId, UserRole};

    use super::*;

    fn page(user: Option<CurrentUser>) -> Page {
        Page {
            nonce: String::new(),
            store_name: "Marketstall".to_string(),
            user,
            cart_count: 0,
            toasts: Vec::new(),
            currency: CurrencyCode::USD,
            path: "/products/p1".to_string(),
        }
    }

    fn user(role: UserRole) -> CurrentUser {
        CurrentUser {
            id: UserId::parse("u1").unwrap(),
            name: "Ada".to_string(),
            email: Email::parse("ada@example.com").unwrap(),
            role,
            token: "t".to_string(),
        }
    }

    #[test]
    fn test_money_uses_store_currency() {
        let amount: Decimal = "1234.5".parse().unwrap();
        assert_eq!(page(None).money(&amount), "$1234.50");
    }

    #[test]
    fn test_date_formatting() {
        use chrono::TimeZone;

        let at = Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();
        assert_eq!(page(None).date(Some(at)), "Mar 7, 2024");
        assert_eq!(page(None).date(None), "-");
    }

    #[test]
    fn test_role_flags() {
        assert!(!page(None).is_seller());
        assert!(!page(Some(user(UserRole::Customer))).is_seller());
        assert!(page(Some(user(UserRole::Seller))).is_seller());
        assert!(!page(Some(user(UserRole::Seller))).is_admin());
        assert!(page(Some(user(UserRole::Admin))).is_seller());
        assert!(page(Some(user(UserRole::Admin))).is_admin());
    }

    #[test]
    fn test_active_section() {
        let page = page(None);
        assert!(page.is_active("/products"));
        assert!(!page.is_active("/"));
        assert!(!page.is_active("/cart"));
    }
}
