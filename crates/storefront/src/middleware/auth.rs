//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a signed-in user, optionally with a
//! seller or admin role, in route handlers.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{HeaderValue, Method, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use marketstall_core::UserRole;
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

use super::htmx::is_htmx;

/// Extractor that requires a signed-in user.
///
/// If the visitor is not logged in, returns a redirect to the login page with
/// a `next` parameter pointing back at the requested page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires the seller or admin role.
pub struct RequireSeller(pub CurrentUser);

/// Extractor that requires the admin role.
pub struct RequireAdmin(pub CurrentUser);

/// Error returned when authentication is required but the visitor is not logged in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page (for page requests).
    RedirectToLogin {
        /// Local path to return to after login.
        next: Option<String>,
        /// Whether the request came from HTMX and needs `HX-Redirect`.
        htmx: bool,
    },
    /// Unauthorized response (no session available).
    Unauthorized,
    /// Signed in, but the role does not grant access.
    Forbidden,
}

impl AuthRejection {
    fn login_url(next: Option<&str>) -> String {
        next.map_or_else(
            || "/auth/login".to_string(),
            |next| format!("/auth/login?next={}", urlencoding::encode(next)),
        )
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next, htmx } => {
                let url = Self::login_url(next.as_deref());
                if htmx {
                    // HTMX swaps the body of fetch responses; ask it to navigate instead
                    match HeaderValue::from_str(&url) {
                        Ok(value) => {
                            (StatusCode::UNAUTHORIZED, [("HX-Redirect", value)]).into_response()
                        }
                        Err(_) => StatusCode::UNAUTHORIZED.into_response(),
                    }
                } else {
                    Redirect::to(&url).into_response()
                }
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                "You do not have access to this page",
            )
                .into_response(),
        }
    }
}

/// Read the signed-in user from the session in request extensions.
async fn session_user(parts: &Parts) -> Result<Option<CurrentUser>, AuthRejection> {
    // Get the session from extensions (set by SessionManagerLayer)
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::Unauthorized)?;

    Ok(session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten())
}

/// Path to return to after login. Only page loads are resumable; a form
/// post cannot be replayed after the redirect.
fn return_path(parts: &Parts) -> Option<String> {
    // Nested routers see a stripped URI
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |original| &original.0);
    (parts.method == Method::GET)
        .then(|| uri.path_and_query().map(ToString::to_string))
        .flatten()
}

async fn require_user(parts: &Parts) -> Result<CurrentUser, AuthRejection> {
    session_user(parts)
        .await?
        .ok_or_else(|| AuthRejection::RedirectToLogin {
            next: return_path(parts),
            htmx: is_htmx(&parts.headers),
        })
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_user(parts).await.map(Self)
    }
}

impl<S> FromRequestParts<S> for RequireSeller
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = require_user(parts).await?;
        if !user.role.can_sell() {
            tracing::warn!(user_id = %user.id, role = %user.role, "Seller dashboard denied");
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = require_user(parts).await?;
        if user.role != UserRole::Admin {
            tracing::warn!(user_id = %user.id, role = %user.role, "Admin dashboard denied");
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if the visitor is not logged in.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(
///     OptionalAuth(user): OptionalAuth,
/// ) -> impl IntoResponse {
///     match user {
///         Some(u) => format!("Hello, {}!", u.name),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await.ok().flatten()))
    }
}

/// Helper to set the current user in the session.
///
/// Cycles the session ID first so a pre-login session cannot be fixated.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

/// Accept a post-login redirect target only if it stays on this site.
#[must_use]
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|path| path.starts_with('/') && !path.starts_with("//") && !path.contains('\\'))
}
