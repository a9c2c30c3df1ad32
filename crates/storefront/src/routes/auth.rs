//! Authentication route handlers.
//!
//! Handles login, registration and logout against the backend's
//! `/auth/*` endpoints. The returned bearer token is kept in the session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use marketstall_core::{Email, UserRole};

use crate::backend::{ApiError, AuthPayload, LoginRequest, RegisterRequest};
use crate::error::{Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, Page, clear_current_user, safe_next, set_current_user};
use crate::models::{Checkout, CurrentUser, Toast};
use crate::state::AppState;

/// Shortest password accepted at registration.
const MIN_PASSWORD_CHARS: usize = 8;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
    /// Checkbox; present only when ticked.
    pub seller: Option<String>,
    pub next: Option<String>,
}

impl RegisterForm {
    /// Check the form and build the backend request.
    ///
    /// # Errors
    ///
    /// Returns a message suitable for display next to the form.
    pub fn validate(&self) -> std::result::Result<RegisterRequest, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Please enter your name".to_string());
        }
        let email = Email::parse(self.email.trim()).map_err(|e| e.to_string())?;
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(format!(
                "Password must be at least {MIN_PASSWORD_CHARS} characters"
            ));
        }
        if self.password != self.password_confirm {
            return Err("Passwords do not match".to_string());
        }

        Ok(RegisterRequest {
            name: name.to_string(),
            email,
            password: self.password.clone(),
            role: if self.seller.is_some() {
                UserRole::Seller
            } else {
                UserRole::Customer
            },
        })
    }
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters of the login and register pages.
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    pub next: Option<String>,
    /// Set when the visitor was signed out because their token expired.
    pub expired: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: Page,
    pub next: String,
    pub email: String,
    pub error: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: Page,
    pub next: String,
    pub name: String,
    pub email: String,
    pub seller: bool,
    pub error: Option<String>,
}

/// Where to go after signing in.
fn landing(next: Option<&str>) -> String {
    safe_next(next).unwrap_or("/").to_string()
}

/// Store the signed-in user and tag Sentry events with them.
async fn sign_in(session: &Session, payload: AuthPayload) -> Result<CurrentUser> {
    let user = CurrentUser::from(payload);
    set_current_user(session, &user).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(user)
}

/// Message shown when the backend refuses a login or registration.
fn rejection_message(err: &ApiError) -> String {
    match err {
        ApiError::Unauthorized(_) => "Invalid email or password".to_string(),
        other => other.user_message(),
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
#[instrument(skip_all)]
pub async fn login_page(
    session: Session,
    mut page: Page,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<AuthQuery>,
) -> Response {
    if user.is_some() {
        page.keep_toasts(&session).await;
        return Redirect::to(&landing(query.next.as_deref())).into_response();
    }
    if query.expired.is_some() {
        page.toasts
            .push(Toast::info("Your session has expired. Please sign in again."));
    }

    LoginTemplate {
        page,
        next: landing(query.next.as_deref()),
        email: String::new(),
        error: None,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    page: Page,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let next = landing(form.next.as_deref());
    let fail = |page: Page, status: StatusCode, error: String| {
        (
            status,
            LoginTemplate {
                page,
                next: next.clone(),
                email: form.email.trim().to_string(),
                error: Some(error),
            },
        )
            .into_response()
    };

    let Ok(email) = Email::parse(form.email.trim()) else {
        return Ok(fail(
            page,
            StatusCode::UNPROCESSABLE_ENTITY,
            "Please enter a valid email address".to_string(),
        ));
    };
    if form.password.is_empty() {
        return Ok(fail(
            page,
            StatusCode::UNPROCESSABLE_ENTITY,
            "Please enter your password".to_string(),
        ));
    }

    let request = LoginRequest {
        email,
        password: form.password.clone(),
    };
    let payload = match state.api().login(&request).await {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            let status = match e {
                ApiError::Unauthorized(_) | ApiError::Rejected { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::BAD_GATEWAY,
            };
            return Ok(fail(page, status, rejection_message(&e)));
        }
    };

    let user = sign_in(&session, payload).await?;
    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");
    add_breadcrumb("auth", "Logged in", None);
    page.keep_toasts(&session).await;
    Toast::success(format!("Welcome back, {}!", user.name))
        .push(&session)
        .await;

    Ok(Redirect::to(&next).into_response())
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
#[instrument(skip_all)]
pub async fn register_page(
    session: Session,
    page: Page,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<AuthQuery>,
) -> Response {
    if user.is_some() {
        page.keep_toasts(&session).await;
        return Redirect::to(&landing(query.next.as_deref())).into_response();
    }

    RegisterTemplate {
        page,
        next: landing(query.next.as_deref()),
        name: String::new(),
        email: String::new(),
        seller: false,
        error: None,
    }
    .into_response()
}

/// Handle registration form submission.
///
/// The backend signs the new account in straight away.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    page: Page,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let next = landing(form.next.as_deref());
    let fail = |page: Page, status: StatusCode, error: String| {
        (
            status,
            RegisterTemplate {
                page,
                next: next.clone(),
                name: form.name.trim().to_string(),
                email: form.email.trim().to_string(),
                seller: form.seller.is_some(),
                error: Some(error),
            },
        )
            .into_response()
    };

    let request = match form.validate() {
        Ok(request) => request,
        Err(message) => return Ok(fail(page, StatusCode::UNPROCESSABLE_ENTITY, message)),
    };

    let payload = match state.api().register(&request).await {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, "Registration failed");
            let status = if matches!(e, ApiError::Rejected { status, .. } if status.is_client_error()) {
                StatusCode::UNPROCESSABLE_ENTITY
            } else {
                StatusCode::BAD_GATEWAY
            };
            return Ok(fail(page, status, rejection_message(&e)));
        }
    };

    let user = sign_in(&session, payload).await?;
    tracing::info!(user_id = %user.id, role = %user.role, "User registered");
    add_breadcrumb("auth", "Registered", None);
    page.keep_toasts(&session).await;
    Toast::success(format!("Welcome to {}, {}!", state.config().store_name, user.name))
        .push(&session)
        .await;

    Ok(Redirect::to(&next).into_response())
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout.
///
/// Drops the user and any checkout in progress; the cart is kept.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<Response> {
    clear_current_user(&session).await?;
    Checkout::clear(&session).await?;
    clear_sentry_user();
    add_breadcrumb("auth", "Logged out", None);

    Toast::info("You have been signed out.").push(&session).await;
    Ok(Redirect::to("/").into_response())
}
