//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//! GET  /health                 - Liveness probe
//! GET  /health/ready           - Readiness probe (backend reachable)
//!
//! # Products
//! GET  /products               - Catalog (search, category, sort, page)
//! GET  /products/{id}          - Product detail
//! POST /products/{id}/reviews  - Submit a review (auth)
//!
//! # Cart (HTMX fragments, redirects without JS)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart (returns badge, triggers cart-updated)
//! POST /cart/update            - Set quantity (returns cart_items fragment)
//! POST /cart/increment         - One more unit
//! POST /cart/decrement         - One fewer unit (never below 1)
//! POST /cart/remove            - Remove line
//! POST /cart/clear             - Empty the cart
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout (auth)
//! GET  /checkout               - Resume at the current step
//! GET  /checkout/shipping      - Shipping form
//! POST /checkout/shipping      - Submit shipping
//! GET  /checkout/payment       - Payment method form
//! POST /checkout/payment       - Submit payment method
//! GET  /checkout/review        - Order review
//! POST /checkout/back          - Previous step
//! POST /checkout/place         - Place the order
//! GET  /checkout/confirmation/{order_id} - Confirmation
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! GET  /auth/register          - Register page
//! POST /auth/register          - Register action
//! POST /auth/logout            - Logout action
//!
//! # Account (auth)
//! GET  /account                - Profile and recent orders
//! GET  /account/orders         - Order history
//! GET  /account/orders/{id}    - Order detail
//! GET  /account/wishlist       - Wishlist
//! POST /account/wishlist/{product_id}        - Add to wishlist
//! POST /account/wishlist/{product_id}/remove - Remove from wishlist
//!
//! # Seller dashboard (seller or admin)
//! GET  /seller                 - Stats and recent orders
//! GET  /seller/products        - Listed products
//! GET  /seller/orders          - Orders with status controls
//! POST /seller/orders/{id}/status - Update order status
//!
//! # Admin dashboard (admin)
//! GET  /admin                  - Store-wide stats
//! GET  /admin/users            - All users
//! GET  /admin/orders           - All orders
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod health;
pub mod home;
pub mod products;
pub mod seller;

use axum::{
    Router,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_sessions::Session;

use crate::backend::ApiError;
use crate::error::AppError;
use crate::middleware::{Page, auth_rate_limiter, clear_current_user, mutation_rate_limiter};
use crate::models::Toast;
use crate::state::AppState;

// =============================================================================
// Backend failure handling
// =============================================================================

/// Drop the signed-in user when the backend rejected their token.
async fn expire_session(session: &Session, message: String) -> AppError {
    tracing::info!(reason = %message, "Backend rejected session token, signing out");
    if let Err(e) = clear_current_user(session).await {
        return AppError::Session(e);
    }
    AppError::Unauthorized(message)
}

/// Unwrap a backend read for a page, degrading to an empty value plus an
/// error toast when the backend is unavailable.
///
/// An expired token signs the visitor out and redirects to login.
pub(crate) async fn recover<T: Default>(
    session: &Session,
    page: &mut Page,
    result: Result<T, ApiError>,
) -> Result<T, AppError> {
    match result {
        Ok(value) => Ok(value),
        Err(ApiError::Unauthorized(message)) => Err(expire_session(session, message).await),
        Err(e) => {
            tracing::warn!(error = %e, "Backend read failed, rendering without data");
            page.toasts.push(Toast::error(e.user_message()));
            Ok(T::default())
        }
    }
}

/// Unwrap a backend read the page cannot render without.
///
/// An expired token signs the visitor out; other errors become `AppError`.
pub(crate) async fn require<T>(session: &Session, result: Result<T, ApiError>) -> Result<T, AppError> {
    match result {
        Ok(value) => Ok(value),
        Err(ApiError::Unauthorized(message)) => Err(expire_session(session, message).await),
        Err(e) => Err(e.into()),
    }
}

/// Report a failed backend write as a toast and send the visitor back.
pub(crate) async fn write_failed(
    session: &Session,
    err: ApiError,
    back_to: &str,
) -> Result<Response, AppError> {
    if let ApiError::Unauthorized(message) = err {
        return Err(expire_session(session, message).await);
    }
    tracing::warn!(error = %err, "Backend write failed");
    Toast::error(err.user_message()).push(session).await;
    Ok(Redirect::to(back_to).into_response())
}

// =============================================================================
// Routers
// =============================================================================

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
        .route(
            "/{id}/reviews",
            post(products::create_review).route_layer(mutation_rate_limiter()),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    let mutations = Router::new()
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/increment", post(cart::increment))
        .route("/decrement", post(cart::decrement))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route_layer(mutation_rate_limiter());

    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .merge(mutations)
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    let mutations = Router::new()
        .route("/back", post(checkout::back))
        .route("/place", post(checkout::place))
        .route_layer(mutation_rate_limiter());

    Router::new()
        .route("/", get(checkout::index))
        .route(
            "/shipping",
            get(checkout::shipping_page).post(checkout::submit_shipping),
        )
        .route(
            "/payment",
            get(checkout::payment_page).post(checkout::submit_payment),
        )
        .route("/review", get(checkout::review_page))
        .route("/confirmation/{order_id}", get(checkout::confirmation))
        .merge(mutations)
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            get(auth::login_page).merge(post(auth::login).route_layer(auth_rate_limiter())),
        )
        .route(
            "/register",
            get(auth::register_page).merge(post(auth::register).route_layer(auth_rate_limiter())),
        )
        .route("/logout", post(auth::logout))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order_detail))
        .route("/wishlist", get(account::wishlist))
        .route("/wishlist/{product_id}", post(account::add_to_wishlist))
        .route(
            "/wishlist/{product_id}/remove",
            post(account::remove_from_wishlist),
        )
}

/// Create the seller dashboard routes router.
pub fn seller_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(seller::dashboard))
        .route("/products", get(seller::products))
        .route("/orders", get(seller::orders))
        .route("/orders/{id}/status", post(seller::update_status))
}

/// Create the admin dashboard routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::dashboard))
        .route("/users", get(admin::users))
        .route("/orders", get(admin::orders))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
        .nest("/seller", seller_routes())
        .nest("/admin", admin_routes())
        .fallback(not_found)
}

/// Fallback for unknown paths.
async fn not_found() -> AppError {
    AppError::NotFound("page".to_string())
}
