//! Marketstall Storefront library.
//!
//! Server-rendered storefront over the Marketstall backend REST API:
//! catalog, session cart, checkout wizard, customer account and the
//! seller and admin dashboards. Exposed as a library so the router can be
//! driven from integration tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;

use std::future::Future;
use std::net::SocketAddr;

use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, header::CACHE_CONTROL},
    middleware::{Next, from_fn},
};
use tokio::net::TcpListener;
use tower::Layer;
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tower_sessions::SessionStore;

use crate::state::AppState;

/// Cache policy for files under `/static`.
const STATIC_CACHE_CONTROL: &str = "public, max-age=3600";

/// Build the full application router.
///
/// Layers, outermost first: Sentry, request tracing, request ID, security
/// headers, CSP nonce, session. The session store is a parameter so tests
/// can use `MemoryStore` in place of `PostgreSQL`.
pub fn app<S>(state: AppState, store: S) -> Router
where
    S: SessionStore + Clone,
{
    let secure = state.config().is_secure();
    let static_files = SetResponseHeaderLayer::if_not_present(
        CACHE_CONTROL,
        HeaderValue::from_static(STATIC_CACHE_CONTROL),
    )
    .layer(ServeDir::new(&state.config().static_dir));

    routes::routes()
        .nest_service("/static", static_files)
        .layer(middleware::create_session_layer(store, secure))
        .layer(from_fn(middleware::csp_nonce_middleware))
        .layer(from_fn(move |request: Request, next: Next| {
            middleware::security_headers_middleware(secure, request, next)
        }))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Serve the application until `shutdown` resolves.
///
/// Client addresses are made available as `ConnectInfo` for rate limiting.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}
