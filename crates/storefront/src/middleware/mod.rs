//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (new hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (CSP with nonce, frame and isolation headers)
//! 5. CSP nonce (generate per-request nonce for inline scripts)
//! 6. Session layer (tower-sessions; `PostgreSQL` store in production)
//! 7. Rate limiting (governor), on auth and mutation routes only
//!
//! Extractors: `RequireAuth`, `RequireSeller`, `RequireAdmin`, `OptionalAuth`,
//! `HxRequest`, `CspNonce` and the layout context `Page`.

pub mod auth;
pub mod csp;
pub mod htmx;
pub mod page;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    OptionalAuth, RequireAdmin, RequireAuth, RequireSeller, clear_current_user, safe_next,
    set_current_user,
};
pub use csp::{CspNonce, csp_nonce_middleware};
pub use htmx::{CART_UPDATED_EVENT, HX_TRIGGER, HxRequest};
pub use page::Page;
pub use rate_limit::{auth_rate_limiter, mutation_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
