//! Domain models for the storefront.
//!
//! - [`cart`] - Session-backed shopping cart
//! - [`checkout`] - Checkout wizard state machine and order pricing
//! - [`session`] - Signed-in user and session keys
//! - [`toast`] - One-shot notifications shown on the next page

pub mod cart;
pub mod checkout;
pub mod session;
pub mod toast;

pub use cart::{Cart, CartError, CartItem, LineOutcome, MAX_LINE_QUANTITY};
pub use checkout::{Checkout, CheckoutError, CheckoutStep, OrderSummary, ShippingForm};
pub use session::{CurrentUser, keys as session_keys};
pub use toast::{Toast, ToastKind};
