//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! Every mutation answers HTMX with a fragment plus out-of-band toasts and
//! a `cart-updated` trigger; plain form posts get a toast and a redirect.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use marketstall_core::{CurrencyCode, Price, ProductId};

use crate::backend::ApiError;
use crate::config::CheckoutConfig;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{CART_UPDATED_EVENT, HX_TRIGGER, HxRequest, Page};
use crate::models::{Cart, CartError, CartItem, Checkout, OrderSummary, Toast};
use crate::state::AppState;

// =============================================================================
// View Models
// =============================================================================

/// Cart line display data for templates.
#[derive(Clone, Debug)]
pub struct CartLineView {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub price: String,
    pub line_total: String,
}

/// Cart display data for templates.
#[derive(Clone, Debug)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: u32,
    pub subtotal: String,
    pub shipping: String,
    pub tax: String,
    pub total: String,
    /// Extra spend needed for free shipping, when a threshold applies.
    pub free_shipping_gap: Option<String>,
}

impl CartView {
    /// Build the view with prices formatted in the store currency.
    #[must_use]
    pub fn new(cart: &Cart, rules: &CheckoutConfig) -> Self {
        let currency: CurrencyCode = rules.currency;
        let money = |amount| Price::new(amount, currency).to_string();
        let summary = OrderSummary::compute(cart, rules);

        let free_shipping_gap = rules
            .free_shipping_over
            .filter(|threshold| !cart.is_empty() && summary.subtotal < *threshold)
            .map(|threshold| money(threshold - summary.subtotal));

        Self {
            lines: cart
                .items()
                .iter()
                .map(|item| CartLineView {
                    id: item.id.to_string(),
                    name: item.name.clone(),
                    image: item.image().map(str::to_string),
                    quantity: item.quantity,
                    price: money(item.price),
                    line_total: money(item.line_total()),
                })
                .collect(),
            item_count: cart.item_count(),
            subtotal: money(summary.subtotal),
            shipping: money(summary.shipping),
            tax: money(summary.tax),
            total: money(summary.total),
            free_shipping_gap,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: String,
    pub quantity: u32,
}

/// Form naming a single cart line.
#[derive(Debug, Deserialize)]
pub struct LineForm {
    pub product_id: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: Page,
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
    pub toasts: Vec<Toast>,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
    pub toasts: Vec<Toast>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page.
#[instrument(skip_all)]
pub async fn show(State(state): State<AppState>, session: Session, page: Page) -> impl IntoResponse {
    let cart = Cart::load(&session).await;

    CartShowTemplate {
        page,
        cart: CartView::new(&cart, &state.config().checkout),
    }
}

/// Get cart count badge (HTMX).
#[instrument(skip_all)]
pub async fn count(session: Session) -> impl IntoResponse {
    CartCountTemplate {
        count: Cart::load(&session).await.item_count(),
        toasts: Vec::new(),
    }
}

/// Add item to cart.
///
/// The line is built from the backend's product record, never from
/// client-posted names or prices. HTMX gets the refreshed badge.
#[instrument(skip(state, session, form), fields(product_id = %form.product_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    HxRequest(htmx): HxRequest,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let mut cart = Cart::load(&session).await;
    let quantity = form.quantity.unwrap_or(1);

    let toast = match add_product(&state, &mut cart, &form.product_id, quantity).await {
        Ok(toast) => {
            cart.save(&session).await?;
            add_breadcrumb("cart", "Added item", Some(&[("product_id", form.product_id.as_str())]));
            toast
        }
        Err(toast) => toast,
    };

    if htmx {
        return Ok((
            AppendHeaders([(HX_TRIGGER, CART_UPDATED_EVENT)]),
            CartCountTemplate {
                count: cart.item_count(),
                toasts: vec![toast],
            },
        )
            .into_response());
    }

    toast.push(&session).await;
    Ok(Redirect::to("/cart").into_response())
}

/// Look up the product and add it, describing the outcome as a toast.
async fn add_product(
    state: &AppState,
    cart: &mut Cart,
    raw_id: &str,
    quantity: u32,
) -> std::result::Result<Toast, Toast> {
    let id = ProductId::parse(raw_id).map_err(|_| Toast::error("That product could not be found."))?;

    let product = state.api().get_product(&id).await.map_err(|e| {
        if !matches!(e, ApiError::NotFound(_)) {
            tracing::warn!(error = %e, "Product lookup failed during add to cart");
        }
        Toast::error(e.user_message())
    })?;

    let outcome = cart
        .add(CartItem::from_product(&product, quantity))
        .map_err(|e| match e {
            CartError::OutOfStock => Toast::error(format!("{} is out of stock.", product.name)),
            other => Toast::error(AppError::from(other).user_message()),
        })?;

    Ok(if outcome.clamped {
        limited(&product.name, outcome.quantity)
    } else {
        Toast::success(format!("Added {} to your cart.", product.name))
    })
}

fn limited(name: &str, quantity: u32) -> Toast {
    Toast::info(format!("Only {quantity} of {name} can be in your cart."))
}

/// Apply a mutation to an existing line and answer with the cart fragment.
///
/// The mutation reports whether the quantity was clamped to stock.
async fn mutate_line<F>(
    state: &AppState,
    session: &Session,
    htmx: bool,
    raw_id: &str,
    action: &'static str,
    mutation: F,
) -> Result<Response>
where
    F: FnOnce(&mut Cart, &ProductId) -> std::result::Result<bool, CartError>,
{
    let mut cart = Cart::load(session).await;
    let id = ProductId::parse(raw_id).map_err(|_| AppError::BadRequest("invalid product".to_string()))?;

    let mut toasts = Vec::new();
    match mutation(&mut cart, &id) {
        Ok(clamped) => {
            cart.save(session).await?;
            add_breadcrumb("cart", action, Some(&[("product_id", id.as_str())]));
            if let Some(line) = cart.get(&id).filter(|_| clamped) {
                toasts.push(limited(&line.name, line.quantity));
            }
            if cart.is_empty() {
                // Nothing left to check out
                Checkout::clear(session).await?;
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, action, "Cart mutation rejected");
            toasts.push(Toast::error(AppError::from(e).user_message()));
        }
    }

    respond_with_cart(state, session, htmx, &cart, toasts).await
}

async fn respond_with_cart(
    state: &AppState,
    session: &Session,
    htmx: bool,
    cart: &Cart,
    toasts: Vec<Toast>,
) -> Result<Response> {
    if htmx {
        return Ok((
            AppendHeaders([(HX_TRIGGER, CART_UPDATED_EVENT)]),
            CartItemsTemplate {
                cart: CartView::new(cart, &state.config().checkout),
                toasts,
            },
        )
            .into_response());
    }

    for toast in toasts {
        toast.push(session).await;
    }
    Ok(Redirect::to("/cart").into_response())
}

/// Set a line's quantity.
#[instrument(skip(state, session, form), fields(product_id = %form.product_id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    HxRequest(htmx): HxRequest,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let quantity = form.quantity;
    mutate_line(&state, &session, htmx, &form.product_id, "Updated quantity", |cart, id| {
        cart.set_quantity(id, quantity).map(|outcome| outcome.clamped)
    })
    .await
}

/// Add one unit to a line.
#[instrument(skip(state, session, form), fields(product_id = %form.product_id))]
pub async fn increment(
    State(state): State<AppState>,
    session: Session,
    HxRequest(htmx): HxRequest,
    Form(form): Form<LineForm>,
) -> Result<Response> {
    mutate_line(&state, &session, htmx, &form.product_id, "Incremented", |cart, id| {
        cart.increment(id).map(|outcome| outcome.clamped)
    })
    .await
}

/// Remove one unit from a line; a single unit stays.
#[instrument(skip(state, session, form), fields(product_id = %form.product_id))]
pub async fn decrement(
    State(state): State<AppState>,
    session: Session,
    HxRequest(htmx): HxRequest,
    Form(form): Form<LineForm>,
) -> Result<Response> {
    mutate_line(&state, &session, htmx, &form.product_id, "Decremented", |cart, id| {
        cart.decrement(id).map(|_| false)
    })
    .await
}

/// Remove a line.
#[instrument(skip(state, session, form), fields(product_id = %form.product_id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    HxRequest(htmx): HxRequest,
    Form(form): Form<LineForm>,
) -> Result<Response> {
    mutate_line(&state, &session, htmx, &form.product_id, "Removed item", |cart, id| {
        cart.remove(id)
            .map(|_| false)
            .ok_or_else(|| CartError::NotInCart(id.clone()))
    })
    .await
}

/// Empty the cart.
#[instrument(skip_all)]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    HxRequest(htmx): HxRequest,
) -> Result<Response> {
    let mut cart = Cart::load(&session).await;
    cart.clear();
    cart.save(&session).await?;
    Checkout::clear(&session).await?;
    add_breadcrumb("cart", "Cleared cart", None);

    respond_with_cart(
        &state,
        &session,
        htmx,
        &cart,
        vec![Toast::info("Your cart is now empty.")],
    )
    .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cart() -> Cart {
        let mut cart = Cart::default();
        cart.add(CartItem {
            id: ProductId::parse("p1").unwrap(),
            name: "Canvas Tote".to_string(),
            price: "12.50".parse().unwrap(),
            quantity: 2,
            product_images: Vec::new(),
            available: 10,
        })
        .unwrap();
        cart
    }

    #[test]
    fn test_cart_view_formats_money() {
        let view = CartView::new(&cart(), &CheckoutConfig::default());
        assert_eq!(view.item_count, 2);
        assert_eq!(view.lines[0].price, "$12.50");
        assert_eq!(view.lines[0].line_total, "$25.00");
        assert_eq!(view.subtotal, "$25.00");
        assert_eq!(view.shipping, "$5.00");
        assert_eq!(view.total, "$30.00");
        assert_eq!(view.free_shipping_gap.as_deref(), Some("$25.00"));
    }

    #[test]
    fn test_empty_cart_view() {
        let view = CartView::new(&Cart::default(), &CheckoutConfig::default());
        assert!(view.is_empty());
        assert_eq!(view.total, "$0.00");
        assert_eq!(view.free_shipping_gap, None);
    }
}
