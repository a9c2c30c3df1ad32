//! Account route handlers.
//!
//! These routes require authentication. Orders and the wishlist are read
//! from the backend with the visitor's bearer token.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use marketstall_core::{OrderId, ProductId};

use crate::backend::{Order, Product};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{Page, RequireAuth, safe_next};
use crate::models::{CurrentUser, Toast};
use crate::state::AppState;

use super::{recover, require, write_failed};

/// Orders listed on the account overview.
const RECENT_ORDERS: usize = 5;

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub page: Page,
    pub user: CurrentUser,
    /// Most recent orders only.
    pub orders: Vec<Order>,
    pub order_count: usize,
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub page: Page,
    pub orders: Vec<Order>,
}

/// Order detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/order.html")]
pub struct OrderTemplate {
    pub page: Page,
    pub order: Order,
}

/// Wishlist page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/wishlist.html")]
pub struct WishlistTemplate {
    pub page: Page,
    pub products: Vec<Product>,
}

/// Wishlist form data; `return_to` lets product pages send the visitor back.
#[derive(Debug, Default, Deserialize)]
pub struct WishlistForm {
    pub return_to: Option<String>,
}

impl WishlistForm {
    fn back_to(&self) -> &str {
        safe_next(self.return_to.as_deref()).unwrap_or("/account/wishlist")
    }
}

/// Display account overview page.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    mut page: Page,
) -> Result<impl IntoResponse> {
    let orders = state.api().my_orders(&user.token).await;
    let mut orders = recover(&session, &mut page, orders).await?;
    let order_count = orders.len();
    orders.truncate(RECENT_ORDERS);

    Ok(AccountIndexTemplate {
        page,
        user,
        orders,
        order_count,
    })
}

/// Display the order history.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    mut page: Page,
) -> Result<impl IntoResponse> {
    let orders = state.api().my_orders(&user.token).await;
    let orders = recover(&session, &mut page, orders).await?;

    Ok(OrdersTemplate { page, orders })
}

/// Display a single order.
#[instrument(skip(state, session, page, user), fields(user_id = %user.id))]
pub async fn order_detail(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    page: Page,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = OrderId::parse(&id).map_err(|_| AppError::NotFound(format!("order {id}")))?;
    let order = require(&session, state.api().get_order(&user.token, &id).await).await?;

    Ok(OrderTemplate { page, order })
}

/// Display the wishlist.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn wishlist(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    mut page: Page,
) -> Result<impl IntoResponse> {
    let products = state.api().wishlist(&user.token).await;
    let products = recover(&session, &mut page, products).await?;

    Ok(WishlistTemplate { page, products })
}

fn parse_product_id(raw: &str) -> Result<ProductId> {
    ProductId::parse(raw).map_err(|_| AppError::NotFound(format!("product {raw}")))
}

/// Add a product to the wishlist.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn add_to_wishlist(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<String>,
    Form(form): Form<WishlistForm>,
) -> Result<Response> {
    let id = parse_product_id(&product_id)?;

    match state.api().add_to_wishlist(&user.token, &id).await {
        Ok(()) => {
            add_breadcrumb("wishlist", "Added item", Some(&[("product_id", id.as_str())]));
            Toast::success("Saved to your wishlist.").push(&session).await;
            Ok(Redirect::to(form.back_to()).into_response())
        }
        Err(e) => write_failed(&session, e, form.back_to()).await,
    }
}

/// Remove a product from the wishlist.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<String>,
    Form(form): Form<WishlistForm>,
) -> Result<Response> {
    let id = parse_product_id(&product_id)?;

    match state.api().remove_from_wishlist(&user.token, &id).await {
        Ok(()) => {
            add_breadcrumb("wishlist", "Removed item", Some(&[("product_id", id.as_str())]));
            Toast::info("Removed from your wishlist.").push(&session).await;
            Ok(Redirect::to(form.back_to()).into_response())
        }
        Err(e) => write_failed(&session, e, form.back_to()).await,
    }
}
