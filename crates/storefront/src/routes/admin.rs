//! Admin dashboard route handlers.
//!
//! Admin role only. Status changes post to the seller update route with
//! `return_to` pointing back here.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use marketstall_core::OrderStatus;

use crate::backend::{AdminStats, Order, User};
use crate::error::Result;
use crate::filters;
use crate::middleware::{Page, RequireAdmin};
use crate::state::AppState;

use super::recover;

/// Admin dashboard overview template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub page: Page,
    pub stats: AdminStats,
}

/// User list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/users.html")]
pub struct UsersTemplate {
    pub page: Page,
    pub users: Vec<User>,
}

/// Order list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/orders.html")]
pub struct OrdersTemplate {
    pub page: Page,
    pub orders: Vec<Order>,
    pub statuses: [OrderStatus; 5],
    pub return_to: &'static str,
}

/// Display store-wide figures.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    mut page: Page,
) -> Result<impl IntoResponse> {
    let stats = state.api().admin_stats(&user.token).await;
    let stats = recover(&session, &mut page, stats).await?;

    Ok(DashboardTemplate { page, stats })
}

/// Display all user accounts.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn users(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    mut page: Page,
) -> Result<impl IntoResponse> {
    let users = state.api().admin_users(&user.token).await;
    let users = recover(&session, &mut page, users).await?;

    Ok(UsersTemplate { page, users })
}

/// Display all orders with status controls.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    mut page: Page,
) -> Result<impl IntoResponse> {
    let orders = state.api().admin_orders(&user.token).await;
    let orders = recover(&session, &mut page, orders).await?;

    Ok(OrdersTemplate {
        page,
        orders,
        statuses: OrderStatus::ALL,
        return_to: "/admin/orders",
    })
}
