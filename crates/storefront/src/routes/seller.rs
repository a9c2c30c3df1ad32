//! Seller dashboard route handlers.
//!
//! Open to sellers and admins. Admins manage order status from their own
//! dashboard through the same update route.

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

use marketstall_core::{OrderId, OrderStatus};

use crate::backend::{Order, Product, SellerStats};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{Page, RequireSeller, safe_next};
use crate::models::Toast;
use crate::state::AppState;

use super::{recover, write_failed};

/// Orders shown on the dashboard overview.
const RECENT_ORDERS: usize = 5;

/// Seller dashboard overview template.
#[derive(Template, WebTemplate)]
#[template(path = "seller/dashboard.html")]
pub struct DashboardTemplate {
    pub page: Page,
    pub stats: SellerStats,
    pub orders: Vec<Order>,
    pub statuses: [OrderStatus; 5],
    pub return_to: &'static str,
}

/// Seller products template.
#[derive(Template, WebTemplate)]
#[template(path = "seller/products.html")]
pub struct ProductsTemplate {
    pub page: Page,
    pub products: Vec<Product>,
}

/// Seller orders template.
#[derive(Template, WebTemplate)]
#[template(path = "seller/orders.html")]
pub struct OrdersTemplate {
    pub page: Page,
    pub orders: Vec<Order>,
    pub statuses: [OrderStatus; 5],
    pub return_to: &'static str,
}

/// Display the dashboard overview.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    session: Session,
    RequireSeller(user): RequireSeller,
    mut page: Page,
) -> Result<impl IntoResponse> {
    let (stats, orders) = tokio::join!(
        state.api().seller_stats(&user.token),
        state.api().seller_orders(&user.token)
    );
    let stats = recover(&session, &mut page, stats).await?;
    let mut orders = recover(&session, &mut page, orders).await?;
    orders.truncate(RECENT_ORDERS);

    Ok(DashboardTemplate {
        page,
        stats,
        orders,
        statuses: OrderStatus::ALL,
        return_to: "/seller",
    })
}

/// Display the seller's products.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn products(
    State(state): State<AppState>,
    session: Session,
    RequireSeller(user): RequireSeller,
    mut page: Page,
) -> Result<impl IntoResponse> {
    let products = state.api().seller_products(&user.token).await;
    let products = recover(&session, &mut page, products).await?;

    Ok(ProductsTemplate { page, products })
}

/// Display orders with status controls.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    RequireSeller(user): RequireSeller,
    mut page: Page,
) -> Result<impl IntoResponse> {
    let orders = state.api().seller_orders(&user.token).await;
    let orders = recover(&session, &mut page, orders).await?;

    Ok(OrdersTemplate {
        page,
        orders,
        statuses: OrderStatus::ALL,
        return_to: "/seller/orders",
    })
}

/// Status update form data.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    #[serde(default)]
    pub status: String,
    pub return_to: Option<String>,
}

impl StatusForm {
    fn back_to(&self) -> &str {
        safe_next(self.return_to.as_deref()).unwrap_or("/seller/orders")
    }
}

/// Move an order to a new status.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn update_status(
    State(state): State<AppState>,
    session: Session,
    RequireSeller(user): RequireSeller,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Result<Response> {
    let id = OrderId::parse(&id).map_err(|_| AppError::NotFound(format!("order {id}")))?;
    let back_to = form.back_to();

    let Ok(status) = form.status.parse::<OrderStatus>() else {
        Toast::error("Please choose a valid status.").push(&session).await;
        return Ok(Redirect::to(back_to).into_response());
    };

    match state.api().update_order_status(&user.token, &id, status).await {
        Ok(order) => {
            tracing::info!(order_id = %order.id, status = %order.status, "Order status updated");
            add_breadcrumb(
                "seller",
                "Updated order status",
                Some(&[("order_id", id.as_str()), ("status", status.as_str())]),
            );
            Toast::success(format!("Order marked {}.", status.label().to_lowercase()))
                .push(&session)
                .await;
            Ok(Redirect::to(back_to).into_response())
        }
        Err(e) => write_failed(&session, e, back_to).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_form_return_path() {
        let form = StatusForm {
            status: "shipped".to_string(),
            return_to: Some("/admin/orders".to_string()),
        };
        assert_eq!(form.back_to(), "/admin/orders");

        let form = StatusForm {
            status: "shipped".to_string(),
            return_to: None,
        };
        assert_eq!(form.back_to(), "/seller/orders");
    }
}
