//! Checkout wizard route handlers.
//!
//! Every checkout route requires a signed-in user. Pages for steps the
//! wizard has not reached redirect to the furthest reachable step.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use marketstall_core::{OrderId, PaymentMethod};

use crate::backend::{Order, ShippingAddress};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{Page, RequireAuth};
use crate::models::{Cart, Checkout, CheckoutError, CheckoutStep, ShippingForm, Toast};
use crate::state::AppState;

use super::cart::CartView;
use super::{require, write_failed};

// =============================================================================
// Templates
// =============================================================================

/// Progress bar entry.
#[derive(Clone, Debug)]
pub struct StepView {
    pub number: u8,
    pub label: &'static str,
    pub path: &'static str,
    pub current: bool,
    pub reachable: bool,
}

fn progress(checkout: &Checkout, current: CheckoutStep) -> Vec<StepView> {
    CheckoutStep::ALL
        .into_iter()
        .map(|step| StepView {
            number: step.number(),
            label: step.label(),
            path: step.path(),
            current: step == current,
            reachable: checkout.can_view(step),
        })
        .collect()
}

/// Shipping step template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/shipping.html")]
pub struct ShippingTemplate {
    pub page: Page,
    pub steps: Vec<StepView>,
    pub form: ShippingForm,
    pub missing: Vec<&'static str>,
}

impl ShippingTemplate {
    /// Whether the field with this label was left blank on the last submit.
    #[must_use]
    pub fn is_missing(&self, label: &str) -> bool {
        self.missing.contains(&label)
    }
}

/// Payment option for the radio list.
#[derive(Clone, Debug)]
pub struct PaymentOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Payment step template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentTemplate {
    pub page: Page,
    pub steps: Vec<StepView>,
    pub options: Vec<PaymentOption>,
    pub error: Option<String>,
}

/// Review step template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/review.html")]
pub struct ReviewTemplate {
    pub page: Page,
    pub steps: Vec<StepView>,
    pub cart: CartView,
    pub shipping: ShippingAddress,
    pub payment: &'static str,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmation.html")]
pub struct ConfirmationTemplate {
    pub page: Page,
    pub order: Order,
}

fn form_from_address(address: Option<&ShippingAddress>) -> ShippingForm {
    address.map_or_else(ShippingForm::default, |a| ShippingForm {
        full_name: a.full_name.clone(),
        address: a.address.clone(),
        city: a.city.clone(),
        postal_code: a.postal_code.clone(),
        country: a.country.clone(),
        phone: a.phone.clone(),
    })
}

fn payment_options(selected: Option<PaymentMethod>) -> Vec<PaymentOption> {
    PaymentMethod::ALL
        .into_iter()
        .map(|method| PaymentOption {
            value: method.as_str(),
            label: method.label(),
            selected: selected == Some(method),
        })
        .collect()
}

/// Redirect to where the wizard currently is.
fn resume(checkout: &Checkout) -> Response {
    Redirect::to(checkout.step().path()).into_response()
}

/// Load the wizard, sending the visitor back to the cart when it is empty.
async fn load_state(session: &Session) -> std::result::Result<(Cart, Checkout), Response> {
    let cart = Cart::load(session).await;
    if cart.is_empty() {
        return Err(Redirect::to("/cart").into_response());
    }
    Ok((cart, Checkout::load(session).await))
}

// =============================================================================
// Handlers
// =============================================================================

/// Start or resume checkout.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index(session: Session, RequireAuth(user): RequireAuth) -> Result<Response> {
    let cart = Cart::load(&session).await;
    let mut checkout = Checkout::load(&session).await;

    if checkout.step() == CheckoutStep::Cart {
        if let Err(e) = checkout.begin(&cart) {
            Toast::error(AppError::from(e).user_message())
                .push(&session)
                .await;
            return Ok(Redirect::to("/cart").into_response());
        }
        checkout.save(&session).await?;
        add_breadcrumb("checkout", "Started checkout", None);
        tracing::info!(lines = cart.items().len(), "Checkout started");
    } else if cart.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    Ok(resume(&checkout))
}

/// Display the shipping form, pre-filled with earlier input.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn shipping_page(
    session: Session,
    RequireAuth(user): RequireAuth,
    page: Page,
) -> Result<Response> {
    let (_, checkout) = match load_state(&session).await {
        Ok(state) => state,
        Err(redirect) => {
            page.keep_toasts(&session).await;
            return Ok(redirect);
        }
    };
    if !checkout.can_view(CheckoutStep::Shipping) {
        page.keep_toasts(&session).await;
        return Ok(Redirect::to("/checkout").into_response());
    }

    let mut form = form_from_address(checkout.shipping());
    if form.full_name.is_empty() {
        form.full_name.clone_from(&user.name);
    }

    Ok(ShippingTemplate {
        steps: progress(&checkout, CheckoutStep::Shipping),
        page,
        form,
        missing: Vec::new(),
    }
    .into_response())
}

/// Submit the shipping form.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn submit_shipping(
    session: Session,
    RequireAuth(user): RequireAuth,
    mut page: Page,
    Form(form): Form<ShippingForm>,
) -> Result<Response> {
    let (_, mut checkout) = match load_state(&session).await {
        Ok(state) => state,
        Err(redirect) => {
            page.keep_toasts(&session).await;
            return Ok(redirect);
        }
    };

    match checkout.submit_shipping(&form) {
        Ok(()) => {
            checkout.save(&session).await?;
            add_breadcrumb("checkout", "Submitted shipping", None);
            page.keep_toasts(&session).await;
            Ok(Redirect::to(CheckoutStep::Payment.path()).into_response())
        }
        Err(CheckoutError::MissingFields(missing)) => {
            page.toasts.push(Toast::error(
                CheckoutError::MissingFields(missing.clone()).to_string(),
            ));
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                ShippingTemplate {
                    steps: progress(&checkout, CheckoutStep::Shipping),
                    page,
                    form,
                    missing,
                },
            )
                .into_response())
        }
        Err(CheckoutError::NotStarted) => {
            page.keep_toasts(&session).await;
            Ok(Redirect::to("/checkout").into_response())
        }
        Err(e) => {
            page.keep_toasts(&session).await;
            Err(e.into())
        }
    }
}

/// Display the payment method form.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn payment_page(
    session: Session,
    RequireAuth(user): RequireAuth,
    page: Page,
) -> Result<Response> {
    let (_, checkout) = match load_state(&session).await {
        Ok(state) => state,
        Err(redirect) => {
            page.keep_toasts(&session).await;
            return Ok(redirect);
        }
    };
    if !checkout.can_view(CheckoutStep::Payment) {
        page.keep_toasts(&session).await;
        return Ok(resume(&checkout));
    }

    Ok(PaymentTemplate {
        steps: progress(&checkout, CheckoutStep::Payment),
        options: payment_options(checkout.payment()),
        page,
        error: None,
    }
    .into_response())
}

/// Payment form data.
#[derive(Debug, Deserialize)]
pub struct PaymentForm {
    pub payment_method: Option<String>,
}

/// Submit the payment method.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn submit_payment(
    session: Session,
    RequireAuth(user): RequireAuth,
    page: Page,
    Form(form): Form<PaymentForm>,
) -> Result<Response> {
    let (_, mut checkout) = match load_state(&session).await {
        Ok(state) => state,
        Err(redirect) => {
            page.keep_toasts(&session).await;
            return Ok(redirect);
        }
    };

    let method = form
        .payment_method
        .as_deref()
        .and_then(|value| value.parse::<PaymentMethod>().ok());

    match checkout.submit_payment(method) {
        Ok(()) => {
            checkout.save(&session).await?;
            add_breadcrumb("checkout", "Chose payment method", None);
            page.keep_toasts(&session).await;
            Ok(Redirect::to(CheckoutStep::Review.path()).into_response())
        }
        Err(CheckoutError::MissingPayment) => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            PaymentTemplate {
                steps: progress(&checkout, CheckoutStep::Payment),
                options: payment_options(None),
                page,
                error: Some(CheckoutError::MissingPayment.to_string()),
            },
        )
            .into_response()),
        Err(_) => {
            page.keep_toasts(&session).await;
            Ok(resume(&checkout))
        }
    }
}

/// Display the order review.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn review_page(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    page: Page,
) -> Result<Response> {
    let (cart, checkout) = match load_state(&session).await {
        Ok(state) => state,
        Err(redirect) => {
            page.keep_toasts(&session).await;
            return Ok(redirect);
        }
    };
    let (Some(shipping), Some(payment)) = (checkout.shipping(), checkout.payment()) else {
        page.keep_toasts(&session).await;
        return Ok(resume(&checkout));
    };
    if !checkout.can_view(CheckoutStep::Review) {
        page.keep_toasts(&session).await;
        return Ok(resume(&checkout));
    }

    Ok(ReviewTemplate {
        steps: progress(&checkout, CheckoutStep::Review),
        cart: CartView::new(&cart, &state.config().checkout),
        shipping: shipping.clone(),
        payment: payment.label(),
        page,
    }
    .into_response())
}

/// Step back once.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn back(session: Session, RequireAuth(user): RequireAuth) -> Result<Response> {
    let mut checkout = Checkout::load(&session).await;
    let step = checkout.back();
    checkout.save(&session).await?;
    Ok(Redirect::to(step.path()).into_response())
}

/// Place the order with the backend.
///
/// On success the cart and wizard are cleared and the visitor lands on the
/// confirmation page. Failures keep everything so the order can be retried.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn place(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let mut cart = Cart::load(&session).await;
    let checkout = Checkout::load(&session).await;

    let summary = crate::models::OrderSummary::compute(&cart, &state.config().checkout);
    let order = match checkout.build_order(&cart, &summary) {
        Ok(order) => order,
        Err(e) => {
            Toast::error(AppError::from(e).user_message())
                .push(&session)
                .await;
            if cart.is_empty() {
                return Ok(Redirect::to("/cart").into_response());
            }
            return Ok(resume(&checkout));
        }
    };

    let placed = match state.api().create_order(&user.token, &order).await {
        Ok(placed) => placed,
        Err(e) => return write_failed(&session, e, CheckoutStep::Review.path()).await,
    };

    cart.clear();
    cart.save(&session).await?;
    Checkout::clear(&session).await?;

    tracing::info!(order_id = %placed.id, total = %summary.total, "Order placed");
    add_breadcrumb("checkout", "Placed order", Some(&[("order_id", placed.id.as_str())]));
    Toast::success("Thank you! Your order has been placed.")
        .push(&session)
        .await;

    Ok(Redirect::to(&format!("/checkout/confirmation/{}", placed.id)).into_response())
}

/// Display the confirmation for a placed order.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn confirmation(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    page: Page,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = OrderId::parse(&order_id)
        .map_err(|_| AppError::NotFound(format!("order {order_id}")))?;
    let order = require(&session, state.api().get_order(&user.token, &id).await).await?;

    Ok(ConfirmationTemplate { page, order })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_marks_current_and_reachable() {
        let checkout = Checkout::default();
        let steps = progress(&checkout, CheckoutStep::Cart);
        assert_eq!(steps.len(), 4);
        assert!(steps[0].current);
        assert!(steps[0].reachable);
        assert!(!steps[1].reachable);
        assert_eq!(steps[2].path, "/checkout/payment");
    }

    #[test]
    fn test_payment_options_mark_selection() {
        let options = payment_options(Some(PaymentMethod::Paypal));
        assert_eq!(options.len(), PaymentMethod::ALL.len());
        assert_eq!(
            options.iter().filter(|o| o.selected).map(|o| o.value).collect::<Vec<_>>(),
            vec!["paypal"]
        );
    }

    #[test]
    fn test_form_prefills_from_address() {
        let address = ShippingAddress {
            full_name: "Ada Lovelace".to_string(),
            address: "1 Analytical Way".to_string(),
            city: "London".to_string(),
            postal_code: "N1 9GU".to_string(),
            country: "UK".to_string(),
            phone: "+44 20 7946 0000".to_string(),
        };
        let form = form_from_address(Some(&address));
        assert_eq!(form.city, "London");
        assert!(form_from_address(None).city.is_empty());
    }
}
