//! Checkout wizard.
//!
//! A linear sequence of four steps: cart → shipping → payment → review.
//! Each forward transition validates the data it needs; `back` always
//! succeeds. The wizard state is kept in the session next to the cart.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_sessions::Session;

use marketstall_core::PaymentMethod;
use marketstall_core::price::round_cents;

use super::cart::Cart;
use super::session_keys;
use crate::backend::{NewOrder, NewOrderItem, ShippingAddress};
use crate::config::CheckoutConfig;

/// Errors from checkout transitions. A failed transition leaves the state unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("your cart is empty")]
    EmptyCart,
    #[error("checkout has not been started")]
    NotStarted,
    #[error("please fill in: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("shipping details are required first")]
    MissingShipping,
    #[error("please choose a payment method")]
    MissingPayment,
    #[error("please review your order before placing it")]
    NotReviewed,
}

/// A wizard step.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    #[default]
    Cart,
    Shipping,
    Payment,
    Review,
}

impl CheckoutStep {
    /// All steps in order.
    pub const ALL: [Self; 4] = [Self::Cart, Self::Shipping, Self::Payment, Self::Review];

    /// The following step, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Cart => Some(Self::Shipping),
            Self::Shipping => Some(Self::Payment),
            Self::Payment => Some(Self::Review),
            Self::Review => None,
        }
    }

    /// The preceding step, if any.
    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Cart => None,
            Self::Shipping => Some(Self::Cart),
            Self::Payment => Some(Self::Shipping),
            Self::Review => Some(Self::Payment),
        }
    }

    /// One-based position shown in the progress bar.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Cart => 1,
            Self::Shipping => 2,
            Self::Payment => 3,
            Self::Review => 4,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cart => "Cart",
            Self::Shipping => "Shipping",
            Self::Payment => "Payment",
            Self::Review => "Review",
        }
    }

    /// Storefront path that renders this step.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Cart => "/cart",
            Self::Shipping => "/checkout/shipping",
            Self::Payment => "/checkout/payment",
            Self::Review => "/checkout/review",
        }
    }
}

/// Shipping form as posted by the browser.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShippingForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub phone: String,
}

impl ShippingForm {
    /// Trim every field and require all of them to be present.
    ///
    /// # Errors
    ///
    /// Returns `MissingFields` naming every blank field.
    pub fn validate(&self) -> Result<ShippingAddress, CheckoutError> {
        let fields = [
            ("full name", self.full_name.trim()),
            ("address", self.address.trim()),
            ("city", self.city.trim()),
            ("postal code", self.postal_code.trim()),
            ("country", self.country.trim()),
            ("phone", self.phone.trim()),
        ];

        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(label, _)| *label)
            .collect();
        if !missing.is_empty() {
            return Err(CheckoutError::MissingFields(missing));
        }

        Ok(ShippingAddress {
            full_name: self.full_name.trim().to_string(),
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            country: self.country.trim().to_string(),
            phone: self.phone.trim().to_string(),
        })
    }
}

/// Checkout wizard state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    step: CheckoutStep,
    shipping: Option<ShippingAddress>,
    payment: Option<PaymentMethod>,
}

impl Checkout {
    #[must_use]
    pub const fn step(&self) -> CheckoutStep {
        self.step
    }

    #[must_use]
    pub const fn shipping(&self) -> Option<&ShippingAddress> {
        self.shipping.as_ref()
    }

    #[must_use]
    pub const fn payment(&self) -> Option<PaymentMethod> {
        self.payment
    }

    /// Leave the cart and enter the shipping step.
    ///
    /// Previously entered shipping and payment data is kept so the forms can
    /// be pre-filled.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCart` if there is nothing to check out.
    pub fn begin(&mut self, cart: &Cart) -> Result<(), CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        self.step = CheckoutStep::Shipping;
        Ok(())
    }

    /// Record the shipping address and move to payment.
    ///
    /// # Errors
    ///
    /// Returns `NotStarted` before [`Self::begin`] and `MissingFields` for
    /// blank fields.
    pub fn submit_shipping(&mut self, form: &ShippingForm) -> Result<(), CheckoutError> {
        if self.step < CheckoutStep::Shipping {
            return Err(CheckoutError::NotStarted);
        }
        let address = form.validate()?;
        self.shipping = Some(address);
        self.step = CheckoutStep::Payment;
        Ok(())
    }

    /// Record the payment method and move to review.
    ///
    /// # Errors
    ///
    /// Returns `MissingShipping` if no address was recorded and
    /// `MissingPayment` if no method was chosen.
    pub fn submit_payment(&mut self, method: Option<PaymentMethod>) -> Result<(), CheckoutError> {
        if self.shipping.is_none() || self.step < CheckoutStep::Payment {
            return Err(CheckoutError::MissingShipping);
        }
        let method = method.ok_or(CheckoutError::MissingPayment)?;
        self.payment = Some(method);
        self.step = CheckoutStep::Review;
        Ok(())
    }

    /// Step back once; `Cart` is the floor.
    pub fn back(&mut self) -> CheckoutStep {
        self.step = self.step.previous().unwrap_or(CheckoutStep::Cart);
        self.step
    }

    /// Whether `step` may be rendered given the data collected so far.
    #[must_use]
    pub const fn can_view(&self, step: CheckoutStep) -> bool {
        match step {
            CheckoutStep::Cart => true,
            CheckoutStep::Shipping => !matches!(self.step, CheckoutStep::Cart),
            CheckoutStep::Payment => {
                self.shipping.is_some()
                    && matches!(self.step, CheckoutStep::Payment | CheckoutStep::Review)
            }
            CheckoutStep::Review => {
                self.shipping.is_some()
                    && self.payment.is_some()
                    && matches!(self.step, CheckoutStep::Review)
            }
        }
    }

    /// Build the order request for the backend.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCart`, `MissingShipping` or `MissingPayment` when the
    /// corresponding data is absent, and `NotReviewed` unless the wizard is
    /// on the review step.
    pub fn build_order(&self, cart: &Cart, summary: &OrderSummary) -> Result<NewOrder, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let shipping_address = self.shipping.clone().ok_or(CheckoutError::MissingShipping)?;
        let payment_method = self.payment.ok_or(CheckoutError::MissingPayment)?;
        if self.step != CheckoutStep::Review {
            return Err(CheckoutError::NotReviewed);
        }

        Ok(NewOrder {
            order_items: cart
                .items()
                .iter()
                .map(|item| NewOrderItem {
                    product: item.id.clone(),
                    name: item.name.clone(),
                    price: item.price,
                    quantity: item.quantity,
                    image: item.image().map(str::to_string),
                })
                .collect(),
            shipping_address,
            payment_method,
            items_price: summary.subtotal,
            shipping_price: summary.shipping,
            tax_price: summary.tax,
            total_price: summary.total,
        })
    }

    // =========================================================================
    // Session persistence
    // =========================================================================

    /// Rehydrate the wizard from the session; missing or unreadable state
    /// starts over at the cart.
    pub async fn load(session: &Session) -> Self {
        match session.get::<Self>(session_keys::CHECKOUT).await {
            Ok(state) => state.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable checkout state from session");
                Self::default()
            }
        }
    }

    /// Persist the wizard to the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn save(&self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.insert(session_keys::CHECKOUT, self).await
    }

    /// Forget the wizard state (after an order is placed).
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn clear(session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.remove::<Self>(session_keys::CHECKOUT).await?;
        Ok(())
    }
}

/// Order totals shown on the review step and sent with the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSummary {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl OrderSummary {
    /// Price a cart under the configured rules.
    ///
    /// Shipping is the flat rate unless the subtotal reaches the free-shipping
    /// threshold; an empty cart ships for free. Tax is charged on the subtotal
    /// only and rounded to cents.
    #[must_use]
    pub fn compute(cart: &Cart, rules: &CheckoutConfig) -> Self {
        let subtotal = round_cents(cart.subtotal());

        let shipping = if cart.is_empty()
            || rules
                .free_shipping_over
                .is_some_and(|threshold| subtotal >= threshold)
        {
            Decimal::ZERO
        } else {
            rules.flat_shipping
        };

        let tax = round_cents(subtotal * rules.tax_rate);

        Self {
            subtotal,
            shipping,
            tax,
            total: subtotal + shipping + tax,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marketstall_core::{CurrencyCode, ProductId};

    use super::*;
    use crate::models::cart::CartItem;

    fn cart_with(price: &str, quantity: u32) -> Cart {
        let mut cart = Cart::default();
        cart.add(CartItem {
            id: ProductId::parse("p1").unwrap(),
            name: "Lamp".to_string(),
            price: price.parse().unwrap(),
            quantity,
            product_images: vec!["https://cdn.example.com/lamp.jpg".to_string()],
            available: 50,
        })
        .unwrap();
        cart
    }

    fn shipping_form() -> ShippingForm {
        ShippingForm {
            full_name: " Ada Lovelace ".to_string(),
            address: "1 Analytical Way".to_string(),
            city: "London".to_string(),
            postal_code: "N1 9GU".to_string(),
            country: "UK".to_string(),
            phone: "+44 20 7946 0000".to_string(),
        }
    }

    fn rules(tax: &str) -> CheckoutConfig {
        CheckoutConfig {
            currency: CurrencyCode::USD,
            flat_shipping: "5.00".parse().unwrap(),
            free_shipping_over: Some("50.00".parse().unwrap()),
            tax_rate: tax.parse().unwrap(),
        }
    }

    #[test]
    fn test_step_order() {
        assert_eq!(CheckoutStep::Cart.next(), Some(CheckoutStep::Shipping));
        assert_eq!(CheckoutStep::Review.next(), None);
        assert_eq!(CheckoutStep::Cart.previous(), None);
        assert!(CheckoutStep::Payment > CheckoutStep::Shipping);
    }

    #[test]
    fn test_begin_requires_items() {
        let mut checkout = Checkout::default();
        assert_eq!(checkout.begin(&Cart::default()), Err(CheckoutError::EmptyCart));
        assert_eq!(checkout.step(), CheckoutStep::Cart);

        checkout.begin(&cart_with("10.00", 1)).unwrap();
        assert_eq!(checkout.step(), CheckoutStep::Shipping);
    }

    #[test]
    fn test_shipping_before_begin_is_rejected() {
        let mut checkout = Checkout::default();
        assert_eq!(
            checkout.submit_shipping(&shipping_form()),
            Err(CheckoutError::NotStarted)
        );
    }

    #[test]
    fn test_blank_shipping_fields_are_listed() {
        let mut checkout = Checkout::default();
        checkout.begin(&cart_with("10.00", 1)).unwrap();

        let form = ShippingForm {
            city: "   ".to_string(),
            phone: String::new(),
            ..shipping_form()
        };
        assert_eq!(
            checkout.submit_shipping(&form),
            Err(CheckoutError::MissingFields(vec!["city", "phone"]))
        );
        assert_eq!(checkout.step(), CheckoutStep::Shipping);
        assert!(checkout.shipping().is_none());
    }

    #[test]
    fn test_full_forward_flow_trims_fields() {
        let mut checkout = Checkout::default();
        checkout.begin(&cart_with("10.00", 1)).unwrap();
        checkout.submit_shipping(&shipping_form()).unwrap();
        assert_eq!(checkout.step(), CheckoutStep::Payment);
        assert_eq!(checkout.shipping().unwrap().full_name, "Ada Lovelace");

        checkout.submit_payment(Some(PaymentMethod::Card)).unwrap();
        assert_eq!(checkout.step(), CheckoutStep::Review);
        assert!(checkout.can_view(CheckoutStep::Review));
    }

    #[test]
    fn test_payment_requires_shipping_and_method() {
        let mut checkout = Checkout::default();
        checkout.begin(&cart_with("10.00", 1)).unwrap();
        assert_eq!(
            checkout.submit_payment(Some(PaymentMethod::Paypal)),
            Err(CheckoutError::MissingShipping)
        );

        checkout.submit_shipping(&shipping_form()).unwrap();
        assert_eq!(checkout.submit_payment(None), Err(CheckoutError::MissingPayment));
        assert_eq!(checkout.step(), CheckoutStep::Payment);
    }

    #[test]
    fn test_back_walks_to_cart_and_stops() {
        let mut checkout = Checkout::default();
        checkout.begin(&cart_with("10.00", 1)).unwrap();
        checkout.submit_shipping(&shipping_form()).unwrap();
        checkout.submit_payment(Some(PaymentMethod::Card)).unwrap();

        assert_eq!(checkout.back(), CheckoutStep::Payment);
        assert_eq!(checkout.back(), CheckoutStep::Shipping);
        assert_eq!(checkout.back(), CheckoutStep::Cart);
        assert_eq!(checkout.back(), CheckoutStep::Cart);
        // Data survives stepping back so forms stay pre-filled
        assert!(checkout.shipping().is_some());
    }

    #[test]
    fn test_can_view_guards_later_steps() {
        let mut checkout = Checkout::default();
        assert!(checkout.can_view(CheckoutStep::Cart));
        assert!(!checkout.can_view(CheckoutStep::Shipping));

        checkout.begin(&cart_with("10.00", 1)).unwrap();
        assert!(checkout.can_view(CheckoutStep::Shipping));
        assert!(!checkout.can_view(CheckoutStep::Payment));
        assert!(!checkout.can_view(CheckoutStep::Review));
    }

    #[test]
    fn test_summary_flat_shipping_and_tax() {
        let summary = OrderSummary::compute(&cart_with("12.50", 2), &rules("0.08"));
        assert_eq!(summary.subtotal, "25.00".parse().unwrap());
        assert_eq!(summary.shipping, "5.00".parse().unwrap());
        assert_eq!(summary.tax, "2.00".parse().unwrap());
        assert_eq!(summary.total, "32.00".parse().unwrap());
    }

    #[test]
    fn test_summary_free_shipping_at_threshold() {
        let summary = OrderSummary::compute(&cart_with("25.00", 2), &rules("0"));
        assert_eq!(summary.shipping, Decimal::ZERO);
        assert_eq!(summary.total, "50.00".parse().unwrap());
    }

    #[test]
    fn test_summary_tax_rounds_half_up() {
        // 3 × 1.15 = 3.45; 3.45 × 0.07 = 0.2415 → 0.24
        let summary = OrderSummary::compute(&cart_with("1.15", 3), &rules("0.07"));
        assert_eq!(summary.tax, "0.24".parse().unwrap());
        // 0.5 × 0.05 = 0.025 → 0.03
        let summary = OrderSummary::compute(&cart_with("0.50", 1), &rules("0.05"));
        assert_eq!(summary.tax, "0.03".parse().unwrap());
    }

    #[test]
    fn test_summary_empty_cart_is_zero() {
        let summary = OrderSummary::compute(&Cart::default(), &rules("0.1"));
        assert_eq!(summary.total, Decimal::ZERO);
    }

    #[test]
    fn test_build_order_carries_lines_and_totals() {
        let cart = cart_with("10.00", 3);
        let mut checkout = Checkout::default();
        checkout.begin(&cart).unwrap();
        checkout.submit_shipping(&shipping_form()).unwrap();

        let summary = OrderSummary::compute(&cart, &rules("0"));
        assert_eq!(
            checkout.build_order(&cart, &summary).unwrap_err(),
            CheckoutError::MissingPayment
        );

        checkout.submit_payment(Some(PaymentMethod::CashOnDelivery)).unwrap();
        let order = checkout.build_order(&cart, &summary).unwrap();
        assert_eq!(order.order_items.len(), 1);
        assert_eq!(order.order_items[0].quantity, 3);
        assert_eq!(order.items_price, "30.00".parse().unwrap());
        assert_eq!(order.total_price, "35.00".parse().unwrap());
        assert_eq!(
            order.order_items[0].image.as_deref(),
            Some("https://cdn.example.com/lamp.jpg")
        );
    }

    #[test]
    fn test_build_order_only_from_review() {
        let cart = cart_with("10.00", 1);
        let summary = OrderSummary::compute(&cart, &rules("0"));
        let mut checkout = Checkout::default();
        checkout.begin(&cart).unwrap();
        checkout.submit_shipping(&shipping_form()).unwrap();
        checkout.submit_payment(Some(PaymentMethod::Paypal)).unwrap();

        // Stepping back keeps the data but leaves review
        checkout.back();
        assert_eq!(
            checkout.build_order(&cart, &summary).unwrap_err(),
            CheckoutError::NotReviewed
        );
        checkout.back();
        assert_eq!(
            checkout.build_order(&cart, &summary).unwrap_err(),
            CheckoutError::NotReviewed
        );

        checkout.submit_shipping(&shipping_form()).unwrap();
        checkout.submit_payment(Some(PaymentMethod::Paypal)).unwrap();
        assert!(checkout.build_order(&cart, &summary).is_ok());
    }

    #[test]
    fn test_missing_fields_message() {
        let err = CheckoutError::MissingFields(vec!["city", "phone"]);
        assert_eq!(err.to_string(), "please fill in: city, phone");
    }
}
