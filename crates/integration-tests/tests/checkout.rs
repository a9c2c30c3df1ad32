//! The checkout wizard from cart to confirmation.

#![allow(clippy::unwrap_used)]

use marketstall_integration_tests::{Account, TestApp, location};

const ADDRESS: [(&str, &str); 6] = [
    ("full_name", "Ada Customer"),
    ("address", "12 Market Street"),
    ("city", "Leeds"),
    ("postal_code", "LS1 4AP"),
    ("country", "UK"),
    ("phone", "+44 113 496 0000"),
];

/// Signed-in customer with two totes, parked on the review step.
async fn at_review() -> TestApp {
    let app = TestApp::spawn().await;
    app.add_to_cart("p1", 2).await;
    app.login_as(Account::Customer).await;

    assert_eq!(location(&app.get("/checkout").await), "/checkout/shipping");
    let response = app.post_form("/checkout/shipping", &ADDRESS).await;
    assert_eq!(location(&response), "/checkout/payment");
    let response = app
        .post_form("/checkout/payment", &[("payment_method", "paypal")])
        .await;
    assert_eq!(location(&response), "/checkout/review");
    app
}

#[tokio::test]
async fn test_checkout_requires_login() {
    let app = TestApp::spawn().await;
    app.add_to_cart("p1", 1).await;

    let response = app.get("/checkout/shipping").await;
    assert_eq!(response.status(), 303);
    assert_eq!(
        location(&response),
        "/auth/login?next=%2Fcheckout%2Fshipping"
    );
}

#[tokio::test]
async fn test_empty_cart_cannot_check_out() {
    let app = TestApp::spawn().await;
    app.login_as(Account::Customer).await;

    let response = app.get("/checkout").await;
    assert_eq!(location(&response), "/cart");
    let body = app.page("/cart").await;
    assert!(body.contains("Your cart is empty"));
}

#[tokio::test]
async fn test_shipping_form_is_prefilled_and_validated() {
    let app = TestApp::spawn().await;
    app.add_to_cart("p1", 1).await;
    app.login_as(Account::Customer).await;
    app.get("/checkout").await;

    let body = app.page("/checkout/shipping").await;
    assert!(body.contains(r#"value="Ada Customer""#));

    let response = app
        .post_form("/checkout/shipping", &[("full_name", "Ada Customer"), ("city", "Leeds")])
        .await;
    assert_eq!(response.status(), 422);
    let body = response.text().await.unwrap();
    assert!(body.contains("please fill in:"));
    // What was typed survives the error
    assert!(body.contains(r#"value="Leeds""#));

    // Payment cannot be skipped to
    assert_eq!(location(&app.get("/checkout/payment").await), "/checkout/shipping");
}

#[tokio::test]
async fn test_payment_method_is_required() {
    let app = TestApp::spawn().await;
    app.add_to_cart("p1", 1).await;
    app.login_as(Account::Customer).await;
    app.get("/checkout").await;
    app.post_form("/checkout/shipping", &ADDRESS).await;

    assert_eq!(location(&app.get("/checkout/review").await), "/checkout/payment");

    let response = app.post_form("/checkout/payment", &[]).await;
    assert_eq!(response.status(), 422);
    assert!(response.text().await.unwrap().contains("please choose a payment method"));

    let response = app
        .post_form("/checkout/payment", &[("payment_method", "bitcoin")])
        .await;
    assert_eq!(response.status(), 422);
}

#[tokio::test]
async fn test_review_and_back() {
    let app = at_review().await;

    let body = app.page("/checkout/review").await;
    assert!(body.contains("12 Market Street"));
    assert!(body.contains("PayPal"));
    assert!(body.contains("$30.00"));

    let response = app.post_form("/checkout/back", &[]).await;
    assert_eq!(location(&response), "/checkout/payment");
    let body = app.page("/checkout/payment").await;
    assert!(body.contains(r#"value="paypal" checked"#));

    // Resuming lands on the step we went back to
    assert_eq!(location(&app.get("/checkout").await), "/checkout/payment");
}

#[tokio::test]
async fn test_placing_an_order() {
    let app = at_review().await;

    let response = app.post_form("/checkout/place", &[]).await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/checkout/confirmation/o1");

    let orders = app.backend.orders();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order["orderItems"][0]["product"], "p1");
    assert_eq!(order["orderItems"][0]["quantity"], 2);
    assert_eq!(order["orderItems"][0]["price"], 12.5);
    assert_eq!(order["shippingAddress"]["postalCode"], "LS1 4AP");
    assert_eq!(order["paymentMethod"], "paypal");
    assert_eq!(order["itemsPrice"], 25.0);
    assert_eq!(order["shippingPrice"], 5.0);
    assert_eq!(order["totalPrice"], 30.0);

    let body = app.page("/checkout/confirmation/o1").await;
    assert!(body.contains("Thank you! Your order has been placed."));
    assert!(body.contains("o1"));
    assert!(body.contains("Mar 14, 2026"));

    // Cart and wizard are gone
    assert!(app.page("/cart").await.contains("Your cart is empty."));
    assert_eq!(location(&app.get("/checkout/review").await), "/cart");
}

#[tokio::test]
async fn test_order_cannot_skip_review() {
    let app = at_review().await;

    app.post_form("/checkout/back", &[]).await;
    let response = app.post_form("/checkout/back", &[]).await;
    assert_eq!(location(&response), "/checkout/shipping");

    // Shipping and payment are still on file, but the order was not reviewed
    let response = app.post_form("/checkout/place", &[]).await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/checkout/shipping");
    assert!(app.backend.orders().is_empty());

    let body = app.page("/checkout/shipping").await;
    assert!(body.contains("Please review your order before placing it"));
    assert!(app.page("/cart").await.contains("Canvas Tote"));
}

#[tokio::test]
async fn test_pending_toasts_survive_checkout_redirects() {
    let app = TestApp::spawn().await;
    app.add_to_cart("p1", 1).await;

    // Bounced to login before any page rendered the toast
    let response = app.get("/checkout/shipping").await;
    assert_eq!(response.status(), 303);
    let body = app.page("/auth/login?next=%2Fcheckout%2Fshipping").await;
    assert!(body.contains("Added Canvas Tote to your cart."));

    app.add_to_cart("p1", 1).await;
    app.login_as(Account::Customer).await;
    app.get("/checkout").await;
    let response = app.post_form("/checkout/shipping", &ADDRESS).await;
    assert_eq!(location(&response), "/checkout/payment");

    let body = app.page("/checkout/payment").await;
    assert!(body.contains("Added Canvas Tote to your cart."));
    assert!(body.contains("Welcome back, Ada Customer!"));
}

#[tokio::test]
async fn test_failed_order_keeps_cart() {
    let app = at_review().await;
    app.backend.take_orders_down();

    let response = app.post_form("/checkout/place", &[]).await;
    assert_eq!(location(&response), "/checkout/review");

    let body = app.page("/checkout/review").await;
    assert!(body.contains("We could not reach the store right now"));
    assert!(!body.contains("write concern"));
    assert!(body.contains("Canvas Tote"));
    assert!(app.backend.orders().is_empty());
}

#[tokio::test]
async fn test_expired_token_signs_out_at_place() {
    let app = at_review().await;
    app.backend.expire_token(Account::Customer);

    let response = app.post_form("/checkout/place", &[]).await;
    assert_eq!(location(&response), "/auth/login?expired=1");

    let body = app.page("/auth/login?expired=1").await;
    assert!(body.contains("Your session has expired. Please sign in again."));

    // Signed out, but the cart survives
    assert_eq!(app.get("/account").await.status(), 303);
    assert!(app.page("/cart").await.contains("Canvas Tote"));
}

#[tokio::test]
async fn test_unknown_confirmation_is_not_found() {
    let app = TestApp::spawn().await;
    app.login_as(Account::Customer).await;

    assert_eq!(app.get("/checkout/confirmation/o999").await.status(), 404);
}
