//! Seller and admin dashboards.

#![allow(clippy::unwrap_used)]

use marketstall_integration_tests::{Account, TestApp, location};

/// An app with one pending order placed by the customer, then signed in
/// as `account`.
async fn with_order(account: Account) -> TestApp {
    let app = TestApp::spawn().await;
    app.login_as(Account::Customer).await;
    app.add_to_cart("p2", 1).await;
    app.get("/checkout").await;
    app.post_form(
        "/checkout/shipping",
        &[
            ("full_name", "Ada Customer"),
            ("address", "12 Market Street"),
            ("city", "Leeds"),
            ("postal_code", "LS1 4AP"),
            ("country", "UK"),
            ("phone", "+44 113 496 0000"),
        ],
    )
    .await;
    app.post_form("/checkout/payment", &[("payment_method", "cash_on_delivery")])
        .await;
    app.post_form("/checkout/place", &[]).await;
    assert_eq!(app.backend.orders().len(), 1);

    app.post_form("/auth/logout", &[]).await;
    app.login_as(account).await;
    app
}

#[tokio::test]
async fn test_seller_dashboard_stats() {
    let app = with_order(Account::Seller).await;

    let body = app.page("/seller").await;
    assert!(body.contains("Seller dashboard"));
    assert!(body.contains("<span>Products</span><strong>3</strong>"));
    assert!(body.contains("<span>Pending</span><strong>1</strong>"));
    // 8.00 plus 5.00 shipping
    assert!(body.contains("$13.00"));
    assert!(body.contains("Ada Customer"));
}

#[tokio::test]
async fn test_seller_products() {
    let app = TestApp::spawn().await;
    app.login_as(Account::Seller).await;

    let body = app.page("/seller/products").await;
    assert!(body.contains("Canvas Tote"));
    assert!(body.contains("Linen Apron"));
}

#[tokio::test]
async fn test_seller_updates_order_status() {
    let app = with_order(Account::Seller).await;

    let body = app.page("/seller/orders").await;
    assert!(body.contains(r#"<option value="pending" selected>"#));

    let response = app
        .post_form(
            "/seller/orders/o1/status",
            &[("status", "shipped"), ("return_to", "/seller/orders")],
        )
        .await;
    assert_eq!(location(&response), "/seller/orders");
    assert_eq!(app.backend.orders()[0]["status"], "shipped");

    let body = app.page("/seller/orders").await;
    assert!(body.contains("Order marked shipped."));
    assert!(body.contains(r#"<option value="shipped" selected>"#));
}

#[tokio::test]
async fn test_invalid_status_is_not_sent() {
    let app = with_order(Account::Seller).await;

    let response = app
        .post_form("/seller/orders/o1/status", &[("status", "lost")])
        .await;
    assert_eq!(location(&response), "/seller/orders");
    assert_eq!(app.backend.orders()[0]["status"], "pending");
    assert!(
        app.page("/seller/orders")
            .await
            .contains("Please choose a valid status.")
    );
}

#[tokio::test]
async fn test_admin_pages() {
    let app = with_order(Account::Admin).await;

    let body = app.page("/admin").await;
    assert!(body.contains("Store overview"));
    assert!(body.contains("<span>Users</span><strong>3</strong>"));
    assert!(body.contains("$13.00"));

    let body = app.page("/admin/users").await;
    assert!(body.contains("sam@example.com"));
    assert!(body.contains("<td>seller</td>"));
    assert!(body.contains("<td>customer</td>"));

    let body = app.page("/admin/orders").await;
    assert!(body.contains(r#"name="return_to" value="/admin/orders""#));

    // Admins use the seller status route and come back to their own list
    let response = app
        .post_form(
            "/seller/orders/o1/status",
            &[("status", "delivered"), ("return_to", "/admin/orders")],
        )
        .await;
    assert_eq!(location(&response), "/admin/orders");
    assert_eq!(app.backend.orders()[0]["status"], "delivered");
}
