//! Session cart: plain form posts and HTMX fragments.

#![allow(clippy::unwrap_used)]

use marketstall_integration_tests::{TestApp, location};

#[tokio::test]
async fn test_empty_cart() {
    let app = TestApp::spawn().await;

    let body = app.page("/cart").await;
    assert!(body.contains("Your cart is empty."));
    assert!(
        app.page("/cart/count")
            .await
            .contains(r#"<span id="cart-count" class="badge">0</span>"#)
    );
}

#[tokio::test]
async fn test_add_without_javascript_redirects_to_cart() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form("/cart/add", &[("product_id", "p1"), ("quantity", "2")])
        .await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/cart");

    let body = app.page("/cart").await;
    assert!(body.contains("Added Canvas Tote to your cart."));
    assert!(body.contains("$25.00"));
    assert!(body.contains("$5.00"));
    assert!(body.contains("$30.00"));
    assert!(body.contains("Spend $25.00 more for free shipping."));

    // Toasts are shown once
    let body = app.page("/cart").await;
    assert!(!body.contains("Added Canvas Tote to your cart."));
}

#[tokio::test]
async fn test_htmx_add_returns_badge_and_triggers_refresh() {
    let app = TestApp::spawn().await;

    let response = app.htmx_post("/cart/add", &[("product_id", "p1")]).await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["hx-trigger"], "cart-updated");

    let body = response.text().await.unwrap();
    assert!(body.contains(r#"<span id="cart-count" class="badge">1</span>"#));
    assert!(body.contains(r#"hx-swap-oob="beforeend""#));
    assert!(body.contains("Added Canvas Tote to your cart."));

    app.htmx_post("/cart/add", &[("product_id", "p1")]).await;
    assert!(app.page("/cart/count").await.contains(">2</span>"));
}

#[tokio::test]
async fn test_add_is_clamped_to_stock() {
    let app = TestApp::spawn().await;

    let body = app
        .htmx_post("/cart/add", &[("product_id", "p2"), ("quantity", "5")])
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Only 2 of Enamel Mug can be in your cart."));
    assert!(body.contains(">2</span>"));
}

#[tokio::test]
async fn test_line_changes_are_clamped_to_stock() {
    let app = TestApp::spawn().await;
    app.add_to_cart("p2", 2).await;

    let body = app
        .htmx_post("/cart/increment", &[("product_id", "p2")])
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Only 2 of Enamel Mug can be in your cart."));
    assert!(body.contains(r#"name="quantity" value="2""#));

    let body = app
        .htmx_post("/cart/update", &[("product_id", "p2"), ("quantity", "50")])
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Only 2 of Enamel Mug can be in your cart."));
    assert!(body.contains(r#"name="quantity" value="2""#));
    assert!(!body.contains(">50<"));

    // Plain form posts carry the same notice to the cart page
    let response = app
        .post_form("/cart/update", &[("product_id", "p2"), ("quantity", "9")])
        .await;
    assert_eq!(location(&response), "/cart");
    let body = app.page("/cart").await;
    assert!(body.contains("Only 2 of Enamel Mug can be in your cart."));
    assert!(body.contains("$16.00"));
}

#[tokio::test]
async fn test_out_of_stock_and_unknown_products_are_refused() {
    let app = TestApp::spawn().await;

    let body = app
        .htmx_post("/cart/add", &[("product_id", "p3")])
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Linen Apron is out of stock."));
    assert!(body.contains(">0</span>"));

    let body = app
        .htmx_post("/cart/add", &[("product_id", "zzz")])
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("That item could not be found."));
    assert!(body.contains(">0</span>"));
}

#[tokio::test]
async fn test_htmx_line_mutations_return_cart_fragment() {
    let app = TestApp::spawn().await;
    app.add_to_cart("p1", 2).await;

    let response = app.htmx_post("/cart/increment", &[("product_id", "p1")]).await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["hx-trigger"], "cart-updated");
    let body = response.text().await.unwrap();
    assert!(body.contains(r#"<div id="cart-items">"#));
    assert!(body.contains(r#"name="quantity" value="3""#));
    assert!(body.contains("$37.50"));

    let body = app
        .htmx_post("/cart/update", &[("product_id", "p1"), ("quantity", "1")])
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains(r#"name="quantity" value="1""#));

    // A single unit never drops to zero
    let body = app
        .htmx_post("/cart/decrement", &[("product_id", "p1")])
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains(r#"name="quantity" value="1""#));

    let body = app
        .htmx_post("/cart/update", &[("product_id", "p1"), ("quantity", "0")])
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Quantity must be at least 1"));
    assert!(body.contains(r#"name="quantity" value="1""#));
}

#[tokio::test]
async fn test_remove_and_clear() {
    let app = TestApp::spawn().await;
    app.add_to_cart("p1", 1).await;
    app.add_to_cart("p2", 1).await;

    let body = app
        .htmx_post("/cart/remove", &[("product_id", "p2")])
        .await
        .text()
        .await
        .unwrap();
    assert!(!body.contains("Enamel Mug"));
    assert!(body.contains("Canvas Tote"));

    let body = app
        .htmx_post("/cart/remove", &[("product_id", "p2")])
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("is not in the cart"));

    let response = app.post_form("/cart/clear", &[]).await;
    assert_eq!(location(&response), "/cart");
    let body = app.page("/cart").await;
    assert!(body.contains("Your cart is empty."));
    assert!(body.contains("Your cart is now empty."));
}

#[tokio::test]
async fn test_free_shipping_threshold() {
    let app = TestApp::spawn().await;
    app.add_to_cart("p1", 4).await;

    let body = app.page("/cart").await;
    assert!(body.contains("$50.00"));
    assert!(body.contains("<dt>Shipping</dt><dd>$0.00</dd>"));
    assert!(!body.contains("more for free shipping"));
}
