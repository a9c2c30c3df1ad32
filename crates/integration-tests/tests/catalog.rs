//! Home page, catalog browsing, product detail and reviews.

#![allow(clippy::unwrap_used)]

use marketstall_integration_tests::{Account, MockBackend, TestApp, location};

#[tokio::test]
async fn test_home_lists_products_and_categories() {
    let app = TestApp::spawn().await;

    let body = app.page("/").await;
    assert!(body.contains("Canvas Tote"));
    assert!(body.contains("kitchen"));
}

#[tokio::test]
async fn test_catalog_shows_prices_and_stock() {
    let app = TestApp::spawn().await;

    let body = app.page("/products").await;
    assert!(body.contains("3 products"));
    assert!(body.contains("Canvas Tote"));
    assert!(body.contains("$12.50"));
    // Linen Apron has no stock
    assert!(body.contains("Out of stock"));
}

#[tokio::test]
async fn test_catalog_search_and_category_filters() {
    let app = TestApp::spawn().await;

    let body = app.page("/products?search=mug").await;
    assert!(body.contains("1 products"));
    assert!(body.contains("Enamel Mug"));
    assert!(!body.contains("Canvas Tote"));

    let body = app.page("/products?category=kitchen").await;
    assert!(body.contains("2 products"));
    assert!(!body.contains("Canvas Tote"));
}

#[tokio::test]
async fn test_catalog_degrades_when_backend_is_down() {
    let backend = MockBackend::default();
    backend.take_catalog_down();
    let app = TestApp::spawn_with(backend).await;

    let body = app.page("/products").await;
    assert!(body.contains("No products match your search."));
    assert!(body.contains("We could not reach the store right now"));
    assert!(!body.contains("MongoNetworkError"));
}

#[tokio::test]
async fn test_product_detail() {
    let app = TestApp::spawn().await;

    let body = app.page("/products/p1").await;
    assert!(body.contains("Canvas Tote made by hand."));
    assert!(body.contains("10 in stock"));
    assert!(body.contains("No reviews yet."));
}

#[tokio::test]
async fn test_unknown_or_malformed_product_is_not_found() {
    let app = TestApp::spawn().await;

    assert_eq!(app.get("/products/nope").await.status(), 404);
    assert_eq!(app.get("/products/bad%20id").await.status(), 404);
}

#[tokio::test]
async fn test_review_requires_login() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form("/products/p1/reviews", &[("rating", "5"), ("comment", "Great")])
        .await;
    assert_eq!(response.status(), 303);
    // Form posts cannot be replayed, so no `next`
    assert_eq!(location(&response), "/auth/login");
}

#[tokio::test]
async fn test_posting_a_review() {
    let app = TestApp::spawn().await;
    app.login_as(Account::Customer).await;

    let response = app
        .post_form(
            "/products/p1/reviews",
            &[("rating", "4"), ("comment", "Sturdy and roomy")],
        )
        .await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/products/p1#reviews");

    let body = app.page("/products/p1").await;
    assert!(body.contains("Thanks for your review!"));
    assert!(body.contains("Sturdy and roomy"));
    assert!(body.contains("Ada Customer"));

    // The backend refuses a second review and its message is shown
    app.post_form("/products/p1/reviews", &[("rating", "1"), ("comment", "Again")])
        .await;
    let body = app.page("/products/p1").await;
    assert!(body.contains("Product already reviewed"));
}

#[tokio::test]
async fn test_new_review_refreshes_cached_catalog() {
    let app = TestApp::spawn().await;
    app.login_as(Account::Customer).await;

    // Warm the listing cache while the tote has no reviews
    let body = app.page("/products").await;
    assert!(!body.contains("out of 5"));

    app.post_form(
        "/products/p1/reviews",
        &[("rating", "3"), ("comment", "Handles are short")],
    )
    .await;

    let body = app.page("/products").await;
    assert!(body.contains(r#"title="3.0 out of 5""#));
    assert!(body.contains("(1)"));
}

#[tokio::test]
async fn test_invalid_review_is_not_sent() {
    let app = TestApp::spawn().await;
    app.login_as(Account::Customer).await;

    app.post_form("/products/p1/reviews", &[("rating", "9"), ("comment", "Wow")])
        .await;
    let body = app.page("/products/p1").await;
    assert!(body.contains("Please choose a rating from 1 to 5 stars"));
    assert!(body.contains("No reviews yet."));
}
