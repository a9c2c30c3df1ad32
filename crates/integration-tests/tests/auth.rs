//! Sign-in, registration, sign-out and role gates.

#![allow(clippy::unwrap_used)]

use marketstall_integration_tests::{Account, TestApp, location};

#[tokio::test]
async fn test_login_success_redirects_home() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/login",
            &[("email", Account::Customer.email()), ("password", Account::PASSWORD)],
        )
        .await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/");

    let body = app.page("/").await;
    assert!(body.contains("Welcome back, Ada Customer!"));
    assert!(body.contains("Sign out"));
    assert!(!body.contains(r#"href="/seller""#));
}

#[tokio::test]
async fn test_login_follows_local_next_only() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/login",
            &[
                ("email", Account::Customer.email()),
                ("password", Account::PASSWORD),
                ("next", "/checkout"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/checkout");

    let other = TestApp::spawn().await;
    let response = other
        .post_form(
            "/auth/login",
            &[
                ("email", Account::Customer.email()),
                ("password", Account::PASSWORD),
                ("next", "https://evil.example/phish"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_login_failures_rerender_the_form() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/login",
            &[("email", Account::Customer.email()), ("password", "wrong")],
        )
        .await;
    assert_eq!(response.status(), 422);
    let body = response.text().await.unwrap();
    assert!(body.contains("Invalid email or password"));
    assert!(body.contains(r#"value="ada@example.com""#));

    let response = app
        .post_form("/auth/login", &[("email", "nobody"), ("password", "x")])
        .await;
    assert_eq!(response.status(), 422);
    assert!(response.text().await.unwrap().contains("Please enter a valid email address"));
}

#[tokio::test]
async fn test_login_is_rate_limited() {
    let app = TestApp::spawn().await;

    let mut statuses = Vec::new();
    for _ in 0..8 {
        let response = app
            .post_form(
                "/auth/login",
                &[("email", Account::Customer.email()), ("password", "wrong")],
            )
            .await;
        statuses.push(response.status().as_u16());
    }
    assert_eq!(statuses[0], 422);
    assert!(statuses.contains(&429));
}

#[tokio::test]
async fn test_signed_in_visitors_skip_the_login_page() {
    let app = TestApp::spawn().await;
    assert_eq!(app.get("/auth/login").await.status(), 200);

    app.login_as(Account::Customer).await;
    let response = app.get("/auth/login?next=%2Faccount").await;
    assert_eq!(location(&response), "/account");

    // The welcome toast waits for the next rendered page
    assert!(app.page("/account").await.contains("Welcome back"));
}

#[tokio::test]
async fn test_register_seller_account() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/register",
            &[
                ("name", "Grace Maker"),
                ("email", "grace@example.com"),
                ("password", "knitting-needles"),
                ("password_confirm", "knitting-needles"),
                ("seller", "on"),
            ],
        )
        .await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/");

    let body = app.page("/").await;
    assert!(body.contains("Welcome to Marketstall, Grace Maker!"));
    assert_eq!(app.get("/seller").await.status(), 200);
}

#[tokio::test]
async fn test_register_validation_and_duplicates() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/register",
            &[
                ("name", "Grace Maker"),
                ("email", "grace@example.com"),
                ("password", "short"),
                ("password_confirm", "short"),
            ],
        )
        .await;
    assert_eq!(response.status(), 422);
    let body = response.text().await.unwrap();
    assert!(body.contains("Password must be at least 8 characters"));
    assert!(body.contains(r#"value="Grace Maker""#));

    let response = app
        .post_form(
            "/auth/register",
            &[
                ("name", "Ada Again"),
                ("email", Account::Customer.email()),
                ("password", "long-enough-1"),
                ("password_confirm", "long-enough-1"),
            ],
        )
        .await;
    assert_eq!(response.status(), 422);
    assert!(response.text().await.unwrap().contains("User already exists"));
}

#[tokio::test]
async fn test_logout_keeps_cart() {
    let app = TestApp::spawn().await;
    app.add_to_cart("p1", 1).await;
    app.login_as(Account::Customer).await;

    let response = app.post_form("/auth/logout", &[]).await;
    assert_eq!(location(&response), "/");

    let body = app.page("/").await;
    assert!(body.contains("You have been signed out."));
    assert!(!body.contains("Sign out"));

    let response = app.get("/account").await;
    assert_eq!(location(&response), "/auth/login?next=%2Faccount");
    assert!(app.page("/cart").await.contains("Canvas Tote"));
}

#[tokio::test]
async fn test_htmx_requests_get_hx_redirect() {
    let app = TestApp::spawn().await;

    let response = app.htmx_post("/account/wishlist/p1", &[]).await;
    assert_eq!(response.status(), 401);
    assert_eq!(response.headers()["hx-redirect"], "/auth/login");
}

#[tokio::test]
async fn test_role_gates() {
    let customer = TestApp::spawn().await;
    customer.login_as(Account::Customer).await;
    assert_eq!(customer.get("/seller").await.status(), 403);
    assert_eq!(customer.get("/admin").await.status(), 403);

    let seller = TestApp::spawn().await;
    seller.login_as(Account::Seller).await;
    assert_eq!(seller.get("/seller").await.status(), 200);
    assert_eq!(seller.get("/admin/users").await.status(), 403);

    let admin = TestApp::spawn().await;
    admin.login_as(Account::Admin).await;
    assert_eq!(admin.get("/seller/orders").await.status(), 200);
    assert_eq!(admin.get("/admin").await.status(), 200);
}
