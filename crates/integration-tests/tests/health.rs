//! Probes, security headers and static files.

#![allow(clippy::unwrap_used)]

use marketstall_integration_tests::TestApp;

#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::spawn().await;

    let response = app.get("/health").await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_readiness_checks_backend() {
    let app = TestApp::spawn().await;

    assert_eq!(app.get("/health/ready").await.status(), 200);
}

#[tokio::test]
async fn test_pages_carry_security_headers() {
    let app = TestApp::spawn().await;

    let response = app.get("/").await;
    assert_eq!(response.status(), 200);

    let headers = response.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["cache-control"], "no-store, max-age=0");
    assert!(headers.contains_key("x-request-id"));
    assert!(!headers.contains_key("strict-transport-security"));

    let csp = headers["content-security-policy"].to_str().unwrap();
    assert!(csp.contains("'nonce-"));
    assert!(csp.contains("frame-ancestors 'none'"));
}

#[tokio::test]
async fn test_csp_nonce_changes_per_request() {
    let app = TestApp::spawn().await;

    let first = app.get("/").await;
    let second = app.get("/").await;
    assert_ne!(
        first.headers()["content-security-policy"],
        second.headers()["content-security-policy"]
    );
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::spawn().await;

    let response = reqwest::Client::new()
        .get(app.url("/health"))
        .header("x-request-id", "trace-me-123")
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-me-123");
}

#[tokio::test]
async fn test_static_files_are_cacheable() {
    let app = TestApp::spawn().await;

    let response = app.get("/static/css/main.css").await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["cache-control"], "public, max-age=3600");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let app = TestApp::spawn().await;

    assert_eq!(app.get("/no/such/page").await.status(), 404);
}
