//! Integration tests for the Marketstall storefront.
//!
//! Each test spawns the full storefront router (every middleware layer, an
//! in-memory session store) on an ephemeral port, talking to a mock of the
//! backend REST API spawned next to it. Requests go over real HTTP with a
//! cookie-keeping client, so sessions behave exactly as in a browser.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p marketstall-integration-tests
//! ```
//!
//! No database or network access is needed.

pub mod backend;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use marketstall_storefront::config::{
    BackendApiConfig, CheckoutConfig, LogFormat, StorefrontConfig,
};
use marketstall_storefront::state::AppState;
use reqwest::{Client, Response, redirect};
use secrecy::SecretString;
use tokio::net::TcpListener;
use tower_sessions::MemoryStore;

pub use backend::{Account, MockBackend};

/// A running storefront wired to a mock backend.
pub struct TestApp {
    pub addr: SocketAddr,
    pub backend: MockBackend,
    client: Client,
}

impl TestApp {
    /// Start a storefront with default checkout pricing.
    pub async fn spawn() -> Self {
        Self::spawn_with(MockBackend::default()).await
    }

    /// Start a storefront against an already-configured mock backend.
    ///
    /// # Panics
    ///
    /// Panics if either server cannot be started.
    pub async fn spawn_with(backend: MockBackend) -> Self {
        let api_url = backend.spawn().await;

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind storefront");
        let addr = listener.local_addr().expect("storefront address");

        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://unused"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: addr.port(),
            base_url: format!("http://{addr}"),
            store_name: "Marketstall".to_string(),
            static_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../storefront/static"),
            api: BackendApiConfig {
                base_url: api_url,
                service_key: None,
                timeout: Duration::from_secs(5),
                cache_ttl: Duration::from_secs(60),
            },
            checkout: CheckoutConfig::default(),
            log_format: LogFormat::Pretty,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_traces_sample_rate: 0.0,
        };

        let state = AppState::new(config).expect("storefront state");
        let app = marketstall_storefront::app(state, MemoryStore::default());
        tokio::spawn(async move {
            marketstall_storefront::serve(listener, app, std::future::pending::<()>())
                .await
                .expect("storefront server");
        });

        let client = Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .build()
            .expect("http client");

        Self {
            addr,
            backend,
            client,
        }
    }

    /// Absolute URL for a storefront path.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// GET a page without following redirects.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request")
    }

    /// GET a page and return its body, asserting a 200.
    ///
    /// # Panics
    ///
    /// Panics if the request fails or the status is not 200.
    pub async fn page(&self, path: &str) -> String {
        let response = self.get(path).await;
        assert_eq!(response.status(), 200, "GET {path}");
        response.text().await.expect("page body")
    }

    /// POST a urlencoded form as a plain browser submission.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request")
    }

    /// POST a urlencoded form the way HTMX does.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn htmx_post(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .header("HX-Request", "true")
            .form(form)
            .send()
            .await
            .expect("HTMX request")
    }

    /// Sign in as a seeded account.
    ///
    /// # Panics
    ///
    /// Panics if the login does not redirect.
    pub async fn login_as(&self, account: Account) {
        let response = self
            .post_form(
                "/auth/login",
                &[("email", account.email()), ("password", Account::PASSWORD)],
            )
            .await;
        assert_eq!(response.status(), 303, "login as {account:?}");
    }

    /// Put `quantity` of a product in the cart.
    ///
    /// # Panics
    ///
    /// Panics if the cart does not redirect back.
    pub async fn add_to_cart(&self, product_id: &str, quantity: u32) {
        let quantity = quantity.to_string();
        let response = self
            .post_form(
                "/cart/add",
                &[("product_id", product_id), ("quantity", &quantity)],
            )
            .await;
        assert_eq!(response.status(), 303, "add {product_id} to cart");
    }
}

/// The `Location` header of a redirect.
///
/// # Panics
///
/// Panics if the response carries no readable `Location`.
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("Location header")
        .to_string()
}
