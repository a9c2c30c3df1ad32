//! HTTP client for the backend REST API.

use std::sync::Arc;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use marketstall_core::{OrderId, OrderStatus, ProductId};

use super::cache::{CacheKey, CacheValue};
use super::types::{
    AdminStats, AuthPayload, LoginRequest, NewOrder, NewReview, Order, Product, ProductPage,
    ProductQuery, RegisterRequest, Review, SellerStats, StatusUpdate, User,
};
use super::{ApiError, Envelope};
use crate::config::BackendApiConfig;

/// Header carrying the optional service key.
const SERVICE_KEY_HEADER: &str = "x-api-key";

/// Longest body excerpt kept in error messages and logs.
const BODY_EXCERPT_CHARS: usize = 300;

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the backend REST API.
///
/// Cheap to clone; all clones share one connection pool and catalog cache.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    service_key: Option<SecretString>,
    cache: Cache<CacheKey, CacheValue>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &BackendApiConfig) -> Result<Self, ApiError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.cache_ttl)
            .support_invalidation_closures()
            .build();

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("marketstall-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.base_url.clone(),
                service_key: config.service_key.clone(),
                cache,
            }),
        })
    }

    /// Build a request carrying the service key and optional bearer token.
    fn request(&self, method: Method, url: Url, token: Option<&str>) -> RequestBuilder {
        let mut builder = self
            .inner
            .client
            .request(method, url)
            .header("Accept", "application/json");

        if let Some(key) = &self.inner.service_key {
            builder = builder.header(SERVICE_KEY_HEADER, key.expose_secret());
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// Send a request and unwrap the envelope's data.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let (status, envelope) = self.send_envelope::<T>(builder).await?;
        envelope.into_data(status)
    }

    /// Send a request whose envelope carries no meaningful data.
    async fn send_without_data(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        let (status, envelope) = self.send_envelope::<serde_json::Value>(builder).await?;
        if envelope.success {
            Ok(())
        } else {
            Err(ApiError::Rejected {
                status,
                message: envelope
                    .message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            })
        }
    }

    async fn send_envelope<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<(StatusCode, Envelope<T>), ApiError> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        // Read as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| excerpt(&body));

            tracing::warn!(
                status = %status,
                message = %message,
                "Backend returned non-success status"
            );

            return Err(match status {
                StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
                StatusCode::FORBIDDEN => ApiError::Forbidden(message),
                StatusCode::NOT_FOUND => ApiError::NotFound(message),
                _ => ApiError::Rejected { status, message },
            });
        }

        match serde_json::from_str::<Envelope<T>>(&body) {
            Ok(envelope) => Ok((status, envelope)),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %excerpt(&body),
                    "Failed to parse backend response envelope"
                );
                Err(ApiError::Parse(e))
            }
        }
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Check that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or is unhealthy.
    pub async fn health(&self) -> Result<(), ApiError> {
        let url = self.endpoint("health")?;
        let response = self.request(Method::GET, url, None).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::Rejected {
                status: response.status(),
                message: "health check failed".to_string(),
            })
        }
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Get one page of the catalog.
    ///
    /// Results are cached unless the query contains a free-text search.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, ApiError> {
        let cache_key = CacheKey::Products(query.clone());
        let cacheable = query.search.is_none();

        if cacheable
            && let Some(CacheValue::Products(page)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for product page");
            return Ok(page);
        }

        let mut url = self.endpoint("products")?;
        url.query_pairs_mut().extend_pairs(query.to_pairs());

        let page: ProductPage = self.send(self.request(Method::GET, url, None)).await?;

        if cacheable {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Products(page.clone()))
                .await;
        }

        Ok(page)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let cache_key = CacheKey::Product(id.clone());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let url = self.endpoint(&format!("products/{id}"))?;
        let product: Product = self.send(self.request(Method::GET, url, None)).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get the list of catalog categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<String>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let url = self.endpoint("products/categories")?;
        let categories: Vec<String> = self.send(self.request(Method::GET, url, None)).await?;

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;

        Ok(categories)
    }

    /// Get the reviews for a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product_reviews(&self, id: &ProductId) -> Result<Vec<Review>, ApiError> {
        let url = self.endpoint(&format!("products/{id}/reviews"))?;
        self.send(self.request(Method::GET, url, None)).await
    }

    /// Post a review and drop the cached product and listing pages so the new
    /// rating shows everywhere.
    ///
    /// # Errors
    ///
    /// Returns an error if the review is rejected or the API request fails.
    #[instrument(skip(self, token, review), fields(product_id = %id))]
    pub async fn create_review(
        &self,
        token: &str,
        id: &ProductId,
        review: &NewReview,
    ) -> Result<Review, ApiError> {
        let url = self.endpoint(&format!("products/{id}/reviews"))?;
        let created = self
            .send(self.request(Method::POST, url, Some(token)).json(review))
            .await?;
        self.forget_ratings(id).await;
        Ok(created)
    }

    /// Drop every cached entry that carries `id`'s rating.
    async fn forget_ratings(&self, id: &ProductId) {
        let cache = &self.inner.cache;
        cache.invalidate(&CacheKey::Product(id.clone())).await;
        if let Err(e) = cache.invalidate_entries_if(|key, _| matches!(key, CacheKey::Products(_))) {
            tracing::warn!(error = %e, "Could not drop cached product pages");
        }
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Exchange credentials for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for bad credentials, or another error
    /// if the API request fails.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthPayload, ApiError> {
        let url = self.endpoint("auth/login")?;
        self.send(self.request(Method::POST, url, None).json(request))
            .await
    }

    /// Create an account and return its bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error if registration is rejected or the API request fails.
    #[instrument(skip(self, request), fields(email = %request.email, role = %request.role))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthPayload, ApiError> {
        let url = self.endpoint("auth/register")?;
        self.send(self.request(Method::POST, url, None).json(request))
            .await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Orders placed by the signed-in customer.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn my_orders(&self, token: &str) -> Result<Vec<Order>, ApiError> {
        self.get_authed("orders/my", token).await
    }

    /// A single order visible to the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is not found or the API request fails.
    #[instrument(skip(self, token), fields(order_id = %id))]
    pub async fn get_order(&self, token: &str, id: &OrderId) -> Result<Order, ApiError> {
        self.get_authed(&format!("orders/{id}"), token).await
    }

    /// Create an order from a completed checkout.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is rejected or the API request fails.
    #[instrument(skip(self, token, order), fields(lines = order.order_items.len()))]
    pub async fn create_order(&self, token: &str, order: &NewOrder) -> Result<Order, ApiError> {
        let url = self.endpoint("orders")?;
        self.send(self.request(Method::POST, url, Some(token)).json(order))
            .await
    }

    /// Move an order to a new status (seller or admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the change is rejected or the API request fails.
    #[instrument(skip(self, token), fields(order_id = %id, status = %status))]
    pub async fn update_order_status(
        &self,
        token: &str,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, ApiError> {
        let url = self.endpoint(&format!("orders/{id}/status"))?;
        self.send(
            self.request(Method::PUT, url, Some(token))
                .json(&StatusUpdate { status }),
        )
        .await
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    /// Products on the signed-in customer's wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn wishlist(&self, token: &str) -> Result<Vec<Product>, ApiError> {
        self.get_authed("wishlist", token).await
    }

    /// Add a product to the wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn add_to_wishlist(&self, token: &str, id: &ProductId) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("wishlist/{id}"))?;
        self.send_without_data(self.request(Method::POST, url, Some(token)))
            .await
    }

    /// Remove a product from the wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn remove_from_wishlist(&self, token: &str, id: &ProductId) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("wishlist/{id}"))?;
        self.send_without_data(self.request(Method::DELETE, url, Some(token)))
            .await
    }

    // =========================================================================
    // Seller dashboard
    // =========================================================================

    /// Seller dashboard figures.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn seller_stats(&self, token: &str) -> Result<SellerStats, ApiError> {
        self.get_authed("seller/stats", token).await
    }

    /// Products listed by the signed-in seller.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn seller_products(&self, token: &str) -> Result<Vec<Product>, ApiError> {
        self.get_authed("seller/products", token).await
    }

    /// Orders containing the signed-in seller's products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn seller_orders(&self, token: &str) -> Result<Vec<Order>, ApiError> {
        self.get_authed("seller/orders", token).await
    }

    // =========================================================================
    // Admin dashboard
    // =========================================================================

    /// Store-wide figures.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn admin_stats(&self, token: &str) -> Result<AdminStats, ApiError> {
        self.get_authed("admin/stats", token).await
    }

    /// All user accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn admin_users(&self, token: &str) -> Result<Vec<User>, ApiError> {
        self.get_authed("admin/users", token).await
    }

    /// All orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn admin_orders(&self, token: &str) -> Result<Vec<Order>, ApiError> {
        self.get_authed("admin/orders", token).await
    }

    async fn get_authed<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        self.send(self.request(Method::GET, url, Some(token))).await
    }
}

/// Truncate a response body for logs and error messages.
fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> BackendClient {
        BackendClient::new(&BackendApiConfig::new(Url::parse(base).unwrap())).unwrap()
    }

    #[test]
    fn test_endpoint_joins_relative_to_base_path() {
        let client = client("http://localhost:5000/api/");
        assert_eq!(
            client.endpoint("products/abc").unwrap().as_str(),
            "http://localhost:5000/api/products/abc"
        );
    }

    #[test]
    fn test_excerpt_truncates() {
        let body = "x".repeat(BODY_EXCERPT_CHARS * 2);
        assert_eq!(excerpt(&body).len(), BODY_EXCERPT_CHARS);
    }

    #[tokio::test]
    async fn test_review_drops_product_and_listings_from_cache() {
        let client = client("http://localhost:5000/api/");
        let cache = &client.inner.cache;
        let id = ProductId::parse("p1").unwrap();
        let listing = CacheKey::Products(ProductQuery::default());

        cache
            .insert(
                listing.clone(),
                CacheValue::Products(ProductPage {
                    products: Vec::new(),
                    page: 1,
                    pages: 1,
                    total: 0,
                }),
            )
            .await;
        cache
            .insert(CacheKey::Categories, CacheValue::Categories(vec!["bags".to_string()]))
            .await;

        client.forget_ratings(&id).await;
        cache.run_pending_tasks().await;

        assert!(cache.get(&listing).await.is_none());
        assert!(cache.get(&CacheKey::Categories).await.is_some());
    }

    #[tokio::test]
    async fn test_connection_refused_is_http_error() {
        // Port 9 (discard) is not expected to have an HTTP listener
        let client = client("http://127.0.0.1:9/api/");
        let err = client.categories().await.unwrap_err();
        assert!(matches!(err, ApiError::Http(_)));
    }
}
