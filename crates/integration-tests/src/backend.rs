//! In-memory stand-in for the Marketstall backend REST API.
//!
//! Speaks the same `{ success, data, message }` envelope, camelCase JSON and
//! `_id` identifiers as the real service. Three accounts exist up front, one
//! per role, each with a fixed bearer token.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use url::Url;

/// Timestamp stamped on everything the mock creates.
const CREATED_AT: &str = "2026-03-14T09:30:00Z";

/// A seeded account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Account {
    Customer,
    Seller,
    Admin,
}

impl Account {
    pub const fn email(self) -> &'static str {
        match self {
            Self::Customer => "ada@example.com",
            Self::Seller => "sam@example.com",
            Self::Admin => "alex@example.com",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Customer => "Ada Customer",
            Self::Seller => "Sam Seller",
            Self::Admin => "Alex Admin",
        }
    }

    pub const fn token(self) -> &'static str {
        match self {
            Self::Customer => "token-customer",
            Self::Seller => "token-seller",
            Self::Admin => "token-admin",
        }
    }

    pub const PASSWORD: &'static str = "correct-horse";
}

#[derive(Debug, Clone)]
struct MockUser {
    id: String,
    name: String,
    email: String,
    password: String,
    /// Wire value; customers are `"user"` like the real backend.
    role: String,
    token: String,
}

impl MockUser {
    fn seeded(account: Account, id: &str, role: &str) -> Self {
        Self {
            id: id.to_string(),
            name: account.name().to_string(),
            email: account.email().to_string(),
            password: Account::PASSWORD.to_string(),
            role: role.to_string(),
            token: account.token().to_string(),
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "_id": self.id,
            "name": self.name,
            "email": self.email,
            "role": self.role,
            "createdAt": CREATED_AT,
        })
    }

    fn can_sell(&self) -> bool {
        self.role == "seller" || self.role == "admin"
    }
}

#[derive(Debug)]
struct MockData {
    products: Vec<Value>,
    users: Vec<MockUser>,
    orders: Vec<Value>,
    reviews: Vec<(String, String, Value)>,
    wishlist: Vec<String>,
    expired_tokens: HashSet<String>,
    catalog_down: bool,
    orders_down: bool,
    next_id: u32,
}

impl Default for MockData {
    fn default() -> Self {
        Self {
            products: vec![
                product("p1", "Canvas Tote", "12.50", "bags", 10),
                product("p2", "Enamel Mug", "8.00", "kitchen", 2),
                product("p3", "Linen Apron", "30.00", "kitchen", 0),
            ],
            users: vec![
                MockUser::seeded(Account::Customer, "u-customer", "user"),
                MockUser::seeded(Account::Seller, "u-seller", "seller"),
                MockUser::seeded(Account::Admin, "u-admin", "admin"),
            ],
            orders: Vec::new(),
            reviews: Vec::new(),
            wishlist: Vec::new(),
            expired_tokens: HashSet::new(),
            catalog_down: false,
            orders_down: false,
            next_id: 1,
        }
    }
}

fn product(id: &str, name: &str, price: &str, category: &str, stock: u32) -> Value {
    json!({
        "_id": id,
        "name": name,
        "description": format!("{name} made by hand."),
        "price": price.parse::<f64>().unwrap_or_default(),
        "category": category,
        "images": [format!("https://cdn.example.com/{id}.jpg")],
        "countInStock": stock,
        "rating": 4.5,
        "numReviews": 0,
        "sellerName": "Sam Seller",
        "createdAt": CREATED_AT,
    })
}

type Reply = (StatusCode, Json<Value>);

fn ok(data: Value) -> Reply {
    (StatusCode::OK, Json(json!({ "success": true, "data": data })))
}

fn fail(status: StatusCode, message: &str) -> Reply {
    (
        status,
        Json(json!({ "success": false, "message": message })),
    )
}

/// Shared handle on the mock's data.
#[derive(Clone, Default)]
pub struct MockBackend {
    data: Arc<Mutex<MockData>>,
}

impl MockBackend {
    fn lock(&self) -> MutexGuard<'_, MockData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the backend treat `account`'s token as expired.
    pub fn expire_token(&self, account: Account) {
        self.lock().expired_tokens.insert(account.token().to_string());
    }

    /// Fail every catalog read with a 500.
    pub fn take_catalog_down(&self) {
        self.lock().catalog_down = true;
    }

    /// Fail order creation with a 500.
    pub fn take_orders_down(&self) {
        self.lock().orders_down = true;
    }

    /// Orders created so far, as stored by the backend.
    pub fn orders(&self) -> Vec<Value> {
        self.lock().orders.clone()
    }

    /// Product IDs on the wishlist.
    pub fn wishlist(&self) -> Vec<String> {
        self.lock().wishlist.clone()
    }

    /// Serve the mock on an ephemeral port and return its API base URL.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn(&self) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr: SocketAddr = listener.local_addr().expect("mock backend address");

        let app = Router::new().nest("/api", self.routes());
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock backend");
        });

        Url::parse(&format!("http://{addr}/api/")).expect("mock backend url")
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/health", get(|| async { ok(json!({ "status": "ok" })) }))
            .route("/products", get(list_products))
            .route("/products/categories", get(categories))
            .route("/products/{id}", get(get_product))
            .route("/products/{id}/reviews", get(reviews).post(create_review))
            .route("/auth/login", post(login))
            .route("/auth/register", post(register))
            .route("/orders", post(create_order))
            .route("/orders/my", get(my_orders))
            .route("/orders/{id}", get(get_order))
            .route("/orders/{id}/status", put(update_status))
            .route("/wishlist", get(wishlist))
            .route(
                "/wishlist/{id}",
                post(add_to_wishlist).delete(remove_from_wishlist),
            )
            .route("/seller/stats", get(seller_stats))
            .route("/seller/products", get(seller_products))
            .route("/seller/orders", get(all_orders))
            .route("/admin/stats", get(admin_stats))
            .route("/admin/users", get(admin_users))
            .route("/admin/orders", get(all_orders))
            .with_state(self.clone())
    }

    /// Resolve the bearer token to a user.
    fn caller(&self, headers: &HeaderMap) -> Result<MockUser, Reply> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Not authorized, no token"))?;

        let data = self.lock();
        if data.expired_tokens.contains(token) {
            return Err(fail(StatusCode::UNAUTHORIZED, "Token expired"));
        }
        data.users
            .iter()
            .find(|u| u.token == token)
            .cloned()
            .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Not authorized, token failed"))
    }

    fn seller(&self, headers: &HeaderMap) -> Result<MockUser, Reply> {
        let user = self.caller(headers)?;
        if user.can_sell() {
            Ok(user)
        } else {
            Err(fail(StatusCode::FORBIDDEN, "Seller access only"))
        }
    }

    fn admin(&self, headers: &HeaderMap) -> Result<MockUser, Reply> {
        let user = self.caller(headers)?;
        if user.role == "admin" {
            Ok(user)
        } else {
            Err(fail(StatusCode::FORBIDDEN, "Admin access only"))
        }
    }
}

fn text(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Deserialize)]
struct CatalogQuery {
    search: Option<String>,
    category: Option<String>,
}

async fn list_products(State(mock): State<MockBackend>, Query(query): Query<CatalogQuery>) -> Reply {
    let data = mock.lock();
    if data.catalog_down {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "MongoNetworkError: connection reset");
    }

    let needle = query.search.map(|s| s.to_lowercase());
    let products: Vec<Value> = data
        .products
        .iter()
        .filter(|p| {
            needle
                .as_ref()
                .is_none_or(|n| text(p, "name").to_lowercase().contains(n))
        })
        .filter(|p| query.category.as_ref().is_none_or(|c| text(p, "category") == *c))
        .cloned()
        .collect();

    ok(json!({
        "total": products.len(),
        "products": products,
        "page": 1,
        "pages": 1,
    }))
}

async fn categories(State(mock): State<MockBackend>) -> Reply {
    if mock.lock().catalog_down {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "MongoNetworkError: connection reset");
    }
    ok(json!(["bags", "kitchen"]))
}

async fn get_product(State(mock): State<MockBackend>, Path(id): Path<String>) -> Reply {
    let data = mock.lock();
    data.products
        .iter()
        .find(|p| text(p, "_id") == id)
        .map_or_else(|| fail(StatusCode::NOT_FOUND, "Product not found"), |p| ok(p.clone()))
}

async fn reviews(State(mock): State<MockBackend>, Path(id): Path<String>) -> Reply {
    let data = mock.lock();
    let reviews: Vec<Value> = data
        .reviews
        .iter()
        .filter(|(product, _, _)| *product == id)
        .map(|(_, _, review)| review.clone())
        .collect();
    ok(json!(reviews))
}

async fn create_review(
    State(mock): State<MockBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    let user = match mock.caller(&headers) {
        Ok(user) => user,
        Err(reply) => return reply,
    };

    let mut data = mock.lock();
    if data
        .reviews
        .iter()
        .any(|(product, author, _)| *product == id && *author == user.id)
    {
        return fail(StatusCode::BAD_REQUEST, "Product already reviewed");
    }

    let review = json!({
        "_id": format!("r{}", data.next_id),
        "name": user.name,
        "rating": body["rating"],
        "comment": body["comment"],
        "createdAt": CREATED_AT,
    });
    data.next_id += 1;
    data.reviews.push((id.clone(), user.id, review.clone()));

    let ratings: Vec<f64> = data
        .reviews
        .iter()
        .filter(|(product, _, _)| *product == id)
        .filter_map(|(_, _, r)| r["rating"].as_f64())
        .collect();
    if let Some(product) = data.products.iter_mut().find(|p| text(p, "_id") == id) {
        #[allow(clippy::cast_precision_loss)]
        let average = ratings.iter().sum::<f64>() / ratings.len() as f64;
        product["rating"] = json!(average);
        product["numReviews"] = json!(ratings.len());
    }
    (StatusCode::CREATED, Json(json!({ "success": true, "data": review })))
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct Registration {
    name: String,
    email: String,
    password: String,
    role: String,
}

fn auth_payload(user: &MockUser) -> Value {
    json!({ "token": user.token, "user": user.to_json() })
}

async fn login(State(mock): State<MockBackend>, Json(body): Json<Credentials>) -> Reply {
    let data = mock.lock();
    data.users
        .iter()
        .find(|u| u.email == body.email && u.password == body.password)
        .map_or_else(
            || fail(StatusCode::UNAUTHORIZED, "Invalid credentials"),
            |user| ok(auth_payload(user)),
        )
}

async fn register(State(mock): State<MockBackend>, Json(body): Json<Registration>) -> Reply {
    let mut data = mock.lock();
    if data.users.iter().any(|u| u.email == body.email) {
        return fail(StatusCode::BAD_REQUEST, "User already exists");
    }

    let id = format!("u{}", data.next_id);
    data.next_id += 1;
    let user = MockUser {
        token: format!("token-{id}"),
        id,
        name: body.name,
        email: body.email,
        password: body.password,
        role: if body.role == "seller" { "seller".to_string() } else { "user".to_string() },
    };
    let payload = auth_payload(&user);
    data.users.push(user);
    (StatusCode::CREATED, Json(json!({ "success": true, "data": payload })))
}

// =============================================================================
// Orders
// =============================================================================

async fn create_order(
    State(mock): State<MockBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let user = match mock.caller(&headers) {
        Ok(user) => user,
        Err(reply) => return reply,
    };

    let mut data = mock.lock();
    if data.orders_down {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "write concern timeout");
    }

    let order = json!({
        "_id": format!("o{}", data.next_id),
        "user": { "name": user.name, "email": user.email },
        "userId": user.id,
        "orderItems": body["orderItems"],
        "shippingAddress": body["shippingAddress"],
        "paymentMethod": body["paymentMethod"],
        "itemsPrice": body["itemsPrice"],
        "shippingPrice": body["shippingPrice"],
        "taxPrice": body["taxPrice"],
        "totalPrice": body["totalPrice"],
        "status": "pending",
        "isPaid": false,
        "createdAt": CREATED_AT,
    });
    data.next_id += 1;
    data.orders.push(order.clone());
    (StatusCode::CREATED, Json(json!({ "success": true, "data": order })))
}

async fn my_orders(State(mock): State<MockBackend>, headers: HeaderMap) -> Reply {
    let user = match mock.caller(&headers) {
        Ok(user) => user,
        Err(reply) => return reply,
    };
    let data = mock.lock();
    let orders: Vec<Value> = data
        .orders
        .iter()
        .filter(|o| text(o, "userId") == user.id)
        .cloned()
        .collect();
    ok(json!(orders))
}

async fn get_order(
    State(mock): State<MockBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let user = match mock.caller(&headers) {
        Ok(user) => user,
        Err(reply) => return reply,
    };
    let data = mock.lock();
    data.orders
        .iter()
        .find(|o| text(o, "_id") == id && (text(o, "userId") == user.id || user.can_sell()))
        .map_or_else(|| fail(StatusCode::NOT_FOUND, "Order not found"), |o| ok(o.clone()))
}

async fn update_status(
    State(mock): State<MockBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    if let Err(reply) = mock.seller(&headers) {
        return reply;
    }
    let mut data = mock.lock();
    let Some(order) = data.orders.iter_mut().find(|o| text(o, "_id") == id) else {
        return fail(StatusCode::NOT_FOUND, "Order not found");
    };
    order["status"] = body["status"].clone();
    ok(order.clone())
}

// =============================================================================
// Wishlist
// =============================================================================

async fn wishlist(State(mock): State<MockBackend>, headers: HeaderMap) -> Reply {
    if let Err(reply) = mock.caller(&headers) {
        return reply;
    }
    let data = mock.lock();
    let products: Vec<Value> = data
        .products
        .iter()
        .filter(|p| data.wishlist.contains(&text(p, "_id")))
        .cloned()
        .collect();
    ok(json!(products))
}

async fn add_to_wishlist(
    State(mock): State<MockBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    if let Err(reply) = mock.caller(&headers) {
        return reply;
    }
    let mut data = mock.lock();
    if !data.products.iter().any(|p| text(p, "_id") == id) {
        return fail(StatusCode::NOT_FOUND, "Product not found");
    }
    if !data.wishlist.contains(&id) {
        data.wishlist.push(id);
    }
    (StatusCode::OK, Json(json!({ "success": true, "message": "Added to wishlist" })))
}

async fn remove_from_wishlist(
    State(mock): State<MockBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    if let Err(reply) = mock.caller(&headers) {
        return reply;
    }
    mock.lock().wishlist.retain(|p| *p != id);
    (StatusCode::OK, Json(json!({ "success": true, "message": "Removed from wishlist" })))
}

// =============================================================================
// Dashboards
// =============================================================================

fn revenue(orders: &[Value]) -> f64 {
    orders
        .iter()
        .filter_map(|o| o["totalPrice"].as_f64())
        .sum()
}

async fn seller_stats(State(mock): State<MockBackend>, headers: HeaderMap) -> Reply {
    if let Err(reply) = mock.seller(&headers) {
        return reply;
    }
    let data = mock.lock();
    ok(json!({
        "totalProducts": data.products.len(),
        "totalOrders": data.orders.len(),
        "totalRevenue": revenue(&data.orders),
        "pendingOrders": data.orders.iter().filter(|o| text(o, "status") == "pending").count(),
    }))
}

async fn seller_products(State(mock): State<MockBackend>, headers: HeaderMap) -> Reply {
    if let Err(reply) = mock.seller(&headers) {
        return reply;
    }
    ok(json!(mock.lock().products))
}

async fn all_orders(State(mock): State<MockBackend>, headers: HeaderMap) -> Reply {
    if let Err(reply) = mock.seller(&headers) {
        return reply;
    }
    ok(json!(mock.lock().orders))
}

async fn admin_stats(State(mock): State<MockBackend>, headers: HeaderMap) -> Reply {
    if let Err(reply) = mock.admin(&headers) {
        return reply;
    }
    let data = mock.lock();
    ok(json!({
        "totalUsers": data.users.len(),
        "totalProducts": data.products.len(),
        "totalOrders": data.orders.len(),
        "totalRevenue": revenue(&data.orders),
    }))
}

async fn admin_users(State(mock): State<MockBackend>, headers: HeaderMap) -> Reply {
    if let Err(reply) = mock.admin(&headers) {
        return reply;
    }
    let users: Vec<Value> = mock.lock().users.iter().map(MockUser::to_json).collect();
    ok(json!(users))
}
