//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use url::form_urlencoded;

use marketstall_core::ProductId;

use crate::backend::{NewReview, Product, ProductPage, ProductQuery, ProductSort, Review};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{OptionalAuth, Page, RequireAuth};
use crate::models::{Cart, MAX_LINE_QUANTITY, Toast};
use crate::state::AppState;

use super::{recover, write_failed};

/// Longest review comment accepted.
const MAX_COMMENT_CHARS: usize = 2000;

// =============================================================================
// Catalog
// =============================================================================

/// Catalog query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogParams {
    pub page: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
}

impl CatalogParams {
    /// Normalize into a backend query: blank filters are dropped and an
    /// unknown sort falls back to newest.
    #[must_use]
    pub fn to_query(&self) -> ProductQuery {
        let non_blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        ProductQuery {
            page: self.page.unwrap_or(1).max(1),
            search: non_blank(&self.search),
            category: non_blank(&self.category),
            sort: self
                .sort
                .as_deref()
                .and_then(|s| ProductSort::ALL.into_iter().find(|sort| sort.as_str() == s))
                .unwrap_or_default(),
            ..ProductQuery::default()
        }
    }
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: Page,
    pub results: ProductPage,
    pub query: ProductQuery,
    pub categories: Vec<String>,
    pub sorts: [ProductSort; 4],
}

impl ProductsIndexTemplate {
    /// Catalog URL for another page with the current filters.
    #[must_use]
    pub fn page_url(&self, number: u32) -> String {
        let mut query = self.query.clone();
        query.page = number;
        catalog_url(&query)
    }

    #[must_use]
    pub fn is_sort(&self, sort: &ProductSort) -> bool {
        self.query.sort == *sort
    }

    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.results.page > 1
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.results.page < self.results.pages
    }

    #[must_use]
    pub fn previous_page(&self) -> u32 {
        self.results.page.saturating_sub(1).max(1)
    }

    #[must_use]
    pub fn next_page(&self) -> u32 {
        self.results.page.saturating_add(1)
    }

    #[must_use]
    pub fn search_text(&self) -> &str {
        self.query.search.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn is_category(&self, category: &str) -> bool {
        self.query.category.as_deref() == Some(category)
    }
}

/// Build a catalog link, omitting defaults.
#[must_use]
pub fn catalog_url(query: &ProductQuery) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    if let Some(search) = &query.search {
        serializer.append_pair("search", search);
    }
    if let Some(category) = &query.category {
        serializer.append_pair("category", category);
    }
    if query.sort != ProductSort::default() {
        serializer.append_pair("sort", query.sort.as_str());
    }
    if query.page > 1 {
        serializer.append_pair("page", &query.page.to_string());
    }
    let params = serializer.finish();

    if params.is_empty() {
        "/products".to_string()
    } else {
        format!("/products?{params}")
    }
}

/// Display the product catalog.
#[instrument(skip(state, session, page))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    mut page: Page,
    Query(params): Query<CatalogParams>,
) -> Result<impl IntoResponse> {
    let query = params.to_query();

    let (results, categories) = tokio::join!(
        state.api().list_products(&query),
        state.api().categories()
    );

    let results = recover(&session, &mut page, results).await?;
    let categories = categories.unwrap_or_default();

    Ok(ProductsIndexTemplate {
        page,
        results,
        query,
        categories,
        sorts: ProductSort::ALL,
    })
}

// =============================================================================
// Product detail
// =============================================================================

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: Page,
    pub product: Product,
    pub reviews: Vec<Review>,
    /// Units of this product already in the cart.
    pub in_cart: u32,
    /// Largest quantity the add-to-cart form offers.
    pub max_quantity: u32,
    pub can_review: bool,
}

impl ProductShowTemplate {
    /// Rating rounded to one decimal for display.
    #[must_use]
    pub fn rating_label(&self) -> String {
        format!("{:.1}", self.product.rating)
    }
}

/// Parse a product ID path segment, treating malformed IDs as not found.
fn parse_product_id(raw: &str) -> Result<ProductId> {
    ProductId::parse(raw).map_err(|_| AppError::NotFound(format!("product {raw}")))
}

/// Display the product detail page.
#[instrument(skip(state, session, page, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    mut page: Page,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = parse_product_id(&id)?;

    let (product, reviews) = tokio::join!(
        state.api().get_product(&id),
        state.api().product_reviews(&id)
    );
    let product = product?;
    let reviews = recover(&session, &mut page, reviews).await?;

    let in_cart = Cart::load(&session)
        .await
        .get(&product.id)
        .map_or(0, |line| line.quantity);
    let max_quantity = product
        .stock
        .min(MAX_LINE_QUANTITY)
        .saturating_sub(in_cart);

    add_breadcrumb("navigation", "Viewed product", Some(&[("product_id", id.as_str())]));

    Ok(ProductShowTemplate {
        page,
        product,
        reviews,
        in_cart,
        max_quantity,
        can_review: user.is_some(),
    })
}

// =============================================================================
// Reviews
// =============================================================================

/// Review form data.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub rating: Option<u8>,
    #[serde(default)]
    pub comment: String,
}

impl ReviewForm {
    /// Check the rating range and require a comment.
    ///
    /// # Errors
    ///
    /// Returns a message suitable for a toast.
    pub fn validate(&self) -> std::result::Result<NewReview, &'static str> {
        let rating = self
            .rating
            .filter(|r| (1..=5).contains(r))
            .ok_or("Please choose a rating from 1 to 5 stars")?;
        let comment = self.comment.trim();
        if comment.is_empty() {
            return Err("Please write a short comment");
        }
        if comment.chars().count() > MAX_COMMENT_CHARS {
            return Err("Comments are limited to 2000 characters");
        }
        Ok(NewReview {
            rating,
            comment: comment.to_string(),
        })
    }
}

/// Submit a review for a product.
#[instrument(skip(state, session, user, form))]
pub async fn create_review(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<ReviewForm>,
) -> Result<Response> {
    let id = parse_product_id(&id)?;
    let back_to = format!("/products/{id}#reviews");

    let review = match form.validate() {
        Ok(review) => review,
        Err(message) => {
            Toast::error(message).push(&session).await;
            return Ok(Redirect::to(&back_to).into_response());
        }
    };

    match state.api().create_review(&user.token, &id, &review).await {
        Ok(_) => {
            tracing::info!(product_id = %id, rating = review.rating, "Review posted");
            Toast::success("Thanks for your review!").push(&session).await;
            Ok(Redirect::to(&back_to).into_response())
        }
        Err(e) => write_failed(&session, e, &back_to).await,
    }
}
