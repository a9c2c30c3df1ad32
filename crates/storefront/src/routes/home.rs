//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::{Product, ProductQuery, ProductSort};
use crate::error::Result;
use crate::filters;
use crate::middleware::Page;
use crate::state::AppState;

use super::recover;

/// Number of products in the "new arrivals" grid.
const FEATURED_LIMIT: u32 = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: Page,
    pub featured: Vec<Product>,
    pub top_rated: Vec<Product>,
    pub categories: Vec<String>,
}

/// Display the home page.
///
/// Shows the newest products, the best rated ones and the category list.
/// Backend failures degrade to empty sections with an error toast.
#[instrument(skip_all)]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    mut page: Page,
) -> Result<impl IntoResponse> {
    let newest = ProductQuery {
        limit: FEATURED_LIMIT,
        ..ProductQuery::default()
    };
    let best = ProductQuery {
        limit: 4,
        sort: ProductSort::Rating,
        ..ProductQuery::default()
    };

    let (newest, best, categories) = tokio::join!(
        state.api().list_products(&newest),
        state.api().list_products(&best),
        state.api().categories(),
    );

    let featured = recover(&session, &mut page, newest.map(|p| p.products)).await?;
    // One toast per outage is enough
    let top_rated = best.map(|p| p.products).unwrap_or_default();
    let categories = categories.unwrap_or_default();

    Ok(HomeTemplate {
        page,
        featured,
        top_rated,
        categories,
    })
}
