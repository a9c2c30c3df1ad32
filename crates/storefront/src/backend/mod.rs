//! Backend REST API client.
//!
//! # Architecture
//!
//! - The backend is the source of truth for products, orders, users, reviews
//!   and payments. The storefront keeps no local copies.
//! - Every response is wrapped in the envelope `{ success, data, message }`.
//! - Catalog reads are cached in memory via `moka` (TTL from configuration).
//! - User-scoped calls authenticate with the bearer token issued at login.
//!
//! # Example
//!
//! ```rust,ignore
//! use marketstall_storefront::backend::{BackendClient, ProductQuery};
//!
//! let client = BackendClient::new(&config.api)?;
//! let page = client.list_products(&ProductQuery::default()).await?;
//! let product = client.get_product(&page.products[0].id).await?;
//! ```

mod cache;
mod client;
pub mod types;

pub use client::BackendClient;
pub use types::*;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when calling the backend API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection refused, timeout, TLS...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not a valid envelope.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint path could not be joined onto the base URL.
    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),

    /// The bearer token was missing, expired or rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The authenticated user lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The backend answered with `success: false` or an error status.
    #[error("Backend rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status returned by the backend.
        status: StatusCode,
        /// The envelope's `message`, or a body excerpt.
        message: String,
    },

    /// A successful envelope carried no `data`.
    #[error("Backend response has no data")]
    MissingData,
}

impl ApiError {
    /// A message safe to show to shoppers in a toast.
    ///
    /// Validation messages from the backend (4xx) are passed through; anything
    /// that hints at infrastructure is replaced with a generic message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { status, message } if status.is_client_error() => message.clone(),
            Self::Unauthorized(_) => "Please sign in again.".to_string(),
            Self::Forbidden(_) => "You do not have access to that.".to_string(),
            Self::NotFound(_) => "That item could not be found.".to_string(),
            Self::RateLimited(_) => "Too many requests, please wait a moment.".to_string(),
            _ => "We could not reach the store right now. Please try again.".to_string(),
        }
    }
}

/// The backend's JSON response wrapper.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    /// Whether the backend considers the call successful.
    pub success: bool,
    /// Payload, present on most successful calls.
    pub data: Option<T>,
    /// Human-readable status or error message.
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// Convert the envelope into its payload.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` when `success` is false and
    /// `ApiError::MissingData` when a successful envelope has no data.
    pub fn into_data(self, status: StatusCode) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::Rejected {
                status,
                message: self
                    .message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            });
        }
        self.data.ok_or(ApiError::MissingData)
    }
}
