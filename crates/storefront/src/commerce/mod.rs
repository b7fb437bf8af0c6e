//! Commerce backends.
//!
//! # Architecture
//!
//! - [`CommerceClient`] is the upstream data interface the session talks to
//! - [`MockCommerce`] serves the bundled catalog and keeps the cart in local
//!   storage (the default backend)
//! - [`ShopifyClient`] talks to the Shopify Storefront API; products and
//!   collections are cached via `moka` (5 minute TTL), carts never are
//!
//! # Example
//!
//! ```rust,ignore
//! use shopfront_storefront::commerce::{CommerceClient, MockCommerce};
//! use shopfront_storefront::storage::MemoryStorage;
//!
//! let client = MockCommerce::seeded(MemoryStorage::new())?;
//!
//! let cart = client.create_cart().await?;
//! let cart = client
//!     .add_to_cart(&cart.id, vec![CartLineInput::new("gid://shopify/ProductVariant/101", 1)])
//!     .await?;
//! ```

pub mod mock;
pub mod shopify;
pub mod types;

use std::future::Future;

use serde::Deserialize;
use shopfront_core::{CartId, CartLineId, ProductId};
use thiserror::Error;

pub use mock::MockCommerce;
pub use shopify::ShopifyClient;
pub use types::*;

use crate::catalog::CatalogError;
use crate::storage::StorageError;

/// Errors that can occur when talking to a commerce backend.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The cart does not exist (or is not the stored cart).
    #[error("Cart not found: {0}")]
    CartNotFound(CartId),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// User error from mutation (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),

    /// Local storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The catalog could not be loaded.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The backend returned data we could not interpret.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// A GraphQL error returned by the Storefront API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphQLError {
    /// Error message.
    #[serde(default)]
    pub message: String,
    /// Source locations in the query.
    #[serde(default)]
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    #[serde(default)]
    pub path: Vec<serde_json::Value>,
}

impl GraphQLError {
    /// An error carrying only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "(no error details provided)".to_string();
    }

    errors
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mut parts = Vec::new();

            if !e.message.is_empty() {
                parts.push(e.message.clone());
            }

            if !e.path.is_empty() {
                let path_str = e
                    .path
                    .iter()
                    .map(|p| match p {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".");
                parts.push(format!("path: {path_str}"));
            }

            if let Some(loc) = e.locations.first() {
                parts.push(format!("at line {}:{}", loc.line, loc.column));
            }

            if parts.is_empty() {
                format!("[error {}]: (no details)", i + 1)
            } else {
                parts.join(" ")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Upstream catalog and cart operations.
///
/// Catalog queries never fail for unknown handles: they return `None` or an
/// empty list. Cart operations return the whole updated cart.
pub trait CommerceClient: Send + Sync {
    /// Products matching a filter, sorted as requested.
    fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> impl Future<Output = Result<Vec<Product>, CommerceError>> + Send;

    /// Look up a product by handle.
    fn get_product_by_handle(
        &self,
        handle: &str,
    ) -> impl Future<Output = Result<Option<Product>, CommerceError>> + Send;

    /// All collections.
    fn list_collections(&self)
    -> impl Future<Output = Result<Vec<Collection>, CommerceError>> + Send;

    /// Look up a collection by handle.
    fn get_collection_by_handle(
        &self,
        handle: &str,
    ) -> impl Future<Output = Result<Option<Collection>, CommerceError>> + Send;

    /// Products in a collection, in catalog order.
    fn list_products_by_collection(
        &self,
        handle: &str,
    ) -> impl Future<Output = Result<Vec<Product>, CommerceError>> + Send;

    /// Products related to `product_id`, at most `limit`.
    fn get_related_products(
        &self,
        product_id: &ProductId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Product>, CommerceError>> + Send;

    /// Create a cart (or return the one already persisted).
    fn create_cart(&self) -> impl Future<Output = Result<Cart, CommerceError>> + Send;

    /// Fetch a cart by ID.
    ///
    /// Fails with [`CommerceError::CartNotFound`] when the cart is unknown.
    fn get_cart(&self, cart_id: &CartId)
    -> impl Future<Output = Result<Cart, CommerceError>> + Send;

    /// Add lines to a cart.
    fn add_to_cart(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineInput>,
    ) -> impl Future<Output = Result<Cart, CommerceError>> + Send;

    /// Remove lines from a cart. Unknown line IDs are ignored.
    fn remove_from_cart(
        &self,
        cart_id: &CartId,
        line_ids: Vec<CartLineId>,
    ) -> impl Future<Output = Result<Cart, CommerceError>> + Send;

    /// Set a line's quantity (clamped to at least 1).
    fn update_cart_quantity(
        &self,
        cart_id: &CartId,
        line_id: &CartLineId,
        quantity: i64,
    ) -> impl Future<Output = Result<Cart, CommerceError>> + Send;
}
