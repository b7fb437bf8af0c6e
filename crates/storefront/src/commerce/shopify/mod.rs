//! Shopify Storefront API client implementation.
//!
//! Sends GraphQL documents over `reqwest` and caches the product/collection
//! corpus using `moka` (5-minute TTL). Catalog queries (filtering, sorting,
//! related products) run locally over the cached corpus, so both backends
//! answer them identically. Carts are never cached.

mod cache;
mod conversions;
mod queries;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shopfront_core::{CartId, CartLineId, ProductId};
use tracing::{debug, instrument};

use super::{CommerceClient, CommerceError, GraphQLError};
use crate::catalog::Catalog;
use crate::commerce::types::{Cart, CartLineInput, Collection, Product, ProductFilter};
use crate::config::ShopifyStorefrontConfig;

use cache::{CacheKey, CacheValue};
use conversions::{convert_cart, convert_collection, convert_product, convert_user_errors};
use queries::{
    AddToCartVariables, CartCreateData, CartData, CartIdVariables, CartLinesAddData,
    CartLinesRemoveData, CartLinesUpdateData, CartLineUpdateInput, CartPayload, CollectionsData,
    PageVariables, ProductsData, RemoveFromCartVariables, Request, Response,
    UpdateCartLinesVariables,
};

/// Page size for catalog pagination (the API maximum).
const PAGE_SIZE: i64 = 250;

/// Safety cap on catalog pages.
const MAX_PAGES: usize = 40;

// =============================================================================
// ShopifyClient
// =============================================================================

/// Client for the Shopify Storefront API.
///
/// Products and collections are cached for 5 minutes.
#[derive(Clone)]
pub struct ShopifyClient {
    inner: Arc<ShopifyClientInner>,
}

struct ShopifyClientInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: SecretString,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for ShopifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyClient")
            .field("endpoint", &self.inner.endpoint)
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl ShopifyClient {
    /// Create a new Storefront API client.
    #[must_use]
    pub fn new(config: &ShopifyStorefrontConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(ShopifyClientInner {
                client: reqwest::Client::new(),
                endpoint: config.endpoint(),
                access_token: config.storefront_token.clone(),
                cache,
            }),
        }
    }

    /// Execute a GraphQL document.
    async fn execute<V, T>(&self, query: &str, variables: V) -> Result<T, CommerceError>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            // Private access tokens use a different header than public tokens
            .header(
                "Shopify-Storefront-Private-Token",
                self.inner.access_token.expose_secret(),
            )
            .header("Content-Type", "application/json")
            .json(&Request { query, variables })
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(CommerceError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Shopify API returned non-success status"
            );
            return Err(CommerceError::GraphQL(vec![GraphQLError::message(format!(
                "HTTP {status}: {}",
                response_text.chars().take(200).collect::<String>()
            ))]));
        }

        let response: Response<T> = serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse Shopify GraphQL response"
            );
            CommerceError::Parse(e)
        })?;

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            debug!(errors = ?errors, "GraphQL errors in response");
            return Err(CommerceError::GraphQL(errors));
        }

        response.data.ok_or_else(|| {
            tracing::error!(
                body = %response_text.chars().take(500).collect::<String>(),
                "Shopify GraphQL response has no data and no errors"
            );
            CommerceError::GraphQL(vec![GraphQLError::message("No data in response")])
        })
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// The cached catalog, fetching it on a miss.
    async fn catalog(&self) -> Result<Arc<Catalog>, CommerceError> {
        if let Some(CacheValue::Catalog(catalog)) = self.inner.cache.get(&CacheKey::Catalog).await {
            debug!("Cache hit for catalog");
            return Ok(catalog);
        }

        let catalog = Arc::new(self.fetch_catalog().await?);
        self.inner
            .cache
            .insert(CacheKey::Catalog, CacheValue::Catalog(Arc::clone(&catalog)))
            .await;
        Ok(catalog)
    }

    #[instrument(skip(self))]
    async fn fetch_catalog(&self) -> Result<Catalog, CommerceError> {
        let product_query = queries::get_products();

        let mut products = Vec::new();
        let mut after = None;
        for _ in 0..MAX_PAGES {
            let data: ProductsData = self
                .execute(&product_query, PageVariables { first: PAGE_SIZE, after })
                .await?;
            for product in data.products.nodes {
                products.push(convert_product(product)?);
            }
            if !data.products.page_info.has_next_page {
                break;
            }
            after = data.products.page_info.end_cursor;
        }

        let mut collections = Vec::new();
        let mut after = None;
        for _ in 0..MAX_PAGES {
            let data: CollectionsData = self
                .execute(queries::GET_COLLECTIONS, PageVariables { first: PAGE_SIZE, after })
                .await?;
            collections.extend(data.collections.nodes.into_iter().map(convert_collection));
            if !data.collections.page_info.has_next_page {
                break;
            }
            after = data.collections.page_info.end_cursor;
        }

        debug!(
            products = products.len(),
            collections = collections.len(),
            "Fetched catalog"
        );
        Ok(Catalog::new(products, collections)?)
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Unwrap a cart mutation payload.
    fn cart_from_payload(
        payload: Option<CartPayload>,
        action: &str,
    ) -> Result<Cart, CommerceError> {
        if let Some(result) = payload {
            if !result.user_errors.is_empty() {
                return Err(convert_user_errors(result.user_errors));
            }
            if let Some(cart) = result.cart {
                return convert_cart(cart);
            }
        }

        Err(CommerceError::GraphQL(vec![GraphQLError::message(format!(
            "Failed to {action}"
        ))]))
    }
}

impl CommerceClient for ShopifyClient {
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, CommerceError> {
        let catalog = self.catalog().await?;
        Ok(catalog.list_products(filter).into_iter().cloned().collect())
    }

    #[instrument(skip(self), fields(handle = %handle))]
    async fn get_product_by_handle(&self, handle: &str) -> Result<Option<Product>, CommerceError> {
        let catalog = self.catalog().await?;
        Ok(catalog.get_product_by_handle(handle).cloned())
    }

    async fn list_collections(&self) -> Result<Vec<Collection>, CommerceError> {
        let catalog = self.catalog().await?;
        Ok(catalog.list_collections().to_vec())
    }

    #[instrument(skip(self), fields(handle = %handle))]
    async fn get_collection_by_handle(
        &self,
        handle: &str,
    ) -> Result<Option<Collection>, CommerceError> {
        let catalog = self.catalog().await?;
        Ok(catalog.get_collection_by_handle(handle).cloned())
    }

    #[instrument(skip(self), fields(handle = %handle))]
    async fn list_products_by_collection(
        &self,
        handle: &str,
    ) -> Result<Vec<Product>, CommerceError> {
        let catalog = self.catalog().await?;
        Ok(catalog
            .list_products_by_collection(handle)
            .into_iter()
            .cloned()
            .collect())
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn get_related_products(
        &self,
        product_id: &ProductId,
        limit: usize,
    ) -> Result<Vec<Product>, CommerceError> {
        let catalog = self.catalog().await?;
        Ok(catalog
            .get_related_products(product_id, limit)
            .into_iter()
            .cloned()
            .collect())
    }

    #[instrument(skip(self))]
    async fn create_cart(&self) -> Result<Cart, CommerceError> {
        let data: CartCreateData = self
            .execute(&queries::create_cart(), serde_json::json!({}))
            .await?;
        Self::cart_from_payload(data.cart_create, "create cart")
    }

    #[instrument(skip(self), fields(cart_id = %cart_id))]
    async fn get_cart(&self, cart_id: &CartId) -> Result<Cart, CommerceError> {
        let data: CartData = self
            .execute(
                &queries::get_cart(),
                CartIdVariables {
                    cart_id: cart_id.as_str(),
                },
            )
            .await?;

        data.cart
            .map(convert_cart)
            .transpose()?
            .ok_or_else(|| CommerceError::CartNotFound(cart_id.clone()))
    }

    #[instrument(skip(self, lines), fields(cart_id = %cart_id))]
    async fn add_to_cart(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineInput>,
    ) -> Result<Cart, CommerceError> {
        let lines: Vec<queries::CartLineInput<'_>> = lines
            .iter()
            .filter(|line| line.quantity > 0)
            .map(|line| queries::CartLineInput {
                merchandise_id: line.merchandise_id.as_str(),
                quantity: line.quantity,
            })
            .collect();

        if lines.is_empty() {
            return self.get_cart(cart_id).await;
        }

        let data: CartLinesAddData = self
            .execute(
                &queries::add_to_cart(),
                AddToCartVariables {
                    cart_id: cart_id.as_str(),
                    lines,
                },
            )
            .await?;
        Self::cart_from_payload(data.cart_lines_add, "add to cart")
    }

    #[instrument(skip(self, line_ids), fields(cart_id = %cart_id))]
    async fn remove_from_cart(
        &self,
        cart_id: &CartId,
        line_ids: Vec<CartLineId>,
    ) -> Result<Cart, CommerceError> {
        let data: CartLinesRemoveData = self
            .execute(
                &queries::remove_from_cart(),
                RemoveFromCartVariables {
                    cart_id: cart_id.as_str(),
                    line_ids: line_ids.iter().map(CartLineId::as_str).collect(),
                },
            )
            .await?;
        Self::cart_from_payload(data.cart_lines_remove, "remove from cart")
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, line_id = %line_id))]
    async fn update_cart_quantity(
        &self,
        cart_id: &CartId,
        line_id: &CartLineId,
        quantity: i64,
    ) -> Result<Cart, CommerceError> {
        let quantity = u32::try_from(quantity.max(1)).unwrap_or(u32::MAX);
        let data: CartLinesUpdateData = self
            .execute(
                &queries::update_cart_lines(),
                UpdateCartLinesVariables {
                    cart_id: cart_id.as_str(),
                    lines: vec![CartLineUpdateInput {
                        id: line_id.as_str(),
                        quantity,
                    }],
                },
            )
            .await?;
        Self::cart_from_payload(data.cart_lines_update, "update cart")
    }
}
