//! In-process commerce backend.
//!
//! Serves catalog queries from a [`Catalog`] and keeps the cart in local
//! storage through [`CartAggregate`]. An optional artificial latency is
//! applied before every call so the presentation layer can exercise its busy
//! states.

mod cart;

use std::sync::Arc;
use std::time::Duration;

use shopfront_core::{CartId, CartLineId, ProductId};
use tracing::instrument;

pub use cart::CartAggregate;

use super::{CommerceClient, CommerceError};
use crate::catalog::{Catalog, CatalogError};
use crate::commerce::types::{Cart, CartLineInput, Collection, Product, ProductFilter};
use crate::storage::KeyValueStore;

/// Commerce backend over a local catalog and local storage.
#[derive(Debug, Clone)]
pub struct MockCommerce<S> {
    catalog: Arc<Catalog>,
    carts: Arc<CartAggregate<S>>,
    latency: Duration,
}

impl<S: KeyValueStore> MockCommerce<S> {
    /// Create a backend over the given catalog.
    #[must_use]
    pub fn new(catalog: Catalog, storage: S) -> Self {
        let catalog = Arc::new(catalog);
        Self {
            carts: Arc::new(CartAggregate::new(Arc::clone(&catalog), storage)),
            catalog,
            latency: Duration::ZERO,
        }
    }

    /// Create a backend over the bundled demo catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the bundled catalog fails validation.
    pub fn seeded(storage: S) -> Result<Self, CatalogError> {
        Ok(Self::new(Catalog::seed()?, storage))
    }

    /// Delay every call by `latency`.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// The catalog this backend serves.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The cart aggregate.
    #[must_use]
    pub fn carts(&self) -> &CartAggregate<S> {
        &self.carts
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

fn owned(products: Vec<&Product>) -> Vec<Product> {
    products.into_iter().cloned().collect()
}

impl<S: KeyValueStore> CommerceClient for MockCommerce<S> {
    #[instrument(skip(self))]
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, CommerceError> {
        self.simulate_latency().await;
        Ok(owned(self.catalog.list_products(filter)))
    }

    #[instrument(skip(self))]
    async fn get_product_by_handle(&self, handle: &str) -> Result<Option<Product>, CommerceError> {
        self.simulate_latency().await;
        Ok(self.catalog.get_product_by_handle(handle).cloned())
    }

    #[instrument(skip(self))]
    async fn list_collections(&self) -> Result<Vec<Collection>, CommerceError> {
        self.simulate_latency().await;
        Ok(self.catalog.list_collections().to_vec())
    }

    #[instrument(skip(self))]
    async fn get_collection_by_handle(
        &self,
        handle: &str,
    ) -> Result<Option<Collection>, CommerceError> {
        self.simulate_latency().await;
        Ok(self.catalog.get_collection_by_handle(handle).cloned())
    }

    #[instrument(skip(self))]
    async fn list_products_by_collection(
        &self,
        handle: &str,
    ) -> Result<Vec<Product>, CommerceError> {
        self.simulate_latency().await;
        Ok(owned(self.catalog.list_products_by_collection(handle)))
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn get_related_products(
        &self,
        product_id: &ProductId,
        limit: usize,
    ) -> Result<Vec<Product>, CommerceError> {
        self.simulate_latency().await;
        Ok(owned(self.catalog.get_related_products(product_id, limit)))
    }

    async fn create_cart(&self) -> Result<Cart, CommerceError> {
        self.simulate_latency().await;
        self.carts.create()
    }

    #[instrument(skip(self), fields(cart_id = %cart_id))]
    async fn get_cart(&self, cart_id: &CartId) -> Result<Cart, CommerceError> {
        self.simulate_latency().await;
        self.carts.get(cart_id)
    }

    async fn add_to_cart(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineInput>,
    ) -> Result<Cart, CommerceError> {
        self.simulate_latency().await;
        self.carts.add_lines(cart_id, lines)
    }

    async fn remove_from_cart(
        &self,
        cart_id: &CartId,
        line_ids: Vec<CartLineId>,
    ) -> Result<Cart, CommerceError> {
        self.simulate_latency().await;
        self.carts.remove_lines(cart_id, &line_ids)
    }

    async fn update_cart_quantity(
        &self,
        cart_id: &CartId,
        line_id: &CartLineId,
        quantity: i64,
    ) -> Result<Cart, CommerceError> {
        self.simulate_latency().await;
        self.carts.update_quantity(cart_id, line_id, quantity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::commerce::types::ProductSortKey;
    use crate::storage::MemoryStorage;

    fn client() -> MockCommerce<MemoryStorage> {
        MockCommerce::seeded(MemoryStorage::new()).unwrap()
    }

    #[tokio::test]
    async fn test_catalog_queries_return_owned_products() {
        let client = client();

        let products = client
            .list_products(&ProductFilter::default().sorted_by(ProductSortKey::Price, false))
            .await
            .unwrap();
        assert_eq!(products.len(), 12);
        assert_eq!(products[0].handle, "classic-white-t-shirt");

        let jeans = client.get_product_by_handle("designer-jeans").await.unwrap();
        assert!(jeans.is_some());
        assert!(client.get_product_by_handle("nope").await.unwrap().is_none());

        let clothing = client.list_products_by_collection("clothing").await.unwrap();
        assert_eq!(clothing.len(), 3);

        assert_eq!(client.list_collections().await.unwrap().len(), 4);
        assert!(
            client
                .get_collection_by_handle("electronics")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_related_products_respect_limit() {
        let client = client();
        let related = client
            .get_related_products(&ProductId::new("gid://shopify/Product/1"), 2)
            .await
            .unwrap();
        assert_eq!(related.len(), 2);
        assert!(related.iter().all(|p| p.id.as_str() != "gid://shopify/Product/1"));
    }

    #[tokio::test]
    async fn test_cart_round_trip_through_client() {
        let client = client();
        let cart = client.create_cart().await.unwrap();
        let cart = client
            .add_to_cart(
                &cart.id,
                vec![CartLineInput::new("gid://shopify/ProductVariant/101", 1)],
            )
            .await
            .unwrap();
        assert_eq!(cart.cost.subtotal_display(), "1499.00");

        let fetched = client.get_cart(&cart.id).await.unwrap();
        assert_eq!(fetched, cart);

        let line_id = cart.lines[0].id.clone();
        let cart = client
            .update_cart_quantity(&cart.id, &line_id, 3)
            .await
            .unwrap();
        assert_eq!(cart.total_quantity(), 3);

        let cart = client
            .remove_from_cart(&cart.id, vec![line_id])
            .await
            .unwrap();
        assert!(cart.lines.is_empty());
        assert_eq!(cart.cost.subtotal_display(), "0.00");
    }

    #[tokio::test]
    async fn test_get_cart_without_cart_is_not_found() {
        let client = client();
        let err = client
            .get_cart(&CartId::new("mock-cart-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::CartNotFound(_)));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_latency_is_applied() {
        let client = client().with_latency(Duration::from_millis(500));
        let started = tokio::time::Instant::now();
        client.list_collections().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(500));
    }
}
