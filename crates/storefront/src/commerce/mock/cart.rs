//! Cart aggregate kept in local storage.
//!
//! There is at most one cart per storage. It is stored under
//! [`keys::CART`] and rewritten after every mutation, with totals recomputed
//! from the lines each time.
//!
//! Identifiers are `mock-cart-N` and `mock-line-N`. New numbers are always
//! greater than any number already present in storage, so IDs stay unique
//! across reloads.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use shopfront_core::{CartId, CartLineId};
use tracing::{debug, instrument, warn};

use crate::catalog::Catalog;
use crate::commerce::CommerceError;
use crate::commerce::types::{
    Cart, CartCost, CartLine, CartLineInput, CartMerchandise, MerchandiseProduct,
};
use crate::storage::{KeyValueStore, StorageError, keys, read_json, write_json};

const CART_PREFIX: &str = "mock-cart-";
const LINE_PREFIX: &str = "mock-line-";
const CHECKOUT_BASE_URL: &str = "https://checkout.shopfront.invalid/cart/";

/// The persisted cart and its mutations.
#[derive(Debug)]
pub struct CartAggregate<S> {
    catalog: Arc<Catalog>,
    storage: S,
    last_cart: AtomicU64,
    last_line: AtomicU64,
}

impl<S: KeyValueStore> CartAggregate<S> {
    /// Create an aggregate over a catalog and a storage.
    #[must_use]
    pub const fn new(catalog: Arc<Catalog>, storage: S) -> Self {
        Self {
            catalog,
            storage,
            last_cart: AtomicU64::new(0),
            last_line: AtomicU64::new(0),
        }
    }

    /// The persisted cart, if any. A malformed entry reads as absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the storage cannot be read.
    pub fn load(&self) -> Result<Option<Cart>, StorageError> {
        read_json(&self.storage, keys::CART)
    }

    /// Return the persisted cart, or create and persist an empty one.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Storage` if storage fails.
    #[instrument(skip(self))]
    pub fn create(&self) -> Result<Cart, CommerceError> {
        if let Some(cart) = self.load()? {
            debug!(cart_id = %cart.id, "Reusing persisted cart");
            return Ok(cart);
        }

        let id = self.next_cart_id()?;
        let checkout_url = format!("{CHECKOUT_BASE_URL}{id}");
        let cart = Cart::empty(id, checkout_url);
        self.persist(&cart)?;

        debug!(cart_id = %cart.id, "Created cart");
        Ok(cart)
    }

    /// The persisted cart, provided it has the given ID.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::CartNotFound` if no cart with that ID is stored.
    pub fn get(&self, cart_id: &CartId) -> Result<Cart, CommerceError> {
        match self.load()? {
            Some(cart) if &cart.id == cart_id => Ok(cart),
            _ => Err(CommerceError::CartNotFound(cart_id.clone())),
        }
    }

    /// Add lines to the cart.
    ///
    /// Lines whose variant is not in the catalog, or whose quantity is zero,
    /// are skipped. A variant already in the cart has its quantity increased.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::CartNotFound` for an unknown cart, or
    /// `CommerceError::Storage` if the cart cannot be persisted.
    #[instrument(skip(self, lines), fields(cart_id = %cart_id, lines = lines.len()))]
    pub fn add_lines(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineInput>,
    ) -> Result<Cart, CommerceError> {
        let mut cart = self.get(cart_id)?;

        for input in lines {
            if input.quantity == 0 {
                debug!(variant_id = %input.merchandise_id, "Skipping line with zero quantity");
                continue;
            }

            let Some((product, variant)) = self.catalog.find_variant(&input.merchandise_id) else {
                debug!(variant_id = %input.merchandise_id, "Skipping unknown variant");
                continue;
            };

            if let Some(line) = cart
                .lines
                .iter_mut()
                .find(|line| line.merchandise.id == input.merchandise_id)
            {
                line.quantity = line.quantity.saturating_add(input.quantity);
                continue;
            }

            let id = self.next_line_id(&cart);
            cart.lines.push(CartLine {
                id,
                quantity: input.quantity,
                merchandise: CartMerchandise {
                    id: variant.id.clone(),
                    title: variant.title.clone(),
                    product: MerchandiseProduct {
                        title: product.title.clone(),
                        handle: product.handle.clone(),
                    },
                    price: variant.price,
                    image: variant
                        .image
                        .clone()
                        .or_else(|| product.featured_image().cloned()),
                },
            });
        }

        self.save(cart)
    }

    /// Remove lines from the cart. Unknown line IDs are ignored.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::CartNotFound` for an unknown cart, or
    /// `CommerceError::Storage` if the cart cannot be persisted.
    #[instrument(skip(self, line_ids), fields(cart_id = %cart_id))]
    pub fn remove_lines(
        &self,
        cart_id: &CartId,
        line_ids: &[CartLineId],
    ) -> Result<Cart, CommerceError> {
        let mut cart = self.get(cart_id)?;
        cart.lines.retain(|line| !line_ids.contains(&line.id));
        self.save(cart)
    }

    /// Set a line's quantity, clamped to at least 1. An unknown line is left
    /// alone.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::CartNotFound` for an unknown cart, or
    /// `CommerceError::Storage` if the cart cannot be persisted.
    #[instrument(skip(self), fields(cart_id = %cart_id, line_id = %line_id))]
    pub fn update_quantity(
        &self,
        cart_id: &CartId,
        line_id: &CartLineId,
        quantity: i64,
    ) -> Result<Cart, CommerceError> {
        let mut cart = self.get(cart_id)?;

        match cart.lines.iter_mut().find(|line| &line.id == line_id) {
            Some(line) => {
                line.quantity = u32::try_from(quantity.max(1)).unwrap_or_else(|_| {
                    warn!(requested = quantity, stored = u32::MAX, "Quantity clamped");
                    u32::MAX
                });
            }
            None => debug!("Quantity update for unknown line"),
        }

        self.save(cart)
    }

    /// Current totals of the cart.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::CartNotFound` for an unknown cart.
    pub fn totals(&self, cart_id: &CartId) -> Result<CartCost, CommerceError> {
        let cart = self.get(cart_id)?;
        Ok(CartCost::from_lines(&cart.lines))
    }

    fn save(&self, mut cart: Cart) -> Result<Cart, CommerceError> {
        cart.recalculate();
        self.persist(&cart)?;
        Ok(cart)
    }

    fn persist(&self, cart: &Cart) -> Result<(), StorageError> {
        write_json(&self.storage, keys::CART, cart)
    }

    /// Next cart ID, past both the stored cart ID and any ID issued here.
    fn next_cart_id(&self) -> Result<CartId, StorageError> {
        let stored = self
            .storage
            .get(keys::CART_ID)?
            .as_deref()
            .and_then(|id| sequence_number(id, CART_PREFIX))
            .unwrap_or(0);

        let previous = self.last_cart.fetch_max(stored, Ordering::SeqCst).max(stored);
        let next = previous + 1;
        self.last_cart.store(next, Ordering::SeqCst);
        Ok(CartId::new(format!("{CART_PREFIX}{next}")))
    }

    /// Next line ID, past every line in the cart and any ID issued here.
    fn next_line_id(&self, cart: &Cart) -> CartLineId {
        let highest = cart
            .lines
            .iter()
            .filter_map(|line| sequence_number(line.id.as_str(), LINE_PREFIX))
            .max()
            .unwrap_or(0);

        let previous = self.last_line.fetch_max(highest, Ordering::SeqCst).max(highest);
        let next = previous + 1;
        self.last_line.store(next, Ordering::SeqCst);
        CartLineId::new(format!("{LINE_PREFIX}{next}"))
    }
}

fn sequence_number(id: &str, prefix: &str) -> Option<u64> {
    id.strip_prefix(prefix)?.parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use shopfront_core::VariantId;

    use super::*;
    use crate::storage::MemoryStorage;

    const TEE_S: &str = "gid://shopify/ProductVariant/101";
    const TEE_M: &str = "gid://shopify/ProductVariant/102";
    const JEANS: &str = "gid://shopify/ProductVariant/201";

    fn aggregate(storage: MemoryStorage) -> CartAggregate<MemoryStorage> {
        CartAggregate::new(Arc::new(Catalog::seed().unwrap()), storage)
    }

    #[test]
    fn test_create_starts_empty() {
        let carts = aggregate(MemoryStorage::new());
        let cart = carts.create().unwrap();

        assert_eq!(cart.id.as_str(), "mock-cart-1");
        assert_eq!(
            cart.checkout_url,
            "https://checkout.shopfront.invalid/cart/mock-cart-1"
        );
        assert!(cart.lines.is_empty());
        assert_eq!(cart.cost.subtotal_display(), "0.00");
        assert_eq!(cart.cost.total_display(), "0.00");
    }

    #[test]
    fn test_create_returns_persisted_cart() {
        let storage = MemoryStorage::new();
        let first = aggregate(storage.clone());
        let cart = first.create().unwrap();
        first
            .add_lines(&cart.id, vec![CartLineInput::new(TEE_S, 1)])
            .unwrap();

        let second = aggregate(storage);
        let again = second.create().unwrap();
        assert_eq!(again.id, cart.id);
        assert_eq!(again.lines.len(), 1);
    }

    #[test]
    fn test_add_merges_same_variant() {
        let carts = aggregate(MemoryStorage::new());
        let cart = carts.create().unwrap();

        let cart = carts
            .add_lines(&cart.id, vec![CartLineInput::new(TEE_S, 1)])
            .unwrap();
        assert_eq!(cart.cost.subtotal_display(), "1499.00");

        let cart = carts
            .add_lines(&cart.id, vec![CartLineInput::new(TEE_S, 1)])
            .unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 2);
        assert_eq!(cart.cost.subtotal_display(), "2998.00");
        assert_eq!(cart.cost.total, cart.cost.subtotal);
    }

    #[test]
    fn test_add_snapshots_merchandise() {
        let carts = aggregate(MemoryStorage::new());
        let cart = carts.create().unwrap();
        let cart = carts
            .add_lines(&cart.id, vec![CartLineInput::new(JEANS, 2)])
            .unwrap();

        let line = &cart.lines[0];
        assert_eq!(line.id.as_str(), "mock-line-1");
        assert_eq!(line.merchandise.title, "30 / Slim");
        assert_eq!(line.merchandise.product.handle, "designer-jeans");
        assert!(line.merchandise.image.is_some());
        assert_eq!(cart.cost.subtotal_display(), "7998.00");
    }

    #[test]
    fn test_add_skips_unknown_variant_and_zero_quantity() {
        let carts = aggregate(MemoryStorage::new());
        let cart = carts.create().unwrap();
        let cart = carts
            .add_lines(
                &cart.id,
                vec![
                    CartLineInput::new("gid://shopify/ProductVariant/999999", 1),
                    CartLineInput::new(TEE_S, 0),
                    CartLineInput::new(TEE_M, 1),
                ],
            )
            .unwrap();

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].merchandise.id, VariantId::new(TEE_M));
    }

    #[test]
    fn test_remove_and_unknown_line() {
        let carts = aggregate(MemoryStorage::new());
        let cart = carts.create().unwrap();
        let cart = carts
            .add_lines(
                &cart.id,
                vec![CartLineInput::new(TEE_S, 1), CartLineInput::new(JEANS, 1)],
            )
            .unwrap();
        let tee_line = cart.lines[0].id.clone();

        let cart = carts
            .remove_lines(&cart.id, &[CartLineId::new("mock-line-404")])
            .unwrap();
        assert_eq!(cart.lines.len(), 2);

        let cart = carts.remove_lines(&cart.id, &[tee_line]).unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.cost.subtotal_display(), "3999.00");
    }

    #[test]
    fn test_update_quantity_clamps_to_one() {
        let carts = aggregate(MemoryStorage::new());
        let cart = carts.create().unwrap();
        let cart = carts
            .add_lines(&cart.id, vec![CartLineInput::new(TEE_S, 3)])
            .unwrap();
        let line_id = cart.lines[0].id.clone();

        let cart = carts.update_quantity(&cart.id, &line_id, 0).unwrap();
        assert_eq!(cart.lines[0].quantity, 1);

        let cart = carts.update_quantity(&cart.id, &line_id, -4).unwrap();
        assert_eq!(cart.lines[0].quantity, 1);

        let cart = carts.update_quantity(&cart.id, &line_id, 5).unwrap();
        assert_eq!(cart.lines[0].quantity, 5);
        assert_eq!(carts.totals(&cart.id).unwrap().subtotal_display(), "7495.00");

        let unchanged = carts
            .update_quantity(&cart.id, &CartLineId::new("mock-line-77"), 9)
            .unwrap();
        assert_eq!(unchanged.lines, cart.lines);
    }

    #[test]
    fn test_update_quantity_caps_at_u32_max() {
        let carts = aggregate(MemoryStorage::new());
        let cart = carts.create().unwrap();
        let cart = carts
            .add_lines(
                &cart.id,
                vec![CartLineInput::new(TEE_S, 1), CartLineInput::new(JEANS, 1)],
            )
            .unwrap();
        let line_id = cart.lines[0].id.clone();

        let cart = carts
            .update_quantity(&cart.id, &line_id, 5_000_000_000)
            .unwrap();
        assert_eq!(cart.lines[0].quantity, u32::MAX);
        assert_eq!(cart.total_quantity(), u64::from(u32::MAX) + 1);
    }

    #[test]
    fn test_unknown_cart_is_not_found() {
        let carts = aggregate(MemoryStorage::new());
        carts.create().unwrap();

        let err = carts
            .add_lines(&CartId::new("mock-cart-42"), vec![CartLineInput::new(TEE_S, 1)])
            .unwrap_err();
        assert!(matches!(err, CommerceError::CartNotFound(id) if id.as_str() == "mock-cart-42"));
    }

    #[test]
    fn test_line_ids_unique_across_reloads() {
        let storage = MemoryStorage::new();
        let cart = {
            let carts = aggregate(storage.clone());
            let cart = carts.create().unwrap();
            carts
                .add_lines(
                    &cart.id,
                    vec![CartLineInput::new(TEE_S, 1), CartLineInput::new(TEE_M, 1)],
                )
                .unwrap()
        };

        let carts = aggregate(storage);
        let cart = carts
            .add_lines(&cart.id, vec![CartLineInput::new(JEANS, 1)])
            .unwrap();

        let ids: Vec<&str> = cart.lines.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["mock-line-1", "mock-line-2", "mock-line-3"]);
    }

    #[test]
    fn test_corrupted_cart_gets_fresh_id() {
        let storage = MemoryStorage::new();
        storage.set(keys::CART_ID, "mock-cart-3").unwrap();
        storage.set(keys::CART, "{\"id\": 12").unwrap();

        let cart = aggregate(storage).create().unwrap();
        assert_eq!(cart.id.as_str(), "mock-cart-4");
        assert!(cart.lines.is_empty());
    }
}
