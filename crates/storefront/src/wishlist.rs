//! Wishlist of saved products.
//!
//! The wishlist is a set of product IDs in the order they were added,
//! persisted under [`keys::WISHLIST`] as a JSON list of
//! `{"productId": .., "addedAt": ..}` objects. A missing or malformed entry
//! loads as an empty wishlist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shopfront_core::ProductId;
use tracing::{debug, instrument};

use crate::commerce::types::Product;
use crate::storage::{KeyValueStore, StorageError, keys, read_json, write_json};

/// A saved product reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    pub product_id: ProductId,
    pub added_at: DateTime<Utc>,
}

/// Persisted set of saved products.
#[derive(Debug, Clone)]
pub struct WishlistSet<S> {
    storage: S,
    entries: Vec<WishlistEntry>,
}

impl<S: KeyValueStore> WishlistSet<S> {
    /// An empty wishlist over `storage`, ignoring anything stored.
    #[must_use]
    pub const fn empty(storage: S) -> Self {
        Self {
            storage,
            entries: Vec::new(),
        }
    }

    /// Load the wishlist from storage.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the storage cannot be read.
    pub fn load(storage: S) -> Result<Self, StorageError> {
        let stored: Vec<WishlistEntry> = read_json(&storage, keys::WISHLIST)?.unwrap_or_default();

        let mut entries: Vec<WishlistEntry> = Vec::with_capacity(stored.len());
        for entry in stored {
            if !entries.iter().any(|e| e.product_id == entry.product_id) {
                entries.push(entry);
            }
        }

        debug!(entries = entries.len(), "Loaded wishlist");
        Ok(Self { storage, entries })
    }

    /// Save a product. Returns `false` if it was already saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the wishlist cannot be persisted; the
    /// in-memory set is left unchanged.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub fn add(&mut self, product_id: &ProductId) -> Result<bool, StorageError> {
        if self.contains(product_id) {
            return Ok(false);
        }

        self.entries.push(WishlistEntry {
            product_id: product_id.clone(),
            added_at: Utc::now(),
        });

        if let Err(e) = self.persist() {
            self.entries.pop();
            return Err(e);
        }
        Ok(true)
    }

    /// Forget a product. Returns `false` if it was not saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the wishlist cannot be persisted; the
    /// in-memory set is left unchanged.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub fn remove(&mut self, product_id: &ProductId) -> Result<bool, StorageError> {
        let Some(position) = self
            .entries
            .iter()
            .position(|e| &e.product_id == product_id)
        else {
            return Ok(false);
        };

        let removed = self.entries.remove(position);
        if let Err(e) = self.persist() {
            self.entries.insert(position, removed);
            return Err(e);
        }
        Ok(true)
    }

    /// Whether a product is saved.
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.entries.iter().any(|e| &e.product_id == product_id)
    }

    /// Resolve saved IDs against a product list, in wishlist order.
    ///
    /// IDs with no matching product are dropped.
    #[must_use]
    pub fn hydrate(&self, products: &[Product]) -> Vec<Product> {
        self.entries
            .iter()
            .filter_map(|entry| products.iter().find(|p| p.id == entry.product_id))
            .cloned()
            .collect()
    }

    /// Saved entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[WishlistEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self) -> Result<(), StorageError> {
        write_json(&self.storage, keys::WISHLIST, &self.entries)
    }
}
