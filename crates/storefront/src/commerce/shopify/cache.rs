//! Cache types for Storefront API responses.

use std::sync::Arc;

use crate::catalog::Catalog;

/// Cache key for catalog data.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    /// The full product and collection corpus.
    Catalog,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Catalog(Arc<Catalog>),
}
