//! Integration tests for Shopfront.
//!
//! Sessions run against the in-process mock backend over real storage, so
//! the tests need no network and no credentials.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_flow` - Cart actions through the session facade
//! - `catalog` - Catalog queries through the commerce client
//! - `persistence` - State surviving restarts, corrupt storage
//! - `wishlist` - Wishlist actions and hydration

use std::path::PathBuf;

use shopfront_storefront::commerce::MockCommerce;
use shopfront_storefront::session::{Outcome, ShopSession};
use shopfront_storefront::storage::{FileStorage, KeyValueStore};
use tempfile::TempDir;

/// Small variant of the classic white tee (1499 INR).
pub const TEE_SMALL: &str = "gid://shopify/ProductVariant/101";
/// Slim fit jeans (3999 INR).
pub const JEANS_SLIM: &str = "gid://shopify/ProductVariant/201";
/// Brown backpack (5999 INR).
pub const BACKPACK_BROWN: &str = "gid://shopify/ProductVariant/301";

pub const TEE_PRODUCT: &str = "gid://shopify/Product/1";
pub const BACKPACK_PRODUCT: &str = "gid://shopify/Product/3";

/// A session over the mock backend.
pub type MockSession<S> = ShopSession<MockCommerce<S>, S>;

/// Start a session over the bundled catalog.
///
/// # Panics
///
/// Panics if the bundled catalog is invalid.
pub async fn start_session<S: KeyValueStore>(storage: S) -> (MockSession<S>, Outcome) {
    let client = MockCommerce::seeded(storage.clone()).expect("bundled catalog is valid");
    ShopSession::start(client, storage).await
}

/// A storage file inside a fresh temporary directory.
///
/// Keep the returned `TempDir` alive for as long as the file is used.
pub struct TempStorage {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl TempStorage {
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("state").join("storage.json");
        Self { dir, path }
    }

    /// Open the storage file, as a new process would.
    ///
    /// # Panics
    ///
    /// Panics if the file exists but cannot be read.
    #[must_use]
    pub fn open(&self) -> FileStorage {
        FileStorage::open(self.path.clone()).expect("Failed to open storage")
    }
}

impl Default for TempStorage {
    fn default() -> Self {
        Self::new()
    }
}
