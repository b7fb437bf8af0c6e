//! Shopping session.
//!
//! [`ShopSession`] is the one place the presentation layer reads cart and
//! wishlist state from and sends user actions to. Every mutating call:
//!
//! 1. marks the session busy
//! 2. calls the commerce backend
//! 3. on success replaces the in-memory cart with the one returned
//! 4. on failure keeps the last known cart
//! 5. clears the busy flag
//!
//! and returns an [`Outcome`] describing the notification to show, if any.
//! Nothing here is fatal: backend and storage faults become error notices.

use serde::Serialize;
use shopfront_core::{CartId, CartLineId, ProductId, VariantId};
use tracing::{debug, error, info, instrument, warn};

use crate::commerce::types::{Cart, CartLineInput, Product, ProductFilter};
use crate::commerce::{CommerceClient, CommerceError};
use crate::error::add_breadcrumb;
use crate::storage::{KeyValueStore, keys};
use crate::wishlist::WishlistSet;

const CHECKOUT_MESSAGE: &str =
    "This is a demo store. In a real implementation, you would be redirected to a checkout page.";

// =============================================================================
// Outcome Types
// =============================================================================

/// Visual tone of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Success,
    Error,
    Info,
}

/// A notification for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub tone: Tone,
    pub title: String,
    pub description: String,
    /// Where the user should go next (checkout).
    pub link: Option<String>,
}

/// Result of a session action, as far as the user is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Nothing to tell the user.
    Silent,
    /// Show a notice.
    Notice(Notice),
}

impl Outcome {
    fn notice(tone: Tone, title: &str, description: &str) -> Self {
        Self::Notice(Notice {
            tone,
            title: title.to_string(),
            description: description.to_string(),
            link: None,
        })
    }

    fn success(title: &str, description: &str) -> Self {
        Self::notice(Tone::Success, title, description)
    }

    fn error(description: &str) -> Self {
        Self::notice(Tone::Error, "Error", description)
    }

    /// The notice, if any.
    #[must_use]
    pub const fn as_notice(&self) -> Option<&Notice> {
        match self {
            Self::Silent => None,
            Self::Notice(notice) => Some(notice),
        }
    }

    /// Whether this outcome reports a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.as_notice().is_some_and(|n| n.tone == Tone::Error)
    }
}

/// Whether the cart panel is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CartPanel {
    #[default]
    Closed,
    Open,
}

impl CartPanel {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Closed => Self::Open,
            Self::Open => Self::Closed,
        }
    }
}

/// Immutable copy of the session state for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub cart: Option<Cart>,
    pub cart_panel: CartPanel,
    pub is_busy: bool,
    pub cart_count: u64,
    pub wishlist: Vec<Product>,
    pub is_wishlist_loading: bool,
}

// =============================================================================
// ShopSession
// =============================================================================

/// Cart and wishlist state for one shopper.
#[derive(Debug)]
pub struct ShopSession<C, S> {
    client: C,
    storage: S,
    cart: Option<Cart>,
    cart_panel: CartPanel,
    busy: bool,
    wishlist: WishlistSet<S>,
    wishlist_products: Vec<Product>,
    wishlist_loading: bool,
}

impl<C: CommerceClient, S: KeyValueStore> ShopSession<C, S> {
    /// Start a session: restore or create the cart, then load the wishlist.
    ///
    /// The returned outcome reports a cart that could not be created; the
    /// session then has no cart and cart actions do nothing.
    #[instrument(skip_all)]
    pub async fn start(client: C, storage: S) -> (Self, Outcome) {
        let wishlist = WishlistSet::load(storage.clone()).unwrap_or_else(|e| {
            warn!(error = %e, "Could not read wishlist, starting empty");
            WishlistSet::empty(storage.clone())
        });

        let mut session = Self {
            client,
            storage,
            cart: None,
            cart_panel: CartPanel::Closed,
            busy: false,
            wishlist,
            wishlist_products: Vec::new(),
            wishlist_loading: false,
        };

        let outcome = session.initialize_cart().await;
        session.refresh_wishlist().await;

        (session, outcome)
    }

    async fn initialize_cart(&mut self) -> Outcome {
        let stored_id = self.storage.get(keys::CART_ID).unwrap_or_else(|e| {
            warn!(error = %e, "Could not read cart id");
            None
        });

        if let Some(id) = stored_id {
            match self.client.get_cart(&CartId::new(id)).await {
                Ok(cart) => {
                    debug!(cart_id = %cart.id, "Restored cart");
                    self.cart = Some(cart);
                    return Outcome::Silent;
                }
                Err(e) => info!(error = %e, "Could not retrieve cart. Creating new one."),
            }
        }

        match self.client.create_cart().await {
            Ok(cart) => {
                if let Err(e) = self.storage.set(keys::CART_ID, cart.id.as_str()) {
                    warn!(error = %e, "Could not persist cart id");
                }
                info!(cart_id = %cart.id, "Created cart");
                self.cart = Some(cart);
                Outcome::Silent
            }
            Err(e) => {
                error!(error = %e, "Error creating cart");
                Outcome::error("Could not initialize shopping cart.")
            }
        }
    }

    /// Re-resolve the wishlist against the current product list.
    async fn refresh_wishlist(&mut self) {
        self.wishlist_loading = true;
        match self.client.list_products(&ProductFilter::default()).await {
            Ok(products) => self.wishlist_products = self.wishlist.hydrate(&products),
            Err(e) => error!(error = %e, "Error loading wishlist"),
        }
        self.wishlist_loading = false;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The commerce backend, for catalog queries.
    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }

    #[must_use]
    pub const fn cart(&self) -> Option<&Cart> {
        self.cart.as_ref()
    }

    #[must_use]
    pub fn is_cart_open(&self) -> bool {
        self.cart_panel == CartPanel::Open
    }

    #[must_use]
    pub const fn cart_panel(&self) -> CartPanel {
        self.cart_panel
    }

    /// Whether a cart or wishlist action is in flight.
    ///
    /// Mutators take `&mut self`, so this reads `true` only after a caller
    /// drops a mutator's future before it completes.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.busy
    }

    /// Total quantity across all cart lines.
    #[must_use]
    pub fn cart_count(&self) -> u64 {
        self.cart.as_ref().map_or(0, Cart::total_quantity)
    }

    /// Saved products, in the order they were saved.
    #[must_use]
    pub fn wishlist(&self) -> &[Product] {
        &self.wishlist_products
    }

    #[must_use]
    pub const fn is_wishlist_loading(&self) -> bool {
        self.wishlist_loading
    }

    #[must_use]
    pub fn is_in_wishlist(&self, product_id: &ProductId) -> bool {
        self.wishlist.contains(product_id)
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            cart: self.cart.clone(),
            cart_panel: self.cart_panel,
            is_busy: self.busy,
            cart_count: self.cart_count(),
            wishlist: self.wishlist_products.clone(),
            is_wishlist_loading: self.wishlist_loading,
        }
    }

    fn cart_id(&self) -> Option<CartId> {
        self.cart.as_ref().map(|cart| cart.id.clone())
    }

    /// Apply the protocol's success/failure rule to a backend result.
    fn settle(&mut self, result: Result<Cart, CommerceError>, action: &str) -> bool {
        self.busy = false;
        match result {
            Ok(cart) => {
                self.cart = Some(cart);
                true
            }
            Err(e) => {
                error!(error = %e, action, "Cart action failed");
                false
            }
        }
    }

    // =========================================================================
    // Cart Actions
    // =========================================================================

    /// Open or close the cart panel.
    pub fn toggle_cart(&mut self) -> CartPanel {
        self.cart_panel = self.cart_panel.toggled();
        self.cart_panel
    }

    /// Add a variant to the cart and open the cart panel.
    #[instrument(skip(self), fields(variant_id = %variant_id))]
    pub async fn add_product_to_cart(&mut self, variant_id: &VariantId, quantity: u32) -> Outcome {
        let Some(cart_id) = self.cart_id() else {
            return Outcome::Silent;
        };

        let quantity_str = quantity.to_string();
        add_breadcrumb(
            "cart",
            "Add to cart",
            Some(&[("variant_id", variant_id.as_str()), ("quantity", quantity_str.as_str())]),
        );

        self.busy = true;
        let result = self
            .client
            .add_to_cart(&cart_id, vec![CartLineInput::new(variant_id.clone(), quantity)])
            .await;

        if self.settle(result, "add") {
            self.cart_panel = CartPanel::Open;
            Outcome::success("Success", "Item added to cart")
        } else {
            Outcome::error("Could not add item to cart")
        }
    }

    /// Remove a line from the cart.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn remove_product_from_cart(&mut self, line_id: &CartLineId) -> Outcome {
        let Some(cart_id) = self.cart_id() else {
            return Outcome::Silent;
        };

        add_breadcrumb("cart", "Remove from cart", Some(&[("line_id", line_id.as_str())]));

        self.busy = true;
        let result = self
            .client
            .remove_from_cart(&cart_id, vec![line_id.clone()])
            .await;

        if self.settle(result, "remove") {
            Outcome::success("Item removed", "Item removed from cart")
        } else {
            Outcome::error("Could not remove item from cart")
        }
    }

    /// Set a line's quantity. Values below 1 become 1.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn update_product_quantity(&mut self, line_id: &CartLineId, quantity: i64) -> Outcome {
        let Some(cart_id) = self.cart_id() else {
            return Outcome::Silent;
        };

        let quantity_str = quantity.to_string();
        add_breadcrumb(
            "cart",
            "Update quantity",
            Some(&[("line_id", line_id.as_str()), ("quantity", quantity_str.as_str())]),
        );

        self.busy = true;
        let result = self
            .client
            .update_cart_quantity(&cart_id, line_id, quantity)
            .await;

        if self.settle(result, "update_quantity") {
            Outcome::Silent
        } else {
            Outcome::error("Could not update item quantity")
        }
    }

    /// Hand the cart over to checkout.
    ///
    /// The cart keeps its lines; the panel closes.
    pub fn proceed_to_checkout(&mut self) -> Outcome {
        let Some(checkout_url) = self
            .cart
            .as_ref()
            .map(|cart| cart.checkout_url.clone())
            .filter(|url| !url.is_empty())
        else {
            return Outcome::Silent;
        };

        add_breadcrumb("cart", "Proceed to checkout", None);
        self.cart_panel = CartPanel::Closed;

        Outcome::Notice(Notice {
            tone: Tone::Info,
            title: "Checkout".to_string(),
            description: CHECKOUT_MESSAGE.to_string(),
            link: Some(checkout_url),
        })
    }

    // =========================================================================
    // Wishlist Actions
    // =========================================================================

    /// Save a product. Silent if it was already saved.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_wishlist(&mut self, product_id: &ProductId) -> Outcome {
        self.busy = true;
        let outcome = match self.wishlist.add(product_id) {
            Ok(true) => {
                add_breadcrumb("wishlist", "Add to wishlist", Some(&[("product_id", product_id.as_str())]));
                if !self.wishlist_products.iter().any(|p| &p.id == product_id) {
                    self.refresh_wishlist().await;
                }
                Outcome::success("Added to Wishlist", "Item has been added to your wishlist")
            }
            Ok(false) => Outcome::Silent,
            Err(e) => {
                error!(error = %e, "Could not save wishlist");
                Outcome::error("Could not update your wishlist")
            }
        };
        self.busy = false;
        outcome
    }

    /// Forget a product. Silent if it was not saved.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub fn remove_from_wishlist(&mut self, product_id: &ProductId) -> Outcome {
        self.busy = true;
        let outcome = match self.wishlist.remove(product_id) {
            Ok(true) => {
                add_breadcrumb("wishlist", "Remove from wishlist", Some(&[("product_id", product_id.as_str())]));
                self.wishlist_products.retain(|p| &p.id != product_id);
                Outcome::success(
                    "Removed from Wishlist",
                    "Item has been removed from your wishlist",
                )
            }
            Ok(false) => Outcome::Silent,
            Err(e) => {
                error!(error = %e, "Could not save wishlist");
                Outcome::error("Could not update your wishlist")
            }
        };
        self.busy = false;
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::commerce::MockCommerce;
    use crate::storage::MemoryStorage;
    use crate::storage::tests::FlakyStorage;

    const TEE: &str = "gid://shopify/ProductVariant/101";
    const BACKPACK: &str = "gid://shopify/Product/3";

    async fn start(storage: MemoryStorage) -> ShopSession<MockCommerce<MemoryStorage>, MemoryStorage> {
        let client = MockCommerce::seeded(storage.clone()).unwrap();
        let (session, outcome) = ShopSession::start(client, storage).await;
        assert_eq!(outcome, Outcome::Silent);
        session
    }

    fn title(outcome: &Outcome) -> &str {
        &outcome.as_notice().unwrap().title
    }

    #[tokio::test]
    async fn test_fresh_session_creates_cart() {
        let storage = MemoryStorage::new();
        let session = start(storage.clone()).await;

        let cart = session.cart().unwrap();
        assert_eq!(cart.id.as_str(), "mock-cart-1");
        assert_eq!(cart.cost.subtotal_display(), "0.00");
        assert_eq!(session.cart_count(), 0);
        assert!(!session.is_cart_open());
        assert!(!session.is_busy());
        assert!(!session.is_wishlist_loading());
        assert_eq!(
            storage.get(keys::CART_ID).unwrap().as_deref(),
            Some("mock-cart-1")
        );
    }

    #[tokio::test]
    async fn test_restart_restores_cart() {
        let storage = MemoryStorage::new();
        let mut first = start(storage.clone()).await;
        first.add_product_to_cart(&VariantId::new(TEE), 2).await;

        let second = start(storage).await;
        assert_eq!(second.cart().unwrap().id.as_str(), "mock-cart-1");
        assert_eq!(second.cart_count(), 2);
    }

    #[tokio::test]
    async fn test_stale_cart_id_is_replaced() {
        let storage = MemoryStorage::new();
        storage.set(keys::CART_ID, "gone").unwrap();

        let session = start(storage.clone()).await;
        assert_eq!(session.cart().unwrap().id.as_str(), "mock-cart-1");
        assert_eq!(
            storage.get(keys::CART_ID).unwrap().as_deref(),
            Some("mock-cart-1")
        );
    }

    #[tokio::test]
    async fn test_add_twice_then_remove() {
        let mut session = start(MemoryStorage::new()).await;
        let tee = VariantId::new(TEE);

        let outcome = session.add_product_to_cart(&tee, 1).await;
        let notice = outcome.as_notice().unwrap();
        assert_eq!(notice.tone, Tone::Success);
        assert_eq!(notice.description, "Item added to cart");
        assert!(session.is_cart_open());
        assert_eq!(session.cart().unwrap().cost.subtotal_display(), "1499.00");

        session.add_product_to_cart(&tee, 1).await;
        let cart = session.cart().unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 2);
        assert_eq!(cart.cost.subtotal_display(), "2998.00");
        assert_eq!(session.cart_count(), 2);

        let line_id = cart.lines[0].id.clone();
        let outcome = session.remove_product_from_cart(&line_id).await;
        assert_eq!(title(&outcome), "Item removed");
        assert_eq!(session.cart().unwrap().cost.subtotal_display(), "0.00");
        assert_eq!(session.cart_count(), 0);
    }

    #[tokio::test]
    async fn test_update_quantity_is_silent_and_clamped() {
        let mut session = start(MemoryStorage::new()).await;
        session.add_product_to_cart(&VariantId::new(TEE), 3).await;
        let line_id = session.cart().unwrap().lines[0].id.clone();

        let outcome = session.update_product_quantity(&line_id, 0).await;
        assert_eq!(outcome, Outcome::Silent);
        assert_eq!(session.cart_count(), 1);
    }

    #[tokio::test]
    async fn test_huge_quantity_keeps_count_exact() {
        let mut session = start(MemoryStorage::new()).await;
        session.add_product_to_cart(&VariantId::new(TEE), 1).await;
        session
            .add_product_to_cart(&VariantId::new("gid://shopify/ProductVariant/201"), 1)
            .await;
        let line_id = session.cart().unwrap().lines[0].id.clone();

        let outcome = session.update_product_quantity(&line_id, 5_000_000_000).await;
        assert_eq!(outcome, Outcome::Silent);
        assert_eq!(session.cart().unwrap().lines[0].quantity, u32::MAX);
        assert_eq!(session.cart_count(), u64::from(u32::MAX) + 1);
        assert_eq!(session.snapshot().cart_count, u64::from(u32::MAX) + 1);
    }

    #[tokio::test]
    async fn test_backend_failure_keeps_state() {
        let storage = FlakyStorage::default();
        let client = MockCommerce::seeded(storage.clone()).unwrap();
        let (mut session, _) = ShopSession::start(client, storage.clone()).await;
        session.add_product_to_cart(&VariantId::new(TEE), 1).await;
        session.toggle_cart();
        let before = session.snapshot();

        storage.fail_writes(true);
        let outcome = session.add_product_to_cart(&VariantId::new(TEE), 1).await;
        assert!(outcome.is_error());
        assert_eq!(
            outcome.as_notice().unwrap().description,
            "Could not add item to cart"
        );
        assert_eq!(session.snapshot(), before);
        assert!(!session.is_busy());

        let line_id = session.cart().unwrap().lines[0].id.clone();
        let outcome = session.remove_product_from_cart(&line_id).await;
        assert_eq!(
            outcome.as_notice().unwrap().description,
            "Could not remove item from cart"
        );
        let outcome = session.update_product_quantity(&line_id, 4).await;
        assert_eq!(
            outcome.as_notice().unwrap().description,
            "Could not update item quantity"
        );
        assert_eq!(session.snapshot(), before);
    }

    #[tokio::test]
    async fn test_cart_creation_failure_leaves_no_cart() {
        let storage = FlakyStorage::default();
        storage.fail_writes(true);
        let client = MockCommerce::seeded(storage.clone()).unwrap();

        let (mut session, outcome) = ShopSession::start(client, storage).await;
        assert!(outcome.is_error());
        assert_eq!(
            outcome.as_notice().unwrap().description,
            "Could not initialize shopping cart."
        );
        assert!(session.cart().is_none());

        let outcome = session.add_product_to_cart(&VariantId::new(TEE), 1).await;
        assert_eq!(outcome, Outcome::Silent);
        assert_eq!(session.proceed_to_checkout(), Outcome::Silent);
    }

    #[tokio::test]
    async fn test_checkout_closes_panel_and_keeps_lines() {
        let mut session = start(MemoryStorage::new()).await;
        session.add_product_to_cart(&VariantId::new(TEE), 1).await;
        assert!(session.is_cart_open());

        let outcome = session.proceed_to_checkout();
        let notice = outcome.as_notice().unwrap();
        assert_eq!(notice.tone, Tone::Info);
        assert_eq!(
            notice.link.as_deref(),
            Some("https://checkout.shopfront.invalid/cart/mock-cart-1")
        );
        assert!(!session.is_cart_open());
        assert_eq!(session.cart_count(), 1);
    }

    #[tokio::test]
    async fn test_toggle_cart() {
        let mut session = start(MemoryStorage::new()).await;
        assert_eq!(session.toggle_cart(), CartPanel::Open);
        assert_eq!(session.toggle_cart(), CartPanel::Closed);
        assert_eq!(session.cart_panel(), CartPanel::Closed);
    }

    #[tokio::test]
    async fn test_wishlist_notices_only_on_change() {
        let mut session = start(MemoryStorage::new()).await;
        let backpack = ProductId::new(BACKPACK);

        let outcome = session.add_to_wishlist(&backpack).await;
        assert_eq!(title(&outcome), "Added to Wishlist");
        assert!(session.is_in_wishlist(&backpack));
        assert_eq!(session.wishlist().len(), 1);
        assert_eq!(session.wishlist()[0].handle, "canvas-backpack");

        assert_eq!(session.add_to_wishlist(&backpack).await, Outcome::Silent);

        let outcome = session.remove_from_wishlist(&backpack);
        assert_eq!(title(&outcome), "Removed from Wishlist");
        assert!(session.wishlist().is_empty());
        assert_eq!(session.remove_from_wishlist(&backpack), Outcome::Silent);
    }

    #[tokio::test]
    async fn test_wishlist_hydrated_on_start() {
        let storage = MemoryStorage::new();
        {
            let mut session = start(storage.clone()).await;
            session.add_to_wishlist(&ProductId::new(BACKPACK)).await;
            session.add_to_wishlist(&ProductId::new("gid://shopify/Product/404")).await;
            session.add_to_wishlist(&ProductId::new("gid://shopify/Product/1")).await;
        }

        let session = start(storage).await;
        let handles: Vec<&str> = session.wishlist().iter().map(|p| p.handle.as_str()).collect();
        assert_eq!(handles, vec!["canvas-backpack", "classic-white-t-shirt"]);
        assert!(session.is_in_wishlist(&ProductId::new("gid://shopify/Product/404")));
    }

    #[tokio::test]
    async fn test_wishlist_write_failure_is_reported() {
        let storage = FlakyStorage::default();
        let client = MockCommerce::seeded(storage.clone()).unwrap();
        let (mut session, _) = ShopSession::start(client, storage.clone()).await;

        storage.fail_writes(true);
        let outcome = session.add_to_wishlist(&ProductId::new(BACKPACK)).await;
        assert!(outcome.is_error());
        assert!(!session.is_in_wishlist(&ProductId::new(BACKPACK)));
        assert!(!session.is_busy());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_dropped_wishlist_add_leaves_session_busy() {
        let storage = MemoryStorage::new();
        let client = MockCommerce::seeded(storage.clone())
            .unwrap()
            .with_latency(Duration::from_millis(200));
        let (mut session, _) = ShopSession::start(client, storage).await;
        let backpack = ProductId::new(BACKPACK);

        // The write lands before the catalog lookup, which is still sleeping.
        let pending = tokio::time::timeout(
            Duration::from_millis(10),
            session.add_to_wishlist(&backpack),
        )
        .await;
        assert!(pending.is_err());
        assert!(session.is_busy());
        assert!(session.is_in_wishlist(&backpack));

        session.remove_from_wishlist(&backpack);
        assert!(!session.is_busy());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_dropped_cart_action_leaves_session_busy() {
        let storage = MemoryStorage::new();
        let client = MockCommerce::seeded(storage.clone())
            .unwrap()
            .with_latency(Duration::from_millis(200));
        let (mut session, _) = ShopSession::start(client, storage).await;
        let tee = VariantId::new(TEE);

        let pending =
            tokio::time::timeout(Duration::from_millis(10), session.add_product_to_cart(&tee, 1))
                .await;
        assert!(pending.is_err());
        assert!(session.is_busy());
        assert!(session.snapshot().is_busy);
        assert_eq!(session.cart_count(), 0);

        let outcome = session.add_product_to_cart(&tee, 1).await;
        assert!(!outcome.is_error());
        assert!(!session.is_busy());
        assert_eq!(session.cart_count(), 1);
    }
}
