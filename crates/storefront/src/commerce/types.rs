//! Domain types for the storefront catalog and cart.
//!
//! These types are shared by every [`CommerceClient`](super::CommerceClient)
//! backend. The Shopify backend converts its GraphQL payloads into them; the
//! mock backend loads them straight from the bundled catalog JSON and persists
//! carts in this shape.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shopfront_core::{
    CartId, CartLineId, CollectionId, CurrencyCode, Money, ProductId, VariantId, format_amount,
};

// =============================================================================
// Money Types
// =============================================================================

/// Price range for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    /// Minimum price among all variants.
    pub min_variant_price: Money,
    /// Maximum price among all variants.
    pub max_variant_price: Money,
}

// =============================================================================
// Image Types
// =============================================================================

/// Product, variant or collection image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Image URL.
    pub url: String,
    /// Alt text for accessibility.
    #[serde(default)]
    pub alt_text: Option<String>,
}

// =============================================================================
// Review Types
// =============================================================================

/// A customer review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub author: String,
    /// Star rating, 1 through 5.
    pub rating: u8,
    pub comment: String,
    pub date: NaiveDate,
}

// =============================================================================
// Product Types
// =============================================================================

/// Selected option on a product variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    /// Option name (e.g., "Size", "Color").
    pub name: String,
    /// Selected value (e.g., "Large", "Blue").
    pub value: String,
}

/// Product option definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    /// Option name (e.g., "Size").
    pub name: String,
    /// Allowed values in display order (e.g., `["Small", "Medium", "Large"]`).
    pub values: Vec<String>,
}

/// A product variant (specific combination of options).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    /// Variant ID.
    pub id: VariantId,
    /// Variant title (combination of option values).
    pub title: String,
    /// Whether this variant is available for sale.
    pub available_for_sale: bool,
    /// Quantity available.
    #[serde(default)]
    pub quantity_available: u32,
    /// Current price.
    pub price: Money,
    /// Option assignment identifying this variant.
    pub selected_options: Vec<SelectedOption>,
    /// Dedicated variant image.
    #[serde(default)]
    pub image: Option<Image>,
}

/// A product in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// Product title.
    pub title: String,
    /// URL handle.
    pub handle: String,
    /// Plain text description.
    pub description: String,
    /// Price range across variants.
    pub price_range: PriceRange,
    /// All product images, featured image first.
    #[serde(default)]
    pub images: Vec<Image>,
    /// Product options.
    #[serde(default)]
    pub options: Vec<ProductOption>,
    /// Product variants.
    pub variants: Vec<ProductVariant>,
    /// Handles of the collections this product belongs to.
    #[serde(default)]
    pub collections: Vec<String>,
    /// Free-text tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Customer reviews, oldest first.
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl Product {
    /// Featured (first) image, if any.
    #[must_use]
    pub fn featured_image(&self) -> Option<&Image> {
        self.images.first()
    }

    /// Whether the product belongs to the collection with the given handle.
    #[must_use]
    pub fn in_collection(&self, handle: &str) -> bool {
        self.collections.iter().any(|c| c == handle)
    }

    /// Whether the product carries the given tag (case-insensitive).
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Look up one of this product's variants.
    #[must_use]
    pub fn variant(&self, variant_id: &VariantId) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| &v.id == variant_id)
    }

    /// Average review rating, if the product has reviews.
    #[must_use]
    pub fn average_rating(&self) -> Option<f64> {
        if self.reviews.is_empty() {
            return None;
        }
        let total: u32 = self.reviews.iter().map(|r| u32::from(r.rating)).sum();
        #[allow(clippy::cast_precision_loss)] // review counts are tiny
        let count = self.reviews.len() as f64;
        Some(f64::from(total) / count)
    }
}

// =============================================================================
// Collection Types
// =============================================================================

/// A collection of products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Collection ID.
    pub id: CollectionId,
    /// Collection title.
    pub title: String,
    /// URL handle.
    pub handle: String,
    /// Plain text description.
    pub description: String,
    /// Representative image.
    #[serde(default)]
    pub image: Option<Image>,
}

// =============================================================================
// Query Types
// =============================================================================

/// Sort keys for product queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductSortKey {
    /// Sort by title.
    Title,
    /// Sort by minimum variant price.
    Price,
    /// Sort by best selling.
    BestSelling,
}

/// Product list query. All present constraints must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    /// Restrict to a collection. Unknown handles constrain nothing.
    pub collection_handle: Option<String>,
    /// Case-insensitive substring over title, description and tags.
    pub search_text: Option<String>,
    /// Sort order; `None` keeps catalog order.
    pub sort_key: Option<ProductSortKey>,
    /// Flip the sort comparator.
    #[serde(default)]
    pub reverse: bool,
}

impl ProductFilter {
    /// Filter matching a search string.
    #[must_use]
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search_text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Filter restricted to a collection.
    #[must_use]
    pub fn collection(handle: impl Into<String>) -> Self {
        Self {
            collection_handle: Some(handle.into()),
            ..Self::default()
        }
    }

    /// Set the sort order.
    #[must_use]
    pub const fn sorted_by(mut self, sort_key: ProductSortKey, reverse: bool) -> Self {
        self.sort_key = Some(sort_key);
        self.reverse = reverse;
        self
    }
}

// =============================================================================
// Cart Types
// =============================================================================

/// Simplified product info for cart merchandise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchandiseProduct {
    /// Product title.
    pub title: String,
    /// Product handle.
    pub handle: String,
}

/// Merchandise in a cart line, captured when the line was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartMerchandise {
    /// Variant ID.
    pub id: VariantId,
    /// Variant title.
    pub title: String,
    /// Parent product info.
    pub product: MerchandiseProduct,
    /// Unit price.
    pub price: Money,
    /// Variant image, falling back to the product's featured image.
    #[serde(default)]
    pub image: Option<Image>,
}

/// A line item in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Cart line ID.
    pub id: CartLineId,
    /// Quantity, always at least 1.
    pub quantity: u32,
    /// Product variant snapshot.
    pub merchandise: CartMerchandise,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.merchandise.price.times(self.quantity)
    }
}

/// Cart cost summary.
///
/// No tax or shipping is modelled, so `total` always equals `subtotal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartCost {
    /// Sum of unit price times quantity over all lines.
    pub subtotal: Decimal,
    /// Total amount.
    pub total: Decimal,
    /// Currency of the first line; `None` for an empty cart.
    pub currency_code: Option<CurrencyCode>,
}

impl CartCost {
    /// Totals for an empty cart.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            subtotal: Decimal::ZERO,
            total: Decimal::ZERO,
            currency_code: None,
        }
    }

    /// Compute totals over a set of lines.
    #[must_use]
    pub fn from_lines(lines: &[CartLine]) -> Self {
        let subtotal: Decimal = lines.iter().map(|line| line.line_total().amount).sum();
        Self {
            subtotal,
            total: subtotal,
            currency_code: lines.first().map(|line| line.merchandise.price.currency_code),
        }
    }

    /// Subtotal formatted to two decimal places.
    #[must_use]
    pub fn subtotal_display(&self) -> String {
        format_amount(self.subtotal)
    }

    /// Total formatted to two decimal places.
    #[must_use]
    pub fn total_display(&self) -> String {
        format_amount(self.total)
    }
}

/// A shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Cart ID.
    pub id: CartId,
    /// Checkout URL handed to the external checkout.
    pub checkout_url: String,
    /// Cart lines in insertion order.
    pub lines: Vec<CartLine>,
    /// Cart cost summary.
    pub cost: CartCost,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn empty(id: CartId, checkout_url: String) -> Self {
        Self {
            id,
            checkout_url,
            lines: Vec::new(),
            cost: CartCost::zero(),
        }
    }

    /// Total item quantity across all lines.
    ///
    /// Widened to `u64` so lines at `u32::MAX` cannot overflow the sum.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Recompute the cost summary from the current lines.
    pub fn recalculate(&mut self) {
        self.cost = CartCost::from_lines(&self.lines);
    }

    /// Find a line by ID.
    #[must_use]
    pub fn line(&self, line_id: &CartLineId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.id == line_id)
    }

    /// Find the line holding a variant.
    #[must_use]
    pub fn line_for_variant(&self, variant_id: &VariantId) -> Option<&CartLine> {
        self.lines
            .iter()
            .find(|line| &line.merchandise.id == variant_id)
    }
}

/// Input for adding a line to cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineInput {
    /// Product variant ID.
    pub merchandise_id: VariantId,
    /// Quantity to add.
    pub quantity: u32,
}

impl CartLineInput {
    /// Build a line input.
    #[must_use]
    pub fn new(merchandise_id: impl Into<VariantId>, quantity: u32) -> Self {
        Self {
            merchandise_id: merchandise_id.into(),
            quantity,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(id: &str, variant: &str, amount: i64, quantity: u32) -> CartLine {
        CartLine {
            id: CartLineId::new(id),
            quantity,
            merchandise: CartMerchandise {
                id: VariantId::new(variant),
                title: "Default".to_string(),
                product: MerchandiseProduct {
                    title: "Product".to_string(),
                    handle: "product".to_string(),
                },
                price: Money::new(Decimal::new(amount, 0), CurrencyCode::INR),
                image: None,
            },
        }
    }

    #[test]
    fn test_cart_cost_sums_lines() {
        let lines = vec![line("l1", "v1", 1499, 2), line("l2", "v2", 3999, 1)];
        let cost = CartCost::from_lines(&lines);
        assert_eq!(cost.subtotal_display(), "6997.00");
        assert_eq!(cost.total, cost.subtotal);
        assert_eq!(cost.currency_code, Some(CurrencyCode::INR));
    }

    #[test]
    fn test_empty_cart_cost() {
        let cost = CartCost::from_lines(&[]);
        assert_eq!(cost, CartCost::zero());
        assert_eq!(cost.subtotal_display(), "0.00");
        assert_eq!(cost.currency_code, None);
    }

    #[test]
    fn test_cart_total_quantity_and_lookup() {
        let mut cart = Cart::empty(CartId::new("c1"), "https://checkout".to_string());
        cart.lines = vec![line("l1", "v1", 10, 2), line("l2", "v2", 20, 3)];
        cart.recalculate();

        assert_eq!(cart.total_quantity(), 5);
        assert_eq!(cart.cost.subtotal_display(), "80.00");
        assert!(cart.line(&CartLineId::new("l2")).is_some());
        assert!(cart.line_for_variant(&VariantId::new("v1")).is_some());
        assert!(cart.line_for_variant(&VariantId::new("v9")).is_none());
    }

    #[test]
    fn test_total_quantity_does_not_overflow_u32() {
        let mut cart = Cart::empty(CartId::new("c1"), "https://checkout".to_string());
        cart.lines = vec![line("l1", "v1", 10, u32::MAX), line("l2", "v2", 20, 1)];

        assert_eq!(cart.total_quantity(), u64::from(u32::MAX) + 1);
    }

    #[test]
    fn test_product_filter_serde_uses_screaming_sort_keys() {
        let filter = ProductFilter::search("jeans").sorted_by(ProductSortKey::BestSelling, true);
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["sort_key"], "BEST_SELLING");
        assert_eq!(json["reverse"], true);
    }
}
