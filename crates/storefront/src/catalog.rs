//! In-memory catalog store.
//!
//! Holds the product and collection corpus for a session and answers the
//! read-only queries the storefront needs: filtered/sorted product lists,
//! handle lookups, collection membership and related products.
//!
//! Lookups by unknown handle or ID return `None` rather than an error; the
//! caller decides whether a missing product is worth telling the user about.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Deserialize;
use shopfront_core::{ProductId, VariantId};
use thiserror::Error;
use tracing::debug;

use crate::commerce::types::{
    Collection, Product, ProductFilter, ProductSortKey, ProductVariant,
};

/// Demo corpus bundled with the crate.
const SEED_CATALOG: &str = include_str!("../data/catalog.json");

/// Tag that marks a product as a best seller.
const BESTSELLER_TAG: &str = "bestseller";

/// Errors detected while loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Catalog JSON could not be parsed.
    #[error("Catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two products or two collections share a handle.
    #[error("Duplicate handle: {0}")]
    DuplicateHandle(String),

    /// A variant does not assign exactly one value per product option.
    #[error("Variant {variant} of {product} does not match the product options")]
    MissingOption { product: String, variant: String },

    /// A variant uses a value the option does not declare.
    #[error("Variant {variant} of {product} uses undeclared value {value:?} for option {option:?}")]
    UnknownOptionValue {
        product: String,
        variant: String,
        option: String,
        value: String,
    },

    /// Two variants of one product share the same option assignment.
    #[error("Product {0} has two variants with the same options")]
    DuplicateVariant(String),

    /// A review rating lies outside 1 to 5 stars.
    #[error("Review {review} of {product} has rating {rating}, expected 1 to 5")]
    InvalidRating {
        product: String,
        review: String,
        rating: u8,
    },
}

#[derive(Deserialize)]
struct CatalogData {
    #[serde(default)]
    collections: Vec<Collection>,
    products: Vec<Product>,
}

/// The product/collection corpus for a session.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    collections: Vec<Collection>,
}

impl Catalog {
    /// Build a catalog, validating handles, variant options and review ratings.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if handles collide, a variant's options do not
    /// line up with its product's option definitions, or a review is rated
    /// outside 1 to 5.
    pub fn new(products: Vec<Product>, collections: Vec<Collection>) -> Result<Self, CatalogError> {
        ensure_unique_handles(products.iter().map(|p| p.handle.as_str()))?;
        ensure_unique_handles(collections.iter().map(|c| c.handle.as_str()))?;
        for product in &products {
            validate_variants(product)?;
            validate_ratings(product)?;
        }

        debug!(
            products = products.len(),
            collections = collections.len(),
            "Catalog loaded"
        );

        Ok(Self {
            products,
            collections,
        })
    }

    /// Parse and validate a catalog from JSON (`{"collections": [...], "products": [...]}`).
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let data: CatalogData = serde_json::from_str(json)?;
        Self::new(data.products, data.collections)
    }

    /// The bundled demo catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the bundled data fails validation.
    pub fn seed() -> Result<Self, CatalogError> {
        Self::from_json(SEED_CATALOG)
    }

    /// All products in catalog order.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// All collections in catalog order.
    #[must_use]
    pub fn list_collections(&self) -> &[Collection] {
        &self.collections
    }

    /// Filter, search and sort products.
    ///
    /// Constraints are AND-combined: collection membership first, then a
    /// case-insensitive substring match of the search text against title,
    /// description or any tag. The sort is stable and `reverse` flips the
    /// comparator, not the filter.
    #[must_use]
    pub fn list_products(&self, filter: &ProductFilter) -> Vec<&Product> {
        let collection = filter
            .collection_handle
            .as_deref()
            .filter(|handle| self.get_collection_by_handle(handle).is_some());

        let needle = filter
            .search_text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_lowercase);

        let mut products: Vec<&Product> = self
            .products
            .iter()
            .filter(|product| collection.is_none_or(|handle| product.in_collection(handle)))
            .filter(|product| {
                needle
                    .as_deref()
                    .is_none_or(|needle| matches_search(product, needle))
            })
            .collect();

        if let Some(sort_key) = filter.sort_key {
            products.sort_by(|a, b| {
                let ordering = compare_products(a, b, sort_key);
                if filter.reverse {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        products
    }

    /// Look up a product by handle.
    #[must_use]
    pub fn get_product_by_handle(&self, handle: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.handle == handle)
    }

    /// Look up a product by ID.
    #[must_use]
    pub fn get_product(&self, product_id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == product_id)
    }

    /// Look up a collection by handle.
    #[must_use]
    pub fn get_collection_by_handle(&self, handle: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.handle == handle)
    }

    /// Products belonging to a collection, in catalog order.
    #[must_use]
    pub fn list_products_by_collection(&self, handle: &str) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|p| p.in_collection(handle))
            .collect()
    }

    /// Resolve a variant ID to its product and variant.
    #[must_use]
    pub fn find_variant(&self, variant_id: &VariantId) -> Option<(&Product, &ProductVariant)> {
        self.products
            .iter()
            .find_map(|p| p.variant(variant_id).map(|v| (p, v)))
    }

    /// Up to `limit` products related to the given one.
    ///
    /// Products sharing a collection come first, then products sharing a tag,
    /// each in catalog order. The source product is never included.
    #[must_use]
    pub fn get_related_products(&self, product_id: &ProductId, limit: usize) -> Vec<&Product> {
        let Some(source) = self.get_product(product_id) else {
            return Vec::new();
        };

        let mut related: Vec<&Product> = self
            .products
            .iter()
            .filter(|p| p.id != source.id)
            .filter(|p| p.collections.iter().any(|c| source.in_collection(c)))
            .take(limit)
            .collect();

        if related.len() < limit {
            let remaining = limit - related.len();
            let by_tag: Vec<&Product> = self
                .products
                .iter()
                .filter(|p| p.id != source.id)
                .filter(|p| !related.iter().any(|r| r.id == p.id))
                .filter(|p| p.tags.iter().any(|t| source.has_tag(t)))
                .take(remaining)
                .collect();
            related.extend(by_tag);
        }

        related
    }
}

fn matches_search(product: &Product, needle: &str) -> bool {
    product.title.to_lowercase().contains(needle)
        || product.description.to_lowercase().contains(needle)
        || product
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(needle))
}

fn compare_products(a: &Product, b: &Product, sort_key: ProductSortKey) -> Ordering {
    match sort_key {
        ProductSortKey::Title => compare_titles(&a.title, &b.title),
        ProductSortKey::Price => a
            .price_range
            .min_variant_price
            .amount
            .cmp(&b.price_range.min_variant_price.amount),
        ProductSortKey::BestSelling => {
            // Best sellers first, then by number of reviews, both descending.
            let rank = |p: &Product| (p.has_tag(BESTSELLER_TAG), p.reviews.len());
            rank(b).cmp(&rank(a))
        }
    }
}

/// Case-insensitive title ordering, ties broken by the raw string.
fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn ensure_unique_handles<'a>(handles: impl Iterator<Item = &'a str>) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for handle in handles {
        if !seen.insert(handle) {
            return Err(CatalogError::DuplicateHandle(handle.to_string()));
        }
    }
    Ok(())
}

fn validate_ratings(product: &Product) -> Result<(), CatalogError> {
    match product
        .reviews
        .iter()
        .find(|review| !(1..=5).contains(&review.rating))
    {
        Some(review) => Err(CatalogError::InvalidRating {
            product: product.handle.clone(),
            review: review.id.clone(),
            rating: review.rating,
        }),
        None => Ok(()),
    }
}

fn validate_variants(product: &Product) -> Result<(), CatalogError> {
    let mut combinations = HashSet::new();

    for variant in &product.variants {
        let assigns_each_option_once = variant.selected_options.len() == product.options.len()
            && product.options.iter().all(|option| {
                variant
                    .selected_options
                    .iter()
                    .filter(|s| s.name == option.name)
                    .count()
                    == 1
            });
        if !assigns_each_option_once {
            return Err(CatalogError::MissingOption {
                product: product.handle.clone(),
                variant: variant.id.to_string(),
            });
        }

        for selected in &variant.selected_options {
            let declared = product
                .options
                .iter()
                .find(|o| o.name == selected.name)
                .is_some_and(|o| o.values.contains(&selected.value));
            if !declared {
                return Err(CatalogError::UnknownOptionValue {
                    product: product.handle.clone(),
                    variant: variant.id.to_string(),
                    option: selected.name.clone(),
                    value: selected.value.clone(),
                });
            }
        }

        let mut key: Vec<(&str, &str)> = variant
            .selected_options
            .iter()
            .map(|s| (s.name.as_str(), s.value.as_str()))
            .collect();
        key.sort_unstable();
        if !combinations.insert(key) {
            return Err(CatalogError::DuplicateVariant(product.handle.clone()));
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
pub(crate) mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use shopfront_core::{CollectionId, CurrencyCode, Money};

    use super::*;
    use crate::commerce::types::{PriceRange, ProductOption, Review, SelectedOption};

    /// Minimal single-variant product for tests.
    pub(crate) fn product(id: &str, title: &str, price: i64) -> Product {
        let money = Money::new(Decimal::new(price, 0), CurrencyCode::INR);
        let handle = title.to_lowercase().replace(' ', "-");
        Product {
            id: ProductId::new(id),
            title: title.to_string(),
            handle,
            description: format!("{title} description"),
            price_range: PriceRange {
                min_variant_price: money,
                max_variant_price: money,
            },
            images: Vec::new(),
            options: vec![ProductOption {
                name: "Title".to_string(),
                values: vec!["Default".to_string()],
            }],
            variants: vec![ProductVariant {
                id: VariantId::new(format!("{id}-v1")),
                title: "Default".to_string(),
                available_for_sale: true,
                quantity_available: 10,
                price: money,
                selected_options: vec![SelectedOption {
                    name: "Title".to_string(),
                    value: "Default".to_string(),
                }],
                image: None,
            }],
            collections: Vec::new(),
            tags: Vec::new(),
            reviews: Vec::new(),
        }
    }

    fn review(id: &str, rating: u8) -> Review {
        Review {
            id: id.to_string(),
            author: "Asha".to_string(),
            rating,
            comment: "Fits well".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
        }
    }

    fn collection(handle: &str) -> Collection {
        Collection {
            id: CollectionId::new(format!("col-{handle}")),
            title: handle.to_string(),
            handle: handle.to_string(),
            description: String::new(),
            image: None,
        }
    }

    fn titles(products: &[&Product]) -> Vec<String> {
        products.iter().map(|p| p.title.clone()).collect()
    }

    #[test]
    fn test_seed_catalog_is_valid() {
        let catalog = Catalog::seed().unwrap();
        assert_eq!(catalog.products().len(), 12);
        assert_eq!(catalog.list_collections().len(), 4);
    }

    #[test]
    fn test_search_matches_single_product() {
        let mut products: Vec<Product> = (1..=9)
            .map(|i| product(&format!("p{i}"), &format!("Widget {i}"), 100))
            .collect();
        products.push(product("p10", "Designer Jeans", 3999));
        let catalog = Catalog::new(products, Vec::new()).unwrap();

        let found = catalog.list_products(&ProductFilter::search("jeans"));
        assert_eq!(titles(&found), vec!["Designer Jeans"]);
    }

    #[test]
    fn test_search_matches_tags_and_description() {
        let mut tagged = product("p1", "Plain Tee", 500);
        tagged.tags = vec!["Summer".to_string()];
        let mut described = product("p2", "Sandals", 900);
        described.description = "Perfect for SUMMER walks".to_string();
        let other = product("p3", "Scarf", 700);
        let catalog = Catalog::new(vec![tagged, described, other], Vec::new()).unwrap();

        let found = catalog.list_products(&ProductFilter::search("summer"));
        assert_eq!(titles(&found), vec!["Plain Tee", "Sandals"]);
    }

    #[test]
    fn test_blank_search_constrains_nothing() {
        let catalog = Catalog::seed().unwrap();
        let found = catalog.list_products(&ProductFilter::search("   "));
        assert_eq!(found.len(), catalog.products().len());
    }

    #[test]
    fn test_sort_by_price_and_reverse() {
        let catalog = Catalog::seed().unwrap();

        let ascending = catalog.list_products(&ProductFilter::default().sorted_by(ProductSortKey::Price, false));
        let prices: Vec<Decimal> = ascending
            .iter()
            .map(|p| p.price_range.min_variant_price.amount)
            .collect();
        assert!(prices.windows(2).all(|w| w[0] <= w[1]));

        let descending = catalog.list_products(&ProductFilter::default().sorted_by(ProductSortKey::Price, true));
        let prices: Vec<Decimal> = descending
            .iter()
            .map(|p| p.price_range.min_variant_price.amount)
            .collect();
        assert!(prices.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_price_sort_is_stable() {
        // Designer Jeans and the bedsheet set both start at 3999; catalog order wins.
        let catalog = Catalog::seed().unwrap();
        let sorted = catalog.list_products(&ProductFilter::default().sorted_by(ProductSortKey::Price, false));
        let jeans = sorted.iter().position(|p| p.handle == "designer-jeans").unwrap();
        let sheets = sorted
            .iter()
            .position(|p| p.handle == "organic-cotton-bedsheet-set")
            .unwrap();
        assert!(jeans < sheets);
    }

    #[test]
    fn test_sort_by_title_is_case_insensitive() {
        let catalog = Catalog::new(
            vec![
                product("p1", "banana Bag", 1),
                product("p2", "Apple Watch", 1),
                product("p3", "cherry Case", 1),
            ],
            Vec::new(),
        )
        .unwrap();

        let sorted = catalog.list_products(&ProductFilter::default().sorted_by(ProductSortKey::Title, false));
        assert_eq!(titles(&sorted), vec!["Apple Watch", "banana Bag", "cherry Case"]);
    }

    #[test]
    fn test_best_selling_puts_bestsellers_first() {
        let catalog = Catalog::seed().unwrap();
        let sorted = catalog.list_products(&ProductFilter::default().sorted_by(ProductSortKey::BestSelling, false));
        assert!(sorted[0].has_tag("bestseller"));
        assert!(sorted[1].has_tag("bestseller"));
        assert!(!sorted[2].has_tag("bestseller"));
    }

    #[test]
    fn test_collection_filter() {
        let catalog = Catalog::seed().unwrap();
        let clothing = catalog.list_products(&ProductFilter::collection("clothing"));
        assert_eq!(clothing.len(), 3);
        assert!(clothing.iter().all(|p| p.in_collection("clothing")));

        let by_collection = catalog.list_products_by_collection("clothing");
        assert_eq!(titles(&clothing), titles(&by_collection));
    }

    #[test]
    fn test_unknown_collection_constrains_nothing() {
        let catalog = Catalog::seed().unwrap();
        let found = catalog.list_products(&ProductFilter::collection("does-not-exist"));
        assert_eq!(found.len(), catalog.products().len());
    }

    #[test]
    fn test_collection_and_search_are_and_combined() {
        let catalog = Catalog::seed().unwrap();
        let filter = ProductFilter {
            collection_handle: Some("accessories".to_string()),
            search_text: Some("leather".to_string()),
            ..ProductFilter::default()
        };
        let found = catalog.list_products(&filter);
        let handles: Vec<&str> = found.iter().map(|p| p.handle.as_str()).collect();
        assert_eq!(
            handles,
            vec![
                "canvas-backpack",
                "handcrafted-leather-wallet",
                "handmade-leather-sandals"
            ]
        );
    }

    #[test]
    fn test_lookups_return_none_for_unknown() {
        let catalog = Catalog::seed().unwrap();
        assert!(catalog.get_product_by_handle("designer-jeans").is_some());
        assert!(catalog.get_product_by_handle("nope").is_none());
        assert!(catalog.get_collection_by_handle("electronics").is_some());
        assert!(catalog.get_collection_by_handle("nope").is_none());
        assert!(catalog.find_variant(&VariantId::new("nope")).is_none());
    }

    #[test]
    fn test_find_variant_returns_parent() {
        let catalog = Catalog::seed().unwrap();
        let (product, variant) = catalog
            .find_variant(&VariantId::new("gid://shopify/ProductVariant/101"))
            .unwrap();
        assert_eq!(product.handle, "classic-white-t-shirt");
        assert_eq!(variant.price.amount_display(), "1499.00");
    }

    #[test]
    fn test_related_products_prefer_collection_then_tags() {
        let catalog = Catalog::seed().unwrap();
        let jeans = catalog.get_product_by_handle("designer-jeans").unwrap();
        let related = catalog.get_related_products(&jeans.id, 4);

        assert_eq!(related.len(), 4);
        assert!(related.iter().all(|p| p.id != jeans.id));
        // Two other clothing products first, then premium-tagged products.
        assert!(related[0].in_collection("clothing"));
        assert!(related[1].in_collection("clothing"));
        assert!(related[2].has_tag("premium"));
    }

    #[test]
    fn test_related_products_respects_limit() {
        let catalog = Catalog::seed().unwrap();
        for product in catalog.products() {
            for limit in [0, 1, 4, 20] {
                let related = catalog.get_related_products(&product.id, limit);
                assert!(related.len() <= limit);
                assert!(related.iter().all(|p| p.id != product.id));
            }
        }
    }

    #[test]
    fn test_related_products_unknown_source() {
        let catalog = Catalog::seed().unwrap();
        assert!(catalog.get_related_products(&ProductId::new("nope"), 4).is_empty());
    }

    #[test]
    fn test_duplicate_product_handle_rejected() {
        let result = Catalog::new(
            vec![product("p1", "Same Name", 1), product("p2", "Same Name", 2)],
            Vec::new(),
        );
        assert!(matches!(result, Err(CatalogError::DuplicateHandle(h)) if h == "same-name"));
    }

    #[test]
    fn test_duplicate_collection_handle_rejected() {
        let result = Catalog::new(Vec::new(), vec![collection("sale"), collection("sale")]);
        assert!(matches!(result, Err(CatalogError::DuplicateHandle(_))));
    }

    #[test]
    fn test_undeclared_option_value_rejected() {
        let mut bad = product("p1", "Tee", 1);
        bad.variants[0].selected_options[0].value = "Huge".to_string();
        let result = Catalog::new(vec![bad], Vec::new());
        assert!(matches!(result, Err(CatalogError::UnknownOptionValue { .. })));
    }

    #[test]
    fn test_missing_option_rejected() {
        let mut bad = product("p1", "Tee", 1);
        bad.options.push(ProductOption {
            name: "Color".to_string(),
            values: vec!["Red".to_string()],
        });
        let result = Catalog::new(vec![bad], Vec::new());
        assert!(matches!(result, Err(CatalogError::MissingOption { .. })));
    }

    #[test]
    fn test_invalid_review_rating_rejected() {
        for rating in [0, 9] {
            let mut bad = product("p1", "Tee", 1);
            bad.reviews = vec![review("r1", 5), review("r2", rating)];
            let result = Catalog::new(vec![bad], Vec::new());
            assert!(matches!(
                result,
                Err(CatalogError::InvalidRating { product, review, rating: r })
                    if product == "tee" && review == "r2" && r == rating
            ));
        }

        let mut good = product("p1", "Tee", 1);
        good.reviews = vec![review("r1", 1), review("r2", 5)];
        assert!(Catalog::new(vec![good], Vec::new()).is_ok());
    }

    #[test]
    fn test_duplicate_variant_options_rejected() {
        let mut bad = product("p1", "Tee", 1);
        let mut twin = bad.variants[0].clone();
        twin.id = VariantId::new("p1-v2");
        bad.variants.push(twin);
        let result = Catalog::new(vec![bad], Vec::new());
        assert!(matches!(result, Err(CatalogError::DuplicateVariant(_))));
    }
}
