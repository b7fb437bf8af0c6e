//! GraphQL documents and wire types for the Shopify Storefront API.
//!
//! Response types mirror the selection sets below field for field; anything
//! not selected is absent.

use serde::{Deserialize, Serialize};

// =============================================================================
// Documents
// =============================================================================

const PRODUCT_FIELDS: &str = r"
fragment ProductFields on Product {
  id
  title
  handle
  description
  tags
  priceRange {
    minVariantPrice { amount currencyCode }
    maxVariantPrice { amount currencyCode }
  }
  images(first: 10) { nodes { url altText } }
  options { name optionValues { name } }
  variants(first: 100) {
    nodes {
      id
      title
      availableForSale
      quantityAvailable
      price { amount currencyCode }
      selectedOptions { name value }
      image { url altText }
    }
  }
  collections(first: 20) { nodes { handle } }
}
";

const CART_FIELDS: &str = r"
fragment CartFields on Cart {
  id
  checkoutUrl
  cost {
    subtotalAmount { amount currencyCode }
    totalAmount { amount currencyCode }
  }
  lines(first: 100) {
    nodes {
      id
      quantity
      merchandise {
        ... on ProductVariant {
          id
          title
          price { amount currencyCode }
          image { url altText }
          product { title handle featuredImage { url altText } }
        }
      }
    }
  }
}
";

const CART_USER_ERRORS: &str = "userErrors { field message }";

/// Fetch one page of products.
pub fn get_products() -> String {
    format!(
        "query GetProducts($first: Int!, $after: String) {{
  products(first: $first, after: $after) {{
    pageInfo {{ hasNextPage endCursor }}
    nodes {{ ...ProductFields }}
  }}
}}
{PRODUCT_FIELDS}"
    )
}

/// Fetch one page of collections.
pub const GET_COLLECTIONS: &str = r"
query GetCollections($first: Int!, $after: String) {
  collections(first: $first, after: $after) {
    pageInfo { hasNextPage endCursor }
    nodes { id title handle description image { url altText } }
  }
}
";

/// Create an empty cart.
pub fn create_cart() -> String {
    format!(
        "mutation CreateCart {{
  cartCreate(input: {{}}) {{ cart {{ ...CartFields }} {CART_USER_ERRORS} }}
}}
{CART_FIELDS}"
    )
}

/// Fetch a cart.
pub fn get_cart() -> String {
    format!(
        "query GetCart($cartId: ID!) {{
  cart(id: $cartId) {{ ...CartFields }}
}}
{CART_FIELDS}"
    )
}

/// Add lines to a cart.
pub fn add_to_cart() -> String {
    format!(
        "mutation AddToCart($cartId: ID!, $lines: [CartLineInput!]!) {{
  cartLinesAdd(cartId: $cartId, lines: $lines) {{ cart {{ ...CartFields }} {CART_USER_ERRORS} }}
}}
{CART_FIELDS}"
    )
}

/// Remove lines from a cart.
pub fn remove_from_cart() -> String {
    format!(
        "mutation RemoveFromCart($cartId: ID!, $lineIds: [ID!]!) {{
  cartLinesRemove(cartId: $cartId, lineIds: $lineIds) {{ cart {{ ...CartFields }} {CART_USER_ERRORS} }}
}}
{CART_FIELDS}"
    )
}

/// Update line quantities.
pub fn update_cart_lines() -> String {
    format!(
        "mutation UpdateCartLines($cartId: ID!, $lines: [CartLineUpdateInput!]!) {{
  cartLinesUpdate(cartId: $cartId, lines: $lines) {{ cart {{ ...CartFields }} {CART_USER_ERRORS} }}
}}
{CART_FIELDS}"
    )
}

// =============================================================================
// Envelope
// =============================================================================

/// A GraphQL request body.
#[derive(Debug, Serialize)]
pub struct Request<'a, V> {
    pub query: &'a str,
    pub variables: V,
}

/// A GraphQL response body.
#[derive(Debug, Deserialize)]
pub struct Response<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<super::super::GraphQLError>>,
}

/// Pagination variables.
#[derive(Debug, Serialize)]
pub struct PageVariables {
    pub first: i64,
    pub after: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Nodes<T> {
    pub nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub page_info: PageInfo,
    pub nodes: Vec<T>,
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyV2 {
    pub amount: String,
    pub currency_code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub url: String,
    pub alt_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub min_variant_price: MoneyV2,
    pub max_variant_price: MoneyV2,
}

#[derive(Debug, Deserialize)]
pub struct OptionValue {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductOption {
    pub name: String,
    pub option_values: Vec<OptionValue>,
}

#[derive(Debug, Deserialize)]
pub struct SelectedOption {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: String,
    pub title: String,
    pub available_for_sale: bool,
    pub quantity_available: Option<i64>,
    pub price: MoneyV2,
    pub selected_options: Vec<SelectedOption>,
    pub image: Option<Image>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionHandle {
    pub handle: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    pub handle: String,
    pub description: String,
    pub tags: Vec<String>,
    pub price_range: PriceRange,
    pub images: Nodes<Image>,
    pub options: Vec<ProductOption>,
    pub variants: Nodes<ProductVariant>,
    pub collections: Nodes<CollectionHandle>,
}

#[derive(Debug, Deserialize)]
pub struct ProductsData {
    pub products: Connection<Product>,
}

#[derive(Debug, Deserialize)]
pub struct Collection {
    pub id: String,
    pub title: String,
    pub handle: String,
    pub description: String,
    pub image: Option<Image>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionsData {
    pub collections: Connection<Collection>,
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartIdVariables<'a> {
    pub cart_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineInput<'a> {
    pub merchandise_id: &'a str,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartVariables<'a> {
    pub cart_id: &'a str,
    pub lines: Vec<CartLineInput<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFromCartVariables<'a> {
    pub cart_id: &'a str,
    pub line_ids: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct CartLineUpdateInput<'a> {
    pub id: &'a str,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartLinesVariables<'a> {
    pub cart_id: &'a str,
    pub lines: Vec<CartLineUpdateInput<'a>>,
}

#[derive(Debug, Deserialize)]
pub struct MerchandiseProduct {
    pub title: String,
    pub handle: String,
    #[serde(rename = "featuredImage")]
    pub featured_image: Option<Image>,
}

#[derive(Debug, Deserialize)]
pub struct Merchandise {
    pub id: String,
    pub title: String,
    pub price: MoneyV2,
    pub image: Option<Image>,
    pub product: MerchandiseProduct,
}

#[derive(Debug, Deserialize)]
pub struct CartLine {
    pub id: String,
    pub quantity: i64,
    pub merchandise: Merchandise,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCost {
    pub subtotal_amount: MoneyV2,
    pub total_amount: MoneyV2,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: String,
    pub checkout_url: String,
    pub cost: CartCost,
    pub lines: Nodes<CartLine>,
}

#[derive(Debug, Deserialize)]
pub struct CartData {
    pub cart: Option<Cart>,
}

#[derive(Debug, Deserialize)]
pub struct UserError {
    pub field: Option<Vec<String>>,
    pub message: String,
}

/// Payload shared by every cart mutation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPayload {
    pub cart: Option<Cart>,
    pub user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCreateData {
    pub cart_create: Option<CartPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLinesAddData {
    pub cart_lines_add: Option<CartPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLinesRemoveData {
    pub cart_lines_remove: Option<CartPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLinesUpdateData {
    pub cart_lines_update: Option<CartPayload>,
}
