//! Conversions from Storefront API wire types to domain types.

use std::str::FromStr;

use rust_decimal::Decimal;
use shopfront_core::{CartId, CartLineId, CollectionId, CurrencyCode, Money, ProductId, VariantId};

use super::queries;
use crate::commerce::CommerceError;
use crate::commerce::types::{
    Cart, CartCost, CartLine, CartMerchandise, Collection, Image, MerchandiseProduct, PriceRange,
    Product, ProductOption, ProductVariant, SelectedOption,
};

pub fn convert_money(money: queries::MoneyV2) -> Result<Money, CommerceError> {
    let amount = Decimal::from_str(&money.amount)
        .map_err(|e| CommerceError::InvalidData(format!("amount {:?}: {e}", money.amount)))?;
    let currency_code = CurrencyCode::from_str(&money.currency_code)
        .map_err(|e| CommerceError::InvalidData(e.to_string()))?;
    Ok(Money::new(amount, currency_code))
}

pub fn convert_image(image: queries::Image) -> Image {
    Image {
        url: image.url,
        alt_text: image.alt_text,
    }
}

fn convert_variant(variant: queries::ProductVariant) -> Result<ProductVariant, CommerceError> {
    Ok(ProductVariant {
        id: VariantId::new(variant.id),
        title: variant.title,
        available_for_sale: variant.available_for_sale,
        // Null when inventory tracking is off.
        quantity_available: variant
            .quantity_available
            .and_then(|q| u32::try_from(q.max(0)).ok())
            .unwrap_or(0),
        price: convert_money(variant.price)?,
        selected_options: variant
            .selected_options
            .into_iter()
            .map(|o| SelectedOption {
                name: o.name,
                value: o.value,
            })
            .collect(),
        image: variant.image.map(convert_image),
    })
}

pub fn convert_product(product: queries::Product) -> Result<Product, CommerceError> {
    Ok(Product {
        id: ProductId::new(product.id),
        title: product.title,
        handle: product.handle,
        description: product.description,
        price_range: PriceRange {
            min_variant_price: convert_money(product.price_range.min_variant_price)?,
            max_variant_price: convert_money(product.price_range.max_variant_price)?,
        },
        images: product.images.nodes.into_iter().map(convert_image).collect(),
        options: product
            .options
            .into_iter()
            .map(|o| ProductOption {
                name: o.name,
                values: o.option_values.into_iter().map(|v| v.name).collect(),
            })
            .collect(),
        variants: product
            .variants
            .nodes
            .into_iter()
            .map(convert_variant)
            .collect::<Result<_, _>>()?,
        collections: product
            .collections
            .nodes
            .into_iter()
            .map(|c| c.handle)
            .collect(),
        tags: product.tags,
        // The Storefront API has no reviews.
        reviews: Vec::new(),
    })
}

pub fn convert_collection(collection: queries::Collection) -> Collection {
    Collection {
        id: CollectionId::new(collection.id),
        title: collection.title,
        handle: collection.handle,
        description: collection.description,
        image: collection.image.map(convert_image),
    }
}

fn convert_cart_line(line: queries::CartLine) -> Result<CartLine, CommerceError> {
    let quantity = u32::try_from(line.quantity)
        .map_err(|_| CommerceError::InvalidData(format!("line quantity {}", line.quantity)))?;
    let merchandise = line.merchandise;

    Ok(CartLine {
        id: CartLineId::new(line.id),
        quantity,
        merchandise: CartMerchandise {
            id: VariantId::new(merchandise.id),
            title: merchandise.title,
            price: convert_money(merchandise.price)?,
            image: merchandise
                .image
                .or(merchandise.product.featured_image)
                .map(convert_image),
            product: MerchandiseProduct {
                title: merchandise.product.title,
                handle: merchandise.product.handle,
            },
        },
    })
}

pub fn convert_cart(cart: queries::Cart) -> Result<Cart, CommerceError> {
    let lines = cart
        .lines
        .nodes
        .into_iter()
        .map(convert_cart_line)
        .collect::<Result<Vec<_>, _>>()?;

    let subtotal = convert_money(cart.cost.subtotal_amount)?;
    let total = convert_money(cart.cost.total_amount)?;

    Ok(Cart {
        id: CartId::new(cart.id),
        checkout_url: cart.checkout_url,
        cost: CartCost {
            subtotal: subtotal.amount,
            total: total.amount,
            currency_code: (!lines.is_empty()).then_some(subtotal.currency_code),
        },
        lines,
    })
}

/// Fold mutation user errors into one error.
pub fn convert_user_errors(errors: Vec<queries::UserError>) -> CommerceError {
    CommerceError::UserError(
        errors
            .into_iter()
            .map(|e| match e.field {
                Some(field) if !field.is_empty() => format!("{} ({})", e.message, field.join(".")),
                _ => e.message,
            })
            .collect::<Vec<_>>()
            .join("; "),
    )
}
