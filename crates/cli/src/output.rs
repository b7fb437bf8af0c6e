//! Terminal rendering.
//!
//! Every printer method has a human form and a `--json` form; the JSON form
//! is the serialized domain value and is stable enough to script against.

use std::io::Write;

use serde::Serialize;
use serde_json::json;
use shopfront_storefront::commerce::{Collection, Product};
use shopfront_storefront::error::{AppError, Result};
use shopfront_storefront::session::{CartPanel, Outcome, SessionSnapshot, Tone};

#[derive(Debug, Clone, Copy)]
pub struct Printer {
    json: bool,
}

impl Printer {
    pub const fn new(json: bool) -> Self {
        Self { json }
    }

    fn emit<T: Serialize + ?Sized>(&self, value: &T, human: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            let text = serde_json::to_string_pretty(value)
                .map_err(|e| AppError::Internal(format!("serializing output: {e}")))?;
            println!("{text}");
        } else {
            human(value);
        }
        Ok(())
    }

    pub fn products(&self, products: &[Product]) -> Result<()> {
        self.emit(products, |products| {
            if products.is_empty() {
                println!("No products found.");
            }
            for product in products {
                product_row(product);
            }
        })
    }

    pub fn product(&self, product: &Product, related: &[Product]) -> Result<()> {
        let value = json!({ "product": product, "related": related });
        self.emit(&value, |_| {
            println!("{}", product.title);
            println!("  handle: {}", product.handle);
            println!("  id:     {}", product.id);
            println!("  price:  {}", price_label(product));
            if let Some(rating) = product.average_rating() {
                println!("  rating: {rating:.1} ({} reviews)", product.reviews.len());
            }
            if !product.tags.is_empty() {
                println!("  tags:   {}", product.tags.join(", "));
            }
            if !product.description.is_empty() {
                println!();
                println!("  {}", product.description);
            }

            println!();
            println!("Variants:");
            for variant in &product.variants {
                let stock = if variant.available_for_sale {
                    format!("{} in stock", variant.quantity_available)
                } else {
                    "sold out".to_string()
                };
                println!(
                    "  {:<16} {:>12}  {stock:<12} {}",
                    variant.title,
                    variant.price.display(),
                    variant.id
                );
            }

            if !related.is_empty() {
                println!();
                println!("You may also like:");
                for product in related {
                    product_row(product);
                }
            }
        })
    }

    pub fn collections(&self, collections: &[Collection]) -> Result<()> {
        self.emit(collections, |collections| {
            for collection in collections {
                println!("{:<24} {}", collection.handle, collection.title);
            }
        })
    }

    pub fn collection(&self, collection: &Collection, products: &[Product]) -> Result<()> {
        let value = json!({ "collection": collection, "products": products });
        self.emit(&value, |_| {
            println!("{}", collection.title);
            if !collection.description.is_empty() {
                println!("  {}", collection.description);
            }
            println!();
            for product in products {
                product_row(product);
            }
        })
    }

    pub fn cart(&self, snapshot: &SessionSnapshot) -> Result<()> {
        self.emit(snapshot, |snapshot| {
            let Some(cart) = &snapshot.cart else {
                println!("No cart.");
                return;
            };

            let panel = match snapshot.cart_panel {
                CartPanel::Open => "open",
                CartPanel::Closed => "closed",
            };
            println!("Cart {} ({} items, panel {panel})", cart.id, snapshot.cart_count);

            if cart.lines.is_empty() {
                println!("  Your cart is empty.");
            }
            for line in &cart.lines {
                println!(
                    "  {:<14} {:<28} {:<10} x{:<3} {:>12}",
                    line.id,
                    line.merchandise.product.title,
                    line.merchandise.title,
                    line.quantity,
                    line.line_total().display()
                );
            }

            let symbol = cart.cost.currency_code.map_or("", |c| c.symbol());
            println!("  Subtotal: {symbol}{}", cart.cost.subtotal_display());
            println!("  Total:    {symbol}{}", cart.cost.total_display());
        })
    }

    pub fn panel(&self, panel: CartPanel) -> Result<()> {
        self.emit(&panel, |panel| match panel {
            CartPanel::Open => println!("Cart panel opened."),
            CartPanel::Closed => println!("Cart panel closed."),
        })
    }

    pub fn wishlist(&self, products: &[Product]) -> Result<()> {
        self.emit(products, |products| {
            if products.is_empty() {
                println!("Your wishlist is empty.");
            }
            for product in products {
                product_row(product);
            }
        })
    }

    pub fn outcome(&self, outcome: &Outcome) -> Result<()> {
        self.emit(outcome, |outcome| {
            let Some(notice) = outcome.as_notice() else {
                return;
            };
            let marker = match notice.tone {
                Tone::Success => "✓",
                Tone::Error => "✗",
                Tone::Info => "i",
            };
            println!("{marker} {}: {}", notice.title, notice.description);
            if let Some(link) = &notice.link {
                println!("  {link}");
            }
        })
    }
}

fn price_label(product: &Product) -> String {
    let min = &product.price_range.min_variant_price;
    let max = &product.price_range.max_variant_price;
    if min.amount == max.amount {
        min.display()
    } else {
        format!("{} - {}", min.display(), max.display())
    }
}

fn product_row(product: &Product) {
    println!(
        "  {:<28} {:<36} {:>20}",
        product.handle,
        product.title,
        price_label(product)
    );
}

/// Shell prompt.
pub fn prompt() {
    print!("shop> ");
    let _ = std::io::stdout().flush();
}

/// Report a failed command.
#[allow(clippy::print_stderr)]
pub fn failure(message: &str) {
    eprintln!("error: {message}");
}

/// Report an unparsable shell line.
#[allow(clippy::print_stderr)]
pub fn usage(message: &str) {
    eprintln!("{message}");
}
