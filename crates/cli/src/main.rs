//! Shopfront CLI - Drive a storefront session from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! shop products --collection clothing --sort price --reverse
//! shop product classic-white-t-shirt
//!
//! # Work with the cart (persisted in SHOPFRONT_STORAGE_PATH)
//! shop cart add gid://shopify/ProductVariant/101 -q 2
//! shop cart show
//!
//! # Save products for later
//! shop wishlist add canvas-backpack
//!
//! # Keep one session open and type commands
//! shop shell
//! ```
//!
//! # Commands
//!
//! - `products`, `product`, `collections`, `collection` - Catalog queries
//! - `cart` - Show, add, remove, change quantity, toggle, checkout
//! - `wishlist` - List, add, remove
//! - `shell` - Interactive session

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use sentry::integrations::tracing as sentry_tracing;
use shopfront_storefront::commerce::ProductSortKey;
use shopfront_storefront::config::ShopfrontConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
#[allow(clippy::print_stdout)]
mod output;

#[derive(Parser)]
#[command(name = "shop")]
#[command(author, version, about = "Shopfront command-line storefront")]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

/// A line typed into the interactive shell.
#[derive(Parser)]
#[command(name = "shop", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// List products
    Products {
        /// Only products in this collection
        #[arg(short, long)]
        collection: Option<String>,

        /// Case-insensitive search over title, description and tags
        #[arg(short, long)]
        search: Option<String>,

        /// Sort order
        #[arg(long, value_enum)]
        sort: Option<SortArg>,

        /// Reverse the sort order
        #[arg(short, long)]
        reverse: bool,
    },
    /// Show a product and related products
    Product {
        /// Product handle
        handle: String,
    },
    /// List collections
    Collections,
    /// Show a collection and its products
    Collection {
        /// Collection handle
        handle: String,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Start an interactive session
    Shell,
}

#[derive(Subcommand, Debug, Clone)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a variant to the cart
    Add {
        /// Variant ID
        variant: String,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        quantity: u32,
    },
    /// Remove a line from the cart
    Remove {
        /// Cart line ID
        line: String,
    },
    /// Set a line's quantity (values below 1 become 1)
    Quantity {
        /// Cart line ID
        line: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Open or close the cart panel
    Toggle,
    /// Proceed to checkout
    Checkout,
}

#[derive(Subcommand, Debug, Clone)]
enum WishlistAction {
    /// List saved products
    List,
    /// Save a product
    Add {
        /// Product handle or ID
        product: String,
    },
    /// Forget a product
    Remove {
        /// Product handle or ID
        product: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum SortArg {
    Title,
    Price,
    BestSelling,
}

impl From<SortArg> for ProductSortKey {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Title => Self::Title,
            SortArg::Price => Self::Price,
            SortArg::BestSelling => Self::BestSelling,
        }
    }
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ShopfrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Warnings and errors become Sentry events, info and debug become breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration from environment (needed for Sentry init)
    let config = ShopfrontConfig::from_env();

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopfront_storefront=info,shopfront_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => commands::run(&config, cli.command, cli.json).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            e.capture();
            output::failure(&e.user_message());
            ExitCode::from(e.exit_code())
        }
    }
}
