//! Command dispatch.
//!
//! Catalog commands go straight to the commerce backend. Cart and wishlist
//! commands go through a [`ShopSession`], started on first use so catalog
//! queries never create a cart.

use std::process::ExitCode;

use clap::Parser;
use shopfront_core::{CartLineId, ProductId, VariantId};
use shopfront_storefront::commerce::{
    CommerceClient, MockCommerce, ProductFilter, ShopifyClient,
};
use shopfront_storefront::config::{Backend, ShopfrontConfig};
use shopfront_storefront::error::{AppError, Result};
use shopfront_storefront::session::{Outcome, ShopSession};
use shopfront_storefront::storage::{FileStorage, KeyValueStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::output::{self, Printer};
use crate::{CartAction, Command, ShellLine, WishlistAction};

/// Run one command against the configured backend.
///
/// # Errors
///
/// Returns `AppError` if storage cannot be opened, the backend cannot be
/// built, or a catalog lookup fails.
pub async fn run(config: &ShopfrontConfig, command: Command, json: bool) -> Result<ExitCode> {
    let storage = FileStorage::open(config.storage_path.clone())?;
    info!(
        backend = %config.backend,
        storage = %storage.path().display(),
        "Starting shop"
    );

    match config.backend {
        Backend::Mock => {
            let client =
                MockCommerce::seeded(storage.clone())?.with_latency(config.mock_latency);
            Shop::new(client, storage, config, json).run(command).await
        }
        Backend::Shopify => {
            let shopify = config.shopify.as_ref().ok_or_else(|| {
                AppError::Internal("shopify backend selected without credentials".to_string())
            })?;
            let client = ShopifyClient::new(shopify);
            Shop::new(client, storage, config, json).run(command).await
        }
    }
}

/// One CLI invocation (or one shell) over a backend.
struct Shop<C, S> {
    client: C,
    storage: S,
    session: Option<ShopSession<C, S>>,
    related_limit: usize,
    printer: Printer,
}

impl<C, S> Shop<C, S>
where
    C: CommerceClient + Clone,
    S: KeyValueStore,
{
    fn new(client: C, storage: S, config: &ShopfrontConfig, json: bool) -> Self {
        Self {
            client,
            storage,
            session: None,
            related_limit: config.related_limit,
            printer: Printer::new(json),
        }
    }

    async fn run(mut self, command: Command) -> Result<ExitCode> {
        match command {
            Command::Shell => self.shell().await,
            command => self.execute(command).await,
        }
    }

    /// The session, started on first use.
    async fn session(&mut self) -> Result<&mut ShopSession<C, S>> {
        if self.session.is_none() {
            let (session, outcome) =
                ShopSession::start(self.client.clone(), self.storage.clone()).await;
            if outcome.is_error() {
                self.printer.outcome(&outcome)?;
            }
            self.session = Some(session);
        }

        self.session
            .as_mut()
            .ok_or_else(|| AppError::Internal("session not started".to_string()))
    }

    async fn execute(&mut self, command: Command) -> Result<ExitCode> {
        match command {
            Command::Products {
                collection,
                search,
                sort,
                reverse,
            } => {
                let mut filter = ProductFilter {
                    collection_handle: collection,
                    search_text: search,
                    ..ProductFilter::default()
                };
                if let Some(sort) = sort {
                    filter = filter.sorted_by(sort.into(), reverse);
                }
                let products = self.client.list_products(&filter).await?;
                self.printer.products(&products)?;
            }
            Command::Product { handle } => {
                let product = self
                    .client
                    .get_product_by_handle(&handle)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("product {handle}")))?;
                let related = self
                    .client
                    .get_related_products(&product.id, self.related_limit)
                    .await?;
                self.printer.product(&product, &related)?;
            }
            Command::Collections => {
                let collections = self.client.list_collections().await?;
                self.printer.collections(&collections)?;
            }
            Command::Collection { handle } => {
                let collection = self
                    .client
                    .get_collection_by_handle(&handle)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("collection {handle}")))?;
                let products = self.client.list_products_by_collection(&handle).await?;
                self.printer.collection(&collection, &products)?;
            }
            Command::Cart { action } => return self.cart(action).await,
            Command::Wishlist { action } => return self.wishlist(action).await,
            Command::Shell => {
                return Err(AppError::BadRequest("already in a shell".to_string()));
            }
        }
        Ok(ExitCode::SUCCESS)
    }

    async fn cart(&mut self, action: CartAction) -> Result<ExitCode> {
        let printer = self.printer;
        let session = self.session().await?;

        let outcome = match action {
            CartAction::Show => {
                printer.cart(&session.snapshot())?;
                return Ok(ExitCode::SUCCESS);
            }
            CartAction::Toggle => {
                printer.panel(session.toggle_cart())?;
                return Ok(ExitCode::SUCCESS);
            }
            CartAction::Add { variant, quantity } => {
                session
                    .add_product_to_cart(&VariantId::new(variant), quantity)
                    .await
            }
            CartAction::Remove { line } => {
                session
                    .remove_product_from_cart(&CartLineId::new(line))
                    .await
            }
            CartAction::Quantity { line, quantity } => {
                session
                    .update_product_quantity(&CartLineId::new(line), quantity)
                    .await
            }
            CartAction::Checkout => session.proceed_to_checkout(),
        };

        printer.outcome(&outcome)?;
        if !outcome.is_error() {
            printer.cart(&session.snapshot())?;
        }
        Ok(exit_code(&outcome))
    }

    async fn wishlist(&mut self, action: WishlistAction) -> Result<ExitCode> {
        let outcome = match action {
            WishlistAction::List => {
                let printer = self.printer;
                let session = self.session().await?;
                printer.wishlist(session.wishlist())?;
                return Ok(ExitCode::SUCCESS);
            }
            WishlistAction::Add { product } => {
                let product_id = self.resolve_product(&product).await?;
                self.session().await?.add_to_wishlist(&product_id).await
            }
            WishlistAction::Remove { product } => {
                let product_id = self.resolve_product(&product).await?;
                self.session().await?.remove_from_wishlist(&product_id)
            }
        };

        self.printer.outcome(&outcome)?;
        Ok(exit_code(&outcome))
    }

    /// Accept either a product ID or a handle.
    async fn resolve_product(&self, product: &str) -> Result<ProductId> {
        if product.starts_with("gid://") {
            return Ok(ProductId::new(product));
        }

        self.client
            .get_product_by_handle(product)
            .await?
            .map(|p| p.id)
            .ok_or_else(|| AppError::NotFound(format!("product {product}")))
    }

    /// Read commands from stdin until EOF or `exit`.
    async fn shell(&mut self) -> Result<ExitCode> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        output::prompt();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| AppError::Internal(format!("reading stdin: {e}")))?
        {
            let words: Vec<&str> = line.split_whitespace().collect();
            match words.as_slice() {
                [] => {}
                ["exit" | "quit"] => break,
                _ => match ShellLine::try_parse_from(words) {
                    Ok(parsed) => {
                        if let Err(e) = self.execute(parsed.command).await {
                            e.capture();
                            output::failure(&e.user_message());
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "Unparsable shell line");
                        output::usage(&e.render().to_string());
                    }
                },
            }
            output::prompt();
        }

        Ok(ExitCode::SUCCESS)
    }
}

fn exit_code(outcome: &Outcome) -> ExitCode {
    if outcome.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
