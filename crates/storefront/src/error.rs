//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type for the presentation layer. Faults on
//! our side (storage, backend, bad catalog) are captured to Sentry before
//! they are reported; user mistakes such as an unknown handle are not.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::commerce::CommerceError;
use crate::config::ConfigError;
use crate::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Commerce backend operation failed.
    #[error("Commerce error: {0}")]
    Commerce(#[from] CommerceError),

    /// Local storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Catalog data is invalid.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from the user.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the error is a fault on our side rather than a user mistake.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Commerce(_) | Self::Storage(_) | Self::Catalog(_) | Self::Internal(_)
        )
    }

    /// Process exit code for the error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 78,
            Self::NotFound(_) => 2,
            Self::BadRequest(_) => 64,
            Self::Commerce(CommerceError::Http(_) | CommerceError::RateLimited(_)) => 69,
            Self::Commerce(_) | Self::Storage(_) | Self::Catalog(_) | Self::Internal(_) => 1,
        }
    }

    /// Message safe to show the user.
    ///
    /// Internal details are not exposed.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Storage(_) | Self::Catalog(_) | Self::Internal(_) => {
                "Internal error".to_string()
            }
            Self::Commerce(CommerceError::RateLimited(secs)) => {
                format!("The store is busy, try again in {secs} seconds")
            }
            Self::Commerce(_) => "External service error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Report the error: server errors go to Sentry, everything is logged.
    pub fn capture(&self) {
        if self.is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Command error"
            );
        } else {
            tracing::warn!(error = %self, "Command rejected");
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Add to cart", Some(&[("variant_id", "gid://shopify/ProductVariant/101")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
