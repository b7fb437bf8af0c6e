//! Shopfront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `SHOPFRONT_BACKEND` - `mock` or `shopify` (default: mock)
//! - `SHOPFRONT_STORAGE_PATH` - Local storage file (default: .shopfront/storage.json)
//! - `SHOPFRONT_MOCK_LATENCY_MS` - Artificial latency of the mock backend (default: 0)
//! - `SHOPFRONT_RELATED_LIMIT` - Related products shown per product (default: 4)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//!
//! ## Required with the `shopify` backend
//! - `SHOPIFY_STORE` - Shopify store domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_STOREFRONT_TOKEN` - Storefront API private access token
//! - `SHOPIFY_API_VERSION` - API version (default: 2026-01)

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_STORAGE_PATH: &str = ".shopfront/storage.json";
const DEFAULT_RELATED_LIMIT: &str = "4";
const DEFAULT_API_VERSION: &str = "2026-01";
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Which commerce backend serves the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Bundled catalog, cart kept in local storage.
    #[default]
    Mock,
    /// Shopify Storefront API.
    Shopify,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "shopify" => Ok(Self::Shopify),
            other => Err(format!("expected 'mock' or 'shopify', got '{other}'")),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mock => f.write_str("mock"),
            Self::Shopify => f.write_str("shopify"),
        }
    }
}

/// Shopfront configuration.
#[derive(Debug, Clone)]
pub struct ShopfrontConfig {
    /// Commerce backend
    pub backend: Backend,
    /// Local storage file
    pub storage_path: PathBuf,
    /// Artificial latency applied by the mock backend
    pub mock_latency: Duration,
    /// Related products shown per product
    pub related_limit: usize,
    /// Shopify Storefront API configuration (shopify backend only)
    pub shopify: Option<ShopifyStorefrontConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl Default for ShopfrontConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Mock,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            mock_latency: Duration::ZERO,
            related_limit: 4,
            shopify: None,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

/// Shopify Storefront API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct ShopifyStorefrontConfig {
    /// Shopify store domain (e.g., your-store.myshopify.com)
    pub store: String,
    /// Shopify API version (e.g., 2026-01)
    pub api_version: String,
    /// Storefront API private access token (server-side only)
    pub storefront_token: SecretString,
}

impl fmt::Debug for ShopifyStorefrontConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShopifyStorefrontConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("storefront_token", &"[REDACTED]")
            .finish()
    }
}

impl ShopfrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is invalid, or if the shopify
    /// backend is selected without its credentials.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let backend = env.parse_or_default("SHOPFRONT_BACKEND", "mock")?;
        let storage_path = PathBuf::from(env.or_default("SHOPFRONT_STORAGE_PATH", DEFAULT_STORAGE_PATH));
        let mock_latency = Duration::from_millis(env.parse_or_default("SHOPFRONT_MOCK_LATENCY_MS", "0")?);
        let related_limit = env.parse_or_default("SHOPFRONT_RELATED_LIMIT", DEFAULT_RELATED_LIMIT)?;

        let shopify = match backend {
            Backend::Shopify => Some(ShopifyStorefrontConfig::from_env(&env)?),
            Backend::Mock => None,
        };

        Ok(Self {
            backend,
            storage_path,
            mock_latency,
            related_limit,
            shopify,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }
}

impl ShopifyStorefrontConfig {
    fn from_env<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> Result<Self, ConfigError> {
        Ok(Self {
            store: env.required("SHOPIFY_STORE")?,
            api_version: env.or_default("SHOPIFY_API_VERSION", DEFAULT_API_VERSION),
            storefront_token: env.validated_secret("SHOPIFY_STOREFRONT_TOKEN")?,
        })
    }

    /// GraphQL endpoint of the Storefront API.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "https://{}/api/{}/graphql.json",
            self.store, self.api_version
        )
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable source; empty values count as unset.
struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get an optional variable.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to a default.
    fn parse_or_default<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Load and validate a secret.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.required(key)?;
        validate_secret_strength(&value, key)?;
        Ok(SecretString::from(value))
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the token from the Shopify admin."
            ),
        ));
    }

    Ok(())
}
