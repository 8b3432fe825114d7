//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `MODAVERSE_CART_DIR` - Directory holding saved carts (default: .modaverse)
//! - `MODAVERSE_CART_KEY` - Storage key of the cart slot (default: moda-verse-cart)
//! - `MODAVERSE_MAX_LINE_QUANTITY` - Largest quantity per cart line (default: 99)
//! - `MODAVERSE_CURRENCY` - ISO 4217 code totals are shown in (default: PEN)
//! - `MODAVERSE_CATALOG_SEED` - YAML file to seed the catalog from
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;

use thiserror::Error;

use modaverse_core::CurrencyCode;

use crate::cart::{CartSettings, DEFAULT_MAX_LINE_QUANTITY, FileCartStorage, StorageError};

const DEFAULT_CART_DIR: &str = ".modaverse";
const DEFAULT_CART_KEY: &str = "moda-verse-cart";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone, Default)]
pub struct StorefrontConfig {
    /// Cart persistence settings
    pub cart: CartConfig,
    /// YAML catalog seed overriding the built-in one
    pub catalog_seed: Option<PathBuf>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name (e.g. production, staging)
    pub sentry_environment: Option<String>,
}

/// Cart persistence configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartConfig {
    /// Directory holding one JSON file per cart key
    pub dir: PathBuf,
    /// Storage key of the cart slot
    pub key: String,
    /// Largest quantity a single line can hold
    pub max_line_quantity: u32,
    /// Currency totals are shown in
    pub currency: CurrencyCode,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_CART_DIR),
            key: DEFAULT_CART_KEY.to_string(),
            max_line_quantity: DEFAULT_MAX_LINE_QUANTITY,
            currency: CurrencyCode::default(),
        }
    }
}

impl CartConfig {
    #[must_use]
    pub const fn settings(&self) -> CartSettings {
        CartSettings {
            max_line_quantity: self.max_line_quantity,
            currency: self.currency,
        }
    }

    /// File storage for the configured cart slot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidKey` if the key is not a usable file name.
    pub fn storage(&self) -> Result<FileCartStorage, StorageError> {
        FileCartStorage::new(&self.dir, &self.key)
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let max_line_quantity = get_env_or_default(&lookup, "MODAVERSE_MAX_LINE_QUANTITY", "99")
            .parse::<u32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MODAVERSE_MAX_LINE_QUANTITY".to_string(), e.to_string())
            })?;
        if max_line_quantity == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "MODAVERSE_MAX_LINE_QUANTITY".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let currency = get_env_or_default(&lookup, "MODAVERSE_CURRENCY", "PEN")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("MODAVERSE_CURRENCY".to_string(), e.to_string()))?;

        let cart = CartConfig {
            dir: PathBuf::from(get_env_or_default(&lookup, "MODAVERSE_CART_DIR", DEFAULT_CART_DIR)),
            key: get_env_or_default(&lookup, "MODAVERSE_CART_KEY", DEFAULT_CART_KEY),
            max_line_quantity,
            currency,
        };

        Ok(Self {
            cart,
            catalog_seed: get_optional_env(&lookup, "MODAVERSE_CATALOG_SEED").map(PathBuf::from),
            sentry_dsn: get_optional_env(&lookup, "SENTRY_DSN"),
            sentry_environment: get_optional_env(&lookup, "SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable. Blank values count as unset.
fn get_optional_env(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get_optional_env(lookup, key).unwrap_or_else(|| default.to_string())
}
