//! CLI command implementations.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod dashboard;
pub mod seed;

use serde::de::DeserializeOwned;

use modaverse_core::{CurrencyCode, Price};
use modaverse_storefront::AppState;
use modaverse_storefront::StorefrontError;
use modaverse_storefront::config::StorefrontConfig;
use modaverse_storefront::query::{CollectionQuerySpec, MemoryStore};

/// Build session state over a document store seeded with the catalog,
/// then put back the catalog edits and orders of earlier sessions.
///
/// # Errors
///
/// Returns an error if the seed file cannot be read, parsed or loaded, or
/// an archive is unreadable.
pub async fn open_state(config: StorefrontConfig) -> Result<AppState, Box<dyn std::error::Error>> {
    let catalog = seed::load(config.catalog_seed.as_deref()).await?;
    let store = MemoryStore::new();
    seed::apply(&store, &catalog)?;
    let state = AppState::new(config, store);
    state.restore_session()?;
    Ok(state)
}

/// Observe `spec` until its first snapshot and return the documents.
pub async fn fetch<T>(state: &AppState, spec: CollectionQuerySpec) -> Result<Vec<T>, StorefrontError>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    let query = state.observe::<T>(spec);
    let result = query.settled().await;
    match result.error {
        Some(error) => Err(error.into()),
        None => Ok(result.data.unwrap_or_default()),
    }
}

/// Format an amount in the configured currency.
pub fn money(state: &AppState, amount: rust_decimal::Decimal) -> Price {
    let currency: CurrencyCode = state.config().cart.currency;
    Price::new(amount, currency)
}
