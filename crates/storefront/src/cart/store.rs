//! The shopping cart.

use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use modaverse_core::{CurrencyCode, Price, ProductId};

use super::line::{CartLine, ProductSnapshot};
use super::storage::CartStorage;
use crate::error::add_breadcrumb;

/// Per-line quantity cap used when none is configured.
pub const DEFAULT_MAX_LINE_QUANTITY: u32 = 99;

/// Tunables for a [`CartStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSettings {
    /// Largest quantity a single line can hold. Always at least 1.
    pub max_line_quantity: u32,
    /// Currency the cart totals are shown in.
    pub currency: CurrencyCode,
}

impl Default for CartSettings {
    fn default() -> Self {
        Self {
            max_line_quantity: DEFAULT_MAX_LINE_QUANTITY,
            currency: CurrencyCode::default(),
        }
    }
}

/// The shopper's cart: at most one line per product, each with a
/// quantity of at least 1.
///
/// Every change is written through the [`CartStorage`] port. Storage
/// failures are logged and otherwise ignored; the in-memory cart stays
/// authoritative for the session.
pub struct CartStore {
    storage: Box<dyn CartStorage>,
    settings: CartSettings,
    lines: Vec<CartLine>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("settings", &self.settings)
            .field("lines", &self.lines)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Open the cart saved in `storage`.
    ///
    /// A missing or unreadable cart opens empty. Saved lines are
    /// normalized: repeated products merge, empty lines are dropped and
    /// quantities are capped.
    #[instrument(skip(storage))]
    pub fn open(storage: Box<dyn CartStorage>, settings: CartSettings) -> Self {
        let settings = CartSettings {
            max_line_quantity: settings.max_line_quantity.max(1),
            ..settings
        };
        let lines = match storage.load() {
            Ok(Some(saved)) => normalize(saved, settings.max_line_quantity),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to load saved cart, starting empty");
                Vec::new()
            }
        };
        debug!(lines = lines.len(), "cart opened");
        Self {
            storage,
            settings,
            lines,
        }
    }

    /// Add `quantity` of `product`, merging with an existing line.
    ///
    /// Quantities are capped at the configured maximum. A quantity of zero
    /// or less does nothing.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add_to_cart(&mut self, product: ProductSnapshot, quantity: i64) {
        if quantity <= 0 {
            debug!(quantity, "ignoring non-positive add");
            return;
        }
        let max = self.settings.max_line_quantity;
        let added = clamp_quantity(quantity, max);

        let changed = if let Some(line) = self.line_mut(&product.id) {
            let next = line.quantity.saturating_add(added).min(max);
            let changed = next != line.quantity;
            line.quantity = next;
            changed
        } else {
            self.lines.push(CartLine {
                product,
                quantity: added,
            });
            true
        };

        if changed {
            self.record("add_to_cart");
        }
    }

    /// Add a single unit of `product`.
    pub fn add_one(&mut self, product: ProductSnapshot) {
        self.add_to_cart(product, 1);
    }

    /// Remove the line for `product_id`, if any.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub fn remove_from_cart(&mut self, product_id: &ProductId) {
        let before = self.lines.len();
        self.lines.retain(|line| line.product_id() != product_id);
        if self.lines.len() != before {
            self.record("remove_from_cart");
        }
    }

    /// Set the quantity of an existing line.
    ///
    /// Zero or less removes the line. Products not in the cart are left
    /// alone.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: i64) {
        if quantity <= 0 {
            self.remove_from_cart(product_id);
            return;
        }
        let next = clamp_quantity(quantity, self.settings.max_line_quantity);
        let Some(line) = self.line_mut(product_id) else {
            debug!("product not in cart");
            return;
        };
        if line.quantity != next {
            line.quantity = next;
            self.record("update_quantity");
        }
    }

    /// Remove every line.
    #[instrument(skip(self))]
    pub fn clear_cart(&mut self) {
        if self.lines.is_empty() {
            return;
        }
        self.lines.clear();
        self.record("clear_cart");
    }

    /// Lines in the order products were first added.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id() == product_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sum of line subtotals.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// [`Self::total_price`] in the cart currency.
    #[must_use]
    pub fn total(&self) -> Price {
        Price::new(self.total_price(), self.settings.currency)
    }

    #[must_use]
    pub const fn settings(&self) -> &CartSettings {
        &self.settings
    }

    fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product_id() == product_id)
    }

    fn record(&self, action: &str) {
        let items = self.item_count().to_string();
        add_breadcrumb("cart", action, Some(&[("item_count", items.as_str())]));
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = self.storage.save(&self.lines) {
            warn!(error = %e, "failed to save cart");
        }
    }
}

fn clamp_quantity(quantity: i64, max: u32) -> u32 {
    u32::try_from(quantity.clamp(1, i64::from(max))).unwrap_or(max)
}

/// Merge repeated products, drop empty lines and cap quantities.
fn normalize(saved: Vec<CartLine>, max: u32) -> Vec<CartLine> {
    let mut lines: Vec<CartLine> = Vec::with_capacity(saved.len());
    for line in saved {
        if line.quantity == 0 {
            continue;
        }
        if let Some(existing) = lines
            .iter_mut()
            .find(|existing| existing.product_id() == line.product_id())
        {
            existing.quantity = existing.quantity.saturating_add(line.quantity).min(max);
        } else {
            lines.push(CartLine {
                quantity: line.quantity.min(max),
                ..line
            });
        }
    }
    lines
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::cart::storage::{MemoryCartStorage, StorageError};

    fn tee() -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::new("1"),
            name: "Classic White Tee".to_string(),
            price: Decimal::new(1999, 2),
            slug: "classic-white-tee".to_string(),
            image: Some("https://images.example.com/tee.jpg".to_string()),
        }
    }

    fn jeans() -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::new("2"),
            name: "Slim-Fit Denim Jeans".to_string(),
            price: Decimal::new(4950, 2),
            slug: "slim-fit-denim-jeans".to_string(),
            image: None,
        }
    }

    fn open(storage: &MemoryCartStorage) -> CartStore {
        CartStore::open(Box::new(storage.clone()), CartSettings::default())
    }

    struct FailingStorage;

    impl CartStorage for FailingStorage {
        fn load(&self) -> Result<Option<Vec<CartLine>>, StorageError> {
            Err(StorageError::Io(std::io::Error::other("disk unavailable")))
        }

        fn save(&self, _lines: &[CartLine]) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("disk unavailable")))
        }
    }

    #[test]
    fn test_repeated_adds_merge_into_one_line() {
        let mut cart = open(&MemoryCartStorage::new());
        cart.add_to_cart(tee(), 2);
        cart.add_one(tee());
        cart.add_to_cart(tee(), 4);

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 7);
    }

    #[test]
    fn test_non_positive_add_is_ignored() {
        let storage = MemoryCartStorage::new();
        let mut cart = open(&storage);
        cart.add_to_cart(tee(), 0);
        cart.add_to_cart(tee(), -3);

        assert!(cart.is_empty());
        assert!(storage.contents().is_none());
    }

    #[test]
    fn test_update_to_zero_or_negative_removes() {
        let mut cart = open(&MemoryCartStorage::new());
        cart.add_to_cart(tee(), 2);
        cart.add_to_cart(jeans(), 1);

        cart.update_quantity(&ProductId::new("1"), 0);
        assert!(cart.line(&ProductId::new("1")).is_none());

        cart.update_quantity(&ProductId::new("2"), -5);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_missing_product_is_noop() {
        let storage = MemoryCartStorage::new();
        let mut cart = open(&storage);
        cart.update_quantity(&ProductId::new("404"), 3);
        cart.remove_from_cart(&ProductId::new("404"));

        assert!(cart.is_empty());
        assert!(storage.contents().is_none());
    }

    #[test]
    fn test_quantities_are_capped() {
        let settings = CartSettings {
            max_line_quantity: 5,
            ..CartSettings::default()
        };
        let mut cart = CartStore::open(Box::new(MemoryCartStorage::new()), settings);
        cart.add_to_cart(tee(), 4);
        cart.add_to_cart(tee(), 4);
        assert_eq!(cart.lines()[0].quantity, 5);

        cart.update_quantity(&ProductId::new("1"), 1_000);
        assert_eq!(cart.lines()[0].quantity, 5);

        cart.add_to_cart(jeans(), i64::MAX);
        assert_eq!(cart.line(&ProductId::new("2")).unwrap().quantity, 5);
    }

    #[test]
    fn test_aggregates_follow_lines() {
        let mut cart = open(&MemoryCartStorage::new());
        cart.add_to_cart(tee(), 3);
        cart.add_to_cart(jeans(), 2);
        cart.update_quantity(&ProductId::new("1"), 1);

        let expected_count: u64 = cart.lines().iter().map(|l| u64::from(l.quantity)).sum();
        let expected_total: Decimal = cart
            .lines()
            .iter()
            .map(|l| l.product.price * Decimal::from(l.quantity))
            .sum();
        assert_eq!(cart.item_count(), expected_count);
        assert_eq!(cart.total_price(), expected_total);
        assert_eq!(cart.total_price(), Decimal::new(11899, 2));
        assert_eq!(cart.total().to_string(), "S/118.99");

        cart.clear_cart();
        assert_eq!(cart.item_count(), 0);
        assert_eq!(cart.total_price(), Decimal::ZERO);
    }

    #[test]
    fn test_cart_survives_reopen() {
        let storage = MemoryCartStorage::new();
        let mut cart = open(&storage);
        cart.add_to_cart(tee(), 2);
        cart.add_to_cart(jeans(), 1);
        let saved = cart.lines().to_vec();
        drop(cart);

        let reopened = open(&storage);
        assert_eq!(reopened.lines(), saved.as_slice());
    }

    #[test]
    fn test_corrupt_storage_opens_empty() {
        let storage = MemoryCartStorage::with_contents("{\"lines\": oops");
        let mut cart = open(&storage);
        assert!(cart.is_empty());

        // The next change overwrites the corrupt data.
        cart.add_one(tee());
        assert_eq!(open(&storage).item_count(), 1);
    }

    #[test]
    fn test_storage_failures_are_swallowed() {
        let mut cart = CartStore::open(Box::new(FailingStorage), CartSettings::default());
        cart.add_to_cart(tee(), 2);
        cart.update_quantity(&ProductId::new("1"), 3);

        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_rehydrate_normalizes_saved_lines() {
        let raw = serde_json::to_string(&vec![
            CartLine {
                product: tee(),
                quantity: 2,
            },
            CartLine {
                product: jeans(),
                quantity: 0,
            },
            CartLine {
                product: tee(),
                quantity: 98,
            },
        ])
        .unwrap();
        let cart = open(&MemoryCartStorage::with_contents(raw));

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, DEFAULT_MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let storage = MemoryCartStorage::new();
        let mut cart = open(&storage);

        cart.add_to_cart(tee(), 2);
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.total_price(), Decimal::new(3998, 2));

        cart.add_to_cart(tee(), 1);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.total_price(), Decimal::new(5997, 2));

        cart.update_quantity(&ProductId::new("1"), 1);
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_price(), Decimal::new(1999, 2));

        cart.remove_from_cart(&ProductId::new("1"));
        assert!(cart.is_empty());
        assert_eq!(cart.total_price(), Decimal::ZERO);
        assert_eq!(storage.contents().as_deref(), Some("[]"));
    }
}
