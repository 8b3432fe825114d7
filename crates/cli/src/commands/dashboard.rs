//! Admin overview.

use tracing::info;

use modaverse_core::OrderStatus;
use modaverse_storefront::catalog::{Product, all_products};
use modaverse_storefront::orders::{DashboardSummary, Order, orders_by_status, recent_orders};
use modaverse_storefront::{AppState, StorefrontError};

use super::{fetch, money};

/// Print revenue, sales, product count and the latest orders, optionally
/// only those in `status`.
///
/// # Errors
///
/// Returns an error if the store rejects a query.
pub async fn show(
    state: &AppState,
    limit: usize,
    status: Option<OrderStatus>,
) -> Result<(), StorefrontError> {
    let orders = fetch::<Order>(state, recent_orders(None)).await?;
    let products = fetch::<Product>(state, all_products()).await?;
    let summary = DashboardSummary::compute(&orders, &products);

    info!(
        "Revenue: {} from {} sales",
        money(state, summary.total_revenue),
        summary.total_sales
    );
    info!("Products: {}", summary.total_products);
    info!(
        "Pending orders: {}  Open orders: {}",
        summary.pending_orders, summary.open_orders
    );

    let listed = match status {
        Some(status) => {
            info!("Recent {status} orders:");
            fetch::<Order>(state, orders_by_status(status)).await?
        }
        None => {
            info!("Recent orders:");
            orders
        }
    };
    for order in listed.iter().take(limit) {
        info!(
            "  {:<10} {}  {:<10} {:>10}",
            order.id.to_string(),
            order.created_at.format("%Y-%m-%d"),
            order.status.to_string(),
            money(state, order.total).to_string()
        );
    }
    Ok(())
}
