//! Admin overview figures.

use rust_decimal::Decimal;

use modaverse_core::OrderStatus;

use super::Order;
use crate::catalog::Product;

/// Headline numbers for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardSummary {
    /// Sum of every order total.
    pub total_revenue: Decimal,
    /// Number of orders.
    pub total_sales: usize,
    /// Number of catalog products.
    pub total_products: usize,
    /// Orders still waiting to ship.
    pub pending_orders: usize,
    /// Orders that can still change status (not delivered or cancelled).
    pub open_orders: usize,
}

impl DashboardSummary {
    #[must_use]
    pub fn compute(orders: &[Order], products: &[Product]) -> Self {
        Self {
            total_revenue: orders.iter().map(|order| order.total).sum(),
            total_sales: orders.len(),
            total_products: products.len(),
            pending_orders: orders
                .iter()
                .filter(|order| order.status == OrderStatus::Pending)
                .count(),
            open_orders: orders.iter().filter(|order| !order.status.is_final()).count(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use modaverse_core::OrderId;

    use super::*;

    fn order(id: &str, total: Decimal, status: OrderStatus) -> Order {
        Order {
            id: OrderId::new(id),
            user_id: None,
            created_at: Utc.with_ymd_and_hms(2023, 6, 15, 0, 0, 0).unwrap(),
            status,
            total,
            items: Vec::new(),
            payment_method: None,
            shipping: None,
        }
    }

    #[test]
    fn test_compute_summary() {
        let orders = vec![
            order("MV-1025", Decimal::new(11998, 2), OrderStatus::Delivered),
            order("MV-1024", Decimal::new(24999, 2), OrderStatus::Shipped),
            order("MV-1026", Decimal::new(9998, 2), OrderStatus::Pending),
        ];
        let summary = DashboardSummary::compute(&orders, &[]);

        assert_eq!(summary.total_revenue, Decimal::new(46995, 2));
        assert_eq!(summary.total_sales, 3);
        assert_eq!(summary.total_products, 0);
        assert_eq!(summary.pending_orders, 1);
        assert_eq!(summary.open_orders, 2);
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(DashboardSummary::compute(&[], &[]), DashboardSummary::default());
    }
}
