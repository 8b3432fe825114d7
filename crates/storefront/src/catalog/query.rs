//! Query specs over the `products` collection.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::query::{CollectionPath, CollectionQuerySpec, FilterOp, QueryError, SortDirection};

/// Collection holding catalog products.
pub const PRODUCTS_COLLECTION: &str = "products";

#[must_use]
pub fn products_path() -> CollectionPath {
    CollectionPath::new(PRODUCTS_COLLECTION)
}

/// Catalog listing orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    Name,
}

impl ProductSort {
    const fn key(self) -> (&'static str, SortDirection) {
        match self {
            Self::PriceAsc => ("price", SortDirection::Asc),
            Self::PriceDesc => ("price", SortDirection::Desc),
            Self::Name => ("name", SortDirection::Asc),
        }
    }
}

impl fmt::Display for ProductSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PriceAsc => write!(f, "price-asc"),
            Self::PriceDesc => write!(f, "price-desc"),
            Self::Name => write!(f, "name"),
        }
    }
}

impl FromStr for ProductSort {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price-asc" | "price" => Ok(Self::PriceAsc),
            "price-desc" => Ok(Self::PriceDesc),
            "name" => Ok(Self::Name),
            _ => Err(QueryError::InvalidQuery(format!("unknown product sort: {s}"))),
        }
    }
}

/// A catalog listing: optional category, price ceiling, sort and limit.
///
/// A price ceiling is a range filter, so it combines with price sorts
/// only; the store rejects it together with [`ProductSort::Name`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub max_price: Option<Decimal>,
    pub sort: Option<ProductSort>,
    pub limit: Option<usize>,
}

impl ProductQuery {
    #[must_use]
    pub fn spec(&self) -> CollectionQuerySpec {
        let mut spec = CollectionQuerySpec::collection(products_path());
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            spec = spec.filter("category", FilterOp::Eq, category);
        }
        if let Some(max_price) = self.max_price.and_then(|price| price.to_f64()) {
            spec = spec.filter("price", FilterOp::Lte, max_price);
        }
        if let Some(sort) = self.sort {
            let (field, direction) = sort.key();
            spec = spec.order_by(field, direction);
        }
        if let Some(limit) = self.limit {
            spec = spec.limit(limit);
        }
        spec
    }
}

/// Every product, ordered by id.
#[must_use]
pub fn all_products() -> CollectionQuerySpec {
    ProductQuery::default().spec()
}

/// The product with `slug`. Disabled while no slug is known.
#[must_use]
pub fn product_by_slug(slug: Option<&str>) -> CollectionQuerySpec {
    match slug.filter(|slug| !slug.is_empty()) {
        Some(slug) => CollectionQuerySpec::collection(products_path())
            .filter("slug", FilterOp::Eq, slug)
            .limit(1),
        None => CollectionQuerySpec::disabled(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::query::{Filter, OrderBy, QueryConstraint};

    #[test]
    fn test_default_query_lists_everything() {
        let spec = all_products();
        assert_eq!(spec.source, Some(products_path()));
        assert!(spec.constraints().is_empty());
    }

    #[test]
    fn test_query_constraint_order() {
        let query = ProductQuery {
            category: Some("Tops".to_string()),
            max_price: Some(Decimal::new(50, 0)),
            sort: Some(ProductSort::PriceDesc),
            limit: Some(4),
        };
        assert_eq!(
            query.spec().constraints(),
            vec![
                QueryConstraint::Where(Filter {
                    field: "category".to_string(),
                    op: FilterOp::Eq,
                    value: json!("Tops"),
                }),
                QueryConstraint::Where(Filter {
                    field: "price".to_string(),
                    op: FilterOp::Lte,
                    value: json!(50.0),
                }),
                QueryConstraint::OrderBy(OrderBy {
                    field: "price".to_string(),
                    direction: SortDirection::Desc,
                }),
                QueryConstraint::Limit(4),
            ]
        );
    }

    #[test]
    fn test_blank_category_is_ignored() {
        let query = ProductQuery {
            category: Some(String::new()),
            ..ProductQuery::default()
        };
        assert!(query.spec().filters.is_empty());
    }

    #[test]
    fn test_product_by_slug() {
        assert!(product_by_slug(None).is_disabled());
        assert!(product_by_slug(Some("")).is_disabled());

        let spec = product_by_slug(Some("classic-white-tee"));
        assert_eq!(spec.limit, Some(1));
        assert_eq!(spec.filters.len(), 1);
    }

    #[test]
    fn test_product_sort_parse() {
        assert_eq!("price-desc".parse::<ProductSort>(), Ok(ProductSort::PriceDesc));
        assert_eq!("price".parse::<ProductSort>(), Ok(ProductSort::PriceAsc));
        assert_eq!(ProductSort::Name.to_string(), "name");
        assert!(matches!(
            "popular".parse::<ProductSort>(),
            Err(QueryError::InvalidQuery(_))
        ));
    }
}
