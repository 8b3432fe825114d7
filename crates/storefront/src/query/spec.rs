//! Collection query specifications.
//!
//! A [`CollectionQuerySpec`] names a remote collection and the filters,
//! sort keys and limit to apply to it. It is plain data: equality between
//! two specs decides whether a [`LiveQuery`](super::LiveQuery) has to
//! resubscribe.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use super::QueryError;

/// Slash-separated path to a collection or sub-collection.
///
/// Valid paths have an odd number of segments: `products`,
/// `users/{uid}/orders`. Validation happens when a store subscribes, so a
/// malformed path surfaces as a query construction error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    segments: Vec<String>,
}

impl CollectionPath {
    /// A top-level collection.
    #[must_use]
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            segments: vec![collection.into()],
        }
    }

    /// Parse a slash-separated path without validating it.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path.split('/').map(str::to_owned).collect(),
        }
    }

    /// A sub-collection scoped to one document of this collection.
    #[must_use]
    pub fn sub_collection(&self, doc_id: impl Into<String>, collection: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(doc_id.into());
        segments.push(collection.into());
        Self { segments }
    }

    /// Check the path addresses a collection.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidPath` if a segment is empty or contains
    /// a slash, or the path points at a document (even segment count).
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.segments.iter().any(String::is_empty) {
            return Err(QueryError::InvalidPath {
                path: self.to_string(),
                reason: "path segments must not be empty".to_string(),
            });
        }
        if self.segments.iter().any(|segment| segment.contains('/')) {
            return Err(QueryError::InvalidPath {
                path: self.to_string(),
                reason: "path segments must not contain '/'".to_string(),
            });
        }
        if self.segments.len() % 2 == 0 {
            return Err(QueryError::InvalidPath {
                path: self.to_string(),
                reason: "path refers to a document, not a collection".to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Comparison operator of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Field value equals one of the listed values.
    In,
    /// Array field contains the value.
    ArrayContains,
}

impl FilterOp {
    /// Range and not-equal operators, which the query engine limits to a
    /// single field per query.
    #[must_use]
    pub const fn is_inequality(&self) -> bool {
        matches!(
            self,
            Self::NotEq | Self::Lt | Self::Lte | Self::Gt | Self::Gte
        )
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::In => "in",
            Self::ArrayContains => "array-contains",
        };
        f.write_str(symbol)
    }
}

impl FromStr for FilterOp {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(Self::Eq),
            "!=" => Ok(Self::NotEq),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Lte),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Gte),
            "in" => Ok(Self::In),
            "array-contains" => Ok(Self::ArrayContains),
            other => Err(QueryError::InvalidQuery(format!(
                "unknown filter operator '{other}'"
            ))),
        }
    }
}

/// One `(field, operator, value)` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Dotted field path, e.g. `category` or `shipping.city`.
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(QueryError::InvalidQuery(format!(
                "unknown sort direction '{other}'"
            ))),
        }
    }
}

/// One `(field, direction)` sort key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

/// A single step of a composed query, as handed to a
/// [`RemoteStore`](super::RemoteStore).
#[derive(Debug, Clone, PartialEq)]
pub enum QueryConstraint {
    Where(Filter),
    OrderBy(OrderBy),
    Limit(usize),
}

/// What to observe: a collection plus filters, sort keys and a limit.
///
/// A spec without a `source` is disabled: observing it opens no
/// subscription and resolves immediately to an empty, non-loading result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CollectionQuerySpec {
    pub source: Option<CollectionPath>,
    pub filters: Vec<Filter>,
    pub sort: Vec<OrderBy>,
    pub limit: Option<usize>,
}

impl CollectionQuerySpec {
    /// A spec that observes nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// A spec over the given collection with no constraints.
    #[must_use]
    pub fn collection(source: CollectionPath) -> Self {
        Self {
            source: Some(source),
            ..Self::default()
        }
    }

    /// A spec over `source` when present, disabled otherwise.
    #[must_use]
    pub fn maybe(source: Option<CollectionPath>) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    /// Add a filter. Filters are ANDed in insertion order.
    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Add a sort key after any existing ones.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Cap the number of results.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether observing this spec opens no subscription.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.source.is_none()
    }

    /// The constraints in the order the query engine composes them:
    /// filters, then sort keys, then the limit.
    #[must_use]
    pub fn constraints(&self) -> Vec<QueryConstraint> {
        let mut constraints: Vec<QueryConstraint> = self
            .filters
            .iter()
            .cloned()
            .map(QueryConstraint::Where)
            .collect();
        constraints.extend(self.sort.iter().cloned().map(QueryConstraint::OrderBy));
        if let Some(limit) = self.limit {
            constraints.push(QueryConstraint::Limit(limit));
        }
        constraints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_path_display_and_validation() {
        let orders = CollectionPath::new("users").sub_collection("u1", "orders");
        assert_eq!(orders.to_string(), "users/u1/orders");
        assert!(orders.validate().is_ok());

        let document = CollectionPath::parse("users/u1");
        assert!(matches!(
            document.validate(),
            Err(QueryError::InvalidPath { .. })
        ));

        let empty_segment = CollectionPath::parse("users//orders");
        assert!(empty_segment.validate().is_err());

        let nested_id = CollectionPath::new("users").sub_collection("u1/orders/x", "orders");
        assert!(nested_id.validate().is_err());
    }

    #[test]
    fn test_constraints_compose_filters_then_sort_then_limit() {
        let spec = CollectionQuerySpec::collection(CollectionPath::new("products"))
            .limit(5)
            .order_by("price", SortDirection::Desc)
            .filter("category", FilterOp::Eq, "Tops");

        let constraints = spec.constraints();
        assert_eq!(constraints.len(), 3);
        assert!(matches!(constraints.first(), Some(QueryConstraint::Where(_))));
        assert!(matches!(constraints.get(1), Some(QueryConstraint::OrderBy(_))));
        assert!(matches!(constraints.get(2), Some(QueryConstraint::Limit(5))));
    }

    #[test]
    fn test_disabled_spec() {
        assert!(CollectionQuerySpec::disabled().is_disabled());
        assert!(CollectionQuerySpec::maybe(None).is_disabled());
        assert!(!CollectionQuerySpec::collection(CollectionPath::new("orders")).is_disabled());
    }

    #[test]
    fn test_filter_op_parse() {
        assert_eq!("<=".parse::<FilterOp>(), Ok(FilterOp::Lte));
        assert_eq!("array-contains".parse::<FilterOp>(), Ok(FilterOp::ArrayContains));
        assert!("like".parse::<FilterOp>().is_err());
        assert!(FilterOp::Gt.is_inequality());
        assert!(!FilterOp::In.is_inequality());
    }
}
