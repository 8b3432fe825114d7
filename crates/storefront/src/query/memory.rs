//! In-process document store with live collection listeners.
//!
//! Mirrors the composition rules of the managed document database the
//! storefront talks to in production, so queries that work here are shaped
//! the same way there:
//!
//! - inequality filters (`!=`, `<`, `<=`, `>`, `>=`) on one field only,
//!   and when sorting, the first sort key must be that field
//! - `in` takes a non-empty array of at most 10 values
//! - `limit` is positive and comes last
//! - documents missing a sort field are left out of sorted results
//!
//! Listeners receive their first snapshot inside `subscribe` and a fresh one
//! after every mutation that changes their result. Deliveries run while the
//! store lock is held, which keeps each listener's snapshots in emission
//! order; listeners must not call back into the store.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::QueryError;
use super::remote::{Document, ListenerRegistration, RemoteStore, SnapshotListener};
use super::spec::{CollectionPath, Filter, FilterOp, OrderBy, QueryConstraint, SortDirection};

const MAX_IN_VALUES: usize = 10;

/// Errors from direct reads and writes against a [`MemoryStore`].
#[derive(Debug, Error)]
pub enum MemoryStoreError {
    /// The collection path is malformed.
    #[error(transparent)]
    Path(#[from] QueryError),

    /// The value could not be converted to document fields.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Documents must serialize to JSON objects.
    #[error("document must be a JSON object")]
    NotAnObject,

    /// No document with that id in the collection.
    #[error("document {id} not found in {path}")]
    NotFound { path: String, id: String },
}

/// Shared, cloneable in-memory document store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Map<String, Value>>>,
    listeners: BTreeMap<u64, Listener>,
    next_listener_id: u64,
}

struct Listener {
    path: String,
    query: ValidatedQuery,
    callback: SnapshotListener,
    last: Option<Vec<Document>>,
    failed: bool,
}

#[derive(Debug, Default)]
struct ValidatedQuery {
    filters: Vec<Filter>,
    sort: Vec<OrderBy>,
    limit: Option<usize>,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a document.
    ///
    /// # Errors
    ///
    /// Returns `MemoryStoreError::Path` if the path is not a collection path.
    #[instrument(skip(self, path, data), fields(path = %path))]
    pub fn set(
        &self,
        path: &CollectionPath,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<(), MemoryStoreError> {
        path.validate()?;
        let key = path.to_string();
        let mut inner = lock(&self.inner);
        inner
            .collections
            .entry(key.clone())
            .or_default()
            .insert(id.to_string(), data);
        inner.notify(&key);
        Ok(())
    }

    /// Serialize `value` and store it as a new document.
    ///
    /// A non-empty string `id` field becomes the document id (and is not
    /// stored as a field); otherwise a random id is generated.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or `value` does not
    /// serialize to a JSON object.
    pub fn insert<T: Serialize>(
        &self,
        path: &CollectionPath,
        value: &T,
    ) -> Result<String, MemoryStoreError> {
        let Value::Object(mut fields) = serde_json::to_value(value)? else {
            return Err(MemoryStoreError::NotAnObject);
        };
        let id = match fields.remove("id") {
            Some(Value::String(id)) if !id.is_empty() => id,
            _ => Uuid::new_v4().to_string(),
        };
        self.set(path, &id, fields)?;
        Ok(id)
    }

    /// Merge top-level fields into an existing document.
    ///
    /// # Errors
    ///
    /// Returns `MemoryStoreError::NotFound` if the document does not exist.
    #[instrument(skip(self, path, patch), fields(path = %path))]
    pub fn update(
        &self,
        path: &CollectionPath,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<(), MemoryStoreError> {
        path.validate()?;
        let key = path.to_string();
        let mut inner = lock(&self.inner);
        let document = inner
            .collections
            .get_mut(&key)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| MemoryStoreError::NotFound {
                path: key.clone(),
                id: id.to_string(),
            })?;
        document.extend(patch);
        inner.notify(&key);
        Ok(())
    }

    /// Delete a document. Returns whether it existed.
    #[instrument(skip(self, path), fields(path = %path))]
    pub fn delete(&self, path: &CollectionPath, id: &str) -> bool {
        let key = path.to_string();
        let mut inner = lock(&self.inner);
        let removed = inner
            .collections
            .get_mut(&key)
            .and_then(|docs| docs.remove(id))
            .is_some();
        if removed {
            inner.notify(&key);
        }
        removed
    }

    /// All documents of a collection, ordered by id.
    #[must_use]
    pub fn documents(&self, path: &CollectionPath) -> Vec<Document> {
        let inner = lock(&self.inner);
        inner
            .collections
            .get(&path.to_string())
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Deliver `error` to every listener on `path`. Those listeners receive
    /// nothing afterwards.
    pub fn fail_listeners(&self, path: &CollectionPath, error: &QueryError) {
        let key = path.to_string();
        let mut inner = lock(&self.inner);
        for listener in inner.listeners.values_mut() {
            if listener.path == key && !listener.failed {
                listener.failed = true;
                (listener.callback)(Err(error.clone()));
            }
        }
    }

    /// Number of open subscriptions.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        lock(&self.inner).listeners.len()
    }
}

impl Inner {
    fn notify(&mut self, key: &str) {
        let Self {
            collections,
            listeners,
            ..
        } = self;
        let docs = collections.get(key);
        for (id, listener) in listeners.iter_mut() {
            if listener.path != key || listener.failed {
                continue;
            }
            let snapshot = listener.query.run(docs);
            if listener.last.as_ref() == Some(&snapshot) {
                continue;
            }
            debug!(listener = id, path = key, size = snapshot.len(), "delivering snapshot");
            listener.last = Some(snapshot.clone());
            (listener.callback)(Ok(snapshot));
        }
    }
}

impl RemoteStore for MemoryStore {
    fn subscribe(
        &self,
        path: &CollectionPath,
        constraints: &[QueryConstraint],
        listener: SnapshotListener,
    ) -> Result<ListenerRegistration, QueryError> {
        path.validate()?;
        let query = ValidatedQuery::compose(constraints)?;
        let key = path.to_string();

        let mut inner = lock(&self.inner);
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;

        let snapshot = query.run(inner.collections.get(&key));
        inner.listeners.insert(
            id,
            Listener {
                path: key.clone(),
                query,
                callback: Arc::clone(&listener),
                last: Some(snapshot.clone()),
                failed: false,
            },
        );
        debug!(listener = id, path = %key, size = snapshot.len(), "listener registered");
        listener(Ok(snapshot));
        drop(inner);

        let store: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        Ok(ListenerRegistration::new(move || {
            if let Some(store) = store.upgrade() {
                lock(&store).listeners.remove(&id);
                debug!(listener = id, "listener removed");
            }
        }))
    }
}

impl ValidatedQuery {
    /// Apply constraints one at a time, rejecting shapes the query engine
    /// would reject.
    fn compose(constraints: &[QueryConstraint]) -> Result<Self, QueryError> {
        let mut query = Self::default();
        let mut inequality_field: Option<String> = None;

        for constraint in constraints {
            if query.limit.is_some() {
                return Err(QueryError::InvalidQuery(
                    "limit must be the last constraint".to_string(),
                ));
            }
            match constraint {
                QueryConstraint::Where(filter) => {
                    if filter.field.is_empty() {
                        return Err(QueryError::InvalidQuery(
                            "filter field must not be empty".to_string(),
                        ));
                    }
                    if filter.op == FilterOp::In {
                        match &filter.value {
                            Value::Array(values)
                                if !values.is_empty() && values.len() <= MAX_IN_VALUES => {}
                            _ => {
                                return Err(QueryError::InvalidQuery(format!(
                                    "'in' filter on {} needs 1 to {MAX_IN_VALUES} values",
                                    filter.field
                                )));
                            }
                        }
                    }
                    if filter.op.is_inequality() {
                        if let Some(existing) = &inequality_field {
                            if existing != &filter.field {
                                return Err(QueryError::InvalidQuery(format!(
                                    "inequality filters on both {existing} and {}",
                                    filter.field
                                )));
                            }
                        }
                        if let Some(first) = query.sort.first() {
                            if first.field != filter.field {
                                return Err(QueryError::InvalidQuery(format!(
                                    "first sort key must be {} when filtering on it with {}",
                                    filter.field, filter.op
                                )));
                            }
                        }
                        inequality_field = Some(filter.field.clone());
                    }
                    query.filters.push(filter.clone());
                }
                QueryConstraint::OrderBy(order) => {
                    if order.field.is_empty() {
                        return Err(QueryError::InvalidQuery(
                            "sort field must not be empty".to_string(),
                        ));
                    }
                    if query.sort.is_empty() {
                        if let Some(field) = &inequality_field {
                            if field != &order.field {
                                return Err(QueryError::InvalidQuery(format!(
                                    "first sort key must be {field}, the inequality field"
                                )));
                            }
                        }
                    }
                    query.sort.push(order.clone());
                }
                QueryConstraint::Limit(limit) => {
                    if *limit == 0 {
                        return Err(QueryError::InvalidQuery(
                            "limit must be greater than zero".to_string(),
                        ));
                    }
                    query.limit = Some(*limit);
                }
            }
        }
        Ok(query)
    }

    fn run(&self, docs: Option<&BTreeMap<String, Map<String, Value>>>) -> Vec<Document> {
        let Some(docs) = docs else {
            return Vec::new();
        };
        let mut matched: Vec<Document> = docs
            .iter()
            .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
            .filter(|doc| self.filters.iter().all(|filter| filter_matches(doc, filter)))
            .filter(|doc| self.sort.iter().all(|order| doc.get(&order.field).is_some()))
            .collect();

        matched.sort_by(|a, b| {
            self.sort
                .iter()
                .map(|order| {
                    let ordering = match (a.get(&order.field), b.get(&order.field)) {
                        (Some(x), Some(y)) => compare_values(x, y),
                        _ => Ordering::Equal,
                    };
                    match order.direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.id.cmp(&b.id))
        });

        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}

fn filter_matches(doc: &Document, filter: &Filter) -> bool {
    let Some(value) = doc.get(&filter.field) else {
        return false;
    };
    match filter.op {
        FilterOp::Eq => values_equal(value, &filter.value),
        FilterOp::NotEq => !values_equal(value, &filter.value),
        FilterOp::Lt => comparable(value, &filter.value) && compare_values(value, &filter.value).is_lt(),
        FilterOp::Lte => comparable(value, &filter.value) && compare_values(value, &filter.value).is_le(),
        FilterOp::Gt => comparable(value, &filter.value) && compare_values(value, &filter.value).is_gt(),
        FilterOp::Gte => comparable(value, &filter.value) && compare_values(value, &filter.value).is_ge(),
        FilterOp::In => filter
            .value
            .as_array()
            .is_some_and(|candidates| candidates.iter().any(|c| values_equal(value, c))),
        FilterOp::ArrayContains => value
            .as_array()
            .is_some_and(|items| items.iter().any(|item| values_equal(item, &filter.value))),
    }
}

/// Rank of a value's type in the cross-type ordering.
const fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Range filters only match values of the same type.
const fn comparable(a: &Value, b: &Value) -> bool {
    type_rank(a) == type_rank(b)
}

fn values_equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b).is_eq() && comparable(a, b)
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y)
            .map(|(p, q)| compare_values(p, q))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => x
            .len()
            .cmp(&y.len())
            .then_with(|| Value::Object(x.clone()).to_string().cmp(&Value::Object(y.clone()).to_string())),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
