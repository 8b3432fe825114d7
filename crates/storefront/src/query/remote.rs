//! The remote collection store port.
//!
//! The query layer only needs snapshot subscriptions: a store accepts a
//! collection path plus composed constraints and calls a listener with the
//! full, ordered result every time it changes.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::QueryError;
use super::spec::{CollectionPath, QueryConstraint};

/// A remote record: a stable identifier plus its current fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    /// Create a document.
    #[must_use]
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Look up a dotted field path such as `shipping.city`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        parts.try_fold(self.fields.get(first)?, |value, part| value.get(part))
    }

    /// Decode into a typed value.
    ///
    /// The document identifier is written into an `id` field, overriding any
    /// stored `id`, so decoded values always carry the stable identifier.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Decode` if the fields do not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, QueryError> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(fields)).map_err(|e| QueryError::Decode {
            id: self.id.clone(),
            message: e.to_string(),
        })
    }
}

/// One snapshot delivery: the full ordered result, or a terminal error.
pub type Delivery = Result<Vec<Document>, QueryError>;

/// Callback invoked by a store for each delivery.
pub type SnapshotListener = Arc<dyn Fn(Delivery) + Send + Sync>;

/// Handle to an open subscription.
///
/// Dropping the handle unsubscribes, so teardown happens on every exit path.
#[must_use = "dropping a registration immediately unsubscribes"]
pub struct ListenerRegistration {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl ListenerRegistration {
    /// Wrap the store-specific unsubscribe action.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Unsubscribe now.
    pub fn release(mut self) {
        self.run_release();
    }

    fn run_release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.run_release();
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// A document store that supports live collection subscriptions.
pub trait RemoteStore: Send + Sync {
    /// Open a snapshot subscription.
    ///
    /// Constraints arrive in composition order (filters, sort keys, limit).
    /// The listener may be called before this method returns.
    ///
    /// # Errors
    ///
    /// Returns a `QueryError` synchronously if the path or constraints are
    /// rejected; no subscription exists in that case.
    fn subscribe(
        &self,
        path: &CollectionPath,
        constraints: &[QueryConstraint],
        listener: SnapshotListener,
    ) -> Result<ListenerRegistration, QueryError>;
}
