//! Reactive collection queries.
//!
//! # Architecture
//!
//! - [`spec`] - What to observe: collection path, filters, sort keys, limit
//! - [`remote`] - The [`RemoteStore`] port plus documents and registrations
//! - [`observe`] - [`LiveQuery`], which keeps a [`QueryResult`] in sync
//! - [`memory`] - [`MemoryStore`], an in-process store with live listeners
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use modaverse_storefront::catalog::{Product, ProductQuery};
//! use modaverse_storefront::query::{MemoryStore, observe};
//!
//! let store = Arc::new(MemoryStore::new());
//! let products = observe::<Product>(store, ProductQuery::default().spec());
//! assert!(!products.result().loading);
//! ```

pub mod memory;
pub mod observe;
pub mod remote;
pub mod spec;

pub use memory::{MemoryStore, MemoryStoreError};
pub use observe::{LiveQuery, ObservationStatus, QueryResult, observe};
pub use remote::{Delivery, Document, ListenerRegistration, RemoteStore, SnapshotListener};
pub use spec::{
    CollectionPath, CollectionQuerySpec, Filter, FilterOp, OrderBy, QueryConstraint,
    SortDirection,
};

use thiserror::Error;

/// Errors surfaced through a query result.
///
/// Payloads are strings so results stay cheap to clone and compare.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The collection path cannot be subscribed to.
    #[error("invalid collection path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// The store rejected the filter/sort/limit composition.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The store failed to deliver a snapshot.
    #[error("remote error: {0}")]
    Remote(String),

    /// A document did not match the expected shape.
    #[error("failed to decode document {id}: {message}")]
    Decode { id: String, message: String },
}
