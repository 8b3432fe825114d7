//! Live observation of a collection query.
//!
//! [`LiveQuery`] owns one subscription at a time and publishes its state as
//! a [`QueryResult`] on a `tokio::sync::watch` channel. Each spec gets a new
//! generation number; a delivery is applied only if its generation is still
//! current, checked under the channel's write lock, so late callbacks from a
//! torn-down subscription can never touch the result of a newer spec.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use super::QueryError;
use super::remote::{Delivery, Document, ListenerRegistration, RemoteStore};
use super::spec::CollectionQuerySpec;

/// Current state of an observation.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    /// Latest snapshot, `None` until the first one arrives or while disabled.
    pub data: Option<Vec<T>>,
    /// True only while the initial snapshot is pending.
    pub loading: bool,
    /// Set when setup or a delivery failed. Terminal for the observation.
    pub error: Option<QueryError>,
}

impl<T> QueryResult<T> {
    /// Result of a spec without a source.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }

    /// Result while waiting for the first snapshot.
    #[must_use]
    pub const fn pending() -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
        }
    }

    /// Result of a query that could not be constructed.
    #[must_use]
    pub const fn failed(error: QueryError) -> Self {
        Self {
            data: None,
            loading: false,
            error: Some(error),
        }
    }

    /// Position in the observation state machine.
    #[must_use]
    pub const fn status(&self) -> ObservationStatus {
        if self.error.is_some() {
            ObservationStatus::Failed
        } else if self.loading {
            ObservationStatus::Subscribing
        } else if self.data.is_some() {
            ObservationStatus::Live
        } else {
            ObservationStatus::Disabled
        }
    }
}

/// Observation state machine positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservationStatus {
    /// No source; nothing is subscribed.
    Disabled,
    /// Subscribed, waiting for the first snapshot.
    Subscribing,
    /// At least one snapshot applied.
    Live,
    /// Setup or delivery failed; stays failed until the spec changes.
    Failed,
}

struct Shared<T> {
    generation: AtomicU64,
    tx: watch::Sender<QueryResult<T>>,
}

impl<T> Shared<T> {
    /// Start a new generation and replace the result wholesale.
    fn advance(&self, initial: QueryResult<T>) -> u64 {
        let mut generation = 0;
        self.tx.send_modify(|result| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *result = initial;
        });
        generation
    }

    fn apply(&self, generation: u64, outcome: Result<Vec<T>, QueryError>) -> bool {
        self.tx.send_if_modified(|result| {
            if self.generation.load(Ordering::SeqCst) != generation {
                trace!(generation, "discarding stale delivery");
                return false;
            }
            if result.error.is_some() {
                trace!(generation, "observation already failed, ignoring delivery");
                return false;
            }
            match outcome {
                Ok(data) => result.data = Some(data),
                Err(error) => result.error = Some(error),
            }
            result.loading = false;
            true
        })
    }
}

/// A continuously-updating view of a remote collection.
///
/// Created by [`observe`]. Changing the spec with [`LiveQuery::set_spec`]
/// tears down the current subscription and starts over; dropping the
/// `LiveQuery` tears it down for good.
pub struct LiveQuery<T> {
    remote: Arc<dyn RemoteStore>,
    spec: CollectionQuerySpec,
    shared: Arc<Shared<T>>,
    registration: Option<ListenerRegistration>,
}

/// Start observing `spec` against `remote`.
///
/// Never panics and never blocks: construction failures are reported
/// through the result's `error` field.
pub fn observe<T>(remote: Arc<dyn RemoteStore>, spec: CollectionQuerySpec) -> LiveQuery<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    LiveQuery::new(remote, spec)
}

impl<T> LiveQuery<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Start observing `spec` against `remote`.
    pub fn new(remote: Arc<dyn RemoteStore>, spec: CollectionQuerySpec) -> Self {
        let (tx, _rx) = watch::channel(QueryResult::pending());
        let mut query = Self {
            remote,
            spec: CollectionQuerySpec::disabled(),
            shared: Arc::new(Shared {
                generation: AtomicU64::new(0),
                tx,
            }),
            registration: None,
        };
        query.start(spec);
        query
    }

    /// Switch to a different spec.
    ///
    /// An identical spec keeps the current subscription and result.
    pub fn set_spec(&mut self, spec: CollectionQuerySpec) {
        if spec == self.spec {
            return;
        }
        self.start(spec);
    }

    fn start(&mut self, spec: CollectionQuerySpec) {
        if let Some(registration) = self.registration.take() {
            registration.release();
        }

        let initial = if spec.is_disabled() {
            QueryResult::disabled()
        } else {
            QueryResult::pending()
        };
        let generation = self.shared.advance(initial);
        self.spec = spec;

        let Some(path) = self.spec.source.clone() else {
            debug!(generation, "query disabled, no subscription opened");
            return;
        };

        let listener = listener_for(Arc::downgrade(&self.shared), generation);
        match self
            .remote
            .subscribe(&path, &self.spec.constraints(), listener)
        {
            Ok(registration) => {
                debug!(%path, generation, "subscribed");
                self.registration = Some(registration);
            }
            Err(error) => {
                warn!(%path, generation, error = %error, "query construction failed");
                self.shared.tx.send_modify(|result| {
                    *result = QueryResult::failed(error);
                });
            }
        }
    }
}

impl<T> LiveQuery<T> {
    /// The spec currently observed.
    #[must_use]
    pub const fn spec(&self) -> &CollectionQuerySpec {
        &self.spec
    }

    /// Generation of the current observation; increases on every spec change.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    /// Whether a remote subscription is currently open.
    #[must_use]
    pub const fn is_subscribed(&self) -> bool {
        self.registration.is_some()
    }

    /// Position in the observation state machine.
    #[must_use]
    pub fn status(&self) -> ObservationStatus {
        self.shared.tx.borrow().status()
    }

    /// A receiver that is notified whenever the result changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<QueryResult<T>> {
        self.shared.tx.subscribe()
    }
}

impl<T: Clone> LiveQuery<T> {
    /// A copy of the current result.
    #[must_use]
    pub fn result(&self) -> QueryResult<T> {
        self.shared.tx.borrow().clone()
    }

    /// Wait until the observation is no longer loading and return its result.
    pub async fn settled(&self) -> QueryResult<T> {
        let mut rx = self.subscribe();
        let settled = rx.wait_for(|result| !result.loading).await;
        settled.map_or_else(|_| self.result(), |result| result.clone())
    }
}

impl<T> Drop for LiveQuery<T> {
    fn drop(&mut self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(registration) = self.registration.take() {
            registration.release();
        }
    }
}

fn listener_for<T>(
    shared: Weak<Shared<T>>,
    generation: u64,
) -> Arc<dyn Fn(Delivery) + Send + Sync>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    Arc::new(move |delivery: Delivery| {
        let Some(shared) = shared.upgrade() else {
            trace!(generation, "observation dropped, ignoring delivery");
            return;
        };
        let outcome = delivery.and_then(|docs| docs.iter().map(Document::decode::<T>).collect());
        if let Err(error) = &outcome {
            if shared.generation.load(Ordering::SeqCst) == generation {
                warn!(generation, error = %error, "snapshot delivery failed");
            }
        }
        shared.apply(generation, outcome);
    })
}
