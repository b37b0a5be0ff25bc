//! In-process fan-out of lifecycle events to filtered subscribers.
//!
//! Each subscriber owns one bounded channel plus a filter and role context.
//! Publishing never waits on a subscriber: a full or closed channel gets the
//! subscriber dropped from the registry, and the others still receive the
//! event. Delivery is at-most-once with no replay.
//!
//! # Usage
//!
//! Producers (mutation pipeline, ingestion):
//!   hub.publish_event(LifecycleEvent::exception(ExceptionEventType::Created, &record, "system"));
//!
//! Consumers (SSE endpoint):
//!   let mut stream = hub.subscribe(actor.highest_role(), SubscriptionFilter::default());
//!   while let Some(event) = stream.recv().await { ... }

use std::collections::{HashMap, HashSet};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use super::traits::{BaseEventPublisher, PublishError};
use crate::common::Role;
use crate::domains::exceptions::events::{EventKind, ExceptionEventType, LifecycleEvent};
use crate::domains::exceptions::models::{InterfaceType, Severity};

// =============================================================================
// Filtering
// =============================================================================

/// Declared subscriber predicate. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionFilter {
    pub event_kinds: Option<HashSet<EventKind>>,
    pub transaction_id: Option<String>,
    pub interface_types: Option<HashSet<InterfaceType>>,
    pub severities: Option<HashSet<Severity>>,
    pub customer_ids: Option<HashSet<String>>,
}

impl SubscriptionFilter {
    /// Evaluate the predicate. Snapshot-based constraints fail when the
    /// event carries no exception snapshot.
    pub fn matches(&self, event: &LifecycleEvent) -> bool {
        if let Some(kinds) = &self.event_kinds {
            if !kinds.contains(&event.kind) {
                return false;
            }
        }
        if let Some(tx) = &self.transaction_id {
            if tx != &event.transaction_id {
                return false;
            }
        }

        let snapshot = event.exception.as_ref();
        if let Some(types) = &self.interface_types {
            if !snapshot.is_some_and(|e| types.contains(&e.interface_type)) {
                return false;
            }
        }
        if let Some(severities) = &self.severities {
            if !snapshot.is_some_and(|e| severities.contains(&e.severity)) {
                return false;
            }
        }
        if let Some(customers) = &self.customer_ids {
            let customer = snapshot.and_then(|e| e.customer_id.as_ref());
            if !customer.is_some_and(|c| customers.contains(c)) {
                return false;
            }
        }
        true
    }
}

/// Role gate applied before the declared predicate.
///
/// VIEWER sees created/acknowledged/resolved exception events only;
/// OPERATIONS and ADMIN see every kind; no role sees nothing.
pub fn role_permits(role: Option<Role>, kind: EventKind) -> bool {
    match role {
        None => false,
        Some(Role::Viewer) => matches!(
            kind,
            EventKind::Exception(
                ExceptionEventType::Created
                    | ExceptionEventType::Acknowledged
                    | ExceptionEventType::Resolved
            )
        ),
        Some(Role::Operations | Role::Admin) => true,
    }
}

// =============================================================================
// Hub
// =============================================================================

struct Subscriber {
    role: Option<Role>,
    filter: SubscriptionFilter,
    tx: mpsc::Sender<Arc<LifecycleEvent>>,
}

struct HubInner {
    subscribers: RwLock<HashMap<u64, Subscriber>>,
    next_id: AtomicU64,
    capacity: usize,
    dropped: AtomicU64,
}

impl HubInner {
    fn deregister(&self, id: u64) -> bool {
        self.subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
            .is_some()
    }
}

/// Thread-safe, cloneable subscription registry.
#[derive(Clone)]
pub struct SubscriptionHub {
    inner: Arc<HubInner>,
}

impl SubscriptionHub {
    /// Create a hub with the default per-subscriber capacity (256 events).
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a hub with the given per-subscriber channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Register a subscriber. The returned stream deregisters when dropped.
    pub fn subscribe(&self, role: Option<Role>, filter: SubscriptionFilter) -> SubscriptionStream {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.capacity);

        self.inner
            .subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Subscriber { role, filter, tx });

        debug!(subscriber_id = id, role = ?role, "Subscriber registered");

        SubscriptionStream {
            id,
            rx,
            hub: Arc::downgrade(&self.inner),
            closed: AtomicBool::new(false),
        }
    }

    /// Fan an event out to every permitted, matching subscriber.
    ///
    /// Returns the number of subscribers the event was queued for.
    pub fn publish_event(&self, event: LifecycleEvent) -> usize {
        let event = Arc::new(event);
        let mut delivered = 0;
        let mut evicted = Vec::new();

        {
            let subscribers = self
                .inner
                .subscribers
                .read()
                .unwrap_or_else(|e| e.into_inner());

            for (id, subscriber) in subscribers.iter() {
                if !role_permits(subscriber.role, event.kind) || !subscriber.filter.matches(&event) {
                    continue;
                }
                match subscriber.tx.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => evicted.push(*id),
                }
            }
        }

        for id in evicted {
            if self.inner.deregister(id) {
                self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(subscriber_id = id, "Dropped slow or disconnected subscriber");
            }
        }

        delivered
    }

    /// Live subscriber count
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Subscribers evicted for being slow or disconnected
    pub fn dropped_subscribers(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }
}

impl Default for SubscriptionHub {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseEventPublisher for SubscriptionHub {
    fn publish(&self, event: LifecycleEvent) -> Result<usize, PublishError> {
        Ok(self.publish_event(event))
    }
}

// =============================================================================
// Subscriber handle
// =============================================================================

/// Receiving end of one subscription.
///
/// Yields events in publish order. Ends when the hub evicts the subscriber.
pub struct SubscriptionStream {
    id: u64,
    rx: mpsc::Receiver<Arc<LifecycleEvent>>,
    hub: Weak<HubInner>,
    closed: AtomicBool,
}

impl SubscriptionStream {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn recv(&mut self) -> Option<Arc<LifecycleEvent>> {
        self.rx.recv().await
    }

    /// Next event if one is already queued
    pub fn try_recv(&mut self) -> Option<Arc<LifecycleEvent>> {
        self.rx.try_recv().ok()
    }

    /// Deregister now. Idempotent.
    pub fn unsubscribe(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(hub) = self.hub.upgrade() {
            if hub.deregister(self.id) {
                debug!(subscriber_id = self.id, "Subscriber deregistered");
            }
        }
    }
}

impl Stream for SubscriptionStream {
    type Item = Arc<LifecycleEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for SubscriptionStream {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
