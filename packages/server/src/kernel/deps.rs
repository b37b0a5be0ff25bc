//! Server dependencies for actions (using traits for testability)
//!
//! Central dependency container handed to every pipeline entry point.
//! Storage, audit, and event publication sit behind trait objects so tests
//! can swap in the in-memory store or fault-injecting doubles.

use std::sync::Arc;
use std::time::Duration;

use super::audit::AuditLog;
use super::memory_store::MemoryStore;
use super::rate_limit::MutationRateLimiter;
use super::subscription_hub::SubscriptionHub;
use super::traits::{BaseAuditLogWriter, BaseEventPublisher, BaseExceptionStore};

/// Hard cap on bulk requests for every caller
pub const BULK_HARD_LIMIT: usize = 100;

/// Cap on bulk requests for callers without the ADMIN role
pub const NON_ADMIN_BULK_LIMIT: usize = 10;

// =============================================================================
// Pipeline settings
// =============================================================================

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Per-item deadline covering lock, transition check and commit
    pub operation_timeout: Duration,
    /// Items of one bulk call processed concurrently
    pub bulk_concurrency: usize,
    pub bulk_hard_limit: usize,
    pub non_admin_bulk_limit: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_millis(5000),
            bulk_concurrency: 8,
            bulk_hard_limit: BULK_HARD_LIMIT,
            non_admin_bulk_limit: NON_ADMIN_BULK_LIMIT,
        }
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

#[derive(Clone)]
pub struct ServerDeps {
    pub store: Arc<dyn BaseExceptionStore>,
    pub audit: AuditLog,
    /// Where lifecycle events go; the hub itself in production
    pub publisher: Arc<dyn BaseEventPublisher>,
    /// Subscription registry for SSE endpoints and health reporting
    pub hub: SubscriptionHub,
    pub rate_limiter: Arc<MutationRateLimiter>,
    pub settings: PipelineSettings,
}

impl ServerDeps {
    pub fn new(
        store: Arc<dyn BaseExceptionStore>,
        audit_sink: Arc<dyn BaseAuditLogWriter>,
        hub: SubscriptionHub,
        rate_limiter: MutationRateLimiter,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            audit: AuditLog::new(audit_sink),
            publisher: Arc::new(hub.clone()),
            hub,
            rate_limiter: Arc::new(rate_limiter),
            settings,
        }
    }

    /// In-memory store, no rate limits, default settings
    pub fn in_memory(store: MemoryStore, hub: SubscriptionHub) -> Self {
        Self::new(
            Arc::new(store.clone()),
            Arc::new(store),
            hub,
            MutationRateLimiter::disabled(),
            PipelineSettings::default(),
        )
    }

    /// Replace the event publisher (hub stays for subscriptions)
    pub fn with_publisher(mut self, publisher: Arc<dyn BaseEventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: MutationRateLimiter) -> Self {
        self.rate_limiter = Arc::new(rate_limiter);
        self
    }
}
