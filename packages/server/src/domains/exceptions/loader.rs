use dataloader::BatchFn;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::domains::exceptions::models::{RetryAttempt, StatusChange};
use crate::kernel::BaseExceptionStore;

/// Batches retry-attempt lookups by transaction id.
pub struct RetryAttemptsLoader {
    pub store: Arc<dyn BaseExceptionStore>,
}

impl RetryAttemptsLoader {
    pub fn new(store: Arc<dyn BaseExceptionStore>) -> Self {
        Self { store }
    }
}

impl BatchFn<String, Vec<RetryAttempt>> for RetryAttemptsLoader {
    fn load(
        &mut self,
        keys: &[String],
    ) -> impl std::future::Future<Output = HashMap<String, Vec<RetryAttempt>>> {
        let store = self.store.clone();
        let keys = keys.to_vec();
        async move {
            let mut map = store.attempts_for(&keys).await.unwrap_or_else(|e| {
                warn!(error = %e, "Failed to batch-load retry attempts");
                HashMap::new()
            });
            for key in &keys {
                map.entry(key.clone()).or_default();
            }
            map
        }
    }
}

/// Batches status-history lookups by transaction id.
pub struct StatusHistoryLoader {
    pub store: Arc<dyn BaseExceptionStore>,
}

impl StatusHistoryLoader {
    pub fn new(store: Arc<dyn BaseExceptionStore>) -> Self {
        Self { store }
    }
}

impl BatchFn<String, Vec<StatusChange>> for StatusHistoryLoader {
    fn load(
        &mut self,
        keys: &[String],
    ) -> impl std::future::Future<Output = HashMap<String, Vec<StatusChange>>> {
        let store = self.store.clone();
        let keys = keys.to_vec();
        async move {
            let mut map = store.status_history_for(&keys).await.unwrap_or_else(|e| {
                warn!(error = %e, "Failed to batch-load status history");
                HashMap::new()
            });
            for key in &keys {
                map.entry(key.clone()).or_default();
            }
            map
        }
    }
}
