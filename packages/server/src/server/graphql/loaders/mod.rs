use dataloader::non_cached::Loader;
use std::sync::Arc;

use crate::domains::exceptions::loader::{RetryAttemptsLoader, StatusHistoryLoader};
use crate::domains::exceptions::models::{RetryAttempt, StatusChange};
use crate::kernel::BaseExceptionStore;

pub struct DataLoaders {
    pub retry_attempts: Loader<String, Vec<RetryAttempt>, RetryAttemptsLoader>,
    pub status_history: Loader<String, Vec<StatusChange>, StatusHistoryLoader>,
}

impl DataLoaders {
    pub fn new(store: Arc<dyn BaseExceptionStore>) -> Self {
        Self {
            retry_attempts: Loader::new(RetryAttemptsLoader::new(store.clone())),
            status_history: Loader::new(StatusHistoryLoader::new(store)),
        }
    }
}
