//! Log record business operations

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::LogRecord;
use crate::store::LogStore;

/// Thin orchestration over the log store. Validation and truncation
/// semantics are the store's; nothing is added here beyond the seam the
/// handlers call through.
#[derive(Clone)]
pub struct LogUsecase {
    store: Arc<dyn LogStore>,
}

impl LogUsecase {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    pub async fn insert(&self, records: &[LogRecord]) -> Result<()> {
        self.store.insert(records).await
    }

    pub async fn find(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: u64,
    ) -> Result<(Vec<LogRecord>, bool)> {
        self.store.find(from, to, limit).await
    }
}
