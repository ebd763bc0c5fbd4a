use async_trait::async_trait;
use thiserror::Error;

use crate::record::TraceRecord;

/// Errors from trace persistence backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Persistence sink for completed traces.
///
/// The engine only ever calls these three methods; an in-process ring
/// buffer and an external analytical database are both valid backends.
/// Implementations must be safe for concurrent access.
#[async_trait]
pub trait TraceStore: Send + Sync {
    /// Persist one completed trace.
    async fn add(&self, record: TraceRecord) -> Result<(), StoreError>;

    /// Fetch up to `limit` traces, newest first.
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<TraceRecord>, StoreError>;

    /// `true` if the backend is reachable and accepting writes.
    async fn health_check(&self) -> bool;
}
