use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::record::{TraceCounts, TraceRecord};
use crate::store::{StoreError, TraceStore};

/// Bounded in-memory [`TraceStore`].
///
/// Keeps the newest `max_traces` records in a ring buffer; the oldest
/// record is dropped on overflow. Suitable for development and tests, and
/// as the default backend when no database is configured.
pub struct InMemoryTraceStore {
    traces: Mutex<VecDeque<TraceRecord>>,
    max_traces: usize,
}

impl InMemoryTraceStore {
    pub fn new(max_traces: usize) -> Self {
        Self {
            traces: Mutex::new(VecDeque::with_capacity(max_traces)),
            max_traces,
        }
    }

    pub fn max_traces(&self) -> usize {
        self.max_traces
    }

    /// Number of traces currently held.
    pub fn len(&self) -> usize {
        self.traces.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.lock().is_empty()
    }

    /// Aggregate status counts over the retained traces.
    pub fn trace_counts(&self) -> TraceCounts {
        let traces = self.traces.lock();
        let errors = traces.iter().filter(|t| t.has_errors).count();
        TraceCounts {
            total: traces.len(),
            errors,
            success: traces.len() - errors,
        }
    }
}

#[async_trait]
impl TraceStore for InMemoryTraceStore {
    async fn add(&self, record: TraceRecord) -> Result<(), StoreError> {
        let mut traces = self.traces.lock();
        while traces.len() >= self.max_traces {
            traces.pop_front();
        }
        traces.push_back(record);
        Ok(())
    }

    async fn fetch_recent(&self, limit: usize) -> Result<Vec<TraceRecord>, StoreError> {
        let traces = self.traces.lock();
        Ok(traces.iter().rev().take(limit).cloned().collect())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
