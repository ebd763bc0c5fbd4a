use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use spanforge_core::{SpanRecord, TraceId};

/// A completed trace as written to the persistence sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecord {
    pub trace_id: TraceId,
    /// Root span operation name.
    pub root_operation: String,
    /// Root span service name.
    pub root_service: String,
    pub started_at: DateTime<Utc>,
    pub duration_ns: u64,
    pub span_count: usize,
    pub has_errors: bool,
    pub spans: Vec<SpanRecord>,
}

impl TraceRecord {
    /// Assemble a record from the spans of one trace. The root is the span
    /// without a parent; spans are kept in the order they were finalised.
    pub fn from_spans(trace_id: TraceId, spans: Vec<SpanRecord>) -> Option<Self> {
        let root = spans.iter().find(|s| s.parent_span_id.is_none())?;
        let started_at = spans
            .iter()
            .map(|s| s.start_time_ns)
            .min()
            .unwrap_or(root.start_time_ns);
        let ended_at = spans.iter().map(|s| s.end_time_ns).max().unwrap_or(0);

        Some(Self {
            trace_id,
            root_operation: root.name.clone(),
            root_service: root.service.clone(),
            started_at: DateTime::<Utc>::from_timestamp_nanos(started_at as i64),
            duration_ns: ended_at.saturating_sub(started_at),
            span_count: spans.len(),
            has_errors: spans.iter().any(|s| s.status.is_error()),
            spans,
        })
    }
}

/// Aggregate counts over stored traces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceCounts {
    pub total: usize,
    pub errors: usize,
    pub success: usize,
}
