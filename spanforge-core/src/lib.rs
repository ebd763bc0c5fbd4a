pub mod ids;
pub mod span;

pub use ids::{SpanId, TraceId};
pub use span::{
    now_nanos, AttributeValue, SpanEvent, SpanKind, SpanLink, SpanRecord, SpanStatus,
};
