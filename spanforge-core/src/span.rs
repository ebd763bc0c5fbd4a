use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::ids::{SpanId, TraceId};

/// Current wall time in nanoseconds since the UNIX epoch.
pub fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// The role of a span in a distributed interaction.
///
/// YAML spelling is upper-case (`INTERNAL`, `SERVER`, ...), matching the
/// OpenTelemetry enum names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpanKind {
    #[default]
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Internal => "INTERNAL",
            Self::Server => "SERVER",
            Self::Client => "CLIENT",
            Self::Producer => "PRODUCER",
            Self::Consumer => "CONSUMER",
        };
        f.write_str(s)
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Render the value as the string form used during template resolution.
    pub fn render(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => s.clone(),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// A timestamped event attached to a span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanEvent {
    pub name: String,
    /// Nanoseconds since the UNIX epoch.
    pub time_ns: u64,
    pub attributes: BTreeMap<String, AttributeValue>,
}

/// A non-parent causal reference to a span in another trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanLink {
    pub trace_id: TraceId,
    pub span_id: SpanId,
}

/// Span completion status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum SpanStatus {
    Ok,
    Error { message: String },
}

impl SpanStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// A completed span as handed to the exporter.
///
/// This is the full emission record: identifiers, causal parent, timings,
/// and payload. The exporter owns any translation to a wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanRecord {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    /// `None` for a root span; the wire encoding of "no parent" is the
    /// all-zero span ID.
    pub parent_span_id: Option<SpanId>,
    pub name: String,
    pub kind: SpanKind,
    /// Value of the `service.name` resource attribute.
    pub service: String,
    pub start_time_ns: u64,
    pub end_time_ns: u64,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub events: Vec<SpanEvent>,
    pub links: Vec<SpanLink>,
    pub status: SpanStatus,
}

impl SpanRecord {
    /// Span duration in nanoseconds.
    pub fn duration_ns(&self) -> u64 {
        self.end_time_ns.saturating_sub(self.start_time_ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_default_is_internal() {
        assert_eq!(SpanKind::default(), SpanKind::Internal);
    }

    #[test]
    fn kind_parses_uppercase_yaml_names() {
        let kind: SpanKind = serde_json::from_str("\"PRODUCER\"").unwrap();
        assert_eq!(kind, SpanKind::Producer);
        assert!(serde_json::from_str::<SpanKind>("\"producer\"").is_err());
    }

    #[test]
    fn attribute_value_render() {
        assert_eq!(AttributeValue::from("x").render(), "x");
        assert_eq!(AttributeValue::Int(7).render(), "7");
        assert_eq!(AttributeValue::Bool(true).render(), "true");
    }

    #[test]
    fn status_is_error() {
        assert!(!SpanStatus::Ok.is_error());
        assert!(SpanStatus::Error {
            message: "boom".to_owned()
        }
        .is_error());
    }
}
