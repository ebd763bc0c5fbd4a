//! OTLP adapter: translates [`SpanRecord`]s into OpenTelemetry SDK span
//! data and hands them to a batching OTLP exporter.
//!
//! The batch processor owns buffering and background delivery, so the
//! engine-side handoff never blocks on the network.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use opentelemetry::trace::{
    Event, Link, SpanContext, SpanKind as OtelSpanKind, Status, TraceFlags, TraceState,
};
use opentelemetry::{InstrumentationScope, KeyValue, Value};
use opentelemetry_sdk::trace::{BatchSpanProcessor, SpanData, SpanEvents, SpanLinks, SpanProcessor};
use tracing::warn;

use spanforge_core::{AttributeValue, SpanKind, SpanRecord, SpanStatus};

use crate::exporter::{ExportError, SpanExporter};

/// Wire protocol for the OTLP exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OtlpProtocol {
    #[default]
    Grpc,
    Http,
}

impl FromStr for OtlpProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grpc" => Ok(Self::Grpc),
            "http" => Ok(Self::Http),
            other => Err(format!("unknown OTLP protocol '{other}'")),
        }
    }
}

impl fmt::Display for OtlpProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grpc => f.write_str("grpc"),
            Self::Http => f.write_str("http"),
        }
    }
}

/// Configuration for [`OtlpSpanExporter`].
#[derive(Debug, Clone)]
pub struct OtlpConfig {
    /// Collector endpoint, e.g. `http://localhost:4317`.
    pub endpoint: String,
    pub protocol: OtlpProtocol,
    /// Per-batch export timeout.
    pub timeout: Duration,
}

impl Default for OtlpConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4317".to_owned(),
            protocol: OtlpProtocol::Grpc,
            timeout: Duration::from_secs(10),
        }
    }
}

/// [`SpanExporter`] backed by `opentelemetry-otlp` with batch delivery.
pub struct OtlpSpanExporter {
    processor: BatchSpanProcessor,
    scope: InstrumentationScope,
}

impl OtlpSpanExporter {
    /// Build the OTLP exporter and its batch processor.
    ///
    /// Fails only on exporter construction (bad endpoint, TLS setup);
    /// delivery failures at runtime surface through flush and shutdown.
    pub fn new(config: &OtlpConfig) -> Result<Self, ExportError> {
        let exporter = build_exporter(config)?;
        let processor = BatchSpanProcessor::builder(exporter).build();
        let scope = InstrumentationScope::builder("spanforge")
            .with_version(env!("CARGO_PKG_VERSION"))
            .build();
        Ok(Self { processor, scope })
    }
}

fn build_exporter(config: &OtlpConfig) -> Result<opentelemetry_otlp::SpanExporter, ExportError> {
    use opentelemetry_otlp::WithExportConfig;

    let result = match config.protocol {
        OtlpProtocol::Http => opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(&config.endpoint)
            .with_timeout(config.timeout)
            .build(),
        OtlpProtocol::Grpc => opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&config.endpoint)
            .with_timeout(config.timeout)
            .build(),
    };

    result.map_err(|e| ExportError::Connection(e.to_string()))
}

#[async_trait]
impl SpanExporter for OtlpSpanExporter {
    fn name(&self) -> &str {
        "otlp"
    }

    async fn export(&self, span: SpanRecord) -> Result<(), ExportError> {
        // The batch processor enqueues and returns; the network happens on
        // its own schedule.
        self.processor.on_end(to_span_data(&span, &self.scope));
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ExportError> {
        self.processor
            .force_flush()
            .map_err(|e| ExportError::Connection(e.to_string()))
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        if let Err(e) = self.processor.force_flush() {
            warn!(error = %e, "OTLP flush before shutdown failed");
        }
        self.processor
            .shutdown()
            .map_err(|e| ExportError::Connection(e.to_string()))
    }
}

/// Convert an emission record into SDK span data.
fn to_span_data(record: &SpanRecord, scope: &InstrumentationScope) -> SpanData {
    let span_context = SpanContext::new(
        opentelemetry::trace::TraceId::from_bytes(record.trace_id.0),
        opentelemetry::trace::SpanId::from_bytes(record.span_id.0),
        TraceFlags::SAMPLED,
        false,
        TraceState::default(),
    );

    let parent_span_id = record
        .parent_span_id
        .map(|id| opentelemetry::trace::SpanId::from_bytes(id.0))
        .unwrap_or(opentelemetry::trace::SpanId::INVALID);

    let mut attributes: Vec<KeyValue> = record
        .attributes
        .iter()
        .map(|(k, v)| KeyValue::new(k.clone(), to_otel_value(v)))
        .collect();
    attributes.push(KeyValue::new("service.name", record.service.clone()));

    let mut events = SpanEvents::default();
    events.events = record
        .events
        .iter()
        .map(|e| {
            Event::new(
                e.name.clone(),
                system_time(e.time_ns),
                e.attributes
                    .iter()
                    .map(|(k, v)| KeyValue::new(k.clone(), to_otel_value(v)))
                    .collect(),
                0,
            )
        })
        .collect();

    let mut links = SpanLinks::default();
    links.links = record
        .links
        .iter()
        .map(|l| {
            let context = SpanContext::new(
                opentelemetry::trace::TraceId::from_bytes(l.trace_id.0),
                opentelemetry::trace::SpanId::from_bytes(l.span_id.0),
                TraceFlags::SAMPLED,
                true,
                TraceState::default(),
            );
            Link::new(context, Vec::new(), 0)
        })
        .collect();

    let status = match &record.status {
        SpanStatus::Ok => Status::Ok,
        SpanStatus::Error { message } => Status::error(message.clone()),
    };

    SpanData {
        span_context,
        parent_span_id,
        span_kind: to_otel_kind(record.kind),
        name: Cow::Owned(record.name.clone()),
        start_time: system_time(record.start_time_ns),
        end_time: system_time(record.end_time_ns),
        attributes,
        dropped_attributes_count: 0,
        events,
        links,
        status,
        instrumentation_scope: scope.clone(),
    }
}

fn to_otel_kind(kind: SpanKind) -> OtelSpanKind {
    match kind {
        SpanKind::Internal => OtelSpanKind::Internal,
        SpanKind::Server => OtelSpanKind::Server,
        SpanKind::Client => OtelSpanKind::Client,
        SpanKind::Producer => OtelSpanKind::Producer,
        SpanKind::Consumer => OtelSpanKind::Consumer,
    }
}

fn to_otel_value(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::String(s) => Value::String(s.clone().into()),
        AttributeValue::Int(i) => Value::I64(*i),
        AttributeValue::Float(f) => Value::F64(*f),
        AttributeValue::Bool(b) => Value::Bool(*b),
    }
}

fn system_time(nanos: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_nanos(nanos)
}
