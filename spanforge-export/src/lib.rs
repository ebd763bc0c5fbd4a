pub mod exporter;
pub mod otlp;
pub mod recording;

pub use exporter::{ExportError, SpanExporter};
pub use otlp::{OtlpConfig, OtlpProtocol, OtlpSpanExporter};
pub use recording::{FailureMode, RecordingSpanExporter};
