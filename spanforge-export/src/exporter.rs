use async_trait::async_trait;
use thiserror::Error;

use spanforge_core::SpanRecord;

/// Errors from a span exporter.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export rejected: {0}")]
    Rejected(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("exporter is shut down")]
    ShutDown,
}

/// Sink for completed spans.
///
/// The engine treats the exporter as opaque: it hands over one finished
/// [`SpanRecord`] at a time and never learns the wire format. Handoff is
/// expected to be cheap; implementations that talk to a network buffer
/// internally. Implementations must be safe for concurrent use, as every
/// worker shares one exporter.
#[async_trait]
pub trait SpanExporter: Send + Sync {
    /// A short name for logs and health output.
    fn name(&self) -> &str;

    /// Accept one completed span.
    async fn export(&self, span: SpanRecord) -> Result<(), ExportError>;

    /// Probe whether the exporter can currently accept spans.
    async fn health_check(&self) -> Result<(), ExportError> {
        Ok(())
    }

    /// Flush buffered spans and release resources.
    async fn shutdown(&self) -> Result<(), ExportError> {
        Ok(())
    }
}
