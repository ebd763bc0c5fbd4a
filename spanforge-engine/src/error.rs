use thiserror::Error;

use spanforge_export::ExportError;
use spanforge_scenario::ResolveError;

/// Errors building an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("scenario set is empty")]
    NoScenarios,
}

/// Errors that abort one trace.
///
/// Neither variant stops the worker pool: the failing trace is logged and
/// counted, and the worker continues with the next one. Simulated span
/// failures from `error_conditions` are data on the span, never a
/// `TraceError`.
#[derive(Debug, Error)]
pub enum TraceError {
    /// Template resolution failed; the whole trace is abandoned.
    #[error("template resolution failed: {0}")]
    Template(#[from] ResolveError),

    /// The exporter rejected a span; the remainder of the trace is dropped
    /// and not retried.
    #[error("exporter rejected span: {0}")]
    Export(#[from] ExportError),
}
