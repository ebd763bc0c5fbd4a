use std::path::PathBuf;

use clap::Parser;
use tracing::info;

/// Synthetic OpenTelemetry trace generator.
///
/// Every option can also be set through the environment variable named in
/// its help text; flags take precedence.
#[derive(Parser, Debug)]
#[command(
    name = "spanforge",
    about = "Continuously emits synthetic OTLP traces from declarative scenarios"
)]
pub struct ServerConfig {
    /// Directory of scenario documents (`_base.yaml` plus scenario files).
    #[arg(long, env = "SCENARIOS_DIR", default_value = "scenarios")]
    pub scenarios_dir: PathBuf,

    /// Minimum per-worker idle time between traces, in seconds.
    #[arg(long, env = "TRACE_INTERVAL_MIN", default_value_t = 0.5)]
    pub trace_interval_min: f64,

    /// Maximum per-worker idle time between traces, in seconds.
    #[arg(long, env = "TRACE_INTERVAL_MAX", default_value_t = 2.0)]
    pub trace_interval_max: f64,

    /// Number of concurrent emitter workers.
    #[arg(long, env = "TRACE_NUM_WORKERS", default_value_t = 4)]
    pub trace_num_workers: usize,

    /// Fixed-point bound for template resolution.
    #[arg(long, env = "MAX_TEMPLATE_ITERATIONS", default_value_t = 10)]
    pub max_template_iterations: usize,

    /// Maximum number of retained cross-trace contexts.
    #[arg(long, env = "CONTEXT_STORE_MAX_SIZE", default_value_t = 100)]
    pub context_store_max_size: usize,

    /// Master RNG seed; set it to make a run reproducible.
    #[arg(long, env = "RNG_SEED")]
    pub rng_seed: Option<u64>,

    /// OTLP collector endpoint.
    #[arg(
        long,
        env = "OTEL_EXPORTER_OTLP_ENDPOINT",
        default_value = "http://localhost:4317"
    )]
    pub otlp_endpoint: String,

    /// OTLP wire protocol: `grpc` or `http`.
    #[arg(long, env = "OTLP_PROTOCOL", default_value = "grpc")]
    pub otlp_protocol: String,

    /// Completed traces retained by the in-memory store.
    #[arg(long, env = "INMEMORY_MAX_TRACES", default_value_t = 100)]
    pub inmemory_max_traces: usize,
}

impl ServerConfig {
    /// Cross-field checks clap cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.trace_interval_min < 0.0 {
            return Err("trace-interval-min must be non-negative".to_owned());
        }
        if self.trace_interval_max < self.trace_interval_min {
            return Err(format!(
                "trace-interval-max ({}) is below trace-interval-min ({})",
                self.trace_interval_max, self.trace_interval_min
            ));
        }
        if self.trace_num_workers == 0 {
            return Err("trace-num-workers must be at least 1".to_owned());
        }
        Ok(())
    }

    /// Log the effective configuration at startup.
    pub fn log_summary(&self) {
        info!(scenarios_dir = %self.scenarios_dir.display(), "scenarios");
        info!(
            endpoint = %self.otlp_endpoint,
            protocol = %self.otlp_protocol,
            "otlp exporter"
        );
        info!(
            workers = self.trace_num_workers,
            interval_min = self.trace_interval_min,
            interval_max = self.trace_interval_max,
            "worker pool"
        );
        info!(
            context_store_max_size = self.context_store_max_size,
            max_template_iterations = self.max_template_iterations,
            inmemory_max_traces = self.inmemory_max_traces,
            seed = ?self.rng_seed,
            "engine"
        );
    }
}
