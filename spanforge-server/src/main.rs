mod config;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use spanforge_engine::{ContextStore, TraceEngine, TraceGenerator, WorkerConfig};
use spanforge_export::{OtlpConfig, OtlpProtocol, OtlpSpanExporter, SpanExporter};
use spanforge_scenario::{load_scenarios, LoadError};
use spanforge_store::{InMemoryTraceStore, TraceStore};

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber from RUST_LOG or default to info.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::parse();
    if let Err(reason) = config.validate() {
        error!(%reason, "invalid configuration");
        std::process::exit(1);
    }
    config.log_summary();

    // Validation is all-or-nothing: emission never starts against a
    // partially accepted library.
    let scenarios = match load_scenarios(&config.scenarios_dir) {
        Ok(set) => Arc::new(set),
        Err(LoadError::Invalid(issues)) => {
            error!(count = issues.len(), "scenario validation failed");
            for issue in &issues {
                error!("  - {issue}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "failed to load scenarios");
            std::process::exit(1);
        }
    };
    info!(
        scenarios = scenarios.len(),
        services = scenarios.services.len(),
        "scenario library loaded"
    );

    let protocol: OtlpProtocol = config.otlp_protocol.parse().unwrap_or_else(|e| {
        warn!(reason = %e, "defaulting to gRPC");
        OtlpProtocol::Grpc
    });
    let exporter: Arc<dyn SpanExporter> = Arc::new(OtlpSpanExporter::new(&OtlpConfig {
        endpoint: config.otlp_endpoint.clone(),
        protocol,
        timeout: Duration::from_secs(10),
    })?);

    let trace_store = Arc::new(InMemoryTraceStore::new(config.inmemory_max_traces));
    if !trace_store.health_check().await {
        error!("trace store health check failed");
        std::process::exit(1);
    }

    let context_store = Arc::new(ContextStore::new(config.context_store_max_size));
    let engine = TraceEngine::new(
        Arc::clone(&scenarios),
        Arc::clone(&exporter),
        context_store,
        config.max_template_iterations,
    )?
    .with_trace_store(Arc::clone(&trace_store) as Arc<dyn TraceStore>);

    let handle = TraceGenerator::new(
        Arc::new(engine),
        WorkerConfig {
            num_workers: config.trace_num_workers,
            interval_min: config.trace_interval_min,
            interval_max: config.trace_interval_max,
            rng_seed: config.rng_seed,
        },
    )
    .start();

    shutdown_signal().await;

    let status = handle.status();
    info!(
        traces_generated = status.traces_generated,
        traces_failed = status.traces_failed,
        "shutting down"
    );
    handle.shutdown().await;

    if let Err(e) = exporter.shutdown().await {
        warn!(error = %e, "exporter shutdown failed");
    }

    let counts = trace_store.trace_counts();
    info!(
        stored = counts.total,
        errors = counts.errors,
        "spanforge shut down"
    );
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
