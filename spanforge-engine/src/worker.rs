//! The worker pool that drives trace generation.
//!
//! N workers share one engine. Each worker owns its own RNG stream,
//! derived deterministically from the master seed, and loops: generate
//! one trace, then idle for a uniform random interval. Shutdown is
//! cooperative — the flag is checked between traces, never mid-trace, so
//! a trace in progress always finishes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::TraceEngine;

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of concurrent emitter workers.
    pub num_workers: usize,
    /// Minimum inter-trace idle time, seconds.
    pub interval_min: f64,
    /// Maximum inter-trace idle time, seconds.
    pub interval_max: f64,
    /// Master seed; per-worker seeds derive from it. Random when unset.
    pub rng_seed: Option<u64>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            num_workers: 4,
            interval_min: 0.5,
            interval_max: 2.0,
            rng_seed: None,
        }
    }
}

#[derive(Debug, Default)]
struct GeneratorStats {
    traces_generated: AtomicU64,
    traces_failed: AtomicU64,
}

/// A point-in-time view of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorStatus {
    pub running: bool,
    pub workers: usize,
    pub traces_generated: u64,
    pub traces_failed: u64,
}

/// Builds and starts the worker pool.
pub struct TraceGenerator {
    engine: Arc<TraceEngine>,
    config: WorkerConfig,
}

impl TraceGenerator {
    pub fn new(engine: Arc<TraceEngine>, config: WorkerConfig) -> Self {
        Self { engine, config }
    }

    /// Spawn the workers and return a handle for status and shutdown.
    pub fn start(self) -> GeneratorHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stats = Arc::new(GeneratorStats::default());
        let master_seed = self.config.rng_seed.unwrap_or_else(rand::random);

        let mut tasks = Vec::with_capacity(self.config.num_workers);
        for worker in 0..self.config.num_workers {
            let seed = derive_worker_seed(master_seed, worker);
            tasks.push(tokio::spawn(worker_loop(
                Arc::clone(&self.engine),
                self.config.clone(),
                worker,
                seed,
                shutdown_rx.clone(),
                Arc::clone(&stats),
            )));
        }

        info!(
            workers = self.config.num_workers,
            seed = master_seed,
            "trace generation started"
        );

        GeneratorHandle {
            tasks,
            shutdown_tx,
            stats,
            workers: self.config.num_workers,
        }
    }
}

/// Handle to a running pool.
pub struct GeneratorHandle {
    tasks: Vec<JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
    stats: Arc<GeneratorStats>,
    workers: usize,
}

impl GeneratorHandle {
    pub fn status(&self) -> GeneratorStatus {
        GeneratorStatus {
            running: self.tasks.iter().any(|t| !t.is_finished()),
            workers: self.workers,
            traces_generated: self.stats.traces_generated.load(Ordering::Relaxed),
            traces_failed: self.stats.traces_failed.load(Ordering::Relaxed),
        }
    }

    /// Signal shutdown and wait for every worker to finish its trace in
    /// progress and exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "worker task did not shut down cleanly");
            }
        }
        info!("trace generation stopped");
    }
}

async fn worker_loop(
    engine: Arc<TraceEngine>,
    config: WorkerConfig,
    worker: usize,
    seed: u64,
    mut shutdown_rx: watch::Receiver<bool>,
    stats: Arc<GeneratorStats>,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    info!(worker, "trace worker started");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        match engine.generate_trace(&mut rng).await {
            Ok(trace_id) => {
                stats.traces_generated.fetch_add(1, Ordering::Relaxed);
                debug!(worker, trace_id = %trace_id, "trace emitted");
            }
            Err(e) => {
                stats.traces_failed.fetch_add(1, Ordering::Relaxed);
                warn!(worker, error = %e, "trace aborted");
            }
        }

        let idle = Duration::from_secs_f64(
            rng.gen_range(config.interval_min..=config.interval_max),
        );
        tokio::select! {
            () = tokio::time::sleep(idle) => {}
            _ = shutdown_rx.changed() => {}
        }
    }

    info!(worker, "trace worker stopped");
}

/// Splitmix64 over the master seed and worker index, so workers get
/// decorrelated streams while the whole run stays reproducible.
fn derive_worker_seed(master: u64, worker: usize) -> u64 {
    let mut z = master.wrapping_add((worker as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
