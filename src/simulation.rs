// Run orchestration: partitions the configured cascades across a fixed
// worker pool, hands every worker the same shared random stream and output
// writer, and tracks completion with an atomic counter that other threads
// may query while the run is in flight.

use crate::cascade::Cascade;
use crate::config::Config;
use crate::error::Result;
use crate::output::{self, OutputWriter};
use crate::rng::SharedRng;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Totals reported once every worker has finished.
#[derive(Debug)]
pub struct SimulationSummary {
    pub cascades: usize,
    pub particles: u64,
    pub flagged_events: u64,
    /// Cascades whose batch could not be persisted. Transport still ran.
    pub write_failures: u64,
    pub output_path: PathBuf,
}

/// A configured simulation, ready to run once and queryable for progress
/// while running.
pub struct Simulation {
    config: Arc<Config>,
    rng: SharedRng,
    progress: AtomicU64,
}

impl Simulation {
    /// Validate the configuration and seed the shared random stream.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let rng = SharedRng::seed_from(config.seed);
        Ok(Simulation {
            config: Arc::new(config),
            rng,
            progress: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cascades completed so far. Best-effort: safe to call from any thread
    /// while `initiate` is running.
    pub fn progress(&self) -> u64 {
        self.progress.load(Ordering::Relaxed)
    }

    /// Run every configured cascade to completion and persist each one's
    /// batch. A failed write is logged and counted but does not stop the
    /// remaining cascades.
    pub fn initiate(&self) -> Result<SimulationSummary> {
        log::debug!("effective configuration:\n{}", self.config.describe());
        output::prepare_output_files(&self.config)?;
        let writer = OutputWriter::create(&self.config)?;

        let shares = partition(self.config.cascade_count, self.config.thread_count);
        let particles = AtomicU64::new(0);
        let flagged = AtomicU64::new(0);
        let write_failures = AtomicU64::new(0);

        std::thread::scope(|scope| {
            let mut next_id = 0usize;
            for share in &shares {
                let first_id = next_id;
                next_id += share;
                let config = &self.config;
                let rng = &self.rng;
                let writer = &writer;
                let progress = &self.progress;
                let particles = &particles;
                let flagged = &flagged;
                let write_failures = &write_failures;
                let share = *share;
                scope.spawn(move || {
                    for id in first_id..first_id + share {
                        let mut cascade = Cascade::new(id, config);
                        cascade.run(config, rng);
                        particles.fetch_add(cascade.particle_count() as u64, Ordering::Relaxed);
                        flagged.fetch_add(u64::from(cascade.flagged_events()), Ordering::Relaxed);
                        if let Err(e) = writer.write_cascade(cascade.records()) {
                            log::error!("cascade {}: failed to persist batch: {}", id, e);
                            write_failures.fetch_add(1, Ordering::Relaxed);
                        }
                        let done = progress.fetch_add(1, Ordering::Relaxed) + 1;
                        if config.report_progress {
                            log::info!("cascade {} of {} complete", done, config.cascade_count);
                        }
                    }
                });
            }
        });

        let summary = SimulationSummary {
            cascades: self.config.cascade_count,
            particles: particles.into_inner(),
            flagged_events: flagged.into_inner(),
            write_failures: write_failures.into_inner(),
            output_path: self.config.output_path(self.config.output_kind),
        };
        if summary.flagged_events > 0 {
            log::warn!(
                "{} collision events recovered with a fallback root",
                summary.flagged_events
            );
        }
        Ok(summary)
    }
}

/// Split `count` cascades across `threads` workers: an even share each,
/// with the remainder spread one apiece over the first workers.
pub(crate) fn partition(count: usize, threads: usize) -> Vec<usize> {
    let base = count / threads;
    let remainder = count % threads;
    (0..threads)
        .map(|w| base + usize::from(w < remainder))
        .collect()
}
