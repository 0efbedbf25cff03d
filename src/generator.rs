use crate::config::Config;
use crate::grid::Grid;
use crate::solver::{FillSolver, FillStats};
use crate::word_index::WordIndex;
use crate::{CrosswordError, Result};
use crossbeam::channel::{self, RecvTimeoutError};
use rayon::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// A filled grid together with the request that produced it.
#[derive(Debug, Clone)]
pub struct Generated {
    pub grid: Grid,
    pub stats: FillStats,
    pub config: Config,
}

pub struct PuzzleGenerator<'a> {
    index: &'a WordIndex,
    workers: usize,
}

impl<'a> PuzzleGenerator<'a> {
    pub fn new(index: &'a WordIndex) -> Self {
        Self {
            index,
            workers: num_cpus::get(),
        }
    }

    /// Caps the worker count used by `generate_batch`.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Validates the request, lays out the blocks and fills the grid.
    /// An invalid config fails before the index is consulted.
    pub fn generate(&self, config: &Config) -> Result<Generated> {
        config.validate()?;
        let skeleton = Grid::empty(config.size, &config.pattern, config.seed)?;
        debug!("Skeleton for seed {}:\n{}", config.seed, skeleton);

        let (grid, stats) = FillSolver::new(self.index, config).fill(&skeleton)?;
        Ok(Generated {
            grid,
            stats,
            config: config.clone(),
        })
    }

    /// Runs every request on its own worker. Results line up with `configs`
    /// and a failed request never affects its siblings.
    pub fn generate_batch(&self, configs: &[Config]) -> Vec<Result<Generated>> {
        let run = || -> Vec<Result<Generated>> {
            configs.par_iter().map(|config| self.generate(config)).collect()
        };
        match rayon::ThreadPoolBuilder::new().num_threads(self.workers).build() {
            Ok(pool) => pool.install(run),
            Err(e) => {
                warn!("Falling back to the global thread pool: {}", e);
                run()
            }
        }
    }
}

/// Generates on a background thread, giving up after `timeout`.
///
/// The solver has no cancellation hook, so a timed-out worker is left to
/// finish on its own; its result is discarded. A timeout is reported as
/// `NoSolution` with zero completed attempts.
pub fn generate_with_timeout(
    index: Arc<WordIndex>,
    config: Config,
    timeout: Duration,
) -> Result<Generated> {
    let (tx, rx) = channel::bounded(1);
    thread::spawn(move || {
        let result = PuzzleGenerator::new(&index).generate(&config);
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            warn!("Generation timed out after {:?}", timeout);
            Err(CrosswordError::NoSolution { attempts: 0 })
        }
        Err(RecvTimeoutError::Disconnected) => {
            warn!("Generation worker exited without a result");
            Err(CrosswordError::NoSolution { attempts: 0 })
        }
    }
}
