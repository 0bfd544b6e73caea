//! Parallel processing utilities

use crate::error::{Result, SelectionError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for parallel processing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Number of worker threads; `None` runs everything on the calling thread
    /// and `Some(0)` uses every available core
    pub n_jobs: Option<usize>,
}

impl ParallelConfig {
    /// Create a new parallel configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set number of threads
    pub fn with_jobs(mut self, n: usize) -> Self {
        self.n_jobs = Some(n);
        self
    }

    /// Get the number of threads to use
    pub fn num_threads(&self) -> usize {
        match self.n_jobs {
            None => 1,
            Some(0) => rayon::current_num_threads(),
            Some(n) => n,
        }
    }

    /// Build the executor for one fit call
    pub fn executor(&self) -> Result<Executor> {
        let pool = match self.n_jobs {
            None => None,
            Some(_) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(self.num_threads())
                    .build()
                    .map_err(|e| SelectionError::ThreadPoolError(e.to_string()))?,
            ),
        };
        Ok(Executor { pool })
    }
}

/// Runs independent jobs either inline or on a dedicated rayon pool.
///
/// Results always come back in input order.
#[derive(Debug, Default)]
pub struct Executor {
    pool: Option<rayon::ThreadPool>,
}

impl Executor {
    /// Executor that never spawns threads
    pub fn sequential() -> Self {
        Self { pool: None }
    }

    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    /// Map over `items`, returning the error of the lowest-index item that
    /// failed. The sequential path stops there; the pool runs every item.
    pub fn try_map<T, U, F>(&self, items: &[T], f: F) -> Result<Vec<U>>
    where
        T: Sync,
        U: Send,
        F: Fn(&T) -> Result<U> + Send + Sync,
    {
        match &self.pool {
            Some(pool) => {
                let results: Vec<Result<U>> = pool.install(|| items.par_iter().map(&f).collect());
                results.into_iter().collect()
            }
            None => items.iter().map(f).collect(),
        }
    }

    /// Map over `items`, keeping every outcome
    pub fn map<T, U, F>(&self, items: &[T], f: F) -> Vec<U>
    where
        T: Sync,
        U: Send,
        F: Fn(&T) -> U + Send + Sync,
    {
        match &self.pool {
            Some(pool) => pool.install(|| items.par_iter().map(&f).collect()),
            None => items.iter().map(f).collect(),
        }
    }
}
