//! Objectives and batch evaluation maps.
//!
//! Solvers never call the objective directly: every batch of candidate
//! vectors goes through an [`EvaluationMap`], which may fan the batch out to
//! worker threads. Output order always equals input order, and a failure on
//! any vector (an `Err` or a panic) fails the whole batch.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::str::FromStr;

use ndarray::Array1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ObjectiveError, Result, SolverError};

/// Scalar objective to minimise.
pub trait Objective: Sync {
    fn evaluate(&self, x: &Array1<f64>) -> std::result::Result<f64, ObjectiveError>;

    /// Fixed arity of the objective, when known; checked before the first generation.
    fn dimension(&self) -> Option<usize> {
        None
    }
}

impl<F> Objective for F
where
    F: Fn(&Array1<f64>) -> f64 + Sync,
{
    fn evaluate(&self, x: &Array1<f64>) -> std::result::Result<f64, ObjectiveError> {
        Ok(self(x))
    }
}

/// Adapter for objectives that can fail.
pub struct Fallible<F>(pub F);

impl<F> Objective for Fallible<F>
where
    F: Fn(&Array1<f64>) -> std::result::Result<f64, ObjectiveError> + Sync,
{
    fn evaluate(&self, x: &Array1<f64>) -> std::result::Result<f64, ObjectiveError> {
        (self.0)(x)
    }
}

/// Negates an objective so that minimising it maximises the wrapped one.
pub struct Maximize<O>(pub O);

impl<O: Objective> Objective for Maximize<O> {
    fn evaluate(&self, x: &Array1<f64>) -> std::result::Result<f64, ObjectiveError> {
        self.0.evaluate(x).map(|v| -v)
    }

    fn dimension(&self) -> Option<usize> {
        self.0.dimension()
    }
}

/// Objective with a declared arity.
pub struct WithDimension<O> {
    pub objective: O,
    pub dim: usize,
}

impl<O: Objective> Objective for WithDimension<O> {
    fn evaluate(&self, x: &Array1<f64>) -> std::result::Result<f64, ObjectiveError> {
        self.objective.evaluate(x)
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dim)
    }
}

/// Evaluate one vector, turning an objective error or panic into [`SolverError::Evaluation`].
pub fn evaluate_one(objective: &dyn Objective, index: usize, x: &Array1<f64>) -> Result<f64> {
    match catch_unwind(AssertUnwindSafe(|| objective.evaluate(x))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(SolverError::Evaluation { index, message: e.to_string() }),
        Err(payload) => {
            let message = if let Some(s) = payload.downcast_ref::<&str>() {
                format!("objective panicked: {}", s)
            } else if let Some(s) = payload.downcast_ref::<String>() {
                format!("objective panicked: {}", s)
            } else {
                "objective panicked".to_string()
            };
            Err(SolverError::Evaluation { index, message })
        }
    }
}

/// Batch evaluator.
pub trait EvaluationMap: Send + Sync {
    /// Evaluate every vector; `result[i]` belongs to `vectors[i]`.
    fn evaluate(&self, objective: &dyn Objective, vectors: &[Array1<f64>]) -> Result<Vec<f64>>;

    /// Run `task(i)` once for every `i < n`. Ensembles dispatch member steps
    /// through this; the default runs them in order on the calling thread.
    fn run_indexed(&self, n: usize, task: &(dyn Fn(usize) + Sync)) {
        (0..n).for_each(task);
    }

    fn name(&self) -> &str;
}

/// Evaluates in the calling thread, stopping at the first failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialMap;

impl EvaluationMap for SerialMap {
    fn evaluate(&self, objective: &dyn Objective, vectors: &[Array1<f64>]) -> Result<Vec<f64>> {
        vectors.iter().enumerate().map(|(i, x)| evaluate_one(objective, i, x)).collect()
    }

    fn name(&self) -> &str {
        "serial"
    }
}

/// Rayon-backed map; uses the global pool unless built with a thread count.
pub struct ThreadedMap {
    pool: Option<rayon::ThreadPool>,
    /// Batches smaller than this are evaluated sequentially
    pub min_batch: usize,
}

impl Default for ThreadedMap {
    fn default() -> Self {
        Self { pool: None, min_batch: 4 }
    }
}

impl fmt::Debug for ThreadedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadedMap")
            .field("num_threads", &self.num_threads())
            .field("min_batch", &self.min_batch)
            .finish()
    }
}

impl ThreadedMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dedicated pool with `num_threads` workers.
    pub fn with_threads(num_threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("evosolve-map-{}", i))
            .build()
            .map_err(|e| SolverError::Configuration(format!("cannot build thread pool: {}", e)))?;
        Ok(Self { pool: Some(pool), min_batch: 4 })
    }

    pub fn min_batch(mut self, min_batch: usize) -> Self {
        self.min_batch = min_batch;
        self
    }

    pub fn num_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }
}

impl EvaluationMap for ThreadedMap {
    fn evaluate(&self, objective: &dyn Objective, vectors: &[Array1<f64>]) -> Result<Vec<f64>> {
        if vectors.len() < self.min_batch {
            return SerialMap.evaluate(objective, vectors);
        }
        let run = || -> Vec<Result<f64>> {
            vectors.par_iter().enumerate().map(|(i, x)| evaluate_one(objective, i, x)).collect()
        };
        let results = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };
        // the first Err in index order wins
        results.into_iter().collect()
    }

    fn run_indexed(&self, n: usize, task: &(dyn Fn(usize) + Sync)) {
        let run = || (0..n).into_par_iter().for_each(|i| task(i));
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    fn name(&self) -> &str {
        "threaded"
    }
}

/// Dedicated rayon pool; each worker evaluates one contiguous chunk of the batch.
pub struct WorkerPoolMap {
    pool: rayon::ThreadPool,
}

impl fmt::Debug for WorkerPoolMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPoolMap").field("workers", &self.workers()).finish()
    }
}

impl WorkerPoolMap {
    pub fn new(workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("evosolve-worker-{}", i))
            .build()
            .map_err(|e| SolverError::Configuration(format!("cannot build worker pool: {}", e)))?;
        Ok(Self { pool })
    }

    /// One worker per logical core.
    pub fn per_core() -> Result<Self> {
        Self::new(num_cpus::get())
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl EvaluationMap for WorkerPoolMap {
    fn evaluate(&self, objective: &dyn Objective, vectors: &[Array1<f64>]) -> Result<Vec<f64>> {
        if vectors.is_empty() {
            return Ok(Vec::new());
        }
        let chunk = vectors.len().div_ceil(self.workers());
        let parts: Vec<Vec<Result<f64>>> = self.pool.install(|| {
            vectors
                .par_chunks(chunk)
                .enumerate()
                .map(|(c, part)| {
                    let offset = c * chunk;
                    part.iter()
                        .enumerate()
                        .map(|(k, x)| evaluate_one(objective, offset + k, x))
                        .collect::<Vec<_>>()
                })
                .collect()
        });
        // the first Err in index order wins
        parts.into_iter().flatten().collect()
    }

    fn run_indexed(&self, n: usize, task: &(dyn Fn(usize) + Sync)) {
        self.pool.install(|| (0..n).into_par_iter().for_each(|i| task(i)));
    }

    fn name(&self) -> &str {
        "pool"
    }
}

/// Named map backends for configuration files and the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapKind {
    #[default]
    Serial,
    Threaded,
    WorkerPool,
}

impl MapKind {
    pub fn build(&self, num_threads: Option<usize>) -> Result<Box<dyn EvaluationMap>> {
        Ok(match (self, num_threads) {
            (MapKind::Serial, _) => Box::new(SerialMap),
            (MapKind::Threaded, Some(n)) if n > 0 => Box::new(ThreadedMap::with_threads(n)?),
            (MapKind::Threaded, _) => Box::new(ThreadedMap::new()),
            (MapKind::WorkerPool, Some(n)) if n > 0 => Box::new(WorkerPoolMap::new(n)?),
            (MapKind::WorkerPool, _) => Box::new(WorkerPoolMap::per_core()?),
        })
    }
}

impl FromStr for MapKind {
    type Err = SolverError;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "serial" => Ok(MapKind::Serial),
            "threaded" | "rayon" | "parallel" => Ok(MapKind::Threaded),
            "pool" | "workers" | "worker_pool" | "worker-pool" => Ok(MapKind::WorkerPool),
            _ => Err(SolverError::Configuration(format!("unknown evaluation map: {}", s))),
        }
    }
}
