//! The solver contract shared by point, population and ensemble solvers.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use ndarray::{Array1, Array2};

use crate::bounds::Bounds;
use crate::cancel::CancellationToken;
use crate::constraints::Constraints;
use crate::error::{Result, SolverError};
use crate::map::{EvaluationMap, Objective};
use crate::monitor::Monitor;
use crate::strategy::Strategy;
use crate::termination::Termination;

/// Solver family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    /// Improves a single point
    Point,
    /// Evolves a population
    Population,
    /// Drives a set of member solvers
    Ensemble,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolverStatus {
    /// Initialized, no generation run yet
    Ready,
    Running,
    Terminated { reason: String },
    /// Stopped at a generation boundary by a cancellation request; `solve` resumes
    Cancelled,
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverStatus::Ready => write!(f, "ready"),
            SolverStatus::Running => write!(f, "running"),
            SolverStatus::Terminated { reason } => write!(f, "terminated: {}", reason),
            SolverStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Committed state of a run. Only the owning solver mutates it; termination
/// criteria and monitors read it.
#[derive(Debug, Clone)]
pub struct SolverState {
    /// Completed generations
    pub generation: usize,
    /// Objective evaluations performed
    pub evaluations: usize,
    /// One row per member
    pub population: Array2<f64>,
    /// Penalised fitness of each member (lower is better)
    pub energies: Array1<f64>,
    pub best_solution: Array1<f64>,
    pub best_energy: f64,
    pub status: SolverStatus,
}

impl SolverState {
    /// Empty state for a `dim`-dimensional problem.
    pub fn new(dim: usize) -> Self {
        Self {
            generation: 0,
            evaluations: 0,
            population: Array2::zeros((0, dim)),
            energies: Array1::zeros(0),
            best_solution: Array1::zeros(dim),
            best_energy: f64::INFINITY,
            status: SolverStatus::Ready,
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.status, SolverStatus::Terminated { .. })
    }

    /// Stop reason, when terminated
    pub fn reason(&self) -> Option<&str> {
        match &self.status {
            SolverStatus::Terminated { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Opaque copy of what a solver's `step` commits, taken with
/// [`Solver::checkpoint`] and handed back to [`Solver::restore`].
pub struct Checkpoint(Box<dyn Any + Send>);

impl Checkpoint {
    pub fn new<T: Any + Send>(value: T) -> Self {
        Checkpoint(Box::new(value))
    }

    /// Fails when the checkpoint was taken from another kind of solver.
    pub fn into_inner<T: Any>(self) -> Result<T> {
        self.0.downcast::<T>().map(|b| *b).map_err(|_| {
            SolverError::Configuration("checkpoint belongs to a different solver".to_string())
        })
    }
}

impl fmt::Debug for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Checkpoint")
    }
}

/// A configurable, steppable optimiser.
///
/// Plug-ins are injected before the run; `step` performs one generation and
/// `solve` loops `step` until a stop condition, checking for cancellation at
/// every generation boundary.
pub trait Solver {
    fn kind(&self) -> SolverKind;

    /// Problem dimension
    fn dim(&self) -> usize;

    /// Draw the starting population within `bounds` (absent means unbounded)
    /// and seed the random stream (`None` draws a seed from OS entropy).
    fn initialize(
        &mut self,
        bounds: Option<Bounds>,
        population_size: usize,
        seed: Option<u64>,
    ) -> Result<()>;

    /// Solvers with a fixed move rule ignore the strategy.
    fn set_strategy(&mut self, strategy: Box<dyn Strategy>) {
        log::warn!("{:?} solver ignores strategy {}", self.kind(), strategy.name());
    }

    fn set_termination(&mut self, termination: Box<dyn Termination>);

    fn set_evaluation_map(&mut self, map: Box<dyn EvaluationMap>);

    fn set_constraints(&mut self, constraints: Constraints);

    /// Receives `(evaluations, best, best_energy)` once per generation.
    fn set_generation_monitor(&mut self, monitor: Arc<dyn Monitor>);

    /// Receives every evaluated trial.
    fn set_evaluation_monitor(&mut self, monitor: Arc<dyn Monitor>);

    /// Hard caps, enforced after the termination criterion.
    fn set_evaluation_limits(&mut self, generations: Option<usize>, evaluations: Option<usize>);

    /// Run one generation. Returns `true` when the run has terminated.
    fn step(&mut self, objective: &dyn Objective) -> Result<bool>;

    fn state(&self) -> &SolverState;

    /// Committed state, random stream and move-rule state; plug-ins are not included.
    fn checkpoint(&self) -> Checkpoint;

    /// Go back to `checkpoint`, which must come from this solver.
    fn restore(&mut self, checkpoint: Checkpoint) -> Result<()>;

    fn cancellation_token(&self) -> CancellationToken;

    /// Record that a cancellation request was observed between generations.
    fn mark_cancelled(&mut self);

    fn enable_signal_handler(&mut self) -> Result<()>;

    fn disable_signal_handler(&mut self);

    /// Step until terminated, cancelled, or `max_iterations` steps were run by
    /// this call. Calling `solve` again after a cancellation resumes from the
    /// last committed generation.
    fn solve(&mut self, objective: &dyn Objective, max_iterations: Option<usize>) -> Result<&SolverState> {
        let token = self.cancellation_token();
        let mut steps = 0usize;
        while !self.state().is_terminated() {
            if token.take() {
                log::warn!("Cancelled at generation {}", self.state().generation);
                self.mark_cancelled();
                break;
            }
            if max_iterations.is_some_and(|max| steps >= max) {
                break;
            }
            steps += 1;
            if self.step(objective)? {
                break;
            }
        }
        Ok(self.state())
    }

    fn best_solution(&self) -> &Array1<f64> {
        &self.state().best_solution
    }

    fn best_energy(&self) -> f64 {
        self.state().best_energy
    }
}
