//! Pluggable derivative-free global optimisation in pure Rust using ndarray
//!
//! The crate is organised around a small [`Solver`] contract with three
//! implementations:
//!
//! - [`DifferentialEvolutionSolver`]: population-based DE (SciPy-style strategies)
//! - [`PatternSearchSolver`]: a compass search on a single point
//! - [`EnsembleSolver`]: drives many member solvers from grid or scattershot start points
//!
//! Every solver is configured by injecting plug-ins:
//!
//! - a [`Strategy`] producing trial vectors (DE only)
//! - a [`Termination`] criterion, composable with [`TerminationExt::or`] / [`TerminationExt::and`]
//! - an [`EvaluationMap`] deciding how a batch of trials is evaluated (serial, rayon, worker pool)
//! - [`Constraints`]: an idempotent [`Repair`] and a [`Penalty`]
//! - generation and evaluation [`Monitor`]s
//!
//! Runs are deterministic for a given seed, can be stepped one generation at
//! a time, and can be cancelled between generations and resumed.
//!
//! # Example
//!
//! ```rust
//! use evosolve::{Bounds, DifferentialEvolutionSolver, MaxGenerations, Solver, TerminationExt, VTR};
//! use ndarray::Array1;
//!
//! let sphere = |x: &Array1<f64>| x.iter().map(|v| v * v).sum::<f64>();
//! let mut solver = DifferentialEvolutionSolver::with_defaults(2);
//! solver.set_termination(Box::new(MaxGenerations(300).or(VTR { target: 1e-10 })));
//! solver.initialize(Some(Bounds::from_pairs(&[(-5.0, 5.0); 2])?), 20, Some(42))?;
//! let state = solver.solve(&sphere, None)?;
//! assert!(state.best_energy < 1e-6);
//! # Ok::<(), evosolve::SolverError>(())
//! ```

use ndarray::Array1;
use serde::{Deserialize, Serialize};

pub mod bounds;
pub mod cancel;
pub mod config;
pub mod constraints;
pub mod error;
pub mod map;
pub mod monitor;
pub mod nested;
pub mod pattern_search;
pub mod solver;
pub mod strategy;
pub mod termination;

pub mod differential_evolution;
pub mod impl_helpers;

pub(crate) mod distinct_indices;
pub(crate) mod init_latin_hypercube;
pub(crate) mod init_random;

pub(crate) mod mutant_best1;
pub(crate) mod mutant_best2;
pub(crate) mod mutant_current_to_best1;
pub(crate) mod mutant_rand_to_best1;
pub(crate) mod mutant_rand1;
pub(crate) mod mutant_rand2;

pub(crate) mod crossover_binomial;
pub(crate) mod crossover_exponential;

pub use bounds::{Bounds, DEFAULT_RANGE};
pub use cancel::{CancellationToken, SignalRegistration};
pub use config::{DEConfig, DEConfigBuilder};
pub use constraints::{
    ClipToBounds, Constraints, Integrality, LinearPenalty, NonlinearConstraintHelper, Penalty,
    PenaltySet, QuadraticEquality, QuadraticInequality, Repair, RepairChain,
};
pub use differential_evolution::{DifferentialEvolutionSolver, differential_evolution};
pub use error::{ObjectiveError, Result, SolverError};
pub use impl_helpers::DEReport;
pub use map::{
    EvaluationMap, Fallible, MapKind, Maximize, Objective, SerialMap, ThreadedMap, WithDimension,
    WorkerPoolMap,
};
pub use monitor::{CsvMonitor, MemoryMonitor, Monitor, MonitorRecord, NullMonitor, VerboseMonitor};
pub use nested::{EnsembleSolver, SolverFactory, StartPoints};
pub use pattern_search::PatternSearchSolver;
pub use solver::{Checkpoint, Solver, SolverKind, SolverState, SolverStatus};
pub use strategy::{Crossover, DifferentialStrategy, Mutation, Strategy, StrategyVariant};
pub use termination::{
    And, CandidateRelativeTolerance, ChangeOverGeneration, MaxEvaluations, MaxGenerations, Never,
    NormalizedChangeOverGeneration, Or, PopulationEnergyStd, Stagnation, Termination,
    TerminationConfig, TerminationExt, VTR,
};

/// Index and value of the smallest finite-or-infinite entry; NaN entries are skipped.
pub(crate) fn argmin(v: &Array1<f64>) -> (usize, f64) {
    let mut best_i = 0usize;
    let mut best_v = f64::INFINITY;
    for (i, &val) in v.iter().enumerate() {
        if val < best_v {
            best_v = val;
            best_i = i;
        }
    }
    (best_i, best_v)
}

/// Initialization scheme for the population
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Init {
    #[default]
    LatinHypercube,
    Random,
}
