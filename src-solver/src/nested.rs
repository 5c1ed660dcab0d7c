//! Ensemble of independent solvers started from a grid or a random scatter
//! of points.
//!
//! The ensemble owns its members and steps each of them once per generation.
//! Its own state is an aggregate: one population row per member holding that
//! member's best point, the total evaluation count, and the best point seen
//! across all members.

use std::sync::Arc;

use ndarray::{Array1, Array2};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::argmin;
use crate::bounds::Bounds;
use crate::cancel::{CancellationToken, SignalRegistration};
use crate::constraints::Constraints;
use crate::error::{Result, SolverError};
use crate::init_random::init_random;
use crate::map::{EvaluationMap, Objective, SerialMap};
use crate::monitor::{Monitor, NullMonitor};
use crate::pattern_search::PatternSearchSolver;
use crate::solver::{Checkpoint, Solver, SolverKind, SolverState, SolverStatus};
use crate::termination::Termination;

/// Builds member `index`, started at `start`, seeded with `seed`.
/// The returned solver must already be initialized.
pub type SolverFactory =
    Box<dyn Fn(usize, &Array1<f64>, Option<u64>) -> Result<Box<dyn Solver + Send>> + Send + Sync>;

/// How the ensemble places its members' start points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartPoints {
    /// Centres of a regular grid; `bins` has one entry per dimension, or a
    /// single entry used for every dimension
    Grid { bins: Vec<usize> },
    /// `npts` points drawn uniformly in the bounds
    Scattershot { npts: usize },
}

impl StartPoints {
    /// Generate the start points, one row each.
    pub fn generate(&self, bounds: &Bounds, rng: &mut StdRng) -> Result<Array2<f64>> {
        match self {
            StartPoints::Grid { bins } => grid_centres(bins, bounds),
            StartPoints::Scattershot { npts } => Ok(init_random(*npts, bounds, rng)),
        }
    }
}

fn grid_centres(bins: &[usize], bounds: &Bounds) -> Result<Array2<f64>> {
    let n = bounds.dim();
    let bins: Vec<usize> = match bins.len() {
        1 => vec![bins[0]; n],
        len if len == n => bins.to_vec(),
        len => return Err(SolverError::dimension("grid bins", n, len)),
    };
    if bins.contains(&0) {
        return Err(SolverError::Configuration("grid bins must be at least 1".to_string()));
    }
    // fixed dimensions collapse to one point
    let bins: Vec<usize> = bins
        .iter()
        .enumerate()
        .map(|(j, &b)| if bounds.is_free(j) { b } else { 1 })
        .collect();

    let total: usize = bins.iter().product();
    let (lower, span) = (bounds.lower(), bounds.span());
    let mut points = Array2::<f64>::zeros((total, n));
    for k in 0..total {
        let mut rest = k;
        for j in (0..n).rev() {
            let cell = rest % bins[j];
            rest /= bins[j];
            points[(k, j)] = if bounds.is_free(j) {
                lower[j] + (cell as f64 + 0.5) * span[j] / bins[j] as f64
            } else {
                lower[j]
            };
        }
    }
    Ok(points)
}

struct EnsembleCheckpoint {
    state: SolverState,
    stopped: Vec<bool>,
    members: Vec<Checkpoint>,
}

pub struct EnsembleSolver {
    dim: usize,
    factory: SolverFactory,
    start_points: StartPoints,
    /// Dispatches member steps
    map: Box<dyn EvaluationMap>,
    members: Vec<Box<dyn Solver + Send>>,
    stopped: Vec<bool>,
    termination: Option<Box<dyn Termination>>,
    constraints: Option<Constraints>,
    evaluation_monitor: Option<Arc<dyn Monitor>>,
    generation_monitor: Arc<dyn Monitor>,
    max_generations: Option<usize>,
    max_evaluations: Option<usize>,
    state: SolverState,
    initialized: bool,
    cancel: CancellationToken,
    signal: SignalRegistration,
}

impl EnsembleSolver {
    pub fn new(dim: usize, start_points: StartPoints, factory: SolverFactory) -> Self {
        Self {
            dim,
            factory,
            start_points,
            map: Box::new(SerialMap),
            members: Vec::new(),
            stopped: Vec::new(),
            termination: None,
            constraints: None,
            evaluation_monitor: None,
            generation_monitor: Arc::new(NullMonitor),
            max_generations: None,
            max_evaluations: None,
            state: SolverState::new(dim),
            initialized: false,
            cancel: CancellationToken::new(),
            signal: SignalRegistration::default(),
        }
    }

    /// Ensemble of compass searches, each started at one of `start_points`.
    pub fn with_pattern_search(dim: usize, start_points: StartPoints, bounds: Option<Bounds>) -> Self {
        let factory: SolverFactory = Box::new(move |_: usize, start: &Array1<f64>, seed: Option<u64>| {
            let mut member = PatternSearchSolver::new(dim);
            member.initialize(bounds.clone(), 1, seed)?;
            member.set_initial_guess(start)?;
            Ok(Box::new(member) as Box<dyn Solver + Send>)
        });
        Self::new(dim, start_points, factory)
    }

    pub fn with_map(mut self, map: Box<dyn EvaluationMap>) -> Self {
        self.map = map;
        self
    }

    pub fn members(&self) -> &[Box<dyn Solver + Send>] {
        &self.members
    }

    /// Members that have not terminated yet
    pub fn active_members(&self) -> usize {
        self.stopped.iter().filter(|&&s| !s).count()
    }

    fn aggregate(&mut self) {
        let n = self.members.len();
        let mut population = Array2::<f64>::zeros((n, self.dim));
        let mut energies = Array1::<f64>::zeros(n);
        let mut evaluations = 0;
        for (i, m) in self.members.iter().enumerate() {
            population.row_mut(i).assign(m.best_solution());
            energies[i] = m.best_energy();
            evaluations += m.state().evaluations;
        }
        let (k, f) = argmin(&energies);
        if f < self.state.best_energy {
            self.state.best_energy = f;
            self.state.best_solution = population.row(k).to_owned();
        }
        self.state.population = population;
        self.state.energies = energies;
        self.state.evaluations = evaluations;
    }

    fn stop_reason(&mut self) -> Option<String> {
        if let Some(t) = self.termination.as_deref_mut() {
            if t.should_stop(&self.state) {
                return Some(t.reason());
            }
        }
        if self.stopped.iter().all(|&s| s) {
            return Some("All members stopped".to_string());
        }
        if let Some(max) = self.max_generations {
            if self.state.generation >= max {
                return Some(format!("Maximum generations reached: {}", max));
            }
        }
        if let Some(max) = self.max_evaluations {
            if self.state.evaluations >= max {
                return Some(format!("Maximum evaluations reached: {}", max));
            }
        }
        None
    }
}

impl Solver for EnsembleSolver {
    fn kind(&self) -> SolverKind {
        SolverKind::Ensemble
    }

    fn dim(&self) -> usize {
        self.dim
    }

    /// `bounds` place the start points (the default range when absent);
    /// members receive `seed + i + 1`. `population_size` is unused: the
    /// start points decide the member count.
    fn initialize(
        &mut self,
        bounds: Option<Bounds>,
        population_size: usize,
        seed: Option<u64>,
    ) -> Result<()> {
        if self.dim == 0 {
            return Err(SolverError::Configuration("problem dimension must be at least 1".into()));
        }
        if let Some(b) = &bounds {
            if b.dim() != self.dim {
                return Err(SolverError::dimension("bounds", self.dim, b.dim()));
            }
        }
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => {
                let mut thread_rng = rand::rng();
                StdRng::from_rng(&mut thread_rng)
            }
        };
        let draw_box = bounds.unwrap_or_else(|| Bounds::default_range(self.dim));
        let starts = self.start_points.generate(&draw_box, &mut rng)?;
        if starts.nrows() == 0 {
            return Err(SolverError::Configuration("ensemble has no start points".to_string()));
        }
        log::debug!(
            "ensemble: {} members from {:?} (population {} unused)",
            starts.nrows(),
            self.start_points,
            population_size
        );

        let mut members = Vec::with_capacity(starts.nrows());
        for (i, start) in starts.rows().into_iter().enumerate() {
            let member_seed = seed.map(|s| s.wrapping_add(i as u64 + 1));
            let mut member = (self.factory)(i, &start.to_owned(), member_seed)?;
            if member.dim() != self.dim {
                return Err(SolverError::dimension("ensemble member", self.dim, member.dim()));
            }
            if let Some(c) = &self.constraints {
                member.set_constraints(c.clone());
            }
            if let Some(m) = &self.evaluation_monitor {
                member.set_evaluation_monitor(m.clone());
            }
            members.push(member);
        }

        self.stopped = vec![false; members.len()];
        self.members = members;
        self.state = SolverState::new(self.dim);
        self.state.population = starts;
        self.state.energies = Array1::from_elem(self.members.len(), f64::INFINITY);
        self.initialized = true;
        self.cancel.reset();
        if let Some(t) = self.termination.as_deref_mut() {
            t.reset();
        }
        log::info!("Ensemble initialized with {} members", self.members.len());
        Ok(())
    }

    fn set_termination(&mut self, termination: Box<dyn Termination>) {
        self.termination = Some(termination);
    }

    /// The map dispatches member steps; each member still evaluates its
    /// batches through the map its factory gave it.
    fn set_evaluation_map(&mut self, map: Box<dyn EvaluationMap>) {
        log::debug!("ensemble members dispatched through map {}", map.name());
        self.map = map;
    }

    fn set_constraints(&mut self, constraints: Constraints) {
        for m in self.members.iter_mut() {
            m.set_constraints(constraints.clone());
        }
        self.constraints = Some(constraints);
    }

    fn set_generation_monitor(&mut self, monitor: Arc<dyn Monitor>) {
        self.generation_monitor = monitor;
    }

    /// Shared by every member.
    fn set_evaluation_monitor(&mut self, monitor: Arc<dyn Monitor>) {
        for m in self.members.iter_mut() {
            m.set_evaluation_monitor(monitor.clone());
        }
        self.evaluation_monitor = Some(monitor);
    }

    fn set_evaluation_limits(&mut self, generations: Option<usize>, evaluations: Option<usize>) {
        self.max_generations = generations;
        self.max_evaluations = evaluations;
    }

    /// Step every active member once. When any member fails, every member
    /// is restored to its checkpoint and the first error in member order is
    /// returned.
    fn step(&mut self, objective: &dyn Objective) -> Result<bool> {
        if !self.initialized {
            return Err(SolverError::Configuration(
                "solver not initialized: call initialize() first".to_string(),
            ));
        }
        if let Some(d) = objective.dimension() {
            if d != self.dim {
                return Err(SolverError::dimension("objective", self.dim, d));
            }
        }
        if self.state.is_terminated() {
            return Ok(true);
        }

        let checkpoints: Vec<Checkpoint> = self.members.iter().map(|m| m.checkpoint()).collect();
        let n = self.members.len();
        let outcomes: Vec<Mutex<Option<Result<bool>>>> = (0..n).map(|_| Mutex::new(None)).collect();
        {
            let slots: Vec<Mutex<&mut Box<dyn Solver + Send>>> =
                self.members.iter_mut().map(Mutex::new).collect();
            let stopped = &self.stopped;
            self.map.run_indexed(n, &|i| {
                let outcome = if stopped[i] { Ok(true) } else { slots[i].lock().step(objective) };
                *outcomes[i].lock() = Some(outcome);
            });
        }

        let mut done = Vec::with_capacity(n);
        let mut failure = None;
        for (i, outcome) in outcomes.into_iter().enumerate() {
            let outcome = outcome.into_inner().unwrap_or_else(|| {
                Err(SolverError::Configuration(format!(
                    "map {} did not run member {}",
                    self.map.name(),
                    i
                )))
            });
            match outcome {
                Ok(d) => done.push(d),
                Err(e) => {
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
            }
        }
        if let Some(e) = failure {
            for (m, cp) in self.members.iter_mut().zip(checkpoints) {
                m.restore(cp)?;
            }
            log::warn!("ensemble generation {} not committed: {}", self.state.generation + 1, e);
            return Err(e);
        }
        self.stopped = done;
        self.state.status = SolverStatus::Running;

        self.aggregate();
        self.state.generation += 1;
        self.generation_monitor.record(
            self.state.evaluations,
            &self.state.best_solution,
            self.state.best_energy,
        );
        log::debug!(
            "ensemble gen {:4}  best_f={:.6e}  active={}",
            self.state.generation,
            self.state.best_energy,
            self.active_members()
        );

        match self.stop_reason() {
            Some(reason) => {
                log::info!(
                    "Ensemble finished after {} generations: {} (f={:.6e})",
                    self.state.generation,
                    reason,
                    self.state.best_energy
                );
                self.state.status = SolverStatus::Terminated { reason };
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn state(&self) -> &SolverState {
        &self.state
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint::new(EnsembleCheckpoint {
            state: self.state.clone(),
            stopped: self.stopped.clone(),
            members: self.members.iter().map(|m| m.checkpoint()).collect(),
        })
    }

    fn restore(&mut self, checkpoint: Checkpoint) -> Result<()> {
        let cp: EnsembleCheckpoint = checkpoint.into_inner()?;
        if cp.members.len() != self.members.len() {
            return Err(SolverError::dimension("ensemble checkpoint", self.members.len(), cp.members.len()));
        }
        for (m, member_cp) in self.members.iter_mut().zip(cp.members) {
            m.restore(member_cp)?;
        }
        self.state = cp.state;
        self.stopped = cp.stopped;
        Ok(())
    }

    fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn mark_cancelled(&mut self) {
        self.state.status = SolverStatus::Cancelled;
    }

    fn enable_signal_handler(&mut self) -> Result<()> {
        self.signal.enable(&self.cancel)
    }

    fn disable_signal_handler(&mut self) {
        self.signal.disable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_grid_centres() {
        let b = Bounds::from_pairs(&[(0.0, 4.0), (-1.0, 1.0)]).unwrap();
        let pts = grid_centres(&[2, 1], &b).unwrap();
        assert_eq!(pts, array![[1.0, 0.0], [3.0, 0.0]]);

        let pts = grid_centres(&[3], &b).unwrap();
        assert_eq!(pts.nrows(), 9);
        assert!(pts.rows().into_iter().all(|r| b.contains(&r.to_owned())));
    }

    #[test]
    fn test_grid_bins_mismatch() {
        let b = Bounds::from_pairs(&[(0.0, 1.0); 3]).unwrap();
        assert!(grid_centres(&[2, 2], &b).unwrap_err().is_dimension_error());
    }

    #[test]
    fn test_grid_fixed_dimension_collapses() {
        let b = Bounds::from_pairs(&[(0.0, 1.0), (2.0, 2.0)]).unwrap();
        let pts = grid_centres(&[4], &b).unwrap();
        assert_eq!(pts.nrows(), 4);
        assert!(pts.column(1).iter().all(|&v| v == 2.0));
    }

    #[test]
    fn test_scattershot_within_bounds() {
        let b = Bounds::from_pairs(&[(-2.0, 2.0); 2]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let pts = StartPoints::Scattershot { npts: 7 }.generate(&b, &mut rng).unwrap();
        assert_eq!(pts.dim(), (7, 2));
        assert!(pts.iter().all(|v| v.abs() <= 2.0));
    }

    #[test]
    fn test_step_before_initialize() {
        let mut e = EnsembleSolver::with_pattern_search(2, StartPoints::Scattershot { npts: 2 }, None);
        let sphere = |x: &Array1<f64>| x.dot(x);
        assert!(e.step(&sphere).unwrap_err().is_config_error());
    }
}
