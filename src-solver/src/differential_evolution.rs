//! Differential Evolution (DE) population solver.
//!
//! One `step` is one generation:
//!
//! 1. on the first step, evaluate the initial population as one batch
//! 2. build one trial per member with the strategy, then repair and clip it
//! 3. evaluate all trials in one batched map call
//! 4. add penalties, count evaluations, feed the evaluation monitor
//! 5. greedy selection (`trial <= target` replaces the target)
//! 6. update the best-so-far on strict improvement, feed the generation monitor
//! 7. ask the termination criterion, then the hard evaluation limits
//!
//! A failed batch commits nothing: the population, counters and random
//! stream are left as they were before the step.

use std::sync::Arc;
use std::time::Instant;

use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::bounds::Bounds;
use crate::cancel::{CancellationToken, SignalRegistration};
use crate::config::DEConfig;
use crate::constraints::Constraints;
use crate::error::{Result, SolverError};
use crate::impl_helpers::DEReport;
use crate::init_latin_hypercube::init_latin_hypercube;
use crate::init_random::init_random;
use crate::map::{EvaluationMap, Objective, SerialMap};
use crate::monitor::{Monitor, NullMonitor};
use crate::solver::{Checkpoint, Solver, SolverKind, SolverState, SolverStatus};
use crate::strategy::{DifferentialStrategy, Mutation, Strategy, StrategyVariant, check_population};
use crate::termination::{PopulationEnergyStd, Termination};
use crate::{Init, argmin};

pub struct DifferentialEvolutionSolver {
    dim: usize,
    bounds: Option<Bounds>,
    init: Init,
    strategy: Option<Box<dyn Strategy>>,
    termination: Option<Box<dyn Termination>>,
    map: Option<Box<dyn EvaluationMap>>,
    constraints: Constraints,
    generation_monitor: Arc<dyn Monitor>,
    evaluation_monitor: Arc<dyn Monitor>,
    max_generations: Option<usize>,
    max_evaluations: Option<usize>,
    rng: StdRng,
    state: SolverState,
    initialized: bool,
    /// Initial population has been evaluated
    evaluated: bool,
    cancel: CancellationToken,
    signal: SignalRegistration,
    timing: bool,
}

struct DECheckpoint {
    state: SolverState,
    rng: StdRng,
    evaluated: bool,
}

impl DifferentialEvolutionSolver {
    /// Bare solver: strategy, termination and map must be installed before stepping.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            bounds: None,
            init: Init::default(),
            strategy: None,
            termination: None,
            map: None,
            constraints: Constraints::default(),
            generation_monitor: Arc::new(NullMonitor),
            evaluation_monitor: Arc::new(NullMonitor),
            max_generations: None,
            max_evaluations: None,
            rng: StdRng::seed_from_u64(0),
            state: SolverState::new(dim),
            initialized: false,
            evaluated: false,
            cancel: CancellationToken::new(),
            signal: SignalRegistration::default(),
            timing: evosolve_env::timing_enabled(),
        }
    }

    /// best1bin (F=0.8, CR=0.9), serial evaluation and the
    /// `std(pop_f) <= 0.01 * |mean(pop_f)|` convergence test.
    pub fn with_defaults(dim: usize) -> Self {
        let mut solver = Self::new(dim);
        solver.strategy = Some(Box::new(DifferentialStrategy {
            variant: StrategyVariant::Best1Bin,
            mutation: Mutation::Factor(0.8),
            recombination: 0.9,
        }));
        solver.map = Some(Box::new(SerialMap));
        solver.termination = Some(Box::new(PopulationEnergyStd::default()));
        solver
    }

    /// Build from a configuration; the solver is initialized and ready to step.
    pub fn from_config(config: &DEConfig, bounds: Bounds) -> Result<Self> {
        config.build_solver(bounds)
    }

    /// Initialization scheme used by the next `initialize`.
    pub fn set_init(&mut self, init: Init) {
        self.init = init;
    }

    pub fn bounds(&self) -> Option<&Bounds> {
        self.bounds.as_ref()
    }

    pub fn population_size(&self) -> usize {
        self.state.population.nrows()
    }

    /// Replace the initial population. Must be called after `initialize` and
    /// before the first step; rows are clipped to the bounds.
    pub fn set_initial_population(&mut self, population: Array2<f64>) -> Result<()> {
        self.ensure_unstarted("initial population")?;
        if population.ncols() != self.dim {
            return Err(SolverError::dimension("initial population", self.dim, population.ncols()));
        }
        if population.nrows() == 0 {
            return Err(SolverError::Configuration("initial population is empty".to_string()));
        }
        let mut population = population;
        if let Some(bounds) = &self.bounds {
            for mut row in population.rows_mut() {
                let clipped = bounds.clip(&row.to_owned());
                row.assign(&clipped);
            }
        }
        let npop = population.nrows();
        self.state.best_solution = population.row(0).to_owned();
        self.state.population = population;
        self.state.energies = Array1::from_elem(npop, f64::INFINITY);
        Ok(())
    }

    /// Replace member 0 with `x0` (clipped to the bounds).
    pub fn set_initial_guess(&mut self, x0: &Array1<f64>) -> Result<()> {
        self.ensure_unstarted("initial guess")?;
        if x0.len() != self.dim {
            return Err(SolverError::dimension("initial guess", self.dim, x0.len()));
        }
        let x = match &self.bounds {
            Some(bounds) => bounds.clip(x0),
            None => x0.clone(),
        };
        self.state.population.row_mut(0).assign(&x);
        self.state.best_solution = x;
        Ok(())
    }

    /// Summary of the run so far.
    pub fn report(&self) -> DEReport {
        DEReport::from_state(&self.state)
    }

    fn ensure_unstarted(&self, what: &str) -> Result<()> {
        if !self.initialized {
            return Err(SolverError::Configuration(format!(
                "cannot set {}: call initialize() first",
                what
            )));
        }
        if self.evaluated {
            return Err(SolverError::Configuration(format!(
                "cannot set {} after the first generation",
                what
            )));
        }
        Ok(())
    }

    fn ensure_ready(&self, objective: &dyn Objective) -> Result<()> {
        if !self.initialized {
            return Err(SolverError::Configuration(
                "solver not initialized: call initialize() first".to_string(),
            ));
        }
        let strategy = self
            .strategy
            .as_deref()
            .ok_or_else(|| SolverError::Configuration("no strategy installed".to_string()))?;
        if self.termination.is_none() {
            return Err(SolverError::Configuration("no termination criterion installed".to_string()));
        }
        if self.map.is_none() {
            return Err(SolverError::Configuration("no evaluation map installed".to_string()));
        }
        if let Some(d) = objective.dimension() {
            if d != self.dim {
                return Err(SolverError::dimension("objective", self.dim, d));
            }
        }
        check_population(strategy, self.state.population.nrows())
    }

    /// User repair, then the hard box.
    fn finish_trial(&self, trial: Array1<f64>) -> Array1<f64> {
        let mut trial = self.constraints.apply_repair(trial);
        if let Some(bounds) = &self.bounds {
            bounds.clip_inplace(&mut trial);
        }
        trial
    }

    /// One map call; penalties applied, nothing committed.
    fn evaluate_batch(&self, objective: &dyn Objective, vectors: &[Array1<f64>]) -> Result<Vec<f64>> {
        let map = self
            .map
            .as_deref()
            .ok_or_else(|| SolverError::Configuration("no evaluation map installed".to_string()))?;
        let raw = map.evaluate(objective, vectors)?;
        if raw.len() != vectors.len() {
            return Err(SolverError::Evaluation {
                index: raw.len().min(vectors.len()),
                message: format!(
                    "map '{}' returned {} values for {} vectors",
                    map.name(),
                    raw.len(),
                    vectors.len()
                ),
            });
        }
        Ok(vectors.iter().zip(raw).map(|(x, f)| self.constraints.apply_penalty(x, f)).collect())
    }

    fn record_evaluations(&self, vectors: &[Array1<f64>], energies: &[f64]) {
        let base = self.state.evaluations - vectors.len();
        for (k, (x, &f)) in vectors.iter().zip(energies.iter()).enumerate() {
            self.evaluation_monitor.record(base + k + 1, x, f);
        }
    }

    fn evaluate_initial_population(&mut self, objective: &dyn Objective) -> Result<()> {
        let rows: Vec<Array1<f64>> = self
            .state
            .population
            .rows()
            .into_iter()
            .map(|row| self.finish_trial(row.to_owned()))
            .collect();
        let energies = self.evaluate_batch(objective, &rows)?;

        for (i, row) in rows.iter().enumerate() {
            self.state.population.row_mut(i).assign(row);
        }
        self.state.energies = Array1::from(energies.clone());
        self.state.evaluations += rows.len();
        self.record_evaluations(&rows, &energies);

        let (best_idx, best_f) = argmin(&self.state.energies);
        self.state.best_energy = best_f;
        self.state.best_solution = self.state.population.row(best_idx).to_owned();
        self.evaluated = true;

        if let (Some(mean), std) = (self.state.energies.mean(), self.state.energies.std(0.0)) {
            log::debug!(
                "DE initial population: n={} mean={:.6e} std={:.6e} best={:.6e}",
                rows.len(),
                mean,
                std,
                best_f
            );
        }
        Ok(())
    }

    fn build_trials(&mut self) -> Result<Vec<Array1<f64>>> {
        let strategy = self
            .strategy
            .as_deref()
            .ok_or_else(|| SolverError::Configuration("no strategy installed".to_string()))?;
        let npop = self.state.population.nrows();
        let mut trials = Vec::with_capacity(npop);
        for i in 0..npop {
            let trial =
                strategy.generate(&self.state.population, &self.state.energies, i, &mut self.rng)?;
            trials.push(self.finish_trial(trial));
        }
        Ok(trials)
    }

    fn limit_reason(&self) -> Option<String> {
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

    fn check_stop(&mut self) -> bool {
        let mut reason = None;
        if let Some(t) = self.termination.as_deref_mut() {
            if t.should_stop(&self.state) {
                reason = Some(t.reason());
            }
        }
        match reason.or_else(|| self.limit_reason()) {
            Some(reason) => {
                log::info!(
                    "DE finished after {} generations / {} evaluations: {}",
                    self.state.generation,
                    self.state.evaluations,
                    reason
                );
                self.state.status = SolverStatus::Terminated { reason };
                true
            }
            None => false,
        }
    }
}

impl Solver for DifferentialEvolutionSolver {
    fn kind(&self) -> SolverKind {
        SolverKind::Population
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn initialize(
        &mut self,
        bounds: Option<Bounds>,
        population_size: usize,
        seed: Option<u64>,
    ) -> Result<()> {
        if self.dim == 0 {
            return Err(SolverError::Configuration("problem dimension must be at least 1".into()));
        }
        if population_size == 0 {
            return Err(SolverError::Configuration("population size must be at least 1".into()));
        }
        if let Some(b) = &bounds {
            if b.dim() != self.dim {
                return Err(SolverError::dimension("bounds", self.dim, b.dim()));
            }
        }

        self.rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => {
                let mut thread_rng = rand::rng();
                StdRng::from_rng(&mut thread_rng)
            }
        };

        let draw_box = bounds.clone().unwrap_or_else(|| Bounds::default_range(self.dim));
        let population = match self.init {
            Init::LatinHypercube => init_latin_hypercube(population_size, &draw_box, &mut self.rng),
            Init::Random => init_random(population_size, &draw_box, &mut self.rng),
        };

        self.bounds = bounds;
        self.state = SolverState::new(self.dim);
        self.state.best_solution = population.row(0).to_owned();
        self.state.energies = Array1::from_elem(population_size, f64::INFINITY);
        self.state.population = population;
        self.initialized = true;
        self.evaluated = false;
        self.cancel.reset();
        if let Some(t) = self.termination.as_deref_mut() {
            t.reset();
        }

        log::info!(
            "DE init: {} dimensions ({} free), population={}, init={:?}, strategy={}",
            self.dim,
            draw_box.free_mask().iter().filter(|&&f| f).count(),
            population_size,
            self.init,
            self.strategy.as_deref().map(|s| s.name()).unwrap_or_else(|| "none".into())
        );
        Ok(())
    }

    fn set_strategy(&mut self, strategy: Box<dyn Strategy>) {
        self.strategy = Some(strategy);
    }

    fn set_termination(&mut self, termination: Box<dyn Termination>) {
        self.termination = Some(termination);
    }

    fn set_evaluation_map(&mut self, map: Box<dyn EvaluationMap>) {
        self.map = Some(map);
    }

    fn set_constraints(&mut self, constraints: Constraints) {
        self.constraints = constraints;
    }

    fn set_generation_monitor(&mut self, monitor: Arc<dyn Monitor>) {
        self.generation_monitor = monitor;
    }

    fn set_evaluation_monitor(&mut self, monitor: Arc<dyn Monitor>) {
        self.evaluation_monitor = monitor;
    }

    fn set_evaluation_limits(&mut self, generations: Option<usize>, evaluations: Option<usize>) {
        self.max_generations = generations;
        self.max_evaluations = evaluations;
    }

    fn step(&mut self, objective: &dyn Objective) -> Result<bool> {
        self.ensure_ready(objective)?;
        if self.state.is_terminated() {
            return Ok(true);
        }
        let t_step0 = Instant::now();

        if !self.evaluated {
            self.evaluate_initial_population(objective)?;
        }
        self.state.status = SolverStatus::Running;

        // restored when the generation cannot be committed
        let snapshot = self.rng.clone();

        let t_build0 = Instant::now();
        let trials = match self.build_trials() {
            Ok(trials) => trials,
            Err(e) => {
                self.rng = snapshot;
                return Err(e);
            }
        };
        let t_build = t_build0.elapsed();

        let t_eval0 = Instant::now();
        let trial_energies = match self.evaluate_batch(objective, &trials) {
            Ok(energies) => energies,
            Err(e) => {
                self.rng = snapshot;
                log::warn!("DE generation {} not committed: {}", self.state.generation + 1, e);
                return Err(e);
            }
        };
        let t_eval = t_eval0.elapsed();

        self.state.evaluations += trials.len();
        self.record_evaluations(&trials, &trial_energies);

        let t_select0 = Instant::now();
        let mut accepted = 0usize;
        for (i, (trial, energy)) in trials.into_iter().zip(trial_energies).enumerate() {
            if energy <= self.state.energies[i] {
                self.state.population.row_mut(i).assign(&trial);
                self.state.energies[i] = energy;
                accepted += 1;
            }
        }
        let (best_idx, best_f) = argmin(&self.state.energies);
        if best_f < self.state.best_energy {
            self.state.best_energy = best_f;
            self.state.best_solution = self.state.population.row(best_idx).to_owned();
        }
        let t_select = t_select0.elapsed();

        self.state.generation += 1;
        self.generation_monitor.record(
            self.state.evaluations,
            &self.state.best_solution,
            self.state.best_energy,
        );

        log::debug!(
            "DE gen {:4}  best_f={:.6e}  std={:.3e}  accepted={}/{}",
            self.state.generation,
            self.state.best_energy,
            self.state.energies.std(0.0),
            accepted,
            self.state.energies.len()
        );
        if self.timing {
            log::info!(
                "TIMING gen {:4}: build={:.3} ms, eval={:.3} ms, select={:.3} ms, total={:.3} ms",
                self.state.generation,
                t_build.as_secs_f64() * 1e3,
                t_eval.as_secs_f64() * 1e3,
                t_select.as_secs_f64() * 1e3,
                t_step0.elapsed().as_secs_f64() * 1e3
            );
        }

        Ok(self.check_stop())
    }

    fn state(&self) -> &SolverState {
        &self.state
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint::new(DECheckpoint {
            state: self.state.clone(),
            rng: self.rng.clone(),
            evaluated: self.evaluated,
        })
    }

    fn restore(&mut self, checkpoint: Checkpoint) -> Result<()> {
        let cp: DECheckpoint = checkpoint.into_inner()?;
        self.state = cp.state;
        self.rng = cp.rng;
        self.evaluated = cp.evaluated;
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

/// Convenience function mirroring SciPy's API shape (simplified):
/// - `func`: objective function mapping x -> f(x)
/// - `bounds`: vector of (lower, upper) pairs
/// - `config`: DE configuration
pub fn differential_evolution<F>(func: &F, bounds: &[(f64, f64)], config: DEConfig) -> Result<DEReport>
where
    F: Fn(&Array1<f64>) -> f64 + Sync,
{
    let bounds = Bounds::from_pairs(bounds)?;
    let mut solver = config.build_solver(bounds)?;
    solver.solve(func, None)?;
    Ok(solver.report())
}
