//! Compass (pattern) search on a single point.
//!
//! Each step probes `x ± h_j e_j` along every free coordinate in one batched
//! map call, moves to the best probe if it improves on `f(x)`, and halves
//! every step length otherwise. The run converges once all step lengths
//! fall below `tolerance`.

use std::sync::Arc;

use ndarray::Array1;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::argmin;
use crate::bounds::Bounds;
use crate::cancel::{CancellationToken, SignalRegistration};
use crate::constraints::Constraints;
use crate::error::{Result, SolverError};
use crate::init_random::init_random;
use crate::map::{EvaluationMap, Objective, SerialMap};
use crate::monitor::{Monitor, NullMonitor};
use crate::solver::{Checkpoint, Solver, SolverKind, SolverState, SolverStatus};
use crate::termination::Termination;

pub struct PatternSearchSolver {
    dim: usize,
    bounds: Option<Bounds>,
    /// Initial step as a fraction of each dimension's span
    pub initial_step: f64,
    /// Converged when every step length is below this
    pub tolerance: f64,
    steps: Array1<f64>,
    termination: Option<Box<dyn Termination>>,
    map: Box<dyn EvaluationMap>,
    constraints: Constraints,
    generation_monitor: Arc<dyn Monitor>,
    evaluation_monitor: Arc<dyn Monitor>,
    max_generations: Option<usize>,
    max_evaluations: Option<usize>,
    state: SolverState,
    initialized: bool,
    evaluated: bool,
    cancel: CancellationToken,
    signal: SignalRegistration,
}

struct PatternCheckpoint {
    state: SolverState,
    steps: Array1<f64>,
    evaluated: bool,
}

impl PatternSearchSolver {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            bounds: None,
            initial_step: 0.1,
            tolerance: 1e-9,
            steps: Array1::zeros(dim),
            termination: None,
            map: Box::new(SerialMap),
            constraints: Constraints::default(),
            generation_monitor: Arc::new(NullMonitor),
            evaluation_monitor: Arc::new(NullMonitor),
            max_generations: None,
            max_evaluations: None,
            state: SolverState::new(dim),
            initialized: false,
            evaluated: false,
            cancel: CancellationToken::new(),
            signal: SignalRegistration::default(),
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Start from `x0` instead of the random draw. Must precede the first step.
    pub fn set_initial_guess(&mut self, x0: &Array1<f64>) -> Result<()> {
        if !self.initialized || self.evaluated {
            return Err(SolverError::Configuration(
                "initial guess must be set between initialize() and the first step".to_string(),
            ));
        }
        if x0.len() != self.dim {
            return Err(SolverError::dimension("initial guess", self.dim, x0.len()));
        }
        let x = self.finish(x0.clone());
        self.state.population.row_mut(0).assign(&x);
        self.state.best_solution = x;
        Ok(())
    }

    /// Current step lengths per coordinate
    pub fn step_lengths(&self) -> &Array1<f64> {
        &self.steps
    }

    fn finish(&self, x: Array1<f64>) -> Array1<f64> {
        let mut x = self.constraints.apply_repair(x);
        if let Some(bounds) = &self.bounds {
            bounds.clip_inplace(&mut x);
        }
        x
    }

    fn evaluate(&self, objective: &dyn Objective, vectors: &[Array1<f64>]) -> Result<Vec<f64>> {
        let raw = self.map.evaluate(objective, vectors)?;
        if raw.len() != vectors.len() {
            return Err(SolverError::Evaluation {
                index: raw.len().min(vectors.len()),
                message: format!("map returned {} values for {} vectors", raw.len(), vectors.len()),
            });
        }
        Ok(vectors.iter().zip(raw).map(|(x, f)| self.constraints.apply_penalty(x, f)).collect())
    }

    fn record(&self, vectors: &[Array1<f64>], energies: &[f64]) {
        let base = self.state.evaluations - vectors.len();
        for (k, (x, &f)) in vectors.iter().zip(energies.iter()).enumerate() {
            self.evaluation_monitor.record(base + k + 1, x, f);
        }
    }

    fn is_free(&self, j: usize) -> bool {
        self.bounds.as_ref().is_none_or(|b| b.is_free(j))
    }

    fn advance(&mut self, objective: &dyn Objective) -> Result<bool> {
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

        if !self.evaluated {
            let x = self.finish(self.state.population.row(0).to_owned());
            let f = self.evaluate(objective, std::slice::from_ref(&x))?;
            self.state.evaluations += 1;
            self.record(std::slice::from_ref(&x), &f);
            self.state.population.row_mut(0).assign(&x);
            self.state.energies[0] = f[0];
            self.state.best_solution = x;
            self.state.best_energy = f[0];
            self.evaluated = true;
        }
        self.state.status = SolverStatus::Running;

        let x = self.state.best_solution.clone();
        let mut probes = Vec::with_capacity(2 * self.dim);
        for j in (0..self.dim).filter(|&j| self.is_free(j)) {
            for sign in [1.0, -1.0] {
                let mut p = x.clone();
                p[j] += sign * self.steps[j];
                probes.push(self.finish(p));
            }
        }
        let energies = self.evaluate(objective, &probes)?;
        self.state.evaluations += probes.len();
        self.record(&probes, &energies);

        let (k, f) = argmin(&Array1::from(energies));
        if f < self.state.best_energy {
            self.state.best_energy = f;
            self.state.best_solution = probes[k].clone();
            self.state.population.row_mut(0).assign(&probes[k]);
            self.state.energies[0] = f;
        } else {
            self.steps *= 0.5;
        }

        self.state.generation += 1;
        self.generation_monitor.record(
            self.state.evaluations,
            &self.state.best_solution,
            self.state.best_energy,
        );
        log::debug!(
            "pattern search gen {:4}  best_f={:.6e}  max_step={:.3e}",
            self.state.generation,
            self.state.best_energy,
            self.steps.iter().cloned().fold(0.0, f64::max)
        );

        match self.stop_reason() {
            Some(reason) => {
                self.state.status = SolverStatus::Terminated { reason };
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn stop_reason(&mut self) -> Option<String> {
        if let Some(t) = self.termination.as_deref_mut() {
            if t.should_stop(&self.state) {
                return Some(t.reason());
            }
        }
        if (0..self.dim).filter(|&j| self.is_free(j)).all(|j| self.steps[j] < self.tolerance) {
            return Some(format!("Step size below tolerance {:.3e}", self.tolerance));
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

impl Solver for PatternSearchSolver {
    fn kind(&self) -> SolverKind {
        SolverKind::Point
    }

    fn dim(&self) -> usize {
        self.dim
    }

    /// `population_size` is ignored: a point solver always holds one member.
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
        if population_size > 1 {
            log::debug!("pattern search uses a single point, ignoring population {}", population_size);
        }
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => {
                let mut thread_rng = rand::rng();
                StdRng::from_rng(&mut thread_rng)
            }
        };
        let draw_box = bounds.clone().unwrap_or_else(|| Bounds::default_range(self.dim));
        let start = init_random(1, &draw_box, &mut rng);

        self.steps = draw_box.span() * self.initial_step;
        self.bounds = bounds;
        self.state = SolverState::new(self.dim);
        self.state.best_solution = start.row(0).to_owned();
        self.state.population = start;
        self.state.energies = Array1::from_elem(1, f64::INFINITY);
        self.initialized = true;
        self.evaluated = false;
        self.cancel.reset();
        if let Some(t) = self.termination.as_deref_mut() {
            t.reset();
        }
        Ok(())
    }

    fn set_termination(&mut self, termination: Box<dyn Termination>) {
        self.termination = Some(termination);
    }

    fn set_evaluation_map(&mut self, map: Box<dyn EvaluationMap>) {
        self.map = map;
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

    /// A failed batch rolls back the whole generation.
    fn step(&mut self, objective: &dyn Objective) -> Result<bool> {
        let checkpoint = self.checkpoint();
        match self.advance(objective) {
            Ok(done) => Ok(done),
            Err(e) => {
                self.restore(checkpoint)?;
                Err(e)
            }
        }
    }

    fn state(&self) -> &SolverState {
        &self.state
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint::new(PatternCheckpoint {
            state: self.state.clone(),
            steps: self.steps.clone(),
            evaluated: self.evaluated,
        })
    }

    fn restore(&mut self, checkpoint: Checkpoint) -> Result<()> {
        let cp: PatternCheckpoint = checkpoint.into_inner()?;
        self.state = cp.state;
        self.steps = cp.steps;
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
