//! Termination criteria.
//!
//! A criterion is asked once per generation whether the run should stop.
//! Criteria that need history (change over generation, stagnation) keep
//! their own rolling statistics and record at most one observation per
//! generation. `Or` / `And` evaluate left to right and short-circuit, so a
//! skipped criterion does not observe that generation.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::solver::SolverState;

pub trait Termination: Send {
    fn should_stop(&mut self, state: &SolverState) -> bool;

    /// Human-readable stop reason, meaningful after `should_stop` returned `true`.
    fn reason(&self) -> String;

    /// Forget accumulated history.
    fn reset(&mut self) {}
}

/// Stop once `n` generations have completed.
#[derive(Debug, Clone, Copy)]
pub struct MaxGenerations(pub usize);

impl Termination for MaxGenerations {
    fn should_stop(&mut self, state: &SolverState) -> bool {
        state.generation >= self.0
    }

    fn reason(&self) -> String {
        format!("Maximum generations reached: {}", self.0)
    }
}

/// Stop once `n` objective evaluations were spent.
#[derive(Debug, Clone, Copy)]
pub struct MaxEvaluations(pub usize);

impl Termination for MaxEvaluations {
    fn should_stop(&mut self, state: &SolverState) -> bool {
        state.evaluations >= self.0
    }

    fn reason(&self) -> String {
        format!("Maximum evaluations reached: {}", self.0)
    }
}

/// Value to reach: stop when the best energy is at or below `target`.
#[derive(Debug, Clone, Copy)]
pub struct VTR {
    pub target: f64,
}

impl Termination for VTR {
    fn should_stop(&mut self, state: &SolverState) -> bool {
        state.best_energy <= self.target
    }

    fn reason(&self) -> String {
        format!("Value to reach {:.6e} attained", self.target)
    }
}

/// Rolling window of best energies, one entry per generation.
#[derive(Debug, Clone, Default)]
struct BestHistory {
    values: VecDeque<f64>,
    last_generation: Option<usize>,
}

impl BestHistory {
    /// Record the state's best energy if this generation was not seen yet;
    /// keeps `window + 1` values.
    fn observe(&mut self, state: &SolverState, window: usize) {
        if self.last_generation == Some(state.generation) {
            return;
        }
        self.last_generation = Some(state.generation);
        self.values.push_back(state.best_energy);
        while self.values.len() > window + 1 {
            self.values.pop_front();
        }
    }

    /// |newest - oldest| once the window is full
    fn change(&self, window: usize) -> Option<(f64, f64)> {
        if self.values.len() < window + 1 {
            return None;
        }
        let oldest = *self.values.front()?;
        let newest = *self.values.back()?;
        Some(((oldest - newest).abs(), newest))
    }

    fn clear(&mut self) {
        self.values.clear();
        self.last_generation = None;
    }
}

/// Best energy moved by at most `tolerance` over the last `generations` generations.
#[derive(Debug, Clone)]
pub struct ChangeOverGeneration {
    pub tolerance: f64,
    pub generations: usize,
    history: BestHistory,
}

impl ChangeOverGeneration {
    pub fn new(tolerance: f64, generations: usize) -> Self {
        Self { tolerance, generations: generations.max(1), history: BestHistory::default() }
    }
}

impl Termination for ChangeOverGeneration {
    fn should_stop(&mut self, state: &SolverState) -> bool {
        self.history.observe(state, self.generations);
        matches!(self.history.change(self.generations), Some((delta, _)) if delta <= self.tolerance)
    }

    fn reason(&self) -> String {
        format!(
            "Best energy changed by <= {:.3e} over {} generations",
            self.tolerance, self.generations
        )
    }

    fn reset(&mut self) {
        self.history.clear();
    }
}

/// Relative version of [`ChangeOverGeneration`]: `|delta| <= tolerance * |best|`.
#[derive(Debug, Clone)]
pub struct NormalizedChangeOverGeneration {
    pub tolerance: f64,
    pub generations: usize,
    history: BestHistory,
}

impl NormalizedChangeOverGeneration {
    pub fn new(tolerance: f64, generations: usize) -> Self {
        Self { tolerance, generations: generations.max(1), history: BestHistory::default() }
    }
}

impl Termination for NormalizedChangeOverGeneration {
    fn should_stop(&mut self, state: &SolverState) -> bool {
        self.history.observe(state, self.generations);
        match self.history.change(self.generations) {
            Some((delta, newest)) => delta <= self.tolerance * newest.abs().max(f64::MIN_POSITIVE),
            None => false,
        }
    }

    fn reason(&self) -> String {
        format!(
            "Best energy changed by <= {:.3e} (relative) over {} generations",
            self.tolerance, self.generations
        )
    }

    fn reset(&mut self) {
        self.history.clear();
    }
}

/// Population collapsed onto the best member: every coordinate within
/// `xtol` of the best solution and every energy within `ftol` of the best energy.
#[derive(Debug, Clone, Copy)]
pub struct CandidateRelativeTolerance {
    pub xtol: f64,
    pub ftol: f64,
}

impl Termination for CandidateRelativeTolerance {
    fn should_stop(&mut self, state: &SolverState) -> bool {
        if state.population.nrows() == 0 || !state.best_energy.is_finite() {
            return false;
        }
        let x_spread = state
            .population
            .rows()
            .into_iter()
            .flat_map(|row| {
                row.iter()
                    .zip(state.best_solution.iter())
                    .map(|(a, b)| (a - b).abs())
                    .collect::<Vec<_>>()
            })
            .fold(0.0_f64, f64::max);
        let f_spread =
            state.energies.iter().map(|e| (e - state.best_energy).abs()).fold(0.0_f64, f64::max);
        x_spread <= self.xtol && f_spread <= self.ftol
    }

    fn reason(&self) -> String {
        format!("Population within xtol={:.3e}, ftol={:.3e} of the best", self.xtol, self.ftol)
    }
}

/// `std(energies) <= atol + tol * |mean(energies)|`
#[derive(Debug, Clone, Copy)]
pub struct PopulationEnergyStd {
    pub tol: f64,
    pub atol: f64,
}

impl Default for PopulationEnergyStd {
    fn default() -> Self {
        Self { tol: 1e-2, atol: 0.0 }
    }
}

impl Termination for PopulationEnergyStd {
    fn should_stop(&mut self, state: &SolverState) -> bool {
        let Some(mean) = state.energies.mean() else {
            return false;
        };
        let std = state.energies.std(0.0);
        std <= self.atol + self.tol * mean.abs()
    }

    fn reason(&self) -> String {
        format!(
            "Converged: std(pop_f) <= {:.3e} + {:.3e} * |mean(pop_f)|",
            self.atol, self.tol
        )
    }
}

/// No strict improvement of the best energy for `generations` consecutive generations.
#[derive(Debug, Clone)]
pub struct Stagnation {
    pub generations: usize,
    best: Option<f64>,
    stale: usize,
    last_generation: Option<usize>,
}

impl Stagnation {
    pub fn new(generations: usize) -> Self {
        Self { generations, best: None, stale: 0, last_generation: None }
    }
}

impl Termination for Stagnation {
    fn should_stop(&mut self, state: &SolverState) -> bool {
        if self.last_generation != Some(state.generation) {
            self.last_generation = Some(state.generation);
            match self.best {
                Some(best) if state.best_energy >= best => self.stale += 1,
                _ => {
                    self.best = Some(state.best_energy);
                    self.stale = 0;
                }
            }
        }
        self.stale >= self.generations
    }

    fn reason(&self) -> String {
        format!("No improvement for {} generations", self.generations)
    }

    fn reset(&mut self) {
        self.best = None;
        self.stale = 0;
        self.last_generation = None;
    }
}

/// Never fires; pair it with a budget or evaluation limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Never;

impl Termination for Never {
    fn should_stop(&mut self, _state: &SolverState) -> bool {
        false
    }

    fn reason(&self) -> String {
        "never".to_string()
    }
}

/// Stops when any member criterion stops; the first one to fire provides the reason.
pub struct Or {
    criteria: Vec<Box<dyn Termination>>,
    fired: Option<usize>,
}

impl Or {
    pub fn new(criteria: Vec<Box<dyn Termination>>) -> Self {
        Self { criteria, fired: None }
    }
}

impl Termination for Or {
    fn should_stop(&mut self, state: &SolverState) -> bool {
        self.fired = self.criteria.iter_mut().position(|c| c.should_stop(state));
        self.fired.is_some()
    }

    fn reason(&self) -> String {
        match self.fired {
            Some(i) => self.criteria[i].reason(),
            None => "none of the criteria fired".to_string(),
        }
    }

    fn reset(&mut self) {
        self.fired = None;
        self.criteria.iter_mut().for_each(|c| c.reset());
    }
}

/// Stops when every member criterion stops; evaluation stops at the first `false`.
pub struct And {
    criteria: Vec<Box<dyn Termination>>,
}

impl And {
    pub fn new(criteria: Vec<Box<dyn Termination>>) -> Self {
        Self { criteria }
    }
}

impl Termination for And {
    fn should_stop(&mut self, state: &SolverState) -> bool {
        !self.criteria.is_empty() && self.criteria.iter_mut().all(|c| c.should_stop(state))
    }

    fn reason(&self) -> String {
        self.criteria.iter().map(|c| c.reason()).collect::<Vec<_>>().join(" and ")
    }

    fn reset(&mut self) {
        self.criteria.iter_mut().for_each(|c| c.reset());
    }
}

/// Fluent combinators: `MaxGenerations(100).or(VTR { target: 1e-8 })`.
pub trait TerminationExt: Termination + Sized + 'static {
    fn or<T: Termination + 'static>(self, other: T) -> Or {
        Or::new(vec![Box::new(self), Box::new(other)])
    }

    fn and<T: Termination + 'static>(self, other: T) -> And {
        And::new(vec![Box::new(self), Box::new(other)])
    }
}

impl<T: Termination + 'static> TerminationExt for T {}

/// Serializable description of a termination criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerminationConfig {
    MaxGenerations { generations: usize },
    MaxEvaluations { evaluations: usize },
    Vtr { target: f64 },
    ChangeOverGeneration { tolerance: f64, generations: usize },
    NormalizedChangeOverGeneration { tolerance: f64, generations: usize },
    CandidateRelativeTolerance { xtol: f64, ftol: f64 },
    PopulationEnergyStd { tol: f64, atol: f64 },
    Stagnation { generations: usize },
    Never,
    Any { criteria: Vec<TerminationConfig> },
    All { criteria: Vec<TerminationConfig> },
}

impl Default for TerminationConfig {
    fn default() -> Self {
        TerminationConfig::PopulationEnergyStd { tol: 1e-2, atol: 0.0 }
    }
}

impl TerminationConfig {
    pub fn build(&self) -> Box<dyn Termination> {
        match self {
            TerminationConfig::MaxGenerations { generations } => {
                Box::new(MaxGenerations(*generations))
            }
            TerminationConfig::MaxEvaluations { evaluations } => {
                Box::new(MaxEvaluations(*evaluations))
            }
            TerminationConfig::Vtr { target } => Box::new(VTR { target: *target }),
            TerminationConfig::ChangeOverGeneration { tolerance, generations } => {
                Box::new(ChangeOverGeneration::new(*tolerance, *generations))
            }
            TerminationConfig::NormalizedChangeOverGeneration { tolerance, generations } => {
                Box::new(NormalizedChangeOverGeneration::new(*tolerance, *generations))
            }
            TerminationConfig::CandidateRelativeTolerance { xtol, ftol } => {
                Box::new(CandidateRelativeTolerance { xtol: *xtol, ftol: *ftol })
            }
            TerminationConfig::PopulationEnergyStd { tol, atol } => {
                Box::new(PopulationEnergyStd { tol: *tol, atol: *atol })
            }
            TerminationConfig::Stagnation { generations } => {
                Box::new(Stagnation::new(*generations))
            }
            TerminationConfig::Never => Box::new(Never),
            TerminationConfig::Any { criteria } => {
                Box::new(Or::new(criteria.iter().map(|c| c.build()).collect()))
            }
            TerminationConfig::All { criteria } => {
                Box::new(And::new(criteria.iter().map(|c| c.build()).collect()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn state_at(generation: usize, best: f64) -> SolverState {
        let mut s = SolverState::new(1);
        s.generation = generation;
        s.best_energy = best;
        s
    }

    #[test]
    fn test_change_over_generation_window() {
        let mut c = ChangeOverGeneration::new(1e-3, 3);
        assert!(!c.should_stop(&state_at(1, 10.0)));
        assert!(!c.should_stop(&state_at(2, 5.0)));
        assert!(!c.should_stop(&state_at(3, 5.0)));
        assert!(!c.should_stop(&state_at(4, 5.0)));
        assert!(c.should_stop(&state_at(5, 5.0)));
        c.reset();
        assert!(!c.should_stop(&state_at(6, 5.0)));
    }

    #[test]
    fn test_history_counts_generation_once() {
        let mut c = Stagnation::new(2);
        assert!(!c.should_stop(&state_at(1, 1.0)));
        assert!(!c.should_stop(&state_at(2, 1.0)));
        assert!(!c.should_stop(&state_at(2, 1.0)));
        assert!(c.should_stop(&state_at(3, 1.0)));
    }

    #[test]
    fn test_or_reason_and_short_circuit() {
        let mut t = MaxGenerations(10).or(Never);
        assert!(!t.should_stop(&state_at(9, 0.0)));
        assert!(t.should_stop(&state_at(10, 0.0)));
        assert_eq!(t.reason(), "Maximum generations reached: 10");

        let mut both = VTR { target: 1.0 }.and(MaxGenerations(5));
        assert!(!both.should_stop(&state_at(6, 2.0)));
        assert!(both.should_stop(&state_at(6, 0.5)));
    }

    #[test]
    fn test_candidate_relative_tolerance() {
        let mut s = SolverState::new(2);
        s.population = array![[1.0, 1.0], [1.0005, 0.9995]];
        s.energies = array![0.0, 1e-7];
        s.best_solution = array![1.0, 1.0];
        s.best_energy = 0.0;
        let mut tight = CandidateRelativeTolerance { xtol: 1e-4, ftol: 1e-6 };
        let mut loose = CandidateRelativeTolerance { xtol: 1e-3, ftol: 1e-6 };
        assert!(!tight.should_stop(&s));
        assert!(loose.should_stop(&s));
    }

    #[test]
    fn test_config_roundtrip_builds() {
        let json = r#"{"kind":"any","criteria":[{"kind":"max_generations","generations":10},{"kind":"never"}]}"#;
        let cfg: TerminationConfig = serde_json::from_str(json).unwrap();
        let mut t = cfg.build();
        assert!(t.should_stop(&state_at(10, 0.0)));
    }
}
