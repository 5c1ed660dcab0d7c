//! Serializable DE configuration and its fluent builder.

use serde::{Deserialize, Serialize};

use ndarray::Array1;

use crate::Init;
use crate::bounds::Bounds;
use crate::constraints::{Constraints, Integrality};
use crate::differential_evolution::DifferentialEvolutionSolver;
use crate::error::Result;
use crate::map::MapKind;
use crate::solver::Solver;
use crate::strategy::{DifferentialStrategy, Mutation, StrategyVariant};
use crate::termination::TerminationConfig;

/// Configuration for the Differential Evolution solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DEConfig {
    /// Total population; `None` uses 15 members per free variable (at least 5)
    pub population_size: Option<usize>,
    pub seed: Option<u64>,
    pub strategy: StrategyVariant,
    pub mutation: Mutation,
    /// CR in [0,1]
    pub recombination: f64,
    pub init: Init,
    pub termination: TerminationConfig,
    pub map: MapKind,
    pub num_threads: Option<usize>,
    pub max_generations: Option<usize>,
    pub max_evaluations: Option<usize>,
    /// Optional integrality mask; true => variable is integer-constrained
    pub integrality: Option<Vec<bool>>,
    /// Optional initial guess replacing member 0 after init
    pub x0: Option<Vec<f64>>,
}

impl Default for DEConfig {
    fn default() -> Self {
        Self {
            population_size: None,
            seed: None,
            strategy: StrategyVariant::Best1Bin,
            mutation: Mutation::default(),
            recombination: 0.9,
            init: Init::default(),
            termination: TerminationConfig::default(),
            map: MapKind::default(),
            num_threads: None,
            max_generations: Some(1000),
            max_evaluations: None,
            integrality: None,
            x0: None,
        }
    }
}

impl DEConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Population used for a problem with these bounds.
    pub fn resolved_population_size(&self, bounds: &Bounds) -> usize {
        self.population_size.unwrap_or_else(|| {
            let n_free = bounds.free_mask().iter().filter(|&&f| f).count();
            (15 * n_free).max(self.strategy.min_population())
        })
    }

    /// A fully configured and initialized solver.
    pub fn build_solver(&self, bounds: Bounds) -> Result<DifferentialEvolutionSolver> {
        let dim = bounds.dim();
        let strategy = DifferentialStrategy::new(self.strategy, self.mutation, self.recombination)?;
        let npop = self.resolved_population_size(&bounds);

        let mut solver = DifferentialEvolutionSolver::new(dim);
        solver.set_init(self.init);
        solver.set_strategy(Box::new(strategy));
        solver.set_termination(self.termination.build());
        solver.set_evaluation_map(self.map.build(self.num_threads)?);
        solver.set_evaluation_limits(self.max_generations, self.max_evaluations);
        if let Some(mask) = &self.integrality {
            let repair = Integrality::new(mask.clone(), bounds.clone())?;
            solver.set_constraints(Constraints::default().with_repair(repair));
        }
        solver.initialize(Some(bounds), npop, self.seed)?;
        if let Some(x0) = &self.x0 {
            solver.set_initial_guess(&Array1::from(x0.clone()))?;
        }
        Ok(solver)
    }
}

/// Fluent builder for `DEConfig` for ergonomic configuration.
#[derive(Debug, Clone, Default)]
pub struct DEConfigBuilder {
    cfg: DEConfig,
}

impl DEConfigBuilder {
    pub fn new() -> Self {
        Self { cfg: DEConfig::default() }
    }
    pub fn population_size(mut self, v: usize) -> Self {
        self.cfg.population_size = Some(v);
        self
    }
    pub fn seed(mut self, v: u64) -> Self {
        self.cfg.seed = Some(v);
        self
    }
    pub fn strategy(mut self, v: StrategyVariant) -> Self {
        self.cfg.strategy = v;
        self
    }
    pub fn mutation(mut self, v: Mutation) -> Self {
        self.cfg.mutation = v;
        self
    }
    pub fn recombination(mut self, v: f64) -> Self {
        self.cfg.recombination = v;
        self
    }
    pub fn init(mut self, v: Init) -> Self {
        self.cfg.init = v;
        self
    }
    pub fn termination(mut self, v: TerminationConfig) -> Self {
        self.cfg.termination = v;
        self
    }
    /// Population-energy convergence test `std <= atol + tol * |mean|`
    pub fn tol(mut self, tol: f64, atol: f64) -> Self {
        self.cfg.termination = TerminationConfig::PopulationEnergyStd { tol, atol };
        self
    }
    pub fn map(mut self, v: MapKind) -> Self {
        self.cfg.map = v;
        self
    }
    pub fn num_threads(mut self, v: usize) -> Self {
        self.cfg.num_threads = Some(v);
        self
    }
    pub fn max_generations(mut self, v: usize) -> Self {
        self.cfg.max_generations = Some(v);
        self
    }
    pub fn max_evaluations(mut self, v: usize) -> Self {
        self.cfg.max_evaluations = Some(v);
        self
    }
    pub fn integrality(mut self, v: Vec<bool>) -> Self {
        self.cfg.integrality = Some(v);
        self
    }
    pub fn x0(mut self, v: Vec<f64>) -> Self {
        self.cfg.x0 = Some(v);
        self
    }
    pub fn build(self) -> DEConfig {
        self.cfg
    }
}
