use std::fmt;

use ndarray::{Array1, Array2};

use crate::solver::{SolverState, SolverStatus};

/// Result/Report of a DE optimization run
#[derive(Clone)]
pub struct DEReport {
    pub x: Array1<f64>,
    pub fun: f64,
    /// `true` when a termination criterion or limit ended the run
    pub success: bool,
    pub message: String,
    pub nit: usize,
    pub nfev: usize,
    pub population: Array2<f64>,
    pub population_energies: Array1<f64>,
}

impl DEReport {
    pub(crate) fn from_state(state: &SolverState) -> Self {
        let (success, message) = match &state.status {
            SolverStatus::Terminated { reason } => (true, reason.clone()),
            SolverStatus::Cancelled => (false, "Cancelled".to_string()),
            SolverStatus::Ready => (false, "Not started".to_string()),
            SolverStatus::Running => (false, "Stopped before termination".to_string()),
        };
        Self {
            x: state.best_solution.clone(),
            fun: state.best_energy,
            success,
            message,
            nit: state.generation,
            nfev: state.evaluations,
            population: state.population.clone(),
            population_energies: state.energies.clone(),
        }
    }
}

impl fmt::Debug for DEReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DEReport")
            .field("x", &format!("len={}", self.x.len()))
            .field("fun", &self.fun)
            .field("success", &self.success)
            .field("message", &self.message)
            .field("nit", &self.nit)
            .field("nfev", &self.nfev)
            .field("population", &format!("{}x{}", self.population.nrows(), self.population.ncols()))
            .field("population_energies", &format!("len={}", self.population_energies.len()))
            .finish()
    }
}
