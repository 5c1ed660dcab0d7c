//! Error types for the evosolve solvers.
//!
//! Library errors use `thiserror`, with helper methods for categorising an
//! error without matching on every variant. Cancellation is not an error: a
//! cancelled run ends with [`crate::SolverStatus::Cancelled`].

use thiserror::Error;

/// Errors that can occur while configuring or running a solver.
#[derive(Debug, Error)]
pub enum SolverError {
    /// The solver is missing a plug-in, was not initialized, or a parameter is out of range.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Lower and upper bounds have different lengths.
    #[error("bounds mismatch: lower has {lower_len} elements, upper has {upper_len}")]
    BoundsMismatch {
        /// Length of the lower bounds array
        lower_len: usize,
        /// Length of the upper bounds array
        upper_len: usize,
    },

    /// A lower bound exceeds its corresponding upper bound.
    #[error("invalid bounds at index {index}: lower ({lower}) > upper ({upper})")]
    InvalidBounds {
        /// Index of the invalid bound pair
        index: usize,
        /// The lower bound value
        lower: f64,
        /// The upper bound value
        upper: f64,
    },

    /// A vector, population or objective disagrees with the problem dimension.
    #[error("{what} dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension provided
        got: usize,
        /// What was being checked (bounds, initial population, ...)
        what: String,
    },

    /// The strategy needs more distinct members than the population holds.
    #[error("insufficient population: strategy needs at least {required} members, population has {available}")]
    InsufficientPopulation {
        /// Smallest population the strategy accepts
        required: usize,
        /// Actual population size
        available: usize,
    },

    /// Mutation factor is out of valid range [0, 2].
    #[error("invalid mutation factor: {factor} (must be in [0, 2])")]
    InvalidMutationFactor {
        /// The invalid mutation factor
        factor: f64,
    },

    /// Crossover rate is out of valid range [0, 1].
    #[error("invalid crossover rate: {rate} (must be in [0, 1])")]
    InvalidCrossoverRate {
        /// The invalid crossover rate
        rate: f64,
    },

    /// The objective failed (returned an error or panicked) on one vector of a batch.
    #[error("evaluation of vector {index} failed: {message}")]
    Evaluation {
        /// Position of the failing vector in the batch
        index: usize,
        /// Failure description
        message: String,
    },

    /// The process-wide interrupt handler could not be installed.
    #[error("signal handler error: {0}")]
    SignalHandler(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("environment error: {0}")]
    Env(#[from] evosolve_env::EnvError),
}

/// A specialized `Result` type for solver operations.
pub type Result<T> = std::result::Result<T, SolverError>;

impl SolverError {
    /// Shorthand for [`SolverError::DimensionMismatch`].
    pub fn dimension(what: &str, expected: usize, got: usize) -> Self {
        SolverError::DimensionMismatch { expected, got, what: what.to_string() }
    }

    /// Returns `true` if this is a bounds-related error.
    pub fn is_bounds_error(&self) -> bool {
        matches!(self, SolverError::BoundsMismatch { .. } | SolverError::InvalidBounds { .. })
    }

    /// Returns `true` if this is a configuration-related error.
    ///
    /// This includes `Configuration`, `InsufficientPopulation`,
    /// `InvalidMutationFactor` and `InvalidCrossoverRate`.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SolverError::Configuration(_)
                | SolverError::InsufficientPopulation { .. }
                | SolverError::InvalidMutationFactor { .. }
                | SolverError::InvalidCrossoverRate { .. }
        )
    }

    /// Returns `true` if this is a dimension mismatch error.
    pub fn is_dimension_error(&self) -> bool {
        matches!(self, SolverError::DimensionMismatch { .. })
    }

    /// Returns `true` if the objective failed during a batch evaluation.
    pub fn is_evaluation_error(&self) -> bool {
        matches!(self, SolverError::Evaluation { .. })
    }
}

/// Error returned by a fallible objective.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ObjectiveError(pub String);

impl ObjectiveError {
    pub fn new(message: impl Into<String>) -> Self {
        ObjectiveError(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SolverError::BoundsMismatch { lower_len: 3, upper_len: 5 };
        assert_eq!(err.to_string(), "bounds mismatch: lower has 3 elements, upper has 5");

        let err = SolverError::dimension("initial guess", 4, 2);
        assert_eq!(err.to_string(), "initial guess dimension mismatch: expected 4, got 2");
    }

    #[test]
    fn test_categories() {
        let config_err = SolverError::InvalidCrossoverRate { rate: 1.5 };
        let bounds_err = SolverError::InvalidBounds { index: 0, lower: 5.0, upper: 3.0 };
        let eval_err = SolverError::Evaluation { index: 7, message: "boom".into() };
        let pop_err = SolverError::InsufficientPopulation { required: 5, available: 4 };

        assert!(config_err.is_config_error());
        assert!(!config_err.is_bounds_error());
        assert!(bounds_err.is_bounds_error());
        assert!(!bounds_err.is_config_error());
        assert!(eval_err.is_evaluation_error());
        assert!(pop_err.is_config_error());
        assert!(SolverError::dimension("bounds", 2, 3).is_dimension_error());
    }
}
