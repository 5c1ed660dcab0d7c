//! Box constraints on the parameter vector.

use ndarray::Array1;

use crate::error::{Result, SolverError};

/// Per-dimension range used to draw the initial population of an unbounded run.
pub const DEFAULT_RANGE: (f64, f64) = (-1000.0, 1000.0);

/// Validated lower/upper bounds, `lower[i] <= upper[i]` for every dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    lower: Array1<f64>,
    upper: Array1<f64>,
}

impl Bounds {
    pub fn new(lower: Array1<f64>, upper: Array1<f64>) -> Result<Self> {
        if lower.len() != upper.len() {
            return Err(SolverError::BoundsMismatch {
                lower_len: lower.len(),
                upper_len: upper.len(),
            });
        }
        for (index, (&lo, &hi)) in lower.iter().zip(upper.iter()).enumerate() {
            // also rejects NaN
            if !(lo <= hi) {
                return Err(SolverError::InvalidBounds { index, lower: lo, upper: hi });
            }
        }
        Ok(Self { lower, upper })
    }

    /// Build from `(lower, upper)` pairs, one per dimension.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self> {
        let lower = pairs.iter().map(|p| p.0).collect::<Array1<f64>>();
        let upper = pairs.iter().map(|p| p.1).collect::<Array1<f64>>();
        Self::new(lower, upper)
    }

    /// The [`DEFAULT_RANGE`] box in `dim` dimensions.
    pub fn default_range(dim: usize) -> Self {
        Self {
            lower: Array1::from_elem(dim, DEFAULT_RANGE.0),
            upper: Array1::from_elem(dim, DEFAULT_RANGE.1),
        }
    }

    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    pub fn lower(&self) -> &Array1<f64> {
        &self.lower
    }

    pub fn upper(&self) -> &Array1<f64> {
        &self.upper
    }

    /// `upper - lower` per dimension
    pub fn span(&self) -> Array1<f64> {
        &self.upper - &self.lower
    }

    /// A dimension is free when its range is not degenerate.
    pub fn is_free(&self, i: usize) -> bool {
        self.upper[i] > self.lower[i]
    }

    pub fn free_mask(&self) -> Vec<bool> {
        (0..self.dim()).map(|i| self.is_free(i)).collect()
    }

    pub fn contains(&self, x: &Array1<f64>) -> bool {
        x.len() == self.dim()
            && x.iter()
                .zip(self.lower.iter().zip(self.upper.iter()))
                .all(|(&v, (&lo, &hi))| v >= lo && v <= hi)
    }

    /// Clamp every coordinate into its range; fixed dimensions collapse to the bound.
    pub fn clip_inplace(&self, x: &mut Array1<f64>) {
        for i in 0..x.len().min(self.dim()) {
            if self.is_free(i) {
                x[i] = x[i].clamp(self.lower[i], self.upper[i]);
            } else {
                x[i] = self.lower[i];
            }
        }
    }

    pub fn clip(&self, x: &Array1<f64>) -> Array1<f64> {
        let mut out = x.clone();
        self.clip_inplace(&mut out);
        out
    }

    pub fn center(&self) -> Array1<f64> {
        (&self.lower + &self.upper) * 0.5
    }
}
