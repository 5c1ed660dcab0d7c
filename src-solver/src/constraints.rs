//! Constraint handling: repairs map a trial back into the feasible set before
//! evaluation, penalties add a non-negative amount to the fitness of
//! infeasible points after evaluation.

use std::fmt;
use std::sync::Arc;

use ndarray::{Array1, Array2};

use crate::bounds::Bounds;
use crate::error::{Result, SolverError};

/// Idempotent map onto the feasible set: `repair(repair(x)) == repair(x)`.
pub trait Repair: Send + Sync {
    fn repair(&self, x: &Array1<f64>) -> Array1<f64>;
}

impl<F> Repair for F
where
    F: Fn(&Array1<f64>) -> Array1<f64> + Send + Sync,
{
    fn repair(&self, x: &Array1<f64>) -> Array1<f64> {
        self(x)
    }
}

/// Clamp into a box.
#[derive(Debug, Clone)]
pub struct ClipToBounds(pub Bounds);

impl Repair for ClipToBounds {
    fn repair(&self, x: &Array1<f64>) -> Array1<f64> {
        self.0.clip(x)
    }
}

/// Round masked coordinates to the nearest integer inside the bounds.
#[derive(Debug, Clone)]
pub struct Integrality {
    pub mask: Vec<bool>,
    pub bounds: Bounds,
}

impl Integrality {
    pub fn new(mask: Vec<bool>, bounds: Bounds) -> Result<Self> {
        if mask.len() != bounds.dim() {
            return Err(SolverError::dimension("integrality mask", bounds.dim(), mask.len()));
        }
        Ok(Self { mask, bounds })
    }
}

impl Repair for Integrality {
    fn repair(&self, x: &Array1<f64>) -> Array1<f64> {
        let (lower, upper) = (self.bounds.lower(), self.bounds.upper());
        let mut out = x.clone();
        for i in 0..out.len() {
            if i < self.mask.len() && self.mask[i] {
                out[i] = out[i].round();
                if out[i] < lower[i] {
                    out[i] = lower[i].ceil();
                }
                if out[i] > upper[i] {
                    out[i] = upper[i].floor();
                }
            }
        }
        out
    }
}

/// Applies repairs in order. Idempotent when the members commute
/// (e.g. an integrality rounding followed by a clip onto integer bounds).
#[derive(Clone, Default)]
pub struct RepairChain(pub Vec<Arc<dyn Repair>>);

impl RepairChain {
    pub fn then(mut self, repair: impl Repair + 'static) -> Self {
        self.0.push(Arc::new(repair));
        self
    }
}

impl Repair for RepairChain {
    fn repair(&self, x: &Array1<f64>) -> Array1<f64> {
        self.0.iter().fold(x.clone(), |acc, r| r.repair(&acc))
    }
}

/// Adds a non-negative penalty to the fitness of infeasible points and returns
/// `fitness` unchanged for feasible ones.
pub trait Penalty: Send + Sync {
    fn penalize(&self, x: &Array1<f64>, fitness: f64) -> f64;
}

pub type ConstraintFn = Arc<dyn Fn(&Array1<f64>) -> f64 + Send + Sync>;

/// `g(x) <= 0`, penalised by `weight * max(g, 0)^2`
#[derive(Clone)]
pub struct QuadraticInequality {
    pub g: ConstraintFn,
    pub weight: f64,
}

impl QuadraticInequality {
    pub fn new<G>(g: G, weight: f64) -> Self
    where
        G: Fn(&Array1<f64>) -> f64 + Send + Sync + 'static,
    {
        Self { g: Arc::new(g), weight }
    }
}

impl Penalty for QuadraticInequality {
    fn penalize(&self, x: &Array1<f64>, fitness: f64) -> f64 {
        let violation = (self.g)(x);
        if violation > 0.0 { fitness + self.weight * violation * violation } else { fitness }
    }
}

/// `h(x) = 0`, penalised by `weight * h^2`
#[derive(Clone)]
pub struct QuadraticEquality {
    pub h: ConstraintFn,
    pub weight: f64,
}

impl QuadraticEquality {
    pub fn new<H>(h: H, weight: f64) -> Self
    where
        H: Fn(&Array1<f64>) -> f64 + Send + Sync + 'static,
    {
        Self { h: Arc::new(h), weight }
    }
}

impl Penalty for QuadraticEquality {
    fn penalize(&self, x: &Array1<f64>, fitness: f64) -> f64 {
        let v = (self.h)(x);
        if v != 0.0 { fitness + self.weight * v * v } else { fitness }
    }
}

/// Linear penalty specification: lb <= A x <= ub (component-wise), one weight per row
#[derive(Debug, Clone)]
pub struct LinearPenalty {
    pub a: Array2<f64>,
    pub lb: Array1<f64>,
    pub ub: Array1<f64>,
    pub weights: Array1<f64>,
}

impl LinearPenalty {
    pub fn new(a: Array2<f64>, lb: Array1<f64>, ub: Array1<f64>, weight: f64) -> Result<Self> {
        if lb.len() != a.nrows() {
            return Err(SolverError::dimension("linear constraint lower bound", a.nrows(), lb.len()));
        }
        if ub.len() != a.nrows() {
            return Err(SolverError::dimension("linear constraint upper bound", a.nrows(), ub.len()));
        }
        let weights = Array1::from_elem(a.nrows(), weight);
        Ok(Self { a, lb, ub, weights })
    }

    /// Append the rows of `other`, each keeping its own weight.
    pub fn stack(&mut self, other: &LinearPenalty) -> Result<()> {
        if other.a.ncols() != self.a.ncols() {
            return Err(SolverError::dimension("linear constraint matrix", self.a.ncols(), other.a.ncols()));
        }
        self.a = ndarray::concatenate(ndarray::Axis(0), &[self.a.view(), other.a.view()])
            .map_err(|e| SolverError::Configuration(e.to_string()))?;
        self.lb = self.lb.iter().chain(other.lb.iter()).copied().collect();
        self.ub = self.ub.iter().chain(other.ub.iter()).copied().collect();
        self.weights = self.weights.iter().chain(other.weights.iter()).copied().collect();
        Ok(())
    }
}

impl Penalty for LinearPenalty {
    fn penalize(&self, x: &Array1<f64>, fitness: f64) -> f64 {
        let mut p = 0.0;
        for (i, row) in self.a.rows().into_iter().enumerate() {
            let v: f64 = row.iter().zip(x.iter()).map(|(a, b)| a * b).sum();
            if v < self.lb[i] {
                let d = self.lb[i] - v;
                p += self.weights[i] * d * d;
            }
            if v > self.ub[i] {
                let d = v - self.ub[i];
                p += self.weights[i] * d * d;
            }
        }
        if p > 0.0 { fitness + p } else { fitness }
    }
}

/// Sum of several penalties.
#[derive(Clone, Default)]
pub struct PenaltySet(pub Vec<Arc<dyn Penalty>>);

impl PenaltySet {
    pub fn with(mut self, penalty: impl Penalty + 'static) -> Self {
        self.0.push(Arc::new(penalty));
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Penalty for PenaltySet {
    fn penalize(&self, x: &Array1<f64>, fitness: f64) -> f64 {
        self.0.iter().fold(fitness, |f, p| p.penalize(x, f))
    }
}

/// Vector-valued `fun(x)` with `lb <= fun(x) <= ub`.
#[derive(Clone)]
pub struct NonlinearConstraintHelper {
    pub fun: Arc<dyn Fn(&Array1<f64>) -> Array1<f64> + Send + Sync>,
    pub lb: Array1<f64>,
    pub ub: Array1<f64>,
}

impl NonlinearConstraintHelper {
    /// One penalty per component: two inequalities `f_i - ub <= 0` and
    /// `lb - f_i <= 0`, or a single equality when `lb == ub`.
    pub fn into_penalties(self, weight_ineq: f64, weight_eq: f64) -> PenaltySet {
        let mut set = PenaltySet::default();
        let m = self.lb.len().min(self.ub.len());
        for i in 0..m {
            let (l, u) = (self.lb[i], self.ub[i]);
            if (u - l).abs() < 1e-18 {
                let f = self.fun.clone();
                set = set.with(QuadraticEquality::new(move |x| f(x)[i] - l, weight_eq));
            } else {
                let fu = self.fun.clone();
                set = set.with(QuadraticInequality::new(move |x| fu(x)[i] - u, weight_ineq));
                let fl = self.fun.clone();
                set = set.with(QuadraticInequality::new(move |x| l - fl(x)[i], weight_ineq));
            }
        }
        set
    }
}

/// Repair and penalty installed on a solver.
#[derive(Clone, Default)]
pub struct Constraints {
    pub repair: Option<Arc<dyn Repair>>,
    pub penalty: Option<Arc<dyn Penalty>>,
}

impl fmt::Debug for Constraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraints")
            .field("repair", &self.repair.is_some())
            .field("penalty", &self.penalty.is_some())
            .finish()
    }
}

impl Constraints {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_repair(mut self, repair: impl Repair + 'static) -> Self {
        self.repair = Some(Arc::new(repair));
        self
    }

    pub fn with_penalty(mut self, penalty: impl Penalty + 'static) -> Self {
        self.penalty = Some(Arc::new(penalty));
        self
    }

    pub fn apply_repair(&self, x: Array1<f64>) -> Array1<f64> {
        match &self.repair {
            Some(r) => r.repair(&x),
            None => x,
        }
    }

    pub fn apply_penalty(&self, x: &Array1<f64>, fitness: f64) -> f64 {
        match &self.penalty {
            Some(p) => p.penalize(x, fitness),
            None => fitness,
        }
    }
}
