use ndarray::{Array1, Array2};

/// x_best + F * (x_r0 - x_r1)
pub(crate) fn mutant_best1(pop: &Array2<f64>, best_idx: usize, r: &[usize], f: f64) -> Array1<f64> {
    &pop.row(best_idx) + &((&pop.row(r[0]) - &pop.row(r[1])) * f)
}
