use ndarray::{Array1, Array2};

/// x_best + F * (x_r0 + x_r1 - x_r2 - x_r3)
pub(crate) fn mutant_best2(pop: &Array2<f64>, best_idx: usize, r: &[usize], f: f64) -> Array1<f64> {
    let diff = &pop.row(r[0]) + &pop.row(r[1]) - &pop.row(r[2]) - &pop.row(r[3]);
    &pop.row(best_idx) + &(diff * f)
}
