use ndarray::{Array1, Array2};

/// x_r0 + F * (x_best - x_r0 + x_r1 - x_r2)
pub(crate) fn mutant_rand_to_best1(
    pop: &Array2<f64>,
    best_idx: usize,
    r: &[usize],
    f: f64,
) -> Array1<f64> {
    let base = pop.row(r[0]);
    let diff = &pop.row(best_idx) - &base + &pop.row(r[1]) - &pop.row(r[2]);
    &base + &(diff * f)
}
