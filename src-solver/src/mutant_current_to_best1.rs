use ndarray::{Array1, Array2};

/// x_i + F * (x_best - x_i) + F * (x_r0 - x_r1)
pub(crate) fn mutant_current_to_best1(
    pop: &Array2<f64>,
    i: usize,
    best_idx: usize,
    r: &[usize],
    f: f64,
) -> Array1<f64> {
    let current = pop.row(i);
    let pull = &pop.row(best_idx) - &current;
    let diff = &pop.row(r[0]) - &pop.row(r[1]);
    &current + &((pull + diff) * f)
}
