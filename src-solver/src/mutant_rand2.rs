use ndarray::{Array1, Array2};

/// x_r0 + F * (x_r1 + x_r2 - x_r3 - x_r4)
pub(crate) fn mutant_rand2(pop: &Array2<f64>, r: &[usize], f: f64) -> Array1<f64> {
    let diff = &pop.row(r[1]) + &pop.row(r[2]) - &pop.row(r[3]) - &pop.row(r[4]);
    &pop.row(r[0]) + &(diff * f)
}
