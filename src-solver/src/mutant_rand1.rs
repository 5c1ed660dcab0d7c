use ndarray::{Array1, Array2};

/// x_r0 + F * (x_r1 - x_r2)
pub(crate) fn mutant_rand1(pop: &Array2<f64>, r: &[usize], f: f64) -> Array1<f64> {
    &pop.row(r[0]) + &((&pop.row(r[1]) - &pop.row(r[2])) * f)
}
