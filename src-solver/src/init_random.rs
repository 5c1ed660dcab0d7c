use ndarray::Array2;
use rand::Rng;

use crate::bounds::Bounds;

/// Uniform random population inside `bounds`; fixed dimensions are pinned.
pub(crate) fn init_random<R: Rng + ?Sized>(npop: usize, bounds: &Bounds, rng: &mut R) -> Array2<f64> {
    let n = bounds.dim();
    let (lower, upper) = (bounds.lower(), bounds.upper());
    let mut pop = Array2::<f64>::zeros((npop, n));
    for i in 0..npop {
        for j in 0..n {
            pop[(i, j)] = if bounds.is_free(j) {
                lower[j] + rng.random::<f64>() * (upper[j] - lower[j])
            } else {
                lower[j]
            };
        }
    }
    pop
}
