use ndarray::Array1;
use rand::Rng;

/// Copy a contiguous (cyclic) run of mutant coordinates starting at a random
/// position; the run continues while a uniform draw stays below `cr`.
pub(crate) fn exponential_crossover<R: Rng + ?Sized>(
    target: &Array1<f64>,
    mutant: &Array1<f64>,
    cr: f64,
    rng: &mut R,
) -> Array1<f64> {
    let n = target.len();
    let mut trial = target.clone();
    let mut j = rng.random_range(0..n);
    let mut copied = 0usize;
    loop {
        trial[j] = mutant[j];
        copied += 1;
        j = (j + 1) % n;
        if copied >= n || rng.random::<f64>() >= cr {
            break;
        }
    }
    trial
}
